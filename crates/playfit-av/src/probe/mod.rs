//! Media file probing.
//!
//! The main probe produces a [`MediaInfo`]; two narrow container probes back
//! the output validator.

mod dovi;
mod ffprobe;
mod types;

pub use dovi::{parse_mediainfo_profile, recover_dovi_profile};
pub use ffprobe::{bit_depth_from_pix_fmt, parse_ffprobe_json};
pub use types::*;

use crate::command::ToolRunner;
use crate::tools::Tool;
use crate::{Error, Result};
use std::path::Path;

/// Probe a media file.
///
/// Recovers the Dolby Vision profile with a second probe when the stream
/// is flagged Dolby Vision but the main probe carried no profile number.
pub fn probe(runner: &dyn ToolRunner, path: &Path) -> Result<MediaInfo> {
    let args = vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_streams".to_string(),
        "-show_format".to_string(),
        path.to_string_lossy().to_string(),
    ];

    let output = runner.run(Tool::Ffprobe, &args, None).map_err(|e| match e {
        Error::ToolNotFound { .. } => e,
        other => Error::probe(path, other.to_string()),
    })?;

    if !output.success() {
        let message = match output.stderr.trim() {
            "" => "ffprobe failed".to_string(),
            stderr => stderr.to_string(),
        };
        return Err(Error::probe(path, message));
    }

    let mut info = parse_ffprobe_json(path, &output.stdout)?;

    if let Some(video) = info.video.as_mut() {
        if video.hdr_kind == HdrKind::DolbyVision && video.dovi_profile.is_none() {
            video.dovi_profile = recover_dovi_profile(runner, path);
        }
    }

    Ok(info)
}

/// Container duration in seconds, `None` when it cannot be determined.
pub fn container_duration(runner: &dyn ToolRunner, path: &Path) -> Option<f64> {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "json".to_string(),
        path.to_string_lossy().to_string(),
    ];
    let output = runner.run(Tool::Ffprobe, &args, None).ok()?;
    ffprobe::parse_duration_json(&output.stdout)
}

/// Codec types (`video`, `audio`, ...) of every stream in a container.
pub fn stream_types(runner: &dyn ToolRunner, path: &Path) -> Result<Vec<String>> {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "stream=codec_type".to_string(),
        "-of".to_string(),
        "json".to_string(),
        path.to_string_lossy().to_string(),
    ];
    let output = runner.run(Tool::Ffprobe, &args, None)?;
    ffprobe::parse_stream_types_json(&output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ToolOutput;
    use std::cell::RefCell;
    use std::time::Duration;

    struct Replies(RefCell<Vec<ToolOutput>>);

    impl ToolRunner for Replies {
        fn run(&self, _tool: Tool, _args: &[String], _t: Option<Duration>) -> Result<ToolOutput> {
            Ok(self.0.borrow_mut().remove(0))
        }
    }

    fn reply(code: i32, stdout: &str, stderr: &str) -> ToolOutput {
        ToolOutput {
            exit_code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn failed_probe_carries_stderr() {
        let runner = Replies(RefCell::new(vec![reply(1, "", "Invalid data found")]));
        let err = probe(&runner, Path::new("/m/broken.mkv")).unwrap_err();
        match err {
            Error::Probe { message, .. } => assert_eq!(message, "Invalid data found"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn recovers_missing_dovi_profile() {
        let main = r#"{"streams":[{"codec_type":"video","codec_name":"hevc",
            "side_data_list":[{"side_data_type":"DOVI configuration record"}]}]}"#;
        let side = r#"{"streams":[{"side_data_list":[{"dv_profile":8}]}]}"#;
        let runner = Replies(RefCell::new(vec![reply(0, main, ""), reply(0, side, "")]));

        let info = probe(&runner, Path::new("/m/dv.mkv")).unwrap();
        assert!(info.has_dovi_profile_8());
    }

    #[test]
    fn duration_probe_failure_is_none() {
        let runner = Replies(RefCell::new(vec![reply(1, "", "No such file")]));
        assert_eq!(container_duration(&runner, Path::new("x.mkv")), None);
    }
}
