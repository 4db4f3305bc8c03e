//! HDR10 sibling for Dolby Vision profile 8 sources.
//!
//! Profile 8 carries an HDR10 base layer plus RPU NAL units (type 62).
//! Dropping those units with a bitstream filter leaves plain HDR10.

use crate::command::ToolRunner;
use crate::error::tail_chars;
use crate::probe::MediaInfo;
use crate::tools::Tool;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Minimum sibling size as a fraction of the source.
const MIN_SIZE_RATIO: f64 = 0.9;

/// Result of [`create_hdr10_copy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hdr10Outcome {
    pub path: PathBuf,
    /// False when the sibling already existed.
    pub created: bool,
}

impl Hdr10Outcome {
    pub fn message(&self) -> &'static str {
        if self.created {
            "HDR10 copy created"
        } else {
            "HDR10 copy already exists"
        }
    }
}

/// `<stem>.HDR10.mkv` inside `dest_dir`.
pub fn hdr10_path(info: &MediaInfo, dest_dir: &Path) -> PathBuf {
    let stem = info
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    dest_dir.join(format!("{}.HDR10.mkv", stem))
}

/// Write an RPU-stripped copy of a profile 8 source into `dest_dir`.
///
/// Idempotent: an existing sibling is reported as success without running
/// the strip again.
pub fn create_hdr10_copy(
    runner: &dyn ToolRunner,
    info: &MediaInfo,
    dest_dir: &Path,
) -> Result<Hdr10Outcome> {
    if !info.has_dovi_profile_8() {
        return Err(Error::InvalidInput("Not DoVi Profile 8".to_string()));
    }

    let output = hdr10_path(info, dest_dir);
    if output.exists() {
        return Ok(Hdr10Outcome {
            path: output,
            created: false,
        });
    }

    let temp = output.with_extension("tmp.mkv");
    tracing::info!("Creating HDR10 copy of {:?}", info.path.file_name());

    let args: Vec<String> = [
        "-y",
        "-v",
        "error",
        "-i",
        &info.path.to_string_lossy(),
        "-map",
        "0:v:0",
        "-map",
        "0:a?",
        "-map",
        "0:s?",
        "-c:v",
        "copy",
        "-bsf:v",
        "filter_units=remove_types=62",
        "-c:a",
        "copy",
        "-c:s",
        "copy",
        &temp.to_string_lossy(),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let result = runner.run(Tool::Ffmpeg, &args, None);
    let result = result.and_then(|out| {
        if out.success() {
            check_sibling(info, &temp)
        } else {
            Err(Error::transform(
                "stream copy",
                match out.stderr.trim() {
                    "" => "unknown".to_string(),
                    stderr => tail_chars(stderr, 200),
                },
            ))
        }
    });

    if let Err(e) = result {
        remove_temp(&temp);
        return Err(e);
    }

    std::fs::rename(&temp, &output).map_err(|e| {
        remove_temp(&temp);
        Error::Filesystem(format!("Rename failed: {}", e))
    })?;

    tracing::info!("Created {:?}", output.file_name());
    Ok(Hdr10Outcome {
        path: output,
        created: true,
    })
}

fn remove_temp(temp: &Path) {
    if temp.exists() {
        if let Err(e) = std::fs::remove_file(temp) {
            tracing::warn!("Failed to remove temporary HDR10 output {:?}: {}", temp, e);
        }
    }
}

fn check_sibling(info: &MediaInfo, temp: &Path) -> Result<()> {
    if !temp.exists() {
        return Err(Error::Validation("Output file not created".to_string()));
    }
    let output_size = std::fs::metadata(temp)?.len();
    let input_size = std::fs::metadata(&info.path)?.len();
    if (output_size as f64) < input_size as f64 * MIN_SIZE_RATIO {
        return Err(Error::Validation(format!(
            "Output too small: {} vs {}",
            output_size, input_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ToolOutput;
    use crate::probe::{HdrKind, VideoInfo};
    use assert_matches::assert_matches;
    use std::cell::Cell;
    use std::time::Duration;

    /// Writes `bytes` to the last argument and counts invocations.
    struct Stripper {
        bytes: usize,
        calls: Cell<usize>,
    }

    impl ToolRunner for Stripper {
        fn run(&self, _tool: Tool, args: &[String], _t: Option<Duration>) -> Result<ToolOutput> {
            self.calls.set(self.calls.get() + 1);
            std::fs::write(args.last().unwrap(), vec![0u8; self.bytes])?;
            Ok(ToolOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        }
    }

    fn dv_source(dir: &Path, profile: u8) -> MediaInfo {
        let path = dir.join("Movie.mkv");
        std::fs::write(&path, vec![0u8; 1000]).unwrap();
        let mut info = MediaInfo::new(path);
        info.video = Some(VideoInfo {
            codec: "hevc".to_string(),
            width: Some(3840),
            height: Some(2160),
            bit_depth: 10,
            hdr: true,
            hdr_kind: HdrKind::DolbyVision,
            dovi_profile: Some(profile),
        });
        info
    }

    #[test]
    fn creates_sibling_once() {
        let dir = tempfile::tempdir().unwrap();
        let info = dv_source(dir.path(), 8);
        let runner = Stripper {
            bytes: 950,
            calls: Cell::new(0),
        };

        let first = create_hdr10_copy(&runner, &info, dir.path()).unwrap();
        let second = create_hdr10_copy(&runner, &info, dir.path()).unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(second.message(), "HDR10 copy already exists");
        assert_eq!(first.path, dir.path().join("Movie.HDR10.mkv"));
        assert_eq!(runner.calls.get(), 1);
        assert!(!dir.path().join("Movie.HDR10.tmp.mkv").exists());
    }

    #[test]
    fn rejects_small_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let info = dv_source(dir.path(), 8);
        let runner = Stripper {
            bytes: 500,
            calls: Cell::new(0),
        };

        let err = create_hdr10_copy(&runner, &info, dir.path()).unwrap_err();

        assert_matches!(err, Error::Validation(_));
        assert!(!dir.path().join("Movie.HDR10.mkv").exists());
        assert!(!dir.path().join("Movie.HDR10.tmp.mkv").exists());
    }

    /// Leaves a partial file behind and exits non-zero.
    struct FailingStripper;

    impl ToolRunner for FailingStripper {
        fn run(&self, _tool: Tool, args: &[String], _t: Option<Duration>) -> Result<ToolOutput> {
            std::fs::write(args.last().unwrap(), b"partial")?;
            Ok(ToolOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "Invalid NAL unit size".to_string(),
            })
        }
    }

    #[test]
    fn failed_strip_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let info = dv_source(dir.path(), 8);

        let err = create_hdr10_copy(&FailingStripper, &info, dir.path()).unwrap_err();

        assert_matches!(err, Error::Transform { ref message, .. } if message == "Invalid NAL unit size");
        assert!(!dir.path().join("Movie.HDR10.tmp.mkv").exists());
        assert!(!dir.path().join("Movie.HDR10.mkv").exists());
    }

    #[test]
    fn other_profiles_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let info = dv_source(dir.path(), 5);
        let runner = Stripper {
            bytes: 1000,
            calls: Cell::new(0),
        };
        assert!(create_hdr10_copy(&runner, &info, dir.path()).is_err());
        assert_eq!(runner.calls.get(), 0);
    }
}
