//! Dolby Vision profile recovery when the main probe misses it.

use crate::command::ToolRunner;
use crate::tools::Tool;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SideDataOutput {
    #[serde(default)]
    streams: Vec<SideDataStream>,
}

#[derive(Debug, Deserialize)]
struct SideDataStream {
    #[serde(default)]
    side_data_list: Vec<ProfileEntry>,
}

#[derive(Debug, Deserialize)]
struct ProfileEntry {
    dv_profile: Option<u8>,
}

/// Ask ffprobe for the `dv_profile` side data, then mediainfo.
///
/// Never fails: any tool or parse error yields `None`.
pub fn recover_dovi_profile(runner: &dyn ToolRunner, path: &Path) -> Option<u8> {
    let args = vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        "-show_entries".to_string(),
        "stream_side_data=dv_profile".to_string(),
        "-of".to_string(),
        "json".to_string(),
        path.to_string_lossy().to_string(),
    ];

    match runner.run(Tool::Ffprobe, &args, None) {
        Ok(out) if out.success() => {
            if let Some(profile) = parse_side_data_profile(&out.stdout) {
                return Some(profile);
            }
        }
        Ok(_) => return None,
        Err(e) => {
            tracing::debug!("dv_profile probe failed for {:?}: {}", path, e);
            return None;
        }
    }

    let args = vec![
        "--Output=Video;%HDR_Format_Profile%".to_string(),
        path.to_string_lossy().to_string(),
    ];
    match runner.run(Tool::Mediainfo, &args, None) {
        Ok(out) if out.success() => parse_mediainfo_profile(&out.stdout),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("mediainfo unavailable for DV profile: {}", e);
            None
        }
    }
}

/// First `dv_profile` in a `stream_side_data=dv_profile` probe.
pub fn parse_side_data_profile(json: &str) -> Option<u8> {
    let parsed: SideDataOutput = serde_json::from_str(json).ok()?;
    parsed
        .streams
        .iter()
        .flat_map(|s| s.side_data_list.iter())
        .find_map(|sd| sd.dv_profile)
}

/// Match mediainfo's textual profile (e.g. "dvhe.08.06") to a profile number.
pub fn parse_mediainfo_profile(text: &str) -> Option<u8> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    [(8, "08", ".8"), (5, "05", ".5"), (7, "07", ".7")]
        .into_iter()
        .find(|(_, padded, dotted)| text.contains(padded) || text.contains(dotted))
        .map(|(profile, _, _)| profile)
}
