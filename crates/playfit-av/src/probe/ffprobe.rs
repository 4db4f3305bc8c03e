//! FFprobe JSON parsing.

use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    codec_type: String,
    #[serde(default)]
    codec_name: String,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    pix_fmt: String,
    #[serde(default)]
    color_transfer: String,
    #[serde(default)]
    color_primaries: String,
    #[serde(default)]
    channels: u32,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: FfprobeTags,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    default: u8,
    #[serde(default)]
    forced: u8,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeSideData {
    #[serde(default)]
    side_data_type: String,
    dv_profile: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct FormatOnly {
    #[serde(default)]
    format: FormatDuration,
}

#[derive(Debug, Default, Deserialize)]
struct FormatDuration {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamTypesOnly {
    #[serde(default)]
    streams: Vec<StreamType>,
}

#[derive(Debug, Deserialize)]
struct StreamType {
    codec_type: Option<String>,
}

/// Parse the output of `ffprobe -show_streams -show_format -print_format json`.
pub fn parse_ffprobe_json(path: &Path, json: &str) -> Result<MediaInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::probe(path, format!("JSON parse error: {}", e)))?;

    let mut info = MediaInfo::new(path);

    for stream in output.streams {
        match stream.codec_type.as_str() {
            "video" if info.video.is_none() => info.video = Some(parse_video(&stream)),
            "audio" => info.audio_tracks.push(AudioTrack {
                index: stream.index,
                codec: stream.codec_name.to_lowercase(),
                channels: stream.channels,
                language: stream.tags.language.unwrap_or_else(|| "und".to_string()),
            }),
            "subtitle" => {
                let mut track = SubtitleTrack::new(
                    stream.index,
                    stream.codec_name,
                    stream.tags.language.unwrap_or_else(|| "und".to_string()),
                );
                track.title = stream.tags.title;
                track.default = stream.disposition.default == 1;
                track.forced = stream.disposition.forced == 1;
                info.subtitle_tracks.push(track);
            }
            _ => {}
        }
    }

    Ok(info)
}

fn parse_video(stream: &FfprobeStream) -> VideoInfo {
    let mut video = VideoInfo {
        codec: stream.codec_name.to_lowercase(),
        width: stream.width,
        height: stream.height,
        bit_depth: bit_depth_from_pix_fmt(&stream.pix_fmt),
        hdr: false,
        hdr_kind: HdrKind::None,
        dovi_profile: None,
    };

    for sd in &stream.side_data_list {
        let sd_type = sd.side_data_type.to_lowercase();
        if sd_type.contains("mastering") || sd_type.contains("content light") {
            video.hdr = true;
        }
        if sd_type.contains("dovi") || sd_type.contains("dolby") {
            video.hdr = true;
            video.hdr_kind = HdrKind::DolbyVision;
        }
        if let Some(profile) = sd.dv_profile {
            video.dovi_profile = Some(profile);
        }
    }

    let transfer = stream.color_transfer.to_lowercase();
    if transfer.contains("smpte2084") || transfer.contains("arib-std-b67") {
        video.hdr = true;
        if video.hdr_kind != HdrKind::DolbyVision {
            video.hdr_kind = if transfer.contains("arib-std-b67") {
                HdrKind::Hlg
            } else {
                HdrKind::Hdr10
            };
        }
    }
    if stream.color_primaries.to_lowercase().contains("bt2020") {
        video.hdr = true;
    }

    video
}

/// Bit depth implied by an ffmpeg pixel format name.
pub fn bit_depth_from_pix_fmt(pix_fmt: &str) -> u8 {
    if pix_fmt.contains("10le") || pix_fmt.contains("10be") || pix_fmt.contains("p010") {
        10
    } else if pix_fmt.contains("12le") || pix_fmt.contains("12be") {
        12
    } else {
        8
    }
}

/// Parse `-show_entries format=duration -of json` output into seconds.
pub fn parse_duration_json(json: &str) -> Option<f64> {
    let parsed: FormatOnly = serde_json::from_str(json).ok()?;
    parsed.format.duration?.trim().parse().ok()
}

/// Parse `-show_entries stream=codec_type -of json` output.
pub fn parse_stream_types_json(json: &str) -> Result<Vec<String>> {
    let parsed: StreamTypesOnly = serde_json::from_str(json)?;
    Ok(parsed
        .streams
        .into_iter()
        .filter_map(|s| s.codec_type)
        .collect())
}
