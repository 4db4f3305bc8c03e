//! Media information types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Codecs extracted as text sidecars.
pub const TEXT_SUBTITLE_CODECS: &[&str] = &[
    "subrip", "srt", "ass", "ssa", "mov_text", "webvtt", "text", "sami",
];

/// Codecs extracted as bitmap sidecars and sent through OCR.
pub const IMAGE_SUBTITLE_CODECS: &[&str] = &[
    "hdmv_pgs_subtitle",
    "dvd_subtitle",
    "dvb_subtitle",
    "pgs",
    "vobsub",
];

/// Probed properties of one source file.
///
/// Built once by probing and never mutated afterwards; decisions live in
/// [`crate::RemediationPlan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the media file.
    pub path: PathBuf,
    /// First video stream, if the container has one.
    pub video: Option<VideoInfo>,
    /// Audio streams in container order.
    pub audio_tracks: Vec<AudioTrack>,
    /// Subtitle streams in container order.
    pub subtitle_tracks: Vec<SubtitleTrack>,
}

/// Properties of the primary video stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Lowercase codec name (e.g. "hevc", "mpeg4").
    pub codec: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Pixel bit depth derived from the pixel format (8, 10 or 12).
    pub bit_depth: u8,
    /// Whether any HDR signal was found.
    pub hdr: bool,
    pub hdr_kind: HdrKind,
    /// Dolby Vision profile, when known.
    pub dovi_profile: Option<u8>,
}

/// HDR flavor reported by the prober.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HdrKind {
    #[default]
    None,
    Hdr10,
    Hlg,
    DolbyVision,
}

/// An audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Stream index in the container.
    pub index: u32,
    pub codec: String,
    pub channels: u32,
    /// ISO 639-2 tag, `und` when absent.
    pub language: String,
}

/// A subtitle stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Stream index in the container.
    pub index: u32,
    pub codec: String,
    /// ISO 639-2 tag, `und` when absent.
    pub language: String,
    pub title: Option<String>,
    pub is_text: bool,
    pub is_image: bool,
    pub default: bool,
    pub forced: bool,
}

impl SubtitleTrack {
    /// Build a track, classifying its codec as text or image.
    pub fn new(index: u32, codec: impl Into<String>, language: impl Into<String>) -> Self {
        let codec = codec.into().to_lowercase();
        Self {
            index,
            is_text: TEXT_SUBTITLE_CODECS.contains(&codec.as_str()),
            is_image: IMAGE_SUBTITLE_CODECS.contains(&codec.as_str()),
            codec,
            language: language.into(),
            title: None,
            default: false,
            forced: false,
        }
    }

    /// Whether the track can be written to a sidecar.
    pub fn is_extractable(&self) -> bool {
        self.is_text || self.is_image
    }
}

impl MediaInfo {
    /// An empty model for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            video: None,
            audio_tracks: Vec::new(),
            subtitle_tracks: Vec::new(),
        }
    }

    /// Lowercase video codec, or "" without a video stream.
    pub fn video_codec(&self) -> &str {
        self.video.as_ref().map(|v| v.codec.as_str()).unwrap_or("")
    }

    pub fn bit_depth(&self) -> u8 {
        self.video.as_ref().map(|v| v.bit_depth).unwrap_or(8)
    }

    pub fn is_hdr(&self) -> bool {
        self.video.as_ref().is_some_and(|v| v.hdr)
    }

    pub fn dovi_profile(&self) -> Option<u8> {
        self.video.as_ref().and_then(|v| v.dovi_profile)
    }

    /// Dolby Vision profile 8, which needs an HDR10 sibling.
    pub fn has_dovi_profile_8(&self) -> bool {
        self.dovi_profile() == Some(8)
    }

    pub fn text_subtitle_count(&self) -> usize {
        self.subtitle_tracks.iter().filter(|s| s.is_text).count()
    }

    pub fn image_subtitle_count(&self) -> usize {
        self.subtitle_tracks.iter().filter(|s| s.is_image).count()
    }

    pub fn has_extractable_subtitles(&self) -> bool {
        self.subtitle_tracks.iter().any(SubtitleTrack::is_extractable)
    }
}
