//! Compatibility analysis.
//!
//! [`analyze`] is a pure function from a probed [`MediaInfo`] to a
//! [`RemediationPlan`]. Every later stage reads decisions from the plan
//! instead of re-deriving them.

use crate::probe::MediaInfo;
use serde::Serialize;

/// Video codecs the target decodes natively.
pub const COMPATIBLE_VIDEO_CODECS: &[&str] = &["h264", "hevc", "vp9"];

/// Codecs the hardware decoder cannot initialize for.
pub const HARDWARE_INCOMPATIBLE_CODECS: &[&str] =
    &["mpeg4", "msmpeg4v1", "msmpeg4v2", "msmpeg4v3"];

/// What happens to the primary video stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VideoAction {
    Copy,
    Recode { reason: String },
}

/// What happens to one audio stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioAction {
    /// Container stream index.
    pub index: u32,
    /// Present iff the track is downmixed to stereo AAC.
    pub recode_reason: Option<String>,
}

impl AudioAction {
    pub fn needs_recode(&self) -> bool {
        self.recode_reason.is_some()
    }
}

/// Decisions for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationPlan {
    pub video: VideoAction,
    /// One entry per audio track, in container order.
    pub audio: Vec<AudioAction>,
    pub text_subtitles: usize,
    pub image_subtitles: usize,
    /// Dolby Vision profile when an HDR10 sibling is required.
    pub hdr10_from_profile: Option<u8>,
}

impl RemediationPlan {
    pub fn needs_video_recode(&self) -> bool {
        matches!(self.video, VideoAction::Recode { .. })
    }

    pub fn needs_audio_recode(&self) -> bool {
        self.audio.iter().any(AudioAction::needs_recode)
    }

    /// A transcode is required. Subtitles and HDR10 are evaluated separately.
    pub fn needs_processing(&self) -> bool {
        self.needs_video_recode() || self.needs_audio_recode()
    }

    pub fn has_extractable_subtitles(&self) -> bool {
        self.text_subtitles + self.image_subtitles > 0
    }

    pub fn needs_hdr10_copy(&self) -> bool {
        self.hdr10_from_profile.is_some()
    }

    /// Any remediation at all.
    pub fn needs_any_work(&self) -> bool {
        self.needs_processing() || self.has_extractable_subtitles() || self.needs_hdr10_copy()
    }

    /// Stream-copy plan for a remux that only strips subtitles.
    pub fn remux_only(&self) -> Self {
        Self {
            video: VideoAction::Copy,
            audio: self
                .audio
                .iter()
                .map(|a| AudioAction {
                    index: a.index,
                    recode_reason: None,
                })
                .collect(),
            ..self.clone()
        }
    }

    pub fn video_description(&self) -> String {
        match &self.video {
            VideoAction::Copy => "copy".to_string(),
            VideoAction::Recode { reason } => format!("recode: {}", reason),
        }
    }

    pub fn audio_description(&self) -> String {
        let reasons: Vec<&str> = self
            .audio
            .iter()
            .filter_map(|a| a.recode_reason.as_deref())
            .collect();
        if reasons.is_empty() {
            "copy".to_string()
        } else {
            format!("recode: {}", reasons.join("; "))
        }
    }

    pub fn subtitle_description(&self) -> String {
        if !self.has_extractable_subtitles() {
            return "none".to_string();
        }
        format!(
            "extract {} subtitle(s), remux to strip",
            self.subtitle_counts(" text", " image", ", ")
        )
    }

    pub fn dovi_description(&self) -> String {
        match self.hdr10_from_profile {
            Some(profile) => format!("create HDR10 copy (DoVi Profile {})", profile),
            None => "none".to_string(),
        }
    }

    /// Short tags used in scan listings, e.g. `RECODE SUBS(1txt+2img) DOVI-P8`.
    pub fn tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if self.needs_processing() {
            tags.push("RECODE".to_string());
        }
        if self.has_extractable_subtitles() {
            tags.push(format!("SUBS({})", self.subtitle_counts("txt", "img", "+")));
        }
        if self.needs_hdr10_copy() {
            tags.push("DOVI-P8".to_string());
        }
        tags
    }

    fn subtitle_counts(&self, text: &str, image: &str, sep: &str) -> String {
        let mut parts = Vec::new();
        if self.text_subtitles > 0 {
            parts.push(format!("{}{}", self.text_subtitles, text));
        }
        if self.image_subtitles > 0 {
            parts.push(format!("{}{}", self.image_subtitles, image));
        }
        parts.join(sep)
    }
}

/// Human channel layout: "5.1" for 6 channels, "7.1" for 8, else "Nch".
pub fn channel_label(channels: u32) -> String {
    match channels {
        6 | 8 => format!("{}.1", channels - 1),
        n => format!("{}ch", n),
    }
}

/// Derive the remediation plan for a probed file.
pub fn analyze(info: &MediaInfo) -> RemediationPlan {
    let codec = info.video_codec();
    let video = if !codec.is_empty() && !COMPATIBLE_VIDEO_CODECS.contains(&codec) {
        VideoAction::Recode {
            reason: format!("incompatible codec: {}", codec),
        }
    } else {
        VideoAction::Copy
    };

    let audio = info
        .audio_tracks
        .iter()
        .map(|track| AudioAction {
            index: track.index,
            recode_reason: (track.channels > 2).then(|| {
                format!(
                    "{} {} -> AAC stereo",
                    track.codec,
                    channel_label(track.channels)
                )
            }),
        })
        .collect();

    RemediationPlan {
        video,
        audio,
        text_subtitles: info.text_subtitle_count(),
        image_subtitles: info.image_subtitle_count(),
        hdr10_from_profile: info.has_dovi_profile_8().then_some(8),
    }
}

/// Whether the hardware encoder should be attempted first.
///
/// Advisory only: the fallback executor still runs software when this is false.
pub fn hardware_eligible(info: &MediaInfo, plan: &RemediationPlan, enabled: bool) -> bool {
    enabled
        && plan.needs_video_recode()
        && info.bit_depth() <= 8
        && !HARDWARE_INCOMPATIBLE_CODECS.contains(&info.video_codec())
}
