//! Subtitle extraction to sidecar files.
//!
//! Only English and undetermined tracks are extracted. Text tracks are
//! written in their native format; bitmap tracks are written as `.sup` and
//! passed through OCR, which replaces the `.sup` with an `.srt` on success.
//! Nothing here fails the surrounding file operation: every track yields an
//! [`ExtractionReport`].

mod lang;
mod ocr;

pub use lang::{is_ocr_language, normalize_lang_code};
pub use ocr::{count_srt_cues, detect_sub_language, ocr_sup_to_srt, DEFAULT_OCR_TIMEOUT};

use crate::command::ToolRunner;
use crate::error::tail_chars;
use crate::probe::{MediaInfo, SubtitleTrack};
use crate::tools::Tool;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Whether a sidecar holds text or bitmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleKind {
    Text,
    Image,
}

/// One planned extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleJob {
    pub track_index: u32,
    /// Two-letter language used in the file name.
    pub language: String,
    pub codec: String,
    pub kind: SubtitleKind,
    /// Value passed to `-c:s`.
    pub codec_out: &'static str,
    pub output: PathBuf,
}

/// OCR sub-result for a bitmap track.
#[derive(Debug, Clone, Serialize)]
pub struct OcrReport {
    pub success: bool,
    pub message: String,
    pub sup_deleted: bool,
}

/// Result for one extracted track.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub track_index: u32,
    pub language: String,
    pub codec: String,
    #[serde(rename = "type")]
    pub kind: SubtitleKind,
    pub output: PathBuf,
    pub success: bool,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrReport>,
}

fn is_sdh(track: &SubtitleTrack) -> bool {
    track.title.as_deref().is_some_and(|title| {
        let title = title.to_lowercase();
        ["sdh", "cc", "hearing"].iter().any(|m| title.contains(m))
    })
}

fn container_for(track: &SubtitleTrack) -> (&'static str, &'static str) {
    if track.is_image {
        return ("sup", "copy");
    }
    match track.codec.as_str() {
        "ass" | "ssa" => ("ass", "copy"),
        "subrip" | "srt" => ("srt", "copy"),
        _ => ("srt", "srt"),
    }
}

/// Decide sidecar names for every extractable English track.
///
/// Names are `<stem>.<lang>[.<n>][.forced][.sdh].<ext>` beside `output_base`,
/// where `n` counts repeats of the same language within the file.
pub fn plan_extractions(info: &MediaInfo, output_base: &Path) -> Vec<SubtitleJob> {
    let stem = output_base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let dir = output_base.parent().unwrap_or_else(|| Path::new(""));
    let mut seen: HashMap<&'static str, usize> = HashMap::new();
    let mut jobs = Vec::new();

    for track in info.subtitle_tracks.iter().filter(|t| t.is_extractable()) {
        let lang = normalize_lang_code(&track.language).unwrap_or("en");
        if lang != "en" && lang != "un" {
            tracing::info!(
                "Skipping non-English subtitle track {} ({}/{})",
                track.index,
                track.language,
                lang
            );
            continue;
        }
        let lang = "en";

        let count = seen.entry(lang).or_insert(0);
        *count += 1;

        let mut parts = vec![stem.clone(), lang.to_string()];
        if *count > 1 {
            parts.push(count.to_string());
        }
        if track.forced {
            parts.push("forced".to_string());
        }
        if is_sdh(track) {
            parts.push("sdh".to_string());
        }

        let (ext, codec_out) = container_for(track);
        jobs.push(SubtitleJob {
            track_index: track.index,
            language: lang.to_string(),
            codec: track.codec.clone(),
            kind: if track.is_image {
                SubtitleKind::Image
            } else {
                SubtitleKind::Text
            },
            codec_out,
            output: dir.join(format!("{}.{}", parts.join("."), ext)),
        });
    }

    jobs
}

/// Extract every planned track from `info.path`, OCR-ing bitmap tracks.
pub fn extract_subtitles(
    runner: &dyn ToolRunner,
    info: &MediaInfo,
    output_base: &Path,
    ocr_timeout: Duration,
) -> Vec<ExtractionReport> {
    plan_extractions(info, output_base)
        .into_iter()
        .map(|job| extract_one(runner, info, job, ocr_timeout))
        .collect()
}

fn extract_one(
    runner: &dyn ToolRunner,
    info: &MediaInfo,
    job: SubtitleJob,
    ocr_timeout: Duration,
) -> ExtractionReport {
    let args = vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-i".to_string(),
        info.path.to_string_lossy().to_string(),
        "-map".to_string(),
        format!("0:{}", job.track_index),
        "-c:s".to_string(),
        job.codec_out.to_string(),
        job.output.to_string_lossy().to_string(),
    ];

    let mut report = ExtractionReport {
        track_index: job.track_index,
        language: job.language,
        codec: job.codec,
        kind: job.kind,
        output: job.output,
        success: false,
        error: None,
        ocr: None,
    };

    match runner.run(Tool::Ffmpeg, &args, None) {
        Ok(out) if out.success() => report.success = true,
        Ok(out) => report.error = Some(tail_chars(out.stderr.trim(), 500)),
        Err(e) => report.error = Some(e.to_string()),
    }

    if !report.success {
        tracing::warn!(
            "Failed to extract subtitle track {}: {}",
            report.track_index,
            report.error.as_deref().unwrap_or("")
        );
        return report;
    }

    if report.kind == SubtitleKind::Text {
        tracing::info!("Extracted subtitle: {:?}", report.output.file_name());
        return report;
    }

    tracing::info!("Extracted PGS {:?}, running OCR", report.output.file_name());
    report.ocr = Some(match ocr_sup_to_srt(runner, &report.output, ocr_timeout) {
        Ok(srt) => {
            let sup_deleted = match std::fs::remove_file(&report.output) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Could not remove {:?}: {}", report.output, e);
                    false
                }
            };
            tracing::info!("OCR complete: {:?}", srt.file_name());
            report.output = srt;
            OcrReport {
                success: true,
                message: "OCR successful".to_string(),
                sup_deleted,
            }
        }
        Err(e) => {
            tracing::warn!("OCR failed: {}, keeping SUP", e);
            OcrReport {
                success: false,
                message: e.to_string(),
                sup_deleted: false,
            }
        }
    });

    report
}
