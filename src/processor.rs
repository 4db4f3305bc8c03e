//! Per-file orchestration for `process` and `import`.
//!
//! Every stage error is folded into the returned report; nothing here aborts
//! a batch.

use crate::config::Config;
use playfit_av::encode::{build_transform_args, run_with_fallback, EncodeMode};
use playfit_av::{
    create_hdr10_copy, extract_subtitles, ownership, replace_original, tail_chars,
    validate_output, Error, ExtractionReport, HardwareConfig, MediaInfo, Owner, RealFs,
    RemediationPlan, Tool, ToolRunner,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Final state of one file in a `process` batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Compatible,
    WouldProcess,
    Success,
    Failed,
    Skipped,
}

impl FileStatus {
    pub fn symbol(self) -> &'static str {
        match self {
            FileStatus::Success => "✓",
            FileStatus::Failed => "✗",
            _ => "○",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Compatible => "compatible",
            FileStatus::WouldProcess => "would_process",
            FileStatus::Success => "success",
            FileStatus::Failed => "failed",
            FileStatus::Skipped => "skipped",
        }
    }
}

/// HDR10 sibling sub-result.
#[derive(Debug, Clone, Serialize)]
pub struct Hdr10Report {
    pub success: bool,
    pub message: String,
    pub path: Option<PathBuf>,
}

/// How the main artifact was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    /// `hardware`, `software` or `remux`.
    pub mode: String,
    pub fell_back: bool,
}

/// Audit record for one file of a `process` batch.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub video_action: String,
    pub audio_action: String,
    pub subtitle_action: String,
    pub dovi_action: String,
    pub subtitles_extracted: Vec<ExtractionReport>,
    pub hdr10_copy: Option<Hdr10Report>,
    pub transform: Option<TransformReport>,
    pub error: Option<String>,
    pub output_path: Option<PathBuf>,
}

impl FileReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Skipped,
            video_action: "copy".to_string(),
            audio_action: "copy".to_string(),
            subtitle_action: "none".to_string(),
            dovi_action: "none".to_string(),
            subtitles_extracted: Vec::new(),
            hdr10_copy: None,
            transform: None,
            error: None,
            output_path: None,
        }
    }

    fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = FileStatus::Failed;
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    WouldImport,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportAction {
    Transcode,
    Remux,
    Copy,
}

impl ImportAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportAction::Transcode => "transcode",
            ImportAction::Remux => "remux",
            ImportAction::Copy => "copy",
        }
    }
}

/// Audit record for one imported file.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: ImportStatus,
    pub action: ImportAction,
    pub subtitle_action: String,
    pub dovi_action: String,
    pub subtitles_extracted: Vec<ExtractionReport>,
    pub hdr10_copy: Option<Hdr10Report>,
    pub transform: Option<TransformReport>,
    pub error: Option<String>,
}

impl ImportReport {
    fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = ImportStatus::Failed;
        self.error = Some(error.into());
        self
    }
}

/// Runs the remediation stages for single files.
pub struct Processor<'a> {
    runner: &'a dyn ToolRunner,
    hardware: HardwareConfig,
    owner: Option<Owner>,
    ocr_timeout: Duration,
}

impl<'a> Processor<'a> {
    pub fn new(runner: &'a dyn ToolRunner, config: &Config) -> Self {
        Self {
            runner,
            hardware: config.hardware.clone(),
            owner: config.ownership.owner(),
            ocr_timeout: config.subtitles.ocr_timeout(),
        }
    }

    /// Never attempt the hardware encoder.
    pub fn without_hardware(mut self) -> Self {
        self.hardware.enabled = false;
        self
    }

    /// Remediate a library file in place.
    ///
    /// Subtitles are extracted beside the final `.mkv` path and the HDR10
    /// sibling beside the source before the main artifact is produced as
    /// `<stem>.playfit.mkv`, validated and swapped in as `<stem>.mkv`.
    pub fn process_file(
        &self,
        info: &MediaInfo,
        plan: &RemediationPlan,
        dry_run: bool,
    ) -> FileReport {
        let mut report = FileReport::new(&info.path);

        if !plan.needs_any_work() {
            report.status = FileStatus::Compatible;
            return report;
        }

        report.video_action = plan.video_description();
        report.audio_action = plan.audio_description();
        report.subtitle_action = plan.subtitle_description();
        report.dovi_action = plan.dovi_description();

        let final_path = info.path.with_extension("mkv");
        let candidate = info.path.with_extension("playfit.mkv");
        let rewrites = plan.needs_processing() || plan.has_extractable_subtitles();

        if rewrites && final_path != info.path && final_path.exists() {
            tracing::warn!(
                "Skipping {:?}: {:?} already exists",
                info.path,
                final_path.file_name()
            );
            report.status = FileStatus::Skipped;
            report.error = Some(format!(
                "Refusing to overwrite existing {}",
                final_path.display()
            ));
            return report;
        }

        if dry_run {
            report.status = FileStatus::WouldProcess;
            return report;
        }

        if plan.has_extractable_subtitles() {
            tracing::info!("Extracting subtitles from {:?}", info.path.file_name());
            report.subtitles_extracted =
                extract_subtitles(self.runner, info, &final_path, self.ocr_timeout);
        }

        if plan.needs_hdr10_copy() {
            let dir = info.path.parent().unwrap_or_else(|| Path::new("."));
            report.hdr10_copy = Some(self.hdr10_sibling(info, dir));
        }

        if !plan.needs_processing() && !plan.has_extractable_subtitles() {
            report.status = FileStatus::Success;
            report.output_path = Some(info.path.clone());
            return report;
        }

        match self.produce(info, plan, &candidate) {
            Ok(transform) => report.transform = Some(transform),
            Err(e) => return report.fail(e.to_string()),
        }

        match replace_original(
            &RealFs,
            &info.path,
            &candidate,
            &final_path,
            self.owner.as_ref(),
        ) {
            Ok(committed) => {
                report.status = FileStatus::Success;
                report.output_path = Some(committed);
                report
            }
            Err(e) => report.fail(e.to_string()),
        }
    }

    /// Copy a file into `dest_dir`, remediating on the way.
    ///
    /// The source is never modified. Files needing a transcode or remux land
    /// as `<stem>.mkv`; anything else is copied under its own name.
    pub fn import_file(
        &self,
        info: &MediaInfo,
        plan: &RemediationPlan,
        dest_dir: &Path,
        library_root: &Path,
        dry_run: bool,
    ) -> ImportReport {
        let file_name = info.path.file_name().unwrap_or_default();
        let stem = info
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let action = if plan.needs_processing() {
            ImportAction::Transcode
        } else if plan.has_extractable_subtitles() {
            ImportAction::Remux
        } else {
            ImportAction::Copy
        };
        let destination = match action {
            ImportAction::Copy => dest_dir.join(file_name),
            _ => dest_dir.join(format!("{}.mkv", stem)),
        };

        let mut report = ImportReport {
            source: info.path.clone(),
            destination: destination.clone(),
            status: ImportStatus::WouldImport,
            action,
            subtitle_action: plan.subtitle_description(),
            dovi_action: plan.dovi_description(),
            subtitles_extracted: Vec::new(),
            hdr10_copy: None,
            transform: None,
            error: None,
        };

        if dry_run {
            return report;
        }

        if let Err(e) = std::fs::create_dir_all(dest_dir) {
            return report.fail(format!("Failed to create {:?}: {}", dest_dir, e));
        }
        if let Some(owner) = &self.owner {
            let mut current = dest_dir;
            while current != library_root {
                self.chown(current, owner);
                match current.parent() {
                    Some(parent) if parent != current => current = parent,
                    _ => break,
                }
            }
        }

        if plan.has_extractable_subtitles() {
            tracing::info!("Extracting subtitles from {:?}", file_name);
            report.subtitles_extracted =
                extract_subtitles(self.runner, info, &destination, self.ocr_timeout);
        }

        match action {
            ImportAction::Copy => {
                tracing::info!("Copying {:?}", file_name);
                if let Err(e) = std::fs::copy(&info.path, &destination) {
                    return report.fail(format!("Copy failed: {}", e));
                }
            }
            _ => {
                let temp = dest_dir.join(format!("{}.importing.mkv", stem));
                match self.produce(info, plan, &temp) {
                    Ok(transform) => report.transform = Some(transform),
                    Err(e) => return report.fail(e.to_string()),
                }
                if let Err(e) = std::fs::rename(&temp, &destination) {
                    discard(&temp);
                    return report.fail(format!("Rename failed: {}", e));
                }
            }
        }

        if let Some(owner) = &self.owner {
            self.chown(&destination, owner);
        }

        if plan.needs_hdr10_copy() {
            report.hdr10_copy = Some(self.hdr10_sibling(info, dest_dir));
        }

        report.status = ImportStatus::Success;
        report
    }

    /// Transcode or remux into `output` and validate it.
    ///
    /// `output` is removed on every failure.
    fn produce(
        &self,
        info: &MediaInfo,
        plan: &RemediationPlan,
        output: &Path,
    ) -> playfit_av::Result<TransformReport> {
        let result = if plan.needs_processing() {
            tracing::info!("Transcoding {:?}", info.path.file_name());
            run_with_fallback(self.runner, info, plan, output, &self.hardware).map(|outcome| {
                TransformReport {
                    mode: outcome.mode.to_string(),
                    fell_back: outcome.fell_back,
                }
            })
        } else {
            tracing::info!("Remuxing to strip subtitles: {:?}", info.path.file_name());
            self.remux(info, plan, output)
        };

        let result = result.and_then(|transform| {
            validate_output(self.runner, info, output)?;
            Ok(transform)
        });

        if result.is_err() {
            discard(output);
        }
        result
    }

    fn remux(
        &self,
        info: &MediaInfo,
        plan: &RemediationPlan,
        output: &Path,
    ) -> playfit_av::Result<TransformReport> {
        let args = build_transform_args(info, &plan.remux_only(), output, &EncodeMode::Software);
        let out = self.runner.run(Tool::Ffmpeg, &args, None)?;
        if !out.success() {
            let message = match out.stderr.trim() {
                "" => "Remux failed".to_string(),
                stderr => tail_chars(stderr, 500),
            };
            return Err(Error::transform("remux", message));
        }
        Ok(TransformReport {
            mode: "remux".to_string(),
            fell_back: false,
        })
    }

    fn hdr10_sibling(&self, info: &MediaInfo, dir: &Path) -> Hdr10Report {
        tracing::info!("Creating HDR10 copy for DoVi P8: {:?}", info.path.file_name());
        match create_hdr10_copy(self.runner, info, dir) {
            Ok(outcome) => Hdr10Report {
                success: true,
                message: outcome.message().to_string(),
                path: Some(outcome.path),
            },
            Err(e) => {
                tracing::warn!("HDR10 copy creation failed: {}", e);
                Hdr10Report {
                    success: false,
                    message: e.to_string(),
                    path: None,
                }
            }
        }
    }

    fn chown(&self, path: &Path, owner: &Owner) {
        if let Err(e) = ownership::apply(path, owner) {
            tracing::warn!("Ownership not applied to {:?}: {}", path, e);
        }
    }
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}
