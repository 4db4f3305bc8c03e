//! Hardware-first transform execution with a single software retry.

use super::{build_transform_args, EncodeMode, HardwareConfig};
use crate::analyze::{hardware_eligible, RemediationPlan};
use crate::command::ToolRunner;
use crate::error::tail_chars;
use crate::probe::MediaInfo;
use crate::tools::Tool;
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;

/// Longest diagnostic tail kept from a failed transform.
const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// Stderr fragments meaning the accelerator itself failed to initialize.
const ACCELERATOR_FAILURE_SIGNATURES: &[&str] = &[
    "failed setup for format vaapi",
    "hwaccel initialisation returned error",
    "impossible to convert between the formats",
    "error reinitializing filters",
    "failed to inject frame into filter network",
];

/// A successful transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformOutcome {
    /// Mode of the attempt that produced the output.
    pub mode: EncodeMode,
    /// A hardware attempt failed before this one.
    pub fell_back: bool,
}

/// Whether stderr from a hardware attempt matches an accelerator failure.
pub fn is_accelerator_failure(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    ACCELERATOR_FAILURE_SIGNATURES
        .iter()
        .any(|sig| stderr.contains(sig))
}

/// Run the transform, trying hardware first when eligible.
///
/// A hardware failure whose stderr matches an accelerator signature deletes the
/// partial output and retries once in software. Any other hardware failure is
/// terminal. The software attempt is always terminal.
pub fn run_with_fallback(
    runner: &dyn ToolRunner,
    info: &MediaInfo,
    plan: &RemediationPlan,
    output: &Path,
    hardware: &HardwareConfig,
) -> Result<TransformOutcome> {
    let mut fell_back = false;

    if hardware_eligible(info, plan, hardware.enabled) {
        let mode = EncodeMode::Hardware {
            device: hardware.device.clone(),
        };
        tracing::info!("Attempting hardware transcode of {:?}", info.path);
        let result = runner.run(
            Tool::Ffmpeg,
            &build_transform_args(info, plan, output, &mode),
            None,
        )?;

        if result.success() {
            return Ok(TransformOutcome { mode, fell_back });
        }

        if !is_accelerator_failure(&result.stderr) {
            return Err(Error::transform(&mode, diagnostic(&result.stderr)));
        }

        tracing::warn!("Hardware transcode failed, falling back to software");
        remove_partial(output);
        fell_back = true;
    }

    let mode = EncodeMode::Software;
    tracing::info!("Using software transcode for {:?}", info.path);
    let result = runner.run(
        Tool::Ffmpeg,
        &build_transform_args(info, plan, output, &mode),
        None,
    )?;

    if result.success() {
        Ok(TransformOutcome { mode, fell_back })
    } else {
        Err(Error::transform(&mode, diagnostic(&result.stderr)))
    }
}

fn diagnostic(stderr: &str) -> String {
    match stderr.trim() {
        "" => "unknown error".to_string(),
        text => tail_chars(text, MAX_DIAGNOSTIC_CHARS),
    }
}

fn remove_partial(output: &Path) {
    if output.exists() {
        if let Err(e) = std::fs::remove_file(output) {
            tracing::warn!("Failed to remove partial output {:?}: {}", output, e);
        }
    }
}
