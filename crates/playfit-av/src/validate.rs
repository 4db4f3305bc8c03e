//! Output validation before an artifact is trusted.

use crate::command::ToolRunner;
use crate::probe::{self, MediaInfo};
use crate::{Error, Result};
use std::path::Path;

/// Minimum output size as a fraction of the input size.
const MIN_SIZE_RATIO: f64 = 0.1;

/// Largest tolerated relative duration difference.
const MAX_DURATION_DRIFT: f64 = 0.01;

/// Check a candidate output against its source.
///
/// Rejects a missing or truncated file, a duration drift above 1%, and a
/// missing video or audio stream. Duration and stream probes that fail are
/// skipped rather than counted against the candidate.
pub fn validate_output(runner: &dyn ToolRunner, source: &MediaInfo, output: &Path) -> Result<()> {
    if !output.exists() {
        return Err(Error::Validation("Output file does not exist".to_string()));
    }

    let output_size = std::fs::metadata(output)?.len();
    let input_size = std::fs::metadata(&source.path)?.len();

    if (output_size as f64) < input_size as f64 * MIN_SIZE_RATIO {
        return Err(Error::Validation(format!(
            "Output too small: {} vs {}",
            output_size, input_size
        )));
    }

    let out_duration = probe::container_duration(runner, output);
    let in_duration = probe::container_duration(runner, &source.path);
    if let (Some(out_dur), Some(in_dur)) = (out_duration, in_duration) {
        if in_dur > 0.0 && out_dur > 0.0 {
            let drift = (out_dur - in_dur).abs() / in_dur;
            if drift > MAX_DURATION_DRIFT {
                return Err(Error::Validation(format!(
                    "Duration mismatch: {:.1}s vs {:.1}s",
                    in_dur, out_dur
                )));
            }
        }
    }

    match probe::stream_types(runner, output) {
        Ok(types) => {
            if !types.iter().any(|t| t == "video") {
                return Err(Error::Validation("Output missing video stream".to_string()));
            }
            if !source.audio_tracks.is_empty() && !types.iter().any(|t| t == "audio") {
                return Err(Error::Validation("Output missing audio stream".to_string()));
            }
        }
        Err(e) => tracing::debug!("Stream check skipped for {:?}: {}", output, e),
    }

    Ok(())
}
