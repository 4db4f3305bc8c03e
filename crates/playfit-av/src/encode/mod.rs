//! Transform command synthesis and execution.

mod args;
mod fallback;

pub use args::{build_transform_args, DOWNMIX_FILTER};
pub use fallback::{is_accelerator_failure, run_with_fallback, TransformOutcome};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Encoder family used for one transform attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeMode {
    /// VAAPI decode and encode on the given render device.
    Hardware { device: PathBuf },
    /// libx265 on the CPU.
    Software,
}

impl fmt::Display for EncodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeMode::Hardware { .. } => f.write_str("hardware"),
            EncodeMode::Software => f.write_str("software"),
        }
    }
}

/// Hardware acceleration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// DRM render node used for VAAPI.
    #[serde(default = "default_device")]
    pub device: PathBuf,
}

fn default_enabled() -> bool {
    true
}

fn default_device() -> PathBuf {
    PathBuf::from("/dev/dri/renderD128")
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            device: default_device(),
        }
    }
}
