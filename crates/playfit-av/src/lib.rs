//! # playfit-av
//!
//! Probing, compatibility analysis and remediation of media files for a
//! fixed hardware decoder.
//!
//! This crate provides:
//!
//! - **Tool execution** ([`ToolRunner`], [`SystemRunner`]) -- every external
//!   program runs through one trait so callers can substitute fakes.
//! - **Probing** ([`probe::probe`]) -- a single [`MediaInfo`] per file, with
//!   Dolby Vision profile recovery.
//! - **Analysis** ([`analyze()`]) -- a pure function from [`MediaInfo`] to an
//!   immutable [`RemediationPlan`].
//! - **Transforms** ([`encode`]) -- command synthesis and hardware-first
//!   execution with a software fallback.
//! - **Artifacts** ([`subtitles`], [`hdr10`]) -- sidecar subtitles with OCR
//!   and HDR10 siblings of profile 8 sources.
//! - **Commit** ([`validate`], [`replace`]) -- output checks and the
//!   backup-then-swap replacement of library files.
//!
//! ```no_run
//! use playfit_av::{analyze, probe, SystemRunner, ToolsConfig};
//! use std::path::Path;
//!
//! let runner = SystemRunner::new(ToolsConfig::default());
//! let info = probe::probe(&runner, Path::new("/media/movies/Movie.mkv"))?;
//! let plan = analyze(&info);
//! println!("{}", plan.video_description());
//! # Ok::<(), playfit_av::Error>(())
//! ```

pub mod analyze;
pub mod command;
pub mod encode;
mod error;
pub mod hdr10;
pub mod ownership;
pub mod probe;
pub mod replace;
pub mod subtitles;
pub mod tools;
pub mod validate;

// ---- Re-exports for convenience ----

pub use analyze::{analyze, hardware_eligible, AudioAction, RemediationPlan, VideoAction};
pub use command::{SystemRunner, ToolCommand, ToolOutput, ToolRunner};
pub use encode::{EncodeMode, HardwareConfig, TransformOutcome};
pub use error::{tail_chars, Error, Result};
pub use hdr10::{create_hdr10_copy, Hdr10Outcome};
pub use ownership::Owner;
pub use probe::{AudioTrack, HdrKind, MediaInfo, SubtitleTrack, VideoInfo};
pub use replace::{replace_original, FileOps, RealFs};
pub use subtitles::{extract_subtitles, ExtractionReport};
pub use tools::{check_tools, Tool, ToolInfo, ToolsConfig};
pub use validate::validate_output;
