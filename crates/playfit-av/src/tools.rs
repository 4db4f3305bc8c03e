//! External tool detection and management.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// External tools the pipeline delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Encode/decode engine.
    Ffmpeg,
    /// Stream prober.
    Ffprobe,
    /// Metadata tool used for Dolby Vision profile recovery.
    Mediainfo,
    /// Bitmap-to-text subtitle ripper.
    Ocr,
}

impl Tool {
    /// All known tools, in the order `check-tools` reports them.
    pub const ALL: [Tool; 4] = [Tool::Ffmpeg, Tool::Ffprobe, Tool::Mediainfo, Tool::Ocr];

    /// Default executable name looked up on `PATH`.
    pub fn default_program(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
            Tool::Mediainfo => "mediainfo",
            Tool::Ocr => "pgsrip",
        }
    }

    fn version_arg(self) -> &'static str {
        match self {
            Tool::Ffmpeg | Tool::Ffprobe => "-version",
            Tool::Mediainfo | Tool::Ocr => "--version",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_program())
    }
}

/// Optional explicit executable paths. Unset entries resolve through `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe: Option<PathBuf>,

    #[serde(default)]
    pub mediainfo: Option<PathBuf>,

    #[serde(default)]
    pub ocr: Option<PathBuf>,
}

impl ToolsConfig {
    /// Configured path for a tool, if any.
    pub fn configured(&self, tool: Tool) -> Option<&Path> {
        match tool {
            Tool::Ffmpeg => self.ffmpeg.as_deref(),
            Tool::Ffprobe => self.ffprobe.as_deref(),
            Tool::Mediainfo => self.mediainfo.as_deref(),
            Tool::Ocr => self.ocr.as_deref(),
        }
    }

    /// Program to spawn for a tool: the configured path, or its default name.
    pub fn program(&self, tool: Tool) -> PathBuf {
        self.configured(tool)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(tool.default_program()))
    }
}

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// First line of the version output, if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check whether a tool can be executed and collect its version.
pub fn check_tool(tool: Tool, tools: &ToolsConfig) -> ToolInfo {
    let program = tools.program(tool);
    let result = Command::new(&program).arg(tool.version_arg()).output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            ToolInfo {
                name: tool.to_string(),
                available: true,
                version,
                path: which::which(&program).ok(),
            }
        }
        _ => ToolInfo {
            name: tool.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check every tool the pipeline uses.
pub fn check_tools(tools: &ToolsConfig) -> Vec<ToolInfo> {
    Tool::ALL.iter().map(|t| check_tool(*t, tools)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_prefers_configured_path() {
        let tools = ToolsConfig {
            ffmpeg: Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")),
            ..Default::default()
        };
        assert_eq!(
            tools.program(Tool::Ffmpeg),
            PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(tools.program(Tool::Ocr), PathBuf::from("pgsrip"));
    }

    #[test]
    fn missing_tool_is_unavailable() {
        let tools = ToolsConfig {
            mediainfo: Some(PathBuf::from("/nonexistent/mediainfo_12345")),
            ..Default::default()
        };
        let info = check_tool(Tool::Mediainfo, &tools);
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }
}
