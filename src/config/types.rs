use playfit_av::{HardwareConfig, Owner, ToolsConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub hardware: HardwareConfig,

    #[serde(default)]
    pub ownership: OwnershipConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub subtitles: SubtitlesConfig,

    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub plex: PlexConfig,
}

/// Owner applied to committed files. Both fields must be set to take effect.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OwnershipConfig {
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub group: Option<String>,
}

impl OwnershipConfig {
    pub fn owner(&self) -> Option<Owner> {
        match (&self.user, &self.group) {
            (Some(user), Some(group)) => Some(Owner {
                user: user.clone(),
                group: group.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directory for the daily JSONL audit files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Batch lock held for the duration of `process`
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/playfit")
}

fn default_lock_file() -> PathBuf {
    PathBuf::from("/var/run/playfit.lock")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            lock_file: default_lock_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubtitlesConfig {
    /// Time budget for a single OCR run (default: 600)
    #[serde(default = "default_ocr_timeout")]
    pub ocr_timeout_secs: u64,
}

fn default_ocr_timeout() -> u64 {
    600
}

impl SubtitlesConfig {
    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }
}

impl Default for SubtitlesConfig {
    fn default() -> Self {
        Self {
            ocr_timeout_secs: default_ocr_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    /// Root holding one directory per library; `~` is expanded
    #[serde(default = "default_library_root")]
    pub library_root: String,

    #[serde(default = "default_library")]
    pub default_library: String,
}

fn default_library_root() -> String {
    "~/media".to_string()
}

fn default_library() -> String {
    "movies".to_string()
}

impl ImportConfig {
    pub fn library_root_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.library_root).as_ref())
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            library_root: default_library_root(),
            default_library: default_library(),
        }
    }
}

/// Plex server notified after files land in the library.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlexConfig {
    #[serde(default = "default_plex_url")]
    pub url: String,

    /// Explicit token; falls back to `PLEX_TOKEN` and then the server's
    /// Preferences.xml
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_plex_prefs")]
    pub prefs_path: PathBuf,

    /// Trigger a partial scan after `process` and `import`
    #[serde(default)]
    pub scan_after: bool,
}

fn default_plex_url() -> String {
    "http://localhost:32400".to_string()
}

fn default_plex_prefs() -> PathBuf {
    PathBuf::from(
        "/var/lib/plexmediaserver/Library/Application Support/Plex Media Server/Preferences.xml",
    )
}

impl Default for PlexConfig {
    fn default() -> Self {
        Self {
            url: default_plex_url(),
            token: None,
            prefs_path: default_plex_prefs(),
            scan_after: false,
        }
    }
}
