mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./playfit.toml",
        "~/.config/playfit/config.toml",
        "/etc/playfit/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.subtitles.ocr_timeout_secs == 0 {
        anyhow::bail!("subtitles.ocr_timeout_secs cannot be 0");
    }

    if config.hardware.enabled && config.hardware.device.as_os_str().is_empty() {
        anyhow::bail!("hardware.device cannot be empty when hardware is enabled");
    }

    match (&config.ownership.user, &config.ownership.group) {
        (Some(_), None) => anyhow::bail!("ownership.user is set but ownership.group is not"),
        (None, Some(_)) => anyhow::bail!("ownership.group is set but ownership.user is not"),
        _ => {}
    }

    if config.plex.url.trim().is_empty() {
        anyhow::bail!("plex.url cannot be empty");
    }

    for (tool, path) in [
        ("ffmpeg", &config.tools.ffmpeg),
        ("ffprobe", &config.tools.ffprobe),
        ("mediainfo", &config.tools.mediainfo),
        ("ocr", &config.tools.ocr),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", tool, path);
            }
        }
    }

    Ok(())
}
