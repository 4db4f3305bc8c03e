//! Plex library scan client.
//!
//! Resolves a filesystem path to the library section whose location is the
//! longest prefix of it and asks Plex for a partial scan of that path.

use crate::config::PlexConfig;
use anyhow::{Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variables consulted when no token is configured.
const TOKEN_ENV_VARS: &[&str] = &["PLAYFIT_PLEX_TOKEN", "PLEX_TOKEN"];

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub path: String,
}

/// A Plex library section.
#[derive(Debug, Clone, Deserialize)]
pub struct Section {
    pub key: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "Location", default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct SectionsResponse {
    #[serde(rename = "MediaContainer")]
    container: SectionsContainer,
}

#[derive(Debug, Default, Deserialize)]
struct SectionsContainer {
    #[serde(rename = "Directory", default)]
    directories: Vec<Section>,
}

/// Parse a `/library/sections` JSON body.
pub fn parse_sections(json: &str) -> Result<Vec<Section>> {
    let parsed: SectionsResponse =
        serde_json::from_str(json).context("Malformed Plex sections response")?;
    Ok(parsed.container.directories)
}

/// Section with the longest location that contains `target`.
pub fn find_section<'a>(sections: &'a [Section], target: &Path) -> Option<&'a Section> {
    sections
        .iter()
        .flat_map(|s| s.locations.iter().map(move |l| (s, Path::new(&l.path))))
        .filter(|(_, loc)| target.starts_with(loc))
        .max_by_key(|(_, loc)| loc.as_os_str().len())
        .map(|(s, _)| s)
}

/// `PlexOnlineToken` attribute of a Preferences.xml document.
pub fn token_from_prefs(xml: &str) -> Option<String> {
    let re = Regex::new(r#"PlexOnlineToken="([^"]+)""#).ok()?;
    re.captures(xml).map(|c| c[1].to_string())
}

/// Token from config, then the environment, then Preferences.xml.
pub fn resolve_token(config: &PlexConfig) -> Option<String> {
    if let Some(token) = config.token.as_ref().filter(|t| !t.is_empty()) {
        return Some(token.clone());
    }

    for var in TOKEN_ENV_VARS {
        if let Ok(token) = std::env::var(var) {
            if !token.is_empty() {
                return Some(token);
            }
        }
    }

    match std::fs::read_to_string(&config.prefs_path) {
        Ok(xml) => token_from_prefs(&xml),
        Err(e) => {
            tracing::debug!("Cannot read {:?}: {}", config.prefs_path, e);
            None
        }
    }
}

pub struct PlexClient {
    client: Client,
    base_url: String,
    token: String,
}

impl PlexClient {
    pub fn new(config: &PlexConfig) -> Result<Self> {
        let token = resolve_token(config).context(
            "No Plex token found. Set plex.token, PLAYFIT_PLEX_TOKEN or PLEX_TOKEN, \
             or make Preferences.xml readable",
        )?;
        Ok(Self::with_token(&config.url, token))
    }

    pub fn with_token(url: &str, token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .with_context(|| format!("Plex API unreachable: {}", self.base_url))?;

        if !response.status().is_success() {
            anyhow::bail!("Plex API HTTP {}: {}", response.status(), path);
        }

        Ok(response.text()?)
    }

    /// All library sections.
    pub fn sections(&self) -> Result<Vec<Section>> {
        let body = self.get("/library/sections", &[])?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_sections(&body)
    }

    /// Refresh a section, limited to `path` when given.
    pub fn refresh(&self, key: &str, path: Option<&Path>) -> Result<()> {
        let query: Vec<(&str, String)> = path
            .map(|p| vec![("path", p.to_string_lossy().to_string())])
            .unwrap_or_default();
        self.get(&format!("/library/sections/{}/refresh", key), &query)?;
        Ok(())
    }

    /// Partial scan of the section holding `target`.
    ///
    /// Returns the section scanned, or `None` when no section contains it.
    pub fn scan_path(&self, target: &Path) -> Result<Option<Section>> {
        let target = target
            .canonicalize()
            .unwrap_or_else(|_| PathBuf::from(target));
        let sections = self.sections()?;

        let Some(section) = find_section(&sections, &target) else {
            return Ok(None);
        };
        self.refresh(&section.key, Some(target.as_path()))?;
        Ok(Some(section.clone()))
    }
}

/// Best-effort partial scan after files changed under `target`.
pub fn notify(config: &PlexConfig, target: &Path) {
    let result = PlexClient::new(config).and_then(|client| client.scan_path(target));
    match result {
        Ok(Some(section)) => tracing::info!(
            "Triggered Plex scan: {} (section {}) -> {:?}",
            section.title,
            section.key,
            target
        ),
        Ok(None) => tracing::warn!("No Plex library section found for {:?}", target),
        Err(e) => tracing::warn!("Plex scan failed for {:?}: {:#}", target, e),
    }
}
