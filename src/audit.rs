//! Append-only daily JSONL audit trail.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct Record<'a, T: Serialize> {
    timestamp: DateTime<Local>,
    #[serde(flatten)]
    entry: &'a T,
}

/// Writer for `<log_dir>/<kind>-YYYY-MM-DD.jsonl`.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
    kind: String,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>, kind: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            kind: kind.into(),
        }
    }

    /// File receiving today's records.
    pub fn current_file(&self) -> PathBuf {
        daily_file(&self.dir, &self.kind, Local::now())
    }

    /// Append one record with a `timestamp` field.
    pub fn append<T: Serialize>(&self, entry: &T) -> Result<()> {
        let now = Local::now();
        let line = serde_json::to_string(&Record {
            timestamp: now,
            entry,
        })?;

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create log directory {:?}", self.dir))?;
        let path = daily_file(&self.dir, &self.kind, now);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open audit log {:?}", path))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// [`append`](Self::append), logging instead of failing.
    pub fn record<T: Serialize>(&self, entry: &T) {
        if let Err(e) = self.append(entry) {
            tracing::warn!("Audit log write failed: {:#}", e);
        }
    }
}

fn daily_file(dir: &Path, kind: &str, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}-{}.jsonl", kind, now.format("%Y-%m-%d")))
}
