//! Exclusive batch lock.
//!
//! A second `process` run fails immediately instead of queuing behind the
//! first one.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Held for the lifetime of a batch. Releasing unlocks and removes the file.
#[derive(Debug)]
pub struct BatchLock {
    path: PathBuf,
    #[cfg(unix)]
    _file: nix::fcntl::Flock<std::fs::File>,
}

impl BatchLock {
    /// Take a non-blocking exclusive `flock` on `path` and record our pid in it.
    #[cfg(unix)]
    pub fn acquire(path: &Path) -> Result<Self> {
        use nix::fcntl::{Flock, FlockArg};
        use std::io::Write;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create lock directory {:?}", parent))?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open lock file {:?}", path))?;

        let mut file = Flock::lock(file, FlockArg::LockExclusiveNonblock)
            .map_err(|(_, errno)| anyhow::anyhow!("Failed to acquire lock {:?}: {}", path, errno))?;

        file.set_len(0)?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;

        tracing::debug!("Acquired batch lock {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    #[cfg(not(unix))]
    pub fn acquire(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BatchLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!("Lock file {:?} not removed: {}", self.path, e);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run/playfit.lock");

        let lock = BatchLock::acquire(&path).unwrap();
        let pid = std::fs::read_to_string(&path).unwrap();
        assert_eq!(pid, std::process::id().to_string());

        let err = BatchLock::acquire(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to acquire lock"));

        drop(lock);
        assert!(!path.exists());

        let again = BatchLock::acquire(&path).unwrap();
        assert_eq!(again.path(), path.as_path());
    }
}
