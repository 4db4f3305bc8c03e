//! Reversible replacement of a library file by a validated artifact.

use crate::ownership::{self, Owner};
use crate::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem operations used by [`replace_original`].
pub trait FileOps {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`FileOps`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl FileOps for RealFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Backup location for `original`: the full file name plus `.bak`.
pub fn backup_path(original: &Path) -> PathBuf {
    let mut name = original.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    original.with_file_name(name)
}

/// Swap `candidate` into `final_path`, retiring `original`.
///
/// The original is renamed to its backup first, so at every step either the
/// original or the committed candidate exists. When the second rename fails
/// the backup is restored, the candidate is deleted and the library is left
/// as it was. On success ownership is applied best-effort before the backup
/// is removed.
pub fn replace_original(
    fs: &dyn FileOps,
    original: &Path,
    candidate: &Path,
    final_path: &Path,
    owner: Option<&Owner>,
) -> Result<PathBuf> {
    let backup = backup_path(original);

    fs.rename(original, &backup)
        .map_err(|e| Error::Filesystem(format!("Backup rename failed: {}", e)))?;

    if let Err(e) = fs.rename(candidate, final_path) {
        let restore = fs.rename(&backup, original);
        if let Err(re) = fs.remove_file(candidate) {
            tracing::debug!("Candidate {:?} not removed: {}", candidate, re);
        }
        return Err(match restore {
            Ok(()) => Error::Filesystem(format!("Rename failed: {}", e)),
            Err(re) => Error::Filesystem(format!(
                "Rename failed: {}; restoring backup {:?} also failed: {}",
                e, backup, re
            )),
        });
    }

    if let Some(owner) = owner {
        if let Err(e) = ownership::apply(final_path, owner) {
            tracing::warn!("Could not set ownership on {:?}: {}", final_path, e);
        }
    }

    if let Err(e) = fs.remove_file(&backup) {
        tracing::warn!("Backup {:?} left behind: {}", backup, e);
    }

    Ok(final_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;

    /// Fails the n-th rename (1-based), otherwise delegates to the real filesystem.
    struct FailingRename {
        fail_on: usize,
        count: Cell<usize>,
    }

    impl FileOps for FailingRename {
        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            self.count.set(self.count.get() + 1);
            if self.count.get() == self.fail_on {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "simulated"));
            }
            fs::rename(from, to)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            fs::remove_file(path)
        }
    }

    #[test]
    fn backup_keeps_original_extension() {
        assert_eq!(
            backup_path(Path::new("/lib/movie.mp4")),
            PathBuf::from("/lib/movie.mp4.bak")
        );
    }

    #[test]
    fn replaces_and_removes_backup() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("movie.mp4");
        let candidate = dir.path().join("movie.playfit.mkv");
        let final_path = dir.path().join("movie.mkv");
        fs::write(&original, b"old").unwrap();
        fs::write(&candidate, b"new").unwrap();

        let committed = replace_original(&RealFs, &original, &candidate, &final_path, None).unwrap();

        assert_eq!(committed, final_path);
        assert_eq!(fs::read(&final_path).unwrap(), b"new");
        assert!(!original.exists());
        assert!(!candidate.exists());
        assert!(!backup_path(&original).exists());
    }

    #[test]
    fn same_name_replacement() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("movie.mkv");
        let candidate = dir.path().join("movie.playfit.mkv");
        fs::write(&original, b"old").unwrap();
        fs::write(&candidate, b"new").unwrap();

        replace_original(&RealFs, &original, &candidate, &original, None).unwrap();

        assert_eq!(fs::read(&original).unwrap(), b"new");
        assert!(!backup_path(&original).exists());
    }

    #[test]
    fn failed_commit_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("movie.avi");
        let candidate = dir.path().join("movie.playfit.mkv");
        let final_path = dir.path().join("movie.mkv");
        fs::write(&original, b"original bytes").unwrap();
        fs::write(&candidate, b"new").unwrap();

        let ops = FailingRename {
            fail_on: 2,
            count: Cell::new(0),
        };
        let err = replace_original(&ops, &original, &candidate, &final_path, None).unwrap_err();

        assert!(matches!(err, Error::Filesystem(_)));
        assert_eq!(fs::read(&original).unwrap(), b"original bytes");
        assert!(!backup_path(&original).exists());
        assert!(!candidate.exists());
        assert!(!final_path.exists());
    }

    #[test]
    fn failed_backup_leaves_everything_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("movie.avi");
        let candidate = dir.path().join("movie.playfit.mkv");
        fs::write(&original, b"original bytes").unwrap();
        fs::write(&candidate, b"new").unwrap();

        let ops = FailingRename {
            fail_on: 1,
            count: Cell::new(0),
        };
        assert!(replace_original(&ops, &original, &candidate, &original, None).is_err());
        assert_eq!(fs::read(&original).unwrap(), b"original bytes");
    }
}
