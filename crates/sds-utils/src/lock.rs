//! Advisory, process-wide exclusive lock over one archive root.
//!
//! The pipeline executor is not designed for two manager processes to run
//! against the same archive root concurrently (spec.md §5: "no distributed
//! coordination across manager instances"). This lock prevents two runs
//! from racing on the same root; it is advisory only, not a security
//! boundary.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fd_lock::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("archive root '{0}' is already locked by another process")]
    AlreadyLocked(PathBuf),
    #[error("failed to open lock file at {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
}

/// Holds an exclusive advisory lock on `<archive_root>/.sds-rulemgr.lock`
/// for the lifetime of this value.
pub struct ArchiveLock {
    _lock: RwLock<File>,
    path: PathBuf,
}

impl ArchiveLock {
    /// Acquire the lock, failing immediately (non-blocking) if another
    /// process already holds it.
    pub fn acquire(archive_root: &Path) -> Result<Self, LockError> {
        fs::create_dir_all(archive_root).map_err(|source| LockError::Open {
            path: archive_root.to_path_buf(),
            source,
        })?;
        let path = archive_root.join(".sds-rulemgr.lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        let mut lock = RwLock::new(file);
        lock.try_write()
            .map_err(|_| LockError::AlreadyLocked(archive_root.to_path_buf()))?;

        Ok(Self { _lock: lock, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_on_same_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let _first = ArchiveLock::acquire(dir.path()).unwrap();
        let second = ArchiveLock::acquire(dir.path());
        assert!(matches!(second, Err(LockError::AlreadyLocked(_))));
    }

    #[test]
    fn lock_is_released_when_dropped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _first = ArchiveLock::acquire(dir.path()).unwrap();
        }
        let second = ArchiveLock::acquire(dir.path());
        assert!(second.is_ok());
    }
}
