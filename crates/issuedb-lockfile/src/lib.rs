//! Process-level advisory locking for a storage engine data directory.
//!
//! One exclusive holder, or many shared holders, enforced across every
//! process that opens the same directory. The lock is per directory, not
//! per database file within it.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

/// The name of the lock file created inside the data directory.
const LOCK_FILE_NAME: &str = ".lock";

/// Minimum backoff between acquisition attempts while polling for the lock.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Errors from acquiring a [`DirLock`].
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock could not be acquired within the configured timeout.
    #[error("lock busy: {path} ({mode})")]
    LockBusy {
        /// Path to the lock file.
        path: PathBuf,
        /// Which kind of lock was requested.
        mode: &'static str,
    },

    /// Filesystem I/O failed while creating or locking the file.
    #[error("lock io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A held advisory lock on a data directory.
///
/// The lock is released when this value is dropped.
#[derive(Debug)]
pub struct DirLock {
    file: File,
    path: PathBuf,
}

impl DirLock {
    /// Acquires an exclusive lock on `dir`, for read-write opens.
    ///
    /// Blocks (polling) until `timeout` elapses, then returns
    /// [`LockError::LockBusy`].
    pub fn acquire_exclusive(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(dir, timeout, "exclusive", |file| FileExt::try_lock_exclusive(file))
    }

    /// Acquires a shared lock on `dir`, for read-only opens.
    ///
    /// Multiple shared holders may coexist; only a concurrent exclusive
    /// holder blocks this.
    pub fn acquire_shared(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(dir, timeout, "shared", |file| FileExt::try_lock_shared(file))
    }

    fn acquire(
        dir: &Path,
        timeout: Duration,
        mode: &'static str,
        try_lock: impl Fn(&File) -> std::io::Result<()>,
    ) -> Result<Self, LockError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match try_lock(&file) {
                Ok(()) => return Ok(Self { file, path }),
                Err(e) if is_lock_contended(&e) => {
                    if Instant::now() >= deadline {
                        return Err(LockError::LockBusy { path, mode });
                    }
                    std::thread::sleep(POLL_INTERVAL.min(timeout));
                }
                Err(e) => return Err(LockError::Io(e)),
            }
        }
    }

    /// Path to the underlying lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn is_lock_contended(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::WouldBlock
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_lock_blocks_second_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let _first = DirLock::acquire_exclusive(dir.path(), Duration::from_millis(200)).unwrap();

        let err = DirLock::acquire_exclusive(dir.path(), Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, LockError::LockBusy { mode: "exclusive", .. }));
    }

    #[test]
    fn shared_locks_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let first = DirLock::acquire_shared(dir.path(), Duration::from_millis(200)).unwrap();
        let second = DirLock::acquire_shared(dir.path(), Duration::from_millis(200)).unwrap();
        drop(first);
        drop(second);
    }

    #[test]
    fn exclusive_lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _lock = DirLock::acquire_exclusive(dir.path(), Duration::from_millis(200)).unwrap();
        }
        let _again = DirLock::acquire_exclusive(dir.path(), Duration::from_millis(200)).unwrap();
    }

    #[test]
    fn shared_blocks_behind_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let _excl = DirLock::acquire_exclusive(dir.path(), Duration::from_millis(200)).unwrap();
        let err = DirLock::acquire_shared(dir.path(), Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, LockError::LockBusy { mode: "shared", .. }));
    }
}
