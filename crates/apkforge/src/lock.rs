//! Output directory lock
//!
//! Two builds writing the same output directory would delete each other's
//! scaffold. The guard holds an OS advisory lock on a file in the output
//! directory. The kernel drops the lock when the process exits, so a build
//! that was killed never blocks the next one; the file itself stays behind.

use std::fs;
use std::path::{Path, PathBuf};

use fslock::LockFile;
use tracing::debug;

use crate::error::{BuildError, IoResultExt, Result};

/// Lock file name inside the output directory
pub const LOCK_FILE_NAME: &str = ".apkforge.lock";

/// Held for the duration of one build
pub struct WorkspaceLock {
    lock: LockFile,
    path: PathBuf,
}

impl WorkspaceLock {
    /// Take the lock for `output_dir`, failing fast if another build holds it
    pub fn acquire(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir).with_path("create", output_dir)?;
        let path = output_dir.join(LOCK_FILE_NAME);

        let mut lock = LockFile::open(&path).with_path("open", &path)?;
        // Writes our pid into the file once held
        let acquired = lock.try_lock_with_pid().with_path("lock", &path)?;
        if !acquired {
            return Err(BuildError::Locked { path });
        }

        debug!("Lock acquired: {}", path.display());
        Ok(Self { lock, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if self.lock.owns_lock() {
            let _ = self.lock.unlock();
            debug!("Lock released: {}", self.path.display());
        }
    }
}

impl std::fmt::Debug for WorkspaceLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceLock").field("path", &self.path).finish()
    }
}
