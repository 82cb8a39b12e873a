//! Per-operation file locking for the update core.
//!
//! Check, stage, and install must never overlap with another invocation of
//! themselves, whether from a second host window or a background task. Each
//! operation takes an exclusive, non-blocking lock on
//! `<data_dir>/.locks/<operation>.lock` next to the persisted state; a
//! contended lock fails fast instead of queueing behind a long download.
//! The lock is released when the guard is dropped.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::UpdateError;

/// Guard holding the exclusive lock for one operation.
#[derive(Debug)]
pub struct OperationLock {
    file: File,
    operation: String,
    lock_path: PathBuf,
}

impl OperationLock {
    /// Try to take the lock for `operation` without waiting.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::OperationInProgress`] if the lock is already held
    /// - [`UpdateError::StoreError`] if the lock file cannot be created
    pub fn try_acquire(locks_dir: &Path, operation: &str) -> Result<Self, UpdateError> {
        std::fs::create_dir_all(locks_dir).map_err(|e| UpdateError::StoreError {
            path: locks_dir.display().to_string(),
            reason: format!("failed to create locks directory: {e}"),
        })?;

        let lock_path = locks_dir.join(format!("{operation}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| UpdateError::StoreError {
                path: lock_path.display().to_string(),
                reason: format!("failed to open lock file: {e}"),
            })?;

        match file.try_lock_exclusive() {
            Ok(true) => {
                debug!(operation, "Operation lock acquired");
                Ok(Self {
                    file,
                    operation: operation.to_string(),
                    lock_path,
                })
            }
            Ok(false) => Err(UpdateError::OperationInProgress {
                operation: operation.to_string(),
            }),
            Err(e) => Err(UpdateError::StoreError {
                path: lock_path.display().to_string(),
                reason: format!("failed to lock: {e}"),
            }),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

/// Exclusive lock held while the Store is read, modified and written back.
///
/// Unlike [`OperationLock`] this one waits, since a Store update takes
/// milliseconds. It keeps a check that finishes during a download from
/// being overwritten when the stage is recorded.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    lock_path: PathBuf,
}

impl StoreLock {
    /// Block until the lock at `lock_path` is held.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::StoreError`] if the lock file cannot be opened
    /// or locked.
    pub fn acquire(lock_path: PathBuf) -> Result<Self, UpdateError> {
        let store_error = |reason: String| UpdateError::StoreError {
            path: lock_path.display().to_string(),
            reason,
        };

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| store_error(format!("failed to create {}: {e}", parent.display())))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| store_error(format!("failed to open lock file: {e}")))?;
        file.lock_exclusive().map_err(|e| store_error(format!("failed to lock: {e}")))?;

        Ok(Self {
            file,
            lock_path,
        })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = self.file.unlock() {
            debug!(lock = %self.lock_path.display(), error = %e, "Failed to unlock");
        }
    }
}

impl Drop for OperationLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = self.file.unlock() {
            debug!(lock = %self.lock_path.display(), error = %e, "Failed to unlock");
        } else {
            debug!(operation = %self.operation, "Operation lock released");
        }
    }
}
