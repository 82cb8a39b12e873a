use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::backup_path_for;
use crate::constants::RESTORE_ATTEMPTS;
use crate::core::UpdateError;
use crate::utils::backoff::retry_schedule;
use crate::utils::fs::{copy_dir_except, ensure_dir, remove_dir_all, sync_dir_from, tree_differences};

/// Snapshot and restore of the live plugin directory around an install.
///
/// The snapshot is a full copy in a sibling directory named
/// `<plugin_dir>.backup`, so it lives on the same filesystem as the live
/// code and survives until the install either succeeds (backup deleted) or
/// fails and is rolled back (backup restored, then deleted). A restore that
/// itself fails leaves the backup in place for manual recovery.
///
/// Restoration retries with a short exponential backoff because the usual
/// cause of a failed install, a file held open by the host, is often
/// transient.
///
/// # Examples
///
/// ```rust,no_run
/// use lightgroup_tools::updater::BackupManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), lightgroup_tools::core::UpdateError> {
/// let backup = BackupManager::new(PathBuf::from("/addons/lightgroup_tools"));
/// backup.create_backup().await?;
///
/// // ... replace the plugin files ...
/// let install_failed = false;
/// if install_failed {
///     backup.restore_backup(&["__pycache__".to_string()]).await?;
/// }
/// backup.cleanup_backup().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupManager {
    original_path: PathBuf,
    backup_path: PathBuf,
}

impl BackupManager {
    pub fn new(original_path: PathBuf) -> Self {
        let backup_path = backup_path_for(&original_path);
        Self {
            original_path,
            backup_path,
        }
    }

    /// Copy the live directory to the backup location, replacing any old backup.
    ///
    /// A missing live directory yields an empty backup, so a later restore
    /// returns the plugin to "no files" rather than failing.
    pub async fn create_backup(&self) -> Result<usize, UpdateError> {
        let original = self.original_path.clone();
        let backup = self.backup_path.clone();

        info!(backup = %backup.display(), "Creating plugin backup");
        let copied = run_blocking(move || {
            remove_dir_all(&backup)?;
            if original.exists() {
                copy_dir_except(&original, &backup, &[])
            } else {
                ensure_dir(&backup)?;
                Ok(0)
            }
        })
        .await
        .map_err(|e| UpdateError::InstallError {
            reason: format!("failed to back up {}: {e:#}", self.original_path.display()),
        })?;

        debug!(files = copied, "Backup created");
        Ok(copied)
    }

    /// Put the backed-up files back into the live directory.
    ///
    /// Each attempt syncs the live directory to the backup entry by entry,
    /// sparing `preserve`, and then compares the two trees. An entry that
    /// cannot be removed or replaced only fails the attempt if it differs
    /// from the backup, so a locked file that was never changed does not
    /// block the restore. Up to
    /// [`RESTORE_ATTEMPTS`](crate::constants::RESTORE_ATTEMPTS) attempts are
    /// made.
    pub async fn restore_backup(&self, preserve: &[String]) -> Result<(), UpdateError> {
        if !self.backup_exists() {
            return Err(UpdateError::InstallError {
                reason: format!("no backup found at {}", self.backup_path.display()),
            });
        }

        warn!(backup = %self.backup_path.display(), "Restoring plugin from backup");

        let mut delays = retry_schedule(RESTORE_ATTEMPTS);
        let mut attempt = 1;
        loop {
            match self.attempt_restore(preserve).await {
                Ok(()) => {
                    info!(attempt, "Plugin restored from backup");
                    return Ok(());
                }
                Err(e) => match delays.next() {
                    Some(delay) => {
                        warn!(attempt, error = %format!("{e:#}"), "Restore attempt failed, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        return Err(UpdateError::InstallError {
                            reason: format!(
                                "failed to restore from backup after {attempt} attempts: {e:#}"
                            ),
                        });
                    }
                },
            }
        }
    }

    async fn attempt_restore(&self, preserve: &[String]) -> anyhow::Result<()> {
        let original = self.original_path.clone();
        let backup = self.backup_path.clone();
        let preserve = preserve.to_vec();

        run_blocking(move || {
            let failures = sync_dir_from(&backup, &original, &preserve);
            for failure in &failures {
                debug!(error = %format!("{failure:#}"), "Entry not restored, comparing with backup");
            }

            let differing = tree_differences(&backup, &original, &preserve)?;
            if differing.is_empty() {
                return Ok(());
            }

            let paths: Vec<String> = differing.iter().map(|path| path.display().to_string()).collect();
            let summary = format!("{} entries differ from the backup: {}", paths.len(), paths.join(", "));
            Err(match failures.into_iter().next() {
                Some(cause) => cause.context(summary),
                None => anyhow::anyhow!(summary),
            })
        })
        .await
    }

    /// Delete the backup; succeeds if there is none.
    pub async fn cleanup_backup(&self) -> Result<(), UpdateError> {
        if !self.backup_exists() {
            return Ok(());
        }

        debug!(backup = %self.backup_path.display(), "Removing backup");
        let backup = self.backup_path.clone();
        run_blocking(move || remove_dir_all(&backup)).await.map_err(|e| {
            UpdateError::PermissionDenied {
                operation: "remove backup".to_string(),
                path: format!("{} ({e:#})", self.backup_path.display()),
            }
        })
    }

    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}

/// Run synchronous filesystem work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
