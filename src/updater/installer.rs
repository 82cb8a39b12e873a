use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::UpdateError;
use crate::host::PluginHost;
use crate::updater::backup::{BackupManager, run_blocking};
use crate::updater::state::{StateStore, UpdateState};
use crate::utils::fs::{clear_dir_except, copy_dir_except};

/// Summary of a completed install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Version that is now on disk.
    pub version: String,
    /// Number of files copied into the live directory.
    pub files_installed: usize,
    /// Whether the host reloaded the plugin in place. When `false` the new
    /// version takes effect after the next restart.
    pub reloaded: bool,
}

/// Replaces the live plugin directory with the staged payload.
///
/// The replacement runs under a backup: the live directory is snapshotted,
/// cleared (sparing the preserved cache entries), and refilled from the
/// stage. If clearing or copying fails the snapshot is restored, the stage
/// is kept for a later retry, and the install fails with
/// [`UpdateError::InstallError`].
pub struct Installer {
    live_dir: PathBuf,
    extract_dir: PathBuf,
    preserve: Vec<String>,
    module_name: String,
    host: Arc<dyn PluginHost>,
    backup: BackupManager,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("live_dir", &self.live_dir)
            .field("extract_dir", &self.extract_dir)
            .field("preserve", &self.preserve)
            .field("module_name", &self.module_name)
            .finish_non_exhaustive()
    }
}

impl Installer {
    pub fn new(
        live_dir: PathBuf,
        extract_dir: PathBuf,
        preserve: Vec<String>,
        module_name: impl Into<String>,
        host: Arc<dyn PluginHost>,
    ) -> Self {
        Self {
            backup: BackupManager::new(live_dir.clone()),
            live_dir,
            extract_dir,
            preserve,
            module_name: module_name.into(),
            host,
        }
    }

    pub fn live_dir(&self) -> &Path {
        &self.live_dir
    }

    pub fn backup(&self) -> &BackupManager {
        &self.backup
    }

    /// Install the staged update recorded in the Store.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::NothingStaged`] if no stage is recorded or its
    ///   directory is gone; the live directory is not touched
    /// - [`UpdateError::StaleStage`] if the feed moved on since staging; the
    ///   stale stage is discarded
    /// - [`UpdateError::InstallError`] if the files could not be replaced;
    ///   the previous version is restored and the stage is kept
    /// - [`UpdateError::StoreError`] if the Store cannot be read or written
    pub async fn install(&self, store: &StateStore) -> Result<InstallReport, UpdateError> {
        let state = store.load()?;

        let staged = match (&state.staged_path, state.update_downloaded) {
            (Some(path), true) if path.is_dir() => path.clone(),
            (Some(path), true) => {
                warn!(staged = %path.display(), "Staged update is missing on disk, forgetting it");
                store.update(UpdateState::clear_stage)?;
                return Err(UpdateError::NothingStaged);
            }
            _ => return Err(UpdateError::NothingStaged),
        };

        if !state.is_stage_current() {
            let stale = state.staged_version.clone().unwrap_or_default();
            warn!(staged = %stale, latest = %state.latest_version, "Discarding stale stage");
            let state = store.update(UpdateState::clear_stage)?;
            self.remove_stage(&staged).await;
            return Err(UpdateError::StaleStage {
                staged: stale,
                latest: state.latest_version,
            });
        }

        let version = state.staged_version.clone().unwrap_or_else(|| state.latest_version.clone());
        info!(version = %version, live = %self.live_dir.display(), "Installing update");

        self.backup.create_backup().await?;

        let files_installed = match self.replace_live_dir(&staged).await {
            Ok(files) => files,
            Err(e) => return Err(self.roll_back(e).await),
        };

        store.update(UpdateState::mark_installed)?;

        if let Err(e) = self.backup.cleanup_backup().await {
            warn!(error = %e, "Failed to remove backup after install");
        }
        self.remove_stage(&staged).await;

        let reloaded = match self.host.reload_plugin(&self.module_name) {
            Ok(()) => true,
            Err(e) => {
                warn!(module = %self.module_name, error = %format!("{e:#}"), "Plugin reload failed, restart required");
                false
            }
        };

        info!(version = %version, files = files_installed, reloaded, "Update installed");
        Ok(InstallReport {
            version,
            files_installed,
            reloaded,
        })
    }

    async fn replace_live_dir(&self, staged: &Path) -> anyhow::Result<usize> {
        let live = self.live_dir.clone();
        let staged = staged.to_path_buf();
        let preserve = self.preserve.clone();

        run_blocking(move || {
            let removed = clear_dir_except(&live, &preserve)?;
            debug!(removed, "Cleared live plugin directory");
            copy_dir_except(&staged, &live, &preserve)
        })
        .await
    }

    async fn roll_back(&self, cause: anyhow::Error) -> UpdateError {
        warn!(error = %format!("{cause:#}"), "Replacing plugin files failed, rolling back");

        match self.backup.restore_backup(&self.preserve).await {
            Ok(()) => {
                if let Err(e) = self.backup.cleanup_backup().await {
                    warn!(error = %e, "Failed to remove backup after restore");
                }
                UpdateError::InstallError {
                    reason: format!("{cause:#}; the previous version was restored"),
                }
            }
            Err(restore_error) => UpdateError::InstallError {
                reason: format!(
                    "{cause:#}; restoring the previous version also failed ({restore_error}), backup kept at {}",
                    self.backup.backup_path().display()
                ),
            },
        }
    }

    /// Delete the extracted release a stage came from.
    async fn remove_stage(&self, staged: &Path) {
        let target =
            if staged.starts_with(&self.extract_dir) { self.extract_dir.clone() } else { staged.to_path_buf() };

        if let Err(e) = run_blocking(move || crate::utils::fs::remove_dir_all(&target)).await {
            warn!(error = %format!("{e:#}"), "Failed to remove staged files");
        }
    }
}
