//! Self-update of the plugin's own code.
//!
//! The updater moves a single release through three steps, each of which
//! can fail and be retried on its own:
//!
//! ```text
//! 1. Check   (ReleaseResolver)
//!    ├── GET the release feed (bounded by check_timeout_secs)
//!    ├── Parse the tag into a PluginVersion and compare with the running one
//!    └── Record update_available / latest_version / download_url
//!
//! 2. Stage   (ArtifactStager)
//!    ├── Discard any previous stage
//!    ├── Stream the archive to <work_dir>/update.zip.part, fsync, rename
//!    ├── Verify the SHA-256 checksum per ChecksumPolicy
//!    ├── Extract and locate <top>/lightgroup_tools
//!    └── Record staged_path / update_downloaded
//!
//! 3. Install (Installer)
//!    ├── Refuse stale stages
//!    ├── Back up the live directory to <plugin_dir>.backup
//!    ├── Clear the live directory (except __pycache__) and copy the stage in
//!    ├── On failure restore the backup and keep the stage
//!    └── Clear the stage, delete the backup, ask the host to reload
//! ```
//!
//! A stage that was never installed is picked up on the next startup by
//! [`reconciler::reconcile`], which is what makes a crash between stage and
//! install recoverable.
//!
//! All progress is persisted in an [`UpdateState`] record through a
//! [`StateStore`]; components load, modify, and save the whole record. Each
//! of check/stage/install holds an [`OperationLock`] while it runs so two
//! host windows cannot interleave the same operation.
//!
//! [`UpdateManager`] wires the components together from an
//! [`UpdaterConfig`] and [`PluginPaths`].

pub mod backup;
pub mod installer;
pub mod lock;
pub mod reconciler;
pub mod release;
pub mod stager;
pub mod state;
pub mod verification;
pub mod version;


pub use backup::BackupManager;
pub use installer::{InstallReport, Installer};
pub use lock::OperationLock;
pub use reconciler::ReconcileOutcome;
pub use release::{CheckOutcome, ReleaseInfo, ReleaseResolver};
pub use stager::ArtifactStager;
pub use state::{StateStore, UpdatePhase, UpdateState};
pub use verification::ChecksumVerifier;
pub use version::{PluginVersion, resolve_available};

use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::config::{PluginPaths, UpdaterConfig};
use crate::constants::PLUGIN_MODULE;
use crate::core::UpdateError;
use crate::host::PluginHost;

/// Entry point to the update core.
///
/// # Examples
///
/// ```rust,no_run
/// use lightgroup_tools::config::{PluginPaths, UpdaterConfig};
/// use lightgroup_tools::host::RestartRequiredHost;
/// use lightgroup_tools::updater::UpdateManager;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), lightgroup_tools::core::UpdateError> {
/// let paths = PluginPaths::resolve("/addons/lightgroup_tools")?;
/// let config = UpdaterConfig::load_from(&paths.config_file()).await?;
/// let manager = UpdateManager::new(config, paths, Arc::new(RestartRequiredHost))?;
///
/// if manager.check().await?.available {
///     manager.stage().await?;
///     manager.install().await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct UpdateManager {
    config: UpdaterConfig,
    paths: PluginPaths,
    store: StateStore,
    resolver: ReleaseResolver,
    stager: ArtifactStager,
    installer: Installer,
    current_version: PluginVersion,
}

impl UpdateManager {
    /// Build the update core.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ConfigError`] if the configuration is invalid or
    /// the HTTP client cannot be created.
    pub fn new(
        config: UpdaterConfig,
        paths: PluginPaths,
        host: Arc<dyn PluginHost>,
    ) -> Result<Self, UpdateError> {
        config.validate()?;

        let client = release::build_client(&config)?;
        let store = StateStore::new(paths.state_file());
        let resolver = ReleaseResolver::with_client(client.clone(), &config);
        let stager = ArtifactStager::new(client, &config, paths.work_dir());
        let installer = Installer::new(
            paths.plugin_dir().to_path_buf(),
            stager.extract_dir(),
            config.preserve.clone(),
            PLUGIN_MODULE,
            host,
        );

        Ok(Self {
            config,
            paths,
            store,
            resolver,
            stager,
            installer,
            current_version: PluginVersion::current(),
        })
    }

    /// Override the running version (the package version by default).
    #[must_use]
    pub fn with_current_version(mut self, version: PluginVersion) -> Self {
        self.current_version = version;
        self
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn paths(&self) -> &PluginPaths {
        &self.paths
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn current_version(&self) -> &PluginVersion {
        &self.current_version
    }

    pub fn state(&self) -> Result<UpdateState, UpdateError> {
        self.store.load()
    }

    fn lock(&self, operation: &str) -> Result<OperationLock, UpdateError> {
        OperationLock::try_acquire(&self.paths.locks_dir(), operation)
    }

    /// Query the release feed and record whether a newer version exists.
    pub async fn check(&self) -> Result<CheckOutcome, UpdateError> {
        let _lock = self.lock("check")?;
        self.resolver.check(&self.current_version, &self.store).await
    }

    /// Download and extract the advertised release.
    pub async fn stage(&self) -> Result<PathBuf, UpdateError> {
        let _lock = self.lock("stage")?;
        self.stager.stage(&self.store).await
    }

    /// Replace the live plugin with the staged release.
    pub async fn install(&self) -> Result<InstallReport, UpdateError> {
        let _lock = self.lock("install")?;
        self.installer.install(&self.store).await
    }

    /// Install a stage left pending by a previous session. Never fails.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        let _lock = match self.lock("install") {
            Ok(lock) => lock,
            Err(e) => {
                warn!(error = %e, "Skipping startup install");
                return ReconcileOutcome::Failed(e);
            }
        };
        reconciler::reconcile(&self.store, &self.installer, self.config.install_on_startup).await
    }
}
