use tracing::{debug, error, info, warn};

use crate::core::UpdateError;
use crate::updater::installer::{InstallReport, Installer};
use crate::updater::state::StateStore;

/// What the startup reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Automatic install on startup is turned off.
    Disabled,
    /// No staged update was waiting.
    NothingPending,
    /// A pending update was installed.
    Installed(InstallReport),
    /// A pending update could not be installed; it stays staged.
    Failed(UpdateError),
}

/// Finish an install left pending by a previous session.
///
/// Runs unattended while the host is starting, so it never returns an
/// error: every failure is logged and folded into
/// [`ReconcileOutcome::Failed`].
pub async fn reconcile(store: &StateStore, installer: &Installer, enabled: bool) -> ReconcileOutcome {
    if !enabled {
        debug!("Install on startup disabled");
        return ReconcileOutcome::Disabled;
    }

    let state = match store.load() {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Could not read update state at startup");
            return ReconcileOutcome::Failed(e);
        }
    };

    if !state.update_downloaded {
        debug!("No staged update pending");
        return ReconcileOutcome::NothingPending;
    }

    info!(version = %state.latest_version, "Installing update staged by a previous session");
    match installer.install(store).await {
        Ok(report) => ReconcileOutcome::Installed(report),
        Err(UpdateError::NothingStaged) => ReconcileOutcome::NothingPending,
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "Startup install failed, will retry on next startup");
            ReconcileOutcome::Failed(e)
        }
    }
}
