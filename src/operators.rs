//! Synchronous entry points invoked by the host's UI and startup event.
//!
//! Each operator runs its update operation to completion on a private
//! current-thread runtime and turns the outcome into an
//! [`OperatorResult`]: a status plus the report lines the host shows to the
//! user. No operator panics or returns an error; failures become `Error`
//! (or, for states the user can act on, `Warning`) reports with a
//! `Cancelled` status.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::config::{PluginPaths, UpdaterConfig};
use crate::core::{UpdateError, create_error_context};
use crate::host::{PluginHost, StartupHooks};
use crate::updater::{ReconcileOutcome, UpdateManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStatus {
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Warning,
    Error,
}

/// One line of user-visible feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub level: ReportLevel,
    pub message: String,
}

/// What an operator hands back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorResult {
    pub status: OperatorStatus,
    pub reports: Vec<Report>,
}

impl OperatorResult {
    pub fn finished() -> Self {
        Self {
            status: OperatorStatus::Finished,
            reports: Vec::new(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: OperatorStatus::Cancelled,
            reports: Vec::new(),
        }
    }

    #[must_use]
    pub fn report(mut self, level: ReportLevel, message: impl Into<String>) -> Self {
        self.reports.push(Report {
            level,
            message: message.into(),
        });
        self
    }

    pub fn is_finished(&self) -> bool {
        self.status == OperatorStatus::Finished
    }

    /// First report, which carries the operation's headline message.
    pub fn headline(&self) -> Option<&Report> {
        self.reports.first()
    }

    /// Cancelled result describing `error`, prefixed with `context` unless
    /// the error is advisory. The suggestion, if any, follows as `Info`.
    fn from_error(error: &UpdateError, context: &str) -> Self {
        warn!(kind = error.kind(), error = %error, "{context}");

        let (level, message) = if error.is_advisory() {
            (ReportLevel::Warning, error.to_string())
        } else {
            (ReportLevel::Error, format!("{context}: {error}"))
        };

        let mut result = Self::cancelled().report(level, message);
        if let Some(suggestion) = create_error_context(error).suggestion {
            result = result.report(ReportLevel::Info, suggestion);
        }
        result
    }
}

/// The plugin's update operators.
///
/// # Examples
///
/// ```rust,no_run
/// use lightgroup_tools::host::{PendingStartupHooks, RestartRequiredHost};
/// use lightgroup_tools::operators::PluginOperators;
/// use std::sync::Arc;
///
/// let ops = Arc::new(
///     PluginOperators::from_host("/addons/lightgroup_tools", Arc::new(RestartRequiredHost)).unwrap(),
/// );
///
/// let mut hooks = PendingStartupHooks::new();
/// PluginOperators::register_startup_hook(&ops, &mut hooks);
/// hooks.fire();
///
/// for report in ops.check_updates().reports {
///     println!("{:?}: {}", report.level, report.message);
/// }
/// ```
#[derive(Debug)]
pub struct PluginOperators {
    runtime: Runtime,
    manager: UpdateManager,
    startup_ran: AtomicBool,
}

fn build_runtime() -> Result<Runtime, UpdateError> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|e| {
        UpdateError::ConfigError {
            message: format!("failed to start the update runtime: {e}"),
        }
    })
}

impl PluginOperators {
    pub fn new(manager: UpdateManager) -> Result<Self, UpdateError> {
        Ok(Self::with_runtime(build_runtime()?, manager))
    }

    fn with_runtime(runtime: Runtime, manager: UpdateManager) -> Self {
        Self {
            runtime,
            manager,
            startup_ran: AtomicBool::new(false),
        }
    }

    /// Resolve paths, load the config file, and build the operators for a
    /// plugin living in `plugin_dir`. Installs the console subscriber unless
    /// the host already has one.
    pub fn from_host(
        plugin_dir: impl Into<PathBuf>,
        host: Arc<dyn PluginHost>,
    ) -> Result<Self, UpdateError> {
        crate::logging::init();
        let runtime = build_runtime()?;
        let paths = PluginPaths::resolve(plugin_dir)?;
        let config = runtime.block_on(UpdaterConfig::load_from(&paths.config_file()))?;
        let manager = UpdateManager::new(config, paths, host)?;
        Ok(Self::with_runtime(runtime, manager))
    }

    pub fn manager(&self) -> &UpdateManager {
        &self.manager
    }

    /// "Check for Updates".
    pub fn check_updates(&self) -> OperatorResult {
        match self.runtime.block_on(self.manager.check()) {
            Ok(outcome) if outcome.available => OperatorResult::finished().report(
                ReportLevel::Info,
                format!(
                    "New version available: v{} (current: v{})",
                    outcome.latest,
                    self.manager.current_version()
                ),
            ),
            Ok(_) => OperatorResult::finished().report(ReportLevel::Info, "You have the latest version!"),
            Err(
                e @ (UpdateError::NetworkError {
                    ..
                }
                | UpdateError::HttpError {
                    ..
                }),
            ) => OperatorResult::from_error(&e, "Could not check for updates"),
            Err(e) => OperatorResult::from_error(&e, "Error checking updates"),
        }
    }

    /// "Download Update".
    pub fn download_update(&self) -> OperatorResult {
        match self.runtime.block_on(self.manager.stage()) {
            Ok(staged) => {
                debug!(staged = %staged.display(), "Stage complete");
                OperatorResult::finished()
                    .report(ReportLevel::Info, "Update downloaded! Restart to install.")
            }
            Err(e) => OperatorResult::from_error(&e, "Error downloading update"),
        }
    }

    /// "Install Update": install the staged release right away instead of
    /// waiting for the next startup.
    pub fn install_update(&self) -> OperatorResult {
        match self.runtime.block_on(self.manager.install()) {
            Ok(report) => {
                let result = OperatorResult::finished()
                    .report(ReportLevel::Info, format!("Updated to v{}", report.version));
                if report.reloaded {
                    result
                } else {
                    result.report(ReportLevel::Warning, "Restart required to load the new version")
                }
            }
            Err(e) => OperatorResult::from_error(&e, "Error installing update"),
        }
    }

    /// Startup reconciliation. Runs at most once per process; later calls
    /// finish without doing anything. Always reports `Finished` so host
    /// startup is never interrupted. A failure is also printed to the host
    /// console with its suggestion.
    pub fn on_startup(&self) -> OperatorResult {
        if self.startup_ran.swap(true, Ordering::SeqCst) {
            debug!("Startup reconciliation already ran");
            return OperatorResult::finished();
        }

        match self.runtime.block_on(self.manager.reconcile()) {
            ReconcileOutcome::Installed(report) => {
                info!(version = %report.version, "Staged update installed at startup");
                OperatorResult::finished()
                    .report(ReportLevel::Info, format!("Installed update v{}", report.version))
            }
            ReconcileOutcome::Failed(error) => {
                create_error_context(&error).display();
                OperatorResult::finished()
                    .report(ReportLevel::Warning, format!("Could not install staged update: {error}"))
            }
            ReconcileOutcome::Disabled | ReconcileOutcome::NothingPending => OperatorResult::finished(),
        }
    }

    /// Register [`on_startup`](Self::on_startup) with the host's startup event.
    pub fn register_startup_hook(this: &Arc<Self>, hooks: &mut dyn StartupHooks) {
        let ops = Arc::clone(this);
        hooks.register(Box::new(move || {
            for report in ops.on_startup().reports {
                info!(level = ?report.level, "{}", report.message);
            }
        }));
    }
}
