//! Interfaces the plugin consumes from its host application.
//!
//! The update core never talks to the host directly. It needs two things:
//! a way to reload the plugin's code after an install, and a way to run a
//! callback once when the host has finished starting up. Both are modeled
//! as traits so the host binding (and tests) supply their own
//! implementation.

use std::sync::Mutex;
use tracing::debug;

/// Reload support offered by the host.
pub trait PluginHost: Send + Sync {
    /// Unload and re-import the plugin module so freshly installed code takes
    /// effect without a restart.
    ///
    /// Failure is not an install failure; the new files are already in place
    /// and are picked up on the next restart.
    fn reload_plugin(&self, module_name: &str) -> anyhow::Result<()>;
}

/// Callback run once by the host's startup event.
pub type StartupHook = Box<dyn FnOnce() + Send + 'static>;

/// Registration of startup callbacks with the host.
pub trait StartupHooks {
    fn register(&mut self, hook: StartupHook);
}

/// Host without hot-reload support: every reload reports that a restart is
/// needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestartRequiredHost;

impl PluginHost for RestartRequiredHost {
    fn reload_plugin(&self, module_name: &str) -> anyhow::Result<()> {
        anyhow::bail!("host cannot reload '{module_name}' in place; restart to load the new version")
    }
}

/// Startup hooks collected in memory and fired on demand.
///
/// Suitable for hosts that expose a single "loaded" callback: register all
/// hooks during plugin activation, then call [`fire`](Self::fire) from that
/// callback. Hooks are consumed by the first `fire`.
#[derive(Default)]
pub struct PendingStartupHooks {
    hooks: Mutex<Vec<StartupHook>>,
}

impl PendingStartupHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().map(|hooks| hooks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run and drop every registered hook.
    pub fn fire(&self) {
        let hooks = match self.hooks.lock() {
            Ok(mut hooks) => std::mem::take(&mut *hooks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        debug!(count = hooks.len(), "Running startup hooks");
        for hook in hooks {
            hook();
        }
    }
}

impl StartupHooks for PendingStartupHooks {
    fn register(&mut self, hook: StartupHook) {
        match self.hooks.get_mut() {
            Ok(hooks) => hooks.push(hook),
            Err(poisoned) => poisoned.into_inner().push(hook),
        }
    }
}

impl std::fmt::Debug for PendingStartupHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingStartupHooks").field("pending", &self.len()).finish()
    }
}
