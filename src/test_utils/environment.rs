//! Sandboxed plugin installation for update tests.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::config::{PluginPaths, UpdaterConfig};
use crate::core::UpdateError;
use crate::host::PluginHost;
use crate::updater::{PluginVersion, StateStore, UpdateManager};

/// Host double recording every reload request.
#[derive(Debug, Default)]
pub struct RecordingHost {
    reloads: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reloads fail (after recording them as attempted).
    pub fn fail_reloads(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Modules reloaded successfully, in order.
    pub fn reloads(&self) -> Vec<String> {
        self.reloads.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl PluginHost for RecordingHost {
    fn reload_plugin(&self, module_name: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("reload of '{module_name}' refused by test host");
        }
        if let Ok(mut reloads) = self.reloads.lock() {
            reloads.push(module_name.to_string());
        }
        Ok(())
    }
}

/// Temporary plugin installation.
///
/// ```text
/// <temp>/
/// ├── addons/lightgroup_tools/      # live plugin, version 0.0.2
/// │   ├── __init__.py
/// │   ├── ops/lightgroups.py
/// │   └── __pycache__/__init__.cpython-311.pyc
/// └── data/                         # durable data directory
/// ```
pub struct PluginSandbox {
    pub temp_dir: TempDir,
    pub plugin_dir: PathBuf,
    pub data_dir: PathBuf,
    pub host: Arc<RecordingHost>,
}

impl PluginSandbox {
    pub const INSTALLED_VERSION: &'static str = "0.0.2";

    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let plugin_dir = temp_dir.path().join("addons").join("lightgroup_tools");
        let data_dir = temp_dir.path().join("data");

        fs::create_dir_all(plugin_dir.join("ops"))?;
        fs::create_dir_all(plugin_dir.join("__pycache__"))?;
        fs::create_dir_all(&data_dir)?;
        fs::write(
            plugin_dir.join("__init__.py"),
            format!("__version__ = \"{}\"\n", Self::INSTALLED_VERSION),
        )?;
        fs::write(plugin_dir.join("ops").join("lightgroups.py"), "# lightgroup operators 0.0.2\n")?;
        fs::write(plugin_dir.join("__pycache__").join("__init__.cpython-311.pyc"), [0u8, 1, 2, 3])?;

        Ok(Self {
            temp_dir,
            plugin_dir,
            data_dir,
            host: Arc::new(RecordingHost::new()),
        })
    }

    pub fn paths(&self) -> PluginPaths {
        PluginPaths::new(&self.plugin_dir, &self.data_dir)
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(self.paths().state_file())
    }

    /// Updater config pointed at a local feed.
    pub fn config(&self, feed_url: &str) -> UpdaterConfig {
        UpdaterConfig {
            feed_url: feed_url.to_string(),
            check_timeout_secs: 5,
            connect_timeout_secs: 5,
            ..UpdaterConfig::default()
        }
    }

    /// Update manager for this sandbox, running version 0.0.2.
    pub fn manager(&self, config: UpdaterConfig) -> Result<UpdateManager, UpdateError> {
        let version: PluginVersion = Self::INSTALLED_VERSION.parse()?;
        Ok(UpdateManager::new(config, self.paths(), self.host.clone())?.with_current_version(version))
    }

    pub fn read_plugin_file(&self, path: impl AsRef<Path>) -> Result<String> {
        Ok(fs::read_to_string(self.plugin_dir.join(path))?)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.paths().backup_dir()
    }
}

/// Keeps a plugin file from being deleted or rewritten while alive, the
/// way a module the host still has open behaves.
///
/// The file's directory is made read-only. Where that does not stop
/// deletion (a privileged process) the file is marked immutable with
/// `chattr +i` instead. Both are undone on drop.
#[cfg(unix)]
#[derive(Debug)]
pub struct PinnedFile {
    file: PathBuf,
    parent: PathBuf,
    immutable: bool,
}

#[cfg(unix)]
impl PinnedFile {
    /// Pin `file`, or `None` when the filesystem offers no way to.
    pub fn pin(file: &Path) -> Option<Self> {
        let parent = file.parent()?.to_path_buf();
        let mut pinned = Self {
            file: file.to_path_buf(),
            parent,
            immutable: false,
        };

        pinned.set_parent_mode(0o555);
        if fs::write(pinned.parent.join(".pin-check"), b"").is_err() {
            return Some(pinned);
        }
        let _ = fs::remove_file(pinned.parent.join(".pin-check"));
        pinned.set_parent_mode(0o755);

        pinned.immutable = std::process::Command::new("chattr")
            .arg("+i")
            .arg(&pinned.file)
            .status()
            .is_ok_and(|status| status.success());
        let writable = fs::OpenOptions::new().append(true).open(&pinned.file).is_ok();
        (pinned.immutable && !writable).then_some(pinned)
    }

    fn set_parent_mode(&self, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&self.parent, fs::Permissions::from_mode(mode));
    }
}

#[cfg(unix)]
impl Drop for PinnedFile {
    fn drop(&mut self) {
        if self.immutable {
            let _ = std::process::Command::new("chattr").arg("-i").arg(&self.file).status();
        }
        self.set_parent_mode(0o755);
    }
}
