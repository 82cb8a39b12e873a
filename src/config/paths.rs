use std::path::{Path, PathBuf};

use crate::constants::{
    BACKUP_SUFFIX, CONFIG_PATH_ENV, DATA_DIR_ENV, LOCKS_DIR_NAME, PLUGIN_MODULE, STATE_FILE_NAME,
    WORK_DIR_NAME,
};
use crate::core::UpdateError;

/// On-disk layout used by the update core.
///
/// Two roots are involved:
/// - the **live plugin directory** the host loads code from, which the
///   installer rewrites in place, and
/// - the **data directory**, a durable location the process can always
///   write to and that survives restarts. It holds the persisted update
///   state, the download/extraction work directory, and operation locks.
///   It is deliberately not the host's per-session temp directory, so a
///   staged update survives until the next startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPaths {
    plugin_dir: PathBuf,
    data_dir: PathBuf,
}

impl PluginPaths {
    pub fn new(plugin_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Resolve the data directory from the environment or the platform
    /// default (`<data dir>/lightgroup_tools`).
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ConfigError`] when neither the environment
    /// override nor a platform data directory is available.
    pub fn resolve(plugin_dir: impl Into<PathBuf>) -> Result<Self, UpdateError> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::data_dir()
                .ok_or_else(|| UpdateError::ConfigError {
                    message: format!(
                        "could not determine a data directory; set {DATA_DIR_ENV}"
                    ),
                })?
                .join(PLUGIN_MODULE),
        };
        Ok(Self::new(plugin_dir, data_dir))
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE_NAME)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.data_dir.join(WORK_DIR_NAME)
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.data_dir.join(LOCKS_DIR_NAME)
    }

    /// Config file location, honouring `$LIGHTGROUP_TOOLS_CONFIG_PATH`.
    pub fn config_file(&self) -> PathBuf {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => self.data_dir.join("config.toml"),
        }
    }

    /// Sibling of the live plugin directory used to snapshot it during install.
    pub fn backup_dir(&self) -> PathBuf {
        backup_path_for(&self.plugin_dir)
    }
}

/// Compute the backup sibling of `dir`: `<dir>.backup`.
pub(crate) fn backup_path_for(dir: &Path) -> PathBuf {
    let mut backup = dir.to_path_buf();
    backup.set_file_name(format!(
        "{}.{BACKUP_SUFFIX}",
        dir.file_name().unwrap_or_default().to_string_lossy()
    ));
    backup
}
