use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::constants::{
    DEFAULT_FEED_URL, DEFAULT_PRESERVED_ENTRIES, PLUGIN_MODULE, default_check_timeout,
    default_connect_timeout,
};
use crate::core::UpdateError;

/// How downloaded release archives are verified before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecksumPolicy {
    /// Never verify, even when the release publishes a checksum.
    Skip,
    /// Verify when the release publishes a checksum, otherwise warn and continue.
    #[default]
    VerifyIfPublished,
    /// Refuse to stage a release that does not publish a checksum.
    Require,
}

/// Settings controlling how the plugin checks for, stages, and installs updates.
///
/// # Examples
///
/// ```rust,no_run
/// use lightgroup_tools::config::UpdaterConfig;
///
/// let config: UpdaterConfig = toml::from_str(r#"
///     feed_url = "https://example.com/releases/latest"
///     install_on_startup = false
/// "#).unwrap();
///
/// assert_eq!(config.payload_dir, "lightgroup_tools");
/// assert!(!config.install_on_startup);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Release feed endpoint returning the latest release as JSON.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Plugin subtree below the archive's single top-level directory.
    #[serde(default = "default_payload_dir")]
    pub payload_dir: String,

    /// File that must exist inside the payload for it to be installable.
    #[serde(default = "default_payload_marker")]
    pub payload_marker: Option<String>,

    /// Total time allowed for the release feed request.
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,

    /// Time allowed for establishing any connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Live-directory entries that are never deleted, copied, or restored.
    #[serde(default = "default_preserve")]
    pub preserve: Vec<String>,

    /// Whether a staged update is installed automatically on startup.
    #[serde(default = "default_install_on_startup")]
    pub install_on_startup: bool,

    /// Archive verification policy.
    #[serde(default)]
    pub checksum: ChecksumPolicy,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            payload_dir: default_payload_dir(),
            payload_marker: default_payload_marker(),
            check_timeout_secs: default_check_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
            preserve: default_preserve(),
            install_on_startup: default_install_on_startup(),
            checksum: ChecksumPolicy::default(),
        }
    }
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_payload_dir() -> String {
    PLUGIN_MODULE.to_string()
}

fn default_payload_marker() -> Option<String> {
    Some("__init__.py".to_string())
}

fn default_check_timeout_secs() -> u64 {
    default_check_timeout().as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    default_connect_timeout().as_secs()
}

fn default_user_agent() -> String {
    format!("lightgroup-tools/{}", env!("CARGO_PKG_VERSION"))
}

fn default_preserve() -> Vec<String> {
    DEFAULT_PRESERVED_ENTRIES.iter().map(|entry| (*entry).to_string()).collect()
}

const fn default_install_on_startup() -> bool {
    true
}

impl UpdaterConfig {
    /// Load the configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ConfigError`] if the file exists but cannot be
    /// read or is not valid TOML for this structure.
    pub async fn load_from(path: &Path) -> Result<Self, UpdateError> {
        if !path.exists() {
            debug!(path = %path.display(), "No updater config found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| UpdateError::ConfigError {
            message: format!("failed to read {}: {e}", path.display()),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| UpdateError::ConfigError {
            message: format!("failed to parse {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<(), UpdateError> {
        let to_config_error = |message: String| UpdateError::ConfigError {
            message,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                to_config_error(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| to_config_error(format!("failed to serialize config: {e}")))?;

        fs::write(path, content)
            .await
            .map_err(|e| to_config_error(format!("failed to write {}: {e}", path.display())))
    }

    /// Reject values that would make the update core misbehave.
    pub fn validate(&self) -> Result<(), UpdateError> {
        if self.feed_url.trim().is_empty() {
            return Err(UpdateError::ConfigError {
                message: "feed_url must not be empty".to_string(),
            });
        }
        if self.payload_dir.trim().is_empty()
            || Path::new(&self.payload_dir).is_absolute()
            || self.payload_dir.split(['/', '\\']).any(|part| part == "..")
        {
            return Err(UpdateError::ConfigError {
                message: format!(
                    "payload_dir must be a relative path inside the archive, got '{}'",
                    self.payload_dir
                ),
            });
        }
        if self.check_timeout_secs == 0 {
            return Err(UpdateError::ConfigError {
                message: "check_timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
