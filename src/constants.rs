//! Global constants used throughout the lightgroup tools codebase.
//!
//! This module contains timeouts, retry parameters, file names, and other
//! values that are shared across the updater components. Defining them
//! centrally keeps the on-disk layout discoverable in one place.

use std::time::Duration;

/// Python-style module name of the plugin inside the host application.
///
/// Used both as the default payload subtree inside a release archive and as
/// the name handed to the host when asking it to reload the plugin.
pub const PLUGIN_MODULE: &str = "lightgroup_tools";

/// Release feed queried by the resolver unless overridden in configuration.
pub const DEFAULT_FEED_URL: &str =
    "https://api.github.com/repos/thedavidcarney/DavidsBlenderProductionToolkit/releases/latest";

/// Timeout for the release feed request (10 seconds).
///
/// The version check runs on the host's main thread, so it must never hang
/// the host indefinitely.
pub fn default_check_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Timeout for establishing any connection (10 seconds).
pub fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

/// File holding the persisted [`UpdateState`](crate::updater::UpdateState).
pub const STATE_FILE_NAME: &str = "update_state.json";

/// Durable directory used for downloads and extraction.
pub const WORK_DIR_NAME: &str = "update_work";

/// Name of the downloaded release archive inside the work directory.
pub const ARCHIVE_FILE_NAME: &str = "update.zip";

/// Suffix of an archive that is still being downloaded.
pub const PARTIAL_SUFFIX: &str = "part";

/// Directory (inside the work directory) the archive is extracted into.
pub const EXTRACT_DIR_NAME: &str = "extract";

/// Directory holding per-operation lock files.
pub const LOCKS_DIR_NAME: &str = ".locks";

/// Suffix appended to the live plugin directory name to form its backup sibling.
pub const BACKUP_SUFFIX: &str = "backup";

/// Entries the host regenerates and that an install must never touch.
pub const DEFAULT_PRESERVED_ENTRIES: &[&str] = &["__pycache__"];

/// Maximum number of attempts when restoring the live directory from backup.
pub const RESTORE_ATTEMPTS: usize = 3;

/// Starting delay for exponential backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Environment variable overriding the durable data directory.
pub const DATA_DIR_ENV: &str = "LIGHTGROUP_TOOLS_DATA_DIR";

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "LIGHTGROUP_TOOLS_CONFIG_PATH";

/// Environment variable holding the tracing filter for the host console.
pub const LOG_ENV: &str = "LIGHTGROUP_TOOLS_LOG";
