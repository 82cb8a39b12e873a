//! Test utilities for lightgroup tools
//!
//! This module provides fixtures shared by the unit tests and the
//! integration suite:
//! - [`ReleaseArchive`] builds in-memory zip archives shaped like the
//!   source archives the release host serves
//! - [`RecordingHost`] records reload requests and can be told to fail them
//! - [`PluginSandbox`] lays out a live plugin directory and a data
//!   directory inside a temporary directory
//! - `PinnedFile` (unix) makes a live file undeletable, like one the host
//!   holds open
//! - [`snapshot_dir`] captures a directory tree for byte-for-byte comparison
//!
//! # Example
//!
//! ```rust,no_run
//! use lightgroup_tools::test_utils::{PluginSandbox, ReleaseArchive};
//!
//! let sandbox = PluginSandbox::new().unwrap();
//! let archive = ReleaseArchive::new("repo-v0.0.6").plugin_file("__init__.py", "# new").build();
//! assert!(sandbox.plugin_dir.join("__init__.py").exists());
//! assert!(!archive.is_empty());
//! ```

pub mod environment;
pub mod fixtures;

#[cfg(unix)]
pub use environment::PinnedFile;
pub use environment::{PluginSandbox, RecordingHost};
pub use fixtures::{ReleaseArchive, release_feed};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::constants::LOG_ENV;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` if given, otherwise `$LIGHTGROUP_TOOLS_LOG`; with neither,
/// tests run silently.
///
/// ```bash
/// LIGHTGROUP_TOOLS_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var(LOG_ENV).is_ok() {
            EnvFilter::from_env(LOG_ENV)
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Capture every entry below `dir`, keyed by relative path.
///
/// Directories map to `None`, files to their contents. Two snapshots are
/// equal exactly when the trees are byte-identical.
pub fn snapshot_dir(dir: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            let contents = if entry.file_type().is_file() {
                std::fs::read(entry.path()).ok()
            } else {
                None
            };
            (relative, contents)
        })
        .collect()
}
