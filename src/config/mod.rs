//! Configuration management for the lightgroup tools plugin
//!
//! The updater reads a small TOML file from the plugin's durable data
//! directory. Every key has a default, so a missing file behaves exactly
//! like an empty one.
//!
//! # Modules
//!
//! - `updater` - [`UpdaterConfig`] and [`ChecksumPolicy`]
//! - `paths` - [`PluginPaths`], the on-disk layout used by the update core
//!
//! # Configuration File
//!
//! **Location:** `<data_dir>/config.toml`, where `<data_dir>` is
//! `$LIGHTGROUP_TOOLS_DATA_DIR` or the platform data directory joined with
//! `lightgroup_tools`. The file location itself can be overridden with
//! `$LIGHTGROUP_TOOLS_CONFIG_PATH`.
//!
//! ```toml
//! feed_url = "https://api.github.com/repos/thedavidcarney/DavidsBlenderProductionToolkit/releases/latest"
//! payload_dir = "lightgroup_tools"
//! check_timeout_secs = 10
//! preserve = ["__pycache__"]
//! install_on_startup = true
//! checksum = "verify-if-published"
//! ```
//!
//! # Configuration Priority
//!
//! 1. Environment variables (`LIGHTGROUP_TOOLS_CONFIG_PATH`, `LIGHTGROUP_TOOLS_DATA_DIR`)
//! 2. The config file
//! 3. Default values

mod paths;
mod updater;

pub use paths::PluginPaths;
pub(crate) use paths::backup_path_for;
pub use updater::{ChecksumPolicy, UpdaterConfig};
