//! Lightgroup Tools - lightgroup and compositor helpers with a self-updater
//!
//! The crate is the native core of a render-pipeline plugin. It has two
//! independent halves:
//!
//! - Scene planning ([`lightgroup`]): decides which lightgroups a scene
//!   should have, which objects go into which lightgroup, and how the
//!   compositor denoises and exports every lightgroup pass. The host binding
//!   describes its scene as plain data and applies the returned plan.
//! - Self-update ([`updater`]): checks a release feed for a newer version,
//!   stages the release archive on disk, and replaces the live plugin
//!   directory with it, restoring the previous version on any failure.
//!
//! # Architecture Overview
//!
//! An update moves through three persisted phases:
//!
//! ```text
//! IDLE ──check──▶ AVAILABLE ──stage──▶ STAGED ──install──▶ IDLE
//! ```
//!
//! Every transition is recorded in a JSON state file written atomically, so
//! a process that exits between staging and installing picks up where it
//! left off: on the next startup the staged release is installed before the
//! plugin does anything else.
//!
//! # Core Modules
//!
//! - [`config`] - Updater settings (`config.toml`) and on-disk layout
//! - [`core`] - Error types and user-facing error context
//! - [`updater`] - Release resolution, staging, install, and recovery
//! - [`operators`] - Synchronous, report-producing entry points for the host
//! - [`host`] - Traits the host application implements
//! - [`lightgroup`] - Lightgroup and compositor planning
//! - [`logging`] - Tracing subscriber setup
//! - [`utils`] - Filesystem and retry helpers
//!
//! # Configuration
//!
//! ```toml
//! # <data_dir>/config.toml
//! feed_url = "https://api.github.com/repos/owner/repo/releases/latest"
//! check_timeout_secs = 10
//! install_on_startup = true
//! checksum = "verify-if-published"   # or "skip", "require"
//! preserve = ["__pycache__"]
//! ```
//!
//! # Environment Variables
//!
//! - `LIGHTGROUP_TOOLS_DATA_DIR` - Override the durable data directory
//! - `LIGHTGROUP_TOOLS_CONFIG_PATH` - Override the configuration file
//! - `LIGHTGROUP_TOOLS_LOG` - Tracing filter (e.g. `debug`, `lightgroup_tools=trace`)

pub mod config;
pub mod constants;
pub mod core;
pub mod host;
pub mod lightgroup;
pub mod logging;
pub mod operators;
pub mod updater;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
