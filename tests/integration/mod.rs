//! Integration test suite for lightgroup tools
//!
//! End-to-end tests of the update core against a local release host and a
//! sandboxed plugin installation. They exercise the public API only.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! LIGHTGROUP_TOOLS_LOG=debug cargo test --test integration -- --nocapture
//! ```
//!
//! # Test Organization
//!
//! - **update_cycle**: check, stage, install, and repeated installs
//! - **crash_recovery**: interrupted cycles finished on the next startup
//! - **failure_restore**: failed installs leave the live plugin untouched
//! - **malformed_feed**: bad feed responses never change persisted state
//! - **layout_error**: archives that do not contain an installable plugin
//! - **operators**: the synchronous operators and their reports
//! - **planning**: lightgroup and compositor planning from JSON scene data

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod crash_recovery;
mod failure_restore;
mod layout_error;
mod malformed_feed;
mod operators;
mod planning;
mod update_cycle;
