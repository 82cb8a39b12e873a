//! The synchronous operators the host binds to its UI and startup event.
//!
//! Operators drive their own runtime, so these are plain tests.

use anyhow::Result;
use lightgroup_tools::host::PendingStartupHooks;
use lightgroup_tools::operators::{OperatorStatus, PluginOperators, ReportLevel};
use lightgroup_tools::test_utils::{PluginSandbox, ReleaseArchive, release_feed};
use std::sync::Arc;

use crate::common::ReleaseServer;

fn messages(result: &lightgroup_tools::operators::OperatorResult) -> Vec<&str> {
    result.reports.iter().map(|report| report.message.as_str()).collect()
}

#[test]
fn test_check_download_install() -> Result<()> {
    let mut server = ReleaseServer::start_blocking();
    server.publish_blocking("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build());

    let sandbox = PluginSandbox::new()?;
    let ops = PluginOperators::new(sandbox.manager(sandbox.config(&server.feed_url()))?)?;

    let result = ops.check_updates();
    assert!(result.is_finished());
    assert_eq!(messages(&result), vec!["New version available: v0.0.6 (current: v0.0.2)"]);

    let result = ops.download_update();
    assert!(result.is_finished());
    assert_eq!(messages(&result), vec!["Update downloaded! Restart to install."]);

    let result = ops.install_update();
    assert!(result.is_finished());
    assert_eq!(messages(&result), vec!["Updated to v0.0.6"]);
    assert!(sandbox.read_plugin_file("__init__.py")?.contains("0.0.6"));
    Ok(())
}

#[test]
fn test_check_reports_latest() -> Result<()> {
    let mut server = ReleaseServer::start_blocking();
    server.publish_blocking("v0.0.2", ReleaseArchive::plugin("repo-v0.0.2", "0.0.2").build());

    let sandbox = PluginSandbox::new()?;
    let ops = PluginOperators::new(sandbox.manager(sandbox.config(&server.feed_url()))?)?;

    let result = ops.check_updates();
    assert!(result.is_finished());
    assert_eq!(messages(&result), vec!["You have the latest version!"]);
    Ok(())
}

#[test]
fn test_check_failure_is_cancelled() -> Result<()> {
    let mut server = ReleaseServer::start_blocking();
    server.serve_feed_blocking(502, "bad gateway");

    let sandbox = PluginSandbox::new()?;
    let ops = PluginOperators::new(sandbox.manager(sandbox.config(&server.feed_url()))?)?;

    let result = ops.check_updates();
    assert_eq!(result.status, OperatorStatus::Cancelled);
    let headline = result.headline().expect("error report");
    assert_eq!(headline.level, ReportLevel::Error);
    assert!(headline.message.starts_with("Could not check for updates"));
    Ok(())
}

#[test]
fn test_malformed_feed_is_reported() -> Result<()> {
    let mut server = ReleaseServer::start_blocking();
    server.serve_feed_blocking(200, &release_feed("latest", "http://localhost/zip", None));

    let sandbox = PluginSandbox::new()?;
    let ops = PluginOperators::new(sandbox.manager(sandbox.config(&server.feed_url()))?)?;

    let result = ops.check_updates();
    assert_eq!(result.status, OperatorStatus::Cancelled);
    assert!(result.headline().expect("error report").message.starts_with("Error checking updates"));
    Ok(())
}

#[test]
fn test_download_without_update_warns() -> Result<()> {
    let sandbox = PluginSandbox::new()?;
    let ops = PluginOperators::new(sandbox.manager(sandbox.config("http://127.0.0.1:9/latest"))?)?;

    let result = ops.download_update();
    assert_eq!(result.status, OperatorStatus::Cancelled);
    let headline = result.headline().expect("warning report");
    assert_eq!(headline.level, ReportLevel::Warning);
    assert_eq!(headline.message, "No update available");
    Ok(())
}

#[test]
fn test_install_without_stage_warns() -> Result<()> {
    let sandbox = PluginSandbox::new()?;
    let ops = PluginOperators::new(sandbox.manager(sandbox.config("http://127.0.0.1:9/latest"))?)?;

    let result = ops.install_update();
    assert_eq!(result.status, OperatorStatus::Cancelled);
    assert_eq!(result.headline().expect("warning report").level, ReportLevel::Warning);
    Ok(())
}

#[test]
fn test_install_without_reload_asks_for_restart() -> Result<()> {
    let mut server = ReleaseServer::start_blocking();
    server.publish_blocking("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build());

    let sandbox = PluginSandbox::new()?;
    sandbox.host.fail_reloads(true);
    let ops = PluginOperators::new(sandbox.manager(sandbox.config(&server.feed_url()))?)?;
    ops.check_updates();
    ops.download_update();

    let result = ops.install_update();
    assert!(result.is_finished());
    assert_eq!(result.reports.len(), 2);
    assert_eq!(result.reports[1].level, ReportLevel::Warning);
    assert_eq!(result.reports[1].message, "Restart required to load the new version");
    Ok(())
}

#[test]
fn test_startup_hook_installs_once() -> Result<()> {
    let mut server = ReleaseServer::start_blocking();
    server.publish_blocking("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build());

    let sandbox = PluginSandbox::new()?;
    {
        let ops = PluginOperators::new(sandbox.manager(sandbox.config(&server.feed_url()))?)?;
        ops.check_updates();
        ops.download_update();
    }

    let ops = Arc::new(PluginOperators::new(sandbox.manager(sandbox.config(&server.feed_url()))?)?);
    let mut hooks = PendingStartupHooks::new();
    PluginOperators::register_startup_hook(&ops, &mut hooks);
    assert_eq!(hooks.len(), 1);

    hooks.fire();
    assert!(hooks.is_empty());
    assert!(sandbox.read_plugin_file("__init__.py")?.contains("0.0.6"));
    assert_eq!(sandbox.host.reloads(), vec!["lightgroup_tools".to_string()]);

    // Already ran through the hook.
    let result = ops.on_startup();
    assert!(result.is_finished());
    assert!(result.reports.is_empty());
    Ok(())
}

#[test]
fn test_startup_reports_failure_without_cancelling() -> Result<()> {
    let sandbox = PluginSandbox::new()?;
    let ops = PluginOperators::new(sandbox.manager(sandbox.config("http://127.0.0.1:9/latest"))?)?;
    std::fs::write(ops.manager().store().path(), "garbage")?;

    let result = ops.on_startup();
    assert!(result.is_finished());
    let headline = result.headline().expect("warning report");
    assert_eq!(headline.level, ReportLevel::Warning);
    assert!(headline.message.starts_with("Could not install staged update"));
    Ok(())
}
