//! Full update cycles through the public update core.

use anyhow::Result;
use lightgroup_tools::core::UpdateError;
use lightgroup_tools::test_utils::{PluginSandbox, ReleaseArchive, snapshot_dir};
use lightgroup_tools::updater::UpdatePhase;

use crate::common::ReleaseServer;

#[tokio::test]
async fn test_check_stage_install() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server
        .publish(
            "v0.0.6",
            ReleaseArchive::plugin("owner-repo-1a2b3c", "0.0.6")
                .plugin_file("ops/compositor.py", "# compositor 0.0.6\n")
                .raw_file("owner-repo-1a2b3c/README.md", "# Toolkit\n")
                .build(),
        )
        .await;

    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;

    let outcome = manager.check().await?;
    assert!(outcome.available);
    assert_eq!(outcome.artifact_url, server.archive_url("v0.0.6"));

    manager.stage().await?;
    let report = manager.install().await?;
    assert_eq!(report.version, "0.0.6");
    assert_eq!(report.files_installed, 3);

    assert_eq!(sandbox.read_plugin_file("__init__.py")?, "__version__ = \"0.0.6\"\n");
    assert_eq!(sandbox.read_plugin_file("ops/compositor.py")?, "# compositor 0.0.6\n");
    // Only the payload subtree is installed.
    assert!(!sandbox.plugin_dir.join("README.md").exists());
    assert!(sandbox.plugin_dir.join("__pycache__").is_dir());

    assert_eq!(manager.state()?.phase(), UpdatePhase::Idle);
    Ok(())
}

#[tokio::test]
async fn test_files_removed_upstream_are_removed_locally() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server
        .publish(
            "v0.0.6",
            ReleaseArchive::new("repo-v0.0.6").plugin_file("__init__.py", "__version__ = \"0.0.6\"\n").build(),
        )
        .await;

    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;
    manager.stage().await?;
    manager.install().await?;

    assert!(!sandbox.plugin_dir.join("ops").exists());
    assert!(sandbox.plugin_dir.join("__pycache__").join("__init__.cpython-311.pyc").exists());
    Ok(())
}

#[tokio::test]
async fn test_second_install_is_a_noop() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build()).await;

    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;
    manager.stage().await?;
    manager.install().await?;

    let installed = snapshot_dir(&sandbox.plugin_dir);
    let state = manager.state()?;

    assert_eq!(manager.install().await.unwrap_err(), UpdateError::NothingStaged);
    assert_eq!(snapshot_dir(&sandbox.plugin_dir), installed);
    assert_eq!(manager.state()?, state);
    assert_eq!(sandbox.host.reloads().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_restaging_replaces_previous_stage() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build()).await;

    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;
    let first = manager.stage().await?;

    server.publish("v0.0.7", ReleaseArchive::plugin("repo-v0.0.7", "0.0.7").build()).await;
    manager.check().await?;
    let second = manager.stage().await?;

    assert_ne!(first, second);
    assert!(!first.exists());

    let report = manager.install().await?;
    assert_eq!(report.version, "0.0.7");
    assert!(sandbox.read_plugin_file("__init__.py")?.contains("0.0.7"));
    Ok(())
}

#[tokio::test]
async fn test_reload_failure_still_installs() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build()).await;

    let sandbox = PluginSandbox::new()?;
    sandbox.host.fail_reloads(true);
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;
    manager.stage().await?;

    let report = manager.install().await?;
    assert!(!report.reloaded);
    assert!(sandbox.read_plugin_file("__init__.py")?.contains("0.0.6"));
    assert_eq!(manager.state()?.phase(), UpdatePhase::Idle);
    Ok(())
}
