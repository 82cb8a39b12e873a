//! Archives without an installable plugin are rejected at stage time.

use anyhow::Result;
use lightgroup_tools::config::UpdaterConfig;
use lightgroup_tools::test_utils::{PluginSandbox, ReleaseArchive, snapshot_dir};
use lightgroup_tools::updater::UpdatePhase;

use crate::common::ReleaseServer;

async fn stage_fails_with(archive: Vec<u8>, kind: &str) -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", archive).await;

    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;
    let checked = manager.state()?;
    let live = snapshot_dir(&sandbox.plugin_dir);

    let err = manager.stage().await.unwrap_err();
    assert_eq!(err.kind(), kind, "{err}");

    assert_eq!(manager.state()?, checked);
    assert_eq!(snapshot_dir(&sandbox.plugin_dir), live);
    assert!(!sandbox.paths().work_dir().join("extract").exists());
    Ok(())
}

#[tokio::test]
async fn test_archive_without_payload_dir() -> Result<()> {
    let archive = ReleaseArchive::new("repo-v0.0.6").raw_file("repo-v0.0.6/README.md", "# Toolkit\n").build();
    stage_fails_with(archive, "layout").await
}

#[tokio::test]
async fn test_archive_with_two_top_level_dirs() -> Result<()> {
    let archive = ReleaseArchive::plugin("repo-v0.0.6", "0.0.6")
        .raw_file("__MACOSX/._repo-v0.0.6", "")
        .build();
    stage_fails_with(archive, "layout").await
}

#[tokio::test]
async fn test_payload_without_marker() -> Result<()> {
    let archive = ReleaseArchive::new("repo-v0.0.6").plugin_file("ops/lightgroups.py", "# ops\n").build();
    stage_fails_with(archive, "layout").await
}

#[tokio::test]
async fn test_empty_archive() -> Result<()> {
    stage_fails_with(ReleaseArchive::empty(), "layout").await
}

#[tokio::test]
async fn test_not_a_zip() -> Result<()> {
    stage_fails_with(b"<html>not found</html>".to_vec(), "archive").await
}

#[tokio::test]
async fn test_custom_payload_dir() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server
        .publish(
            "v0.0.6",
            ReleaseArchive::new("repo-v0.0.6")
                .raw_file("repo-v0.0.6/addon/__init__.py", "__version__ = \"0.0.6\"\n")
                .build(),
        )
        .await;

    let sandbox = PluginSandbox::new()?;
    let config = UpdaterConfig {
        payload_dir: "addon".to_string(),
        ..sandbox.config(&server.feed_url())
    };
    let manager = sandbox.manager(config)?;
    manager.check().await?;

    let staged = manager.stage().await?;
    assert!(staged.ends_with("addon"));
    assert_eq!(manager.state()?.phase(), UpdatePhase::Staged);
    Ok(())
}
