//! Interrupted update cycles are finished, or safely abandoned, on the next
//! startup.

use anyhow::Result;
use lightgroup_tools::test_utils::{PluginSandbox, ReleaseArchive, snapshot_dir};
use lightgroup_tools::updater::{ReconcileOutcome, UpdatePhase};

use crate::common::ReleaseServer;

#[tokio::test]
async fn test_stage_survives_restart() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build()).await;

    let sandbox = PluginSandbox::new()?;
    {
        let session = sandbox.manager(sandbox.config(&server.feed_url()))?;
        session.check().await?;
        session.stage().await?;
    }

    let next_session = sandbox.manager(sandbox.config(&server.feed_url()))?;
    assert_eq!(next_session.state()?.phase(), UpdatePhase::Staged);

    match next_session.reconcile().await {
        ReconcileOutcome::Installed(report) => assert_eq!(report.version, "0.0.6"),
        other => panic!("expected the staged update to be installed, got {other:?}"),
    }
    assert!(sandbox.read_plugin_file("__init__.py")?.contains("0.0.6"));
    assert_eq!(next_session.state()?.phase(), UpdatePhase::Idle);
    Ok(())
}

#[tokio::test]
async fn test_interrupted_download_is_retried_cleanly() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build()).await;

    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;

    // A previous session died halfway through the download.
    let work_dir = sandbox.paths().work_dir();
    std::fs::create_dir_all(&work_dir)?;
    std::fs::write(work_dir.join("update.zip.part"), vec![0x50u8; 10_000])?;

    assert!(matches!(manager.reconcile().await, ReconcileOutcome::NothingPending));

    manager.stage().await?;
    assert!(!work_dir.join("update.zip.part").exists());
    assert!(manager.install().await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_missing_stage_directory_is_forgotten() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build()).await;

    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;
    let staged = manager.stage().await?;
    std::fs::remove_dir_all(&staged)?;

    let before = snapshot_dir(&sandbox.plugin_dir);
    assert!(matches!(manager.reconcile().await, ReconcileOutcome::NothingPending));
    assert_eq!(snapshot_dir(&sandbox.plugin_dir), before);

    let state = manager.state()?;
    assert!(!state.update_downloaded);
    assert_eq!(state.phase(), UpdatePhase::Available);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_state_file_does_not_block_startup() -> Result<()> {
    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config("http://127.0.0.1:9/latest"))?;
    std::fs::write(manager.store().path(), "{ not json")?;

    let before = snapshot_dir(&sandbox.plugin_dir);
    assert!(matches!(manager.reconcile().await, ReconcileOutcome::Failed(_)));
    assert_eq!(snapshot_dir(&sandbox.plugin_dir), before);
    Ok(())
}
