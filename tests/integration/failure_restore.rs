//! A failed install leaves the live plugin exactly as it was.

use anyhow::Result;
use lightgroup_tools::test_utils::{PluginSandbox, ReleaseArchive, snapshot_dir};
use lightgroup_tools::updater::{ReconcileOutcome, UpdatePhase};

use crate::common::ReleaseServer;

#[cfg(unix)]
#[tokio::test]
async fn test_failed_copy_restores_live_directory() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build()).await;

    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;
    let staged = manager.stage().await?;

    // Make the copy fail after the live directory has been cleared.
    std::os::unix::fs::symlink(staged.join("gone.py"), staged.join("zz_broken.py"))?;

    let before = snapshot_dir(&sandbox.plugin_dir);
    let err = manager.install().await.unwrap_err();
    assert_eq!(err.kind(), "install");

    assert_eq!(snapshot_dir(&sandbox.plugin_dir), before);
    assert!(!sandbox.backup_dir().exists());
    assert!(sandbox.host.reloads().is_empty());

    // The stage is kept so the install can be retried.
    let state = manager.state()?;
    assert_eq!(state.phase(), UpdatePhase::Staged);
    assert!(staged.is_dir());

    std::fs::remove_file(staged.join("zz_broken.py"))?;
    assert!(matches!(manager.reconcile().await, ReconcileOutcome::Installed(_)));
    assert!(sandbox.read_plugin_file("__init__.py")?.contains("0.0.6"));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_locked_live_file_restores_live_directory() -> Result<()> {
    use lightgroup_tools::test_utils::PinnedFile;

    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build()).await;

    let sandbox = PluginSandbox::new()?;
    for i in 1..=12 {
        std::fs::write(sandbox.plugin_dir.join(format!("m{i:02}.py")), format!("# module {i}\n"))?;
    }
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;
    manager.stage().await?;

    let before = snapshot_dir(&sandbox.plugin_dir);
    let Some(pin) = PinnedFile::pin(&sandbox.plugin_dir.join("ops").join("lightgroups.py")) else {
        return Ok(());
    };

    let err = manager.install().await.unwrap_err();
    assert_eq!(err.kind(), "install");
    assert_eq!(snapshot_dir(&sandbox.plugin_dir), before);
    assert!(!sandbox.backup_dir().exists());
    assert_eq!(manager.state()?.phase(), UpdatePhase::Staged);

    drop(pin);
    assert!(matches!(manager.reconcile().await, ReconcileOutcome::Installed(_)));
    assert!(sandbox.read_plugin_file("__init__.py")?.contains("0.0.6"));
    assert!(!sandbox.plugin_dir.join("m01.py").exists());
    Ok(())
}

#[tokio::test]
async fn test_leftover_backup_is_replaced() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build()).await;

    let sandbox = PluginSandbox::new()?;
    let stale_backup = sandbox.backup_dir();
    std::fs::create_dir_all(&stale_backup)?;
    std::fs::write(stale_backup.join("__init__.py"), "__version__ = \"0.0.1\"\n")?;

    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;
    manager.stage().await?;
    manager.install().await?;

    assert!(!stale_backup.exists());
    assert!(sandbox.read_plugin_file("__init__.py")?.contains("0.0.6"));
    Ok(())
}
