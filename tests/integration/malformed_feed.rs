//! Bad feed responses fail the check and leave persisted state alone.

use anyhow::Result;
use lightgroup_tools::test_utils::{PluginSandbox, ReleaseArchive, release_feed};
use lightgroup_tools::updater::UpdateState;

use crate::common::ReleaseServer;

async fn check_fails_with(status: usize, body: &str, kind: &str) -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.serve_feed(status, body).await;

    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;

    let err = manager.check().await.unwrap_err();
    assert_eq!(err.kind(), kind, "{err}");
    assert!(!manager.store().path().exists());
    Ok(())
}

#[tokio::test]
async fn test_unparseable_tag() -> Result<()> {
    check_fails_with(200, &release_feed("not-a-version", "http://localhost/zip", None), "parse").await
}

#[tokio::test]
async fn test_invalid_json() -> Result<()> {
    check_fails_with(200, "<html>rate limited</html>", "parse").await
}

#[tokio::test]
async fn test_missing_tag() -> Result<()> {
    check_fails_with(200, r#"{"zipball_url": "http://localhost/zip", "assets": []}"#, "parse").await
}

#[tokio::test]
async fn test_release_without_archive() -> Result<()> {
    check_fails_with(200, r#"{"tag_name": "v0.0.6", "assets": []}"#, "parse").await
}

#[tokio::test]
async fn test_server_error() -> Result<()> {
    check_fails_with(500, "internal error", "http").await
}

#[tokio::test]
async fn test_unreachable_feed() -> Result<()> {
    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config("http://127.0.0.1:9/latest"))?;

    let err = manager.check().await.unwrap_err();
    assert_eq!(err.kind(), "network");
    assert!(!manager.store().path().exists());
    Ok(())
}

#[tokio::test]
async fn test_failed_check_keeps_earlier_result() -> Result<()> {
    let mut server = ReleaseServer::start().await;
    server.publish("v0.0.6", ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build()).await;

    let sandbox = PluginSandbox::new()?;
    let manager = sandbox.manager(sandbox.config(&server.feed_url()))?;
    manager.check().await?;
    let recorded: UpdateState = manager.state()?;

    server.serve_feed(200, &release_feed("v0.0.x", "http://localhost/zip", None)).await;
    assert_eq!(manager.check().await.unwrap_err().kind(), "parse");
    assert_eq!(manager.state()?, recorded);
    Ok(())
}
