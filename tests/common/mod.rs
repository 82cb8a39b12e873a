//! Common test utilities for lightgroup tools integration tests
//!
//! The sandboxed plugin installation and archive builders live in
//! `lightgroup_tools::test_utils`; this module adds a local release host
//! serving the feed and the archives.

// Allow dead code because these utilities are used across different test files
// and not all utilities are used in every test file
#![allow(dead_code)]

use lightgroup_tools::test_utils::release_feed;
use mockito::{Mock, Server, ServerGuard};

/// Local stand-in for the release host.
///
/// `GET /latest` returns the feed document for the most recently published
/// tag and `GET /zipball/<tag>` returns its archive.
pub struct ReleaseServer {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl ReleaseServer {
    /// Start a server from async tests.
    pub async fn start() -> Self {
        Self {
            server: Server::new_async().await,
            mocks: Vec::new(),
        }
    }

    /// Start a server from plain `#[test]` functions, which must not be
    /// running inside a runtime.
    pub fn start_blocking() -> Self {
        Self {
            server: Server::new(),
            mocks: Vec::new(),
        }
    }

    pub fn feed_url(&self) -> String {
        format!("{}/latest", self.server.url())
    }

    pub fn archive_url(&self, tag: &str) -> String {
        format!("{}/zipball/{tag}", self.server.url())
    }

    /// Publish `archive` as the latest release `tag`.
    pub async fn publish(&mut self, tag: &str, archive: Vec<u8>) {
        let feed = release_feed(tag, &self.archive_url(tag), None);
        let feed_mock = self
            .server
            .mock("GET", "/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(feed)
            .create_async()
            .await;
        let archive_mock = self
            .server
            .mock("GET", format!("/zipball/{tag}").as_str())
            .with_status(200)
            .with_body(archive)
            .create_async()
            .await;
        self.mocks.push(feed_mock);
        self.mocks.push(archive_mock);
    }

    /// [`publish`](Self::publish) for blocking tests.
    pub fn publish_blocking(&mut self, tag: &str, archive: Vec<u8>) {
        let feed = release_feed(tag, &self.archive_url(tag), None);
        let feed_mock = self
            .server
            .mock("GET", "/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(feed)
            .create();
        let archive_mock = self
            .server
            .mock("GET", format!("/zipball/{tag}").as_str())
            .with_status(200)
            .with_body(archive)
            .create();
        self.mocks.push(feed_mock);
        self.mocks.push(archive_mock);
    }

    /// Serve an arbitrary response for the feed.
    pub async fn serve_feed(&mut self, status: usize, body: &str) {
        let mock = self
            .server
            .mock("GET", "/latest")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;
        self.mocks.push(mock);
    }

    /// [`serve_feed`](Self::serve_feed) for blocking tests.
    pub fn serve_feed_blocking(&mut self, status: usize, body: &str) {
        let mock = self.server.mock("GET", "/latest").with_status(status).with_body(body).create();
        self.mocks.push(mock);
    }
}
