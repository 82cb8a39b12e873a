use serde::Deserialize;
use tracing::{debug, info};

use crate::config::UpdaterConfig;
use crate::core::UpdateError;
use crate::updater::state::StateStore;
use crate::updater::version::{PluginVersion, resolve_available};

/// Release document returned by the feed.
///
/// Only the fields the updater needs are modeled; everything else in the
/// GitHub-style payload is ignored.
#[derive(Debug, Deserialize)]
struct FeedRelease {
    tag_name: String,
    #[serde(default)]
    zipball_url: Option<String>,
    #[serde(default)]
    assets: Vec<FeedAsset>,
}

#[derive(Debug, Deserialize)]
struct FeedAsset {
    name: String,
    browser_download_url: String,
}

/// The latest release as advertised by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Tag exactly as published (e.g. `v0.0.6`).
    pub tag: String,
    /// Parsed version of `tag`.
    pub version: PluginVersion,
    /// Source archive of the release.
    pub artifact_url: String,
    /// Published checksum file, if the release carries one.
    pub checksum_url: Option<String>,
}

impl ReleaseInfo {
    /// Parse a feed document.
    ///
    /// The artifact is the release's `zipball_url`; a release without one
    /// falls back to its first `.zip` asset. A checksum asset is any asset
    /// named `*.sha256`, `SHA256SUMS`, or `checksums.txt`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ParseError`] for invalid JSON, a malformed tag,
    /// or a release without any archive.
    pub fn from_feed(body: &str) -> Result<Self, UpdateError> {
        let release: FeedRelease = serde_json::from_str(body).map_err(|e| UpdateError::ParseError {
            reason: format!("invalid release feed document: {e}"),
        })?;

        let version = PluginVersion::parse_tag(&release.tag_name)?;

        let artifact_url = release
            .zipball_url
            .filter(|url| !url.is_empty())
            .or_else(|| {
                release
                    .assets
                    .iter()
                    .find(|asset| asset.name.ends_with(".zip"))
                    .map(|asset| asset.browser_download_url.clone())
            })
            .ok_or_else(|| UpdateError::ParseError {
                reason: format!("release {} has no downloadable archive", release.tag_name),
            })?;

        let checksum_url = release
            .assets
            .iter()
            .find(|asset| is_checksum_asset(&asset.name))
            .map(|asset| asset.browser_download_url.clone());

        Ok(Self {
            tag: release.tag_name,
            version,
            artifact_url,
            checksum_url,
        })
    }
}

fn is_checksum_asset(name: &str) -> bool {
    name.ends_with(".sha256")
        || name.eq_ignore_ascii_case("SHA256SUMS")
        || name.eq_ignore_ascii_case("checksums.txt")
}

/// Result of a release check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// The feed advertises a version newer than the running one.
    pub available: bool,
    /// Version advertised by the feed.
    pub latest: PluginVersion,
    /// Where to download `latest` from.
    pub artifact_url: String,
}

/// Build the HTTP client shared by the resolver and the stager.
///
/// Only the connection phase is bounded here; the feed request adds a total
/// timeout per request, while archive downloads may take as long as they need.
pub(crate) fn build_client(config: &UpdaterConfig) -> Result<reqwest::Client, UpdateError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(config.connect_timeout())
        .build()
        .map_err(|e| UpdateError::ConfigError {
            message: format!("failed to build HTTP client: {e}"),
        })
}

/// Queries the release feed and records what it finds.
///
/// # Examples
///
/// ```rust,no_run
/// use lightgroup_tools::config::UpdaterConfig;
/// use lightgroup_tools::updater::{PluginVersion, ReleaseResolver, StateStore};
///
/// # async fn example() -> Result<(), lightgroup_tools::core::UpdateError> {
/// let resolver = ReleaseResolver::new(&UpdaterConfig::default())?;
/// let store = StateStore::new("/tmp/update_state.json");
///
/// let outcome = resolver.check(&PluginVersion::current(), &store).await?;
/// if outcome.available {
///     println!("Update available: v{}", outcome.latest);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReleaseResolver {
    client: reqwest::Client,
    feed_url: String,
    timeout: std::time::Duration,
}

impl ReleaseResolver {
    pub fn new(config: &UpdaterConfig) -> Result<Self, UpdateError> {
        Ok(Self::with_client(build_client(config)?, config))
    }

    pub(crate) fn with_client(client: reqwest::Client, config: &UpdaterConfig) -> Self {
        Self {
            client,
            feed_url: config.feed_url.clone(),
            timeout: config.check_timeout(),
        }
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// Fetch and parse the latest release without touching any state.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::NetworkError`] on DNS, TLS, connection, or timeout failures
    /// - [`UpdateError::HttpError`] on a non-2xx response
    /// - [`UpdateError::ParseError`] on a malformed document or tag
    pub async fn fetch_latest(&self) -> Result<ReleaseInfo, UpdateError> {
        debug!(feed = %self.feed_url, "Fetching latest release");

        let network_error = |e: reqwest::Error| UpdateError::NetworkError {
            url: self.feed_url.clone(),
            reason: if e.is_timeout() {
                format!("timed out after {}s", self.timeout.as_secs())
            } else {
                e.to_string()
            },
        };

        let response = self
            .client
            .get(&self.feed_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpError {
                url: self.feed_url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(network_error)?;
        ReleaseInfo::from_feed(&body)
    }

    /// Compare the latest release against `current` and persist the findings.
    ///
    /// On any failure the store is left untouched.
    pub async fn check(
        &self,
        current: &PluginVersion,
        store: &StateStore,
    ) -> Result<CheckOutcome, UpdateError> {
        let release = self.fetch_latest().await?;
        let available = resolve_available(current, &release.version);

        store.update(|state| {
            state.record_check(
                available,
                release.version.to_string(),
                release.artifact_url.clone(),
                release.checksum_url.clone(),
            );
        })?;

        if available {
            info!(current = %current, latest = %release.version, "Update available");
        } else {
            debug!(current = %current, latest = %release.version, "Already on latest version");
        }

        Ok(CheckOutcome {
            available,
            latest: release.version,
            artifact_url: release.artifact_url,
        })
    }
}
