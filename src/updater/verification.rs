use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::ChecksumPolicy;
use crate::core::UpdateError;

/// Verifies downloaded release archives against published SHA-256 checksums.
///
/// Releases may carry a checksum asset: either a single-entry `*.sha256`
/// file or a `SHA256SUMS`/`checksums.txt` listing with one
/// `<hex digest>  <file name>` line per artifact. The verifier fetches that
/// file, picks the digest belonging to the archive, and compares it with
/// the digest of the bytes actually downloaded.
#[derive(Debug, Clone)]
pub struct ChecksumVerifier {
    client: reqwest::Client,
    policy: ChecksumPolicy,
}

impl ChecksumVerifier {
    pub fn new(client: reqwest::Client, policy: ChecksumPolicy) -> Self {
        Self {
            client,
            policy,
        }
    }

    pub fn policy(&self) -> ChecksumPolicy {
        self.policy
    }

    /// Compute the lowercase hex SHA-256 digest of a file.
    pub async fn compute_sha256(file_path: &Path) -> Result<String, UpdateError> {
        debug!(file = %file_path.display(), "Computing SHA-256");

        let contents = fs::read(file_path).await.map_err(|e| UpdateError::DownloadError {
            url: file_path.display().to_string(),
            reason: format!("failed to read downloaded archive: {e}"),
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Compare a file's digest with `expected`.
    ///
    /// The comparison ignores case and an optional `sha256:` prefix.
    pub async fn verify_checksum(file_path: &Path, expected: &str) -> Result<(), UpdateError> {
        let actual = Self::compute_sha256(file_path).await?;
        let expected = normalize_digest(expected);

        if actual != expected {
            return Err(UpdateError::ChecksumMismatch {
                path: file_path.display().to_string(),
                expected,
                actual,
            });
        }

        info!(file = %file_path.display(), "Checksum verified");
        Ok(())
    }

    /// Download the checksum file and find the digest for `artifact_name`.
    ///
    /// Returns `Ok(None)` when the file has no entry for the artifact.
    pub async fn fetch_expected_checksum(
        &self,
        checksum_url: &str,
        artifact_name: &str,
    ) -> Result<Option<String>, UpdateError> {
        debug!(url = checksum_url, "Fetching published checksums");

        let download_error = |reason: String| UpdateError::DownloadError {
            url: checksum_url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(checksum_url)
            .send()
            .await
            .map_err(|e| download_error(format!("failed to fetch checksum file: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpError {
                url: checksum_url.to_string(),
                status: status.as_u16(),
            });
        }

        let content = response
            .text()
            .await
            .map_err(|e| download_error(format!("failed to read checksum file: {e}")))?;

        Ok(parse_checksum_file(&content, artifact_name))
    }

    /// Apply the configured policy to a downloaded archive.
    ///
    /// Returns `true` if the archive was verified, `false` if verification
    /// was skipped.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::ChecksumMismatch`] if the digests differ, or if the
    ///   policy is `require` and the release publishes no usable checksum
    /// - [`UpdateError::DownloadError`] / [`UpdateError::HttpError`] if a
    ///   published checksum file cannot be fetched
    pub async fn verify_archive(
        &self,
        archive: &Path,
        checksum_url: Option<&str>,
        artifact_name: &str,
    ) -> Result<bool, UpdateError> {
        if self.policy == ChecksumPolicy::Skip {
            debug!("Checksum verification disabled");
            return Ok(false);
        }

        let expected = match checksum_url {
            Some(url) => self.fetch_expected_checksum(url, artifact_name).await?,
            None => None,
        };

        match expected {
            Some(expected) => {
                Self::verify_checksum(archive, &expected).await?;
                Ok(true)
            }
            None if self.policy == ChecksumPolicy::Require => {
                Err(UpdateError::ChecksumMismatch {
                    path: archive.display().to_string(),
                    expected: "<not published>".to_string(),
                    actual: Self::compute_sha256(archive).await?,
                })
            }
            None => {
                warn!(artifact = artifact_name, "No checksum published for release, skipping verification");
                Ok(false)
            }
        }
    }
}

fn normalize_digest(digest: &str) -> String {
    let digest = digest.trim();
    digest.strip_prefix("sha256:").unwrap_or(digest).to_ascii_lowercase()
}

fn is_hex_digest(candidate: &str) -> bool {
    candidate.len() == 64 && candidate.chars().all(|c| c.is_ascii_hexdigit())
}

/// Extract the digest for `artifact_name` from a checksum file.
///
/// Lines are `<digest> <name>` (with `*` marking binary mode in
/// `sha256sum` output) or a bare digest. A file holding exactly one digest
/// applies to the artifact regardless of the name next to it.
pub fn parse_checksum_file(content: &str, artifact_name: &str) -> Option<String> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(digest) = parts.next() else {
            continue;
        };
        let digest = normalize_digest(digest);
        if !is_hex_digest(&digest) {
            continue;
        }

        let matches_artifact = parts
            .next()
            .map(|name| name.trim_start_matches('*'))
            .is_some_and(|name| name == artifact_name || name.ends_with(&format!("/{artifact_name}")));
        if matches_artifact {
            return Some(digest);
        }
        entries.push(digest);
    }

    if entries.len() == 1 {
        entries.pop()
    } else {
        None
    }
}
