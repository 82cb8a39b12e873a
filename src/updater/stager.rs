use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::UpdaterConfig;
use crate::constants::{ARCHIVE_FILE_NAME, EXTRACT_DIR_NAME, PARTIAL_SUFFIX};
use crate::core::UpdateError;
use crate::updater::state::{StateStore, UpdateState};
use crate::updater::verification::ChecksumVerifier;

/// Downloads and extracts a release so it is ready to install.
///
/// Everything happens below a durable work directory:
///
/// ```text
/// <work_dir>/
/// ├── update.zip.part   # download in progress
/// ├── update.zip        # complete download, deleted after extraction
/// └── extract/
///     └── <top>/        # the archive's single top-level directory
///         └── lightgroup_tools/   # staged payload
/// ```
///
/// Staging replaces any previous stage: the old extraction directory is
/// removed and the Store's stage fields are cleared before the download
/// starts.
#[derive(Debug, Clone)]
pub struct ArtifactStager {
    client: reqwest::Client,
    work_dir: PathBuf,
    payload_dir: String,
    payload_marker: Option<String>,
    verifier: ChecksumVerifier,
}

impl ArtifactStager {
    pub fn new(client: reqwest::Client, config: &UpdaterConfig, work_dir: PathBuf) -> Self {
        Self {
            verifier: ChecksumVerifier::new(client.clone(), config.checksum),
            client,
            work_dir,
            payload_dir: config.payload_dir.clone(),
            payload_marker: config.payload_marker.clone().filter(|marker| !marker.is_empty()),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn archive_path(&self) -> PathBuf {
        self.work_dir.join(ARCHIVE_FILE_NAME)
    }

    pub fn extract_dir(&self) -> PathBuf {
        self.work_dir.join(EXTRACT_DIR_NAME)
    }

    fn partial_path(&self) -> PathBuf {
        self.work_dir.join(format!("{ARCHIVE_FILE_NAME}.{PARTIAL_SUFFIX}"))
    }

    /// Download, verify, and extract the release recorded in the Store.
    ///
    /// On success the payload location is written to the Store as
    /// `staged_path` with `update_downloaded = true` and returned.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::NoUpdateAvailable`] if the last check found nothing newer
    /// - [`UpdateError::DownloadError`] if the artifact cannot be fetched or written
    /// - [`UpdateError::ChecksumMismatch`] if verification fails
    /// - [`UpdateError::ArchiveError`] if the archive is corrupt or unsafe
    /// - [`UpdateError::LayoutError`] if the archive is empty or lacks the payload
    pub async fn stage(&self, store: &StateStore) -> Result<PathBuf, UpdateError> {
        let mut state = store.load()?;
        if !state.update_available || state.download_url.is_empty() {
            return Err(UpdateError::NoUpdateAvailable);
        }

        self.discard_previous_stage(store, &mut state).await?;

        let url = state.download_url.clone();
        info!(url = %url, version = %state.latest_version, "Downloading update");
        let archive = self.download(&url).await?;

        let artifact = artifact_name(&url);
        if let Err(e) =
            self.verifier.verify_archive(&archive, state.checksum_url.as_deref(), &artifact).await
        {
            discard(&archive, fs::remove_file(&archive).await);
            return Err(e);
        }

        let extract_dir = self.extract_dir();
        let staged = match self.extract_and_locate(&archive, &extract_dir).await {
            Ok(staged) => staged,
            Err(e) => {
                discard(&extract_dir, fs::remove_dir_all(&extract_dir).await);
                discard(&archive, fs::remove_file(&archive).await);
                return Err(e);
            }
        };

        if let Err(e) = fs::remove_file(&archive).await {
            warn!(archive = %archive.display(), error = %e, "Failed to delete downloaded archive");
        }

        let version = state.latest_version.clone();
        store.update(|current| current.record_stage_of(staged.clone(), url.clone(), version.clone()))?;

        info!(staged = %staged.display(), version = %version, "Update staged");
        Ok(staged)
    }

    /// Remove whatever a previous stage left behind.
    ///
    /// The Store is only rewritten when it actually recorded a stage, so a
    /// first attempt that fails leaves it exactly as it was.
    async fn discard_previous_stage(
        &self,
        store: &StateStore,
        state: &mut UpdateState,
    ) -> Result<(), UpdateError> {
        if state.staged_path.is_some() || state.update_downloaded {
            debug!("Discarding previous stage");
            *state = store.update(UpdateState::clear_stage)?;
        }

        let extract_dir = self.extract_dir();
        let remove_error = |e: std::io::Error| UpdateError::PermissionDenied {
            operation: "remove previous stage".to_string(),
            path: format!("{} ({e})", extract_dir.display()),
        };
        if fs::try_exists(&extract_dir).await.map_err(remove_error)? {
            fs::remove_dir_all(&extract_dir).await.map_err(remove_error)?;
        }
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<PathBuf, UpdateError> {
        let download_error = |reason: String| UpdateError::DownloadError {
            url: url.to_string(),
            reason,
        };

        fs::create_dir_all(&self.work_dir).await.map_err(|e| {
            download_error(format!("cannot create {}: {e}", self.work_dir.display()))
        })?;

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("server responded with HTTP {}", status.as_u16())));
        }

        // Truncates any `.part` left by an interrupted attempt.
        let partial = self.partial_path();
        let mut file = fs::File::create(&partial)
            .await
            .map_err(|e| download_error(format!("cannot create {}: {e}", partial.display())))?;

        let mut written: u64 = 0;
        while let Some(chunk) =
            response.chunk().await.map_err(|e| download_error(format!("transfer interrupted: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| download_error(format!("write to {} failed: {e}", partial.display())))?;
            written += chunk.len() as u64;
        }

        file.sync_all()
            .await
            .map_err(|e| download_error(format!("sync of {} failed: {e}", partial.display())))?;
        drop(file);

        let archive = self.archive_path();
        fs::rename(&partial, &archive)
            .await
            .map_err(|e| download_error(format!("cannot move download into place: {e}")))?;

        debug!(bytes = written, archive = %archive.display(), "Download complete");
        Ok(archive)
    }

    async fn extract_and_locate(
        &self,
        archive: &Path,
        extract_dir: &Path,
    ) -> Result<PathBuf, UpdateError> {
        extract_archive(archive, extract_dir).await?;
        locate_payload(extract_dir, &self.payload_dir, self.payload_marker.as_deref())
    }
}

/// Log a cleanup after a failed stage that did not complete; the stage's
/// own error is what gets reported.
fn discard(path: &Path, result: std::io::Result<()>) {
    if let Err(e) = result {
        debug!(path = %path.display(), error = %e, "Cleanup after failed stage incomplete");
    }
}

/// File name the release server gives the artifact, used to look it up in
/// checksum listings.
fn artifact_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed.path_segments().and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| ARCHIVE_FILE_NAME.to_string())
}

/// Extract every entry of a zip archive into `dest`.
///
/// Entries whose paths would escape `dest` are rejected by the zip reader.
///
/// # Errors
///
/// - [`UpdateError::LayoutError`] if the archive has no entries
/// - [`UpdateError::ArchiveError`] if it is corrupt or unsafe
pub async fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, UpdateError> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let archive_display = archive.display().to_string();

    tokio::task::spawn_blocking(move || {
        let archive_error = |reason: String| UpdateError::ArchiveError {
            path: archive.display().to_string(),
            reason,
        };

        let file = std::fs::File::open(&archive)
            .map_err(|e| archive_error(format!("cannot open archive: {e}")))?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;

        if zip.is_empty() {
            return Err(UpdateError::LayoutError {
                reason: "release archive is empty".to_string(),
            });
        }

        let entries = zip.len();
        zip.extract(&dest).map_err(|e| archive_error(e.to_string()))?;
        debug!(entries, dest = %dest.display(), "Archive extracted");
        Ok(entries)
    })
    .await
    .map_err(|e| UpdateError::ArchiveError {
        path: archive_display,
        reason: format!("extraction task failed: {e}"),
    })?
}

/// Find the plugin payload inside an extracted archive.
///
/// The archive must hold exactly one top-level directory, with the payload
/// at `<top>/<payload_dir>` and, if configured, `marker` inside it.
pub fn locate_payload(
    extract_dir: &Path,
    payload_dir: &str,
    marker: Option<&str>,
) -> Result<PathBuf, UpdateError> {
    let entries: Vec<PathBuf> = std::fs::read_dir(extract_dir)
        .map_err(|e| UpdateError::LayoutError {
            reason: format!("cannot read {}: {e}", extract_dir.display()),
        })?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();

    let top = match entries.as_slice() {
        [] => {
            return Err(UpdateError::LayoutError {
                reason: "release archive is empty".to_string(),
            });
        }
        [single] if single.is_dir() => single,
        _ => {
            return Err(UpdateError::LayoutError {
                reason: format!(
                    "expected exactly one top-level directory in the release archive, found {} entries",
                    entries.len()
                ),
            });
        }
    };

    let payload = top.join(payload_dir);
    if !payload.is_dir() {
        return Err(UpdateError::LayoutError {
            reason: format!("release archive has no '{payload_dir}' directory"),
        });
    }

    if let Some(marker) = marker {
        if !payload.join(marker).is_file() {
            return Err(UpdateError::LayoutError {
                reason: format!("'{payload_dir}' in the release archive is missing {marker}"),
            });
        }
    }

    Ok(payload)
}
