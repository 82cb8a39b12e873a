use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::UpdateError;
use crate::updater::lock::StoreLock;
use crate::utils::fs::atomic_write;

/// Where an update cycle currently stands, derived from [`UpdateState`].
///
/// ```text
/// IDLE → (check, found newer) → AVAILABLE → (stage ok) → STAGED → (install ok) → IDLE
/// AVAILABLE → (check, none newer) → IDLE
/// STAGED → (install fails, recoverable) → STAGED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    Idle,
    Available,
    Staged,
}

/// Durable record of update status, surviving process restarts.
///
/// The resolver owns `update_available`, `latest_version`, `download_url`
/// and `checksum_url`; the stager owns the `staged_*` fields and
/// `update_downloaded`; the installer clears the stage and the availability
/// flag on success. Every component treats "load, modify, save the whole
/// record" as its unit of work.
///
/// Invariant: `update_downloaded` implies `staged_path` is set, and the
/// stage was produced from `staged_from`/`staged_version`. A stage is only
/// installable while those still match `download_url`/`latest_version`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateState {
    /// The feed advertised a version newer than the running one.
    #[serde(default)]
    pub update_available: bool,

    /// Version advertised by the feed at the last successful check.
    #[serde(default)]
    pub latest_version: String,

    /// Artifact location for `latest_version`.
    #[serde(default)]
    pub download_url: String,

    /// Published checksum file for the artifact, when the release has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_url: Option<String>,

    /// Extracted, ready-to-install payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staged_path: Option<PathBuf>,

    /// `download_url` the stage was produced from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staged_from: Option<String>,

    /// `latest_version` the stage was produced for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staged_version: Option<String>,

    /// `staged_path` is populated and was verified when it was recorded.
    #[serde(default)]
    pub update_downloaded: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staged_at: Option<DateTime<Utc>>,
}

impl UpdateState {
    pub fn phase(&self) -> UpdatePhase {
        if self.update_downloaded && self.staged_path.is_some() {
            UpdatePhase::Staged
        } else if self.update_available {
            UpdatePhase::Available
        } else {
            UpdatePhase::Idle
        }
    }

    /// Record the outcome of a release check.
    pub fn record_check(
        &mut self,
        available: bool,
        latest_version: String,
        download_url: String,
        checksum_url: Option<String>,
    ) {
        self.update_available = available;
        self.latest_version = latest_version;
        self.download_url = download_url;
        self.checksum_url = checksum_url;
        self.checked_at = Some(Utc::now());
    }

    /// Record a freshly extracted payload for the current `download_url`.
    pub fn record_stage(&mut self, staged_path: PathBuf) {
        let (from, version) = (self.download_url.clone(), self.latest_version.clone());
        self.record_stage_of(staged_path, from, version);
    }

    /// Record a payload extracted from `from` for `version`, which may no
    /// longer be the advertised release.
    pub fn record_stage_of(&mut self, staged_path: PathBuf, from: String, version: String) {
        self.staged_path = Some(staged_path);
        self.staged_from = Some(from);
        self.staged_version = Some(version);
        self.update_downloaded = true;
        self.staged_at = Some(Utc::now());
    }

    /// Forget the current stage, if any.
    pub fn clear_stage(&mut self) {
        self.staged_path = None;
        self.staged_from = None;
        self.staged_version = None;
        self.update_downloaded = false;
        self.staged_at = None;
    }

    /// Clear the stage and availability after a successful install.
    pub fn mark_installed(&mut self) {
        self.clear_stage();
        self.update_available = false;
    }

    /// Whether the recorded stage still belongs to the advertised release.
    pub fn is_stage_current(&self) -> bool {
        self.staged_from.as_deref() == Some(self.download_url.as_str())
            && self.staged_version.as_deref() == Some(self.latest_version.as_str())
    }
}

/// File-backed store for [`UpdateState`].
///
/// `save` is a single atomic, fsynced write, so a later step can rely on a
/// prior `save` having reached disk. The operation locks in
/// [`lock`](super::lock) keep each operation from overlapping itself;
/// [`update`](Self::update) additionally holds a [`StoreLock`] so a check
/// and a stage running side by side never lose each other's fields.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state.
    ///
    /// A missing file is the first activation of the plugin and yields the
    /// all-false/empty default.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::StoreError`] if the file cannot be read or parsed.
    pub fn load(&self) -> Result<UpdateState, UpdateError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No update state found, starting fresh");
            return Ok(UpdateState::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| self.error(e))?;
        serde_json::from_str(&content).map_err(|e| self.error(e))
    }

    /// Persist `state`, replacing the previous record atomically.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::StoreError`] on any serialization or I/O failure.
    pub fn save(&self, state: &UpdateState) -> Result<(), UpdateError> {
        let content = serde_json::to_vec_pretty(state).map_err(|e| self.error(e))?;
        atomic_write(&self.path, &content).map_err(|e| self.error(format!("{e:#}")))?;
        debug!(path = %self.path.display(), phase = ?state.phase(), "Saved update state");
        Ok(())
    }

    /// Load, modify, and save the record in one step, holding the Store
    /// lock throughout.
    pub fn update<F>(&self, modify: F) -> Result<UpdateState, UpdateError>
    where
        F: FnOnce(&mut UpdateState),
    {
        let _lock = StoreLock::acquire(self.path.with_extension("lock"))?;
        let mut state = self.load()?;
        modify(&mut state);
        self.save(&state)?;
        Ok(state)
    }

    fn error(&self, reason: impl ToString) -> UpdateError {
        UpdateError::StoreError {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
