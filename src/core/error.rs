//! Error handling for the lightgroup tools updater
//!
//! This module provides the error taxonomy shared by every update operation
//! and the user-facing report built from it. The error system follows two
//! principles:
//! 1. **Strongly-typed errors** so callers and tests can match on the exact
//!    failure kind of a check, stage, or install
//! 2. **User-friendly messages** with actionable suggestions for the artist
//!    reading the host's report line
//!
//! # Architecture
//!
//! - [`UpdateError`] - Enumerated error kinds for all failures in the update core
//! - [`ErrorContext`] - Wrapper that adds details and a suggestion to an error
//!
//! Filesystem helpers deep inside the components return [`anyhow::Result`]
//! with context; each component maps those onto an [`UpdateError`] variant
//! at its own boundary. Nothing in the update core panics or propagates an
//! error into the host: the [`operators`](crate::operators) layer turns every
//! `UpdateError` into a report.
//!
//! # Examples
//!
//! ```rust,no_run
//! use lightgroup_tools::core::{UpdateError, create_error_context};
//!
//! let error = UpdateError::HttpError {
//!     url: "https://api.github.com/repos/o/r/releases/latest".to_string(),
//!     status: 403,
//! };
//! let context = create_error_context(&error);
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The error kinds produced by the update core.
///
/// Every variant is recoverable: a failed operation leaves the persisted
/// [`UpdateState`](crate::updater::UpdateState) in its last well-defined
/// state, and the user or the startup reconciler may simply retry.
///
/// # Error Categories
///
/// ## Release feed
/// - [`NetworkError`] - DNS, TLS, refused connection, or timeout
/// - [`HttpError`] - non-2xx response from the feed or a checksum file
/// - [`ParseError`] - malformed JSON or version tag
///
/// ## Staging
/// - [`NoUpdateAvailable`] - nothing to download according to the store
/// - [`DownloadError`] - transport failure while fetching the archive
/// - [`ChecksumMismatch`] - archive digest differs from the published one
/// - [`ArchiveError`] - corrupt or unsafe zip archive
/// - [`LayoutError`] - archive does not contain the expected plugin payload
///
/// ## Installation
/// - [`NothingStaged`] - no verified stage is recorded
/// - [`StaleStage`] - the stage belongs to a release that is no longer the latest
/// - [`PermissionDenied`] - a path could not be written
/// - [`InstallError`] - file replacement failed (live directory restored)
///
/// ## Infrastructure
/// - [`OperationInProgress`] - the same operation is already running
/// - [`StoreError`] - persisted state could not be read or written
/// - [`ConfigError`] - invalid configuration or host setup
///
/// [`NetworkError`]: UpdateError::NetworkError
/// [`HttpError`]: UpdateError::HttpError
/// [`ParseError`]: UpdateError::ParseError
/// [`NoUpdateAvailable`]: UpdateError::NoUpdateAvailable
/// [`DownloadError`]: UpdateError::DownloadError
/// [`ChecksumMismatch`]: UpdateError::ChecksumMismatch
/// [`ArchiveError`]: UpdateError::ArchiveError
/// [`LayoutError`]: UpdateError::LayoutError
/// [`NothingStaged`]: UpdateError::NothingStaged
/// [`StaleStage`]: UpdateError::StaleStage
/// [`PermissionDenied`]: UpdateError::PermissionDenied
/// [`InstallError`]: UpdateError::InstallError
/// [`OperationInProgress`]: UpdateError::OperationInProgress
/// [`StoreError`]: UpdateError::StoreError
/// [`ConfigError`]: UpdateError::ConfigError
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("Could not reach {url}: {reason}")]
    NetworkError {
        /// The URL that could not be reached
        url: String,
        /// Transport-level reason (DNS, TLS, timeout, ...)
        reason: String,
    },

    #[error("{url} responded with HTTP {status}")]
    HttpError {
        /// The URL that answered with a failure status
        url: String,
        /// The HTTP status code
        status: u16,
    },

    #[error("Could not parse release information: {reason}")]
    ParseError {
        /// What was malformed
        reason: String,
    },

    #[error("No update available")]
    NoUpdateAvailable,

    #[error("Failed to download update from {url}: {reason}")]
    DownloadError {
        /// Artifact URL being downloaded
        url: String,
        /// Reason for the failure
        reason: String,
    },

    #[error("Checksum verification failed for {path}")]
    ChecksumMismatch {
        /// Archive whose digest did not match
        path: String,
        /// Published digest
        expected: String,
        /// Digest computed locally
        actual: String,
    },

    #[error("Invalid update archive {path}: {reason}")]
    ArchiveError {
        /// Archive being read
        path: String,
        /// Reason the archive could not be extracted
        reason: String,
    },

    #[error("Unexpected update archive layout: {reason}")]
    LayoutError {
        /// What was missing or unexpected
        reason: String,
    },

    #[error("No downloaded update is ready to install")]
    NothingStaged,

    #[error("Downloaded update v{staged} is stale; the latest release is v{latest}")]
    StaleStage {
        /// Version of the discarded stage
        staged: String,
        /// Version currently advertised by the feed
        latest: String,
    },

    #[error("Permission denied while {operation}: {path}")]
    PermissionDenied {
        /// What was being attempted
        operation: String,
        /// Path that could not be accessed
        path: String,
    },

    #[error("Failed to install update: {reason}")]
    InstallError {
        /// Underlying cause, including restore outcome
        reason: String,
    },

    #[error("Another '{operation}' operation is already in progress")]
    OperationInProgress {
        /// Name of the contended operation
        operation: String,
    },

    #[error("Failed to persist update state at {path}: {reason}")]
    StoreError {
        /// State file location
        path: String,
        /// Underlying I/O or format error
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },
}

impl UpdateError {
    /// Short machine-readable name of the error kind, used as a log field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NetworkError {
                ..
            } => "network",
            Self::HttpError {
                ..
            } => "http",
            Self::ParseError {
                ..
            } => "parse",
            Self::NoUpdateAvailable => "no_update_available",
            Self::DownloadError {
                ..
            } => "download",
            Self::ChecksumMismatch {
                ..
            } => "checksum",
            Self::ArchiveError {
                ..
            } => "archive",
            Self::LayoutError {
                ..
            } => "layout",
            Self::NothingStaged => "nothing_staged",
            Self::StaleStage {
                ..
            } => "stale_stage",
            Self::PermissionDenied {
                ..
            } => "permission",
            Self::InstallError {
                ..
            } => "install",
            Self::OperationInProgress {
                ..
            } => "in_progress",
            Self::StoreError {
                ..
            } => "store",
            Self::ConfigError {
                ..
            } => "config",
        }
    }

    /// Whether the error should be shown as a warning rather than an error.
    ///
    /// These describe a state the user can act on, not a malfunction.
    #[must_use]
    pub const fn is_advisory(&self) -> bool {
        matches!(
            self,
            Self::NoUpdateAvailable
                | Self::NothingStaged
                | Self::OperationInProgress {
                    ..
                }
        )
    }
}

/// An [`UpdateError`] enriched with details and a suggestion for the user.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors, as the host console shows it.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Create a user-friendly error context from an [`UpdateError`].
#[must_use]
pub fn create_error_context(error: &UpdateError) -> ErrorContext {
    let context = ErrorContext::new(error.clone());
    match error {
        UpdateError::NetworkError {
            ..
        } => context
            .with_suggestion("Check your internet connection and try again")
            .with_details("The release feed could not be reached before the request timed out"),
        UpdateError::HttpError {
            status,
            ..
        } => {
            let suggestion = match status {
                403 | 429 => "The release host is rate limiting requests; wait a few minutes and retry",
                404 => "The release feed URL may be wrong; check `feed_url` in the updater config",
                _ => "Try again later",
            };
            context.with_suggestion(suggestion)
        }
        UpdateError::ParseError {
            ..
        } => context
            .with_suggestion("The latest release is not in a supported format; report this to the toolkit maintainers"),
        UpdateError::NoUpdateAvailable => {
            context.with_suggestion("Run 'Check for Updates' first")
        }
        UpdateError::DownloadError {
            ..
        } => context.with_suggestion("Check your internet connection and run 'Download Update' again"),
        UpdateError::ChecksumMismatch {
            expected,
            actual,
            ..
        } => context
            .with_suggestion("Run 'Download Update' again; if the mismatch persists do not install this release")
            .with_details(format!("Expected {expected}, got {actual}")),
        UpdateError::ArchiveError {
            ..
        }
        | UpdateError::LayoutError {
            ..
        } => context
            .with_suggestion("The release archive is incompatible with this plugin; download again or install manually"),
        UpdateError::NothingStaged => {
            context.with_suggestion("Download an update before installing it")
        }
        UpdateError::StaleStage {
            ..
        } => context.with_suggestion("Run 'Download Update' to fetch the latest release"),
        UpdateError::PermissionDenied {
            ..
        } => context.with_suggestion("Check that the plugin directory is writable by the host application"),
        UpdateError::InstallError {
            ..
        } => context
            .with_suggestion("Restart the host application; the update will be retried on startup")
            .with_details("A file in the plugin directory is most likely in use by the running plugin"),
        UpdateError::OperationInProgress {
            ..
        } => context.with_suggestion("Wait for the running operation to finish"),
        UpdateError::StoreError {
            path,
            ..
        } => context.with_suggestion(format!("Check that {path} is writable and not corrupted")),
        UpdateError::ConfigError {
            ..
        } => context.with_suggestion("Fix or remove the updater config file"),
    }
}
