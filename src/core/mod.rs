//! Core types shared by every part of the plugin.
//!
//! Currently this is the error taxonomy of the update core and the
//! user-facing [`ErrorContext`] built from it. See [`error`] for details.

pub mod error;

pub use error::{ErrorContext, UpdateError, create_error_context};
