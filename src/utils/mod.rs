//! Cross-platform utilities and helpers
//!
//! - [`fs`] - Durable writes and plugin-directory copy/clear operations
//! - [`backoff`] - Retry schedules for operations that may hit locked files

pub mod backoff;
pub mod fs;

pub use fs::{atomic_write, clear_dir_except, copy_dir_except, ensure_dir, remove_dir_all};
