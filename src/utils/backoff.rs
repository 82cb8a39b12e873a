//! Exponential backoff utilities for retry operations.

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// Backoff schedule allowing `attempts` tries in total.
///
/// Delays grow exponentially from 10ms and are capped at 500ms. The first
/// try happens immediately, so the schedule holds `attempts - 1` delays.
pub fn retry_schedule(attempts: usize) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
        .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
        .take(attempts.saturating_sub(1))
}
