//! Error handling.
//!
//! This module provides:
//! - The catalog of categorized test failures ([`TestError`], [`ErrorCode`])
//! - Typed errors for the `Result` channels (initialization, transport,
//!   property bag access, step construction, fatal probe errors)
//! - The retry strategy used by retrying HTTP clients
//!
//! Failures are split by cause:
//! - **Fatal**: a required collaborator is missing, or the run was cancelled
//!   ([`ProbeError`])
//! - **Probe / protocol / validation failures**: recorded as failed steps
//!   carrying a [`TestError`]
//! - **Declines**: the whole session is declined with a [`TestError`] reason

mod catalog;
mod types;

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

// Re-export public API
pub use catalog::{ErrorCode, TestError};
pub use types::{InitializationError, ProbeError, PropertyBagError, StepError, TransportError};

/// Creates an exponential backoff retry strategy.
///
/// Returns a retry strategy configured with:
/// - Initial delay: `RETRY_INITIAL_DELAY_MS` milliseconds
/// - Growth: each delay is `RETRY_BACKOFF_BASE` times the previous one
/// - Maximum delay: `RETRY_MAX_DELAY_SECS` seconds
/// - Maximum attempts: `RETRY_MAX_ATTEMPTS`
///
/// `ExponentialBackoff` yields `factor * base^n`, so the base is the growth
/// rate and the factor scales the first delay.
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    use crate::config::{RETRY_BACKOFF_BASE, RETRY_INITIAL_DELAY_MS};
    ExponentialBackoff::from_millis(RETRY_BACKOFF_BASE)
        .factor(RETRY_INITIAL_DELAY_MS / RETRY_BACKOFF_BASE)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
        .take(crate::config::RETRY_MAX_ATTEMPTS)
}

/// Whether a transport error is transient and worth retrying.
///
/// Timeouts and connection failures are retried; anything carrying an HTTP
/// status, or a malformed request, is not.
pub fn is_retriable(error: &reqwest::Error) -> bool {
    if error.status().is_some() || error.is_builder() || error.is_redirect() {
        return false;
    }
    error.is_timeout() || error.is_connect() || error.is_request()
}
