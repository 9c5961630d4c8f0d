//! HTTP client initialization.

use std::sync::Arc;

use crate::config::Settings;
use crate::http::{ClientProfile, ReqwestClientFactory};

/// Initializes the HTTP client factory for the configured settings.
///
/// The client the request sender will ask for (redirects disabled, retry per
/// `settings.retry`) is built eagerly so configuration problems surface at
/// startup rather than on the first test.
///
/// # Arguments
///
/// * `settings` - Run settings providing the timeout, user agent and retry flag
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client_factory(
    settings: &Settings,
) -> Result<Arc<ReqwestClientFactory>, reqwest::Error> {
    let factory = ReqwestClientFactory::new(settings.timeout, settings.user_agent.clone());
    factory.prepare(ClientProfile {
        retry: settings.retry,
        follow_redirects: false,
    })?;
    Ok(Arc::new(factory))
}
