//! Application initialization and resource setup.
//!
//! This module provides functions to initialize the shared collaborators:
//! - Logger (env_logger, plain or JSON)
//! - HTTP client factory (reqwest)
//! - DNS resolver (hickory)
//! - The [`ServiceLocator`] bundling them for test runs
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;
mod resolver;

use std::sync::Arc;

use log::debug;

use crate::config::Settings;
use crate::error_handling::InitializationError;
use crate::services::{ServiceLocator, TcpPinger};

// Re-export public API
pub use client::init_client_factory;
pub use logger::init_logger_with;
pub use resolver::init_resolver;

/// Builds a service locator with the bundled collaborators.
///
/// Registers the hickory DNS resolver, the TCP reachability pinger and the
/// reqwest client factory. No browser factory is bundled; callers selecting
/// the browser client type register their own with
/// [`ServiceLocator::with_browser_factory`].
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if the HTTP client cannot be
/// built.
pub fn init_services(settings: &Settings) -> Result<ServiceLocator, InitializationError> {
    let factory = init_client_factory(settings)?;
    debug!(
        "Services ready (timeout {:?}, retry {})",
        settings.timeout, settings.retry
    );
    Ok(ServiceLocator::new()
        .with_dns_resolver(Arc::new(init_resolver()))
        .with_pinger(Arc::new(TcpPinger::default()))
        .with_http_client_factory(factory))
}
