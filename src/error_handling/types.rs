//! Error type definitions.
//!
//! Typed errors that travel through `Result` channels. Ordinary probe failures
//! never use these; they become failed steps carrying a [`super::TestError`].

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Violations of the [`crate::session::TestStep`] construction invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// A failed step must explain why it failed.
    #[error("Step '{0}' failed without an error message")]
    MissingErrorMessage(String),
}

/// Errors raised by [`crate::property_bag::PropertyBag`] accessors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyBagError {
    /// Keys must have a non-empty name.
    #[error("Property bag key name must not be empty")]
    EmptyKey,

    /// The key is not present.
    #[error("Property '{0}' not found")]
    NotFound(String),

    /// The stored value has a different concrete type.
    #[error("Property '{key}' holds {actual}, expected {expected}")]
    TypeMismatch {
        /// Key that was read
        key: String,
        /// Requested type
        expected: &'static str,
        /// Stored type
        actual: &'static str,
    },
}

/// Failures reported by external collaborators (transport, DNS, ping, browser).
///
/// Components catch these at their boundary and turn them into failed steps.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] ReqwestError),

    /// DNS resolver failure.
    #[error("DNS lookup failed: {0}")]
    Dns(String),

    /// Reachability check failure.
    #[error("Ping failed: {0}")]
    Ping(String),

    /// Headless browser failure.
    #[error("Browser navigation failed: {0}")]
    Browser(String),

    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors that escape a component's `handle` call.
///
/// Only fatal preconditions, cancellation and programming errors travel this
/// way; everything else is recorded as a failed step.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// A required collaborator is not registered in the service locator.
    #[error("Required service is not registered: {0}")]
    MissingService(&'static str),

    /// The run was cancelled; the interrupted step was not recorded.
    #[error("Test run was cancelled")]
    Cancelled,

    /// A step could not be constructed.
    #[error(transparent)]
    Step(#[from] StepError),

    /// A property bag access failed.
    #[error(transparent)]
    PropertyBag(#[from] PropertyBagError),
}
