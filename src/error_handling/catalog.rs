//! Categorized test failures.
//!
//! A [`TestError`] is the serializable `(code, message)` pair attached to a
//! failed step or a declined session. The catalog is a closed set of codes and
//! a set of pure constructor functions; nothing here holds state.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;

/// Well-known failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// A collaborator raised an error that was converted into a failed step
    WrappedException,
    /// No HTTP client factory is registered
    MissingClientFactory,
    /// No headless-browser factory is registered
    MissingBrowserFactory,
    /// A probe needs data an earlier probe should have produced
    InsufficientData,
    /// A validator rejected the response
    ValidationFailed,
    /// Hostname resolution failed or returned nothing
    DnsFailed,
    /// None of the resolved addresses answered
    PingFailed,
    /// A pipeline has no components to run
    NoHandlers,
    /// The session has no target URL
    MissingUrl,
    /// The session has no start time
    MissingStartTime,
    /// The session start time lies before today
    BadStartDate,
    /// A redirect chain points back at an already visited URL
    CircularRedirect,
    /// A redirect chain is longer than the configured limit
    TooManyRedirects,
    /// A redirect `Location` could not be turned into an absolute URL
    InvalidRedirectTarget,
}

impl ErrorCode {
    /// Stable code string used in serialized output and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::WrappedException => "wrapped-exception",
            ErrorCode::MissingClientFactory => "missing-client-factory",
            ErrorCode::MissingBrowserFactory => "missing-browser-factory",
            ErrorCode::InsufficientData => "insufficient-data",
            ErrorCode::ValidationFailed => "validation-failed",
            ErrorCode::DnsFailed => "dns-failed",
            ErrorCode::PingFailed => "ping-failed",
            ErrorCode::NoHandlers => "no-handlers",
            ErrorCode::MissingUrl => "missing-url",
            ErrorCode::MissingStartTime => "missing-start-time",
            ErrorCode::BadStartDate => "bad-start-date",
            ErrorCode::CircularRedirect => "circular-redirect",
            ErrorCode::TooManyRedirects => "too-many-redirects",
            ErrorCode::InvalidRedirectTarget => "invalid-redirect-target",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A categorized failure: equality is by code only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestError {
    code: ErrorCode,
    message: String,
}

impl PartialEq for TestError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for TestError {}

impl std::hash::Hash for TestError {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl TestError {
    /// Creates an error with an arbitrary message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The failure category.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Operator-facing description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Wraps a collaborator error, keeping its message (including sources).
    pub fn wrapped(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(ErrorCode::WrappedException, message)
    }

    pub fn missing_client_factory() -> Self {
        Self::new(
            ErrorCode::MissingClientFactory,
            "No HTTP client factory is registered",
        )
    }

    pub fn missing_browser_factory() -> Self {
        Self::new(
            ErrorCode::MissingBrowserFactory,
            "No headless browser factory is registered",
        )
    }

    pub fn insufficient_data(what: &str) -> Self {
        Self::new(
            ErrorCode::InsufficientData,
            format!("Insufficient data: {} is not available", what),
        )
    }

    /// A validator returned false; `message` overrides the default text.
    pub fn validation_failed(validator: &str, message: Option<&str>) -> Self {
        let message = match message {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => format!("Validation '{}' failed", validator),
        };
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn dns_failed(host: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::DnsFailed,
            format!("DNS resolution of '{}' failed: {}", host, reason),
        )
    }

    pub fn ping_failed(addresses: &[String]) -> Self {
        Self::new(
            ErrorCode::PingFailed,
            format!("No response from {}", addresses.join(", ")),
        )
    }

    pub fn no_handlers(pipeline: &str) -> Self {
        Self::new(
            ErrorCode::NoHandlers,
            format!("Pipeline '{}' has no components", pipeline),
        )
    }

    pub fn missing_url() -> Self {
        Self::new(ErrorCode::MissingUrl, "The test URL is missing")
    }

    pub fn missing_start_time() -> Self {
        Self::new(ErrorCode::MissingStartTime, "The test start time is missing")
    }

    pub fn bad_start_date(start: &chrono::DateTime<chrono::Utc>) -> Self {
        Self::new(
            ErrorCode::BadStartDate,
            format!("Start date {} is earlier than today (UTC)", start.to_rfc3339()),
        )
    }

    /// Names the full chain, ending with the URL that closed the loop.
    pub fn circular_redirect(chain: &str) -> Self {
        Self::new(
            ErrorCode::CircularRedirect,
            format!("Circular dependency detected in redirect chain: {}", chain),
        )
    }

    pub fn too_many_redirects(limit: usize, last_url: &str) -> Self {
        Self::new(
            ErrorCode::TooManyRedirects,
            format!(
                "Number of redirections exceeded {} (last URL: {})",
                limit, last_url
            ),
        )
    }

    pub fn invalid_redirect_target(location: &str) -> Self {
        Self::new(
            ErrorCode::InvalidRedirectTarget,
            format!("Invalid redirection target '{}'", location),
        )
    }
}
