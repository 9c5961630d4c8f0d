//! Configuration types.
//!
//! This module defines the run settings handed to every test component and the
//! enums used for command-line argument parsing.

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::constants::{
    default_ping_timeout, DEFAULT_MAX_REDIRECTIONS, DEFAULT_PING_TTL, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT, DEFAULT_VIEWPORT,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Which network client drives the request step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum ClientType {
    /// Plain HTTP transport, redirects followed by explicit re-send
    #[default]
    Http,
    /// Headless browser, redirects observed through navigation callbacks
    Browser,
}

/// Rendering engine requested from the browser factory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum BrowserEngine {
    /// Chromium / Chrome
    #[default]
    Chromium,
    /// Gecko
    Firefox,
    /// WebKit
    Webkit,
}

/// Browser viewport size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u32,
    /// Height in CSS pixels
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT.0,
            height: DEFAULT_VIEWPORT.1,
        }
    }
}

/// Run settings (no CLI dependencies).
///
/// One `Settings` value is shared by every component of a pipeline for the
/// duration of a run. It can be constructed programmatically:
///
/// ```
/// use site_probe::Settings;
///
/// let settings = Settings {
///     continue_on_failure: true,
///     max_redirections: 5,
///     ..Default::default()
/// };
/// assert!(settings.follow_redirects);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Keep running the remaining components after a failed step
    pub continue_on_failure: bool,

    /// Follow HTTP redirects (each hop is recorded as its own step)
    pub follow_redirects: bool,

    /// Maximum number of redirect hops before the request fails
    pub max_redirections: usize,

    /// Retry transient transport failures with exponential backoff
    pub retry: bool,

    /// Per-request timeout
    pub timeout: Duration,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Client used by the request step
    pub client_type: ClientType,

    /// Ping timeout per address
    pub ping_timeout: Duration,

    /// Ping time-to-live
    pub ping_ttl: u8,

    /// Set the don't-fragment flag on ping packets
    pub ping_dont_fragment: bool,

    /// Browser viewport
    pub viewport: Viewport,

    /// Browser engine
    pub browser_engine: BrowserEngine,

    /// Decline sessions whose start date lies before today (UTC) instead of
    /// only logging a warning
    pub enforce_start_date: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            continue_on_failure: false,
            follow_redirects: true,
            max_redirections: DEFAULT_MAX_REDIRECTIONS,
            retry: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            client_type: ClientType::Http,
            ping_timeout: default_ping_timeout(),
            ping_ttl: DEFAULT_PING_TTL,
            ping_dont_fragment: false,
            viewport: Viewport::default(),
            browser_engine: BrowserEngine::Chromium,
            enforce_start_date: false,
        }
    }
}
