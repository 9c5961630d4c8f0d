//! Run configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, retry backoff)
//! - Run settings shared by every test component
//! - CLI option enums

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{BrowserEngine, ClientType, LogFormat, LogLevel, Settings, Viewport};
