//! Configuration constants.
//!
//! Defaults for run settings, network timeouts and retry behaviour.

use std::time::Duration;

/// Maximum number of redirect hops followed before a request is failed.
pub const DEFAULT_MAX_REDIRECTIONS: usize = 10;

/// Per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Ping timeout in milliseconds
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 2000;
/// Time-to-live for ping packets
pub const DEFAULT_PING_TTL: u8 = 64;

/// DNS query timeout in seconds
/// Most DNS queries complete in <1s, 3s provides a buffer while failing fast
pub const DNS_TIMEOUT_SECS: u64 = 3;

/// Ports tried by the TCP reachability check, in order.
pub const REACHABILITY_PORTS: &[u16] = &[443, 80];

/// Default number of sessions run concurrently by `run_tests`.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Default browser viewport (width, height)
pub const DEFAULT_VIEWPORT: (u32, u32) = (1280, 720);

/// Default User-Agent string for HTTP requests.
///
/// Users can override this via the `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Retry strategy (used by clients built with `retry = true`)
/// Initial retry delay in milliseconds
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Growth rate of the retry delay (each delay is this multiple of the last)
pub const RETRY_BACKOFF_BASE: u64 = 2;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 15;
/// Maximum number of retries after the initial attempt
pub const RETRY_MAX_ATTEMPTS: usize = 3;

/// Separator used when naming a redirect chain in error messages.
pub const REDIRECT_CHAIN_SEPARATOR: &str = " -> ";

/// Converts the ping timeout constant into a `Duration`.
pub const fn default_ping_timeout() -> Duration {
    Duration::from_millis(DEFAULT_PING_TIMEOUT_MS)
}
