//! DNS resolver initialization.

use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use crate::services::HickoryDnsResolver;

/// Builds the hickory resolver used by [`crate::probes::DnsProbe`].
///
/// Uses the default upstream configuration with short timeouts, so an
/// unresponsive DNS server fails the probe instead of stalling the run.
///
/// # Returns
///
/// A [`HickoryDnsResolver`] sharing one `TokioAsyncResolver` between runs.
pub fn init_resolver() -> HickoryDnsResolver {
    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(crate::config::DNS_TIMEOUT_SECS);
    opts.attempts = 2;
    // Test URLs carry fully qualified hosts; never append search domains
    opts.ndots = 0;

    HickoryDnsResolver::new(Arc::new(TokioAsyncResolver::tokio(
        ResolverConfig::default(),
        opts,
    )))
}
