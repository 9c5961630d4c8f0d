//! Bundled leaf probes.
//!
//! - [`DnsProbe`]: resolves the host, publishes [`crate::property_bag::keys::IP_ADDRESSES`]
//! - [`PingProbe`]: checks that one of the published addresses answers
//! - [`StatusCodeValidator`], [`HeaderValidator`], [`ResponseValidator`]:
//!   check the last HTTP response recorded by a request sender

mod dns;
mod ping;
mod validators;

pub use dns::DnsProbe;
pub use ping::PingProbe;
pub use validators::{HeaderValidator, ResponseValidator, StatusCodeValidator};
