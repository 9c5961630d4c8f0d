//! Hostname resolution probe.

use std::net::IpAddr;

use async_trait::async_trait;
use log::debug;
use tokio_util::sync::CancellationToken;
use url::{Host, Url};

use crate::component::{ComponentInfo, Probe};
use crate::config::Settings;
use crate::error_handling::{ProbeError, TestError};
use crate::property_bag::keys;
use crate::services::ServiceLocator;
use crate::session::{StepKind, TestContext};

/// Resolves the URL host and publishes its addresses under
/// [`keys::IP_ADDRESSES`] for later probes.
///
/// IP-literal hosts are published as-is, without a lookup.
#[derive(Debug, Clone)]
pub struct DnsProbe {
    info: ComponentInfo,
}

impl Default for DnsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsProbe {
    pub fn new() -> Self {
        Self {
            info: ComponentInfo::new("DnsResolution", StepKind::Action),
        }
    }
}

#[async_trait]
impl Probe for DnsProbe {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    async fn handle(
        &self,
        url: &Url,
        _settings: &Settings,
        ctx: &mut TestContext,
        services: &ServiceLocator,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        let clock = ctx.start_timer();
        let addresses: Vec<IpAddr> = match url.host() {
            None => {
                ctx.record_failure(&self.info, &clock, &TestError::insufficient_data("URL host"))?;
                return Ok(());
            }
            Some(Host::Ipv4(ip)) => vec![IpAddr::V4(ip)],
            Some(Host::Ipv6(ip)) => vec![IpAddr::V6(ip)],
            Some(Host::Domain(host)) => {
                let resolver = services.dns_resolver()?;
                let resolved = tokio::select! {
                    _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                    resolved = resolver.resolve(host) => resolved,
                };
                match resolved {
                    Ok(addresses) if !addresses.is_empty() => addresses,
                    Ok(_) => {
                        let error = TestError::dns_failed(host, "no addresses returned");
                        ctx.record_failure(&self.info, &clock, &error)?;
                        return Ok(());
                    }
                    Err(e) => {
                        let error = TestError::dns_failed(host, &e.to_string());
                        ctx.record_failure(&self.info, &clock, &error)?;
                        return Ok(());
                    }
                }
            }
        };

        let addresses: Vec<String> = addresses.iter().map(ToString::to_string).collect();
        debug!("Resolved {} to {}", url, addresses.join(", "));
        ctx.data_mut()
            .add_or_update(keys::IP_ADDRESSES, addresses.clone().into());
        ctx.stage(keys::IP_ADDRESSES, addresses);
        ctx.record_success(&self.info, &clock)?;
        Ok(())
    }
}
