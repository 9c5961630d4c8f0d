//! Reachability probe.

use std::net::IpAddr;

use async_trait::async_trait;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::component::{ComponentInfo, Probe};
use crate::config::Settings;
use crate::error_handling::{ProbeError, TestError};
use crate::property_bag::keys;
use crate::services::{PingOptions, ServiceLocator};
use crate::session::{StepKind, TestContext};

/// Pings the addresses published by [`super::DnsProbe`] until one answers.
#[derive(Debug, Clone)]
pub struct PingProbe {
    info: ComponentInfo,
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl PingProbe {
    pub fn new() -> Self {
        Self {
            info: ComponentInfo::new("Ping", StepKind::Action),
        }
    }
}

#[async_trait]
impl Probe for PingProbe {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    async fn handle(
        &self,
        _url: &Url,
        settings: &Settings,
        ctx: &mut TestContext,
        services: &ServiceLocator,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        let pinger = services.pinger()?;
        let clock = ctx.start_timer();

        let addresses = match ctx
            .data()
            .try_get_as::<Vec<String>>(&keys::IP_ADDRESSES)
        {
            Some(addresses) if !addresses.is_empty() => addresses,
            _ => {
                let error = TestError::insufficient_data("resolved IP addresses");
                ctx.record_failure(&self.info, &clock, &error)?;
                return Ok(());
            }
        };

        let options = PingOptions::from(settings);
        for address in &addresses {
            let ip: IpAddr = match address.parse() {
                Ok(ip) => ip,
                Err(_) => {
                    warn!("Skipping unparsable address '{}'", address);
                    continue;
                }
            };
            let reply = tokio::select! {
                _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                reply = pinger.ping(ip, &options) => reply,
            };
            match reply {
                Ok(reply) if reply.success => {
                    debug!("{} answered in {:?}", ip, reply.roundtrip);
                    ctx.stage(keys::REACHABLE_ADDRESS, address.as_str())
                        .stage(keys::ROUNDTRIP_MS, reply.roundtrip.as_millis().to_string());
                    ctx.record_success(&self.info, &clock)?;
                    return Ok(());
                }
                Ok(_) => debug!("{} did not answer", ip),
                Err(e) => debug!("Pinging {} failed: {}", ip, e),
            }
        }

        ctx.record_failure(&self.info, &clock, &TestError::ping_failed(&addresses))?;
        Ok(())
    }
}
