//! TCP-connect reachability check.
//!
//! ICMP needs raw sockets (and usually elevated privileges), so the bundled
//! [`Pinger`] measures how long a TCP handshake takes on well-known ports
//! instead. TTL and don't-fragment options are accepted but not applied.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use async_trait::async_trait;
use log::debug;
use tokio::net::TcpStream;

use crate::config::REACHABILITY_PORTS;
use crate::error_handling::TransportError;
use crate::services::{PingOptions, PingReply, Pinger};

/// [`Pinger`] that treats a completed TCP handshake as an answer.
#[derive(Debug, Clone)]
pub struct TcpPinger {
    ports: Vec<u16>,
}

impl Default for TcpPinger {
    fn default() -> Self {
        Self::new(REACHABILITY_PORTS)
    }
}

impl TcpPinger {
    /// Tries `ports` in order until one accepts a connection.
    pub fn new(ports: &[u16]) -> Self {
        Self {
            ports: ports.to_vec(),
        }
    }
}

#[async_trait]
impl Pinger for TcpPinger {
    async fn ping(
        &self,
        address: IpAddr,
        options: &PingOptions,
    ) -> Result<PingReply, TransportError> {
        if self.ports.is_empty() {
            return Err(TransportError::Ping("no ports configured".to_string()));
        }
        let start = Instant::now();
        for port in &self.ports {
            let target = SocketAddr::new(address, *port);
            let attempt = Instant::now();
            match tokio::time::timeout(options.timeout, TcpStream::connect(target)).await {
                Ok(Ok(_stream)) => {
                    return Ok(PingReply {
                        success: true,
                        roundtrip: attempt.elapsed(),
                    });
                }
                Ok(Err(e)) => debug!("TCP connect to {} failed: {}", target, e),
                Err(_) => debug!("TCP connect to {} timed out", target),
            }
        }
        Ok(PingReply {
            success: false,
            roundtrip: start.elapsed(),
        })
    }
}
