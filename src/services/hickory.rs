//! DNS resolution through hickory.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;

use crate::error_handling::TransportError;
use crate::services::DnsResolver;

/// [`DnsResolver`] backed by a shared hickory resolver.
#[derive(Clone)]
pub struct HickoryDnsResolver {
    resolver: Arc<TokioAsyncResolver>,
}

impl HickoryDnsResolver {
    pub fn new(resolver: Arc<TokioAsyncResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl DnsResolver for HickoryDnsResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, TransportError> {
        let response = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| TransportError::Dns(e.to_string()))?;
        Ok(response.iter().collect())
    }
}
