//! reqwest-backed HTTP transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::redirect::Policy;
use reqwest::ClientBuilder;

use crate::config::DEFAULT_MAX_REDIRECTIONS;
use crate::error_handling::{get_retry_strategy, is_retriable, TransportError};
use crate::http::types::{ClientProfile, HttpRequest, HttpResponse};
use crate::services::{HttpClient, HttpClientFactory};

/// Hands out reqwest clients, one per [`ClientProfile`].
///
/// Clients are built lazily and cached, so concurrent runs share connection
/// pools.
pub struct ReqwestClientFactory {
    timeout: Duration,
    user_agent: String,
    clients: Mutex<HashMap<ClientProfile, Arc<dyn HttpClient>>>,
}

impl std::fmt::Debug for ReqwestClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClientFactory")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ReqwestClientFactory {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached client for `profile`, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest::Error` raised while building the client.
    pub fn prepare(&self, profile: ClientProfile) -> Result<Arc<dyn HttpClient>, reqwest::Error> {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = clients.get(&profile) {
            return Ok(Arc::clone(client));
        }
        debug!("Building HTTP client for profile {}", profile.name());
        let client: Arc<dyn HttpClient> = Arc::new(self.build(profile)?);
        clients.insert(profile, Arc::clone(&client));
        Ok(client)
    }

    fn build(&self, profile: ClientProfile) -> Result<ReqwestHttpClient, reqwest::Error> {
        let policy = if profile.follow_redirects {
            Policy::limited(DEFAULT_MAX_REDIRECTIONS)
        } else {
            Policy::none()
        };
        let client = ClientBuilder::new()
            .redirect(policy)
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()?;
        Ok(ReqwestHttpClient {
            client,
            retry: profile.retry,
        })
    }
}

impl HttpClientFactory for ReqwestClientFactory {
    fn client(&self, profile: ClientProfile) -> Result<Arc<dyn HttpClient>, TransportError> {
        Ok(self.prepare(profile)?)
    }
}

/// A reqwest client, optionally retrying transient failures.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    retry: bool,
}

impl ReqwestHttpClient {
    async fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let response = builder.send().await?;

        let url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            url,
            status,
            reason: None,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if !self.retry {
            return self.send_once(&request).await;
        }
        tokio_retry::RetryIf::spawn(
            get_retry_strategy(),
            || self.send_once(&request),
            |e: &TransportError| matches!(e, TransportError::Http(e) if is_retriable(e)),
        )
        .await
    }
}
