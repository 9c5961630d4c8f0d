//! External collaborators.
//!
//! The engine never talks to the network itself: DNS lookups, reachability
//! checks, HTTP transport and browser automation sit behind the traits in this
//! module and are looked up through a [`ServiceLocator`]. Implementations must
//! be safe to use from concurrent runs.
//!
//! Bundled implementations:
//! - [`HickoryDnsResolver`]: hickory `TokioAsyncResolver`
//! - [`TcpPinger`]: TCP-connect reachability check
//! - [`crate::http::ReqwestClientFactory`]: reqwest transport

mod hickory;
mod tcp_ping;

use std::fmt;
use std::net::IpAddr;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::{BrowserEngine, Settings, Viewport};
use crate::error_handling::{ProbeError, TransportError};
use crate::http::{ClientProfile, HttpRequest, HttpResponse};

pub use hickory::HickoryDnsResolver;
pub use tcp_ping::TcpPinger;

/// Hostname resolution.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, TransportError>;
}

/// Options for one reachability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingOptions {
    /// How long to wait for an answer
    pub timeout: Duration,
    /// Packet time-to-live
    pub ttl: u8,
    /// Don't-fragment flag
    pub dont_fragment: bool,
}

impl From<&Settings> for PingOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout: settings.ping_timeout,
            ttl: settings.ping_ttl,
            dont_fragment: settings.ping_dont_fragment,
        }
    }
}

/// Result of one reachability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingReply {
    /// The address answered
    pub success: bool,
    /// Time until the answer (or until giving up)
    pub roundtrip: Duration,
}

/// Reachability check of a single address.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, address: IpAddr, options: &PingOptions)
        -> Result<PingReply, TransportError>;
}

/// A client able to send one request and return the raw response.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Hands out clients configured for a [`ClientProfile`].
pub trait HttpClientFactory: Send + Sync {
    fn client(&self, profile: ClientProfile) -> Result<Arc<dyn HttpClient>, TransportError>;
}

/// Settings used to open a browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    /// Navigation timeout
    pub timeout: Duration,
    /// User-Agent the browser announces
    pub user_agent: String,
    /// Page viewport
    pub viewport: Viewport,
    /// Rendering engine
    pub engine: BrowserEngine,
}

impl From<&Settings> for BrowserOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout: settings.timeout,
            user_agent: settings.user_agent.clone(),
            viewport: settings.viewport,
            engine: settings.browser_engine,
        }
    }
}

/// Callback fired for every redirect the browser performs while navigating.
///
/// Returning `Break` stops the navigation at that redirect response.
pub type RedirectCallback<'a> = dyn FnMut(&HttpResponse) -> ControlFlow<()> + Send + 'a;

/// A headless browser page.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates to `url`, following redirects internally.
    ///
    /// `on_redirect` is called synchronously with each redirect response, in
    /// order. Returns the final page response, or the redirect response at
    /// which the callback asked to stop.
    async fn navigate(
        &mut self,
        url: &Url,
        on_redirect: &mut RedirectCallback<'_>,
    ) -> Result<HttpResponse, TransportError>;
}

/// Opens browser sessions.
#[async_trait]
pub trait BrowserFactory: Send + Sync {
    async fn open(&self, options: &BrowserOptions)
        -> Result<Box<dyn BrowserSession>, TransportError>;
}

/// Resolves collaborators by type.
///
/// A missing collaborator is a fatal precondition for the component needing it.
#[derive(Clone, Default)]
pub struct ServiceLocator {
    dns: Option<Arc<dyn DnsResolver>>,
    pinger: Option<Arc<dyn Pinger>>,
    http: Option<Arc<dyn HttpClientFactory>>,
    browser: Option<Arc<dyn BrowserFactory>>,
}

impl fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("dns", &self.dns.is_some())
            .field("pinger", &self.pinger.is_some())
            .field("http", &self.http.is_some())
            .field("browser", &self.browser.is_some())
            .finish()
    }
}

impl ServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dns_resolver(mut self, resolver: Arc<dyn DnsResolver>) -> Self {
        self.dns = Some(resolver);
        self
    }

    pub fn with_pinger(mut self, pinger: Arc<dyn Pinger>) -> Self {
        self.pinger = Some(pinger);
        self
    }

    pub fn with_http_client_factory(mut self, factory: Arc<dyn HttpClientFactory>) -> Self {
        self.http = Some(factory);
        self
    }

    pub fn with_browser_factory(mut self, factory: Arc<dyn BrowserFactory>) -> Self {
        self.browser = Some(factory);
        self
    }

    pub fn dns_resolver(&self) -> Result<&Arc<dyn DnsResolver>, ProbeError> {
        self.dns
            .as_ref()
            .ok_or(ProbeError::MissingService("DnsResolver"))
    }

    pub fn pinger(&self) -> Result<&Arc<dyn Pinger>, ProbeError> {
        self.pinger
            .as_ref()
            .ok_or(ProbeError::MissingService("Pinger"))
    }

    pub fn http_client_factory(&self) -> Result<&Arc<dyn HttpClientFactory>, ProbeError> {
        self.http
            .as_ref()
            .ok_or(ProbeError::MissingService("HttpClientFactory"))
    }

    pub fn browser_factory(&self) -> Result<&Arc<dyn BrowserFactory>, ProbeError> {
        self.browser
            .as_ref()
            .ok_or(ProbeError::MissingService("BrowserFactory"))
    }
}
