//! Redirect-chasing request senders.
//!
//! Two strategies issue the test request and record every redirect hop as a
//! step of its own:
//! - [`HttpRequestSender`]: sends with an [`crate::services::HttpClient`] and
//!   re-sends to each redirect target itself
//! - [`BrowserRequestSender`]: navigates with a browser session and observes
//!   the redirects it performs through a callback
//!
//! [`RequestSender`] picks one of them from the configured client type.

mod browser;
mod redirects;
mod reqwest_client;
mod sender;
mod types;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::component::{ComponentInfo, Probe};
use crate::config::{ClientType, Settings};
use crate::error_handling::ProbeError;
use crate::services::ServiceLocator;
use crate::session::TestContext;

pub use browser::BrowserRequestSender;
pub use redirects::{
    is_followable_redirect, HopOutcome, OrderedHttpRedirections, RedirectChase, REDIRECT_STATUSES,
};
pub use reqwest_client::{ReqwestClientFactory, ReqwestHttpClient};
pub use sender::HttpRequestSender;
pub use types::{ClientProfile, HttpRequest, HttpResponse};

/// The request sender selected for a client type.
///
/// Only the selected strategy is constructed.
#[derive(Debug, Clone)]
pub enum RequestSender {
    /// Direct HTTP requests
    Http(HttpRequestSender),
    /// Browser navigation
    Browser(BrowserRequestSender),
}

impl RequestSender {
    pub fn for_client_type(client_type: ClientType) -> Self {
        match client_type {
            ClientType::Http => RequestSender::Http(HttpRequestSender::new()),
            ClientType::Browser => RequestSender::Browser(BrowserRequestSender::new()),
        }
    }
}

#[async_trait]
impl Probe for RequestSender {
    fn info(&self) -> &ComponentInfo {
        match self {
            RequestSender::Http(sender) => sender.info(),
            RequestSender::Browser(sender) => sender.info(),
        }
    }

    async fn handle(
        &self,
        url: &Url,
        settings: &Settings,
        ctx: &mut TestContext,
        services: &ServiceLocator,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        match self {
            RequestSender::Http(sender) => sender.handle(url, settings, ctx, services, cancel).await,
            RequestSender::Browser(sender) => {
                sender.handle(url, settings, ctx, services, cancel).await
            }
        }
    }
}

#[cfg(test)]
mod tests;
