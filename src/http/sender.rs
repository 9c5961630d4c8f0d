//! Redirect-chasing request sender driven by explicit re-sends.

use async_trait::async_trait;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::component::{ComponentInfo, Probe};
use crate::config::Settings;
use crate::error_handling::{ProbeError, TestError, TransportError};
use crate::http::redirects::{HopOutcome, RedirectChase};
use crate::http::types::{ClientProfile, HttpRequest, HttpResponse};
use crate::property_bag::keys;
use crate::services::{HttpClient, ServiceLocator};
use crate::session::{StepKind, TestContext};

/// Sends a GET request with an HTTP client and follows redirects by hand.
///
/// Emits one step per redirect hop plus one for the terminal response. Each
/// hop is timed on its own. Redirect cycles, an exhausted hop budget and
/// transport errors end the chase with a failed step.
#[derive(Debug, Clone)]
pub struct HttpRequestSender {
    info: ComponentInfo,
}

impl Default for HttpRequestSender {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRequestSender {
    pub fn new() -> Self {
        Self::named("HttpRequest")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            info: ComponentInfo::new(name, StepKind::Action),
        }
    }
}

#[async_trait]
impl Probe for HttpRequestSender {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    async fn handle(
        &self,
        url: &Url,
        settings: &Settings,
        ctx: &mut TestContext,
        services: &ServiceLocator,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        let factory = match services.http_client_factory() {
            Ok(factory) => factory,
            Err(e) => {
                ctx.builder_mut().decline(TestError::missing_client_factory());
                return Err(e);
            }
        };

        let mut clock = ctx.start_timer();
        // Redirects are always chased here, never by the transport
        let profile = ClientProfile {
            retry: settings.retry,
            follow_redirects: false,
        };
        let client = match factory.client(profile) {
            Ok(client) => client,
            Err(e) => {
                ctx.record_exception(&self.info, &clock, &e)?;
                return Ok(());
            }
        };

        let mut chase = RedirectChase::new(settings.max_redirections);
        chase.begin(url);

        let mut request = HttpRequest::get(url.clone());
        let mut response = match send(client.as_ref(), request.clone(), cancel).await? {
            Ok(response) => response,
            Err(e) => {
                ctx.record_exception(&self.info, &clock, &e)?;
                return Ok(());
            }
        };

        if settings.follow_redirects {
            while chase.should_follow(&response) {
                debug!(
                    "{} redirected with {} to {}",
                    response.url,
                    response.status.as_u16(),
                    response.location().unwrap_or("<no location>")
                );
                stage_response(ctx, &response, false);
                ctx.record_success(&self.info, &clock)?;
                clock.restart();

                match chase.next_hop(&response) {
                    HopOutcome::Continue(next) => {
                        request = request.redirected(response.status, next);
                        response = match send(client.as_ref(), request.clone(), cancel).await? {
                            Ok(response) => response,
                            Err(e) => {
                                ctx.record_exception(&self.info, &clock, &e)?;
                                return Ok(());
                            }
                        };
                    }
                    HopOutcome::Done => break,
                    HopOutcome::Failed(error) => {
                        warn!("Redirect chase for {} failed: {}", url, error);
                        ctx.record_failure(&self.info, &clock, &error)?;
                        return Ok(());
                    }
                }
            }

            if let Err(error) = chase.check_limit() {
                warn!("Redirect chase for {} failed: {}", url, error);
                ctx.record_failure(&self.info, &clock, &error)?;
                return Ok(());
            }
        }

        stage_response(ctx, &response, true);
        ctx.record_success(&self.info, &clock)?;
        ctx.set_response(response);
        Ok(())
    }
}

/// Sends `request`, giving up early if the run is cancelled.
///
/// The outer `Result` carries cancellation, the inner one the transport outcome.
async fn send(
    client: &dyn HttpClient,
    request: HttpRequest,
    cancel: &CancellationToken,
) -> Result<Result<HttpResponse, TransportError>, ProbeError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ProbeError::Cancelled),
        result = client.send(request) => Ok(result),
    }
}

/// Stages the response metadata on the step about to be closed.
pub(crate) fn stage_response(ctx: &mut TestContext, response: &HttpResponse, include_body: bool) {
    ctx.stage(keys::REQUEST_URL, response.url.as_str())
        .stage(keys::STATUS_CODE, response.status.as_u16().to_string())
        .stage(keys::REASON_PHRASE, response.reason_phrase())
        .stage(keys::HEADERS, response.header_map());
    if let Some(location) = response.location() {
        ctx.stage(keys::LOCATION, location);
    }
    if include_body && !response.body.is_empty() {
        ctx.stage(keys::BODY, response.body.clone());
    }
}
