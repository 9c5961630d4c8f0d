//! Redirect-chasing request sender driven by browser navigation callbacks.

use std::ops::ControlFlow;

use async_trait::async_trait;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::component::{ComponentInfo, Probe};
use crate::config::Settings;
use crate::error_handling::{ProbeError, TestError};
use crate::http::redirects::{HopOutcome, RedirectChase};
use crate::http::sender::stage_response;
use crate::http::types::HttpResponse;
use crate::services::{BrowserOptions, ServiceLocator};
use crate::session::{StepKind, TestContext};

/// Navigates with a headless browser and records the redirects it performs.
///
/// The browser follows redirects itself and reports each one through the
/// navigation callback. The callback applies the same rules as
/// [`super::HttpRequestSender`]: one step per hop with its own timing, cycle
/// detection before the hop budget check, and navigation stops at the first
/// protocol failure.
#[derive(Debug, Clone)]
pub struct BrowserRequestSender {
    info: ComponentInfo,
}

impl Default for BrowserRequestSender {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserRequestSender {
    pub fn new() -> Self {
        Self::named("BrowserRequest")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            info: ComponentInfo::new(name, StepKind::Action),
        }
    }
}

#[async_trait]
impl Probe for BrowserRequestSender {
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
        let factory = match services.browser_factory() {
            Ok(factory) => factory,
            Err(e) => {
                ctx.builder_mut().decline(TestError::missing_browser_factory());
                return Err(e);
            }
        };

        let mut clock = ctx.start_timer();
        let options = BrowserOptions::from(settings);
        let opened = tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            opened = factory.open(&options) => opened,
        };
        let mut page = match opened {
            Ok(page) => page,
            Err(e) => {
                ctx.record_exception(&self.info, &clock, &e)?;
                return Ok(());
            }
        };

        let mut chase = RedirectChase::new(settings.max_redirections);
        chase.begin(url);

        let follow = settings.follow_redirects;
        let info = &self.info;
        let mut failure: Option<TestError> = None;
        let mut fatal: Option<ProbeError> = None;

        let navigated = {
            let mut on_redirect = |response: &HttpResponse| -> ControlFlow<()> {
                if !follow || !chase.should_follow(response) {
                    return ControlFlow::Break(());
                }
                debug!(
                    "{} redirected with {} to {}",
                    response.url,
                    response.status.as_u16(),
                    response.location().unwrap_or("<no location>")
                );
                stage_response(ctx, response, false);
                if let Err(e) = ctx.record_success(info, &clock) {
                    fatal = Some(e);
                    return ControlFlow::Break(());
                }
                clock.restart();

                match chase.next_hop(response) {
                    HopOutcome::Continue(_) => ControlFlow::Continue(()),
                    HopOutcome::Done => ControlFlow::Break(()),
                    HopOutcome::Failed(error) => {
                        failure = Some(error);
                        ControlFlow::Break(())
                    }
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                navigated = page.navigate(url, &mut on_redirect) => navigated,
            }
        };

        if let Some(e) = fatal {
            return Err(e);
        }
        if let Some(error) = failure {
            warn!("Redirect chase for {} failed: {}", url, error);
            ctx.record_failure(&self.info, &clock, &error)?;
            return Ok(());
        }
        let response = match navigated {
            Ok(response) => response,
            Err(e) => {
                ctx.record_exception(&self.info, &clock, &e)?;
                return Ok(());
            }
        };
        if follow {
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
