//! Test runs: one URL through a pipeline, or many URLs concurrently.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::component::{Pipeline, TestComponent};
use crate::config::Settings;
use crate::error_handling::ProbeError;
use crate::http::RequestSender;
use crate::probes::{DnsProbe, PingProbe, StatusCodeValidator};
use crate::services::ServiceLocator;
use crate::session::{ProgressSink, SessionState, TestContext, TestSession, TestSessionBuilder};

/// The standard availability check: resolve, ping, request, expect 2xx.
///
/// The request sender is chosen from `settings.client_type`.
pub fn default_pipeline(settings: &Settings) -> TestComponent {
    Pipeline::new("Availability")
        .with(TestComponent::leaf(DnsProbe::new()))
        .with(TestComponent::leaf(PingProbe::new()))
        .with(TestComponent::leaf(RequestSender::for_client_type(
            settings.client_type,
        )))
        .with(TestComponent::leaf(StatusCodeValidator::success()))
        .into()
}

/// Runs `pipeline` once against `url` and seals the resulting session.
///
/// The session starts now. Probe failures end up as failed steps in the
/// returned session.
///
/// # Errors
///
/// Returns `ProbeError::MissingService` when a component lacks a required
/// collaborator and `ProbeError::Cancelled` when `cancel` fires mid-run.
pub async fn run_test(
    url: &Url,
    pipeline: &TestComponent,
    settings: &Settings,
    services: &ServiceLocator,
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: &CancellationToken,
) -> Result<TestSession, ProbeError> {
    let mut builder =
        TestSessionBuilder::new().with_start_date_enforced(settings.enforce_start_date);
    builder.initiate(Some(url.clone()), Some(Utc::now()));
    let mut ctx = TestContext::new(builder);
    if let Some(progress) = progress {
        ctx = ctx.with_progress(progress);
    }

    pipeline.handle(url, settings, &mut ctx, services, cancel).await?;

    let session = ctx.session();
    debug!(
        "{}: {} step(s), {} failed, {:?}",
        url,
        session.steps().len(),
        session.failures().count(),
        session.duration()
    );
    Ok(session)
}

/// A run that ended without a session.
#[derive(Debug, Clone, Serialize)]
pub struct RunError {
    /// The URL under test
    pub url: String,
    /// Why no session was produced
    pub error: String,
}

/// Results of a multi-URL run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Sessions, in input order
    pub sessions: Vec<TestSession>,
    /// Runs that failed fatally or were cancelled
    pub errors: Vec<RunError>,
    /// Completed sessions without failed steps
    pub valid: usize,
    /// Completed sessions with at least one failed step
    pub invalid: usize,
    /// Declined sessions
    pub declined: usize,
    /// Elapsed time in seconds
    pub elapsed_seconds: f64,
}

impl RunReport {
    /// True when every URL produced a valid session.
    pub fn all_valid(&self) -> bool {
        self.errors.is_empty() && self.invalid == 0 && self.declined == 0
    }

    fn record(&mut self, session: TestSession) {
        match session.state() {
            SessionState::Declined { .. } => self.declined += 1,
            _ if session.is_valid() => self.valid += 1,
            _ => self.invalid += 1,
        }
        self.sessions.push(session);
    }
}

/// Runs `pipeline` against every URL, at most `max_concurrency` at a time.
///
/// Each run owns its own context; only `services` is shared. Once `cancel`
/// fires, pending URLs are reported as cancelled instead of started. A run
/// whose task panics is reported in `errors` like any other fatal error.
///
/// # Errors
///
/// Returns an error if the concurrency limiter is closed.
pub async fn run_tests(
    urls: Vec<Url>,
    pipeline: &TestComponent,
    settings: &Settings,
    services: &ServiceLocator,
    progress: Option<Arc<dyn ProgressSink>>,
    max_concurrency: usize,
    cancel: &CancellationToken,
) -> Result<RunReport> {
    let started = Instant::now();
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = FuturesUnordered::new();
    let mut outcomes: Vec<(usize, Result<TestSession, String>)> = Vec::new();

    info!("Testing {} URL(s)", urls.len());
    for (index, url) in urls.iter().enumerate() {
        if cancel.is_cancelled() {
            outcomes.push((index, Err(ProbeError::Cancelled.to_string())));
            continue;
        }
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .context("Concurrency limiter closed")?;

        let url = url.clone();
        let pipeline = pipeline.clone();
        let settings = settings.clone();
        let services = services.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            run_test(&url, &pipeline, &settings, &services, progress, &cancel).await
        });
        tasks.push(async move { (index, handle.await) });
    }

    while let Some((index, joined)) = tasks.next().await {
        let outcome = match joined {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(e) => Err(format!("Test task panicked or was aborted: {}", e)),
        };
        outcomes.push((index, outcome));
    }
    outcomes.sort_by_key(|(index, _)| *index);

    let mut report = RunReport::default();
    for (index, result) in outcomes {
        match result {
            Ok(session) => report.record(session),
            Err(error) => {
                warn!("{}: {}", urls[index], error);
                report.errors.push(RunError {
                    url: urls[index].to_string(),
                    error,
                });
            }
        }
    }
    report.elapsed_seconds = started.elapsed().as_secs_f64();
    info!(
        "Finished in {:.2}s: {} valid, {} invalid, {} declined, {} error(s)",
        report.elapsed_seconds,
        report.valid,
        report.invalid,
        report.declined,
        report.errors.len()
    );
    Ok(report)
}
