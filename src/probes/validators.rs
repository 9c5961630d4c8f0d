//! Checks on the last HTTP response of the run.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::component::{ComponentInfo, Probe};
use crate::config::Settings;
use crate::error_handling::{ProbeError, TestError};
use crate::http::HttpResponse;
use crate::services::ServiceLocator;
use crate::session::{StepKind, Stopwatch, TestContext};

/// Closes a validation step: succeeded, or failed with `outcome`'s error.
fn finish(
    ctx: &mut TestContext,
    info: &ComponentInfo,
    clock: &Stopwatch,
    outcome: Result<(), TestError>,
) -> Result<(), ProbeError> {
    match outcome {
        Ok(()) => ctx.record_success(info, clock)?,
        Err(error) => ctx.record_failure(info, clock, &error)?,
    };
    Ok(())
}

/// Runs `check` against the last response, failing when there is none.
fn validate(
    ctx: &mut TestContext,
    info: &ComponentInfo,
    check: impl FnOnce(&HttpResponse) -> Result<(), TestError>,
) -> Result<(), ProbeError> {
    let clock = ctx.start_timer();
    let outcome = match ctx.response() {
        Some(response) => check(response),
        None => Err(TestError::insufficient_data("HTTP response")),
    };
    finish(ctx, info, &clock, outcome)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusMatch {
    Success,
    Exact(BTreeSet<u16>),
}

/// Checks the response status code.
#[derive(Debug, Clone)]
pub struct StatusCodeValidator {
    info: ComponentInfo,
    accept: StatusMatch,
}

impl StatusCodeValidator {
    /// Accepts any 2xx status.
    pub fn success() -> Self {
        Self {
            info: ComponentInfo::new("StatusCode", StepKind::Validate),
            accept: StatusMatch::Success,
        }
    }

    /// Accepts exactly the listed statuses.
    pub fn exact(codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            info: ComponentInfo::new("StatusCode", StepKind::Validate),
            accept: StatusMatch::Exact(codes.into_iter().collect()),
        }
    }

    fn check(&self, response: &HttpResponse) -> Result<(), TestError> {
        let status = response.status;
        let (accepted, expected) = match &self.accept {
            StatusMatch::Success => (status.is_success(), "2xx".to_string()),
            StatusMatch::Exact(codes) => (
                codes.contains(&status.as_u16()),
                codes
                    .iter()
                    .map(u16::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        };
        if accepted {
            return Ok(());
        }
        let message = format!(
            "Status code {} is not in the expected set ({})",
            status.as_u16(),
            expected
        );
        Err(TestError::validation_failed(self.info.name(), Some(&message)))
    }
}

#[async_trait]
impl Probe for StatusCodeValidator {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    async fn handle(
        &self,
        _url: &Url,
        _settings: &Settings,
        ctx: &mut TestContext,
        _services: &ServiceLocator,
        _cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        validate(ctx, &self.info, |response| self.check(response))
    }
}

/// Checks that a header is present, optionally with a given value.
#[derive(Debug, Clone)]
pub struct HeaderValidator {
    info: ComponentInfo,
    header: String,
    expected: Option<String>,
}

impl HeaderValidator {
    pub fn present(header: impl Into<String>) -> Self {
        Self {
            info: ComponentInfo::new("Header", StepKind::Validate),
            header: header.into(),
            expected: None,
        }
    }

    /// Requires one of the header's values to equal `value`.
    pub fn equals(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            expected: Some(value.into()),
            ..Self::present(header)
        }
    }

    fn check(&self, response: &HttpResponse) -> Result<(), TestError> {
        let values: Vec<&str> = response
            .headers
            .get_all(self.header.as_str())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let message = match &self.expected {
            None if !values.is_empty() => return Ok(()),
            None => format!("Header '{}' is missing", self.header),
            Some(expected) if values.iter().any(|v| *v == expected.as_str()) => return Ok(()),
            Some(expected) => format!("Header '{}' does not equal '{}'", self.header, expected),
        };
        Err(TestError::validation_failed(self.info.name(), Some(&message)))
    }
}

#[async_trait]
impl Probe for HeaderValidator {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    async fn handle(
        &self,
        _url: &Url,
        _settings: &Settings,
        ctx: &mut TestContext,
        _services: &ServiceLocator,
        _cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        validate(ctx, &self.info, |response| self.check(response))
    }
}

type ResponsePredicate = dyn Fn(&HttpResponse) -> bool + Send + Sync;

/// Checks the response with a caller-supplied predicate.
#[derive(Clone)]
pub struct ResponseValidator {
    info: ComponentInfo,
    predicate: Arc<ResponsePredicate>,
    message: Option<String>,
}

impl fmt::Debug for ResponseValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseValidator")
            .field("info", &self.info)
            .field("message", &self.message)
            .finish()
    }
}

impl ResponseValidator {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&HttpResponse) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            info: ComponentInfo::new(name, StepKind::Validate),
            predicate: Arc::new(predicate),
            message: None,
        }
    }

    /// Message recorded when the predicate returns false.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[async_trait]
impl Probe for ResponseValidator {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    async fn handle(
        &self,
        _url: &Url,
        _settings: &Settings,
        ctx: &mut TestContext,
        _services: &ServiceLocator,
        _cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        validate(ctx, &self.info, |response| {
            if (self.predicate)(response) {
                Ok(())
            } else {
                Err(TestError::validation_failed(
                    self.info.name(),
                    self.message.as_deref(),
                ))
            }
        })
    }
}
