//! Session builder.
//!
//! [`TestSessionBuilder`] accumulates steps for one run. It moves through
//! uninitiated → initiated (URL + start date known) → building → sealed; the
//! last transition happens in [`TestSessionBuilder::get_session`], which never
//! mutates sessions it already returned.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use url::Url;

use crate::component::ComponentInfo;
use crate::error_handling::{StepError, TestError};
use crate::property_bag::{PropertyBag, PropertyBagKey, PropertyValue};
use crate::session::record::{SessionState, TestSession};
use crate::session::step::{StepResult, TestStep};
use crate::session::stopwatch::Stopwatch;

/// Stateful accumulator turning component outcomes into [`TestStep`]s.
#[derive(Debug, Default)]
pub struct TestSessionBuilder {
    url: Option<Url>,
    start_date: Option<DateTime<Utc>>,
    steps: Vec<TestStep>,
    pending: PropertyBag<PropertyValue>,
    iterations: HashMap<ComponentInfo, u32>,
    declined: Option<TestError>,
    enforce_start_date: bool,
}

impl TestSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decline sessions starting before today instead of only warning.
    pub fn with_start_date_enforced(mut self, enforce: bool) -> Self {
        self.enforce_start_date = enforce;
        self
    }

    /// Sets the run identity. Calling again overwrites it.
    pub fn initiate(&mut self, url: Option<Url>, start_date: Option<DateTime<Utc>>) -> &mut Self {
        self.url = url;
        self.start_date = start_date;
        self
    }

    /// Stages a property for the next closed step.
    pub fn stage(&mut self, key: PropertyBagKey, value: impl Into<PropertyValue>) -> &mut Self {
        self.pending.add_or_update(key, value.into());
        self
    }

    /// Properties staged since the last closed step.
    pub fn pending(&self) -> &PropertyBag<PropertyValue> {
        &self.pending
    }

    /// Closes a succeeded step for `component`.
    pub fn build_success(
        &mut self,
        component: &ComponentInfo,
        clock: &Stopwatch,
    ) -> Result<TestStep, StepError> {
        self.close_step(component, clock, StepResult::Succeeded, None)
    }

    /// Closes a failed step carrying `error`.
    pub fn build_failure(
        &mut self,
        component: &ComponentInfo,
        clock: &Stopwatch,
        error: &TestError,
    ) -> Result<TestStep, StepError> {
        self.close_step(component, clock, StepResult::Failed, Some(error.clone()))
    }

    /// Closes a failed step for an error raised by a collaborator.
    pub fn build_exception(
        &mut self,
        component: &ComponentInfo,
        clock: &Stopwatch,
        error: &(dyn std::error::Error + 'static),
    ) -> Result<TestStep, StepError> {
        self.close_step(
            component,
            clock,
            StepResult::Failed,
            Some(TestError::wrapped(error)),
        )
    }

    /// Records a hard failure: the session will be declined with `reason`.
    pub fn decline(&mut self, reason: TestError) {
        warn!("Declining test session: {}", reason);
        self.declined = Some(reason);
    }

    /// True if any appended step failed.
    pub fn has_failed(&self) -> bool {
        self.steps.iter().any(TestStep::is_failed)
    }

    pub fn steps(&self) -> &[TestStep] {
        &self.steps
    }

    /// Seals the accumulated steps into a session.
    ///
    /// Declined when a hard failure was recorded, or when the URL or start
    /// date is missing; completed otherwise.
    pub fn get_session(&self) -> TestSession {
        if let Some(reason) = self.decline_reason() {
            return TestSession::sealed(
                self.url.clone(),
                self.start_date,
                self.steps.clone(),
                SessionState::Declined { reason },
            );
        }
        TestSession::sealed(
            self.url.clone(),
            self.start_date,
            self.steps.clone(),
            SessionState::Completed,
        )
    }

    fn decline_reason(&self) -> Option<TestError> {
        if let Some(reason) = &self.declined {
            return Some(reason.clone());
        }
        if self.url.is_none() {
            return Some(TestError::missing_url());
        }
        let start = match self.start_date {
            Some(start) => start,
            None => return Some(TestError::missing_start_time()),
        };
        if start.date_naive() < Utc::now().date_naive() {
            let error = TestError::bad_start_date(&start);
            if self.enforce_start_date {
                return Some(error);
            }
            warn!("{}", error);
        }
        None
    }

    fn close_step(
        &mut self,
        component: &ComponentInfo,
        clock: &Stopwatch,
        result: StepResult,
        error: Option<TestError>,
    ) -> Result<TestStep, StepError> {
        let iteration = self.iterations.get(component).copied().unwrap_or(0) + 1;
        let step = TestStep::new(
            component.name(),
            iteration,
            clock.started_at(),
            clock.elapsed(),
            component.kind(),
            result,
            Some(self.pending.clone()),
            error,
        )?;
        self.iterations.insert(component.clone(), iteration);
        self.pending.clear();
        debug!(
            "Step '{}' #{} {:?} in {:?}{}",
            step.name(),
            step.iteration(),
            step.result(),
            step.duration(),
            step.error()
                .map(|e| format!(": {}", e))
                .unwrap_or_default()
        );
        self.steps.push(step.clone());
        Ok(step)
    }
}
