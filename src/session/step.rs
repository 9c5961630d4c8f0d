//! Test step records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error_handling::{StepError, TestError};
use crate::property_bag::{PropertyBag, PropertyValue};

/// What kind of work produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Network or system interaction (DNS, ping, HTTP)
    Action,
    /// Check against data produced by an earlier step
    Validate,
    /// A pipeline of other components
    Composite,
}

/// Outcome of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepResult {
    /// The probe did what it was asked to
    Succeeded,
    /// The probe failed; the step carries the error
    Failed,
}

/// Immutable record of one probe execution.
///
/// A failed step always carries an error with a non-empty message; a
/// succeeded step never does (a supplied error is discarded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTestStep")]
pub struct TestStep {
    name: String,
    iteration: u32,
    start_time: DateTime<Utc>,
    duration: Duration,
    kind: StepKind,
    result: StepResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<PropertyBag<PropertyValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<TestError>,
}

/// Wire shape of a step; converted through [`TestStep::new`] on read.
#[derive(Deserialize)]
struct RawTestStep {
    name: String,
    iteration: u32,
    start_time: DateTime<Utc>,
    duration: Duration,
    kind: StepKind,
    result: StepResult,
    #[serde(default)]
    properties: Option<PropertyBag<PropertyValue>>,
    #[serde(default)]
    error: Option<TestError>,
}

impl TryFrom<RawTestStep> for TestStep {
    type Error = StepError;

    fn try_from(raw: RawTestStep) -> Result<Self, Self::Error> {
        TestStep::new(
            raw.name,
            raw.iteration,
            raw.start_time,
            raw.duration,
            raw.kind,
            raw.result,
            raw.properties,
            raw.error,
        )
    }
}

impl TestStep {
    /// Builds a step, enforcing the failure/message invariant.
    ///
    /// # Errors
    ///
    /// Returns `StepError::MissingErrorMessage` when `result` is `Failed` and
    /// `error` is absent or has an empty message.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        iteration: u32,
        start_time: DateTime<Utc>,
        duration: Duration,
        kind: StepKind,
        result: StepResult,
        properties: Option<PropertyBag<PropertyValue>>,
        error: Option<TestError>,
    ) -> Result<Self, StepError> {
        let name = name.into();
        let error = match result {
            StepResult::Failed => match error {
                Some(e) if !e.message().is_empty() => Some(e),
                _ => return Err(StepError::MissingErrorMessage(name)),
            },
            StepResult::Succeeded => None,
        };
        Ok(Self {
            name,
            iteration,
            start_time,
            duration,
            kind,
            result,
            properties: properties.filter(|p| !p.is_empty()),
            error,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 1-based count of steps the same component produced in this run.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn result(&self) -> StepResult {
        self.result
    }

    pub fn is_failed(&self) -> bool {
        self.result == StepResult::Failed
    }

    /// Property snapshot taken when the step was closed.
    pub fn properties(&self) -> Option<&PropertyBag<PropertyValue>> {
        self.properties.as_ref()
    }

    pub fn error(&self) -> Option<&TestError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(TestError::message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::ErrorCode;

    fn step(result: StepResult, error: Option<TestError>) -> Result<TestStep, StepError> {
        TestStep::new(
            "probe",
            1,
            Utc::now(),
            Duration::from_millis(5),
            StepKind::Action,
            result,
            None,
            error,
        )
    }

    #[test]
    fn test_failed_step_requires_message() {
        assert_eq!(
            step(StepResult::Failed, None),
            Err(StepError::MissingErrorMessage("probe".into()))
        );
        assert_eq!(
            step(
                StepResult::Failed,
                Some(TestError::new(ErrorCode::WrappedException, ""))
            ),
            Err(StepError::MissingErrorMessage("probe".into()))
        );
    }

    #[test]
    fn test_failed_step_keeps_error() {
        let s = step(StepResult::Failed, Some(TestError::missing_url())).expect("valid step");
        assert!(s.is_failed());
        assert_eq!(s.error_message(), Some("The test URL is missing"));
    }

    #[test]
    fn test_succeeded_step_discards_error() {
        let s = step(StepResult::Succeeded, Some(TestError::missing_url())).expect("valid step");
        assert!(!s.is_failed());
        assert_eq!(s.error_message(), None);
    }

    #[test]
    fn test_empty_properties_are_not_attached() {
        let s = TestStep::new(
            "probe",
            1,
            Utc::now(),
            Duration::ZERO,
            StepKind::Validate,
            StepResult::Succeeded,
            Some(PropertyBag::new()),
            None,
        )
        .expect("valid step");
        assert!(s.properties().is_none());
    }

    #[test]
    fn test_deserialized_failed_step_requires_error() {
        let s = step(StepResult::Failed, Some(TestError::missing_url())).expect("valid step");
        let mut json = serde_json::to_value(&s).expect("serialize step");
        let back: TestStep = serde_json::from_value(json.clone()).expect("deserialize step");
        assert_eq!(back, s);

        json.as_object_mut().expect("object").remove("error");
        let err = serde_json::from_value::<TestStep>(json).expect_err("missing error rejected");
        assert!(err.to_string().contains("probe"));
    }
}
