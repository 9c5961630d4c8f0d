//! The aggregate record of one run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error_handling::{ErrorCode, TestError};
use crate::session::step::TestStep;

/// Terminal state of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum SessionState {
    /// Nothing has been run yet
    #[default]
    NotStarted,
    /// Every scheduled component ran (possibly with failed steps)
    Completed,
    /// The run could not proceed in any meaningful way
    Declined {
        /// Why the session was declined
        reason: TestError,
    },
}

impl SessionState {
    /// Error code of a declined session.
    pub fn decline_code(&self) -> Option<ErrorCode> {
        match self {
            SessionState::Declined { reason } => Some(reason.code()),
            _ => None,
        }
    }
}

/// Full ordered record of one run against one URL.
///
/// Sessions are produced sealed by [`super::TestSessionBuilder::get_session`]
/// and are immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSession {
    url: Option<Url>,
    start_date: Option<DateTime<Utc>>,
    steps: Vec<TestStep>,
    state: SessionState,
}

impl TestSession {
    pub(crate) fn sealed(
        url: Option<Url>,
        start_date: Option<DateTime<Utc>>,
        steps: Vec<TestStep>,
        state: SessionState,
    ) -> Self {
        Self {
            url,
            start_date,
            steps,
            state,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    pub fn steps(&self) -> &[TestStep] {
        &self.steps
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Decline reason, if the session was declined.
    pub fn decline_reason(&self) -> Option<&str> {
        match &self.state {
            SessionState::Declined { reason } => Some(reason.message()),
            _ => None,
        }
    }

    /// Sum of the step durations.
    pub fn duration(&self) -> Duration {
        self.steps.iter().map(TestStep::duration).sum()
    }

    /// Steps whose result is `Failed`.
    pub fn failures(&self) -> impl Iterator<Item = &TestStep> {
        self.steps.iter().filter(|s| s.is_failed())
    }

    /// At least one step and no failures.
    pub fn is_valid(&self) -> bool {
        !self.steps.is_empty() && self.failures().next().is_none()
    }
}
