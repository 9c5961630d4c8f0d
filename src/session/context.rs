//! Per-run carrier handed to every component.

use std::sync::Arc;

use crate::component::ComponentInfo;
use crate::error_handling::{ProbeError, TestError};
use crate::http::HttpResponse;
use crate::property_bag::{PropertyBag, PropertyBagKey, PropertyValue};
use crate::session::builder::TestSessionBuilder;
use crate::session::progress::ProgressSink;
use crate::session::record::TestSession;
use crate::session::step::TestStep;
use crate::session::stopwatch::Stopwatch;

/// Bundles the session builder, the progress sink and the data probes pass
/// to each other during one run.
///
/// Each run owns its context; nothing in it is shared between runs.
pub struct TestContext {
    builder: TestSessionBuilder,
    progress: Option<Arc<dyn ProgressSink>>,
    data: PropertyBag<PropertyValue>,
    response: Option<HttpResponse>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new(TestSessionBuilder::new())
    }
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("builder", &self.builder)
            .field("progress", &self.progress.is_some())
            .field("data", &self.data)
            .field("response", &self.response.as_ref().map(|r| r.status))
            .finish()
    }
}

impl TestContext {
    pub fn new(builder: TestSessionBuilder) -> Self {
        Self {
            builder,
            progress: None,
            data: PropertyBag::new(),
            response: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn builder(&self) -> &TestSessionBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut TestSessionBuilder {
        &mut self.builder
    }

    /// Starts the timing instrument for a new step.
    pub fn start_timer(&self) -> Stopwatch {
        Stopwatch::start_new()
    }

    /// Stages a property on the step about to be closed.
    pub fn stage(&mut self, key: PropertyBagKey, value: impl Into<PropertyValue>) -> &mut Self {
        self.builder.stage(key, value);
        self
    }

    /// Data shared between the probes of this run.
    pub fn data(&self) -> &PropertyBag<PropertyValue> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut PropertyBag<PropertyValue> {
        &mut self.data
    }

    /// The last terminal HTTP response, consumed by validators.
    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn set_response(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    pub fn has_failed(&self) -> bool {
        self.builder.has_failed()
    }

    pub fn record_success(
        &mut self,
        component: &ComponentInfo,
        clock: &Stopwatch,
    ) -> Result<TestStep, ProbeError> {
        let step = self.builder.build_success(component, clock)?;
        self.report(&step);
        Ok(step)
    }

    pub fn record_failure(
        &mut self,
        component: &ComponentInfo,
        clock: &Stopwatch,
        error: &TestError,
    ) -> Result<TestStep, ProbeError> {
        let step = self.builder.build_failure(component, clock, error)?;
        self.report(&step);
        Ok(step)
    }

    pub fn record_exception(
        &mut self,
        component: &ComponentInfo,
        clock: &Stopwatch,
        error: &(dyn std::error::Error + 'static),
    ) -> Result<TestStep, ProbeError> {
        let step = self.builder.build_exception(component, clock, error)?;
        self.report(&step);
        Ok(step)
    }

    /// Seals the run into a session.
    pub fn session(&self) -> TestSession {
        self.builder.get_session()
    }

    fn report(&self, step: &TestStep) {
        if let Some(progress) = &self.progress {
            progress.report(step);
        }
    }
}
