//! Test components.
//!
//! A component is either a leaf [`Probe`] or a [`Pipeline`] of other
//! components. Composite-only operations (adding and removing children) live
//! on [`Pipeline`], reachable from a [`TestComponent`] through
//! [`TestComponent::as_pipeline_mut`].
//!
//! Running a component appends steps to the run's [`TestContext`]. Ordinary
//! failures become failed steps; only fatal preconditions and cancellation
//! come back as `Err`.

mod pipeline;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Settings;
use crate::error_handling::ProbeError;
use crate::services::ServiceLocator;
use crate::session::{StepKind, TestContext, TestSessionBuilder};

pub use pipeline::Pipeline;

/// Identity of a component: name plus kind.
///
/// Step iteration numbers are counted per identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentInfo {
    name: String,
    kind: StepKind,
}

impl ComponentInfo {
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }
}

/// A leaf unit of work.
#[async_trait]
pub trait Probe: Send + Sync {
    fn info(&self) -> &ComponentInfo;

    /// Runs the probe, appending its step(s) to `ctx`.
    async fn handle(
        &self,
        url: &Url,
        settings: &Settings,
        ctx: &mut TestContext,
        services: &ServiceLocator,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError>;
}

/// A probe or a pipeline of components.
#[derive(Clone)]
pub enum TestComponent {
    /// A single probe
    Leaf(Arc<dyn Probe>),
    /// An ordered list of components
    Composite(Pipeline),
}

impl std::fmt::Debug for TestComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestComponent::Leaf(probe) => f.debug_tuple("Leaf").field(probe.info()).finish(),
            TestComponent::Composite(pipeline) => {
                f.debug_tuple("Composite").field(pipeline).finish()
            }
        }
    }
}

impl From<Pipeline> for TestComponent {
    fn from(pipeline: Pipeline) -> Self {
        TestComponent::Composite(pipeline)
    }
}

impl TestComponent {
    /// Wraps a probe as a leaf component.
    pub fn leaf(probe: impl Probe + 'static) -> Self {
        TestComponent::Leaf(Arc::new(probe))
    }

    pub fn info(&self) -> &ComponentInfo {
        match self {
            TestComponent::Leaf(probe) => probe.info(),
            TestComponent::Composite(pipeline) => pipeline.info(),
        }
    }

    pub fn name(&self) -> &str {
        self.info().name()
    }

    /// Composite view of this component, if it is one.
    pub fn as_pipeline(&self) -> Option<&Pipeline> {
        match self {
            TestComponent::Composite(pipeline) => Some(pipeline),
            TestComponent::Leaf(_) => None,
        }
    }

    pub fn as_pipeline_mut(&mut self) -> Option<&mut Pipeline> {
        match self {
            TestComponent::Composite(pipeline) => Some(pipeline),
            TestComponent::Leaf(_) => None,
        }
    }

    /// Runs the component against `url`.
    pub fn handle<'a>(
        &'a self,
        url: &'a Url,
        settings: &'a Settings,
        ctx: &'a mut TestContext,
        services: &'a ServiceLocator,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ProbeError>> {
        match self {
            TestComponent::Leaf(probe) => probe.handle(url, settings, ctx, services, cancel),
            TestComponent::Composite(pipeline) => {
                pipeline.handle(url, settings, ctx, services, cancel)
            }
        }
    }

    /// One-off check in a fresh context: `true` when no step failed.
    pub async fn probe(
        &self,
        url: &Url,
        settings: &Settings,
        services: &ServiceLocator,
        cancel: &CancellationToken,
    ) -> Result<bool, ProbeError> {
        let mut builder =
            TestSessionBuilder::new().with_start_date_enforced(settings.enforce_start_date);
        builder.initiate(Some(url.clone()), Some(Utc::now()));
        let mut ctx = TestContext::new(builder);
        self.handle(url, settings, &mut ctx, services, cancel).await?;
        Ok(!ctx.has_failed())
    }
}
