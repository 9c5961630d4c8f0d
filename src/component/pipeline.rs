//! Sequential composite of test components.

use futures::future::BoxFuture;
use log::debug;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::component::{ComponentInfo, TestComponent};
use crate::config::Settings;
use crate::error_handling::{ProbeError, TestError};
use crate::services::ServiceLocator;
use crate::session::{StepKind, TestContext};

/// Runs its children in order.
///
/// After each child, if `continue_on_failure` is off and any step of the run
/// has failed, the remaining children are skipped.
#[derive(Debug, Clone)]
pub struct Pipeline {
    info: ComponentInfo,
    children: Vec<TestComponent>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ComponentInfo::new(name, StepKind::Composite),
            children: Vec::new(),
        }
    }

    /// Appends a child, builder style.
    pub fn with(mut self, child: impl Into<TestComponent>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn add(&mut self, child: impl Into<TestComponent>) {
        self.children.push(child.into());
    }

    pub fn insert(&mut self, index: usize, child: impl Into<TestComponent>) {
        let index = index.min(self.children.len());
        self.children.insert(index, child.into());
    }

    /// Removes the child at `index`.
    pub fn remove(&mut self, index: usize) -> Option<TestComponent> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// Removes the first child named `name`.
    pub fn remove_named(&mut self, name: &str) -> Option<TestComponent> {
        let index = self.children.iter().position(|c| c.name() == name)?;
        Some(self.children.remove(index))
    }

    pub fn info(&self) -> &ComponentInfo {
        &self.info
    }

    pub fn children(&self) -> &[TestComponent] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn handle<'a>(
        &'a self,
        url: &'a Url,
        settings: &'a Settings,
        ctx: &'a mut TestContext,
        services: &'a ServiceLocator,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ProbeError>> {
        Box::pin(async move {
            if self.children.is_empty() {
                let clock = ctx.start_timer();
                ctx.record_failure(&self.info, &clock, &TestError::no_handlers(self.info.name()))?;
                return Ok(());
            }

            for (index, child) in self.children.iter().enumerate() {
                if cancel.is_cancelled() {
                    return Err(ProbeError::Cancelled);
                }
                child.handle(url, settings, ctx, services, cancel).await?;

                if !settings.continue_on_failure && ctx.has_failed() {
                    let skipped = self.children.len() - index - 1;
                    if skipped > 0 {
                        debug!(
                            "Pipeline '{}' stopping after failed '{}' ({} component(s) skipped)",
                            self.info.name(),
                            child.name(),
                            skipped
                        );
                    }
                    break;
                }
            }
            Ok(())
        })
    }
}
