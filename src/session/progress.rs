//! Live observability of finalized steps.

use log::info;
use tokio::sync::mpsc;

use crate::session::step::{StepResult, TestStep};

/// Receives every finalized step, once, in step order.
pub trait ProgressSink: Send + Sync {
    fn report(&self, step: &TestStep);
}

impl<F> ProgressSink for F
where
    F: Fn(&TestStep) + Send + Sync,
{
    fn report(&self, step: &TestStep) {
        self(step)
    }
}

/// Logs each step at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, step: &TestStep) {
        match step.result() {
            StepResult::Succeeded => info!(
                "{} #{} succeeded in {:.1} ms",
                step.name(),
                step.iteration(),
                step.duration().as_secs_f64() * 1000.0
            ),
            StepResult::Failed => info!(
                "{} #{} failed in {:.1} ms: {}",
                step.name(),
                step.iteration(),
                step.duration().as_secs_f64() * 1000.0,
                step.error_message().unwrap_or_default()
            ),
        }
    }
}

/// Forwards steps to an unbounded channel; a closed receiver drops them.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: mpsc::UnboundedSender<TestStep>,
}

impl ChannelProgress {
    pub fn new(sender: mpsc::UnboundedSender<TestStep>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, step: &TestStep) {
        let _ = self.sender.send(step.clone());
    }
}
