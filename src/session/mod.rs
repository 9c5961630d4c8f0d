//! Test steps, sessions and the per-run state that produces them.
//!
//! This module provides:
//! - [`TestStep`]: immutable record of one probe execution
//! - [`TestSession`]: ordered steps of one run plus its terminal state
//! - [`TestSessionBuilder`]: the accumulator that closes steps and seals sessions
//! - [`TestContext`]: the per-run carrier (builder, progress sink, shared data)
//! - [`Stopwatch`]: per-step timing
//! - [`ProgressSink`] implementations for live observability

mod builder;
mod context;
mod progress;
mod record;
mod step;
mod stopwatch;

// Re-export public API
pub use builder::TestSessionBuilder;
pub use context::TestContext;
pub use progress::{ChannelProgress, LogProgress, ProgressSink};
pub use record::{SessionState, TestSession};
pub use step::{StepKind, StepResult, TestStep};
pub use stopwatch::Stopwatch;

#[cfg(test)]
mod tests;
