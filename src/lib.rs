//! site_probe library: synthetic website availability tests
//!
//! A test is a pipeline of probes run against one URL: resolve the host,
//! check that it answers, send the request (following and recording every
//! redirect hop), then validate the response. Each probe execution becomes a
//! [`TestStep`]; one run becomes a [`TestSession`].
//!
//! # Example
//!
//! ```no_run
//! use site_probe::{default_pipeline, init_services, run_test, Settings};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings {
//!     max_redirections: 5,
//!     ..Default::default()
//! };
//! let services = init_services(&settings)?;
//! let url = url::Url::parse("https://example.com/")?;
//!
//! let session = run_test(
//!     &url,
//!     &default_pipeline(&settings),
//!     &settings,
//!     &services,
//!     None,
//!     &CancellationToken::new(),
//! )
//! .await?;
//! for step in session.steps() {
//!     println!("{} #{}: {:?}", step.name(), step.iteration(), step.result());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod component;
pub mod config;
pub mod error_handling;
pub mod http;
pub mod initialization;
pub mod probes;
pub mod property_bag;
mod run;
pub mod services;
pub mod session;

// Re-export public API
pub use component::{ComponentInfo, Pipeline, Probe, TestComponent};
pub use config::{ClientType, LogFormat, LogLevel, Settings};
pub use error_handling::{ErrorCode, ProbeError, TestError};
pub use initialization::{init_logger_with, init_services};
pub use property_bag::{keys, PropertyBag, PropertyBagKey, PropertyValue};
pub use run::{default_pipeline, run_test, run_tests, RunError, RunReport};
pub use services::ServiceLocator;
pub use session::{
    LogProgress, ProgressSink, SessionState, StepKind, StepResult, TestContext, TestSession,
    TestStep,
};
