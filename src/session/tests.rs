// Session module tests.

use std::sync::{Arc, Mutex};

use chrono::{Duration as ChronoDuration, Utc};
use url::Url;

use super::*;
use crate::component::ComponentInfo;
use crate::error_handling::{ErrorCode, TestError};
use crate::property_bag::{keys, PropertyValue};

fn target() -> Url {
    Url::parse("https://example.com/").expect("valid url")
}

fn initiated() -> TestSessionBuilder {
    let mut builder = TestSessionBuilder::new();
    builder.initiate(Some(target()), Some(Utc::now()));
    builder
}

fn action(name: &str) -> ComponentInfo {
    ComponentInfo::new(name, StepKind::Action)
}

#[test]
fn test_iteration_counter_per_component() {
    let mut builder = initiated();
    let probe = action("HttpRequest");
    let other = action("Dns");
    let clock = Stopwatch::start_new();

    let iterations: Vec<u32> = (0..3)
        .map(|_| {
            builder
                .build_success(&probe, &clock)
                .expect("step")
                .iteration()
        })
        .collect();
    assert_eq!(iterations, vec![1, 2, 3]);
    assert_eq!(
        builder.build_success(&other, &clock).expect("step").iteration(),
        1
    );
}

#[test]
fn test_same_name_different_kind_counts_separately() {
    let mut builder = initiated();
    let clock = Stopwatch::start_new();
    builder
        .build_success(&ComponentInfo::new("Status", StepKind::Action), &clock)
        .expect("step");
    let step = builder
        .build_success(&ComponentInfo::new("Status", StepKind::Validate), &clock)
        .expect("step");
    assert_eq!(step.iteration(), 1);
}

#[test]
fn test_pending_properties_attach_to_next_step_only() {
    let mut builder = initiated();
    let probe = action("HttpRequest");
    let clock = Stopwatch::start_new();

    builder
        .stage(keys::STATUS_CODE, "302")
        .stage(keys::LOCATION, "/b");
    let first = builder.build_success(&probe, &clock).expect("step");
    let props = first.properties().expect("properties attached");
    assert_eq!(props.len(), 2);
    assert_eq!(
        props.try_get_as::<String>(&keys::LOCATION),
        Some("/b".to_string())
    );
    assert!(builder.pending().is_empty());

    let second = builder.build_success(&probe, &clock).expect("step");
    assert!(second.properties().is_none());
}

#[test]
fn test_failed_step_without_message_is_rejected_and_not_counted() {
    let mut builder = initiated();
    let probe = action("Ping");
    let clock = Stopwatch::start_new();
    builder.stage(keys::ROUNDTRIP_MS, "3");

    let empty = TestError::new(ErrorCode::PingFailed, "");
    assert!(builder.build_failure(&probe, &clock, &empty).is_err());
    assert!(builder.steps().is_empty());
    assert_eq!(builder.pending().len(), 1);

    let step = builder
        .build_failure(&probe, &clock, &TestError::ping_failed(&["10.0.0.1".into()]))
        .expect("step");
    assert_eq!(step.iteration(), 1);
}

#[test]
fn test_build_exception_uses_error_message() {
    let mut builder = initiated();
    let clock = Stopwatch::start_new();
    let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "connection timed out");
    let step = builder
        .build_exception(&action("HttpRequest"), &clock, &io)
        .expect("step");
    assert!(step.is_failed());
    assert_eq!(step.error_message(), Some("connection timed out"));
    assert_eq!(
        step.error().map(TestError::code),
        Some(ErrorCode::WrappedException)
    );
    assert!(builder.has_failed());
}

#[test]
fn test_completed_session_aggregates() {
    let mut builder = initiated();
    let clock = Stopwatch::start_new();
    builder.build_success(&action("Dns"), &clock).expect("step");
    builder
        .build_failure(
            &action("Ping"),
            &clock,
            &TestError::ping_failed(&["10.0.0.1".into()]),
        )
        .expect("step");

    let session = builder.get_session();
    assert_eq!(session.state(), &SessionState::Completed);
    assert_eq!(session.steps().len(), 2);
    assert_eq!(session.failures().count(), 1);
    assert!(!session.is_valid());
    assert_eq!(
        session.duration(),
        session
            .steps()
            .iter()
            .map(TestStep::duration)
            .sum::<std::time::Duration>()
    );
}

#[test]
fn test_empty_session_is_not_valid() {
    let session = initiated().get_session();
    assert_eq!(session.state(), &SessionState::Completed);
    assert!(!session.is_valid());
}

#[test]
fn test_missing_url_declines_session() {
    let mut builder = TestSessionBuilder::new();
    builder.initiate(None, Some(Utc::now()));
    let session = builder.get_session();
    assert_eq!(session.state().decline_code(), Some(ErrorCode::MissingUrl));
    assert!(session
        .decline_reason()
        .expect("declined")
        .contains("URL is missing"));
}

#[test]
fn test_uninitiated_builder_declines_session() {
    let session = TestSessionBuilder::new().get_session();
    assert_eq!(session.state().decline_code(), Some(ErrorCode::MissingUrl));
}

#[test]
fn test_missing_start_time_declines_session() {
    let mut builder = TestSessionBuilder::new();
    builder.initiate(Some(target()), None);
    assert_eq!(
        builder.get_session().state().decline_code(),
        Some(ErrorCode::MissingStartTime)
    );
}

#[test]
fn test_explicit_decline_wins() {
    let mut builder = initiated();
    builder.decline(TestError::missing_client_factory());
    let session = builder.get_session();
    assert_eq!(
        session.state().decline_code(),
        Some(ErrorCode::MissingClientFactory)
    );
    assert_eq!(
        session.decline_reason(),
        Some("No HTTP client factory is registered")
    );
}

#[test]
fn test_old_start_date_is_advisory_by_default() {
    let mut builder = TestSessionBuilder::new();
    builder.initiate(Some(target()), Some(Utc::now() - ChronoDuration::days(2)));
    assert_eq!(builder.get_session().state(), &SessionState::Completed);
}

#[test]
fn test_old_start_date_declines_when_enforced() {
    let mut builder = TestSessionBuilder::new().with_start_date_enforced(true);
    builder.initiate(Some(target()), Some(Utc::now() - ChronoDuration::days(2)));
    assert_eq!(
        builder.get_session().state().decline_code(),
        Some(ErrorCode::BadStartDate)
    );
}

#[test]
fn test_initiate_overwrites_identity() {
    let mut builder = TestSessionBuilder::new();
    builder.initiate(None, None);
    builder.initiate(Some(target()), Some(Utc::now()));
    let session = builder.get_session();
    assert_eq!(session.state(), &SessionState::Completed);
    assert_eq!(session.url(), Some(&target()));
}

#[test]
fn test_returned_session_is_not_mutated_by_later_steps() {
    let mut builder = initiated();
    let clock = Stopwatch::start_new();
    builder.build_success(&action("Dns"), &clock).expect("step");
    let first = builder.get_session();
    builder.build_success(&action("Ping"), &clock).expect("step");
    assert_eq!(first.steps().len(), 1);
    assert_eq!(builder.get_session().steps().len(), 2);
}

#[test]
fn test_context_reports_each_step_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        move |step: &TestStep| {
            seen.lock()
                .expect("lock")
                .push((step.name().to_string(), step.iteration()));
        }
    };
    let mut ctx = TestContext::new(initiated()).with_progress(Arc::new(sink));
    let clock = ctx.start_timer();
    ctx.record_success(&action("Dns"), &clock).expect("step");
    ctx.record_failure(&action("Ping"), &clock, &TestError::insufficient_data("IpAddresses"))
        .expect("step");
    ctx.record_success(&action("Dns"), &clock).expect("step");

    let seen = seen.lock().expect("lock").clone();
    assert_eq!(
        seen,
        vec![
            ("Dns".to_string(), 1),
            ("Ping".to_string(), 1),
            ("Dns".to_string(), 2)
        ]
    );
    assert!(ctx.has_failed());
}

#[tokio::test]
async fn test_channel_progress_forwards_steps() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut ctx = TestContext::new(initiated()).with_progress(Arc::new(ChannelProgress::new(tx)));
    let clock = ctx.start_timer();
    ctx.record_success(&action("Dns"), &clock).expect("step");
    let step = rx.recv().await.expect("step forwarded");
    assert_eq!(step.name(), "Dns");
}

#[test]
fn test_session_serializes_with_typed_properties() {
    let mut builder = initiated();
    let clock = Stopwatch::start_new();
    builder.stage(
        keys::IP_ADDRESSES,
        PropertyValue::TextList(vec!["93.184.216.34".into()]),
    );
    builder.build_success(&action("Dns"), &clock).expect("step");
    builder
        .build_failure(&action("Ping"), &clock, &TestError::ping_failed(&["93.184.216.34".into()]))
        .expect("step");
    let session = builder.get_session();

    let json = serde_json::to_value(&session).expect("serialize session");
    assert_eq!(json["state"]["state"], "completed");
    assert_eq!(json["steps"][0]["properties"]["IpAddresses"]["type"], "text-list");
    assert_eq!(json["steps"][1]["error"]["code"], "ping-failed");

    let back: TestSession = serde_json::from_value(json).expect("deserialize session");
    assert_eq!(back, session);
}
