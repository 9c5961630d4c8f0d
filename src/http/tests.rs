// Request sender tests, driven by scripted in-memory collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderValue, LOCATION};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::*;
use crate::error_handling::{ErrorCode, TransportError};
use crate::property_bag::keys;
use crate::services::{
    BrowserFactory, BrowserOptions, BrowserSession, HttpClient, HttpClientFactory,
    RedirectCallback, ServiceLocator,
};
use crate::session::{StepResult, TestContext, TestSessionBuilder, TestStep};

/// Canned responses keyed by absolute URL; unknown URLs answer 404.
struct Script {
    routes: HashMap<String, (u16, Option<&'static str>)>,
    requested: Mutex<Vec<String>>,
}

impl Script {
    fn new(routes: &[(&str, u16, Option<&'static str>)]) -> Arc<Self> {
        Arc::new(Self {
            routes: routes
                .iter()
                .map(|(url, status, location)| (url.to_string(), (*status, *location)))
                .collect(),
            requested: Mutex::new(Vec::new()),
        })
    }

    fn respond(&self, url: &Url) -> HttpResponse {
        self.requested
            .lock()
            .expect("lock")
            .push(url.to_string());
        let (status, location) = self
            .routes
            .get(url.as_str())
            .copied()
            .unwrap_or((404, None));
        let mut response =
            HttpResponse::new(url.clone(), StatusCode::from_u16(status).expect("status"));
        if let Some(location) = location {
            response
                .headers
                .insert(LOCATION, HeaderValue::from_static(location));
        }
        if status == 200 {
            response.body = b"ok".to_vec();
        }
        response
    }

    fn requests(&self) -> usize {
        self.requested.lock().expect("lock").len()
    }
}

struct ScriptedClient(Arc<Script>);

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Ok(self.0.respond(&request.url))
    }
}

struct ScriptedClientFactory {
    script: Arc<Script>,
    profiles: Mutex<Vec<ClientProfile>>,
}

impl HttpClientFactory for ScriptedClientFactory {
    fn client(&self, profile: ClientProfile) -> Result<Arc<dyn HttpClient>, TransportError> {
        self.profiles.lock().expect("lock").push(profile);
        Ok(Arc::new(ScriptedClient(Arc::clone(&self.script))))
    }
}

struct FailingClient;

#[async_trait]
impl HttpClient for FailingClient {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::InvalidRequest("connection reset".to_string()))
    }
}

struct HangingClient;

#[async_trait]
impl HttpClient for HangingClient {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        std::future::pending().await
    }
}

struct FixedClientFactory(Arc<dyn HttpClient>);

impl HttpClientFactory for FixedClientFactory {
    fn client(&self, _profile: ClientProfile) -> Result<Arc<dyn HttpClient>, TransportError> {
        Ok(Arc::clone(&self.0))
    }
}

/// A browser that follows redirects on its own, like a real one.
struct ScriptedPage(Arc<Script>);

#[async_trait]
impl BrowserSession for ScriptedPage {
    async fn navigate(
        &mut self,
        url: &Url,
        on_redirect: &mut RedirectCallback<'_>,
    ) -> Result<HttpResponse, TransportError> {
        let mut current = url.clone();
        for _ in 0..50 {
            let response = self.0.respond(&current);
            let target = match response.location() {
                Some(location) if is_followable_redirect(response.status) => location.to_string(),
                _ => return Ok(response),
            };
            if on_redirect(&response).is_break() {
                return Ok(response);
            }
            current = current
                .join(&target)
                .map_err(|e| TransportError::Browser(e.to_string()))?;
        }
        Err(TransportError::Browser("redirect loop".to_string()))
    }
}

struct ScriptedBrowser(Arc<Script>);

#[async_trait]
impl BrowserFactory for ScriptedBrowser {
    async fn open(
        &self,
        _options: &BrowserOptions,
    ) -> Result<Box<dyn BrowserSession>, TransportError> {
        Ok(Box::new(ScriptedPage(Arc::clone(&self.0))))
    }
}

fn url(s: &str) -> Url {
    Url::parse(s).expect("valid url")
}

fn context(target: &Url) -> TestContext {
    let mut builder = TestSessionBuilder::new();
    builder.initiate(Some(target.clone()), Some(Utc::now()));
    TestContext::new(builder)
}

fn http_services(script: &Arc<Script>) -> ServiceLocator {
    ServiceLocator::new().with_http_client_factory(Arc::new(ScriptedClientFactory {
        script: Arc::clone(script),
        profiles: Mutex::new(Vec::new()),
    }))
}

fn browser_services(script: &Arc<Script>) -> ServiceLocator {
    ServiceLocator::new().with_browser_factory(Arc::new(ScriptedBrowser(Arc::clone(script))))
}

fn status_of(step: &TestStep) -> String {
    step.properties()
        .and_then(|p| p.try_get_as::<String>(&keys::STATUS_CODE))
        .unwrap_or_default()
}

async fn run(
    sender: &impl Probe,
    start: &str,
    settings: &Settings,
    services: &ServiceLocator,
) -> TestContext {
    let target = url(start);
    let mut ctx = context(&target);
    sender
        .handle(&target, settings, &mut ctx, services, &CancellationToken::new())
        .await
        .expect("handled");
    ctx
}

fn cyclic_script() -> Arc<Script> {
    Script::new(&[
        ("http://site.test/a", 302, Some("http://site.test/b")),
        ("http://site.test/b", 302, Some("/a")),
    ])
}

fn endless_script() -> Arc<Script> {
    Script::new(&[
        ("http://site.test/r0", 302, Some("/r1")),
        ("http://site.test/r1", 302, Some("/r2")),
        ("http://site.test/r2", 302, Some("/r3")),
        ("http://site.test/r3", 302, Some("/r4")),
    ])
}

#[tokio::test]
async fn test_follows_relative_redirect_to_final_response() {
    let script = Script::new(&[
        ("http://site.test/a", 302, Some("/b")),
        ("http://site.test/b", 200, None),
    ]);
    let ctx = run(
        &HttpRequestSender::new(),
        "http://site.test/a",
        &Settings::default(),
        &http_services(&script),
    )
    .await;

    let steps = ctx.builder().steps();
    assert_eq!(steps.len(), 2);
    assert_eq!(
        steps.iter().map(TestStep::iteration).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(status_of(&steps[0]), "302");
    assert_eq!(status_of(&steps[1]), "200");
    assert!(steps.iter().all(|s| s.result() == StepResult::Succeeded));
    assert_eq!(script.requests(), 2);

    let terminal = steps[1].properties().expect("properties");
    assert_eq!(
        terminal.try_get_as::<String>(&keys::REQUEST_URL).as_deref(),
        Some("http://site.test/b")
    );
    assert_eq!(terminal.try_get_as::<Vec<u8>>(&keys::BODY), Some(b"ok".to_vec()));
    let hop = steps[0].properties().expect("properties");
    assert_eq!(hop.try_get_as::<String>(&keys::LOCATION).as_deref(), Some("/b"));
    assert!(!hop.contains_key(&keys::BODY));

    assert_eq!(ctx.response().map(|r| r.status), Some(StatusCode::OK));
    assert!(ctx.session().is_valid());
}

#[tokio::test]
async fn test_requests_clients_that_do_not_follow_redirects() {
    let script = Script::new(&[("http://site.test/", 200, None)]);
    let factory = Arc::new(ScriptedClientFactory {
        script: Arc::clone(&script),
        profiles: Mutex::new(Vec::new()),
    });
    let services = ServiceLocator::new().with_http_client_factory(factory.clone());
    let settings = Settings {
        retry: true,
        ..Default::default()
    };
    run(&HttpRequestSender::new(), "http://site.test/", &settings, &services).await;

    let profiles = factory.profiles.lock().expect("lock");
    assert_eq!(
        profiles.as_slice(),
        &[ClientProfile {
            retry: true,
            follow_redirects: false
        }]
    );
}

#[tokio::test]
async fn test_cycle_fails_with_full_chain() {
    let script = cyclic_script();
    let ctx = run(
        &HttpRequestSender::new(),
        "http://site.test/a",
        &Settings::default(),
        &http_services(&script),
    )
    .await;

    let steps = ctx.builder().steps();
    let last = steps.last().expect("steps");
    let error = last.error().expect("error");
    assert_eq!(error.code(), ErrorCode::CircularRedirect);
    assert!(error
        .message()
        .contains("http://site.test/a -> http://site.test/b -> http://site.test/a"));
    assert_eq!(steps.len(), 3);
    assert_eq!(script.requests(), 2);
    assert!(ctx.response().is_none());
}

#[tokio::test]
async fn test_hop_budget_is_enforced() {
    let script = endless_script();
    let settings = Settings {
        max_redirections: 2,
        ..Default::default()
    };
    let ctx = run(
        &HttpRequestSender::new(),
        "http://site.test/r0",
        &settings,
        &http_services(&script),
    )
    .await;

    let steps = ctx.builder().steps();
    assert_eq!(script.requests(), 3);
    assert_eq!(steps.len(), 3);
    assert!(steps[..2].iter().all(|s| !s.is_failed()));
    let error = steps[2].error().expect("error");
    assert_eq!(error.code(), ErrorCode::TooManyRedirects);
    assert!(error.message().contains("exceeded 2"));
    assert!(error.message().contains("http://site.test/r2"));
}

#[tokio::test]
async fn test_disabled_following_treats_redirect_as_terminal() {
    let script = Script::new(&[("http://site.test/a", 301, Some("/b"))]);
    let settings = Settings {
        follow_redirects: false,
        ..Default::default()
    };
    let ctx = run(
        &HttpRequestSender::new(),
        "http://site.test/a",
        &settings,
        &http_services(&script),
    )
    .await;

    let steps = ctx.builder().steps();
    assert_eq!(steps.len(), 1);
    assert_eq!(status_of(&steps[0]), "301");
    assert!(!steps[0].is_failed());
    assert_eq!(script.requests(), 1);
}

#[tokio::test]
async fn test_redirect_without_location_ends_chase() {
    let script = Script::new(&[("http://site.test/a", 302, None)]);
    let ctx = run(
        &HttpRequestSender::new(),
        "http://site.test/a",
        &Settings::default(),
        &http_services(&script),
    )
    .await;

    let steps = ctx.builder().steps();
    assert_eq!(steps.len(), 2);
    assert!(steps.iter().all(|s| !s.is_failed()));
    assert_eq!(script.requests(), 1);
    assert_eq!(ctx.response().map(|r| r.status), Some(StatusCode::FOUND));
}

#[tokio::test]
async fn test_transport_error_becomes_failed_step() {
    let services = ServiceLocator::new()
        .with_http_client_factory(Arc::new(FixedClientFactory(Arc::new(FailingClient))));
    let ctx = run(
        &HttpRequestSender::new(),
        "http://site.test/",
        &Settings::default(),
        &services,
    )
    .await;

    let steps = ctx.builder().steps();
    assert_eq!(steps.len(), 1);
    let error = steps[0].error().expect("error");
    assert_eq!(error.code(), ErrorCode::WrappedException);
    assert!(error.message().contains("connection reset"));
}

#[tokio::test]
async fn test_missing_client_factory_is_fatal() {
    let target = url("http://site.test/");
    let mut ctx = context(&target);
    let result = HttpRequestSender::new()
        .handle(
            &target,
            &Settings::default(),
            &mut ctx,
            &ServiceLocator::new(),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(ProbeError::MissingService("HttpClientFactory"))
    ));
    assert!(ctx.builder().steps().is_empty());
    assert_eq!(
        ctx.session().state().decline_code(),
        Some(ErrorCode::MissingClientFactory)
    );
}

#[tokio::test]
async fn test_cancellation_records_no_step() {
    let services = ServiceLocator::new()
        .with_http_client_factory(Arc::new(FixedClientFactory(Arc::new(HangingClient))));
    let target = url("http://site.test/");
    let mut ctx = context(&target);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = HttpRequestSender::new()
        .handle(&target, &Settings::default(), &mut ctx, &services, &cancel)
        .await;

    assert!(matches!(result, Err(ProbeError::Cancelled)));
    assert!(ctx.builder().steps().is_empty());
}

#[tokio::test]
async fn test_visited_urls_do_not_leak_between_runs() {
    let script = Script::new(&[
        ("http://site.test/a", 302, Some("/b")),
        ("http://site.test/b", 302, Some("/c")),
        ("http://site.test/c", 200, None),
    ]);
    let sender = HttpRequestSender::new();
    let services = http_services(&script);

    for _ in 0..2 {
        let ctx = run(&sender, "http://site.test/a", &Settings::default(), &services).await;
        assert_eq!(ctx.builder().steps().len(), 3);
        assert!(!ctx.has_failed());
    }
    let ctx = run(&sender, "http://site.test/b", &Settings::default(), &services).await;
    assert_eq!(ctx.builder().steps().len(), 2);
    assert!(!ctx.has_failed());
}

#[tokio::test]
async fn test_browser_follows_redirects_like_http() {
    let routes = [
        ("http://site.test/a", 302, Some("/b")),
        ("http://site.test/b", 307, Some("http://site.test/c")),
        ("http://site.test/c", 200, None),
    ];
    let http_script = Script::new(&routes);
    let browser_script = Script::new(&routes);

    let http = run(
        &HttpRequestSender::new(),
        "http://site.test/a",
        &Settings::default(),
        &http_services(&http_script),
    )
    .await;
    let browser = run(
        &BrowserRequestSender::new(),
        "http://site.test/a",
        &Settings::default(),
        &browser_services(&browser_script),
    )
    .await;

    let statuses =
        |ctx: &TestContext| ctx.builder().steps().iter().map(status_of).collect::<Vec<_>>();
    assert_eq!(statuses(&http), vec!["302", "307", "200"]);
    assert_eq!(statuses(&browser), statuses(&http));
    assert_eq!(
        browser
            .builder()
            .steps()
            .iter()
            .map(TestStep::iteration)
            .collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(browser.response().map(|r| r.status), Some(StatusCode::OK));
}

#[tokio::test]
async fn test_browser_detects_cycle() {
    let script = cyclic_script();
    let ctx = run(
        &BrowserRequestSender::new(),
        "http://site.test/a",
        &Settings::default(),
        &browser_services(&script),
    )
    .await;

    let steps = ctx.builder().steps();
    assert_eq!(steps.len(), 3);
    let error = steps[2].error().expect("error");
    assert_eq!(error.code(), ErrorCode::CircularRedirect);
    assert!(error
        .message()
        .contains("http://site.test/a -> http://site.test/b -> http://site.test/a"));
    assert_eq!(script.requests(), 2);
}

#[tokio::test]
async fn test_browser_enforces_hop_budget() {
    let script = endless_script();
    let settings = Settings {
        max_redirections: 2,
        ..Default::default()
    };
    let ctx = run(
        &BrowserRequestSender::new(),
        "http://site.test/r0",
        &settings,
        &browser_services(&script),
    )
    .await;

    let steps = ctx.builder().steps();
    assert_eq!(script.requests(), 3);
    assert_eq!(steps.len(), 3);
    let error = steps[2].error().expect("error");
    assert_eq!(error.code(), ErrorCode::TooManyRedirects);
    assert!(error.message().contains("http://site.test/r2"));
}

#[tokio::test]
async fn test_browser_with_following_disabled_stops_at_first_redirect() {
    let script = endless_script();
    let settings = Settings {
        follow_redirects: false,
        ..Default::default()
    };
    let ctx = run(
        &BrowserRequestSender::new(),
        "http://site.test/r0",
        &settings,
        &browser_services(&script),
    )
    .await;

    let steps = ctx.builder().steps();
    assert_eq!(steps.len(), 1);
    assert_eq!(status_of(&steps[0]), "302");
    assert_eq!(script.requests(), 1);
}

#[tokio::test]
async fn test_missing_browser_factory_is_fatal() {
    let target = url("http://site.test/");
    let mut ctx = context(&target);
    let result = BrowserRequestSender::new()
        .handle(
            &target,
            &Settings::default(),
            &mut ctx,
            &ServiceLocator::new(),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(ProbeError::MissingService("BrowserFactory"))
    ));
    assert_eq!(
        ctx.session().state().decline_code(),
        Some(ErrorCode::MissingBrowserFactory)
    );
}

#[test]
fn test_sender_follows_client_type() {
    let http = RequestSender::for_client_type(ClientType::Http);
    assert!(matches!(http, RequestSender::Http(_)));
    assert_eq!(http.info().name(), "HttpRequest");

    let browser = RequestSender::for_client_type(ClientType::Browser);
    assert!(matches!(browser, RequestSender::Browser(_)));
    assert_eq!(browser.info().name(), "BrowserRequest");
}

#[test]
fn test_redirected_request_rewrites_method() {
    let mut post = HttpRequest::get(url("http://site.test/form"));
    post.method = reqwest::Method::POST;
    post.body = Some(b"x=1".to_vec());

    let kept = post.redirected(StatusCode::TEMPORARY_REDIRECT, url("http://site.test/b"));
    assert_eq!(kept.method, reqwest::Method::POST);
    assert!(kept.body.is_some());

    let switched = post.redirected(StatusCode::FOUND, url("http://site.test/b"));
    assert_eq!(switched.method, reqwest::Method::GET);
    assert!(switched.body.is_none());

    let see_other = post.redirected(StatusCode::SEE_OTHER, url("http://site.test/b"));
    assert_eq!(see_other.method, reqwest::Method::GET);
}

#[test]
fn test_header_map_joins_repeated_headers() {
    let mut response = HttpResponse::new(url("http://site.test/"), StatusCode::OK);
    response
        .headers
        .append("set-cookie", HeaderValue::from_static("a=1"));
    response
        .headers
        .append("set-cookie", HeaderValue::from_static("b=2"));
    let map = response.header_map();
    assert_eq!(map.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
    assert_eq!(response.reason_phrase(), "OK");
}

