//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `site_probe` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - Ctrl-C cancellation
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use log::warn;
use tokio_util::sync::CancellationToken;
use url::Url;

use site_probe::config::{
    BrowserEngine, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_REDIRECTIONS, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};
use site_probe::{
    default_pipeline, init_logger_with, init_services, run_tests, ClientType, LogFormat,
    LogLevel, LogProgress, ProgressSink, RunError, RunReport, SessionState, Settings,
};

/// How results are printed.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// One colored line per session
    Plain,
    /// The full report as JSON
    Json,
}

/// Synthetic availability tests for websites.
#[derive(Parser, Debug)]
#[command(name = "site_probe", version, about)]
struct Cli {
    /// URLs to test
    #[arg(required = true)]
    urls: Vec<String>,

    /// Log level: error, warn, info, debug, or trace
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Log format: plain or json
    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,

    /// Result output format
    #[arg(long, value_enum, default_value = "plain")]
    format: OutputFormat,

    /// Keep running the remaining probes after a failed step
    #[arg(long)]
    continue_on_failure: bool,

    /// Record redirect responses as final instead of following them
    #[arg(long)]
    no_follow_redirects: bool,

    /// Maximum redirect hops before the request fails (at least 1)
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTIONS, value_parser = parse_max_redirections)]
    max_redirections: usize,

    /// Retry transient transport failures with backoff
    #[arg(long)]
    retry: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_seconds: u64,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Client driving the request step
    #[arg(long, value_enum, default_value_t = ClientType::Http)]
    client_type: ClientType,

    /// Browser engine (browser client type only)
    #[arg(long, value_enum, default_value_t = BrowserEngine::Chromium)]
    browser_engine: BrowserEngine,

    /// Decline sessions whose start date lies before today
    #[arg(long)]
    enforce_start_date: bool,

    /// Maximum number of URLs tested at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    max_concurrency: usize,
}

/// A limit of 0 would fail every request, including a plain 200.
fn parse_max_redirections(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            continue_on_failure: self.continue_on_failure,
            follow_redirects: !self.no_follow_redirects,
            max_redirections: self.max_redirections,
            retry: self.retry,
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self.user_agent.clone(),
            client_type: self.client_type,
            browser_engine: self.browser_engine,
            enforce_start_date: self.enforce_start_date,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let settings = cli.settings();
    let services = init_services(&settings).context("Failed to initialize services")?;

    let mut rejected = Vec::new();
    let mut urls = Vec::new();
    for raw in &cli.urls {
        match Url::parse(raw) {
            Ok(url) => urls.push(url),
            Err(e) => {
                warn!("Skipping invalid URL '{}': {}", raw, e);
                rejected.push(RunError {
                    url: raw.clone(),
                    error: format!("Invalid URL: {}", e),
                });
            }
        }
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running tests");
            on_signal.cancel();
        }
    });

    let progress: Option<Arc<dyn ProgressSink>> = Some(Arc::new(LogProgress));
    let mut report = run_tests(
        urls,
        &default_pipeline(&settings),
        &settings,
        &services,
        progress,
        cli.max_concurrency,
        &cancel,
    )
    .await
    .context("Test run failed")?;
    report.errors.extend(rejected);

    match cli.format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{}", json);
        }
        OutputFormat::Plain => print_summary(&report),
    }

    if !report.all_valid() {
        process::exit(1);
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    for session in &report.sessions {
        let url = session
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<no url>".to_string());
        let elapsed_ms = session.duration().as_secs_f64() * 1000.0;
        match session.state() {
            SessionState::Declined { reason } => {
                println!("{} {} declined: {}", "DECLINED".yellow(), url, reason);
            }
            _ if session.is_valid() => {
                println!(
                    "{} {} ({} steps, {:.0} ms)",
                    "PASS".green(),
                    url,
                    session.steps().len(),
                    elapsed_ms
                );
            }
            _ => {
                println!(
                    "{} {} ({} steps, {:.0} ms)",
                    "FAIL".red(),
                    url,
                    session.steps().len(),
                    elapsed_ms
                );
                for step in session.failures() {
                    println!(
                        "    {} #{}: {}",
                        step.name(),
                        step.iteration(),
                        step.error_message().unwrap_or_default()
                    );
                }
            }
        }
    }
    for error in &report.errors {
        println!("{} {}: {}", "ERROR".red().bold(), error.url, error.error);
    }
    println!(
        "{} valid, {} invalid, {} declined, {} error(s) in {:.1}s",
        report.valid,
        report.invalid,
        report.declined,
        report.errors.len(),
        report.elapsed_seconds
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_redirections_defaults_and_accepts_positive() {
        let cli = Cli::try_parse_from(["site_probe", "https://example.com"]).expect("parse");
        assert_eq!(cli.settings().max_redirections, DEFAULT_MAX_REDIRECTIONS);

        let cli = Cli::try_parse_from([
            "site_probe",
            "--max-redirections",
            "3",
            "https://example.com",
        ])
        .expect("parse");
        assert_eq!(cli.settings().max_redirections, 3);
    }

    #[test]
    fn test_max_redirections_rejects_zero() {
        let result = Cli::try_parse_from([
            "site_probe",
            "--max-redirections",
            "0",
            "https://example.com",
        ]);
        assert!(result.is_err());
    }
}
