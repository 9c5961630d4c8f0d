//! Redirect chain tracking.
//!
//! [`RedirectChase`] holds the state of one redirect chase: the ordered set of
//! visited absolute URLs and the hop budget. Both request senders drive it the
//! same way:
//!
//! 1. [`RedirectChase::begin`] with the initial URL.
//! 2. While [`RedirectChase::should_follow`] accepts the latest response,
//!    record an intermediate step, then ask [`RedirectChase::next_hop`] what to
//!    do: continue to a resolved URL, stop (no `Location`), or fail (cycle,
//!    unresolvable target).
//! 3. [`RedirectChase::check_limit`] once the loop ends.

use std::collections::HashSet;

use reqwest::StatusCode;
use url::Url;

use crate::config::REDIRECT_CHAIN_SEPARATOR;
use crate::error_handling::TestError;
use crate::http::types::HttpResponse;

/// Statuses treated as followable redirects.
///
/// Matched explicitly: 300 (multiple choices) and 304 (not modified) are in
/// the 3xx range but carry no redirect to follow.
pub const REDIRECT_STATUSES: [StatusCode; 5] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::SEE_OTHER,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

pub fn is_followable_redirect(status: StatusCode) -> bool {
    REDIRECT_STATUSES.contains(&status)
}

/// Insertion-ordered set of visited URLs.
#[derive(Debug, Clone, Default)]
pub struct OrderedHttpRedirections {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedHttpRedirections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `url`; returns `false` if it was already present.
    pub fn add(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.order.push(url);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }

    /// Most recently added entry matching `predicate`.
    pub fn last_matching(&self, predicate: impl Fn(&str) -> bool) -> Option<&str> {
        self.order
            .iter()
            .rev()
            .map(String::as_str)
            .find(|url| predicate(url))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Ordered join of the visited URLs, e.g. `A -> B`.
    pub fn chain(&self) -> String {
        self.order.join(REDIRECT_CHAIN_SEPARATOR)
    }
}

/// What to do after an intermediate redirect response.
#[derive(Debug, Clone, PartialEq)]
pub enum HopOutcome {
    /// Request this absolute URL next
    Continue(Url),
    /// Nothing to follow; the response is terminal
    Done,
    /// Protocol failure; stop chasing
    Failed(TestError),
}

/// State of one redirect chase.
#[derive(Debug, Clone)]
pub struct RedirectChase {
    visited: OrderedHttpRedirections,
    max_redirections: usize,
}

impl RedirectChase {
    pub fn new(max_redirections: usize) -> Self {
        Self {
            visited: OrderedHttpRedirections::new(),
            max_redirections,
        }
    }

    /// Resets the visited set to just the initial URL.
    pub fn begin(&mut self, initial: &Url) {
        self.visited.clear();
        self.visited.add(initial.as_str());
    }

    pub fn visited(&self) -> &OrderedHttpRedirections {
        &self.visited
    }

    /// Number of URLs visited so far (initial request included).
    pub fn hops(&self) -> usize {
        self.visited.len()
    }

    /// True while `response` is a followable redirect and the hop budget is
    /// not exhausted.
    pub fn should_follow(&self, response: &HttpResponse) -> bool {
        is_followable_redirect(response.status) && self.visited.len() <= self.max_redirections
    }

    /// Resolves the redirect target of `response` and records it as visited.
    ///
    /// Relative targets resolve against the last absolute URL visited. A
    /// target seen before is a cycle, reported with the full chain.
    pub fn next_hop(&mut self, response: &HttpResponse) -> HopOutcome {
        let location = match response.location() {
            Some(location) => location,
            None => return HopOutcome::Done,
        };
        let target = match self.resolve(location) {
            Ok(target) => target,
            Err(error) => return HopOutcome::Failed(error),
        };
        if !self.visited.add(target.as_str()) {
            let chain = format!(
                "{}{}{}",
                self.visited.chain(),
                REDIRECT_CHAIN_SEPARATOR,
                target
            );
            return HopOutcome::Failed(TestError::circular_redirect(&chain));
        }
        HopOutcome::Continue(target)
    }

    /// Fails when the chase visited more URLs than the budget allows.
    pub fn check_limit(&self) -> Result<(), TestError> {
        if self.visited.len() > self.max_redirections {
            let last = self
                .visited
                .last_matching(|url| !url.is_empty())
                .unwrap_or_default();
            return Err(TestError::too_many_redirects(self.max_redirections, last));
        }
        Ok(())
    }

    fn resolve(&self, location: &str) -> Result<Url, TestError> {
        if let Ok(absolute) = Url::parse(location) {
            return Ok(absolute);
        }
        let base = self
            .visited
            .last_matching(|url| Url::parse(url).is_ok())
            .and_then(|url| Url::parse(url).ok())
            .ok_or_else(|| TestError::invalid_redirect_target(location))?;
        base.join(location)
            .map_err(|_| TestError::invalid_redirect_target(location))
    }
}
