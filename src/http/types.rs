//! Request and response shapes exchanged with HTTP and browser collaborators.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Method, StatusCode};
use url::Url;

/// Transport configuration requested from an [`crate::services::HttpClientFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClientProfile {
    /// Retry transient failures with backoff
    pub retry: bool,
    /// Let the transport follow redirects on its own
    pub follow_redirects: bool,
}

impl ClientProfile {
    /// Name of the configuration, e.g. `retry-no-follow`.
    pub fn name(&self) -> &'static str {
        match (self.retry, self.follow_redirects) {
            (true, true) => "retry-follow",
            (true, false) => "retry-no-follow",
            (false, true) => "no-retry-follow",
            (false, false) => "no-retry-no-follow",
        }
    }
}

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// Absolute target URL
    pub url: Url,
    /// Extra request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// The request to send after `status` redirected us to `url`.
    ///
    /// 307/308 keep method and body; 303 always becomes a bodiless GET, and so
    /// does a POST answered with 301/302.
    pub fn redirected(&self, status: StatusCode, url: Url) -> Self {
        let keep_method = match status {
            StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => true,
            StatusCode::SEE_OTHER => self.method == Method::HEAD,
            _ => self.method != Method::POST,
        };
        if keep_method {
            Self {
                url,
                ..self.clone()
            }
        } else {
            Self {
                method: Method::GET,
                url,
                headers: self.headers.clone(),
                body: None,
            }
        }
    }
}

/// A response as seen by the engine.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// URL the response was received from
    pub url: Url,
    /// Status code
    pub status: StatusCode,
    /// Reason phrase as sent on the wire, when the collaborator exposes it
    pub reason: Option<String>,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(url: Url, status: StatusCode) -> Self {
        Self {
            url,
            status,
            reason: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Wire reason phrase, falling back to the canonical one.
    pub fn reason_phrase(&self) -> &str {
        self.reason
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("")
    }

    /// Raw `Location` header, if present and valid UTF-8.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Headers flattened to a map; repeated headers are joined with ", ".
    pub fn header_map(&self) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &self.headers {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            match map.entry(name.as_str().to_string()) {
                Entry::Occupied(mut existing) => {
                    let existing = existing.get_mut();
                    existing.push_str(", ");
                    existing.push_str(&value);
                }
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }
        map
    }
}
