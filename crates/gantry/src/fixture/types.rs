//! Type definitions for fixtures: matchers, call records and canned responses.

use crate::request::{Params, Request};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Failure status used when `.failure()` is given no explicit status.
pub const DEFAULT_FAILURE_STATUS: u16 = 400;

// ============================================================================
// Matchers
// ============================================================================

/// A `url`, `host` or `path` constraint: an exact string or a regex.
#[derive(Debug, Clone)]
pub enum TextMatcher {
    Exact(String),
    Pattern(Arc<Regex>),
}

impl TextMatcher {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(TextMatcher::Pattern(Arc::new(Regex::new(pattern)?)))
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            TextMatcher::Exact(expected) => expected == value,
            TextMatcher::Pattern(regex) => regex.is_match(value),
        }
    }
}

/// Two patterns are equal when their sources are equal.
impl PartialEq for TextMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TextMatcher::Exact(a), TextMatcher::Exact(b)) => a == b,
            (TextMatcher::Pattern(a), TextMatcher::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl From<&str> for TextMatcher {
    fn from(value: &str) -> Self {
        TextMatcher::Exact(value.to_string())
    }
}

impl From<String> for TextMatcher {
    fn from(value: String) -> Self {
        TextMatcher::Exact(value)
    }
}

impl From<Regex> for TextMatcher {
    fn from(regex: Regex) -> Self {
        TextMatcher::Pattern(Arc::new(regex))
    }
}

/// What a request has to look like for a fixture to answer it.
///
/// Absent fields impose no constraint. `params` and `headers` are containment checks:
/// the request may carry more than the matcher lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureMatcher {
    pub url: Option<TextMatcher>,
    pub host: Option<TextMatcher>,
    /// Compared against the path including its query string
    pub path: Option<TextMatcher>,
    pub params: Option<Params>,
    pub headers: Option<HashMap<String, String>>,
}

impl FixtureMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<TextMatcher>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn host(mut self, host: impl Into<TextMatcher>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn path(mut self, path: impl Into<TextMatcher>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Check every declared field against the (rule-augmented) request.
    pub fn matches(&self, request: &Request) -> bool {
        if let Some(ref url) = self.url {
            if !url.matches(&request.url()) {
                return false;
            }
        }

        if let Some(ref host) = self.host {
            if !host.matches(request.host()) {
                return false;
            }
        }

        if let Some(ref path) = self.path {
            if !path.matches(&request.path_with_query()) {
                return false;
            }
        }

        if let Some(ref params) = self.params {
            let contained = params
                .iter()
                .all(|(name, expected)| request.params().get(name) == Some(expected));
            if !contained {
                return false;
            }
        }

        if let Some(ref headers) = self.headers {
            let contained = headers.iter().all(|(name, expected)| {
                request
                    .headers()
                    .iter()
                    .any(|(k, v)| k.eq_ignore_ascii_case(name) && v == expected)
            });
            if !contained {
                return false;
            }
        }

        true
    }
}

// ============================================================================
// Call history
// ============================================================================

/// Snapshot of one matched call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub method: String,
    pub url: String,
    pub host: String,
    pub path: String,
    pub params: Params,
    pub headers: HashMap<String, String>,
}

impl CallRecord {
    pub(crate) fn capture(request: &Request) -> Self {
        Self {
            method: request.method().as_str().to_ascii_lowercase(),
            url: request.url(),
            host: request.host().to_string(),
            path: request.path_with_query(),
            params: request.params().clone(),
            headers: request.headers().clone(),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

type ResponseFn = dyn Fn() -> Value + Send + Sync;

/// The body a fixture answers with.
#[derive(Clone)]
pub enum ResponseValue {
    Static(Value),
    /// Evaluated again for every matched call
    Dynamic(Arc<ResponseFn>),
}

impl ResponseValue {
    /// Produce an owned value for one call; callers never share it.
    pub fn resolve(&self) -> Value {
        match self {
            ResponseValue::Static(value) => value.clone(),
            ResponseValue::Dynamic(f) => f(),
        }
    }
}

impl Default for ResponseValue {
    fn default() -> Self {
        ResponseValue::Static(Value::Null)
    }
}

impl fmt::Debug for ResponseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            ResponseValue::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// What a matched fixture produced for one call.
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureOutcome {
    Success { data: Value },
    Failure { status: u16, body: Value },
}
