//! Manifest rules: URL-matched augmentation of the gateway configuration.
//!
//! Every rule whose matcher accepts the request URL contributes its `values.gateway` block.
//! Rules are applied in declaration order with a shallow merge, so a later rule overrides
//! an earlier one header by header and option by option.

use crate::request::{GatewayOptions, Request};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The parts of a request a rule predicate can look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleTarget<'a> {
    pub host: &'a str,
    pub url: &'a str,
    pub path: &'a str,
}

type RulePredicate = dyn Fn(&RuleTarget<'_>) -> bool + Send + Sync;

/// How a rule decides whether it applies.
///
/// Manifest files always produce [`RuleMatcher::Pattern`]; the other variants are for rules
/// declared in code.
#[derive(Clone)]
pub enum RuleMatcher {
    /// URL must equal the string
    Exact(String),
    /// Regex searched in the URL
    Pattern(Arc<Regex>),
    Predicate(Arc<RulePredicate>),
}

impl RuleMatcher {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(RuleMatcher::Pattern(Arc::new(Regex::new(pattern)?)))
    }

    pub fn exact(url: impl Into<String>) -> Self {
        RuleMatcher::Exact(url.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&RuleTarget<'_>) -> bool + Send + Sync + 'static,
    {
        RuleMatcher::Predicate(Arc::new(f))
    }

    pub fn matches(&self, target: &RuleTarget<'_>) -> bool {
        match self {
            RuleMatcher::Exact(url) => target.url == url,
            RuleMatcher::Pattern(regex) => regex.is_match(target.url),
            RuleMatcher::Predicate(f) => f(target),
        }
    }
}

impl fmt::Debug for RuleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleMatcher::Exact(url) => f.debug_tuple("Exact").field(url).finish(),
            RuleMatcher::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            RuleMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for RuleMatcher {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let pattern = String::deserialize(deserializer)?;
        RuleMatcher::pattern(&pattern)
            .map_err(|e| D::Error::custom(format!("invalid rule pattern '{pattern}': {e}")))
    }
}

/// Gateway configuration contributed by a rule.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Any other gateway option, e.g. `timeout_ms`
    #[serde(flatten)]
    pub options: GatewayOptions,
}

impl GatewayConfig {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    fn merge_into(&self, request: &mut Request) {
        let headers = request.headers_mut();
        for (name, value) in &self.headers {
            // Header names are case-insensitive; the latest spelling replaces any earlier one.
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }
        for (name, value) in &self.options {
            request.options_mut().insert(name.clone(), value.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RuleValues {
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    #[serde(rename = "match")]
    pub matcher: RuleMatcher,
    #[serde(default)]
    pub values: RuleValues,
}

impl Rule {
    pub fn new(matcher: RuleMatcher, gateway: GatewayConfig) -> Self {
        Self {
            matcher,
            values: RuleValues { gateway },
        }
    }
}

/// Apply every matching rule to the request, in declaration order.
pub fn apply_rules(mut request: Request, rules: &[Rule]) -> Request {
    if rules.is_empty() {
        return request;
    }

    let url = request.url();
    let path = request.path_with_query();
    let host = request.host().to_string();
    let target = RuleTarget {
        host: &host,
        url: &url,
        path: &path,
    };

    for (index, rule) in rules.iter().enumerate() {
        if !rule.matcher.matches(&target) {
            continue;
        }
        debug!("Rule #{} ({:?}) matched {}", index, rule.matcher, url);
        rule.values.gateway.merge_into(&mut request);
    }

    request
}
