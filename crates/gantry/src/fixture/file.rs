//! Fixture files: YAML/JSON lists of fixture definitions loaded into a registry.
//!
//! ```yaml
//! - method: get
//!   matching:
//!     path: { matches: 'v1/books\.json' }
//!     params: { sort: asc }
//!   response: { a: 1 }
//! - method: post
//!   matching:
//!     path: /v1/books.json
//!   failure: { status: 503 }
//!   response: unavailable
//! ```

use super::registry::{Fixture, FixtureRegistry};
use super::types::{FixtureMatcher, TextMatcher};
use crate::request::{parse_method, Params};
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// A text matcher as written in a fixture file.
///
/// A bare string is an exact match.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextMatcherSpec {
    Plain(String),
    Equals { equals: String },
    Matches { matches: String },
}

impl TryFrom<TextMatcherSpec> for TextMatcher {
    type Error = regex::Error;

    fn try_from(spec: TextMatcherSpec) -> Result<Self, Self::Error> {
        match spec {
            TextMatcherSpec::Plain(value) | TextMatcherSpec::Equals { equals: value } => {
                Ok(TextMatcher::Exact(value))
            }
            TextMatcherSpec::Matches { matches } => TextMatcher::pattern(&matches),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureMatcherSpec {
    #[serde(default)]
    pub url: Option<TextMatcherSpec>,
    #[serde(default)]
    pub host: Option<TextMatcherSpec>,
    #[serde(default)]
    pub path: Option<TextMatcherSpec>,
    #[serde(default)]
    pub params: Option<Params>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl FixtureMatcherSpec {
    pub fn compile(self) -> Result<FixtureMatcher, regex::Error> {
        Ok(FixtureMatcher {
            url: self.url.map(TextMatcher::try_from).transpose()?,
            host: self.host.map(TextMatcher::try_from).transpose()?,
            path: self.path.map(TextMatcher::try_from).transpose()?,
            params: self.params,
            headers: self.headers,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FailureSpec {
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSpec {
    pub method: String,
    #[serde(default)]
    pub matching: FixtureMatcherSpec,
    #[serde(default)]
    pub failure: Option<FailureSpec>,
    #[serde(default)]
    pub response: Value,
}

impl FixtureSpec {
    /// Define this fixture on `registry`.
    pub fn register(self, registry: &FixtureRegistry) -> anyhow::Result<Fixture> {
        let method = parse_method(&self.method)
            .with_context(|| format!("invalid fixture method '{}'", self.method))?;
        let matcher = self
            .matching
            .compile()
            .context("invalid fixture matcher pattern")?;

        let mut builder = registry.define(method).matching(matcher);
        if let Some(failure) = self.failure {
            builder = match failure.status {
                Some(status) => builder.failure_with_status(status),
                None => builder.failure(),
            };
        }
        Ok(builder.response(self.response))
    }
}

/// Parse fixture definitions from YAML (or JSON) text.
pub fn parse_fixtures(contents: &str) -> anyhow::Result<Vec<FixtureSpec>> {
    serde_yaml::from_str(contents).context("failed to parse fixture definitions")
}

/// Load a fixture file into `registry`, in file order.
pub fn load_fixtures<P: AsRef<Path>>(
    path: P,
    registry: &FixtureRegistry,
) -> anyhow::Result<Vec<Fixture>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture file {}", path.display()))?;

    let fixtures = parse_fixtures(&contents)?
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            spec.register(registry)
                .with_context(|| format!("fixture #{index} in {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    tracing::info!(
        "Loaded {} fixture(s) from {}",
        fixtures.len(),
        path.display()
    );
    Ok(fixtures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::io::Write;

    const FIXTURES: &str = r#"
- method: get
  matching:
    path: { matches: 'v1/books\.json' }
  response: { a: 1 }
- method: POST
  matching:
    path: /v1/books.json
    headers: { Authorization: token }
  failure: {}
  response: nope
- method: delete
  failure: { status: 503 }
"#;

    #[test]
    fn test_parse_fixture_specs() {
        let specs = parse_fixtures(FIXTURES).unwrap();
        assert_eq!(specs.len(), 3);
        assert!(matches!(
            specs[0].matching.path,
            Some(TextMatcherSpec::Matches { .. })
        ));
        assert!(matches!(
            specs[1].matching.path,
            Some(TextMatcherSpec::Plain(_))
        ));
        assert_eq!(specs[2].response, Value::Null);
    }

    #[test]
    fn test_load_fixtures_registers_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURES.as_bytes()).unwrap();

        let registry = FixtureRegistry::new();
        let fixtures = load_fixtures(file.path(), &registry).unwrap();

        assert_eq!(registry.count(), 3);
        assert_eq!(fixtures[0].method(), &Method::GET);
        assert_eq!(fixtures[0].failure_status(), None);
        assert_eq!(fixtures[1].method(), &Method::POST);
        assert_eq!(fixtures[1].failure_status(), Some(400));
        assert_eq!(fixtures[2].failure_status(), Some(503));
        assert_eq!(
            fixtures[0].matcher().path,
            Some(TextMatcher::pattern(r"v1/books\.json").unwrap())
        );
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let registry = FixtureRegistry::new();
        let specs = parse_fixtures("- method: get\n  matching:\n    url: { matches: '(' }\n").unwrap();
        let result = specs.into_iter().next().unwrap().register(&registry);
        assert!(result.is_err());
        assert_eq!(registry.count(), 0);
    }
}
