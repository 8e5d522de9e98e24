//! Request model: method descriptors and the requests derived from them.
//!
//! A [`MethodDescriptor`] is the immutable template generated once per manifest method.
//! [`build_request`] combines it with call-time parameters: `{name}` placeholders in the
//! path are consumed from the parameters, and whatever is left over becomes the query string,
//! in the order the caller supplied it.

mod query;

use crate::error::ClientError;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub use query::{scalar_text, to_query_string};

/// Call parameters, kept in insertion order.
pub type Params = serde_json::Map<String, Value>;

/// Gateway options contributed by rules (everything except headers).
pub type GatewayOptions = serde_json::Map<String, Value>;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"));

/// Parse an HTTP verb as written in manifests and fixture files ("get", "Post", ...).
pub fn parse_method(verb: &str) -> Result<Method, http::method::InvalidMethod> {
    Method::from_bytes(verb.trim().to_ascii_uppercase().as_bytes())
}

/// Immutable template for one client method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub method: Method,
    pub path: String,
    /// Overrides the manifest host for this method only
    pub host: Option<String>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            host: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Names of the `{placeholders}` in the path template, in order of appearance.
    pub fn placeholders(&self) -> Vec<String> {
        PLACEHOLDER
            .captures_iter(&self.path)
            .map(|caps| caps[1].to_string())
            .collect()
    }
}

/// One outgoing call, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    host: String,
    path: String,
    params: Params,
    headers: HashMap<String, String>,
    options: GatewayOptions,
}

impl Request {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Resolved path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parameters left over after placeholder resolution; these form the query string.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    pub(crate) fn options_mut(&mut self) -> &mut GatewayOptions {
        &mut self.options
    }

    pub fn query_string(&self) -> String {
        to_query_string(&self.params)
    }

    /// Path plus `?query` when residual params exist.
    pub fn path_with_query(&self) -> String {
        let query = self.query_string();
        if query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, query)
        }
    }

    /// Full URL: host joined with [`Request::path_with_query`].
    pub fn url(&self) -> String {
        join_url(&self.host, &self.path_with_query())
    }
}

pub(crate) fn join_url(host: &str, path: &str) -> String {
    if path.is_empty() {
        return host.to_string();
    }
    let host = host.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{host}{path}")
    } else {
        format!("{host}/{path}")
    }
}

/// Build a request from a descriptor and call-time parameters.
///
/// `default_host` is used unless the descriptor carries its own host. A placeholder
/// whose parameter is absent or `null` fails with [`ClientError::MissingParameter`].
pub fn build_request(
    descriptor: &MethodDescriptor,
    default_host: &str,
    params: Params,
) -> Result<Request, ClientError> {
    let template = descriptor.path.as_str();
    let mut path = String::with_capacity(template.len());
    let mut consumed = HashSet::new();
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];
        let value = params
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ClientError::MissingParameter {
                param: name.to_string(),
                path: template.to_string(),
            })?;

        path.push_str(&template[last..whole.start()]);
        path.push_str(&urlencoding::encode(&scalar_text(value)));
        last = whole.end();
        consumed.insert(name.to_string());
    }
    path.push_str(&template[last..]);

    let residual: Params = params
        .into_iter()
        .filter(|(key, _)| !consumed.contains(key))
        .collect();

    Ok(Request {
        method: descriptor.method.clone(),
        host: descriptor
            .host
            .clone()
            .unwrap_or_else(|| default_host.to_string()),
        path,
        params: residual,
        headers: HashMap::new(),
        options: GatewayOptions::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    fn books_by_id() -> MethodDescriptor {
        MethodDescriptor::new("byId", Method::GET, "/v1/books/{id}.json")
    }

    #[test]
    fn test_parse_method_is_case_insensitive() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method("Patch").unwrap(), Method::PATCH);
        assert_eq!(parse_method(" delete ").unwrap(), Method::DELETE);
    }

    #[test]
    fn test_placeholder_consumed_from_params() {
        let request = build_request(
            &books_by_id(),
            "http://full-url",
            params(json!({"id": 3, "sort": "asc"})),
        )
        .unwrap();

        assert_eq!(request.path(), "/v1/books/3.json");
        assert_eq!(request.params(), &params(json!({"sort": "asc"})));
        assert_eq!(request.url(), "http://full-url/v1/books/3.json?sort=asc");
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_missing_placeholder_fails() {
        let err = build_request(&books_by_id(), "http://full-url", Params::new()).unwrap_err();
        assert_eq!(
            err,
            ClientError::MissingParameter {
                param: "id".to_string(),
                path: "/v1/books/{id}.json".to_string(),
            }
        );
    }

    #[test]
    fn test_null_placeholder_is_missing() {
        let result = build_request(
            &books_by_id(),
            "http://full-url",
            params(json!({"id": null})),
        );
        assert!(matches!(result, Err(ClientError::MissingParameter { .. })));
    }

    #[test]
    fn test_placeholder_value_is_percent_encoded() {
        let request = build_request(
            &books_by_id(),
            "http://full-url",
            params(json!({"id": "a b/c"})),
        )
        .unwrap();
        assert_eq!(request.path(), "/v1/books/a%20b%2Fc.json");
    }

    #[test]
    fn test_query_keeps_insertion_order() {
        let descriptor = MethodDescriptor::new("all", Method::GET, "/v1/books.json");
        let request = build_request(
            &descriptor,
            "http://full-url",
            params(json!({"zeta": 1, "alpha": true, "mid": "x"})),
        )
        .unwrap();

        assert_eq!(request.query_string(), "zeta=1&alpha=true&mid=x");
        assert_eq!(request.path_with_query(), "/v1/books.json?zeta=1&alpha=true&mid=x");
    }

    #[test]
    fn test_descriptor_host_overrides_manifest_host() {
        let descriptor =
            MethodDescriptor::new("all", Method::GET, "/books").with_host("http://other/");
        let request = build_request(&descriptor, "http://full-url", Params::new()).unwrap();
        assert_eq!(request.host(), "http://other/");
        assert_eq!(request.url(), "http://other/books");
    }

    #[test]
    fn test_relative_path_joined_with_slash() {
        let descriptor = MethodDescriptor::new("test", Method::POST, "test.json");
        let request = build_request(&descriptor, "http://full-url", Params::new()).unwrap();
        assert_eq!(request.path(), "test.json");
        assert_eq!(request.url(), "http://full-url/test.json");
    }

    #[test]
    fn test_placeholders_listed_in_order() {
        let descriptor = MethodDescriptor::new("x", Method::GET, "/{a}/items/{b}");
        assert_eq!(descriptor.placeholders(), vec!["a", "b"]);
    }

    proptest! {
        #[test]
        fn prop_consumed_params_never_reach_query(
            id in "[a-z0-9]{1,8}",
            extra in proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..5),
        ) {
            let mut call = Params::new();
            call.insert("id".to_string(), Value::String(id.clone()));
            for (key, value) in &extra {
                if key != "id" {
                    call.insert(key.clone(), Value::String(value.clone()));
                }
            }

            let request = build_request(&books_by_id(), "http://h", call).unwrap();

            prop_assert!(!request.params().contains_key("id"));
            prop_assert!(!request.query_string().split('&').any(|pair| pair.starts_with("id=")));
            let expected_path = format!("/v1/books/{id}.json");
            prop_assert_eq!(request.path(), expected_path.as_str());
        }
    }
}
