//! Gateways: the boundary every client call crosses.
//!
//! A [`Gateway`] turns a fully resolved [`Request`] into a future of either a [`Success`] or a
//! [`Failure`]. Two implementations ship with the crate:
//!
//! - [`FixtureGateway`] answers from a [`FixtureRegistry`](crate::fixture::FixtureRegistry)
//!   without touching the network
//! - [`TransportGateway`] hands the request to a [`Transport`], by default [`ReqwestTransport`]

mod fixture;
mod transport;

use crate::request::Request;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

pub use fixture::FixtureGateway;
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportGateway, TransportResponse,
    TIMEOUT_OPTION,
};

/// Future returned by [`Gateway::call`].
pub type GatewayFuture = BoxFuture<'static, Result<Success, Failure>>;

static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub status: u16,
    pub headers: HashMap<String, String>,
}

/// A successful call: the decoded body plus response statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Success {
    pub data: Value,
    pub stats: Stats,
}

/// What a failure handler learns about the request that failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestMetadata {
    /// HTTP status of the failure, 0 when no response was received
    pub status: u16,
    pub method: String,
    pub url: String,
    pub host: String,
    pub path: String,
    pub headers: HashMap<String, String>,
}

impl RequestMetadata {
    pub fn new(request: &Request, status: u16) -> Self {
        Self {
            status,
            method: request.method().as_str().to_ascii_lowercase(),
            url: request.url(),
            host: request.host().to_string(),
            path: request.path_with_query(),
            headers: request.headers().clone(),
        }
    }
}

/// Reasons a call ends up on the failure channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("No fixture matches {method} {url}")]
    UnmatchedFixture { method: String, url: String },

    #[error("Simulated failure with status {status}")]
    Simulated { status: u16, body: Value },

    #[error("Request failed (status {status}): {message}")]
    Transport {
        status: u16,
        body: Value,
        message: String,
    },
}

impl GatewayError {
    /// Status reported to failure handlers; 0 when there was no HTTP response.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::UnmatchedFixture { .. } => 0,
            GatewayError::Simulated { status, .. } | GatewayError::Transport { status, .. } => {
                *status
            }
        }
    }

    pub fn body(&self) -> &Value {
        match self {
            GatewayError::UnmatchedFixture { .. } => &NULL,
            GatewayError::Simulated { body, .. } | GatewayError::Transport { body, .. } => body,
        }
    }
}

/// A failed call, as delivered on the failure channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub request: RequestMetadata,
    pub error: GatewayError,
}

impl Failure {
    pub fn new(request: &Request, error: GatewayError) -> Self {
        Self {
            request: RequestMetadata::new(request, error.status()),
            error,
        }
    }
}

/// Something that can carry a request to an answer.
///
/// Implementations must do any bookkeeping tied to call order before returning the future;
/// only delivery of the result is deferred.
pub trait Gateway: Send + Sync {
    fn call(&self, request: Request) -> GatewayFuture;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{build_request, MethodDescriptor, Params};
    use http::Method;
    use serde_json::json;

    #[test]
    fn test_error_status_and_body() {
        let unmatched = GatewayError::UnmatchedFixture {
            method: "get".into(),
            url: "http://h/x".into(),
        };
        assert_eq!(unmatched.status(), 0);
        assert_eq!(unmatched.body(), &Value::Null);

        let simulated = GatewayError::Simulated {
            status: 503,
            body: json!("error"),
        };
        assert_eq!(simulated.status(), 503);
        assert_eq!(simulated.body(), &json!("error"));
        assert_eq!(simulated.to_string(), "Simulated failure with status 503");
    }

    #[test]
    fn test_failure_carries_request_metadata() {
        let descriptor = MethodDescriptor::new("byId", Method::PUT, "/v1/books/{id}.json");
        let mut params = Params::new();
        params.insert("id".into(), json!(7));
        params.insert("x".into(), json!("y"));
        let request = build_request(&descriptor, "http://full-url", params).unwrap();

        let failure = Failure::new(
            &request,
            GatewayError::Simulated {
                status: 400,
                body: json!("bad"),
            },
        );

        assert_eq!(failure.request.status, 400);
        assert_eq!(failure.request.method, "put");
        assert_eq!(failure.request.path, "/v1/books/7.json?x=y");
        assert_eq!(failure.request.url, "http://full-url/v1/books/7.json?x=y");
    }
}
