use super::{Failure, Gateway, GatewayError, GatewayFuture, Stats, Success};
use crate::request::Request;
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Gateway option (usually contributed by a rule) holding a per-request timeout.
pub const TIMEOUT_OPTION: &str = "timeout_ms";

/// Errors raised below HTTP, before any status is known
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Raw answer from a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    fn is_json(&self) -> bool {
        self.headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("content-type") && v.contains("json"))
    }

    /// Body decoded as JSON when the content type says so, otherwise kept as a string.
    pub fn decoded_body(&self) -> Value {
        if self.is_json() && !self.body.is_empty() {
            match serde_json::from_str(&self.body) {
                Ok(value) => return value,
                Err(e) => warn!("Response declared JSON but failed to parse: {}", e),
            }
        }
        Value::String(self.body.clone())
    }
}

/// The single async contract a real network layer has to fulfil.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: &Request) -> Result<TransportResponse, TransportError>;
}

/// Gateway delegating to a [`Transport`]; non-2xx responses go to the failure channel.
#[derive(Debug)]
pub struct TransportGateway<T> {
    transport: Arc<T>,
}

impl<T: Transport> TransportGateway<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }
}

impl<T> Clone for TransportGateway<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> Gateway for TransportGateway<T> {
    fn call(&self, request: Request) -> GatewayFuture {
        let transport = Arc::clone(&self.transport);
        async move {
            let response = match transport.send(&request).await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Transport error for {}: {}", request.url(), e);
                    return Err(Failure::new(
                        &request,
                        GatewayError::Transport {
                            status: 0,
                            body: Value::Null,
                            message: e.to_string(),
                        },
                    ));
                }
            };

            let data = response.decoded_body();
            if (200..300).contains(&response.status) {
                Ok(Success {
                    data,
                    stats: Stats {
                        status: response.status,
                        headers: response.headers,
                    },
                })
            } else {
                Err(Failure::new(
                    &request,
                    GatewayError::Transport {
                        status: response.status,
                        body: data,
                        message: format!("server answered {}", response.status),
                    },
                ))
            }
        }
        .boxed()
    }
}

/// Default [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn prepare(&self, request: &Request) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(request.method().clone(), request.url());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ms) = request
            .options()
            .get(TIMEOUT_OPTION)
            .and_then(Value::as_u64)
            .filter(|ms| *ms > 0)
        {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        builder
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<TransportResponse, TransportError> {
        debug!("{} {}", request.method(), request.url());

        let response = self.prepare(request).send().await.map_err(|e| {
            if e.is_connect() {
                TransportError::Connection(format!("Cannot connect to {}", request.host()))
            } else {
                TransportError::Request(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
