//! Errors raised synchronously while building a call.
//!
//! Anything that goes wrong after a request has been handed to a gateway travels
//! through the failure channel instead (see [`crate::gateway::GatewayError`]).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Missing value for path parameter '{param}' in '{path}'")]
    MissingParameter { param: String, path: String },
    #[error("Unknown resource '{0}'")]
    UnknownResource(String),
    #[error("Unknown method '{method}' on resource '{resource}'")]
    UnknownMethod { resource: String, method: String },
    #[error("Call parameters must be a JSON object or null, got {0}")]
    InvalidParams(String),
}
