//! Gantry: HTTP clients generated from a manifest.
//!
//! A manifest names a host, a set of resources with their methods, and rules that add
//! gateway configuration (headers, timeouts) to matching requests. Clients forged from it
//! either talk to the network through a [`Transport`](gateway::Transport) or, under test,
//! answer from a [`FixtureRegistry`](fixture::FixtureRegistry) that records every call.
//!
//! ```no_run
//! use gantry::{forge_with_fixtures, FixtureMatcher, FixtureRegistry, Manifest, Promise};
//! use http::Method;
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let manifest = Manifest::from_file("manifest.yml")?;
//! let fixtures = FixtureRegistry::new();
//! fixtures
//!     .define(Method::GET)
//!     .matching(FixtureMatcher::new().path("/v1/books.json"))
//!     .response(json!({"a": 1}));
//!
//! let client = forge_with_fixtures::<Promise>(manifest, fixtures);
//! let result = client.call("Book", "all", json!(null))?.await?;
//! assert_eq!(result.data, json!({"a": 1}));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod fixture;
pub mod gateway;
pub mod manifest;
pub mod request;
pub mod routes;
pub mod rules;

pub use client::{
    forge_with_fixtures, forge_with_transport, Callback, CallbackHandle, Client, ClientBuilder,
    DispatchMode, Promise, PromiseCall, PromiseFailure, Resource,
};
pub use error::ClientError;
pub use fixture::{
    CallRecord, Fixture, FixtureBuilder, FixtureMatcher, FixtureRegistry, TextMatcher,
};
pub use gateway::{
    Failure, FixtureGateway, Gateway, GatewayError, RequestMetadata, ReqwestTransport, Stats,
    Success, Transport, TransportError, TransportGateway, TransportResponse,
};
pub use manifest::{Manifest, ManifestError};
pub use request::{MethodDescriptor, Params, Request};
pub use rules::{GatewayConfig, Rule, RuleMatcher};
