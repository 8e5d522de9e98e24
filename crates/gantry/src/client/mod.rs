//! Clients forged from a manifest.
//!
//! A [`Client`] resolves `Resource.method` against its manifest, builds the request, applies
//! the manifest rules and hands the result to its gateway. The dispatch mode `M` decides what
//! the caller gets back.

mod dispatch;

use crate::error::ClientError;
use crate::fixture::FixtureRegistry;
use crate::gateway::{FixtureGateway, Gateway, ReqwestTransport, Transport, TransportGateway};
use crate::manifest::{Manifest, ResourceMethods};
use crate::request::{build_request, Params, Request};
use crate::rules::apply_rules;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

pub use dispatch::{
    Callback, CallbackHandle, DispatchMode, Promise, PromiseCall, PromiseFailure,
};

pub struct Client<M: DispatchMode = Promise> {
    manifest: Arc<Manifest>,
    gateway: Arc<dyn Gateway>,
    _mode: PhantomData<M>,
}

impl<M: DispatchMode> Clone for Client<M> {
    fn clone(&self) -> Self {
        Self {
            manifest: Arc::clone(&self.manifest),
            gateway: Arc::clone(&self.gateway),
            _mode: PhantomData,
        }
    }
}

impl<M: DispatchMode> fmt::Debug for Client<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.manifest.host())
            .field("resources", &self.manifest.resources().keys().collect::<Vec<_>>())
            .field("mode", &std::any::type_name::<M>())
            .finish()
    }
}

impl Client<Promise> {
    pub fn builder(manifest: Manifest) -> ClientBuilder {
        ClientBuilder::new(manifest)
    }
}

impl<M: DispatchMode> Client<M> {
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Names of all resources, sorted.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.manifest.resources().keys().map(String::as_str)
    }

    pub fn resource<'a>(&'a self, name: &'a str) -> Result<Resource<'a, M>, ClientError> {
        let methods = self
            .manifest
            .resources()
            .get(name)
            .ok_or_else(|| ClientError::UnknownResource(name.to_string()))?;
        Ok(Resource {
            client: self,
            name,
            methods,
        })
    }

    /// Invoke `resource.method` with call parameters (a JSON object, or `null` for none).
    ///
    /// Lookup and request building fail synchronously; everything after that goes through
    /// the dispatch mode.
    pub fn call(&self, resource: &str, method: &str, params: Value) -> Result<M::Call, ClientError> {
        self.resource(resource)?.call(method, params)
    }

    /// Build the request `resource.method` would send, with rules applied, without sending it.
    pub fn prepare(&self, resource: &str, method: &str, params: Value) -> Result<Request, ClientError> {
        self.resource(resource)?.prepare(method, params)
    }
}

/// One resource of a client; methods are called by name.
pub struct Resource<'a, M: DispatchMode> {
    client: &'a Client<M>,
    name: &'a str,
    methods: &'a ResourceMethods,
}

impl<'a, M: DispatchMode> Resource<'a, M> {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn prepare(&self, method: &str, params: Value) -> Result<Request, ClientError> {
        let descriptor = self
            .methods
            .get(method)
            .ok_or_else(|| ClientError::UnknownMethod {
                resource: self.name.to_string(),
                method: method.to_string(),
            })?;

        let params = into_params(params)?;
        let manifest = &self.client.manifest;
        let request = build_request(descriptor, manifest.host(), params)?;
        Ok(apply_rules(request, manifest.rules()))
    }

    pub fn call(&self, method: &str, params: Value) -> Result<M::Call, ClientError> {
        let request = self.prepare(method, params)?;
        debug!(
            "{}.{} -> {} {}",
            self.name,
            method,
            request.method(),
            request.url()
        );
        Ok(M::wrap(self.client.gateway.call(request)))
    }
}

fn into_params(params: Value) -> Result<Params, ClientError> {
    match params {
        Value::Null => Ok(Params::new()),
        Value::Object(map) => Ok(map),
        other => Err(ClientError::InvalidParams(other.to_string())),
    }
}

/// Assembles a [`Client`]. Without an explicit gateway the client talks to the network
/// through [`ReqwestTransport`].
pub struct ClientBuilder {
    manifest: Manifest,
    gateway: Option<Arc<dyn Gateway>>,
}

impl ClientBuilder {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            gateway: None,
        }
    }

    pub fn gateway<G: Gateway + 'static>(mut self, gateway: G) -> Self {
        self.gateway = Some(Arc::new(gateway));
        self
    }

    /// Answer every call from `registry`.
    pub fn fixtures(self, registry: FixtureRegistry) -> Self {
        self.gateway(FixtureGateway::new(registry))
    }

    pub fn transport<T: Transport>(self, transport: T) -> Self {
        self.gateway(TransportGateway::new(transport))
    }

    pub fn build<M: DispatchMode>(self) -> Client<M> {
        let gateway = self
            .gateway
            .unwrap_or_else(|| Arc::new(TransportGateway::new(ReqwestTransport::new())));
        Client {
            manifest: Arc::new(self.manifest),
            gateway,
            _mode: PhantomData,
        }
    }
}

/// Client answering from a fixture registry.
pub fn forge_with_fixtures<M: DispatchMode>(
    manifest: Manifest,
    registry: FixtureRegistry,
) -> Client<M> {
    Client::builder(manifest).fixtures(registry).build()
}

pub fn forge_with_transport<M: DispatchMode, T: Transport>(
    manifest: Manifest,
    transport: T,
) -> Client<M> {
    Client::builder(manifest).transport(transport).build()
}
