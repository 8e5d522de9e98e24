//! Dispatch modes: how a client hands results back to its caller.
//!
//! The mode is fixed when the client is built. [`Promise`] returns a future resolving to a
//! `Result`; [`Callback`] returns a handle on which success and failure handlers are registered.

use crate::gateway::{Failure, GatewayError, GatewayFuture, RequestMetadata, Success};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::{debug, warn};

/// Shapes the result of a gateway call for the caller.
pub trait DispatchMode: Send + Sync + 'static {
    type Call;

    fn wrap(call: GatewayFuture) -> Self::Call;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Promise;

#[derive(Debug, Clone, Copy, Default)]
pub struct Callback;

impl DispatchMode for Promise {
    type Call = PromiseCall;

    fn wrap(call: GatewayFuture) -> Self::Call {
        PromiseCall { inner: call }
    }
}

impl DispatchMode for Callback {
    type Call = CallbackHandle;

    fn wrap(call: GatewayFuture) -> Self::Call {
        CallbackHandle::new(call)
    }
}

/// Rejection delivered by a [`PromiseCall`].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} {} failed: {cause}", .request.method, .request.url)]
pub struct PromiseFailure {
    /// Failure body, wrapped in a one-element list
    pub err: Vec<Value>,
    pub request: RequestMetadata,
    #[source]
    pub cause: GatewayError,
}

impl From<Failure> for PromiseFailure {
    fn from(failure: Failure) -> Self {
        Self {
            err: vec![failure.error.body().clone()],
            request: failure.request,
            cause: failure.error,
        }
    }
}

/// Future returned by a promise-mode client.
#[must_use = "futures do nothing unless awaited"]
pub struct PromiseCall {
    inner: GatewayFuture,
}

impl Future for PromiseCall {
    type Output = Result<Success, PromiseFailure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner
            .poll_unpin(cx)
            .map(|result| result.map_err(PromiseFailure::from))
    }
}

type DoneHandler = Box<dyn FnOnce(&Success) + Send>;
type FailHandler = Box<dyn FnOnce(&RequestMetadata, &Value) + Send>;

/// Handle returned by a callback-mode client.
///
/// Register handlers with [`CallbackHandle::done`] and [`CallbackHandle::fail`], then await the
/// handle (or [`spawn`](CallbackHandle::spawn) it). Exactly one handler runs per call. A handle
/// dropped without being awaited is delivered on the current tokio runtime.
pub struct CallbackHandle {
    delivery: Option<Delivery>,
}

struct Delivery {
    call: GatewayFuture,
    on_done: Option<DoneHandler>,
    on_fail: Option<FailHandler>,
}

impl Delivery {
    async fn run(self) -> Result<Success, Failure> {
        let result = self.call.await;
        match &result {
            Ok(success) => {
                if let Some(done) = self.on_done {
                    done(success);
                }
            }
            Err(failure) => match self.on_fail {
                Some(fail) => fail(&failure.request, failure.error.body()),
                None => warn!("Unhandled failure for {}: {}", failure.request.url, failure.error),
            },
        }
        result
    }
}

impl CallbackHandle {
    fn new(call: GatewayFuture) -> Self {
        Self {
            delivery: Some(Delivery {
                call,
                on_done: None,
                on_fail: None,
            }),
        }
    }

    pub fn done<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Success) + Send + 'static,
    {
        if let Some(delivery) = self.delivery.as_mut() {
            delivery.on_done = Some(Box::new(f));
        }
        self
    }

    /// Register the failure handler, called with the request metadata and the failure body.
    pub fn fail<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&RequestMetadata, &Value) + Send + 'static,
    {
        if let Some(delivery) = self.delivery.as_mut() {
            delivery.on_fail = Some(Box::new(f));
        }
        self
    }

    /// Deliver the call on the tokio runtime without waiting for it.
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<Success, Failure>> {
        tokio::spawn(self.into_future())
    }
}

impl IntoFuture for CallbackHandle {
    type Output = Result<Success, Failure>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(mut self) -> Self::IntoFuture {
        // Only `into_future` and `drop` take the delivery, and both consume the handle.
        match self.delivery.take() {
            Some(delivery) => delivery.run().boxed(),
            None => unreachable!("callback handle delivered twice"),
        }
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        let Some(delivery) = self.delivery.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!("Callback handle dropped before delivery, spawning it");
                runtime.spawn(delivery.run());
            }
            Err(_) => warn!("Callback handle dropped outside a tokio runtime, handlers will not run"),
        }
    }
}
