use super::{Failure, Gateway, GatewayError, GatewayFuture, Stats, Success};
use crate::fixture::{FixtureOutcome, FixtureRegistry};
use crate::request::Request;
use futures::FutureExt;
use tracing::warn;

/// Gateway answering every call from a fixture registry.
///
/// Matching and history recording happen inside [`Gateway::call`]; the returned future only
/// yields once before delivering, like a network round trip would.
#[derive(Debug, Clone)]
pub struct FixtureGateway {
    registry: FixtureRegistry,
}

impl FixtureGateway {
    pub fn new(registry: FixtureRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FixtureRegistry {
        &self.registry
    }

    fn resolve(&self, request: &Request) -> Result<Success, Failure> {
        match self.registry.dispatch(request) {
            Some(FixtureOutcome::Success { data }) => Ok(Success {
                data,
                stats: Stats {
                    status: 200,
                    headers: request.headers().clone(),
                },
            }),
            Some(FixtureOutcome::Failure { status, body }) => Err(Failure::new(
                request,
                GatewayError::Simulated { status, body },
            )),
            None => {
                warn!(
                    "No fixture matches {} {}",
                    request.method(),
                    request.url()
                );
                Err(Failure::new(
                    request,
                    GatewayError::UnmatchedFixture {
                        method: request.method().as_str().to_ascii_lowercase(),
                        url: request.url(),
                    },
                ))
            }
        }
    }
}

impl Gateway for FixtureGateway {
    fn call(&self, request: Request) -> GatewayFuture {
        let result = self.resolve(&request);
        async move {
            tokio::task::yield_now().await;
            result
        }
        .boxed()
    }
}
