//! FixtureRegistry - ownership and lifecycle of registered fixtures.
//!
//! Fixtures are kept in definition order. Lookups walk the list backwards, so the most
//! recently defined fixture that matches a request answers it.

use super::types::{
    CallRecord, FixtureMatcher, FixtureOutcome, ResponseValue, DEFAULT_FAILURE_STATUS,
};
use crate::request::Request;
use http::Method;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Stored state of one registered fixture
#[derive(Debug)]
struct FixtureEntry {
    id: u64,
    method: Method,
    matcher: FixtureMatcher,
    failure_status: Option<u16>,
    response: ResponseValue,
    calls: RwLock<Vec<CallRecord>>,
}

impl FixtureEntry {
    fn accepts(&self, request: &Request) -> bool {
        self.method
            .as_str()
            .eq_ignore_ascii_case(request.method().as_str())
            && self.matcher.matches(request)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    next_fixture_id: u64,
    fixtures: Vec<Arc<FixtureEntry>>,
}

/// Registry of fixtures shared by every fixture gateway built from it.
///
/// Cloning is cheap and yields a handle to the same registry. Nothing resets it
/// implicitly: call [`FixtureRegistry::clear`] between test cases.
#[derive(Debug, Clone, Default)]
pub struct FixtureRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start defining a fixture for `method`.
    pub fn define(&self, method: Method) -> FixtureBuilder {
        FixtureBuilder {
            registry: self.clone(),
            method,
            matcher: FixtureMatcher::default(),
            failure_status: None,
        }
    }

    /// Number of registered fixtures, across all methods.
    pub fn count(&self) -> usize {
        self.state.read().fixtures.len()
    }

    /// Remove every fixture. Always returns `true`.
    pub fn clear(&self) -> bool {
        let mut state = self.state.write();
        let removed = state.fixtures.len();
        state.fixtures.clear();
        debug!("Cleared all fixtures ({} removed)", removed);
        true
    }

    /// Remove every fixture registered for `method`.
    pub fn clear_method(&self, method: &Method) -> bool {
        let mut state = self.state.write();
        let before = state.fixtures.len();
        state
            .fixtures
            .retain(|entry| !entry.method.as_str().eq_ignore_ascii_case(method.as_str()));
        let removed = before - state.fixtures.len();
        debug!("Cleared {} fixture(s) for {}", removed, method);
        removed > 0
    }

    /// Remove the most recently defined fixture for `method` whose matcher equals `matcher`.
    pub fn clear_matching(&self, method: &Method, matcher: &FixtureMatcher) -> bool {
        let mut state = self.state.write();
        let position = state.fixtures.iter().rposition(|entry| {
            entry.method.as_str().eq_ignore_ascii_case(method.as_str()) && entry.matcher == *matcher
        });

        match position {
            Some(index) => {
                let entry = state.fixtures.remove(index);
                debug!("Cleared fixture id={} for {}", entry.id, method);
                true
            }
            None => false,
        }
    }

    fn register(&self, mut entry: FixtureEntry) -> Arc<FixtureEntry> {
        let mut state = self.state.write();
        entry.id = state.next_fixture_id;
        state.next_fixture_id += 1;

        debug!(
            "Adding fixture id={} for {} {:?}",
            entry.id, entry.method, entry.matcher
        );

        let entry = Arc::new(entry);
        state.fixtures.push(Arc::clone(&entry));
        entry
    }

    fn remove_entry(&self, id: u64) -> bool {
        let mut state = self.state.write();
        match state.fixtures.iter().position(|entry| entry.id == id) {
            Some(index) => {
                state.fixtures.remove(index);
                debug!("Removed fixture id={}", id);
                true
            }
            None => false,
        }
    }

    /// Find the fixture answering `request`, record the call on it and produce its outcome.
    ///
    /// Returns `None` when no fixture matches. The call is recorded before this returns,
    /// so history order is the order in which requests were dispatched.
    pub fn dispatch(&self, request: &Request) -> Option<FixtureOutcome> {
        let entry = {
            let state = self.state.read();
            let entry = state
                .fixtures
                .iter()
                .rev()
                .find(|entry| entry.accepts(request))
                .cloned()?;
            // Recorded under the state guard so a concurrent remove cannot slip in between.
            entry.calls.write().push(CallRecord::capture(request));
            entry
        };

        debug!(
            "Fixture id={} answered {} {}",
            entry.id,
            request.method(),
            request.url()
        );

        let value = entry.response.resolve();
        Some(match entry.failure_status {
            Some(status) => FixtureOutcome::Failure {
                status,
                body: value,
            },
            None => FixtureOutcome::Success { data: value },
        })
    }
}

/// Fixture definition in progress. Nothing is registered until [`FixtureBuilder::response`].
#[derive(Debug, Clone)]
#[must_use = "a fixture is only registered once `response` is called"]
pub struct FixtureBuilder {
    registry: FixtureRegistry,
    method: Method,
    matcher: FixtureMatcher,
    failure_status: Option<u16>,
}

impl FixtureBuilder {
    pub fn matching(self, matcher: FixtureMatcher) -> Self {
        Self { matcher, ..self }
    }

    /// Answer with a failure carrying the default status (400).
    pub fn failure(self) -> Self {
        self.failure_with_status(DEFAULT_FAILURE_STATUS)
    }

    pub fn failure_with_status(self, status: u16) -> Self {
        Self {
            failure_status: Some(status),
            ..self
        }
    }

    /// Register the fixture with a fixed response body.
    pub fn response(self, value: impl Into<Value>) -> Fixture {
        self.finish(ResponseValue::Static(value.into()))
    }

    /// Register the fixture with a body computed on every matched call.
    pub fn response_with<F>(self, f: F) -> Fixture
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.finish(ResponseValue::Dynamic(Arc::new(f)))
    }

    fn finish(self, response: ResponseValue) -> Fixture {
        let entry = self.registry.register(FixtureEntry {
            id: 0,
            method: self.method,
            matcher: self.matcher,
            failure_status: self.failure_status,
            response,
            calls: RwLock::new(Vec::new()),
        });

        Fixture {
            entry,
            registry: self.registry,
        }
    }
}

/// Handle to a registered fixture, used to inspect its calls or remove it.
#[derive(Debug, Clone)]
pub struct Fixture {
    entry: Arc<FixtureEntry>,
    registry: FixtureRegistry,
}

impl Fixture {
    pub fn id(&self) -> u64 {
        self.entry.id
    }

    pub fn method(&self) -> &Method {
        &self.entry.method
    }

    pub fn matcher(&self) -> &FixtureMatcher {
        &self.entry.matcher
    }

    /// Status this fixture fails with, if it was defined with `.failure()`.
    pub fn failure_status(&self) -> Option<u16> {
        self.entry.failure_status
    }

    /// Remove this fixture from its registry. Returns `false` if it was already gone.
    pub fn remove(&self) -> bool {
        self.registry.remove_entry(self.entry.id)
    }

    /// All matched calls, oldest first.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.entry.calls.read().clone()
    }

    pub fn first_call(&self) -> Option<CallRecord> {
        self.entry.calls.read().first().cloned()
    }

    pub fn most_recent_call(&self) -> Option<CallRecord> {
        self.entry.calls.read().last().cloned()
    }

    pub fn calls_count(&self) -> usize {
        self.entry.calls.read().len()
    }
}
