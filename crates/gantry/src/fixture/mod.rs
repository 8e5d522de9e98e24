//! Deterministic fixtures for clients under test.
//!
//! This module provides:
//! - `FixtureRegistry`: the explicitly owned, explicitly reset list of fixtures
//! - `FixtureBuilder` / `Fixture`: definition and per-fixture call history
//! - `FixtureMatcher`: what a request must look like for a fixture to answer it
//!
//! ## Module Structure
//!
//! - `types`: matchers, call records and response values
//! - `registry`: registry, builder and fixture handles
//! - `file`: fixture definitions loaded from YAML/JSON files

mod file;
mod registry;
mod types;


pub use file::{
    load_fixtures, parse_fixtures, FailureSpec, FixtureMatcherSpec, FixtureSpec, TextMatcherSpec,
};
pub use registry::{Fixture, FixtureBuilder, FixtureRegistry};
pub use types::{
    CallRecord, FixtureMatcher, FixtureOutcome, ResponseValue, TextMatcher,
    DEFAULT_FAILURE_STATUS,
};
