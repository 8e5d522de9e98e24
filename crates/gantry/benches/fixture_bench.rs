use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gantry::request::{build_request, MethodDescriptor, Params};
use gantry::rules::apply_rules;
use gantry::{FixtureMatcher, FixtureRegistry, GatewayConfig, Request, Rule, RuleMatcher};
use http::Method;
use serde_json::json;

fn request_for(index: usize) -> Request {
    let descriptor = MethodDescriptor::new("get", Method::GET, "/v1/endpoint{id}.json");
    let mut params = Params::new();
    params.insert("id".to_string(), json!(index));
    params.insert("sort".to_string(), json!("asc"));
    build_request(&descriptor, "http://localhost", params).unwrap()
}

fn matchers(count: usize) -> Vec<FixtureMatcher> {
    (0..count)
        .map(|i| FixtureMatcher::new().path(format!("/v1/endpoint{i}.json?sort=asc")))
        .collect()
}

// Same scan order as the registry, without growing call history on every iteration
fn find_newest<'a>(matchers: &'a [FixtureMatcher], request: &Request) -> Option<&'a FixtureMatcher> {
    matchers.iter().rev().find(|m| m.matches(request))
}

fn bench_fixture_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixture_matching");

    for fixture_count in [10, 100, 1000].iter() {
        let matchers = matchers(*fixture_count);

        // Most recently defined fixture (best case)
        let newest = request_for(fixture_count - 1);
        // Oldest fixture (worst case for a match)
        let oldest = request_for(0);
        let none = request_for(*fixture_count + 1);

        group.throughput(Throughput::Elements(1));
        for (name, request) in [("match_newest", &newest), ("match_oldest", &oldest), ("match_none", &none)] {
            group.bench_with_input(BenchmarkId::new(name, fixture_count), fixture_count, |b, _| {
                b.iter(|| find_newest(black_box(&matchers), black_box(request)));
            });
        }
    }

    group.finish();
}

fn bench_registry_count(c: &mut Criterion) {
    let registry = FixtureRegistry::new();
    for i in 0..100 {
        registry.define(Method::GET).response(json!({"id": i}));
    }
    c.bench_function("registry_count", |b| b.iter(|| black_box(registry.count())));
}

fn bench_rule_application(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_application");

    for rule_count in [1, 10, 50].iter() {
        let rules: Vec<Rule> = (0..*rule_count)
            .map(|i| {
                Rule::new(
                    RuleMatcher::pattern(&format!(r"endpoint{i}\.json")).unwrap(),
                    GatewayConfig::default().with_header("X-Rule", i.to_string()),
                )
            })
            .collect();
        let request = request_for(0);

        group.bench_with_input(BenchmarkId::new("apply", rule_count), rule_count, |b, _| {
            b.iter(|| apply_rules(black_box(request.clone()), black_box(&rules)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fixture_matching,
    bench_registry_count,
    bench_rule_application
);
criterion_main!(benches);
