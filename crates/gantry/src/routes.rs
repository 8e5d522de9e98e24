//! Route table of a manifest: every resource method with its resolved URL template and the
//! rules that would apply to it.

use crate::manifest::Manifest;
use crate::request::join_url;
use crate::rules::RuleTarget;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub resource: String,
    pub method: String,
    pub verb: String,
    /// Host joined with the unresolved path template
    pub url: String,
    /// Indices of the manifest rules whose matcher accepts `url`
    pub rules: Vec<usize>,
}

/// List routes sorted by resource, then method name.
///
/// Rules are evaluated against the template itself, so a rule keyed on a resolved
/// placeholder value will not show up here.
pub fn describe_routes(manifest: &Manifest) -> Vec<RouteInfo> {
    let mut routes = Vec::new();

    for (resource, methods) in manifest.resources() {
        for (name, descriptor) in methods {
            let host = descriptor.host.as_deref().unwrap_or(manifest.host());
            let url = join_url(host, &descriptor.path);
            let target = RuleTarget {
                host,
                url: &url,
                path: &descriptor.path,
            };
            let rules = manifest
                .rules()
                .iter()
                .enumerate()
                .filter(|(_, rule)| rule.matcher.matches(&target))
                .map(|(index, _)| index)
                .collect();

            routes.push(RouteInfo {
                resource: resource.clone(),
                method: name.clone(),
                verb: descriptor.method.to_string(),
                url,
                rules,
            });
        }
    }

    routes
}
