//! Manifest loading: host, cross-cutting rules and the resources a client exposes.
//!
//! ```yaml
//! host: http://full-url
//! rules:
//!   - match: 'v1/books\.json'
//!     values:
//!       gateway:
//!         headers:
//!           Authorization: token
//! resources:
//!   Book:
//!     all:  { path: /v1/books.json }
//!     byId: { path: '/v1/books/{id}.json' }
//!     save: { method: post, path: /v1/books.json }
//! ```

use crate::request::{parse_method, MethodDescriptor};
use crate::rules::Rule;
use anyhow::Context;
use http::Method;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Methods of one resource, keyed by method name.
pub type ResourceMethods = BTreeMap<String, MethodDescriptor>;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to parse manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Manifest host must not be empty")]
    EmptyHost,

    #[error("Invalid HTTP method '{verb}' for {resource}.{method}")]
    InvalidMethod {
        resource: String,
        method: String,
        verb: String,
    },

    #[error("Empty path for {resource}.{method}")]
    EmptyPath { resource: String, method: String },
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    host: String,
    #[serde(default)]
    rules: Vec<Rule>,
    #[serde(default)]
    resources: BTreeMap<String, BTreeMap<String, MethodEntry>>,
}

#[derive(Debug, Deserialize)]
struct MethodEntry {
    path: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    host: Option<String>,
}

impl TryFrom<ManifestFile> for Manifest {
    type Error = ManifestError;

    fn try_from(file: ManifestFile) -> Result<Self, Self::Error> {
        let mut resources = BTreeMap::new();
        for (resource, methods) in file.resources {
            let mut descriptors = ResourceMethods::new();
            for (name, entry) in methods {
                let verb = entry.method.unwrap_or_else(|| "get".to_string());
                let method = parse_method(&verb).map_err(|_| ManifestError::InvalidMethod {
                    resource: resource.clone(),
                    method: name.clone(),
                    verb: verb.clone(),
                })?;

                let mut descriptor = MethodDescriptor::new(name.clone(), method, entry.path);
                if let Some(host) = entry.host {
                    descriptor = descriptor.with_host(host);
                }
                descriptors.insert(name, descriptor);
            }
            resources.insert(resource, descriptors);
        }

        let manifest = Manifest {
            host: file.host,
            rules: file.rules,
            resources,
        };
        manifest.validate()?;
        Ok(manifest)
    }
}

/// A parsed, validated manifest. Immutable once a client is built from it.
#[derive(Debug, Clone)]
pub struct Manifest {
    host: String,
    rules: Vec<Rule>,
    resources: BTreeMap<String, ResourceMethods>,
}

impl Manifest {
    /// Start a manifest in code.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            rules: Vec::new(),
            resources: BTreeMap::new(),
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a method to a resource, creating the resource if needed.
    pub fn method(
        mut self,
        resource: impl Into<String>,
        name: impl Into<String>,
        method: Method,
        path: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.resources
            .entry(resource.into())
            .or_default()
            .insert(name.clone(), MethodDescriptor::new(name, method, path));
        self
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let manifest = Self::from_yaml_str(&contents)
            .with_context(|| format!("invalid manifest {}", path.display()))?;
        Ok(manifest)
    }

    /// Parse YAML (or JSON, which is valid YAML).
    pub fn from_yaml_str(contents: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = serde_yaml::from_str(contents)?;
        Manifest::try_from(file)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ManifestError> {
        let file: ManifestFile = serde_json::from_value(value)?;
        Manifest::try_from(file)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.host.trim().is_empty() {
            return Err(ManifestError::EmptyHost);
        }

        for (resource, methods) in &self.resources {
            for (name, descriptor) in methods {
                if descriptor.path.is_empty() {
                    return Err(ManifestError::EmptyPath {
                        resource: resource.clone(),
                        method: name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn resources(&self) -> &BTreeMap<String, ResourceMethods> {
        &self.resources
    }

    pub fn descriptor(&self, resource: &str, method: &str) -> Option<&MethodDescriptor> {
        self.resources.get(resource)?.get(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const MANIFEST: &str = r#"
host: http://full-url
rules:
  - match: 'v1/books\.json'
    values:
      gateway:
        headers:
          Authorization: token
resources:
  Book:
    all: { path: /v1/books.json }
    byId: { path: '/v1/books/{id}.json' }
    save: { method: POST, path: /v1/books.json }
  Photo:
    upload: { method: put, path: /photos, host: 'http://cdn' }
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::from_yaml_str(MANIFEST).unwrap();
        assert_eq!(manifest.host(), "http://full-url");
        assert_eq!(manifest.rules().len(), 1);
        assert_eq!(manifest.resources().len(), 2);

        let all = manifest.descriptor("Book", "all").unwrap();
        assert_eq!(all.method, Method::GET);
        assert_eq!(all.path, "/v1/books.json");

        let save = manifest.descriptor("Book", "save").unwrap();
        assert_eq!(save.method, Method::POST);

        let upload = manifest.descriptor("Photo", "upload").unwrap();
        assert_eq!(upload.method, Method::PUT);
        assert_eq!(upload.host.as_deref(), Some("http://cdn"));

        assert!(manifest.descriptor("Book", "missing").is_none());
        assert!(manifest.descriptor("Author", "all").is_none());
    }

    #[test]
    fn test_from_value() {
        let manifest = Manifest::from_value(json!({
            "host": "http://full-url",
            "resources": {"Book": {"all": {"path": "/v1/books.json"}}}
        }))
        .unwrap();
        assert!(manifest.rules().is_empty());
        assert!(manifest.descriptor("Book", "all").is_some());
    }

    #[test]
    fn test_empty_host_rejected() {
        let result = Manifest::from_yaml_str("host: ''\nresources: {}\n");
        assert!(matches!(result, Err(ManifestError::EmptyHost)));
    }

    #[test]
    fn test_invalid_method_rejected() {
        let yaml = "host: http://h\nresources:\n  Book:\n    all: { method: 'not a verb', path: /x }\n";
        let result = Manifest::from_yaml_str(yaml);
        assert!(matches!(result, Err(ManifestError::InvalidMethod { .. })));
    }

    #[test]
    fn test_invalid_rule_pattern_rejected() {
        let yaml = "host: http://h\nrules:\n  - match: '(oops'\n";
        assert!(matches!(
            Manifest::from_yaml_str(yaml),
            Err(ManifestError::Yaml(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();
        let manifest = Manifest::from_file(file.path()).unwrap();
        assert_eq!(manifest.resources()["Book"].len(), 3);
    }

    #[test]
    fn test_from_missing_file_has_context() {
        let err = Manifest::from_file("/nonexistent/manifest.yml").unwrap_err();
        assert!(err.to_string().contains("failed to read manifest"));
    }

    #[test]
    fn test_builder_methods() {
        let manifest = Manifest::new("http://full-url")
            .method("Book", "all", Method::GET, "/v1/books.json")
            .method("Book", "save", Method::POST, "/v1/books.json");
        assert!(manifest.validate().is_ok());
        assert_eq!(manifest.resources()["Book"].len(), 2);
    }
}
