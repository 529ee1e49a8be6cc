//! The `GithubIssuer` desired-state record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::condition::Condition;

/// API group/version written into every manifest.
pub const API_VERSION: &str = "github.benda.io/v1";
/// Resource kind written into every manifest.
pub const KIND: &str = "GithubIssuer";
/// Namespace used when a key or manifest omits one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Stable identity of a record: `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Namespace the record lives in.
    pub namespace: String,
    /// Record name, unique within its namespace.
    pub name: String,
}

impl ResourceKey {
    /// Creates a key from its parts.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ResourceKey {
    type Err = String;

    /// Parses `namespace/name`, or a bare `name` in the default namespace.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (namespace, name) = match raw.split_once('/') {
            Some((ns, name)) => (ns.trim(), name.trim()),
            None => (DEFAULT_NAMESPACE, raw),
        };
        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(format!("invalid key '{raw}', expected <namespace>/<name>"));
        }
        Ok(Self::new(namespace, name))
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

/// Store-owned metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Record name.
    pub name: String,
    /// Record namespace.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Bumped by the store on every write; used for conflict detection.
    #[serde(default)]
    pub resource_version: u64,
    /// Bumped by the store when the spec changes or deletion begins.
    #[serde(default)]
    pub generation: u64,
    /// Set once when deletion is requested; never cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    /// Markers that block the store from purging the record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
}

/// Desired state of the tracked issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubIssuerSpec {
    /// Repository as `owner/name` or a full URL.
    pub repo: String,
    /// Issue title; also the lookup key on the remote side.
    pub title: String,
    /// Issue body.
    pub description: String,
}

/// Observed state written back by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubIssuerStatus {
    /// Upserted-by-type conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Remote-assigned issue number, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u64>,
    /// Generation the status was last computed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<u64>,
}

/// A desired-state record, shaped like a Kubernetes custom resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubIssuer {
    /// API group/version.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Resource kind.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Identity and lifecycle metadata.
    pub metadata: ObjectMeta,
    /// Desired issue.
    pub spec: GithubIssuerSpec,
    /// Reported outcome.
    #[serde(default)]
    pub status: GithubIssuerStatus,
}

impl GithubIssuer {
    /// Builds a fresh record with empty status and metadata counters.
    #[must_use]
    pub fn new(key: &ResourceKey, spec: GithubIssuerSpec) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: key.name.clone(),
                namespace: key.namespace.clone(),
                resource_version: 0,
                generation: 0,
                deletion_timestamp: None,
                finalizers: Vec::new(),
            },
            spec,
            status: GithubIssuerStatus::default(),
        }
    }

    /// Returns the record's key.
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.metadata.namespace, &self.metadata.name)
    }

    /// Whether deletion has been requested.
    #[must_use]
    pub const fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Whether the given finalizer is present.
    #[must_use]
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.metadata.finalizers.iter().any(|f| f == finalizer)
    }

    /// Adds a finalizer; returns `false` if it was already present.
    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            return false;
        }
        self.metadata.finalizers.push(finalizer.to_string());
        true
    }

    /// Removes a finalizer; returns `false` if it was absent.
    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let before = self.metadata.finalizers.len();
        self.metadata.finalizers.retain(|f| f != finalizer);
        self.metadata.finalizers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GithubIssuer {
        GithubIssuer::new(
            &ResourceKey::new("team-a", "flaky-test"),
            GithubIssuerSpec {
                repo: "o/r".to_string(),
                title: "t".to_string(),
                description: "d".to_string(),
            },
        )
    }

    #[test]
    fn key_parses_namespaced_and_bare_forms() {
        assert_eq!("ns/name".parse::<ResourceKey>().unwrap(), ResourceKey::new("ns", "name"));
        assert_eq!("name".parse::<ResourceKey>().unwrap(), ResourceKey::new("default", "name"));
        assert!("a/b/c".parse::<ResourceKey>().is_err());
        assert!("/x".parse::<ResourceKey>().is_err());
        assert!("".parse::<ResourceKey>().is_err());
    }

    #[test]
    fn key_displays_as_namespace_slash_name() {
        assert_eq!(ResourceKey::new("ns", "n").to_string(), "ns/n");
    }

    #[test]
    fn finalizers_are_a_set() {
        let mut record = sample();
        assert!(record.add_finalizer("f"));
        assert!(!record.add_finalizer("f"));
        assert_eq!(record.metadata.finalizers.len(), 1);
        assert!(record.remove_finalizer("f"));
        assert!(!record.remove_finalizer("f"));
        assert!(record.metadata.finalizers.is_empty());
    }

    #[test]
    fn manifest_parses_with_defaults() {
        let yaml = "\
apiVersion: github.benda.io/v1
kind: GithubIssuer
metadata:
  name: flaky-test
spec:
  repo: https://github.com/o/r
  title: Flaky test
  description: It fails on Tuesdays
";
        let record: GithubIssuer = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(record.key(), ResourceKey::new("default", "flaky-test"));
        assert!(!record.is_deleting());
        assert!(record.status.conditions.is_empty());
        assert_eq!(record.status.issue_number, None);
    }

    #[test]
    fn serializes_camel_case_metadata() {
        let mut record = sample();
        record.metadata.deletion_timestamp = Some(Utc::now());
        record.status.issue_number = Some(7);
        let yaml = serde_yaml::to_string(&record).unwrap();
        assert!(yaml.contains("apiVersion: github.benda.io/v1"));
        assert!(yaml.contains("deletionTimestamp"));
        assert!(yaml.contains("issueNumber: 7"));
        assert!(record.is_deleting());
    }
}
