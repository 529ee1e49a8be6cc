//! `github-issuer apply` command.

use std::path::Path;

use crate::context::ServiceContext;
use crate::model::{GithubIssuer, API_VERSION, KIND};

/// Parses and checks a `GithubIssuer` manifest.
///
/// # Errors
///
/// Returns an error if the YAML is invalid, the kind is wrong, or a spec
/// field is blank.
pub fn parse_manifest(yaml: &str) -> Result<GithubIssuer, String> {
    let record: GithubIssuer =
        serde_yaml::from_str(yaml).map_err(|e| format!("Invalid manifest: {e}"))?;
    if record.kind != KIND || record.api_version != API_VERSION {
        return Err(format!(
            "Unsupported resource {}/{}, expected {API_VERSION}/{KIND}",
            record.api_version, record.kind
        ));
    }
    let spec = &record.spec;
    for (field, value) in
        [("repo", &spec.repo), ("title", &spec.title), ("description", &spec.description)]
    {
        if value.trim().is_empty() {
            return Err(format!("spec.{field} must not be empty"));
        }
    }
    Ok(record)
}

/// Execute the `apply` command.
///
/// # Errors
///
/// Returns an error string if the manifest cannot be read or stored.
pub async fn run(ctx: &ServiceContext, file: &Path) -> Result<(), String> {
    let yaml = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let record = parse_manifest(&yaml)?;
    let stored = ctx.store.apply(&record).await.map_err(|e| e.to_string())?;
    println!("githubissuer {} applied (generation {})", stored.key(), stored.metadata.generation);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_manifest_defaults_namespace() {
        let record = parse_manifest(
            "apiVersion: github.benda.io/v1\nkind: GithubIssuer\nmetadata:\n  name: flaky\n\
             spec:\n  repo: o/r\n  title: Flaky test\n  description: Fix it\n",
        )
        .unwrap();
        assert_eq!(record.key().to_string(), "default/flaky");
        assert!(record.metadata.finalizers.is_empty());
    }

    #[test]
    fn blank_spec_field_is_rejected() {
        let err = parse_manifest(
            "kind: GithubIssuer\nmetadata:\n  name: x\nspec:\n  repo: o/r\n  title: ' '\n  description: d\n",
        )
        .unwrap_err();
        assert!(err.contains("spec.title"));
    }

    #[test]
    fn missing_field_is_rejected() {
        let err = parse_manifest("metadata:\n  name: x\nspec:\n  repo: o/r\n  title: t\n").unwrap_err();
        assert!(err.contains("Invalid manifest"));
    }

    #[test]
    fn other_kinds_are_rejected() {
        let err = parse_manifest(
            "kind: ConfigMap\nmetadata:\n  name: x\nspec:\n  repo: o/r\n  title: t\n  description: d\n",
        )
        .unwrap_err();
        assert!(err.contains("Unsupported resource"));
    }
}
