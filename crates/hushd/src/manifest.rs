//! Silence manifest files.
//!
//! Desired silences are declared as JSON files in a manifest directory.
//! Each file holds one manifest; the daemon rescans the directory every
//! reconcile interval, applying added or changed manifests and deleting
//! silences whose manifest disappeared.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use hush_types::{Matcher, SilenceId, SilenceSpec};

use crate::error::{DaemonError, Result};

/// One declared silence, as read from a manifest file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SilenceManifest {
    /// Name of the silence, unique within its namespace.
    pub name: String,
    /// Namespace grouping related silences.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Alert label matchers.
    pub matchers: Vec<Matcher>,
    /// Human-readable reason for the silence.
    #[serde(default)]
    pub comment: String,
    /// When true, the silence is declared but not applied.
    #[serde(default)]
    pub suspend: bool,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl SilenceManifest {
    /// The object identity this manifest declares.
    #[must_use]
    pub fn id(&self) -> SilenceId {
        SilenceId::new(&self.namespace, &self.name)
    }

    /// The desired-state spec this manifest declares.
    #[must_use]
    pub fn spec(&self) -> SilenceSpec {
        SilenceSpec::new(self.matchers.clone())
            .with_comment(&self.comment)
            .suspended(self.suspend)
    }

    /// Validate the manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the declared spec is
    /// invalid (no matchers, bad regex, empty matcher name).
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DaemonError::Config(
                "manifest name cannot be empty".to_string(),
            ));
        }

        self.spec()
            .validate()
            .map_err(|e| DaemonError::Config(e.to_string()))
    }
}

/// Load a single manifest file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_file(path: impl AsRef<Path>) -> Result<SilenceManifest> {
    let path = path.as_ref();
    let manifest_err = |reason: String| DaemonError::Manifest {
        path: path.display().to_string(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| manifest_err(e.to_string()))?;
    let manifest: SilenceManifest =
        serde_json::from_str(&content).map_err(|e| manifest_err(e.to_string()))?;

    manifest
        .validate()
        .map_err(|e| manifest_err(e.to_string()))?;

    Ok(manifest)
}

/// Load all `.json` manifests in a directory, skipping invalid files
/// with a warning so one bad manifest cannot take down the rest.
///
/// # Errors
///
/// Returns an error only if the directory itself cannot be read.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<SilenceManifest>> {
    let mut manifests = Vec::new();

    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();

        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        match load_file(&path) {
            Ok(manifest) => manifests.push(manifest),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping invalid manifest");
            }
        }
    }

    // Deterministic ordering regardless of directory iteration order.
    manifests.sort_by(|a, b| a.id().to_string().cmp(&b.id().to_string()));
    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::TempDir;

    fn write_manifest(dir: &Path, file: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(file)).expect("create");
        f.write_all(content.as_bytes()).expect("write");
    }

    const VALID: &str = r#"{
        "name": "db-maintenance",
        "namespace": "monitoring",
        "matchers": [{"name": "alertname", "value": "HighCPU"}],
        "comment": "planned maintenance"
    }"#;

    #[test]
    fn manifest_defaults() {
        let manifest: SilenceManifest = serde_json::from_str(
            r#"{"name": "s", "matchers": [{"name": "alertname", "value": "X"}]}"#,
        )
        .expect("parse");

        assert_eq!(manifest.namespace, "default");
        assert_eq!(manifest.comment, "");
        assert!(!manifest.suspend);
        assert_eq!(manifest.id().to_string(), "default/s");
    }

    #[test]
    fn manifest_without_matchers_fails_validation() {
        let manifest: SilenceManifest =
            serde_json::from_str(r#"{"name": "s", "matchers": []}"#).expect("parse");
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn load_file_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        write_manifest(dir.path(), "db.json", VALID);

        let manifest = load_file(dir.path().join("db.json")).expect("load");
        assert_eq!(manifest.name, "db-maintenance");
        assert_eq!(manifest.id().to_string(), "monitoring/db-maintenance");
        assert_eq!(manifest.spec().matchers.len(), 1);
    }

    #[test]
    fn load_dir_skips_invalid_and_non_json() {
        let dir = TempDir::new().expect("tempdir");
        write_manifest(dir.path(), "good.json", VALID);
        write_manifest(dir.path(), "broken.json", "{not json");
        write_manifest(dir.path(), "no-matchers.json", r#"{"name": "x", "matchers": []}"#);
        write_manifest(dir.path(), "README.md", "not a manifest");

        let manifests = load_dir(dir.path()).expect("load dir");
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].name, "db-maintenance");
    }

    #[test]
    fn load_dir_orders_by_id() {
        let dir = TempDir::new().expect("tempdir");
        write_manifest(
            dir.path(),
            "b.json",
            r#"{"name": "b", "matchers": [{"name": "a", "value": "1"}]}"#,
        );
        write_manifest(
            dir.path(),
            "a.json",
            r#"{"name": "a", "namespace": "zeta", "matchers": [{"name": "a", "value": "1"}]}"#,
        );

        let manifests = load_dir(dir.path()).expect("load dir");
        let ids: Vec<String> = manifests.iter().map(|m| m.id().to_string()).collect();
        assert_eq!(ids, vec!["default/b", "zeta/a"]);
    }

    #[test]
    fn missing_file_is_a_manifest_error() {
        let result = load_file("/nonexistent/manifest.json");
        assert!(matches!(result, Err(DaemonError::Manifest { .. })));
    }
}
