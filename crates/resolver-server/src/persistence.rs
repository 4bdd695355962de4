//! Default [`SpecificationPersistence`] implementation: one JSON file per
//! specification under a configured directory, named `{appId}__{version}.json`.
//!
//! The on-disk format is an implementation detail of this adapter, not a
//! contract the core depends on directly.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use resolver_core::error::{Error, Result};
use resolver_core::model::Specification;
use resolver_core::prelude::SpecificationPersistence;
use tracing::{debug, warn};

/// Loads/saves specifications as pretty-printed JSON files in a directory.
pub struct FilePersistence {
    dir: PathBuf,
}

impl FilePersistence {
    /// Construct a persistence adapter rooted at `dir`. Does not create the
    /// directory; callers should ensure it exists before relying on it.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(app_id: &str, version: &str) -> String {
        format!(
            "{}__{}.json",
            sanitize(app_id),
            sanitize(version)
        )
    }

    fn path_for(&self, app_id: &str, version: &str) -> PathBuf {
        self.dir.join(Self::file_name(app_id, version))
    }
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

#[async_trait]
impl SpecificationPersistence for FilePersistence {
    async fn load_all(&self) -> Result<Vec<Specification>> {
        if !self.dir.exists() {
            debug!(dir = %self.dir.display(), "persistence directory does not exist yet");
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::internal(format!("failed to read persistence dir: {e}")))?;

        let mut specs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::internal(format!("failed to read dir entry: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load_one(&path).await {
                Ok(spec) => specs.push(spec),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable specification file"),
            }
        }
        Ok(specs)
    }

    async fn save(&self, spec: &Specification) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::internal(format!("failed to create persistence dir: {e}")))?;

        let path = self.path_for(&spec.app_id, &spec.version);
        let body = serde_json::to_string_pretty(spec)
            .map_err(|e| Error::internal(format!("failed to serialize specification: {e}")))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| Error::internal(format!("failed to write {}: {e}", path.display())))?;
        Ok(())
    }
}

async fn load_one(path: &Path) -> Result<Specification> {
    let body = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::internal(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&body)
        .map_err(|e| Error::internal(format!("failed to parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use resolver_core::model::{Environment, Schema};
    use serde_json::json;

    fn sample(app_id: &str, version: &str) -> Specification {
        Specification {
            id: format!("{app_id}-{version}"),
            app_id: app_id.to_string(),
            version: version.to_string(),
            schema: Schema::default(),
            default_config: json!({"theme": "light"}),
            rules: vec![],
            conditional_rules: vec![],
            rule_templates: Default::default(),
            environment: Environment::Production,
            feature_flags: Default::default(),
            rollout_percentages: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_load_all_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path());
        persistence.save(&sample("com.example.app", "1.0.0")).await.unwrap();

        let loaded = persistence.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].app_id, "com.example.app");
    }

    #[tokio::test]
    async fn load_all_on_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let persistence = FilePersistence::new(missing);
        assert!(persistence.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_overwrites_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path());
        persistence.save(&sample("app", "1.0.0")).await.unwrap();
        let mut updated = sample("app", "1.0.0");
        updated.default_config = json!({"theme": "dark"});
        persistence.save(&updated).await.unwrap();

        let loaded = persistence.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].default_config["theme"], json!("dark"));
    }
}
