//! Store: in-memory `(appId, version)`-keyed specification registry.
//!
//! Safe for concurrent reads alongside occasional single-writer mutations —
//! a `tokio::sync::RwLock` guards the map.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::Specification;

type Key = (String, String);

/// In-memory specification registry.
#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<HashMap<Key, Specification>>>,
}

impl Store {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn key(app_id: &str, version: &str) -> Key {
        (app_id.to_string(), version.to_string())
    }

    /// Fetch one specification by `(appId, version)`.
    pub async fn get(&self, app_id: &str, version: &str) -> Result<Specification> {
        self.inner
            .read()
            .await
            .get(&Self::key(app_id, version))
            .cloned()
            .ok_or_else(|| Error::not_found(app_id, version))
    }

    /// List all stored specifications.
    pub async fn list(&self) -> Vec<Specification> {
        self.inner.read().await.values().cloned().collect()
    }

    /// Insert or replace a specification, stamping `updatedAt`. On replace,
    /// `createdAt` is preserved from the existing entry.
    pub async fn save(&self, mut spec: Specification) -> Specification {
        let key = Self::key(&spec.app_id, &spec.version);
        let mut guard = self.inner.write().await;
        if let Some(existing) = guard.get(&key) {
            spec.created_at = existing.created_at;
        }
        spec.updated_at = Utc::now();
        guard.insert(key, spec.clone());
        spec
    }

    /// Remove a specification. Returns `true` if it existed.
    pub async fn delete(&self, app_id: &str, version: &str) -> bool {
        self.inner
            .write()
            .await
            .remove(&Self::key(app_id, version))
            .is_some()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Environment, Schema};
    use serde_json::json;

    fn spec(app_id: &str, version: &str) -> Specification {
        Specification {
            id: format!("{app_id}-{version}"),
            app_id: app_id.to_string(),
            version: version.to_string(),
            schema: Schema::default(),
            default_config: json!({}),
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
    async fn save_then_get_round_trips() {
        let store = Store::new();
        store.save(spec("app1", "1.0.0")).await;
        let fetched = store.get("app1", "1.0.0").await.unwrap();
        assert_eq!(fetched.app_id, "app1");
    }

    #[tokio::test]
    async fn get_missing_returns_not_found() {
        let store = Store::new();
        let err = store.get("missing", "0.0.1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn save_preserves_created_at_on_replace() {
        let store = Store::new();
        let first = store.save(spec("app1", "1.0.0")).await;
        let mut second = spec("app1", "1.0.0");
        second.default_config = json!({"changed": true});
        let replaced = store.save(second).await;
        assert_eq!(replaced.created_at, first.created_at);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = Store::new();
        store.save(spec("app1", "1.0.0")).await;
        assert!(store.delete("app1", "1.0.0").await);
        assert!(store.get("app1", "1.0.0").await.is_err());
    }
}
