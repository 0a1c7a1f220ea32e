use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::SavedRecipe;

/// Errors raised by a record store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached
    #[error("Store backend unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded or decoded
    #[error("Record serialization failed: {0}")]
    Serialization(String),
}

/// Which partition of the store a record lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    User(String),
    Global,
}

/// The persistent document store, seen only through get/put/copy.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn get(&self, scope: &Scope, cache_key: &str) -> Result<Option<SavedRecipe>, StoreError>;

    /// Insert or overwrite the record for `(scope, record.cache_key)` and
    /// return its persisted id. Overwrites keep the existing id and owner.
    async fn put(&self, scope: &Scope, record: SavedRecipe) -> Result<String, StoreError>;

    /// Copy a record between scopes, re-owning it when the target is a user.
    async fn copy(
        &self,
        from: &Scope,
        to: &Scope,
        cache_key: &str,
    ) -> Result<Option<SavedRecipe>, StoreError> {
        let Some(mut record) = self.get(from, cache_key).await? else {
            return Ok(None);
        };
        if let Scope::User(user_id) = to {
            record.user_id = user_id.clone();
        }
        record.id = String::new();
        record.id = self.put(to, record.clone()).await?;
        Ok(Some(record))
    }
}

/// Process-local store used by the CLI and tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<(Scope, String), SavedRecipe>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for InMemoryStore {
    async fn get(&self, scope: &Scope, cache_key: &str) -> Result<Option<SavedRecipe>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(&(scope.clone(), cache_key.to_string())).cloned())
    }

    async fn put(&self, scope: &Scope, mut record: SavedRecipe) -> Result<String, StoreError> {
        let mut records = self.records.write().await;
        let key = (scope.clone(), record.cache_key.clone());

        if let Some(existing) = records.get(&key) {
            record.id = existing.id.clone();
            record.user_id = existing.user_id.clone();
        } else if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }

        debug!("Storing {} in {:?} as {}", record.cache_key, scope, record.id);
        let id = record.id.clone();
        records.insert(key, record);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExtractorKind, Recipe};
    use chrono::Utc;

    fn record(user_id: &str, title: &str) -> SavedRecipe {
        SavedRecipe {
            id: String::new(),
            user_id: user_id.to_string(),
            source_url: "https://example.com/pie".to_string(),
            cache_key: "00000000deadbeef".to_string(),
            recipe: Recipe {
                title: title.to_string(),
                ..Default::default()
            },
            extracted_at: Utc::now(),
            confidence: 0.95,
            extractor_used: ExtractorKind::SchemaFastPath,
            agents_used: Vec::new(),
            user_modified: false,
        }
    }

    #[tokio::test]
    async fn test_put_assigns_id_and_get_returns_it() {
        let store = InMemoryStore::new();
        let scope = Scope::User("alice".to_string());
        let id = store.put(&scope, record("alice", "Pie")).await.unwrap();
        assert!(!id.is_empty());

        let fetched = store.get(&scope, "00000000deadbeef").await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.recipe.title, "Pie");
        assert!(store.get(&Scope::Global, "00000000deadbeef").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrite_keeps_id_and_owner() {
        let store = InMemoryStore::new();
        let scope = Scope::User("alice".to_string());
        let first = store.put(&scope, record("alice", "Pie")).await.unwrap();
        let second = store.put(&scope, record("mallory", "Better Pie")).await.unwrap();
        assert_eq!(first, second);

        let fetched = store.get(&scope, "00000000deadbeef").await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "alice");
        assert_eq!(fetched.recipe.title, "Better Pie");
    }

    #[tokio::test]
    async fn test_copy_reowns_record() {
        let store = InMemoryStore::new();
        let global_id = store.put(&Scope::Global, record("alice", "Pie")).await.unwrap();

        let bob = Scope::User("bob".to_string());
        let copied = store
            .copy(&Scope::Global, &bob, "00000000deadbeef")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(copied.user_id, "bob");
        assert_ne!(copied.id, global_id);
        assert_eq!(
            store.get(&bob, "00000000deadbeef").await.unwrap().unwrap().id,
            copied.id
        );
    }

    #[tokio::test]
    async fn test_copy_missing_record() {
        let store = InMemoryStore::new();
        let copied = store
            .copy(&Scope::Global, &Scope::User("bob".to_string()), "missing")
            .await
            .unwrap();
        assert!(copied.is_none());
    }
}
