mod key;
mod store;

pub use key::{cache_key, is_valid_url, normalize};
pub use store::{InMemoryStore, RecipeStore, Scope, StoreError};

use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;

use crate::model::{Recipe, SavedRecipe};

/// Where a cache hit came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    UserCache,
    GlobalCache,
}

#[derive(Debug, Clone)]
pub struct CacheHit {
    pub record: SavedRecipe,
    pub source: CacheSource,
}

/// Per-user then global lookups, plus the writes that keep both scopes fed.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn RecipeStore>,
}

impl CacheService {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }

    /// Look a URL up for a user. A global hit is copied into the user's scope
    /// before it is returned, so the next lookup is a user hit.
    pub async fn lookup(&self, user_id: &str, url: &str) -> Result<Option<CacheHit>, StoreError> {
        let key = cache_key(url);
        let user_scope = Scope::User(user_id.to_string());

        if let Some(record) = self.store.get(&user_scope, &key).await? {
            debug!("User cache hit for {} ({})", url, key);
            return Ok(Some(CacheHit {
                record,
                source: CacheSource::UserCache,
            }));
        }

        if let Some(record) = self.store.copy(&Scope::Global, &user_scope, &key).await? {
            info!("Global cache hit for {} ({}), copied to user {}", url, key, user_id);
            return Ok(Some(CacheHit {
                record,
                source: CacheSource::GlobalCache,
            }));
        }

        debug!("Cache miss for {} ({})", url, key);
        Ok(None)
    }

    pub async fn get_user_record(
        &self,
        user_id: &str,
        cache_key: &str,
    ) -> Result<Option<SavedRecipe>, StoreError> {
        self.store
            .get(&Scope::User(user_id.to_string()), cache_key)
            .await
    }

    /// Persist a fresh extraction for its owner and refresh the global copy.
    /// Returns the user-scoped id.
    pub async fn save(&self, record: SavedRecipe) -> Result<String, StoreError> {
        let user_scope = Scope::User(record.user_id.clone());
        let mut global = record.clone();
        global.id = String::new();

        let id = self.store.put(&user_scope, record).await?;
        self.store.put(&Scope::Global, global).await?;
        Ok(id)
    }

    /// Record a user's own edit. Later syncs from the global copy skip it.
    pub async fn mark_user_modified(
        &self,
        user_id: &str,
        cache_key: &str,
        recipe: Recipe,
    ) -> Result<Option<SavedRecipe>, StoreError> {
        let scope = Scope::User(user_id.to_string());
        let Some(mut record) = self.store.get(&scope, cache_key).await? else {
            return Ok(None);
        };
        record.recipe = recipe;
        record.user_modified = true;
        self.store.put(&scope, record.clone()).await?;
        Ok(Some(record))
    }

    /// Background sync: refresh a user's copy from a newer global record
    /// unless the user has edited it.
    pub async fn sync_from_global(
        &self,
        user_id: &str,
        cache_key: &str,
    ) -> Result<Option<SavedRecipe>, StoreError> {
        let scope = Scope::User(user_id.to_string());
        let Some(mut record) = self.store.get(&scope, cache_key).await? else {
            return Ok(None);
        };
        if record.user_modified {
            debug!("Skipping sync of {} for {}: user modified", cache_key, user_id);
            return Ok(Some(record));
        }
        let Some(global) = self.store.get(&Scope::Global, cache_key).await? else {
            return Ok(Some(record));
        };
        if global.extracted_at > record.extracted_at {
            record.recipe = global.recipe;
            record.extracted_at = global.extracted_at;
            record.confidence = global.confidence;
            record.extractor_used = global.extractor_used;
            record.agents_used = global.agents_used;
            self.store.put(&scope, record.clone()).await?;
        }
        Ok(Some(record))
    }
}
