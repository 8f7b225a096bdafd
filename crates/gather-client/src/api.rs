use crate::entities::EntityKind;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field equality filter: every pair must match.
pub type Filter = BTreeMap<String, String>;

/// Build a [`Filter`] from `(field, value)` pairs.
pub fn filter<const N: usize>(pairs: [(&str, &str); N]) -> Filter {
    pairs
        .into_iter()
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

/// CRUD and filter access to the remote entity store.
///
/// Payloads are raw JSON; typed decoding happens in the caller so cached
/// values for every entity kind can share one cache.
#[async_trait]
pub trait EntityApi: Send + Sync {
    /// Fetch one entity by id.
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Value>;

    /// List entities whose fields equal every pair in `filter`.
    async fn filter(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Value>>;

    /// Create an entity. Returns it as stored, id included.
    async fn create(&self, kind: EntityKind, body: Value) -> Result<Value>;

    /// Apply a partial update. Returns the updated entity.
    async fn update(&self, kind: EntityKind, id: &str, patch: Value) -> Result<Value>;

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<()>;
}
