//! An in-memory [`PersistenceGateway`], backed by a `DashMap`.
//!
//! Used in tests and for local development without an external store
//! configured. Nothing here survives a process restart.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::PersistenceError;
use crate::gateway::{matches_filter, PersistenceGateway};

#[derive(Default)]
pub struct InMemoryPersistence {
    documents: DashMap<(String, String), Value>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryPersistence {
    async fn read(&self, collection: &str, id: &str) -> Result<Option<Value>, PersistenceError> {
        let key = (collection.to_string(), id.to_string());
        Ok(self.documents.get(&key).map(|entry| entry.clone()))
    }

    async fn write(&self, collection: &str, id: &str, document: Value) -> Result<(), PersistenceError> {
        let key = (collection.to_string(), id.to_string());
        self.documents.insert(key, document);
        Ok(())
    }

    async fn query(&self, collection: &str, filter: Value) -> Result<Vec<Value>, PersistenceError> {
        let matches = self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection && matches_filter(entry.value(), &filter))
            .map(|entry| entry.value().clone())
            .collect();
        Ok(matches)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), PersistenceError> {
        let key = (collection.to_string(), id.to_string());
        self.documents.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_missing_document_returns_none() {
        let store = InMemoryPersistence::new();
        assert_eq!(store.read("rooms", "r1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_then_read_round_trips() {
        let store = InMemoryPersistence::new();
        store.write("rooms", "r1", json!({"status": "active"})).await.unwrap();
        assert_eq!(store.read("rooms", "r1").await.unwrap(), Some(json!({"status": "active"})));
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_document() {
        let store = InMemoryPersistence::new();
        store.write("rooms", "r1", json!({"status": "active"})).await.unwrap();
        store.write("rooms", "r1", json!({"status": "paused"})).await.unwrap();
        assert_eq!(store.read("rooms", "r1").await.unwrap(), Some(json!({"status": "paused"})));
    }

    #[tokio::test]
    async fn test_query_filters_by_collection_and_fields() {
        let store = InMemoryPersistence::new();
        store.write("rooms", "r1", json!({"status": "active", "dm": "u1"})).await.unwrap();
        store.write("rooms", "r2", json!({"status": "paused", "dm": "u1"})).await.unwrap();
        store.write("snapshots", "s1", json!({"status": "active"})).await.unwrap();

        let active_rooms = store.query("rooms", json!({"status": "active"})).await.unwrap();
        assert_eq!(active_rooms.len(), 1);
        assert_eq!(active_rooms[0]["dm"], "u1");
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let store = InMemoryPersistence::new();
        store.write("rooms", "r1", json!({})).await.unwrap();
        store.delete("rooms", "r1").await.unwrap();
        assert_eq!(store.read("rooms", "r1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_document_is_not_an_error() {
        let store = InMemoryPersistence::new();
        assert!(store.delete("rooms", "missing").await.is_ok());
    }
}
