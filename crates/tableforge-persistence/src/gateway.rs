//! The storage abstraction rooms use to durably record state.
//!
//! Documents are opaque JSON values addressed by a collection name and an
//! id, mirroring the shape of the external store this server talks to in
//! production. A room never depends on a concrete backend: it is handed a
//! `dyn PersistenceGateway` and reads/writes through that.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PersistenceError;

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Fetches a single document. `Ok(None)` means the collection/id pair
    /// has never been written, which is a normal outcome, not an error.
    async fn read(&self, collection: &str, id: &str) -> Result<Option<Value>, PersistenceError>;

    /// Overwrites (or creates) a document at `collection`/`id`.
    async fn write(&self, collection: &str, id: &str, document: Value) -> Result<(), PersistenceError>;

    /// Returns every document in `collection` whose top-level fields are a
    /// superset of `filter`'s. `filter` must be a JSON object; an empty
    /// object matches every document in the collection.
    async fn query(&self, collection: &str, filter: Value) -> Result<Vec<Value>, PersistenceError>;

    /// Deletes a document, if present. Missing documents are not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), PersistenceError>;
}

pub(crate) fn matches_filter(document: &Value, filter: &Value) -> bool {
    let (Value::Object(doc), Value::Object(filter)) = (document, filter) else {
        return false;
    };
    filter.iter().all(|(key, expected)| doc.get(key) == Some(expected))
}
