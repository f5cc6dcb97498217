//! A [`PersistenceGateway`] backed by an HTTP document store.
//!
//! Talks to an external store over a small REST contract: `GET
//! {base}/{collection}/{id}` for reads, `PUT` for writes, `DELETE` for
//! deletes, and `POST {base}/{collection}/query` with the filter as the
//! JSON body. This is deliberately generic rather than tied to one vendor's
//! SDK, since the only two operations the rest of the server needs are
//! "fetch a document" and "persist a document".

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::error::PersistenceError;
use crate::gateway::PersistenceGateway;

pub struct HttpPersistence {
    client: Client,
    base_url: String,
    deploy_key: Option<String>,
}

impl HttpPersistence {
    pub fn new(base_url: impl Into<String>, deploy_key: Option<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into(), deploy_key }
    }

    fn url(&self, parts: &[&str]) -> String {
        let mut url = self.base_url.trim_end_matches('/').to_string();
        for part in parts {
            url.push('/');
            url.push_str(part);
        }
        url
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.deploy_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl PersistenceGateway for HttpPersistence {
    async fn read(&self, collection: &str, id: &str) -> Result<Option<Value>, PersistenceError> {
        let request = self.authed(self.client.get(self.url(&[collection, id])));
        let response = request.send().await.map_err(|e| PersistenceError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PersistenceError::Unavailable(format!("store returned {}", response.status())));
        }
        let document = response.json().await.map_err(|e| PersistenceError::Malformed(e.to_string()))?;
        Ok(Some(document))
    }

    async fn write(&self, collection: &str, id: &str, document: Value) -> Result<(), PersistenceError> {
        let request = self.authed(self.client.put(self.url(&[collection, id]))).json(&document);
        let response = request.send().await.map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PersistenceError::Unavailable(format!("store returned {}", response.status())));
        }
        Ok(())
    }

    async fn query(&self, collection: &str, filter: Value) -> Result<Vec<Value>, PersistenceError> {
        let request = self.authed(self.client.post(self.url(&[collection, "query"]))).json(&filter);
        let response = request.send().await.map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PersistenceError::Unavailable(format!("store returned {}", response.status())));
        }
        let documents = response.json().await.map_err(|e| PersistenceError::Malformed(e.to_string()))?;
        Ok(documents)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), PersistenceError> {
        let request = self.authed(self.client.delete(self.url(&[collection, id])));
        let response = request.send().await.map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(PersistenceError::Unavailable(format!("store returned {}", response.status())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_parts_without_double_slashes() {
        let store = HttpPersistence::new("https://store.example/api/", None);
        assert_eq!(store.url(&["rooms", "r1"]), "https://store.example/api/rooms/r1");
    }

    #[test]
    fn test_url_with_no_trailing_slash_on_base() {
        let store = HttpPersistence::new("https://store.example/api", None);
        assert_eq!(store.url(&["rooms", "query"]), "https://store.example/api/rooms/query");
    }
}
