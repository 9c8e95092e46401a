use async_trait::async_trait;
use serde::Deserialize;
use storeflux_core::{
    Backend, ItemValue, MutationAck, SearchResult, SetItemRequest, SimilarityQuery, StorageApi,
    StoreError,
};

use crate::HttpClient;

#[derive(Debug, Deserialize)]
struct DatabasesResponse {
    #[serde(default)]
    databases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionsResponse {
    #[serde(default)]
    collections: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// `StorageApi` over the service's `/storage` endpoints.
#[derive(Clone, Debug)]
pub struct HttpStorageApi {
    http: HttpClient,
}

impl HttpStorageApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl StorageApi for HttpStorageApi {
    async fn list_databases(&self, backend: Backend) -> Result<Vec<String>, StoreError> {
        let url = self.http.url(
            &["storage", "databases"],
            &[("backend", Some(backend.wire_name()))],
        );
        let response: DatabasesResponse = self.http.get(url).await?;
        Ok(response.databases)
    }

    async fn list_collections(
        &self,
        backend: Backend,
        database: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let url = self.http.url(
            &["storage", "collections"],
            &[
                ("backend", Some(backend.wire_name())),
                ("database", database),
            ],
        );
        let response: CollectionsResponse = self.http.get(url).await?;
        Ok(response.collections)
    }

    async fn list(
        &self,
        collection: &str,
        pattern: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let pattern = pattern.filter(|p| !p.is_empty());
        let url = self
            .http
            .url(&["storage", "list", collection], &[("pattern", pattern)]);
        Ok(self.http.get(url).await?)
    }

    async fn get(&self, collection: &str, key: &str) -> Result<ItemValue, StoreError> {
        let url = self.http.url(&["storage", "get", collection, key], &[]);
        let value: serde_json::Value = self.http.get(url).await?;
        Ok(ItemValue::from(value))
    }

    async fn set(&self, request: &SetItemRequest) -> Result<MutationAck, StoreError> {
        let url = self.http.url(&["storage", "set"], &[]);
        Ok(self.http.post(url, request).await?)
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<MutationAck, StoreError> {
        let url = self.http.url(&["storage", "delete", collection, key], &[]);
        Ok(self.http.delete(url).await?)
    }

    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<SearchResult>, StoreError> {
        let url = self.http.url(&["storage", "search"], &[]);
        let response: SearchResponse = self.http.post(url, query).await?;
        Ok(response.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelopes_tolerate_missing_lists() {
        let response: DatabasesResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.databases.is_empty());

        let response: SearchResponse = serde_json::from_value(json!({
            "results": [{"id": "doc-1", "document": "cats", "distance": 0.2}]
        }))
        .unwrap();
        assert_eq!(response.results[0].id, "doc-1");
        assert_eq!(response.results[0].distance, Some(0.2));
    }
}
