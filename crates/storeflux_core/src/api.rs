use async_trait::async_trait;

use crate::{
    ActionAck, ActionRequest, Backend, ContainerInfo, ItemValue, LogEntry, MutationAck,
    SearchResult, SetItemRequest, SimilarityQuery, StoreError, SystemStats,
};

/// Storage endpoints of the backend service.
///
/// Implementations report every failure as a `StoreError`; the
/// [`StorageGateway`](crate::StorageGateway) decides what reaches the user.
/// Implementations must be `Send + Sync` so intents can run as runtime tasks.
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// `GET /storage/databases?backend=`
    async fn list_databases(&self, backend: Backend) -> Result<Vec<String>, StoreError>;

    /// `GET /storage/collections?backend=`
    ///
    /// `database` is forwarded as an extra query parameter when present.
    async fn list_collections(
        &self,
        backend: Backend,
        database: Option<&str>,
    ) -> Result<Vec<String>, StoreError>;

    /// `GET /storage/list/{collection}?pattern=`
    ///
    /// `None` lists every key.
    async fn list(&self, collection: &str, pattern: Option<&str>)
    -> Result<Vec<String>, StoreError>;

    /// `GET /storage/get/{collection}/{key}`
    ///
    /// A missing key is reported as `StoreError::NotFound`.
    async fn get(&self, collection: &str, key: &str) -> Result<ItemValue, StoreError>;

    /// `POST /storage/set`
    async fn set(&self, request: &SetItemRequest) -> Result<MutationAck, StoreError>;

    /// `DELETE /storage/delete/{collection}/{key}`
    async fn delete(&self, collection: &str, key: &str) -> Result<MutationAck, StoreError>;

    /// `POST /storage/search`
    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<SearchResult>, StoreError>;
}

/// Host monitoring endpoints of the backend service.
#[async_trait]
pub trait MonitorApi: Send + Sync {
    /// `GET /monitor/stats`
    async fn stats(&self) -> Result<SystemStats, StoreError>;

    /// `GET /monitor/containers`
    async fn containers(&self) -> Result<Vec<ContainerInfo>, StoreError>;

    /// `GET /monitor/containers/{id}/logs`
    async fn container_logs(
        &self,
        container_id: &str,
        tail: Option<u32>,
    ) -> Result<Vec<LogEntry>, StoreError>;

    /// `POST /monitor/actions`
    async fn execute_action(&self, request: &ActionRequest) -> Result<ActionAck, StoreError>;
}
