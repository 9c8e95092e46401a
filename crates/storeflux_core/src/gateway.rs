use std::sync::Arc;

use crate::{
    ActionRequest, Backend, CancelToken, ContainerAction, ContainerInfo, Item, ItemValue,
    LoadOutcome, LoadRequest, LogFetch, LogOutcome, LogRequest, MonitorApi, Notifier,
    SearchResult, SetItemRequest, SimilarityQuery, StorageApi, StoreError, SystemStats,
};

/// Gateway operations, named in user-facing failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Set,
    Delete,
    Search,
    ListDatabases,
    ListCollections,
    Stats,
    Containers,
    Logs,
    Action,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::List => "List items",
            Operation::Get => "Get item",
            Operation::Set => "Save item",
            Operation::Delete => "Delete item",
            Operation::Search => "Similarity search",
            Operation::ListDatabases => "List databases",
            Operation::ListCollections => "List collections",
            Operation::Stats => "Load system stats",
            Operation::Containers => "List containers",
            Operation::Logs => "Load container logs",
            Operation::Action => "Container action",
        }
    }
}

fn report(notifier: &dyn Notifier, operation: Operation, err: &StoreError) {
    if err.is_silent() {
        log::debug!("{} aborted", operation.label());
        return;
    }

    notifier.error(format!("{} failed: {}", operation.label(), err));
}

/// Storage facade used by the browser.
///
/// Every failure is turned into a notification and a safe default (empty list,
/// `None`, `false`), so callers never handle errors themselves.
#[derive(Clone)]
pub struct StorageGateway {
    api: Arc<dyn StorageApi>,
    notifier: Arc<dyn Notifier>,
}

impl StorageGateway {
    pub fn new(api: Arc<dyn StorageApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub async fn list_databases(&self, backend: Backend) -> Vec<String> {
        self.try_list_databases(backend).await.unwrap_or_default()
    }

    pub async fn list_collections(&self, backend: Backend, database: Option<&str>) -> Vec<String> {
        self.try_list_collections(backend, database)
            .await
            .unwrap_or_default()
    }

    /// Keys of `collection`, optionally filtered by a glob-style pattern.
    pub async fn list(&self, collection: &str, pattern: Option<&str>) -> Vec<String> {
        self.try_list(collection, pattern).await.unwrap_or_default()
    }

    /// `None` when the key does not exist or the request failed.
    pub async fn get(&self, collection: &str, key: &str) -> Option<ItemValue> {
        self.try_get(collection, key).await.ok().flatten()
    }

    pub async fn set(&self, request: &SetItemRequest) -> bool {
        match self.api.set(request).await {
            Ok(ack) => {
                log::info!(
                    "Stored '{}' in '{}' ({})",
                    request.key,
                    request.collection,
                    ack.status
                );
                true
            }
            Err(err) => {
                report(self.notifier.as_ref(), Operation::Set, &err);
                false
            }
        }
    }

    pub async fn delete(&self, collection: &str, key: &str) -> bool {
        match self.api.delete(collection, key).await {
            Ok(_) => {
                log::info!("Deleted '{}' from '{}'", key, collection);
                true
            }
            Err(err) => {
                report(self.notifier.as_ref(), Operation::Delete, &err);
                false
            }
        }
    }

    pub async fn search(&self, query: &SimilarityQuery) -> Vec<SearchResult> {
        match self.api.search(query).await {
            Ok(results) => results,
            Err(err) => {
                report(self.notifier.as_ref(), Operation::Search, &err);
                Vec::new()
            }
        }
    }

    /// Runs a cascading-loader request.
    ///
    /// Failures are reported like every other gateway call, and additionally
    /// handed to the loader so it can enter its error state.
    pub async fn fetch(&self, request: &LoadRequest) -> LoadOutcome {
        match request {
            LoadRequest::Databases { ticket, backend } => LoadOutcome::Databases {
                ticket: *ticket,
                result: self.try_list_databases(*backend).await,
            },
            LoadRequest::Collections {
                ticket,
                backend,
                database,
            } => LoadOutcome::Collections {
                ticket: *ticket,
                result: self
                    .try_list_collections(*backend, Some(database.as_str()))
                    .await,
            },
            LoadRequest::Items {
                ticket,
                collection,
                pattern,
            } => LoadOutcome::Items {
                ticket: *ticket,
                result: self.load_items(collection, pattern.as_deref()).await,
            },
        }
    }

    /// Lists keys, then hydrates them one by one. Keys that vanish between the
    /// list and the get are skipped; any other failure aborts the load.
    async fn load_items(
        &self,
        collection: &str,
        pattern: Option<&str>,
    ) -> Result<Vec<Item>, StoreError> {
        let keys = self.try_list(collection, pattern).await?;
        let mut items = Vec::with_capacity(keys.len());

        for key in keys {
            if let Some(value) = self.try_get(collection, &key).await? {
                items.push(Item::new(key, value, collection));
            }
        }

        log::debug!("Loaded {} items from '{}'", items.len(), collection);
        Ok(items)
    }

    async fn try_list_databases(&self, backend: Backend) -> Result<Vec<String>, StoreError> {
        self.api
            .list_databases(backend)
            .await
            .inspect_err(|err| report(self.notifier.as_ref(), Operation::ListDatabases, err))
    }

    async fn try_list_collections(
        &self,
        backend: Backend,
        database: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        self.api
            .list_collections(backend, database)
            .await
            .inspect_err(|err| report(self.notifier.as_ref(), Operation::ListCollections, err))
    }

    /// `Ok(None)` for a missing key; other failures are reported.
    async fn try_get(&self, collection: &str, key: &str) -> Result<Option<ItemValue>, StoreError> {
        match self.api.get(collection, key).await {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::NotFound) => {
                log::debug!("Key '{}' not found in '{}'", key, collection);
                Ok(None)
            }
            Err(err) => {
                report(self.notifier.as_ref(), Operation::Get, &err);
                Err(err)
            }
        }
    }

    async fn try_list(
        &self,
        collection: &str,
        pattern: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        self.api
            .list(collection, pattern)
            .await
            .inspect_err(|err| report(self.notifier.as_ref(), Operation::List, err))
    }
}

/// Monitor facade used by the system screen. Same failure policy as
/// [`StorageGateway`]; aborted log fetches stay silent.
#[derive(Clone)]
pub struct MonitorGateway {
    api: Arc<dyn MonitorApi>,
    notifier: Arc<dyn Notifier>,
}

impl MonitorGateway {
    pub fn new(api: Arc<dyn MonitorApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    pub async fn stats(&self) -> Option<SystemStats> {
        match self.api.stats().await {
            Ok(stats) => Some(stats),
            Err(err) => {
                report(self.notifier.as_ref(), Operation::Stats, &err);
                None
            }
        }
    }

    pub async fn containers(&self) -> Option<Vec<ContainerInfo>> {
        match self.api.containers().await {
            Ok(containers) => Some(containers),
            Err(err) => {
                report(self.notifier.as_ref(), Operation::Containers, &err);
                None
            }
        }
    }

    /// Fetches the log tail, racing the request against `cancel`.
    pub async fn container_logs(
        &self,
        container_id: &str,
        tail: Option<u32>,
        cancel: &CancelToken,
    ) -> LogFetch {
        if cancel.is_cancelled() {
            return LogFetch::Aborted;
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            result = self.api.container_logs(container_id, tail) => result,
        };

        match result {
            Ok(entries) => LogFetch::Loaded(entries),
            Err(StoreError::Cancelled) => {
                log::debug!("Log tail for '{}' aborted", container_id);
                LogFetch::Aborted
            }
            Err(err) => {
                report(self.notifier.as_ref(), Operation::Logs, &err);
                LogFetch::Failed(err)
            }
        }
    }

    pub async fn fetch_logs(&self, request: &LogRequest, tail: Option<u32>) -> LogOutcome {
        LogOutcome {
            ticket: request.ticket,
            fetch: self
                .container_logs(&request.container_id, tail, &request.cancel)
                .await,
        }
    }

    pub async fn execute_action(&self, container_id: &str, action: ContainerAction) -> bool {
        let request = ActionRequest::new(action, container_id);

        match self.api.execute_action(&request).await {
            Ok(ack) => {
                let message = ack
                    .message
                    .unwrap_or_else(|| format!("{} {}: {}", action, container_id, ack.status));
                self.notifier.success(message);
                true
            }
            Err(err) => {
                report(self.notifier.as_ref(), Operation::Action, &err);
                false
            }
        }
    }
}
