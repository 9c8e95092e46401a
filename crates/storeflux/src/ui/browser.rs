use std::sync::{Arc, Mutex, MutexGuard};
use storeflux_core::{
    Applied, Backend, BackendCapabilities, CascadingLoader, LoadRequest, SelectionState,
    StorageGateway, StructuredValuePolicy, drive,
};

use crate::ui::item_modal::ItemModal;

/// Storage browser: backend, database and collection selectors, the item
/// list, search, and the item form.
pub struct BrowserScreen {
    loader: Arc<Mutex<CascadingLoader>>,
    gateway: StorageGateway,
    modal: ItemModal,
    n_results: u32,
}

impl BrowserScreen {
    pub fn new(
        gateway: StorageGateway,
        backend: Backend,
        policy: StructuredValuePolicy,
        n_results: u32,
    ) -> Self {
        Self {
            loader: Arc::new(Mutex::new(CascadingLoader::new(backend))),
            gateway,
            modal: ItemModal::new(policy),
            n_results,
        }
    }

    pub fn modal(&self) -> &ItemModal {
        &self.modal
    }

    /// Clone of the selection state for rendering.
    pub fn snapshot(&self) -> SelectionState {
        self.lock().state().clone()
    }

    pub async fn select_backend(&self, backend: Backend) -> Applied {
        let request = self.lock().select_backend(backend);
        self.run(request).await
    }

    pub async fn select_database(&self, database: &str) -> Option<Applied> {
        let request = {
            let mut loader = self.lock();
            if !loader.state().databases().iter().any(|d| d == database) {
                drop(loader);
                self.gateway
                    .notifier()
                    .warning(format!("Unknown database '{}'", database));
                return None;
            }
            loader.select_database(database)
        };

        Some(self.run(request).await)
    }

    pub async fn select_collection(&self, collection: &str) -> Option<Applied> {
        let request = {
            let mut loader = self.lock();
            if !loader.state().collections().iter().any(|c| c == collection) {
                drop(loader);
                self.gateway
                    .notifier()
                    .warning(format!("Unknown collection '{}'", collection));
                return None;
            }
            loader.select_collection(collection)
        };

        Some(self.run(request).await)
    }

    pub async fn search(&self, pattern: &str) -> Option<Applied> {
        let backend = self.lock().state().backend();
        if !pattern.trim().is_empty() && !backend.supports(BackendCapabilities::PATTERN_SEARCH) {
            self.gateway.notifier().warning(format!(
                "The {} backend does not support pattern search",
                backend.display_name()
            ));
            return None;
        }

        let request = self.lock().search(pattern);

        match request {
            Some(request) => Some(self.run(request).await),
            None => {
                self.gateway
                    .notifier()
                    .warning("Select a collection before searching".to_string());
                None
            }
        }
    }

    /// Similarity search over the active collection. Refused with a
    /// notification on backends that cannot do it.
    pub async fn similar(&self, query: &str, n_results: Option<u32>) -> bool {
        let n_results = n_results.unwrap_or(self.n_results);
        let request = self.lock().similarity_search(query, n_results);

        let request = match request {
            Ok(request) => request,
            Err(err) => {
                self.gateway.notifier().warning(err.to_string());
                return false;
            }
        };

        let results = self.gateway.search(&request.query).await;
        log::debug!("Similarity search returned {} results", results.len());
        self.lock().apply_similarity(&request, results)
    }

    pub async fn add(&self, key: &str, value: &str) -> bool {
        self.modal.open_create(key, value);
        self.save().await
    }

    /// Opens the form on a loaded item with a replacement value and saves it.
    pub async fn edit(&self, key: &str, value: &str) -> bool {
        let item = self.lock().state().item(key).cloned();

        match item {
            Some(item) => {
                self.modal.open_edit(&item, value);
                self.save().await
            }
            None => {
                self.gateway
                    .notifier()
                    .warning(format!("No item '{}' in the current list", key));
                false
            }
        }
    }

    /// Submits the open form and reloads the item list on success.
    pub async fn save(&self) -> bool {
        let collection = self.lock().state().collection().map(str::to_string);
        let saved = self.modal.save(&self.gateway, collection.as_deref()).await;

        if saved {
            self.reload().await;
        }
        saved
    }

    pub async fn delete(&self, key: &str) -> bool {
        let collection = self.lock().state().collection().map(str::to_string);
        let Some(collection) = collection else {
            self.gateway
                .notifier()
                .warning("Select a collection before deleting".to_string());
            return false;
        };

        let deleted = self.gateway.delete(&collection, key).await;
        if deleted {
            self.reload().await;
        }
        deleted
    }

    pub async fn refresh(&self) -> Applied {
        let request = self.lock().refresh();
        self.run(request).await
    }

    async fn reload(&self) {
        let request = self.lock().reload_items();
        if let Some(request) = request {
            self.run(request).await;
        }
    }

    async fn run(&self, request: LoadRequest) -> Applied {
        let applied = drive(&self.loader, &self.gateway, request).await;
        if applied == Applied::Stale {
            log::debug!("Browser intent superseded before it settled");
        }
        applied
    }

    fn lock(&self) -> MutexGuard<'_, CascadingLoader> {
        storeflux_core::lock(&self.loader)
    }
}
