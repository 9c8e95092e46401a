use crate::{Backend, Item, SearchResult};

/// Step of the cascade a load belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStep {
    Databases,
    Collections,
    Items,
}

impl LoadStep {
    pub fn label(&self) -> &'static str {
        match self {
            LoadStep::Databases => "List databases",
            LoadStep::Collections => "List collections",
            LoadStep::Items => "List items",
        }
    }
}

/// Where the browser is in the backend → database → collection → items cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    LoadingDatabases,
    LoadingCollections,
    LoadingItems,
    Ready,
    /// A load failed at the given step. Settled: the user retries by reselecting.
    Error(LoadStep),
}

impl LoadPhase {
    pub fn loading(step: LoadStep) -> Self {
        match step {
            LoadStep::Databases => LoadPhase::LoadingDatabases,
            LoadStep::Collections => LoadPhase::LoadingCollections,
            LoadStep::Items => LoadPhase::LoadingItems,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            LoadPhase::LoadingDatabases | LoadPhase::LoadingCollections | LoadPhase::LoadingItems
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadPhase::Idle => "idle",
            LoadPhase::LoadingDatabases => "loading databases",
            LoadPhase::LoadingCollections => "loading collections",
            LoadPhase::LoadingItems => "loading items",
            LoadPhase::Ready => "ready",
            LoadPhase::Error(_) => "error",
        }
    }
}

/// Selection and loaded data behind the database browser.
///
/// Owned by the browser screen and only mutated through the
/// [`CascadingLoader`](crate::CascadingLoader), which keeps downstream
/// selections consistent with upstream changes.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    pub(crate) backend: Backend,
    pub(crate) databases: Vec<String>,
    pub(crate) database: Option<String>,
    pub(crate) collections: Vec<String>,
    pub(crate) collection: Option<String>,
    pub(crate) items: Vec<Item>,
    pub(crate) search_pattern: Option<String>,
    pub(crate) similarity_results: Vec<SearchResult>,
    pub(crate) phase: LoadPhase,
    pub(crate) last_error: Option<String>,
}

impl SelectionState {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn databases(&self) -> &[String] {
        &self.databases
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, key: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.key == key)
    }

    /// Active key filter; `None` means every key is listed.
    pub fn search_pattern(&self) -> Option<&str> {
        self.search_pattern.as_deref()
    }

    pub fn similarity_results(&self) -> &[SearchResult] {
        &self.similarity_results
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading_metadata(&self) -> bool {
        matches!(
            self.phase,
            LoadPhase::LoadingDatabases | LoadPhase::LoadingCollections
        )
    }

    pub fn is_loading_items(&self) -> bool {
        self.phase == LoadPhase::LoadingItems
    }

    pub(crate) fn clear_from_databases(&mut self) {
        self.databases.clear();
        self.database = None;
        self.clear_from_collections();
    }

    pub(crate) fn clear_from_collections(&mut self) {
        self.collections.clear();
        self.collection = None;
        self.clear_items();
    }

    pub(crate) fn clear_items(&mut self) {
        self.items.clear();
        self.similarity_results.clear();
    }
}
