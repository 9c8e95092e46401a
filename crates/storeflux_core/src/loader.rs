use std::sync::Mutex;

use crate::{
    Backend, BackendCapabilities, Item, LoadPhase, LoadStep, SearchResult, SelectionState,
    SimilarityQuery, StorageGateway, StoreError, lock,
};

/// Generation stamp attached to every load request.
///
/// An outcome is applied only if its ticket matches the loader's current
/// generation; anything older belongs to a superseded selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

/// A fetch the loader needs performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    Databases {
        ticket: Ticket,
        backend: Backend,
    },
    Collections {
        ticket: Ticket,
        backend: Backend,
        database: String,
    },
    Items {
        ticket: Ticket,
        collection: String,
        pattern: Option<String>,
    },
}

impl LoadRequest {
    pub fn ticket(&self) -> Ticket {
        match self {
            LoadRequest::Databases { ticket, .. }
            | LoadRequest::Collections { ticket, .. }
            | LoadRequest::Items { ticket, .. } => *ticket,
        }
    }

    pub fn step(&self) -> LoadStep {
        match self {
            LoadRequest::Databases { .. } => LoadStep::Databases,
            LoadRequest::Collections { .. } => LoadStep::Collections,
            LoadRequest::Items { .. } => LoadStep::Items,
        }
    }
}

/// Result of a [`LoadRequest`], fed back through [`CascadingLoader::apply`].
#[derive(Debug)]
pub enum LoadOutcome {
    Databases {
        ticket: Ticket,
        result: Result<Vec<String>, StoreError>,
    },
    Collections {
        ticket: Ticket,
        result: Result<Vec<String>, StoreError>,
    },
    Items {
        ticket: Ticket,
        result: Result<Vec<Item>, StoreError>,
    },
}

impl LoadOutcome {
    pub fn ticket(&self) -> Ticket {
        match self {
            LoadOutcome::Databases { ticket, .. }
            | LoadOutcome::Collections { ticket, .. }
            | LoadOutcome::Items { ticket, .. } => *ticket,
        }
    }
}

/// What applying an outcome did to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The outcome belonged to a superseded request and was dropped.
    Stale,
    /// The outcome was applied and the cascade continues with this request.
    Next(LoadRequest),
    /// The outcome was applied and the cascade is finished.
    Settled,
}

/// Similarity search bound to the selection it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityRequest {
    selection: u64,
    pub query: SimilarityQuery,
}

/// State machine for the backend → database → collection → items cascade.
///
/// The loader performs no I/O. Intents return the [`LoadRequest`] to run, and
/// [`drive`] executes requests through the gateway and feeds outcomes back.
/// Every intent bumps the generation, so responses that resolve after a newer
/// selection are discarded instead of overwriting it.
#[derive(Debug, Default)]
pub struct CascadingLoader {
    state: SelectionState,
    generation: u64,
    selection: u64,
}

impl CascadingLoader {
    pub fn new(backend: Backend) -> Self {
        Self {
            state: SelectionState::new(backend),
            generation: 0,
            selection: 0,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Clears every downstream selection and starts loading the backend's databases.
    pub fn select_backend(&mut self, backend: Backend) -> LoadRequest {
        log::debug!("Selecting backend {}", backend.wire_name());

        self.state.backend = backend;
        self.state.clear_from_databases();
        self.state.search_pattern = None;
        self.begin(LoadStep::Databases);

        LoadRequest::Databases {
            ticket: self.ticket(),
            backend,
        }
    }

    pub fn select_database(&mut self, database: impl Into<String>) -> LoadRequest {
        let database = database.into();
        log::debug!("Selecting database {}", database);

        self.state.database = Some(database.clone());
        self.state.clear_from_collections();
        self.state.search_pattern = None;
        self.begin(LoadStep::Collections);

        LoadRequest::Collections {
            ticket: self.ticket(),
            backend: self.state.backend,
            database,
        }
    }

    pub fn select_collection(&mut self, collection: impl Into<String>) -> LoadRequest {
        let collection = collection.into();
        log::debug!("Selecting collection {}", collection);

        self.state.collection = Some(collection.clone());
        self.state.clear_items();
        self.state.search_pattern = None;
        self.begin(LoadStep::Items);

        LoadRequest::Items {
            ticket: self.ticket(),
            collection,
            pattern: None,
        }
    }

    /// Re-lists the active collection filtered by `pattern`.
    ///
    /// Leaves the phase untouched. A blank pattern lists every key. Returns
    /// `None` when no collection is active.
    pub fn search(&mut self, pattern: &str) -> Option<LoadRequest> {
        let collection = self.state.collection.clone()?;

        let pattern = pattern.trim();
        self.state.search_pattern = (!pattern.is_empty()).then(|| pattern.to_string());
        self.generation += 1;

        Some(LoadRequest::Items {
            ticket: self.ticket(),
            collection,
            pattern: self.state.search_pattern.clone(),
        })
    }

    /// Full reload of the active collection, keeping the active search pattern.
    ///
    /// Issued after every successful mutation.
    pub fn reload_items(&mut self) -> Option<LoadRequest> {
        let collection = self.state.collection.clone()?;
        self.generation += 1;

        Some(LoadRequest::Items {
            ticket: self.ticket(),
            collection,
            pattern: self.state.search_pattern.clone(),
        })
    }

    /// Re-runs the deepest step that can be retried from the current selection.
    pub fn refresh(&mut self) -> LoadRequest {
        if let Some(collection) = self.state.collection.clone() {
            let pattern = self.state.search_pattern.clone();
            self.state.last_error = None;
            self.state.phase = LoadPhase::LoadingItems;
            self.generation += 1;

            return LoadRequest::Items {
                ticket: self.ticket(),
                collection,
                pattern,
            };
        }

        match self.state.database.clone() {
            Some(database) => self.select_database(database),
            None => self.select_backend(self.state.backend),
        }
    }

    pub fn apply(&mut self, outcome: LoadOutcome) -> Applied {
        if outcome.ticket() != self.ticket() {
            log::debug!(
                "Discarding stale load outcome (generation {} < {})",
                outcome.ticket().generation,
                self.generation
            );
            return Applied::Stale;
        }

        match outcome {
            LoadOutcome::Databases { ticket, result } => match result {
                Ok(databases) => {
                    self.state.databases = databases;

                    match self.state.databases.first().cloned() {
                        Some(first) => {
                            self.state.database = Some(first.clone());
                            self.state.phase = LoadPhase::LoadingCollections;
                            Applied::Next(LoadRequest::Collections {
                                ticket,
                                backend: self.state.backend,
                                database: first,
                            })
                        }
                        None => {
                            self.state.database = None;
                            self.state.clear_from_collections();
                            self.settle();
                            Applied::Settled
                        }
                    }
                }
                Err(err) => {
                    self.state.clear_from_databases();
                    self.fail(LoadStep::Databases, err);
                    Applied::Settled
                }
            },

            LoadOutcome::Collections { ticket, result } => match result {
                Ok(collections) => {
                    self.state.collections = collections;

                    match self.state.collections.first().cloned() {
                        Some(first) => {
                            self.state.collection = Some(first.clone());
                            self.state.phase = LoadPhase::LoadingItems;
                            Applied::Next(LoadRequest::Items {
                                ticket,
                                collection: first,
                                pattern: None,
                            })
                        }
                        None => {
                            self.state.collection = None;
                            self.state.clear_items();
                            self.settle();
                            Applied::Settled
                        }
                    }
                }
                Err(err) => {
                    self.state.clear_from_collections();
                    self.fail(LoadStep::Collections, err);
                    Applied::Settled
                }
            },

            LoadOutcome::Items { result, .. } => {
                match result {
                    Ok(items) => {
                        self.state.items = items;
                        self.settle();
                    }
                    Err(err) => {
                        self.state.items.clear();
                        self.fail(LoadStep::Items, err);
                    }
                }
                Applied::Settled
            }
        }
    }

    /// Builds a similarity search for the active collection.
    ///
    /// Fails with `Unsupported` on backends without similarity search and when
    /// no collection is active.
    pub fn similarity_search(
        &self,
        query: &str,
        n_results: u32,
    ) -> Result<SimilarityRequest, StoreError> {
        let backend = self.state.backend;
        if !backend.supports(BackendCapabilities::SIMILARITY_SEARCH) {
            return Err(StoreError::unsupported(format!(
                "similarity search on the {} backend",
                backend.display_name()
            )));
        }

        let collection = self
            .state
            .collection
            .clone()
            .ok_or_else(|| StoreError::unsupported("similarity search without a collection"))?;

        Ok(SimilarityRequest {
            selection: self.selection,
            query: SimilarityQuery::new(query.trim(), collection, n_results.max(1)),
        })
    }

    /// Stores similarity results unless the selection changed since the request.
    pub fn apply_similarity(
        &mut self,
        request: &SimilarityRequest,
        results: Vec<SearchResult>,
    ) -> bool {
        if request.selection != self.selection {
            return false;
        }

        self.state.similarity_results = results;
        true
    }

    fn begin(&mut self, step: LoadStep) {
        self.generation += 1;
        self.selection += 1;
        self.state.last_error = None;
        self.state.phase = LoadPhase::loading(step);
    }

    fn settle(&mut self) {
        self.state.last_error = None;
        self.state.phase = LoadPhase::Ready;
    }

    fn fail(&mut self, step: LoadStep, err: StoreError) {
        log::warn!("{} failed: {}", step.label(), err);
        self.state.last_error = Some(err.to_string());
        self.state.phase = LoadPhase::Error(step);
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
        }
    }
}

/// Runs `request` and every follow-up request the cascade produces.
///
/// The loader lock is held only while applying outcomes, never across a fetch,
/// so intents issued meanwhile supersede this cascade.
pub async fn drive(
    loader: &Mutex<CascadingLoader>,
    gateway: &StorageGateway,
    request: LoadRequest,
) -> Applied {
    let mut request = request;

    loop {
        let outcome = gateway.fetch(&request).await;
        let applied = lock(loader).apply(outcome);

        match applied {
            Applied::Next(next) => request = next,
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemValue;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn item(key: &str, collection: &str) -> Item {
        Item::new(key, ItemValue::text("v"), collection)
    }

    #[test]
    fn backend_change_clears_downstream_before_fetch() {
        let mut loader = CascadingLoader::new(Backend::KeyValue);
        let request = loader.select_backend(Backend::KeyValue);
        let next = loader.apply(LoadOutcome::Databases {
            ticket: request.ticket(),
            result: Ok(names(&["db0"])),
        });
        let Applied::Next(request) = next else {
            panic!("expected collections request");
        };
        loader.apply(LoadOutcome::Collections {
            ticket: request.ticket(),
            result: Ok(names(&["users"])),
        });

        let request = loader.select_backend(Backend::Document);

        assert_eq!(
            request,
            LoadRequest::Databases {
                ticket: request.ticket(),
                backend: Backend::Document,
            }
        );
        let state = loader.state();
        assert!(state.database().is_none());
        assert!(state.collection().is_none());
        assert!(state.items().is_empty());
        assert!(state.databases().is_empty());
        assert_eq!(state.phase(), LoadPhase::LoadingDatabases);
    }

    #[test]
    fn first_entries_are_auto_selected() {
        let mut loader = CascadingLoader::new(Backend::Document);
        let request = loader.select_backend(Backend::Document);

        let Applied::Next(collections) = loader.apply(LoadOutcome::Databases {
            ticket: request.ticket(),
            result: Ok(names(&["analytics", "main"])),
        }) else {
            panic!("expected collections request");
        };
        assert_eq!(loader.state().database(), Some("analytics"));
        assert_eq!(collections.step(), LoadStep::Collections);

        let Applied::Next(items) = loader.apply(LoadOutcome::Collections {
            ticket: collections.ticket(),
            result: Ok(names(&["events", "users"])),
        }) else {
            panic!("expected items request");
        };
        assert_eq!(loader.state().collection(), Some("events"));

        let applied = loader.apply(LoadOutcome::Items {
            ticket: items.ticket(),
            result: Ok(vec![item("a", "events")]),
        });
        assert_eq!(applied, Applied::Settled);
        assert_eq!(loader.state().phase(), LoadPhase::Ready);
        assert_eq!(loader.state().items().len(), 1);
    }

    #[test]
    fn empty_database_list_settles_without_collection_fetch() {
        let mut loader = CascadingLoader::new(Backend::Vector);
        let request = loader.select_backend(Backend::Vector);

        let applied = loader.apply(LoadOutcome::Databases {
            ticket: request.ticket(),
            result: Ok(Vec::new()),
        });

        assert_eq!(applied, Applied::Settled);
        assert!(loader.state().collections().is_empty());
        assert!(loader.state().items().is_empty());
        assert_eq!(loader.state().phase(), LoadPhase::Ready);
    }

    #[test]
    fn empty_collection_list_settles_with_no_items() {
        let mut loader = CascadingLoader::new(Backend::Document);
        let request = loader.select_database("main");

        let applied = loader.apply(LoadOutcome::Collections {
            ticket: request.ticket(),
            result: Ok(Vec::new()),
        });

        assert_eq!(applied, Applied::Settled);
        assert!(loader.state().collection().is_none());
        assert_eq!(loader.state().phase(), LoadPhase::Ready);
    }

    #[test]
    fn outcome_from_superseded_backend_is_discarded() {
        let mut loader = CascadingLoader::new(Backend::KeyValue);
        let slow = loader.select_backend(Backend::KeyValue);
        let fast = loader.select_backend(Backend::Vector);

        loader.apply(LoadOutcome::Databases {
            ticket: fast.ticket(),
            result: Ok(names(&["vectors"])),
        });

        let applied = loader.apply(LoadOutcome::Databases {
            ticket: slow.ticket(),
            result: Ok(names(&["kv0", "kv1"])),
        });

        assert_eq!(applied, Applied::Stale);
        assert_eq!(loader.state().backend(), Backend::Vector);
        assert_eq!(loader.state().databases(), names(&["vectors"]).as_slice());
    }

    #[test]
    fn database_failure_enters_error_and_clears_selector() {
        let mut loader = CascadingLoader::new(Backend::KeyValue);
        let request = loader.select_backend(Backend::KeyValue);

        let applied = loader.apply(LoadOutcome::Databases {
            ticket: request.ticket(),
            result: Err(StoreError::transport("connection refused")),
        });

        assert_eq!(applied, Applied::Settled);
        assert_eq!(loader.state().phase(), LoadPhase::Error(LoadStep::Databases));
        assert!(loader.state().database().is_none());
        assert!(loader.state().databases().is_empty());
        assert!(loader.state().last_error().is_some());
    }

    #[test]
    fn collection_failure_clears_collection_selector() {
        let mut loader = CascadingLoader::new(Backend::Document);
        let request = loader.select_database("main");

        loader.apply(LoadOutcome::Collections {
            ticket: request.ticket(),
            result: Err(StoreError::Status {
                status: 500,
                body: "boom".to_string(),
            }),
        });

        assert_eq!(
            loader.state().phase(),
            LoadPhase::Error(LoadStep::Collections)
        );
        assert!(loader.state().collection().is_none());
        assert_eq!(loader.state().database(), Some("main"));
    }

    #[test]
    fn search_keeps_phase_and_normalizes_blank_pattern() {
        let mut loader = CascadingLoader::new(Backend::KeyValue);
        assert!(loader.search("foo*").is_none());

        let request = loader.select_collection("users");
        loader.apply(LoadOutcome::Items {
            ticket: request.ticket(),
            result: Ok(vec![item("foo1", "users"), item("bar", "users")]),
        });

        let search = loader.search("  foo*  ").expect("collection is active");
        assert_eq!(loader.state().phase(), LoadPhase::Ready);
        assert_eq!(loader.state().search_pattern(), Some("foo*"));
        let LoadRequest::Items { pattern, .. } = &search else {
            panic!("search issues an items request");
        };
        assert_eq!(pattern.as_deref(), Some("foo*"));

        let all = loader.search("   ").unwrap();
        let LoadRequest::Items { pattern, .. } = &all else {
            panic!("search issues an items request");
        };
        assert!(pattern.is_none());
        assert!(loader.state().search_pattern().is_none());
    }

    #[test]
    fn reload_keeps_pattern_and_supersedes_pending_search() {
        let mut loader = CascadingLoader::new(Backend::KeyValue);
        loader.select_collection("users");
        let search = loader.search("a*").unwrap();
        let reload = loader.reload_items().unwrap();

        let LoadRequest::Items { pattern, .. } = &reload else {
            panic!("reload issues an items request");
        };
        assert_eq!(pattern.as_deref(), Some("a*"));

        let applied = loader.apply(LoadOutcome::Items {
            ticket: search.ticket(),
            result: Ok(Vec::new()),
        });
        assert_eq!(applied, Applied::Stale);
    }

    #[test]
    fn refresh_retries_from_deepest_selection() {
        let mut loader = CascadingLoader::new(Backend::KeyValue);
        assert_eq!(loader.refresh().step(), LoadStep::Databases);

        loader.select_database("db0");
        assert_eq!(loader.refresh().step(), LoadStep::Collections);
        assert_eq!(loader.state().database(), Some("db0"));

        loader.select_collection("users");
        assert_eq!(loader.refresh().step(), LoadStep::Items);
    }

    #[test]
    fn similarity_search_requires_vector_backend() {
        let mut loader = CascadingLoader::new(Backend::KeyValue);
        loader.select_collection("users");
        assert!(matches!(
            loader.similarity_search("cats", 5),
            Err(StoreError::Unsupported(_))
        ));

        loader.select_backend(Backend::Vector);
        assert!(loader.similarity_search("cats", 5).is_err());

        loader.select_collection("docs");
        let request = loader.similarity_search("cats", 5).unwrap();
        assert_eq!(request.query.collection, "docs");
        assert_eq!(request.query.n_results, 5);
    }

    #[test]
    fn similarity_results_dropped_after_selection_change() {
        let mut loader = CascadingLoader::new(Backend::Vector);
        loader.select_collection("docs");
        let request = loader.similarity_search("cats", 3).unwrap();

        loader.select_collection("other");
        let result = SearchResult {
            id: "1".to_string(),
            document: None,
            metadata: None,
            distance: Some(0.1),
        };
        assert!(!loader.apply_similarity(&request, vec![result]));
        assert!(loader.state().similarity_results().is_empty());
    }
}
