use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use storeflux_core::{
    Backend, ItemValue, MutationAck, SearchResult, SetItemRequest, SimilarityQuery, StorageApi,
    StoreError,
};
use tokio::sync::Semaphore;

/// Failure injected into a fake call.
#[derive(Debug, Clone)]
pub enum FakeFailure {
    Transport(String),
    Status(u16, String),
}

impl FakeFailure {
    pub fn server_error(body: impl Into<String>) -> Self {
        Self::Status(500, body.into())
    }

    pub(crate) fn to_error(&self) -> StoreError {
        match self {
            Self::Transport(message) => StoreError::transport(message.clone()),
            Self::Status(status, body) => StoreError::Status {
                status: *status,
                body: body.clone(),
            },
        }
    }
}

/// Storage operation kind, used to target failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    ListDatabases,
    ListCollections,
    List,
    Get,
    Set,
    Delete,
    Search,
}

/// A recorded call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageCall {
    ListDatabases {
        backend: Backend,
    },
    ListCollections {
        backend: Backend,
        database: Option<String>,
    },
    List {
        collection: String,
        pattern: Option<String>,
    },
    Get {
        collection: String,
        key: String,
    },
    Set {
        collection: String,
        key: String,
    },
    Delete {
        collection: String,
        key: String,
    },
    Search {
        collection: String,
        query: String,
    },
}

impl StorageCall {
    pub fn op(&self) -> StorageOp {
        match self {
            Self::ListDatabases { .. } => StorageOp::ListDatabases,
            Self::ListCollections { .. } => StorageOp::ListCollections,
            Self::List { .. } => StorageOp::List,
            Self::Get { .. } => StorageOp::Get,
            Self::Set { .. } => StorageOp::Set,
            Self::Delete { .. } => StorageOp::Delete,
            Self::Search { .. } => StorageOp::Search,
        }
    }
}

/// Holds a fake response until the test releases it.
#[derive(Clone)]
pub struct FakeGate {
    entered: Arc<Semaphore>,
    open: Arc<Semaphore>,
}

impl FakeGate {
    fn new() -> Self {
        Self {
            entered: Arc::new(Semaphore::new(0)),
            open: Arc::new(Semaphore::new(0)),
        }
    }

    /// Resolves once the gated call is waiting.
    pub async fn entered(&self) {
        if let Ok(permit) = self.entered.acquire().await {
            permit.forget();
        }
    }

    pub fn release(&self) {
        self.open.add_permits(1);
    }

    async fn pass(&self) {
        self.entered.add_permits(1);
        if let Ok(permit) = self.open.acquire().await {
            permit.forget();
        }
    }
}

#[derive(Default)]
struct FakeStorageState {
    databases: RwLock<HashMap<Backend, Vec<String>>>,
    collections: RwLock<HashMap<(Backend, String), Vec<String>>>,
    items: RwLock<HashMap<String, BTreeMap<String, ItemValue>>>,
    search_results: RwLock<Vec<SearchResult>>,
    failures: RwLock<HashMap<StorageOp, FakeFailure>>,
    gates: Mutex<HashMap<StorageCall, FakeGate>>,
    calls: Mutex<Vec<StorageCall>>,
}

/// In-memory storage service.
///
/// Databases and collections are declared per backend; items live in a
/// collection namespace shared by every backend.
#[derive(Clone, Default)]
pub struct FakeStorage {
    state: Arc<FakeStorageState>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_databases(self, backend: Backend, databases: &[&str]) -> Self {
        rwlock_write(&self.state.databases).insert(backend, owned(databases));
        self
    }

    pub fn with_collections(self, backend: Backend, database: &str, collections: &[&str]) -> Self {
        rwlock_write(&self.state.collections)
            .insert((backend, database.to_string()), owned(collections));
        self
    }

    pub fn with_item(self, collection: &str, key: &str, value: ItemValue) -> Self {
        self.insert(collection, key, value);
        self
    }

    pub fn with_search_results(self, results: Vec<SearchResult>) -> Self {
        *rwlock_write(&self.state.search_results) = results;
        self
    }

    pub fn with_failure(self, op: StorageOp, failure: FakeFailure) -> Self {
        self.fail(op, failure);
        self
    }

    pub fn insert(&self, collection: &str, key: &str, value: ItemValue) {
        rwlock_write(&self.state.items)
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn value(&self, collection: &str, key: &str) -> Option<ItemValue> {
        rwlock_read(&self.state.items)
            .get(collection)
            .and_then(|items| items.get(key).cloned())
    }

    pub fn fail(&self, op: StorageOp, failure: FakeFailure) {
        rwlock_write(&self.state.failures).insert(op, failure);
    }

    pub fn clear_failure(&self, op: StorageOp) {
        rwlock_write(&self.state.failures).remove(&op);
    }

    /// Holds the next call matching `call` until the returned gate is released.
    pub fn gate(&self, call: StorageCall) -> FakeGate {
        let gate = FakeGate::new();
        mutex_lock(&self.state.gates).insert(call, gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        mutex_lock(&self.state.calls).clone()
    }

    pub fn count(&self, op: StorageOp) -> usize {
        mutex_lock(&self.state.calls)
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    pub fn as_api_arc(self) -> Arc<dyn StorageApi> {
        Arc::new(self)
    }

    async fn enter(&self, call: StorageCall) -> Result<(), StoreError> {
        let op = call.op();
        mutex_lock(&self.state.calls).push(call.clone());

        let gate = mutex_lock(&self.state.gates).remove(&call);
        if let Some(gate) = gate {
            gate.pass().await;
        }

        match rwlock_read(&self.state.failures).get(&op) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StorageApi for FakeStorage {
    async fn list_databases(&self, backend: Backend) -> Result<Vec<String>, StoreError> {
        self.enter(StorageCall::ListDatabases { backend }).await?;

        Ok(rwlock_read(&self.state.databases)
            .get(&backend)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_collections(
        &self,
        backend: Backend,
        database: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        self.enter(StorageCall::ListCollections {
            backend,
            database: database.map(str::to_string),
        })
        .await?;

        let collections = rwlock_read(&self.state.collections);
        let found = match database {
            Some(database) => collections.get(&(backend, database.to_string())).cloned(),
            None => {
                let mut all: Vec<String> = collections
                    .iter()
                    .filter(|((b, _), _)| *b == backend)
                    .flat_map(|(_, names)| names.iter().cloned())
                    .collect();
                all.sort();
                all.dedup();
                Some(all)
            }
        };

        Ok(found.unwrap_or_default())
    }

    async fn list(
        &self,
        collection: &str,
        pattern: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        self.enter(StorageCall::List {
            collection: collection.to_string(),
            pattern: pattern.map(str::to_string),
        })
        .await?;

        let items = rwlock_read(&self.state.items);
        let keys = items
            .get(collection)
            .map(|items| {
                items
                    .keys()
                    .filter(|key| pattern.is_none_or(|pattern| glob_match(pattern, key)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(keys)
    }

    async fn get(&self, collection: &str, key: &str) -> Result<ItemValue, StoreError> {
        self.enter(StorageCall::Get {
            collection: collection.to_string(),
            key: key.to_string(),
        })
        .await?;

        self.value(collection, key).ok_or(StoreError::NotFound)
    }

    async fn set(&self, request: &SetItemRequest) -> Result<MutationAck, StoreError> {
        self.enter(StorageCall::Set {
            collection: request.collection.clone(),
            key: request.key.clone(),
        })
        .await?;

        self.insert(&request.collection, &request.key, request.value.clone());

        Ok(MutationAck {
            status: "ok".to_string(),
            key: request.key.clone(),
        })
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<MutationAck, StoreError> {
        self.enter(StorageCall::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
        })
        .await?;

        let removed = rwlock_write(&self.state.items)
            .get_mut(collection)
            .and_then(|items| items.remove(key));

        match removed {
            Some(_) => Ok(MutationAck {
                status: "deleted".to_string(),
                key: key.to_string(),
            }),
            None => Err(StoreError::NotFound),
        }
    }

    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<SearchResult>, StoreError> {
        self.enter(StorageCall::Search {
            collection: query.collection.clone(),
            query: query.query.clone(),
        })
        .await?;

        let mut results = rwlock_read(&self.state.search_results).clone();
        results.truncate(query.n_results as usize);
        Ok(results)
    }
}

/// Redis-style glob: `*` matches any run, `?` a single character.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let mut source = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    Regex::new(&source)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn mutex_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poison| poison.into_inner())
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poison| poison.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_stars_and_single_chars() {
        assert!(glob_match("foo*", "foo"));
        assert!(glob_match("foo*", "foobar"));
        assert!(!glob_match("foo*", "barfoo"));
        assert!(glob_match("user:?", "user:1"));
        assert!(!glob_match("user:?", "user:10"));
        assert!(glob_match("*:1*", "user:10"));
        assert!(glob_match("a.b*", "a.bc"));
        assert!(!glob_match("a.b*", "axbc"));
    }
}
