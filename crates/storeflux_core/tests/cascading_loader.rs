use std::sync::{Arc, Mutex};
use storeflux_core::{Applied, Backend, CascadingLoader, LoadPhase, LoadStep, StoreError, drive};
use storeflux_test_support::fixtures::{sample_storage, storage_gateway};
use storeflux_test_support::{FakeFailure, FakeStorage, StorageCall, StorageOp};

fn keys(loader: &Mutex<CascadingLoader>) -> Vec<String> {
    loader
        .lock()
        .unwrap()
        .state()
        .items()
        .iter()
        .map(|item| item.key.clone())
        .collect()
}

#[tokio::test]
async fn selecting_backend_cascades_to_first_database_and_collection() {
    let fake = sample_storage();
    let (gateway, notifications) = storage_gateway(&fake);
    let loader = Mutex::new(CascadingLoader::new(Backend::KeyValue));

    let request = loader.lock().unwrap().select_backend(Backend::KeyValue);
    assert_eq!(drive(&loader, &gateway, request).await, Applied::Settled);

    {
        let loader = loader.lock().unwrap();
        let state = loader.state();
        assert_eq!(state.database(), Some("db0"));
        assert_eq!(state.collection(), Some("sessions"));
        assert_eq!(state.phase(), LoadPhase::Ready);
    }
    assert_eq!(keys(&loader), vec!["bar", "foo1", "foo2"]);

    assert!(fake.calls().contains(&StorageCall::ListCollections {
        backend: Backend::KeyValue,
        database: Some("db0".to_string()),
    }));
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn backend_switch_clears_selection_before_databases_arrive() {
    let fake = sample_storage();
    let (gateway, _) = storage_gateway(&fake);
    let loader = Arc::new(Mutex::new(CascadingLoader::new(Backend::KeyValue)));

    let request = loader.lock().unwrap().select_backend(Backend::KeyValue);
    drive(&loader, &gateway, request).await;
    assert!(!keys(&loader).is_empty());

    let gate = fake.gate(StorageCall::ListDatabases {
        backend: Backend::Document,
    });
    let request = loader.lock().unwrap().select_backend(Backend::Document);
    let pending = tokio::spawn({
        let loader = loader.clone();
        let gateway = gateway.clone();
        async move { drive(&loader, &gateway, request).await }
    });
    gate.entered().await;

    {
        let loader = loader.lock().unwrap();
        let state = loader.state();
        assert_eq!(state.backend(), Backend::Document);
        assert!(state.databases().is_empty());
        assert!(state.database().is_none());
        assert!(state.collections().is_empty());
        assert!(state.collection().is_none());
        assert!(state.items().is_empty());
        assert_eq!(state.phase(), LoadPhase::LoadingDatabases);
    }

    gate.release();
    assert_eq!(pending.await.unwrap(), Applied::Settled);
    assert_eq!(loader.lock().unwrap().state().collection(), Some("events"));
}

#[tokio::test]
async fn empty_database_list_skips_collection_fetch() {
    let fake = FakeStorage::new().with_databases(Backend::Document, &[]);
    let (gateway, _) = storage_gateway(&fake);
    let loader = Mutex::new(CascadingLoader::new(Backend::Document));

    let request = loader.lock().unwrap().select_backend(Backend::Document);
    drive(&loader, &gateway, request).await;

    let loader = loader.lock().unwrap();
    assert!(loader.state().collections().is_empty());
    assert!(loader.state().items().is_empty());
    assert_eq!(loader.state().phase(), LoadPhase::Ready);
    assert_eq!(fake.count(StorageOp::ListCollections), 0);
    assert_eq!(fake.count(StorageOp::List), 0);
}

#[tokio::test]
async fn late_response_for_previous_backend_is_discarded() {
    let fake = sample_storage();
    let (gateway, _) = storage_gateway(&fake);
    let loader = Arc::new(Mutex::new(CascadingLoader::new(Backend::KeyValue)));

    let gate = fake.gate(StorageCall::ListDatabases {
        backend: Backend::KeyValue,
    });
    let slow_request = loader.lock().unwrap().select_backend(Backend::KeyValue);
    let slow = tokio::spawn({
        let loader = loader.clone();
        let gateway = gateway.clone();
        async move { drive(&loader, &gateway, slow_request).await }
    });
    gate.entered().await;

    let fast_request = loader.lock().unwrap().select_backend(Backend::Vector);
    assert_eq!(
        drive(&loader, &gateway, fast_request).await,
        Applied::Settled
    );

    gate.release();
    assert_eq!(slow.await.unwrap(), Applied::Stale);

    let loader = loader.lock().unwrap();
    let state = loader.state();
    assert_eq!(state.backend(), Backend::Vector);
    assert_eq!(state.databases(), ["default".to_string()].as_slice());
    assert_eq!(state.collection(), Some("docs"));
    assert_eq!(fake.count(StorageOp::ListCollections), 1);
}

#[tokio::test]
async fn database_failure_enters_error_and_notifies() {
    let fake = sample_storage().with_failure(
        StorageOp::ListDatabases,
        FakeFailure::Transport("connection refused".to_string()),
    );
    let (gateway, notifications) = storage_gateway(&fake);
    let loader = Mutex::new(CascadingLoader::new(Backend::KeyValue));

    let request = loader.lock().unwrap().select_backend(Backend::KeyValue);
    drive(&loader, &gateway, request).await;

    {
        let loader = loader.lock().unwrap();
        assert_eq!(
            loader.state().phase(),
            LoadPhase::Error(LoadStep::Databases)
        );
        assert!(loader.state().database().is_none());
    }
    assert_eq!(notifications.error_count(), 1);

    fake.clear_failure(StorageOp::ListDatabases);
    let retry = loader.lock().unwrap().refresh();
    drive(&loader, &gateway, retry).await;
    assert_eq!(loader.lock().unwrap().state().phase(), LoadPhase::Ready);
}

#[tokio::test]
async fn pattern_search_filters_and_empty_pattern_lists_everything() {
    let fake = sample_storage();
    let (gateway, _) = storage_gateway(&fake);
    let loader = Mutex::new(CascadingLoader::new(Backend::KeyValue));

    let request = loader.lock().unwrap().select_backend(Backend::KeyValue);
    drive(&loader, &gateway, request).await;

    let search = loader.lock().unwrap().search("foo*").unwrap();
    drive(&loader, &gateway, search).await;
    assert_eq!(keys(&loader), vec!["foo1", "foo2"]);

    let search = loader.lock().unwrap().search("").unwrap();
    drive(&loader, &gateway, search).await;
    assert_eq!(keys(&loader), vec!["bar", "foo1", "foo2"]);

    assert_eq!(
        fake.calls()
            .into_iter()
            .filter(|call| matches!(call, StorageCall::List { .. }))
            .last(),
        Some(StorageCall::List {
            collection: "sessions".to_string(),
            pattern: None,
        })
    );
}

#[tokio::test]
async fn deleted_key_is_gone_after_reload() {
    let fake = sample_storage();
    let (gateway, notifications) = storage_gateway(&fake);
    let loader = Mutex::new(CascadingLoader::new(Backend::KeyValue));

    let request = loader.lock().unwrap().select_backend(Backend::KeyValue);
    drive(&loader, &gateway, request).await;

    assert!(gateway.delete("sessions", "foo1").await);
    let reload = loader.lock().unwrap().reload_items().unwrap();
    drive(&loader, &gateway, reload).await;

    assert_eq!(keys(&loader), vec!["bar", "foo2"]);
    assert!(gateway.list("sessions", None).await.iter().all(|k| k != "foo1"));
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn deleting_missing_key_reports_failure() {
    let fake = sample_storage();
    let (gateway, notifications) = storage_gateway(&fake);

    assert!(!gateway.delete("sessions", "nope").await);
    assert_eq!(notifications.error_count(), 1);
}

#[tokio::test]
async fn missing_key_on_get_is_silent() {
    let fake = sample_storage();
    let (gateway, notifications) = storage_gateway(&fake);

    assert!(gateway.get("sessions", "nope").await.is_none());
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn get_failure_during_hydration_enters_items_error() {
    let fake = sample_storage().with_failure(
        StorageOp::Get,
        FakeFailure::Transport("connection reset".to_string()),
    );
    let (gateway, notifications) = storage_gateway(&fake);
    let loader = Mutex::new(CascadingLoader::new(Backend::KeyValue));

    let request = loader.lock().unwrap().select_backend(Backend::KeyValue);
    assert_eq!(drive(&loader, &gateway, request).await, Applied::Settled);

    {
        let loader = loader.lock().unwrap();
        let state = loader.state();
        assert_eq!(state.phase(), LoadPhase::Error(LoadStep::Items));
        assert_eq!(state.collection(), Some("sessions"));
        assert!(state.items().is_empty());
        assert!(state.last_error().is_some());
    }
    assert_eq!(notifications.error_count(), 1);
    assert_eq!(fake.count(StorageOp::Get), 1);

    fake.clear_failure(StorageOp::Get);
    let retry = loader.lock().unwrap().refresh();
    drive(&loader, &gateway, retry).await;
    assert_eq!(keys(&loader), vec!["bar", "foo1", "foo2"]);
}

#[tokio::test]
async fn similarity_search_runs_on_vector_backend_only() {
    let fake = sample_storage();
    let (gateway, _) = storage_gateway(&fake);
    let loader = Mutex::new(CascadingLoader::new(Backend::Vector));

    let request = loader.lock().unwrap().select_backend(Backend::Vector);
    drive(&loader, &gateway, request).await;

    let search = loader.lock().unwrap().similarity_search("cats", 5).unwrap();
    let results = gateway.search(&search.query).await;
    assert!(loader.lock().unwrap().apply_similarity(&search, results));
    assert_eq!(
        loader.lock().unwrap().state().similarity_results()[0].id,
        "doc-1"
    );

    let request = loader.lock().unwrap().select_backend(Backend::Document);
    drive(&loader, &gateway, request).await;
    assert!(matches!(
        loader.lock().unwrap().similarity_search("cats", 5),
        Err(StoreError::Unsupported(_))
    ));
    assert_eq!(fake.count(StorageOp::Search), 1);
}
