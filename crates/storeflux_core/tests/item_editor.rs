use serde_json::json;
use std::sync::Mutex;
use storeflux_core::{
    EditorMode, Item, ItemEditor, ItemValue, NotificationLevel, StructuredValuePolicy, submit,
};
use storeflux_test_support::fixtures::{sample_storage, storage_gateway};
use storeflux_test_support::{FakeFailure, StorageOp};

fn editor_with(key: &str, value: &str) -> Mutex<ItemEditor> {
    let mut editor = ItemEditor::default();
    editor.open_create();
    editor.set_key(key);
    editor.set_value(value);
    Mutex::new(editor)
}

#[tokio::test]
async fn json_input_is_stored_as_structured_value() {
    let fake = sample_storage();
    let (gateway, notifications) = storage_gateway(&fake);
    let editor = editor_with("k", "{\"a\":1}");

    assert!(submit(&editor, &gateway, Some("users")).await);

    assert_eq!(
        fake.value("users", "k"),
        Some(ItemValue::Structured(json!({"a": 1})))
    );
    assert!(!editor.lock().unwrap().is_open());
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn invalid_json_aborts_and_keeps_form() {
    let fake = sample_storage();
    let (gateway, notifications) = storage_gateway(&fake);
    let editor = editor_with("k", "{invalid");

    assert!(!submit(&editor, &gateway, Some("users")).await);

    assert_eq!(fake.count(StorageOp::Set), 0);
    let editor = editor.lock().unwrap();
    assert!(editor.is_open());
    assert_eq!(editor.key(), "k");
    assert_eq!(editor.value(), "{invalid");

    let raised = notifications.drain();
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].level, NotificationLevel::Warning);
}

#[tokio::test]
async fn invalid_json_is_stored_as_text_with_fallback_policy() {
    let fake = sample_storage();
    let (gateway, _) = storage_gateway(&fake);
    let editor = Mutex::new(ItemEditor::new(StructuredValuePolicy::FallbackToText));
    {
        let mut editor = editor.lock().unwrap();
        editor.open_create();
        editor.set_key("k");
        editor.set_value("{invalid");
    }

    assert!(submit(&editor, &gateway, Some("users")).await);
    assert_eq!(fake.value("users", "k"), Some(ItemValue::text("{invalid")));
}

#[tokio::test]
async fn plain_text_is_stored_literally() {
    let fake = sample_storage();
    let (gateway, _) = storage_gateway(&fake);
    let editor = editor_with("greeting", "hello");

    assert!(submit(&editor, &gateway, Some("sessions")).await);
    assert_eq!(
        fake.value("sessions", "greeting"),
        Some(ItemValue::text("hello"))
    );
}

#[tokio::test]
async fn server_failure_keeps_form_and_notifies_error() {
    let fake = sample_storage().with_failure(StorageOp::Set, FakeFailure::server_error("disk full"));
    let (gateway, notifications) = storage_gateway(&fake);
    let editor = editor_with("k", "v");

    assert!(!submit(&editor, &gateway, Some("users")).await);

    let editor = editor.lock().unwrap();
    assert!(editor.is_open());
    assert!(!editor.is_saving());
    assert_eq!(editor.error(), Some("Save failed"));
    assert_eq!(notifications.error_count(), 1);
}

#[tokio::test]
async fn editing_overwrites_existing_key() {
    let fake = sample_storage();
    let (gateway, _) = storage_gateway(&fake);

    let item = Item::new(
        "user:1",
        fake.value("users", "user:1").unwrap(),
        "users",
    );
    let editor = Mutex::new(ItemEditor::default());
    {
        let mut editor = editor.lock().unwrap();
        editor.open_edit(&item);
        assert!(matches!(editor.mode(), EditorMode::Edit { .. }));
        editor.set_value("{\"name\": \"Grace\"}");
    }

    assert!(submit(&editor, &gateway, Some("users")).await);
    assert_eq!(
        fake.value("users", "user:1"),
        Some(ItemValue::Structured(json!({"name": "Grace"})))
    );
}
