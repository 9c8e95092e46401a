use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

use crate::{Item, ItemValue, SetItemRequest, StorageGateway, lock};

/// What to do when a value looks like JSON but does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredValuePolicy {
    /// Abort the save and keep the form populated.
    #[default]
    Strict,
    /// Store the raw input as a literal string.
    FallbackToText,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("Key is required")]
    EmptyKey,

    #[error("No collection selected")]
    NoCollection,

    #[error("Invalid JSON value: {0}")]
    InvalidStructuredValue(String),
}

/// Turns free-text input into a stored value.
///
/// Input whose trimmed form starts with `{` or `[` must parse as JSON;
/// anything else is stored verbatim as a string.
pub fn parse_value(raw: &str, policy: StructuredValuePolicy) -> Result<ItemValue, EditorError> {
    let trimmed = raw.trim();

    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Ok(ItemValue::Text(raw.to_string()));
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => Ok(ItemValue::Structured(value)),
        Err(err) => match policy {
            StructuredValuePolicy::Strict => {
                Err(EditorError::InvalidStructuredValue(err.to_string()))
            }
            StructuredValuePolicy::FallbackToText => {
                log::debug!("Storing unparsable JSON-like value as text: {}", err);
                Ok(ItemValue::Text(raw.to_string()))
            }
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Create,
    /// The key is fixed to the item being edited.
    Edit { original_key: String },
}

/// Form state behind the add/edit item modal.
#[derive(Debug, Clone, Default)]
pub struct ItemEditor {
    open: bool,
    mode: EditorMode,
    key: String,
    value: String,
    error: Option<String>,
    saving: bool,
    policy: StructuredValuePolicy,
}

impl ItemEditor {
    pub fn new(policy: StructuredValuePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn policy(&self) -> StructuredValuePolicy {
        self.policy
    }

    pub fn open_create(&mut self) {
        self.reset();
        self.open = true;
    }

    pub fn open_edit(&mut self, item: &Item) {
        self.reset();
        self.mode = EditorMode::Edit {
            original_key: item.key.clone(),
        };
        self.key = item.key.clone();
        self.value = item.value.as_editable();
        self.open = true;
    }

    pub fn close(&mut self) {
        self.reset();
    }

    /// Ignored while editing an existing item.
    pub fn set_key(&mut self, key: impl Into<String>) {
        if matches!(self.mode, EditorMode::Create) {
            self.key = key.into();
            self.error = None;
        }
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.error = None;
    }

    /// Validates the form into a set request for `collection`.
    pub fn prepare(&self, collection: Option<&str>) -> Result<SetItemRequest, EditorError> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(EditorError::EmptyKey);
        }

        let collection = collection.ok_or(EditorError::NoCollection)?;
        let value = parse_value(&self.value, self.policy)?;

        Ok(SetItemRequest::new(key, value, collection))
    }

    /// Starts a save. On validation failure records the error, keeps the form
    /// populated, and returns `None`.
    pub fn begin_save(&mut self, collection: Option<&str>) -> Option<SetItemRequest> {
        match self.prepare(collection) {
            Ok(request) => {
                self.error = None;
                self.saving = true;
                Some(request)
            }
            Err(err) => {
                self.error = Some(err.to_string());
                None
            }
        }
    }

    /// Completes a save: success clears and closes the form, failure leaves it
    /// populated.
    pub fn finish_save(&mut self, saved: bool) {
        self.saving = false;

        if saved {
            self.reset();
        } else {
            self.error = Some("Save failed".to_string());
        }
    }

    fn reset(&mut self) {
        let policy = self.policy;
        *self = Self::new(policy);
    }
}

/// Validates and submits the editor through the gateway.
///
/// Returns `true` when the item was stored. The editor lock is never held
/// across the request.
pub async fn submit(
    editor: &Mutex<ItemEditor>,
    gateway: &StorageGateway,
    collection: Option<&str>,
) -> bool {
    let request = {
        let mut editor = lock(editor);
        match editor.begin_save(collection) {
            Some(request) => request,
            None => {
                if let Some(error) = editor.error() {
                    gateway.notifier().warning(error.to_string());
                }
                return false;
            }
        }
    };

    let saved = gateway.set(&request).await;
    lock(editor).finish_save(saved);
    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_object_is_parsed() {
        let value = parse_value("{\"a\":1}", StructuredValuePolicy::Strict).unwrap();
        assert_eq!(value, ItemValue::Structured(json!({"a": 1})));
    }

    #[test]
    fn json_array_with_surrounding_whitespace_is_parsed() {
        let value = parse_value("  [1, 2]\n", StructuredValuePolicy::Strict).unwrap();
        assert_eq!(value, ItemValue::Structured(json!([1, 2])));
    }

    #[test]
    fn invalid_json_is_rejected_in_strict_mode() {
        let err = parse_value("{invalid", StructuredValuePolicy::Strict).unwrap_err();
        assert!(matches!(err, EditorError::InvalidStructuredValue(_)));
    }

    #[test]
    fn invalid_json_falls_back_when_configured() {
        let value = parse_value("{invalid", StructuredValuePolicy::FallbackToText).unwrap();
        assert_eq!(value, ItemValue::text("{invalid"));
    }

    #[test]
    fn plain_text_is_stored_literally() {
        assert_eq!(
            parse_value("hello", StructuredValuePolicy::Strict).unwrap(),
            ItemValue::text("hello")
        );
        assert_eq!(
            parse_value("42", StructuredValuePolicy::Strict).unwrap(),
            ItemValue::text("42")
        );
    }

    #[test]
    fn key_is_trimmed_and_required() {
        let mut editor = ItemEditor::default();
        editor.open_create();
        editor.set_key("   ");
        editor.set_value("v");
        assert_eq!(editor.prepare(Some("users")), Err(EditorError::EmptyKey));

        editor.set_key("  name ");
        let request = editor.prepare(Some("users")).unwrap();
        assert_eq!(request.key, "name");
        assert_eq!(request.collection, "users");
    }

    #[test]
    fn collection_is_required() {
        let mut editor = ItemEditor::default();
        editor.set_key("k");
        assert_eq!(editor.prepare(None), Err(EditorError::NoCollection));
    }

    #[test]
    fn failed_validation_keeps_form_populated() {
        let mut editor = ItemEditor::default();
        editor.open_create();
        editor.set_key("k");
        editor.set_value("{invalid");

        assert!(editor.begin_save(Some("users")).is_none());
        assert!(editor.is_open());
        assert_eq!(editor.value(), "{invalid");
        assert!(editor.error().unwrap().starts_with("Invalid JSON value"));
    }

    #[test]
    fn successful_save_clears_and_closes() {
        let mut editor = ItemEditor::new(StructuredValuePolicy::FallbackToText);
        editor.open_create();
        editor.set_key("k");
        editor.set_value("v");

        assert!(editor.begin_save(Some("users")).is_some());
        assert!(editor.is_saving());
        editor.finish_save(true);

        assert!(!editor.is_open());
        assert!(editor.key().is_empty());
        assert_eq!(editor.policy(), StructuredValuePolicy::FallbackToText);
    }

    #[test]
    fn failed_save_leaves_form_populated() {
        let mut editor = ItemEditor::default();
        editor.open_create();
        editor.set_key("k");
        editor.set_value("v");

        editor.begin_save(Some("users"));
        editor.finish_save(false);

        assert!(editor.is_open());
        assert_eq!(editor.key(), "k");
        assert_eq!(editor.error(), Some("Save failed"));
    }

    #[test]
    fn edit_mode_locks_key_and_prefills_value() {
        let item = Item::new("user:1", ItemValue::Structured(json!({"a": 1})), "users");
        let mut editor = ItemEditor::default();
        editor.open_edit(&item);

        editor.set_key("other");
        assert_eq!(editor.key(), "user:1");
        assert_eq!(
            editor.mode(),
            &EditorMode::Edit {
                original_key: "user:1".to_string()
            }
        );

        let request = editor.prepare(Some("users")).unwrap();
        assert_eq!(request.value, ItemValue::Structured(json!({"a": 1})));
    }
}
