use std::sync::{Mutex, MutexGuard};
use storeflux_core::{EditorMode, Item, ItemEditor, StorageGateway, StructuredValuePolicy, submit};

/// The add/edit item form shown over the browser.
pub struct ItemModal {
    editor: Mutex<ItemEditor>,
}

impl ItemModal {
    pub fn new(policy: StructuredValuePolicy) -> Self {
        Self {
            editor: Mutex::new(ItemEditor::new(policy)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.editor().is_open()
    }

    pub fn open_create(&self, key: &str, value: &str) {
        let mut editor = self.editor();
        editor.open_create();
        editor.set_key(key);
        editor.set_value(value);
    }

    pub fn open_edit(&self, item: &Item, value: &str) {
        let mut editor = self.editor();
        editor.open_edit(item);
        editor.set_value(value);
    }

    pub fn close(&self) {
        self.editor().close();
    }

    /// Submits the form into `collection`. The form stays open on failure.
    pub async fn save(&self, gateway: &StorageGateway, collection: Option<&str>) -> bool {
        submit(&self.editor, gateway, collection).await
    }

    pub fn title(&self) -> String {
        match self.editor().mode() {
            EditorMode::Create => "New item".to_string(),
            EditorMode::Edit { original_key } => format!("Edit {}", original_key),
        }
    }

    /// Snapshot of the form for rendering.
    pub fn form(&self) -> ItemEditor {
        self.editor().clone()
    }

    fn editor(&self) -> MutexGuard<'_, ItemEditor> {
        storeflux_core::lock(&self.editor)
    }
}
