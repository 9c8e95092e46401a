use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Value stored under a key.
///
/// The wire format is a bare JSON value: strings round-trip as [`ItemValue::Text`],
/// anything else (objects, arrays, numbers, booleans, null) is kept as
/// [`ItemValue::Structured`] so it can be re-serialized unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemValue {
    Text(String),
    Structured(JsonValue),
}

impl ItemValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Text shown in an edit field: literal strings as-is, structured values pretty-printed.
    pub fn as_editable(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Structured(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
        }
    }

    /// Single-line preview for list rows.
    pub fn as_display_string_truncated(&self, max_len: usize) -> String {
        let full = match self {
            Self::Text(s) => s.clone(),
            Self::Structured(v) => v.to_string(),
        };

        crate::truncate_string_safe(&full.replace('\n', " "), max_len)
    }
}

impl From<JsonValue> for ItemValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }
}

/// A record in the active collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    pub value: ItemValue,
    pub collection: String,
}

impl Item {
    pub fn new(key: impl Into<String>, value: ItemValue, collection: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value,
            collection: collection.into(),
        }
    }
}

/// Body of `POST /storage/set`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetItemRequest {
    pub key: String,
    pub value: ItemValue,
    pub collection: String,
}

impl SetItemRequest {
    pub fn new(key: impl Into<String>, value: ItemValue, collection: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value,
            collection: collection.into(),
        }
    }
}

/// Acknowledgement returned by set and delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub key: String,
}

/// Body of `POST /storage/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityQuery {
    pub query: String,
    pub collection: String,
    pub n_results: u32,
}

impl SimilarityQuery {
    pub fn new(query: impl Into<String>, collection: impl Into<String>, n_results: u32) -> Self {
        Self {
            query: query.into(),
            collection: collection.into(),
            n_results,
        }
    }
}

/// A hit from the vector backend's similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
    #[serde(default)]
    pub distance: Option<f64>,
}
