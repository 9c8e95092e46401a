use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::StoreError;

/// Storage engine family served by the backend service.
///
/// The set is closed: the service exposes exactly these three engines, and
/// every engine-specific behavior is expressed through [`BackendCapabilities`]
/// instead of comparing names at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Backend {
    #[default]
    #[serde(rename = "key-value")]
    KeyValue,

    #[serde(rename = "document")]
    Document,

    #[serde(rename = "vector")]
    Vector,
}

impl Backend {
    pub const ALL: &'static [Backend] = &[Backend::KeyValue, Backend::Document, Backend::Vector];

    /// Identifier sent as the `backend` query parameter.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Backend::KeyValue => "key-value",
            Backend::Document => "document",
            Backend::Vector => "vector",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::KeyValue => "Key-Value",
            Backend::Document => "Document",
            Backend::Vector => "Vector",
        }
    }

    /// Name used for the collection level in selector labels.
    pub fn container_name(&self) -> &'static str {
        match self {
            Backend::KeyValue => "Namespace",
            Backend::Document => "Collection",
            Backend::Vector => "Collection",
        }
    }

    /// Name used for individual records in this backend.
    pub fn record_name(&self) -> &'static str {
        match self {
            Backend::KeyValue => "Keys",
            Backend::Document => "Documents",
            Backend::Vector => "Embeddings",
        }
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        match self {
            Backend::KeyValue => BackendCapabilities::KEYVALUE_BASE,
            Backend::Document => BackendCapabilities::DOCUMENT_BASE,
            Backend::Vector => BackendCapabilities::VECTOR_BASE,
        }
    }

    pub fn supports(&self, capability: BackendCapabilities) -> bool {
        self.capabilities().contains(capability)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Backend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "key-value" | "keyvalue" | "kv" => Ok(Backend::KeyValue),
            "document" | "doc" => Ok(Backend::Document),
            "vector" => Ok(Backend::Vector),
            other => Err(StoreError::InvalidConfig(format!(
                "unknown backend '{}'",
                other
            ))),
        }
    }
}

bitflags! {
    /// Features a backend may offer to the browser.
    ///
    /// The browser queries these flags before enabling a feature instead of
    /// matching on the backend tag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BackendCapabilities: u32 {
        /// Backend hosts more than one logical database.
        /// The database selector is shown.
        const MULTIPLE_DATABASES = 1 << 0;

        /// Key listing accepts a glob-style pattern.
        const PATTERN_SEARCH = 1 << 1;

        /// Backend answers similarity queries over stored documents.
        const SIMILARITY_SEARCH = 1 << 2;
    }
}

impl BackendCapabilities {
    pub const KEYVALUE_BASE: Self = Self::from_bits_truncate(
        Self::MULTIPLE_DATABASES.bits() | Self::PATTERN_SEARCH.bits(),
    );

    pub const DOCUMENT_BASE: Self = Self::from_bits_truncate(
        Self::MULTIPLE_DATABASES.bits() | Self::PATTERN_SEARCH.bits(),
    );

    pub const VECTOR_BASE: Self =
        Self::from_bits_truncate(Self::PATTERN_SEARCH.bits() | Self::SIMILARITY_SEARCH.bits());
}
