use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies one version of one document
///
/// Equality is structural: two keys whose versions denote the same instant
/// under different offsets are different keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Namespace the document lives in
    pub namespace: String,

    /// Entity (document type) name
    pub entity: String,

    /// Document identifier within the entity
    pub id: String,

    /// Version timestamp, always carrying an explicit offset
    pub version: DateTime<FixedOffset>,
}

impl DocumentKey {
    pub fn new(
        namespace: impl Into<String>,
        entity: impl Into<String>,
        id: impl Into<String>,
        version: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            entity: entity.into(),
            id: id.into(),
            version,
        }
    }
}

impl PartialEq for DocumentKey {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.entity == other.entity
            && self.id == other.id
            && self.version == other.version
            && self.version.offset() == other.version.offset()
    }
}

impl Eq for DocumentKey {}

impl Hash for DocumentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.entity.hash(state);
        self.id.hash(state);
        self.version.timestamp().hash(state);
        self.version.timestamp_subsec_nanos().hash(state);
        self.version.offset().local_minus_utc().hash(state);
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}@{}",
            self.namespace,
            self.entity,
            self.id,
            self.version.to_rfc3339()
        )
    }
}

/// A versioned JSON document as handed over by the storage layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub key: DocumentKey,
    pub content: Value,
}

impl Document {
    pub fn new(key: DocumentKey, content: Value) -> Self {
        Self { key, content }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn content(&self) -> &Value {
        &self.content
    }
}
