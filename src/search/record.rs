//! Field selection and index record assembly

use crate::models::DocumentKey;
use crate::search::flatten::{FieldType, FlattenedDocument, FlattenedField};
use crate::search::identifier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Name of the identifier field
pub const ID_FIELD: &str = "id";

/// Name of the entity field
pub const ENTITY_FIELD: &str = "entity";

/// Name of the aggregated full-text field, also the default query field
pub const DEFAULT_SEARCH_FIELD: &str = "searchfield";

/// Path marker that flags a string leaf as free text
pub const LANGUAGE_TEXT_MARKER: &str = "languageText";

/// Decides which flattened leaves become searchable fields
pub trait FieldSelector: Send + Sync {
    fn is_searchable(&self, field: &FlattenedField) -> bool;
}

/// Indexes string leaves whose path contains `languageText`
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageTextSelector;

impl FieldSelector for LanguageTextSelector {
    fn is_searchable(&self, field: &FlattenedField) -> bool {
        field.field_type == FieldType::String && field.path.contains(LANGUAGE_TEXT_MARKER)
    }
}

/// Indexes string leaves at an explicit set of paths
#[derive(Debug, Clone, Default)]
pub struct DeclaredPathSelector {
    paths: HashSet<String>,
}

impl DeclaredPathSelector {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl FieldSelector for DeclaredPathSelector {
    fn is_searchable(&self, field: &FlattenedField) -> bool {
        field.field_type == FieldType::String && self.paths.contains(&field.path)
    }
}

/// The backend-neutral record written for one document version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Encoded document key
    pub identifier: String,

    /// Entity name, used for filtering
    pub entity: String,

    /// Searchable fields by path
    pub fields: BTreeMap<String, String>,

    /// Values aggregated into the full-text field
    pub full_text: Vec<String>,
}

/// Builds index records from flattened documents
#[derive(Clone)]
pub struct RecordBuilder {
    selector: Arc<dyn FieldSelector>,
}

impl RecordBuilder {
    pub fn new(selector: Arc<dyn FieldSelector>) -> Self {
        Self { selector }
    }

    pub fn build(&self, key: &DocumentKey, flattened: &FlattenedDocument) -> IndexRecord {
        let mut fields = BTreeMap::new();
        let mut full_text = Vec::new();

        for field in flattened.fields() {
            if !self.selector.is_searchable(field) {
                continue;
            }
            if let Some(text) = field.as_str() {
                fields.insert(field.path.clone(), text.to_string());
                full_text.push(text.to_string());
            }
        }

        IndexRecord {
            identifier: identifier::encode(key),
            entity: key.entity.clone(),
            fields,
            full_text,
        }
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(Arc::new(LanguageTextSelector))
    }
}

impl std::fmt::Debug for RecordBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordBuilder").finish_non_exhaustive()
    }
}
