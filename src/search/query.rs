//! Search query building

use crate::search::record::{DEFAULT_SEARCH_FIELD, ENTITY_FIELD, LANGUAGE_TEXT_MARKER};
use serde::{Deserialize, Serialize};

/// Backend-agnostic query request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Free text, as given by the caller
    pub text: String,

    /// Entity names the results are restricted to (empty: unrestricted)
    pub entity_filters: Vec<String>,

    /// Field the free text is matched against
    pub default_field: String,

    /// Whether highlighting is requested
    pub highlight: bool,

    /// Field-name pattern to highlight
    pub highlight_fields: String,

    /// Offset of the first result
    pub start: u64,

    /// Number of results to return
    pub rows: u64,
}

impl QueryRequest {
    /// Render the full query string: text plus the OR'd entity clause
    pub fn query_string(&self) -> String {
        let mut query = self.text.clone();
        if !self.entity_filters.is_empty() {
            let clause = self
                .entity_filters
                .iter()
                .map(|name| format!("{}:{}", ENTITY_FIELD, name))
                .collect::<Vec<_>>()
                .join(" OR ");
            query.push_str(" AND (");
            query.push_str(&clause);
            query.push(')');
        }
        query
    }

    pub fn is_filtered(&self) -> bool {
        !self.entity_filters.is_empty()
    }
}

/// Builds query requests
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    default_field: String,
    highlight: bool,
    highlight_fields: String,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            default_field: DEFAULT_SEARCH_FIELD.to_string(),
            highlight: true,
            highlight_fields: format!("*{}", LANGUAGE_TEXT_MARKER),
        }
    }

    /// Enable/disable highlighting
    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    /// Build a request. `None` and an empty slice both mean "all entities".
    pub fn build(
        &self,
        text: &str,
        entity_filters: Option<&[String]>,
        offset: u64,
        limit: u64,
    ) -> QueryRequest {
        QueryRequest {
            text: text.to_string(),
            entity_filters: entity_filters.map(<[String]>::to_vec).unwrap_or_default(),
            default_field: self.default_field.clone(),
            highlight: self.highlight,
            highlight_fields: self.highlight_fields.clone(),
            start: offset,
            rows: limit,
        }
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
