use crate::models::DocumentKey;
use serde::{Deserialize, Serialize};

/// A single ranked search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub key: DocumentKey,
}

impl SearchResult {
    pub fn new(key: DocumentKey) -> Self {
        Self { key }
    }

    pub fn document_key(&self) -> &DocumentKey {
        &self.key
    }
}

/// Search response with ranked results and pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Total number of matches reported by the backend (before pagination)
    pub total_hits: u64,

    /// Results in backend rank order
    pub results: Vec<SearchResult>,

    /// Offset used for pagination
    pub offset: u64,

    /// Page size requested
    pub page_size: u64,
}

impl SearchResponse {
    pub fn empty(offset: u64, page_size: u64) -> Self {
        Self {
            total_hits: 0,
            results: Vec::new(),
            offset,
            page_size,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &DocumentKey> {
        self.results.iter().map(|r| &r.key)
    }
}
