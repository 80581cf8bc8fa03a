//! Search backend capabilities
//!
//! The indexer talks to a full-text engine through two narrow roles: a
//! writer that accepts record batches and deletes, and a reader that runs
//! queries. Both must be usable from many tasks at once.
//!
//! Two implementations ship with the crate:
//!
//! - [`SolrClient`]: Solr over HTTP, selected by `search.index.url`
//! - [`EmbeddedIndex`]: an in-process Tantivy index

mod embedded;
mod solr;

pub use embedded::{EmbeddedConfig, EmbeddedIndex};
pub use solr::SolrClient;

use crate::error::BackendError;
use crate::search::{IndexRecord, QueryRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Query that matches every record
pub const MATCH_ALL_QUERY: &str = "*:*";

/// Result type for backend calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// One ranked match as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    /// Stored identifier of the matching record
    pub id: String,

    /// Relevance score, when the backend reports one
    pub score: Option<f32>,
}

/// A page of matches plus the total count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    pub total_matches: u64,
    pub matches: Vec<RawMatch>,
}

/// Write side of a search backend
#[async_trait]
pub trait SearchWriter: Send + Sync {
    /// Add or replace records, visible within `commit_within`
    async fn add_batch(&self, records: &[IndexRecord], commit_within: Duration) -> BackendResult<()>;

    /// Delete one record by identifier
    async fn delete_by_id(&self, id: &str, commit_within: Duration) -> BackendResult<()>;

    /// Delete every record matching `query`
    async fn delete_by_query(&self, query: &str) -> BackendResult<()>;

    /// Make pending changes visible
    async fn commit(&self) -> BackendResult<()>;
}

/// Read side of a search backend
#[async_trait]
pub trait SearchReader: Send + Sync {
    async fn query(&self, request: &QueryRequest) -> BackendResult<QueryResults>;
}
