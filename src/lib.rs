//! Document indexer and query service
//!
//! Flattens nested JSON documents into search records, keeps a full-text
//! aggregate of their `languageText` leaves, and answers paginated,
//! entity-filtered queries against Solr or an embedded Tantivy index.

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod search;

pub use config::Config;
pub use error::{BackendError, IndexError, Result};
pub use models::{Document, DocumentKey, SearchResponse, SearchResult};
pub use search::{SearchIndex, SearchIndexOptions, SearchIndexOptionsBuilder};
