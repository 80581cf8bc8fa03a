//! Document indexing and entity-scoped full-text search
//!
//! Documents are arbitrary JSON trees addressed by a [`DocumentKey`]. Indexing
//! turns each one into a flat record:
//!
//! ```text
//! ┌──────────────┐   flatten    ┌───────────────────┐  select   ┌──────────────┐
//! │ JSON content │ ───────────▶ │ path → leaf value │ ────────▶ │ IndexRecord  │
//! └──────────────┘              └───────────────────┘           └──────┬───────┘
//!                                                                      │
//!                                  id = namespace/entity/id/version    ▼
//!                                                               ┌──────────────┐
//!                                                               │ SearchWriter │
//!                                                               └──────────────┘
//! ```
//!
//! String leaves whose path contains `languageText` are copied into the
//! `searchfield` aggregate, which is the default field for queries. Queries
//! may be restricted to a set of entity types and are always paginated.
//!
//! # Example
//!
//! ```no_run
//! use document_search_index::backend::EmbeddedIndex;
//! use document_search_index::models::{Document, DocumentKey};
//! use document_search_index::search::SearchIndex;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let index = SearchIndex::embedded(EmbeddedIndex::in_memory()?);
//!
//! let key = DocumentKey::new(
//!     "data",
//!     "UnitDataSet",
//!     "b9c10b86-5867-4270-b56e-ee7439fe381e",
//!     chrono::DateTime::parse_from_rfc3339("2018-01-01T00:00:00+01:00")?,
//! );
//! index
//!     .upsert(&Document::new(key, json!({"name": [{"languageText": "Norway"}]})))
//!     .await?;
//!
//! let entities = vec!["UnitDataSet".to_string()];
//! let response = index.search("Norway", Some(entities.as_slice()), 0, 10).await?;
//! for hit in &response.results {
//!     println!("{}", hit.document_key());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`DocumentKey`]: crate::models::DocumentKey

mod flatten;
pub mod identifier;
mod options;
mod query;
mod record;
mod service;

pub use flatten::{flatten, FieldType, FlattenedDocument, FlattenedField, DEFAULT_MAX_DEPTH};
pub use options::{SearchIndexOptions, SearchIndexOptionsBuilder, DEFAULT_COMMIT_WITHIN};
pub use query::{QueryBuilder, QueryRequest};
pub use record::{
    DeclaredPathSelector, FieldSelector, IndexRecord, LanguageTextSelector, RecordBuilder,
    DEFAULT_SEARCH_FIELD, ENTITY_FIELD, ID_FIELD, LANGUAGE_TEXT_MARKER,
};
pub use service::SearchIndex;
