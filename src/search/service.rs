//! Main search index service

use crate::backend::{EmbeddedIndex, SearchReader, SearchWriter, SolrClient, MATCH_ALL_QUERY};
use crate::config::{Config, SEARCH_PROVIDER_ID};
use crate::error::{BackendError, IndexError, Result};
use crate::models::{Document, SearchResponse, SearchResult};
use crate::search::flatten::flatten;
use crate::search::identifier;
use crate::search::options::SearchIndexOptions;
use crate::search::query::QueryBuilder;
use crate::search::record::{IndexRecord, RecordBuilder};
use std::sync::Arc;

/// Indexes documents into a search backend and answers entity-scoped queries
///
/// Cloning is cheap; clones share the same backend capabilities.
#[derive(Clone)]
pub struct SearchIndex {
    writer: Arc<dyn SearchWriter>,
    reader: Arc<dyn SearchReader>,
    record_builder: RecordBuilder,
    query_builder: QueryBuilder,
    options: SearchIndexOptions,
}

impl SearchIndex {
    /// Create a search index over the given write and read capabilities
    pub fn new(writer: Arc<dyn SearchWriter>, reader: Arc<dyn SearchReader>) -> Self {
        Self::with_options(writer, reader, SearchIndexOptions::default())
    }

    pub fn with_options(
        writer: Arc<dyn SearchWriter>,
        reader: Arc<dyn SearchReader>,
        options: SearchIndexOptions,
    ) -> Self {
        tracing::info!(
            max_depth = options.max_depth,
            commit_within_ms = options.commit_within.as_millis() as u64,
            "Initializing search index"
        );

        Self {
            writer,
            reader,
            record_builder: RecordBuilder::new(options.field_selector.clone()),
            query_builder: QueryBuilder::new(),
            options,
        }
    }

    /// Connect to the Solr core named by `search.index.url`
    pub fn connect(config: &Config) -> Result<Self> {
        Self::connect_with_options(config, SearchIndexOptions::default())
    }

    pub fn connect_with_options(config: &Config, options: SearchIndexOptions) -> Result<Self> {
        let url = config.index_url()?;
        tracing::info!(provider = SEARCH_PROVIDER_ID, url = %url, "Connecting to search index");
        let client = Arc::new(
            SolrClient::new(url).map_err(|e| IndexError::Configuration(e.to_string()))?,
        );
        Ok(Self::with_options(client.clone(), client, options))
    }

    /// Serve both roles from an in-process index
    pub fn embedded(index: EmbeddedIndex) -> Self {
        let index = Arc::new(index);
        Self::new(index.clone(), index)
    }

    pub fn options(&self) -> &SearchIndexOptions {
        &self.options
    }

    /// Flatten a document and build its index record
    pub fn build_record(&self, document: &Document) -> Result<IndexRecord> {
        let flattened = flatten(&document.content, self.options.max_depth)?;
        Ok(self.record_builder.build(&document.key, &flattened))
    }

    /// Create or overwrite a single document
    pub async fn upsert(&self, document: &Document) -> Result<()> {
        self.upsert_batch(std::slice::from_ref(document)).await
    }

    /// Create or overwrite documents in one backend write
    pub async fn upsert_batch(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            tracing::debug!("Skipping empty batch");
            return Ok(());
        }

        let records = documents
            .iter()
            .map(|document| self.build_record(document))
            .collect::<Result<Vec<_>>>()?;

        self.writer
            .add_batch(&records, self.options.commit_within)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, count = records.len(), "Failed to add documents to index");
                write_failure(e)
            })?;

        tracing::info!(count = records.len(), "Added documents to index");
        Ok(())
    }

    /// Delete the indexed version identified by the document's key
    pub async fn delete(&self, document: &Document) -> Result<()> {
        let id = identifier::encode(&document.key);

        self.writer
            .delete_by_id(&id, self.options.commit_within)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, id = %id, "Failed to delete document");
                delete_failure(e)
            })?;

        tracing::info!(id = %id, "Finished deleting document");
        Ok(())
    }

    /// Delete every record and commit
    ///
    /// There is no isolation from concurrent writers: a write racing this
    /// call may or may not survive, depending on arrival order.
    pub async fn delete_all(&self) -> Result<()> {
        self.writer.delete_by_query(MATCH_ALL_QUERY).await?;
        self.writer.commit().await?;
        tracing::warn!("Deleted all documents from index");
        Ok(())
    }

    /// Make pending writes visible to searches
    pub async fn commit(&self) -> Result<()> {
        self.writer.commit().await?;
        Ok(())
    }

    /// Free-text search, optionally restricted to entity types
    pub async fn search(
        &self,
        text: &str,
        entity_filters: Option<&[String]>,
        offset: u64,
        limit: u64,
    ) -> Result<SearchResponse> {
        let request = self.query_builder.build(text, entity_filters, offset, limit);
        tracing::info!(query = %request.query_string(), start = offset, rows = limit, "Executing query");

        let raw = self.reader.query(&request).await.map_err(|e| {
            tracing::error!(error = %e, "Search failed");
            IndexError::Backend(e)
        })?;
        tracing::info!(total_hits = raw.total_matches, "Number of hits");

        let results = raw
            .matches
            .iter()
            .map(|hit| {
                identifier::decode(&hit.id)
                    .map(SearchResult::new)
                    .map_err(|e| corrupt_result(&hit.id, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchResponse {
            total_hits: raw.total_matches,
            results,
            offset,
            page_size: limit,
        })
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn write_failure(err: BackendError) -> IndexError {
    match err {
        BackendError::Rejected(msg) => IndexError::IndexWriteFailed(msg),
        other => IndexError::Backend(other),
    }
}

fn delete_failure(err: BackendError) -> IndexError {
    match err {
        BackendError::Rejected(msg) => IndexError::IndexDeleteFailed(msg),
        other => IndexError::Backend(other),
    }
}

fn corrupt_result(id: &str, err: IndexError) -> IndexError {
    let reason = match err {
        IndexError::MalformedIdentifier { reason, .. } => reason,
        other => other.to_string(),
    };
    tracing::error!(id = %id, reason = %reason, "Search result identifier cannot be decoded");
    IndexError::SearchResultCorrupt {
        identifier: id.to_string(),
        reason,
    }
}
