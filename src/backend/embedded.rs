//! In-process search backend powered by Tantivy

use crate::backend::{
    BackendResult, QueryResults, RawMatch, SearchReader, SearchWriter, MATCH_ALL_QUERY,
};
use crate::error::BackendError;
use crate::search::{IndexRecord, QueryRequest, DEFAULT_SEARCH_FIELD, ENTITY_FIELD, ID_FIELD};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, DisjunctionMaxQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

/// JSON field holding the searchable leaves by path
pub const FIELDS_FIELD: &str = "fields";

/// Embedded index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedConfig {
    /// Index directory; `None` keeps the index in memory
    pub index_path: Option<PathBuf>,

    /// Index writer heap size in bytes (default: 50MB)
    pub writer_heap_size: usize,

    /// Number of threads for indexing
    pub indexing_threads: usize,
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            writer_heap_size: 50_000_000, // 50MB
            indexing_threads: 1,
        }
    }
}

impl EmbeddedConfig {
    pub fn in_dir(path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: Some(path.into()),
            ..Default::default()
        }
    }
}

/// Tantivy-backed implementation of both backend roles
///
/// Writes commit immediately and reload the reader, so the commit-within
/// hint is satisfied trivially. Writer work runs on tokio's blocking pool.
pub struct EmbeddedIndex {
    index: Index,
    schema: Schema,
    id_field: Field,
    entity_field: Field,
    search_field: Field,
    writer: Arc<RwLock<IndexWriter>>,
    reader: IndexReader,
}

impl EmbeddedIndex {
    /// Open (or create) an index according to `config`
    pub fn new(config: EmbeddedConfig) -> BackendResult<Self> {
        let index = match &config.index_path {
            Some(path) => Self::open_or_create(path)?,
            None => Index::create_in_ram(build_schema()),
        };
        let schema = index.schema();

        let id_field = resolve_field(&schema, ID_FIELD)?;
        let entity_field = resolve_field(&schema, ENTITY_FIELD)?;
        let search_field = resolve_field(&schema, DEFAULT_SEARCH_FIELD)?;

        let writer = index
            .writer_with_num_threads(config.indexing_threads.max(1), config.writer_heap_size)
            .map_err(|e| BackendError::Unavailable(format!("Failed to create writer: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| BackendError::Unavailable(format!("Failed to create reader: {}", e)))?;

        tracing::info!(
            path = ?config.index_path,
            "Initialized embedded search index"
        );

        Ok(Self {
            index,
            schema,
            id_field,
            entity_field,
            search_field,
            writer: Arc::new(RwLock::new(writer)),
            reader,
        })
    }

    /// In-memory index with default settings
    pub fn in_memory() -> BackendResult<Self> {
        Self::new(EmbeddedConfig::default())
    }

    fn open_or_create(path: &Path) -> BackendResult<Index> {
        std::fs::create_dir_all(path).map_err(|e| {
            BackendError::Unavailable(format!("Failed to create index directory: {}", e))
        })?;

        if path.join("meta.json").exists() {
            Index::open_in_dir(path).map_err(|e| {
                BackendError::Unavailable(format!("Failed to open existing index: {}", e))
            })
        } else {
            Index::create_in_dir(path, build_schema()).map_err(|e| {
                BackendError::Unavailable(format!("Failed to create new index: {}", e))
            })
        }
    }

    /// Number of live records visible to searches
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn to_document(&self, record: &IndexRecord) -> BackendResult<TantivyDocument> {
        let mut payload = Map::new();
        payload.insert(ID_FIELD.to_string(), JsonValue::from(record.identifier.as_str()));
        payload.insert(ENTITY_FIELD.to_string(), JsonValue::from(record.entity.as_str()));
        payload.insert(
            DEFAULT_SEARCH_FIELD.to_string(),
            JsonValue::from(record.full_text.clone()),
        );
        payload.insert(
            FIELDS_FIELD.to_string(),
            JsonValue::Object(
                record
                    .fields
                    .iter()
                    .map(|(path, text)| (path.clone(), JsonValue::from(text.as_str())))
                    .collect(),
            ),
        );

        TantivyDocument::parse_json(&self.schema, &JsonValue::Object(payload).to_string())
            .map_err(|e| {
                BackendError::Rejected(format!("Record {} rejected: {}", record.identifier, e))
            })
    }

    fn build_query(&self, request: &QueryRequest) -> BackendResult<Box<dyn Query>> {
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        let text = request.text.trim();
        if !text.is_empty() && text != MATCH_ALL_QUERY {
            let default_field = self.schema.get_field(&request.default_field).map_err(|_| {
                BackendError::Rejected(format!("Unknown default field '{}'", request.default_field))
            })?;
            let parser = QueryParser::for_index(&self.index, vec![default_field]);
            let parsed = parser
                .parse_query(text)
                .map_err(|e| BackendError::Rejected(format!("Query parsing failed: {}", e)))?;
            subqueries.push((Occur::Must, parsed));
        }

        if !request.entity_filters.is_empty() {
            let entity_queries: Vec<Box<dyn Query>> = request
                .entity_filters
                .iter()
                .map(|entity| {
                    Box::new(TermQuery::new(
                        Term::from_field_text(self.entity_field, entity),
                        IndexRecordOption::Basic,
                    )) as Box<dyn Query>
                })
                .collect();
            subqueries.push((Occur::Must, Box::new(DisjunctionMaxQuery::new(entity_queries))));
        }

        if subqueries.is_empty() {
            Ok(Box::new(AllQuery))
        } else if subqueries.len() == 1 {
            Ok(subqueries.remove(0).1)
        } else {
            Ok(Box::new(BooleanQuery::new(subqueries)))
        }
    }

    /// Run `operation` against the writer on the blocking pool, committing
    /// afterwards when `commit` is set.
    ///
    /// Any failure, including a failed commit, rolls the writer back so the
    /// queued operations can never be published by a later commit.
    async fn transact<F>(&self, commit: bool, operation: F) -> BackendResult<()>
    where
        F: FnOnce(&mut IndexWriter) -> BackendResult<()> + Send + 'static,
    {
        let mut writer = self.writer.clone().write_owned().await;
        let reader = self.reader.clone();

        tokio::task::spawn_blocking(move || {
            let outcome = operation(&mut writer).and_then(|()| {
                if commit {
                    commit_and_reload(&mut writer, &reader)
                } else {
                    Ok(())
                }
            });
            outcome.map_err(|err| roll_back(&mut writer, err))
        })
        .await
        .map_err(|e| BackendError::Unavailable(format!("Index writer task failed: {}", e)))?
    }
}

fn commit_and_reload(writer: &mut IndexWriter, reader: &IndexReader) -> BackendResult<()> {
    writer
        .commit()
        .map_err(|e| BackendError::Unavailable(format!("Failed to commit: {}", e)))?;
    reader
        .reload()
        .map_err(|e| BackendError::Unavailable(format!("Failed to reload reader: {}", e)))
}

/// Discard everything queued since the last commit, keeping `err` as the cause
fn roll_back(writer: &mut IndexWriter, err: BackendError) -> BackendError {
    match writer.rollback() {
        Ok(_) => {
            tracing::warn!(error = %err, "Rolled back uncommitted index changes");
            err
        }
        Err(rollback) => {
            tracing::error!(error = %err, rollback_error = %rollback, "Index rollback failed");
            BackendError::Unavailable(format!(
                "{}; rollback of uncommitted changes also failed: {}",
                err.diagnostic(),
                rollback
            ))
        }
    }
}

#[async_trait]
impl SearchWriter for EmbeddedIndex {
    async fn add_batch(&self, records: &[IndexRecord], _commit_within: Duration) -> BackendResult<()> {
        let documents = records
            .iter()
            .map(|record| -> BackendResult<_> {
                Ok((record.identifier.clone(), self.to_document(record)?))
            })
            .collect::<BackendResult<Vec<_>>>()?;
        let count = documents.len();
        let id_field = self.id_field;

        self.transact(true, move |writer| {
            for (identifier, document) in documents {
                // Replace any existing record with the same identifier
                writer.delete_term(Term::from_field_text(id_field, &identifier));
                writer.add_document(document).map_err(|e| {
                    BackendError::Rejected(format!("Failed to add record {}: {}", identifier, e))
                })?;
            }
            Ok(())
        })
        .await?;

        tracing::debug!(count, "Committed record batch");
        Ok(())
    }

    async fn delete_by_id(&self, id: &str, _commit_within: Duration) -> BackendResult<()> {
        let term = Term::from_field_text(self.id_field, id);
        self.transact(true, move |writer| {
            writer.delete_term(term);
            Ok(())
        })
        .await
    }

    async fn delete_by_query(&self, query: &str) -> BackendResult<()> {
        if query.trim() == MATCH_ALL_QUERY {
            return self
                .transact(false, |writer| {
                    writer.delete_all_documents().map(|_| ()).map_err(|e| {
                        BackendError::Unavailable(format!("Failed to clear index: {}", e))
                    })
                })
                .await;
        }

        let parser = QueryParser::for_index(&self.index, vec![self.search_field]);
        let parsed = parser
            .parse_query(query)
            .map_err(|e| BackendError::Rejected(format!("Query parsing failed: {}", e)))?;
        self.transact(false, move |writer| {
            writer
                .delete_query(parsed)
                .map(|_| ())
                .map_err(|e| BackendError::Rejected(format!("Delete by query failed: {}", e)))
        })
        .await
    }

    async fn commit(&self) -> BackendResult<()> {
        self.transact(true, |_| Ok(())).await
    }
}

#[async_trait]
impl SearchReader for EmbeddedIndex {
    async fn query(&self, request: &QueryRequest) -> BackendResult<QueryResults> {
        let query = self.build_query(request)?;
        let searcher = self.reader.searcher();

        let total_matches = searcher
            .search(&*query, &Count)
            .map_err(|e| BackendError::Unavailable(format!("Count failed: {}", e)))?
            as u64;

        // Never ask the collector for more slots than there are matches left
        let limit = request.rows.min(total_matches.saturating_sub(request.start));
        let mut matches = Vec::new();

        if limit > 0 {
            let collector = TopDocs::with_limit(limit as usize).and_offset(request.start as usize);
            let top_docs = searcher
                .search(&*query, &collector)
                .map_err(|e| BackendError::Unavailable(format!("Search execution failed: {}", e)))?;

            for (score, doc_address) in top_docs {
                let retrieved: TantivyDocument = searcher.doc(doc_address).map_err(|e| {
                    BackendError::Unavailable(format!("Failed to retrieve doc: {}", e))
                })?;

                let id = retrieved
                    .get_first(self.id_field)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        BackendError::InvalidResponse("Stored record has no id".to_string())
                    })?;

                matches.push(RawMatch {
                    id: id.to_string(),
                    score: Some(score),
                });
            }
        }

        Ok(QueryResults {
            total_matches,
            matches,
        })
    }
}

/// Build the index schema
pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // Identifier - stored, indexed as a single term
    schema_builder.add_text_field(ID_FIELD, STRING | STORED);

    // Entity - exact-match filter
    schema_builder.add_text_field(ENTITY_FIELD, STRING | STORED);

    // Aggregated free text, the default query field
    schema_builder.add_text_field(DEFAULT_SEARCH_FIELD, TEXT);

    // Searchable leaves keyed by path
    schema_builder.add_json_field(FIELDS_FIELD, TEXT | STORED);

    schema_builder.build()
}

fn resolve_field(schema: &Schema, name: &str) -> BackendResult<Field> {
    schema.get_field(name).map_err(|_| {
        BackendError::Unavailable(format!("Index schema is missing field '{}'", name))
    })
}
