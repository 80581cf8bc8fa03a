//! End-to-end tests for the search index over the embedded backend

use chrono::{DateTime, FixedOffset};
use document_search_index::backend::{EmbeddedConfig, EmbeddedIndex, SearchWriter};
use document_search_index::models::{Document, DocumentKey};
use document_search_index::search::*;
use document_search_index::IndexError;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

const PERSON_ID: &str = "b9c10b86-5867-4270-b56e-ee7439fe381e";

fn version(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

fn key(entity: &str, id: &str) -> DocumentKey {
    DocumentKey::new("data", entity, id, version("2018-01-01T00:00:00+01:00"))
}

fn person_fixture() -> Value {
    serde_json::from_str(include_str!("resources/UnitDataSet_Person_1.json")).unwrap()
}

/// Helper to create a search index over an in-memory backend
fn create_test_index() -> (SearchIndex, Arc<EmbeddedIndex>) {
    let backend = Arc::new(EmbeddedIndex::in_memory().unwrap());
    (SearchIndex::new(backend.clone(), backend.clone()), backend)
}

#[tokio::test]
async fn test_indexed_document_is_found() {
    let (index, _) = create_test_index();
    let key = key("UnitDataSet", PERSON_ID);

    index
        .upsert(&Document::new(key.clone(), json!({"name": {"languageText": "Norway"}})))
        .await
        .unwrap();

    let response = index.search("Norway", None, 0, 10).await.unwrap();
    assert_eq!(response.total_hits, 1);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].document_key(), &key);
}

#[tokio::test]
async fn test_deleted_document_is_gone() {
    let (index, _) = create_test_index();
    let document = Document::new(
        key("UnitDataSet", PERSON_ID),
        json!({"name": {"languageText": "Norway"}}),
    );

    index.upsert(&document).await.unwrap();
    index.delete(&document).await.unwrap();

    let response = index.search("Norway", None, 0, 10).await.unwrap();
    assert_eq!(response.total_hits, 0);
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn test_entity_filter_restricts_results() {
    let (index, _) = create_test_index();
    let content = json!({"city": {"languageText": "Oslo"}});

    index
        .upsert_batch(&[
            Document::new(key("TypeA", "a"), content.clone()),
            Document::new(key("TypeB", "b"), content),
        ])
        .await
        .unwrap();

    let unfiltered = index.search("Oslo", None, 0, 10).await.unwrap();
    assert_eq!(unfiltered.total_hits, 2);

    let filters = vec!["TypeA".to_string()];
    let filtered = index
        .search("Oslo", Some(filters.as_slice()), 0, 10)
        .await
        .unwrap();
    assert_eq!(filtered.total_hits, 1);
    assert_eq!(filtered.results[0].document_key().entity, "TypeA");

    let both = vec!["TypeA".to_string(), "TypeB".to_string()];
    let either = index
        .search("Oslo", Some(both.as_slice()), 0, 10)
        .await
        .unwrap();
    assert_eq!(either.total_hits, 2);
}

#[tokio::test]
async fn test_empty_filter_is_unrestricted() {
    let (index, _) = create_test_index();
    index
        .upsert(&Document::new(
            key("TypeA", "a"),
            json!({"city": {"languageText": "Oslo"}}),
        ))
        .await
        .unwrap();

    let empty: Vec<String> = Vec::new();
    let response = index
        .search("Oslo", Some(empty.as_slice()), 0, 10)
        .await
        .unwrap();
    assert_eq!(response.total_hits, 1);
}

#[tokio::test]
async fn test_pagination() {
    let (index, _) = create_test_index();
    let documents: Vec<_> = (0..10)
        .map(|i| {
            Document::new(
                key("UnitDataSet", &format!("doc-{}", i)),
                json!({"title": {"languageText": "Census"}}),
            )
        })
        .collect();
    index.upsert_batch(&documents).await.unwrap();

    let page = index.search("Census", None, 5, 2).await.unwrap();
    assert_eq!(page.total_hits, 10);
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.offset, 5);
    assert_eq!(page.page_size, 2);

    let past_end = index.search("Census", None, 20, 2).await.unwrap();
    assert_eq!(past_end.total_hits, 10);
    assert!(past_end.results.is_empty());

    let zero = index.search("Census", None, 0, 0).await.unwrap();
    assert_eq!(zero.total_hits, 10);
    assert!(zero.results.is_empty());
}

#[tokio::test]
async fn test_non_language_text_is_not_searchable() {
    let (index, _) = create_test_index();
    index
        .upsert(&Document::new(key("UnitDataSet", PERSON_ID), person_fixture()))
        .await
        .unwrap();

    let norway = index.search("Norway", None, 0, 10).await.unwrap();
    assert_eq!(norway.total_hits, 1);
    assert_eq!(norway.results[0].document_key().id, PERSON_ID);

    // "Norge" sits under plainText, "PERSON" is a plain string leaf
    assert_eq!(index.search("Norge", None, 0, 10).await.unwrap().total_hits, 0);
    assert_eq!(index.search("PERSON", None, 0, 10).await.unwrap().total_hits, 0);

    let description = index.search("population", None, 0, 10).await.unwrap();
    assert_eq!(description.total_hits, 1);
}

#[tokio::test]
async fn test_upsert_replaces_same_version() {
    let (index, backend) = create_test_index();
    let key = key("UnitDataSet", PERSON_ID);

    index
        .upsert(&Document::new(key.clone(), json!({"name": {"languageText": "Norway"}})))
        .await
        .unwrap();
    index
        .upsert(&Document::new(key.clone(), json!({"name": {"languageText": "Sweden"}})))
        .await
        .unwrap();

    assert_eq!(backend.num_docs(), 1);
    assert_eq!(index.search("Norway", None, 0, 10).await.unwrap().total_hits, 0);
    assert_eq!(index.search("Sweden", None, 0, 10).await.unwrap().total_hits, 1);
}

#[tokio::test]
async fn test_versions_are_separate_records() {
    let (index, backend) = create_test_index();
    let content = json!({"name": {"languageText": "Norway"}});
    let first = DocumentKey::new("data", "UnitDataSet", PERSON_ID, version("2018-01-01T00:00:00+01:00"));
    let second = DocumentKey::new("data", "UnitDataSet", PERSON_ID, version("2019-06-01T12:30:00+02:00"));

    index
        .upsert_batch(&[
            Document::new(first.clone(), content.clone()),
            Document::new(second.clone(), content.clone()),
        ])
        .await
        .unwrap();
    assert_eq!(backend.num_docs(), 2);

    index.delete(&Document::new(first, content)).await.unwrap();

    let response = index.search("Norway", None, 0, 10).await.unwrap();
    assert_eq!(response.total_hits, 1);
    assert_eq!(response.results[0].document_key(), &second);
}

#[tokio::test]
async fn test_delete_all() {
    let (index, backend) = create_test_index();
    let documents: Vec<_> = (0..3)
        .map(|i| {
            Document::new(
                key("UnitDataSet", &i.to_string()),
                json!({"name": {"languageText": "Norway"}}),
            )
        })
        .collect();
    index.upsert_batch(&documents).await.unwrap();
    assert_eq!(backend.num_docs(), 3);

    index.delete_all().await.unwrap();

    assert_eq!(backend.num_docs(), 0);
    assert_eq!(index.search("Norway", None, 0, 10).await.unwrap().total_hits, 0);
}

#[tokio::test]
async fn test_depth_exceeded_leaves_index_untouched() {
    let backend = Arc::new(EmbeddedIndex::in_memory().unwrap());
    let options = SearchIndexOptionsBuilder::new().max_depth(3).build();
    let index = SearchIndex::with_options(backend.clone(), backend.clone(), options);

    let deep = json!({"a": {"b": {"c": {"d": {"languageText": "Norway"}}}}});
    let shallow = json!({"name": {"languageText": "Norway"}});

    let err = index
        .upsert_batch(&[
            Document::new(key("UnitDataSet", "ok"), shallow),
            Document::new(key("UnitDataSet", "deep"), deep),
        ])
        .await
        .unwrap_err();

    match err {
        IndexError::DepthExceeded { max_depth, path } => {
            assert_eq!(max_depth, 3);
            assert!(path.starts_with("a.b.c.d"));
        }
        other => panic!("expected DepthExceeded, got {:?}", other),
    }
    assert_eq!(backend.num_docs(), 0);
}

#[tokio::test]
async fn test_undecodable_stored_identifier_is_corrupt() {
    let (index, backend) = create_test_index();

    let record = IndexRecord {
        identifier: "legacy-record-17".to_string(),
        entity: "UnitDataSet".to_string(),
        fields: Default::default(),
        full_text: vec!["Norway".to_string()],
    };
    backend
        .add_batch(&[record], DEFAULT_COMMIT_WITHIN)
        .await
        .unwrap();

    let err = index.search("Norway", None, 0, 10).await.unwrap_err();
    match err {
        IndexError::SearchResultCorrupt { identifier, .. } => {
            assert_eq!(identifier, "legacy-record-17")
        }
        other => panic!("expected SearchResultCorrupt, got {:?}", other),
    }
}

#[tokio::test]
async fn test_custom_field_selector() {
    let backend = Arc::new(EmbeddedIndex::in_memory().unwrap());
    let options = SearchIndexOptionsBuilder::new()
        .field_selector(Arc::new(DeclaredPathSelector::new(["unitType"])))
        .build();
    let index = SearchIndex::with_options(backend.clone(), backend, options);

    index
        .upsert(&Document::new(key("UnitDataSet", PERSON_ID), person_fixture()))
        .await
        .unwrap();

    assert_eq!(index.search("PERSON", None, 0, 10).await.unwrap().total_hits, 1);
    assert_eq!(index.search("Norway", None, 0, 10).await.unwrap().total_hits, 0);
}

#[tokio::test]
async fn test_concurrent_searches() {
    let (index, _) = create_test_index();
    let documents: Vec<_> = (0..5)
        .map(|i| {
            Document::new(
                key(if i % 2 == 0 { "TypeA" } else { "TypeB" }, &i.to_string()),
                json!({"city": {"languageText": "Bergen"}}),
            )
        })
        .collect();
    index.upsert_batch(&documents).await.unwrap();

    let searches = (0..8).map(|i| {
        let index = index.clone();
        async move {
            let filters = vec![if i % 2 == 0 { "TypeA" } else { "TypeB" }.to_string()];
            index
                .search("Bergen", Some(filters.as_slice()), 0, 10)
                .await
                .map(|r| r.total_hits)
        }
    });

    let totals: Vec<u64> = futures::future::join_all(searches)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    for (i, total) in totals.into_iter().enumerate() {
        assert_eq!(total, if i % 2 == 0 { 3 } else { 2 });
    }
}

#[tokio::test]
async fn test_on_disk_index_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let key = key("UnitDataSet", PERSON_ID);

    {
        let backend = EmbeddedIndex::new(EmbeddedConfig::in_dir(temp_dir.path())).unwrap();
        let index = SearchIndex::embedded(backend);
        index
            .upsert(&Document::new(key.clone(), json!({"name": {"languageText": "Norway"}})))
            .await
            .unwrap();
    }

    let backend = EmbeddedIndex::new(EmbeddedConfig::in_dir(temp_dir.path())).unwrap();
    let index = SearchIndex::embedded(backend);
    let response = index.search("Norway", None, 0, 10).await.unwrap();
    assert_eq!(response.total_hits, 1);
    assert_eq!(response.results[0].document_key(), &key);
}
