//! Solr backend over HTTP

use crate::backend::{BackendResult, QueryResults, RawMatch, SearchReader, SearchWriter};
use crate::error::BackendError;
use crate::search::{IndexRecord, QueryRequest, DEFAULT_SEARCH_FIELD, ENTITY_FIELD, ID_FIELD};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Solr client implementing both backend roles against one core URL
///
/// The underlying `reqwest::Client` pools connections and is safe to share,
/// so one instance serves concurrent writers and readers.
#[derive(Clone, Debug)]
pub struct SolrClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: SelectBody,
}

#[derive(Debug, Deserialize)]
struct SelectBody {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct SolrErrorResponse {
    error: SolrErrorBody,
}

#[derive(Debug, Deserialize)]
struct SolrErrorBody {
    msg: Option<String>,
}

impl SolrClient {
    /// Create a client for the Solr core at `base_url`
    pub fn new(base_url: &str) -> BackendResult<Self> {
        Self::build(base_url, None)
    }

    /// Create a client that gives up on requests after `timeout`
    pub fn with_timeout(base_url: &str, timeout: Duration) -> BackendResult<Self> {
        Self::build(base_url, Some(timeout))
    }

    fn build(base_url: &str, timeout: Option<Duration>) -> BackendResult<Self> {
        Url::parse(base_url).map_err(|e| {
            BackendError::Unavailable(format!("Invalid Solr URL '{}': {}", base_url, e))
        })?;

        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            BackendError::Unavailable(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Solr JSON representation of a record
    fn to_solr_document(record: &IndexRecord) -> Value {
        let mut doc = Map::new();
        for (path, text) in &record.fields {
            doc.insert(path.clone(), Value::from(text.as_str()));
        }
        doc.insert(ID_FIELD.to_string(), Value::from(record.identifier.as_str()));
        doc.insert(ENTITY_FIELD.to_string(), Value::from(record.entity.as_str()));
        if !record.full_text.is_empty() {
            doc.insert(
                DEFAULT_SEARCH_FIELD.to_string(),
                Value::from(record.full_text.clone()),
            );
        }
        Value::Object(doc)
    }

    /// POST an update command to `/update`
    async fn update(&self, body: &Value, commit_within: Option<Duration>) -> BackendResult<()> {
        let mut params = vec![("wt", "json".to_string())];
        if let Some(window) = commit_within {
            params.push(("commitWithin", window.as_millis().to_string()));
        }

        let response = self
            .client
            .post(format!("{}/update", self.base_url))
            .query(&params)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status.as_u16(), &body));
        }

        Ok(())
    }
}

#[async_trait]
impl SearchWriter for SolrClient {
    async fn add_batch(&self, records: &[IndexRecord], commit_within: Duration) -> BackendResult<()> {
        let documents: Vec<Value> = records.iter().map(Self::to_solr_document).collect();
        self.update(&Value::Array(documents), Some(commit_within)).await
    }

    async fn delete_by_id(&self, id: &str, commit_within: Duration) -> BackendResult<()> {
        self.update(&json!({"delete": {"id": id}}), Some(commit_within))
            .await
    }

    async fn delete_by_query(&self, query: &str) -> BackendResult<()> {
        self.update(&json!({"delete": {"query": query}}), None).await
    }

    async fn commit(&self) -> BackendResult<()> {
        self.update(&json!({"commit": {}}), None).await
    }
}

#[async_trait]
impl SearchReader for SolrClient {
    async fn query(&self, request: &QueryRequest) -> BackendResult<QueryResults> {
        let params = vec![
            ("q", request.query_string()),
            ("df", request.default_field.clone()),
            ("hl", request.highlight.to_string()),
            ("hl.fl", request.highlight_fields.clone()),
            ("start", request.start.to_string()),
            ("rows", request.rows.to_string()),
            ("fl", format!("{},score", ID_FIELD)),
            ("wt", "json".to_string()),
        ];

        let response = self
            .client
            .get(format!("{}/select", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(rejection(status.as_u16(), &body));
        }

        let parsed: SelectResponse = serde_json::from_str(&body).map_err(|e| {
            BackendError::InvalidResponse(format!("Unexpected select response: {}", e))
        })?;

        let matches = parsed
            .response
            .docs
            .iter()
            .map(|doc| {
                let id = doc.get(ID_FIELD).and_then(Value::as_str).ok_or_else(|| {
                    BackendError::InvalidResponse("Result document has no string id".to_string())
                })?;
                Ok(RawMatch {
                    id: id.to_string(),
                    score: doc.get("score").and_then(Value::as_f64).map(|s| s as f32),
                })
            })
            .collect::<BackendResult<Vec<_>>>()?;

        Ok(QueryResults {
            total_matches: parsed.response.num_found,
            matches,
        })
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Unavailable(format!("Request to Solr timed out: {}", err))
    } else if err.is_connect() {
        BackendError::Unavailable(format!("Failed to connect to Solr: {}", err))
    } else {
        BackendError::Unavailable(format!("Solr request failed: {}", err))
    }
}

fn rejection(status: u16, body: &str) -> BackendError {
    let message = serde_json::from_str::<SolrErrorResponse>(body)
        .ok()
        .and_then(|e| e.error.msg)
        .unwrap_or_else(|| body.trim().to_string());
    let diagnostic = format!("HTTP {}: {}", status, message);

    // Gateway and availability statuses mean Solr never looked at the request
    match status {
        502..=504 => BackendError::Unavailable(diagnostic),
        _ => BackendError::Rejected(diagnostic),
    }
}
