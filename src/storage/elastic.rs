use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::access_log::AccessLogEntry;

/// Mapping type carried on every bulk index action.
const DOC_TYPE: &str = "elblog";

/// The bulk call itself failed; the batch's documents are lost for this
/// invocation. Per-document rejections inside a successful call are *not*
/// this error, they are reported through `SubmissionResult`.
#[derive(Debug, Error)]
pub enum IndexingError {
    #[error("bulk request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not serialize bulk payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// One document the backend did not create.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFailure {
    /// Zero-based position within the submitted batch.
    pub position: usize,
    pub status: u16,
    pub error: Option<String>,
}

/// Reconciled outcome of one bulk submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionResult {
    pub index: String,
    pub submitted: usize,
    pub created: usize,
    pub failures: Vec<DocumentFailure>,
}

/// Destination for accumulated batches. The session only knows this seam;
/// production wires in `ElasticIndexer`, tests substitute a recording sink.
#[async_trait]
pub trait BulkSink: Send + Sync {
    async fn submit(&self, batch: Vec<AccessLogEntry>)
        -> Result<SubmissionResult, IndexingError>;
}

/// One logical index per calendar day, shared by every document of a batch.
pub fn index_for(date: DateTime<Utc>) -> String {
    format!("logstash-{}", date.format("%Y.%m.%d"))
}

/// Bulk-protocol client for the Elasticsearch backend.
pub struct ElasticIndexer {
    client: reqwest::Client,
    base_url: String,
}

impl ElasticIndexer {
    pub fn new(elk_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: elk_url.trim_end_matches('/').to_string(),
        }
    }

    /// Renders the `/_bulk` body: an action line and a source line per
    /// document, newline-delimited with a trailing newline.
    fn bulk_body(index: &str, batch: &[AccessLogEntry]) -> Result<String, serde_json::Error> {
        let action =
            serde_json::json!({ "index": { "_index": index, "_type": DOC_TYPE } }).to_string();
        let mut body = String::with_capacity(batch.len() * (action.len() + 256));
        for entry in batch {
            body.push_str(&action);
            body.push('\n');
            body.push_str(&serde_json::to_string(entry)?);
            body.push('\n');
        }
        Ok(body)
    }
}

#[derive(Deserialize, Debug)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<BulkItem>,
}

/// The backend keys each item by the operation that produced it.
#[derive(Deserialize, Debug)]
struct BulkItem {
    index: Option<BulkOutcome>,
    create: Option<BulkOutcome>,
}

#[derive(Deserialize, Debug)]
struct BulkOutcome {
    #[serde(default)]
    status: u16,
    result: Option<String>,
    error: Option<serde_json::Value>,
}

impl BulkItem {
    fn outcome(self) -> Option<BulkOutcome> {
        self.index.or(self.create)
    }
}

impl BulkOutcome {
    fn created(&self) -> bool {
        self.error.is_none()
            && (self.status == 201 || self.result.as_deref() == Some("created"))
    }
}

/// Compares what the backend reports against what was submitted.
fn reconcile(index: &str, submitted: usize, response: BulkResponse) -> SubmissionResult {
    let mut created = 0;
    let mut failures = Vec::new();
    for (position, item) in response.items.into_iter().enumerate() {
        match item.outcome() {
            Some(outcome) if outcome.created() => created += 1,
            Some(outcome) => failures.push(DocumentFailure {
                position,
                status: outcome.status,
                error: outcome.error.map(|detail| detail.to_string()),
            }),
            None => failures.push(DocumentFailure {
                position,
                status: 0,
                error: None,
            }),
        }
    }
    SubmissionResult {
        index: index.to_string(),
        submitted,
        created,
        failures,
    }
}

#[async_trait]
impl BulkSink for ElasticIndexer {
    async fn submit(
        &self,
        batch: Vec<AccessLogEntry>,
    ) -> Result<SubmissionResult, IndexingError> {
        let index = index_for(Utc::now());
        let body = Self::bulk_body(&index, &batch)?;
        debug!("bulk indexing {} documents into {}", batch.len(), index);

        let response = self
            .client
            .post(format!("{}/_bulk", self.base_url))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .json::<BulkResponse>()
            .await?;

        let result = reconcile(&index, batch.len(), response);
        if result.created != result.submitted {
            warn!(
                "some documents haven't been created: {}",
                result.submitted - result.created
            );
            for failure in &result.failures {
                warn!(
                    "{}: status {} {}",
                    failure.position,
                    failure.status,
                    failure.error.as_deref().unwrap_or("-")
                );
            }
        }
        Ok(result)
    }
}
