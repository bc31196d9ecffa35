//! End-to-end ingestion session tests against in-memory fetch and sink
//! doubles: flush policy, malformed-line tolerance, failure isolation, and
//! time-budget truncation.

use std::io::Cursor;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::ObjectStore;
use tokio::io::BufReader;
use tokio::time::advance;

use elbstream::budget::TimeBudgetMonitor;
use elbstream::config::Config;
use elbstream::ingestion::s3::{FetchError, ObjectFetch, ObjectStream};
use elbstream::models::access_log::AccessLogEntry;
use elbstream::models::event::EventRecord;
use elbstream::session::{run_session, SessionStatus};
use elbstream::storage::elastic::{BulkSink, IndexingError, SubmissionResult};

const LINE: &str = "2015-05-13T23:39:43.945958Z my-elb 192.168.131.39:2817 10.0.0.1:80 0.000073 0.001048 0.000057 200 200 0 29 \"GET http://example.com:80/ HTTP/1.1\" \"curl/7.38.0\" - -";

fn record(bucket: &str, key: &str) -> EventRecord {
    serde_json::from_value(serde_json::json!({
        "eventVersion": "2.0",
        "eventSource": "aws:s3",
        "awsRegion": "eu-west-1",
        "eventTime": "2015-05-13T23:40:00.000Z",
        "eventName": "ObjectCreated:Put",
        "s3": {
            "s3SchemaVersion": "1.0",
            "configurationId": "access-logs",
            "bucket": { "name": bucket },
            "object": { "key": key, "size": 1024, "eTag": "d41d8cd98f00b204e9800998ecf8427e" }
        }
    }))
    .unwrap()
}

fn config(bulk_limit: usize) -> Config {
    Config {
        environment: "LOCAL".into(),
        debug: false,
        elk_url: "http://127.0.0.1:9200".into(),
        bulk_limit,
        region: "eu-west-1".into(),
        aws_access_key_id: None,
        aws_secret_access_key: None,
    }
}

fn monitor() -> TimeBudgetMonitor {
    TimeBudgetMonitor::new(Duration::from_secs(300))
}

/// Serves a fixed body for any bucket/key pair.
struct StaticObject {
    body: String,
}

#[async_trait]
impl ObjectFetch for StaticObject {
    async fn fetch(&self, _bucket: &str, _key: &str) -> Result<ObjectStream, FetchError> {
        let cursor = Cursor::new(self.body.clone().into_bytes());
        Ok(Box::new(BufReader::new(cursor)))
    }
}

/// Fails every fetch with a genuine store error (a read of a path that
/// cannot exist).
struct MissingObject;

#[async_trait]
impl ObjectFetch for MissingObject {
    async fn fetch(&self, _bucket: &str, key: &str) -> Result<ObjectStream, FetchError> {
        let store = LocalFileSystem::new();
        let path = Path::from(format!("elbstream-test-missing/{key}"));
        let err = store.get(&path).await.expect_err("path must not exist");
        Err(FetchError::Store(err))
    }
}

/// Records every submitted batch and reports it fully created.
#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<Vec<AccessLogEntry>>>,
}

impl RecordingSink {
    fn batches(&self) -> Vec<Vec<AccessLogEntry>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BulkSink for RecordingSink {
    async fn submit(
        &self,
        batch: Vec<AccessLogEntry>,
    ) -> Result<SubmissionResult, IndexingError> {
        let submitted = batch.len();
        self.calls.lock().unwrap().push(batch);
        Ok(SubmissionResult {
            index: "logstash-2015.05.13".into(),
            submitted,
            created: submitted,
            failures: Vec::new(),
        })
    }
}

/// Refuses every submission, like a backend that is down.
struct FailingSink;

#[async_trait]
impl BulkSink for FailingSink {
    async fn submit(
        &self,
        _batch: Vec<AccessLogEntry>,
    ) -> Result<SubmissionResult, IndexingError> {
        let err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        Err(IndexingError::Payload(err))
    }
}

#[tokio::test]
async fn flushes_exactly_once_at_the_threshold() {
    let body = format!("{LINE}\n{LINE}\n{LINE}\n");
    let sink = RecordingSink::default();
    let outcome = run_session(
        &record("my-elb-logs", "2015/05/13/file.log"),
        &config(3),
        &StaticObject { body },
        &sink,
        &mut monitor(),
    )
    .await;

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
    assert_eq!(batches[0][0].elb, "my-elb");
    assert!(matches!(outcome.status, SessionStatus::Completed));
    assert_eq!(outcome.lines_read, 3);
    assert_eq!(outcome.documents_submitted, 3);
    assert_eq!(outcome.documents_created, 3);
    assert_eq!(outcome.documents_failed, 0);
}

#[tokio::test]
async fn remainder_goes_out_in_one_final_flush() {
    let body = format!("{LINE}\n{LINE}\n");
    let sink = RecordingSink::default();
    let outcome = run_session(
        &record("my-elb-logs", "2015/05/13/file.log"),
        &config(5),
        &StaticObject { body },
        &sink,
        &mut monitor(),
    )
    .await;

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(matches!(outcome.status, SessionStatus::Completed));
    assert_eq!(outcome.documents_submitted, 2);
}

#[tokio::test]
async fn threshold_plus_remainder_makes_two_flushes() {
    let body = format!("{LINE}\n{LINE}\n{LINE}\n{LINE}\n{LINE}\n");
    let sink = RecordingSink::default();
    let outcome = run_session(
        &record("my-elb-logs", "2015/05/13/file.log"),
        &config(2),
        &StaticObject { body },
        &sink,
        &mut monitor(),
    )
    .await;

    let batches = sink.batches();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[1].len(), 2);
    assert_eq!(batches[2].len(), 1);
    assert_eq!(outcome.documents_submitted, 5);
}

#[tokio::test]
async fn empty_object_never_calls_the_sink() {
    let sink = RecordingSink::default();
    let outcome = run_session(
        &record("my-elb-logs", "2015/05/13/empty.log"),
        &config(5),
        &StaticObject { body: String::new() },
        &sink,
        &mut monitor(),
    )
    .await;

    assert!(sink.batches().is_empty());
    assert!(matches!(outcome.status, SessionStatus::Completed));
    assert_eq!(outcome.lines_read, 0);
    assert_eq!(outcome.documents_submitted, 0);
}

#[tokio::test]
async fn malformed_line_is_skipped_without_aborting_the_stream() {
    let body = format!("{LINE}\nthis is not an access log line\n{LINE}\n");
    let sink = RecordingSink::default();
    let outcome = run_session(
        &record("my-elb-logs", "2015/05/13/file.log"),
        &config(10),
        &StaticObject { body },
        &sink,
        &mut monitor(),
    )
    .await;

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(batches[0].iter().all(|entry| entry.elb == "my-elb"));
    assert!(matches!(outcome.status, SessionStatus::Completed));
    assert_eq!(outcome.lines_read, 3);
    assert_eq!(outcome.lines_skipped, 1);
    assert_eq!(outcome.documents_submitted, 2);
}

#[tokio::test]
async fn backend_error_loses_the_batch_but_not_the_session() {
    let body = format!("{LINE}\n{LINE}\n{LINE}\n");
    let outcome = run_session(
        &record("my-elb-logs", "2015/05/13/file.log"),
        &config(2),
        &StaticObject { body },
        &FailingSink,
        &mut monitor(),
    )
    .await;

    assert!(matches!(outcome.status, SessionStatus::Completed));
    assert_eq!(outcome.lines_read, 3);
    assert_eq!(outcome.documents_submitted, 3);
    assert_eq!(outcome.documents_created, 0);
    assert_eq!(outcome.documents_failed, 3);
}

#[tokio::test]
async fn fetch_failure_stays_inside_its_own_session() {
    let sink = RecordingSink::default();

    let failed = run_session(
        &record("my-elb-logs", "2015/05/13/missing.log"),
        &config(3),
        &MissingObject,
        &sink,
        &mut monitor(),
    )
    .await;
    assert!(matches!(failed.status, SessionStatus::Failed(_)));
    assert_eq!(failed.lines_read, 0);
    assert!(sink.batches().is_empty());

    // A sibling record is still processed afterwards.
    let body = format!("{LINE}\n");
    let sibling = run_session(
        &record("my-elb-logs", "2015/05/13/file.log"),
        &config(3),
        &StaticObject { body },
        &sink,
        &mut monitor(),
    )
    .await;
    assert!(matches!(sibling.status, SessionStatus::Completed));
    assert_eq!(sink.batches().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn low_budget_truncates_after_an_early_flush() {
    let body = format!("{LINE}\n").repeat(50);
    let sink = RecordingSink::default();
    let mut monitor = TimeBudgetMonitor::new(Duration::from_millis(1_200));
    // Move past the warm-up window and under the low-water mark.
    advance(Duration::from_millis(600)).await;

    let outcome = run_session(
        &record("my-elb-logs", "2015/05/13/big.log"),
        &config(100),
        &StaticObject { body },
        &sink,
        &mut monitor,
    )
    .await;

    assert!(matches!(outcome.status, SessionStatus::Truncated));
    assert_eq!(outcome.lines_read, 1);
    // The accumulated document still went out in the early final flush.
    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(outcome.documents_submitted, 1);
}
