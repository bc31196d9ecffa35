use thiserror::Error;
use tokio::io::AsyncBufReadExt;
use tracing::{debug, error, info, warn};

use crate::batch::BatchAccumulator;
use crate::budget::{BudgetStatus, TimeBudgetMonitor};
use crate::config::Config;
use crate::ingestion::s3::{FetchError, ObjectFetch, S3ObjectFetch};
use crate::models::event::{EventRecord, S3Event};
use crate::parser;
use crate::storage::elastic::{BulkSink, ElasticIndexer};

/// Aborts the current object only; other records in the invocation are
/// still attempted.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("error reading object stream: {0}")]
    Stream(#[from] std::io::Error),
}

#[derive(Debug)]
pub enum SessionStatus {
    /// Every line of the object was consumed.
    Completed,
    /// The time budget ran low; the tail of the object was left unread.
    Truncated,
    Failed(SessionError),
}

/// Terminal report of one ingestion session.
#[derive(Debug)]
pub struct SessionOutcome {
    pub bucket: String,
    pub key: String,
    pub lines_read: u64,
    pub lines_skipped: u64,
    pub documents_submitted: u64,
    pub documents_created: u64,
    pub documents_failed: u64,
    pub status: SessionStatus,
}

/// Runs one ingestion session: fetch the object, stream its lines through
/// the parser into the accumulator, flush at the threshold and once more
/// at stream end, and report the outcome.
pub async fn run_session(
    record: &EventRecord,
    config: &Config,
    fetcher: &dyn ObjectFetch,
    sink: &dyn BulkSink,
    monitor: &mut TimeBudgetMonitor,
) -> SessionOutcome {
    let mut outcome = SessionOutcome {
        bucket: record.s3.bucket.name.clone(),
        key: record.s3.object.key.clone(),
        lines_read: 0,
        lines_skipped: 0,
        documents_submitted: 0,
        documents_created: 0,
        documents_failed: 0,
        status: SessionStatus::Completed,
    };
    info!(
        "starting ingestion session for {}/{} ({})",
        outcome.bucket, outcome.key, record.event_name
    );

    let stream = match fetcher.fetch(&outcome.bucket, &outcome.key).await {
        Ok(stream) => stream,
        Err(err) => {
            error!(
                "failed to get object {}/{}: {}",
                outcome.bucket, outcome.key, err
            );
            outcome.status = SessionStatus::Failed(err.into());
            return outcome;
        }
    };

    let mut batch = BatchAccumulator::new(config.bulk_limit);
    let mut lines = stream.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("error reading object stream: {}", err);
                outcome.status = SessionStatus::Failed(err.into());
                break;
            }
        };
        outcome.lines_read += 1;
        if config.debug {
            debug!("log line {}: {}", outcome.lines_read, line);
        }

        match parser::parse_line(&line) {
            Ok(entry) => {
                batch.add(entry);
                if batch.should_flush() {
                    flush(sink, &mut batch, &mut outcome, config).await;
                }
            }
            Err(err) => {
                warn!("skipping line {}: {}", outcome.lines_read, err);
                outcome.lines_skipped += 1;
            }
        }

        if monitor.poll() == BudgetStatus::Low {
            outcome.status = SessionStatus::Truncated;
            break;
        }
    }

    // Whatever is left goes out in one final flush, truncated or not.
    if !batch.is_empty() {
        flush(sink, &mut batch, &mut outcome, config).await;
    }

    info!("lines processed: {}", outcome.lines_read);
    outcome
}

async fn flush(
    sink: &dyn BulkSink,
    batch: &mut BatchAccumulator,
    outcome: &mut SessionOutcome,
    config: &Config,
) {
    let documents = batch.drain();
    let count = documents.len() as u64;
    if config.debug {
        debug!("bulk indexing - document count: {}", count);
    }
    outcome.documents_submitted += count;
    match sink.submit(documents).await {
        Ok(result) => {
            outcome.documents_created += result.created as u64;
            outcome.documents_failed += result.failures.len() as u64;
        }
        Err(err) => {
            // No retry: the batch is gone for this invocation.
            error!("bulk indexing error: {}", err);
            outcome.documents_failed += count;
        }
    }
}

/// Processes every record of the event sequentially. Each record gets its
/// own fetcher, indexer, accumulator, and budget monitor (all monitors
/// share the invocation deadline); one record's failure never stops its
/// siblings.
pub async fn run_invocation(
    event: &S3Event,
    config: &Config,
    deadline: tokio::time::Instant,
) -> Vec<SessionOutcome> {
    let mut outcomes = Vec::with_capacity(event.records.len());
    for record in &event.records {
        let fetcher = S3ObjectFetch::new(config);
        let indexer = ElasticIndexer::new(&config.elk_url);
        let mut monitor = TimeBudgetMonitor::until(deadline);
        outcomes.push(run_session(record, config, &fetcher, &indexer, &mut monitor).await);
    }
    outcomes
}
