// src/main.rs

use std::env;
use std::fs;
use std::io::Read;
use std::time::Duration;

use anyhow::Context;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use elbstream::config::Config;
use elbstream::models::event::S3Event;
use elbstream::observability::tracing as ob_tracing;
use elbstream::session::{run_invocation, SessionStatus};

/// Fallback when the runtime doesn't report its remaining allowance.
const DEFAULT_BUDGET_MS: u64 = 300_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    ob_tracing::init_tracing();
    info!("🟢 Tracing initialized");

    let function_arn = env::var("FUNCTION_ARN").unwrap_or_else(|_| "LOCAL".into());
    let config = Config::resolve(&function_arn);
    if config.debug {
        debug!("used configuration env: {}", config.environment);
        debug!("configuration: {:?}", config);
    }

    let budget_ms = env::var("REMAINING_TIME_MS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_BUDGET_MS);
    let deadline = Instant::now() + Duration::from_millis(budget_ms);

    let raw = read_event(env::args().nth(1))?;
    if config.debug {
        debug!("received event: {}", raw);
    }
    let event: S3Event = serde_json::from_str(&raw).context("could not decode S3 event")?;
    info!(
        "🚀 Processing {} record(s) against {}",
        event.records.len(),
        config.elk_url
    );

    let outcomes = run_invocation(&event, &config, deadline).await;
    for outcome in &outcomes {
        match &outcome.status {
            SessionStatus::Completed => info!(
                "✅ {}/{}: {} lines read, {} skipped, {} submitted, {} created, {} failed",
                outcome.bucket,
                outcome.key,
                outcome.lines_read,
                outcome.lines_skipped,
                outcome.documents_submitted,
                outcome.documents_created,
                outcome.documents_failed
            ),
            SessionStatus::Truncated => warn!(
                "⏳ {}/{}: truncated by the time budget after {} lines, {} submitted",
                outcome.bucket, outcome.key, outcome.lines_read, outcome.documents_submitted
            ),
            SessionStatus::Failed(err) => error!(
                "❌ {}/{}: {} ({} lines read)",
                outcome.bucket, outcome.key, err, outcome.lines_read
            ),
        }
    }
    Ok(())
}

fn read_event(path: Option<String>) -> anyhow::Result<String> {
    match path {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("could not read event file {path}")),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("could not read event from stdin")?;
            Ok(raw)
        }
    }
}
