use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

use crate::models::access_log::{AccessLogEntry, LOG_NAME};

/// Timestamp layout the indexing backend expects in `@timestamp`.
const BACKEND_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Positional fields up to and including the quoted request protocol.
const MIN_FIELDS: usize = 14;

/// The line cannot be mapped onto the access-log schema. The caller skips
/// the line; the stream keeps going.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineFormatError {
    #[error("expected at least {MIN_FIELDS} space-separated fields, found {found}")]
    FieldCount { found: usize },
    #[error("missing quoted user-agent segment")]
    MissingUserAgent,
    #[error("missing ssl cipher/protocol trailer")]
    MissingSslTrailer,
}

/// Parses one ELB access-log line.
///
/// The wire format is
/// `timestamp elb client backend req_proc backend_proc resp_proc elb_status
/// backend_status recv_bytes sent_bytes "method url protocol" "user_agent"
/// cipher ssl_protocol`. The first thirteen values are taken positionally;
/// the two quoted free-text fields are isolated separately so that spaces
/// inside the user-agent don't shift them.
///
/// A timestamp that fails to parse is not fatal: the raw text is kept and a
/// warning logged, since an otherwise valid line must still be ingested.
pub fn parse_line(line: &str) -> Result<AccessLogEntry, LineFormatError> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() < MIN_FIELDS {
        return Err(LineFormatError::FieldCount {
            found: fields.len(),
        });
    }

    // Everything after the quote-space-quote boundary belongs to the
    // user-agent and the ssl trailer.
    let mut quoted = line.splitn(2, "\" \"");
    quoted.next();
    let trailer = quoted.next().ok_or(LineFormatError::MissingUserAgent)?;
    let mut trailer = trailer.splitn(2, '"');
    let user_agent = trailer.next().unwrap_or_default();
    let ssl = trailer.next().ok_or(LineFormatError::MissingSslTrailer)?;
    // The trailer starts with the space that closed the user-agent quote,
    // so cipher and protocol sit at positions 1 and 2.
    let mut ssl = ssl.split(' ');
    ssl.next();
    let (ssl_cipher, ssl_protocol) = match (ssl.next(), ssl.next()) {
        (Some(cipher), Some(protocol)) => (cipher, protocol),
        _ => return Err(LineFormatError::MissingSslTrailer),
    };

    let timestamp = match DateTime::parse_from_rfc3339(fields[0]) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format(BACKEND_TIMESTAMP_FORMAT)
            .to_string(),
        Err(err) => {
            warn!("error parsing log date {:?}: {}", fields[0], err);
            fields[0].to_string()
        }
    };

    Ok(AccessLogEntry {
        log_name: LOG_NAME.to_string(),
        timestamp,
        elb: fields[1].to_string(),
        client: fields[2].to_string(),
        backend: fields[3].to_string(),
        request_processing_time: fields[4].to_string(),
        backend_processing_time: fields[5].to_string(),
        response_processing_time: fields[6].to_string(),
        elb_status_code: fields[7].to_string(),
        backend_status_code: fields[8].to_string(),
        received_bytes: fields[9].to_string(),
        sent_bytes: fields[10].to_string(),
        request_type: fields[11].trim_matches('"').to_string(),
        request_url: fields[12].to_string(),
        request_protocol: fields[13].trim_matches('"').to_string(),
        user_agent: user_agent.to_string(),
        ssl_cipher: ssl_cipher.to_string(),
        ssl_protocol: ssl_protocol.to_string(),
    })
}
