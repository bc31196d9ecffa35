use serde::{Serialize, Deserialize};

/// Source tag stamped on every document this pipeline produces.
pub const LOG_NAME: &str = "elb_access_log";

/// One parsed ELB access-log line, with the exact field names the indexing
/// backend expects. The schema is fixed; a line either fills it or is
/// rejected by the parser.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AccessLogEntry {
    #[serde(rename = "@log_name")]
    pub log_name: String,
    /// UTC, reformatted to the backend's timestamp layout.
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    pub elb: String,
    pub client: String,
    pub backend: String,
    #[serde(rename = "requestprocessingtime")]
    pub request_processing_time: String,
    #[serde(rename = "backendprocessingtime")]
    pub backend_processing_time: String,
    #[serde(rename = "responseprocessingtime")]
    pub response_processing_time: String,
    #[serde(rename = "elbstatuscode")]
    pub elb_status_code: String,
    #[serde(rename = "backendstatuscode")]
    pub backend_status_code: String,
    #[serde(rename = "receivedbytes")]
    pub received_bytes: String,
    #[serde(rename = "sentbytes")]
    pub sent_bytes: String,
    #[serde(rename = "requesttype")]
    pub request_type: String,
    #[serde(rename = "requesturl")]
    pub request_url: String,
    #[serde(rename = "requestprotocol")]
    pub request_protocol: String,
    #[serde(rename = "useragent")]
    pub user_agent: String,
    #[serde(rename = "sslcipher")]
    pub ssl_cipher: String,
    #[serde(rename = "sslprotocol")]
    pub ssl_protocol: String,
}
