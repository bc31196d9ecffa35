use chrono::{DateTime, Utc};
use serde::Deserialize;

/// An S3 notification payload. One invocation receives exactly one of
/// these; it may carry several records.
#[derive(Deserialize, Debug, Clone)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

/// Contextual data about a single S3 object event.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default)]
    pub event_version: String,
    #[serde(default)]
    pub event_source: String,
    #[serde(default)]
    pub aws_region: String,
    /// When S3 finished processing the request, ISO-8601.
    pub event_time: DateTime<Utc>,
    pub event_name: String,
    #[serde(default)]
    pub user_identity: UserIdentity,
    #[serde(default)]
    pub request_parameters: RequestParameters,
    #[serde(default)]
    pub response_elements: ResponseElements,
    pub s3: S3Record,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserIdentity {
    #[serde(rename = "principalId", default)]
    pub principal_id: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RequestParameters {
    #[serde(rename = "sourceIPAddress", default)]
    pub source_ip_address: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ResponseElements {
    #[serde(rename = "x-amz-id-2", default)]
    pub amz_id_2: String,
    #[serde(rename = "x-amz-request-id", default)]
    pub amz_request_id: String,
}

/// The bucket/object pair the event is about.
#[derive(Deserialize, Debug, Clone)]
pub struct S3Record {
    #[serde(rename = "s3SchemaVersion", default)]
    pub schema_version: String,
    #[serde(rename = "configurationId", default)]
    pub configuration_id: String,
    pub bucket: Bucket,
    pub object: S3Object,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub arn: String,
    #[serde(rename = "ownerIdentity", default)]
    pub owner_identity: UserIdentity,
}

#[derive(Deserialize, Debug, Clone)]
pub struct S3Object {
    pub key: String,
    /// Provided for "ObjectCreated" events, otherwise 0.
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "eTag", default)]
    pub e_tag: String,
    #[serde(rename = "versionId", default)]
    pub version_id: String,
    /// Hex value used to determine event sequence, PUTs and DELETEs only.
    #[serde(default)]
    pub sequencer: String,
}
