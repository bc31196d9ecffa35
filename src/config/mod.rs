use std::env;

/// ~6k log lines is about 3MB of payload; one access-log file usually
/// fits in a single flush.
const DEFAULT_BULK_LIMIT: usize = 6000;
const DEFAULT_REGION: &str = "eu-west-1";
const DEFAULT_ELK_URL: &str = "http://127.0.0.1:9200";

/// Resolved once per invocation and injected into every session by value.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub debug: bool,
    pub elk_url: String,
    pub bulk_limit: usize,
    pub region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
}

impl Config {
    /// The deployment environment is the trailing segment of the invoking
    /// function identifier, e.g. `arn:aws:lambda:...:function:elbstream:LIVE`.
    pub fn resolve(function_arn: &str) -> Self {
        let environment = function_arn.rsplit(':').next().unwrap_or(function_arn);
        Self::for_environment(environment)
    }

    pub fn for_environment(environment: &str) -> Self {
        let local = environment == "LOCAL";
        Self {
            environment: environment.to_string(),
            debug: env::var("DEBUG")
                .map(|value| value == "true")
                .unwrap_or(local),
            elk_url: env::var("ELK_URL").unwrap_or_else(|_| DEFAULT_ELK_URL.into()),
            bulk_limit: env::var("BULK_LIMIT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_BULK_LIMIT),
            region: env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.into()),
            aws_access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            aws_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
        }
    }
}
