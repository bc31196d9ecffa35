use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::ObjectStore;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::config::Config;

/// A readable line stream for one fetched object.
pub type ObjectStream = Box<dyn AsyncBufRead + Send + Unpin>;

/// Fatal for the current object; sibling records are unaffected.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to get object: {0}")]
    Store(#[from] object_store::Error),
}

/// Boundary to the object store: hands the session a byte stream for one
/// bucket/key pair. Credential resolution lives behind this seam.
#[async_trait]
pub trait ObjectFetch: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<ObjectStream, FetchError>;
}

/// S3-backed fetcher. A client is built per fetch since every event record
/// may name a different bucket.
pub struct S3ObjectFetch {
    region: String,
    credentials: Option<(String, String)>,
}

impl S3ObjectFetch {
    pub fn new(config: &Config) -> Self {
        let credentials = config
            .aws_access_key_id
            .clone()
            .zip(config.aws_secret_access_key.clone());
        Self {
            region: config.region.clone(),
            credentials,
        }
    }
}

#[async_trait]
impl ObjectFetch for S3ObjectFetch {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<ObjectStream, FetchError> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(self.region.clone())
            .with_bucket_name(bucket);
        match &self.credentials {
            Some((key_id, secret)) => {
                debug!("AWS auth with access key/secret");
                builder = builder
                    .with_access_key_id(key_id)
                    .with_secret_access_key(secret);
            }
            None => debug!("AWS auth with ambient role credentials"),
        }

        let store = builder.build()?;
        let object = store.get(&Path::from(key)).await?;
        let stream = object.into_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(stream)))
    }
}
