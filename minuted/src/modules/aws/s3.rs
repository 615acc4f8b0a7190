//! S3 blob adapter.
//!
//! `put` prepends the configured prefix and returns the full key; `get`
//! takes keys as stored, so everything a record carries resolves directly.
//!
//! Required IAM permissions:
//!   - s3:GetObject
//!   - s3:PutObject
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{prefixed_key, BlobStore, Error};

/// S3-backed [BlobStore].
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3BlobStore {
    /// Build the adapter for one bucket and prefix.
    pub fn new(conf: &SdkConfig, bucket: &str, prefix: &str) -> Self {
        S3BlobStore {
            client: Client::new(conf),
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::BlobError(format!("{}", DisplayErrorContext(e))))?;

        let collected = output
            .body
            .collect()
            .await
            .map_err(|e| Error::BlobError(format!("{}", e)))?;
        Ok(collected.into_bytes().to_vec())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, Error> {
        let full_key = prefixed_key(&self.prefix, key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| Error::BlobError(format!("{}", DisplayErrorContext(e))))?;
        Ok(full_key)
    }
}
