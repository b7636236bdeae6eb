//! Object storage adapter: put, link and delete against an S3-compatible
//! bucket (Cloudflare R2 in production).

use crate::config::StorageConfig;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client, config::Credentials, error::DisplayErrorContext, presigning::PresigningConfig,
    primitives::ByteStream,
};
use bytes::Bytes;
use std::{collections::HashMap, time::Duration};
use thiserror::Error;
use tracing::{error, info};

/// Longest value kept for a single metadata entry.
pub const MAX_METADATA_LEN: usize = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("upload of `{key}` failed: {message}")]
    Put { key: String, message: String },
    #[error("link generation for `{key}` failed: {message}")]
    Link { key: String, message: String },
    #[error("delete of `{key}` failed: {message}")]
    Delete { key: String, message: String },
}

impl StoreError {
    /// Underlying backend message, without the key context.
    pub fn message(&self) -> &str {
        match self {
            Self::Put { message, .. } | Self::Link { message, .. } | Self::Delete { message, .. } => {
                message
            }
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// How read links are produced. Fixed per deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkPolicy {
    /// `prefix/key`, permanent.
    Public { prefix: String },
    /// Signed GET URL valid for `expires_in` from generation time.
    Presigned { expires_in: Duration },
}

/// A consumable URL for a stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessLink {
    pub url: String,
    /// `None` for permanent public links.
    pub expires_in: Option<Duration>,
}

/// Black-box object store used by the media lifecycle.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` at `key`, overwriting any existing object.
    ///
    /// Metadata values are expected to be sanitized already
    /// (see [`sanitize_metadata`]).
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StoreResult<()>;

    /// Produce a read link for `key`. Does not check that the object exists.
    async fn read_link(&self, key: &str) -> StoreResult<AccessLink>;

    /// Remove `key`. Deleting an absent object succeeds.
    async fn delete_object(&self, key: &str) -> StoreResult<()>;
}

/// Make a scraped or user-supplied value safe to send as an object metadata header.
///
/// CR, LF and TAB become spaces, anything outside printable ASCII is dropped,
/// the result is trimmed and capped at [`MAX_METADATA_LEN`] characters.
pub fn sanitize_metadata(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if matches!(c, '\r' | '\n' | '\t') { ' ' } else { c })
        .filter(|c| matches!(c, '\x20'..='\x7e'))
        .collect();
    cleaned.trim().chars().take(MAX_METADATA_LEN).collect()
}

/// [`ObjectStore`] over the AWS S3 SDK with path-style addressing.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    policy: LinkPolicy,
}

impl S3ObjectStore {
    /// Build a client from explicit credentials, endpoint and region.
    pub async fn new(cfg: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            cfg.access_key_id.clone(),
            cfg.secret_access_key.clone(),
            None,
            None,
            "reel-relay-config",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(cfg.region.clone()))
            .endpoint_url(&cfg.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: cfg.bucket.clone(),
            policy: cfg.link_policy(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StoreResult<()> {
        let size = body.len();
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(
                    error = %message,
                    bucket = %self.bucket,
                    key,
                    size_bytes = size,
                    "object upload failed"
                );
                StoreError::Put {
                    key: key.to_string(),
                    message,
                }
            })?;

        info!(
            bucket = %self.bucket,
            key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "uploaded object"
        );
        Ok(())
    }

    async fn read_link(&self, key: &str) -> StoreResult<AccessLink> {
        match &self.policy {
            LinkPolicy::Public { prefix } => Ok(AccessLink {
                url: format!("{prefix}/{key}"),
                expires_in: None,
            }),
            LinkPolicy::Presigned { expires_in } => {
                let link_err = |message: String| StoreError::Link {
                    key: key.to_string(),
                    message,
                };

                let presigning = PresigningConfig::expires_in(*expires_in)
                    .map_err(|e| link_err(e.to_string()))?;
                let request = self
                    .client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .presigned(presigning)
                    .await
                    .map_err(|e| link_err(DisplayErrorContext(&e).to_string()))?;

                Ok(AccessLink {
                    url: request.uri().to_string(),
                    expires_in: Some(*expires_in),
                })
            }
        }
    }

    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(error = %message, bucket = %self.bucket, key, "object delete failed");
                StoreError::Delete {
                    key: key.to_string(),
                    message,
                }
            })?;

        info!(bucket = %self.bucket, key, "deleted object");
        Ok(())
    }
}
