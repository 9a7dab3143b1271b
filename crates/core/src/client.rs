//! Object storage client implementation using AWS S3 SDK

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use std::fmt;
use tracing::{debug, info, warn};

/// A single write-object request
#[derive(Clone)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
}

impl fmt::Debug for PutObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutObject")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("body_len", &self.body.len())
            .field("content_type", &self.content_type)
            .field("cache_control", &self.cache_control)
            .finish()
    }
}

/// Remote write side of an object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `request.body` under `request.key` with its metadata
    async fn put_object(&self, request: PutObject) -> Result<()>;
}

/// S3-compatible store (AWS S3, R2, MinIO)
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from the storage settings.
    ///
    /// Explicit keys are used when both halves are set; otherwise the AWS
    /// default provider chain is consulted. Credentials are resolved here so
    /// that a setup without any fails before the first upload.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let region = config.region.trim();
        if region.is_empty() {
            return Err(Error::ClientInit("region is empty".to_string()));
        }

        if let Some(endpoint) = &config.endpoint {
            validate_endpoint(endpoint)?;
        }

        let credentials = explicit_credentials(config)?;

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(credentials) = credentials {
            loader = loader.credentials_provider(credentials);
        }
        let shared = loader.load().await;

        let provider = shared
            .credentials_provider()
            .ok_or_else(|| Error::ClientInit("no credentials provider available".to_string()))?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| Error::ClientInit(format!("no usable credentials: {}", e)))?;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            region = %region,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            "Storage client ready"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, request: PutObject) -> Result<()> {
        debug!(bucket = %request.bucket, key = %request.key, size = request.body.len(), "PutObject");

        let key = request.key.clone();
        self.client
            .put_object()
            .bucket(request.bucket)
            .key(request.key)
            .body(ByteStream::from(request.body))
            .content_type(request.content_type)
            .cache_control(request.cache_control)
            .send()
            .await
            .map_err(|err| {
                warn!(key = %key, error = %DisplayErrorContext(&err), "PutObject failed");
                Error::from(err)
            })?;

        Ok(())
    }
}

/// Store that only logs what would be uploaded
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunStore;

#[async_trait]
impl ObjectStore for DryRunStore {
    async fn put_object(&self, request: PutObject) -> Result<()> {
        info!(
            bucket = %request.bucket,
            key = %request.key,
            content_type = %request.content_type,
            cache_control = %request.cache_control,
            "DRY RUN: would upload {} bytes",
            request.body.len()
        );
        Ok(())
    }
}

fn explicit_credentials(config: &StorageConfig) -> Result<Option<Credentials>> {
    match (&config.access_key_id, &config.secret_access_key) {
        (Some(key_id), Some(secret)) => Ok(Some(Credentials::new(
            key_id,
            secret,
            config.session_token.clone(),
            None,
            "sitepush",
        ))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(Error::ClientInit(
            "AWS_ACCESS_KEY_ID is set but AWS_SECRET_ACCESS_KEY is missing".to_string(),
        )),
        (None, Some(_)) => Err(Error::ClientInit(
            "AWS_SECRET_ACCESS_KEY is set but AWS_ACCESS_KEY_ID is missing".to_string(),
        )),
    }
}

/// Endpoints must be absolute http(s) URIs with a host
fn validate_endpoint(endpoint: &str) -> Result<()> {
    let uri: http::Uri = endpoint
        .parse()
        .map_err(|e| Error::ClientInit(format!("invalid endpoint '{}': {}", endpoint, e)))?;

    match (uri.scheme_str(), uri.host()) {
        (Some("http") | Some("https"), Some(_)) => Ok(()),
        _ => Err(Error::ClientInit(format!(
            "invalid endpoint '{}': expected http(s)://host",
            endpoint
        ))),
    }
}
