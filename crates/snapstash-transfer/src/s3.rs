//! S3-compatible [`ObjectStore`] on the AWS SDK.

use std::env;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use crate::{ObjectStore, PutObjectRequest, TransferError};

const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for [`S3ObjectStore`].
#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    /// Signing region.
    pub region: String,
    /// Custom endpoint for S3-compatible services.
    pub endpoint_url: Option<String>,
    /// Static access key; the default credential chain is used when absent.
    pub access_key_id: Option<String>,
    /// Static secret key paired with `access_key_id`.
    pub secret_access_key: Option<String>,
}

impl S3Config {
    /// Reads `SNAPSTASH_S3_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            region: read("SNAPSTASH_S3_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint_url: read("SNAPSTASH_S3_ENDPOINT_URL"),
            access_key_id: read("SNAPSTASH_S3_ACCESS_KEY_ID"),
            secret_access_key: read("SNAPSTASH_S3_SECRET_ACCESS_KEY"),
        }
    }

    /// Returns `true` when a custom endpoint or static credentials are set.
    pub fn is_configured(&self) -> bool {
        self.endpoint_url.is_some() || self.access_key_id.is_some()
    }
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "<set>"))
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<set>"),
            )
            .finish()
    }
}

/// Object store writing through an S3 client.
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Builds a client from `config`.
    pub async fn connect(config: &S3Config) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "snapstash",
            ));
        }

        let shared = loader.load().await;
        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&shared)
                // Custom endpoints rarely support virtual-hosted buckets.
                .force_path_style(config.endpoint_url.is_some())
                .build(),
        );

        Self { client }
    }

    /// Wraps an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), TransferError> {
        let (bucket, prefix) = split_bucket_path(&request.bucket_path)?;
        let key = match prefix {
            Some(prefix) => format!("{prefix}/{}", request.key),
            None => request.key,
        };
        debug!(bucket = %bucket, key = %key, body_len = request.body.len(), "put_object");

        let result = self
            .client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .content_type(request.content_type)
            .body(ByteStream::from(request.body))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) => {
                let detail = DisplayErrorContext(&error).to_string();
                Err(match &error {
                    SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
                        TransferError::Network(detail)
                    }
                    SdkError::ServiceError(context) => TransferError::Rejected {
                        status: context.raw().status().as_u16(),
                        message: detail,
                    },
                    _ => TransferError::Storage(detail),
                })
            }
        }
    }
}

/// Splits `bucket/prefix/...` into the bucket name and an optional key prefix.
///
/// # Errors
/// Returns [`TransferError::InvalidBucketPath`] when the bucket segment is
/// empty.
pub fn split_bucket_path(bucket_path: &str) -> Result<(&str, Option<&str>), TransferError> {
    let trimmed = bucket_path.trim().trim_matches('/');
    let (bucket, prefix) = match trimmed.split_once('/') {
        Some((bucket, prefix)) => (bucket, Some(prefix.trim_matches('/'))),
        None => (trimmed, None),
    };

    if bucket.is_empty() {
        return Err(TransferError::InvalidBucketPath(format!(
            "missing bucket name in `{bucket_path}`"
        )));
    }

    Ok((bucket, prefix.filter(|prefix| !prefix.is_empty())))
}
