#![warn(missing_docs)]
//! # snapstash-transfer
//!
//! ## Purpose
//! Moves staged artifacts to object storage and fetches remote documents to
//! local storage.
//!
//! ## Responsibilities
//! - Generate transfer keys and download filenames from the clock.
//! - Upload one artifact per call through an injectable [`ObjectStore`].
//! - Download one remote object per call through the [`FileSystem`]
//!   capability.
//! - Classify failures into retriable and permanent for user messaging.
//! - Ship concrete backends: [`S3ObjectStore`], [`LocalFileSystem`],
//!   [`MemoryObjectStore`].
//!
//! ## Data flow
//! Controller -> [`TransferClient::upload`] -> [`ObjectStore::put_object`] ->
//! [`TransferResult`]; controller -> [`TransferClient::download`] ->
//! [`FileSystem::download_file`] -> [`TransferResult`].
//!
//! ## Error model
//! Internally every stage returns [`TransferError`]; the public operations fold
//! it into [`TransferResult::Failure`] so callers never see a panic or a
//! propagated error from an I/O boundary. Nothing is retried.
//!
//! ## Security and privacy notes
//! Payload bytes are never logged. Uploads are identified in logs by
//! [`payload_fingerprint`].

mod local_fs;
mod s3;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use snapstash_core::{
    ARTIFACT_CONTENT_TYPE, CaptureArtifact, Clock, FailureClass, FileSystem, FsError,
    TransferResult,
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

pub use local_fs::LocalFileSystem;
pub use s3::{S3Config, S3ObjectStore, split_bucket_path};

/// Default suffix appended to downloaded filenames.
pub const DEFAULT_DOWNLOAD_SUFFIX: &str = "test.pdf";

/// Object write handed to [`ObjectStore::put_object`].
#[derive(Clone, PartialEq, Eq)]
pub struct PutObjectRequest {
    /// Destination namespace, `bucket` or `bucket/prefix`.
    pub bucket_path: String,
    /// Object key inside the namespace.
    pub key: String,
    /// Object body.
    pub body: Vec<u8>,
    /// MIME type stored with the object.
    pub content_type: String,
}

impl std::fmt::Debug for PutObjectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutObjectRequest")
            .field("bucket_path", &self.bucket_path)
            .field("key", &self.key)
            .field("body_len", &self.body.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Remote object storage capability.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes one object.
    ///
    /// # Errors
    /// Returns a [`TransferError`] describing the backend failure.
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), TransferError>;
}

/// Builds the object key `{timestamp_ms}_{display_name}.jpg`.
///
/// Two uploads in the same millisecond with the same display name produce the
/// same key.
pub fn transfer_key(timestamp_ms: u64, display_name: &str) -> String {
    format!("{timestamp_ms}_{display_name}.jpg")
}

/// Builds the download filename `{timestamp_ms}_{suffix}`.
pub fn download_file_name(timestamp_ms: u64, suffix: &str) -> String {
    format!("{timestamp_ms}_{suffix}")
}

/// Hex-encoded SHA-256 of a payload, used to identify uploads in logs.
pub fn payload_fingerprint(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Maps a transfer error to a retry hint.
pub fn classify_transfer_error(error: &TransferError) -> FailureClass {
    match error {
        TransferError::Network(_) | TransferError::Storage(_) => FailureClass::Retriable,
        TransferError::Rejected { status, .. } if *status >= 500 => FailureClass::Retriable,
        TransferError::Rejected { status: 408 | 429, .. } => FailureClass::Retriable,
        TransferError::Rejected { .. } => FailureClass::Permanent,
        TransferError::FileSystem(FsError::Network(_)) => FailureClass::Retriable,
        TransferError::FileSystem(_)
        | TransferError::InvalidUrl(_)
        | TransferError::InvalidBucketPath(_) => FailureClass::Permanent,
    }
}

/// Upload/download client. One attempt per call.
#[derive(Clone)]
pub struct TransferClient {
    store: Arc<dyn ObjectStore>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    download_suffix: String,
}

impl TransferClient {
    /// Creates a client using [`DEFAULT_DOWNLOAD_SUFFIX`].
    pub fn new(
        store: Arc<dyn ObjectStore>,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            fs,
            clock,
            download_suffix: DEFAULT_DOWNLOAD_SUFFIX.to_string(),
        }
    }

    /// Overrides the download filename suffix.
    pub fn with_download_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.download_suffix = suffix.into();
        self
    }

    /// Uploads `artifact` to `bucket_path` as `image/jpeg`.
    ///
    /// # Returns
    /// `Success { location }` with the generated key, or `Failure` with the
    /// backend reason. The artifact is only borrowed; discarding it on success
    /// is the caller's job.
    pub async fn upload(&self, artifact: &CaptureArtifact, bucket_path: &str) -> TransferResult {
        let fingerprint = payload_fingerprint(artifact.payload());
        match self.try_upload(artifact, bucket_path).await {
            Ok(key) => {
                info!(
                    bucket_path = %bucket_path,
                    key = %key,
                    payload_len = artifact.payload_len(),
                    fingerprint = %fingerprint,
                    "upload succeeded"
                );
                TransferResult::Success { location: key }
            }
            Err(error) => {
                let class = classify_transfer_error(&error);
                warn!(
                    bucket_path = %bucket_path,
                    fingerprint = %fingerprint,
                    ?class,
                    error = %error,
                    "upload failed"
                );
                TransferResult::Failure {
                    reason: error.to_string(),
                    class,
                }
            }
        }
    }

    /// Downloads `remote_url` into `local_directory`.
    ///
    /// The destination is `{local_directory}/{timestamp_ms}_{suffix}`. A
    /// non-2xx status is a failure. Partially written files are left in place.
    pub async fn download(&self, remote_url: &str, local_directory: &str) -> TransferResult {
        match self.try_download(remote_url, local_directory).await {
            Ok(path) => {
                info!(remote_url = %remote_url, path = %path, "download succeeded");
                TransferResult::Success { location: path }
            }
            Err(error) => {
                let class = classify_transfer_error(&error);
                warn!(remote_url = %remote_url, ?class, error = %error, "download failed");
                TransferResult::Failure {
                    reason: error.to_string(),
                    class,
                }
            }
        }
    }

    async fn try_upload(
        &self,
        artifact: &CaptureArtifact,
        bucket_path: &str,
    ) -> Result<String, TransferError> {
        if bucket_path.trim().is_empty() {
            return Err(TransferError::InvalidBucketPath(
                "bucket path is empty".to_string(),
            ));
        }

        let key = transfer_key(self.clock.now_ms(), artifact.display_name());
        self.store
            .put_object(PutObjectRequest {
                bucket_path: bucket_path.to_string(),
                key: key.clone(),
                body: artifact.payload().to_vec(),
                content_type: ARTIFACT_CONTENT_TYPE.to_string(),
            })
            .await?;
        Ok(key)
    }

    async fn try_download(
        &self,
        remote_url: &str,
        local_directory: &str,
    ) -> Result<String, TransferError> {
        let url = validate_remote_url(remote_url)?;
        let file_name = download_file_name(self.clock.now_ms(), &self.download_suffix);
        let to_file = format!("{}/{file_name}", local_directory.trim_end_matches('/'));

        let receipt = self
            .fs
            .download_file(&snapstash_core::DownloadRequest {
                from_url: url.to_string(),
                to_file: to_file.clone(),
            })
            .await
            .map_err(TransferError::FileSystem)?;

        if !receipt.is_success() {
            return Err(TransferError::Rejected {
                status: receipt.status_code,
                message: format!("remote returned status {}", receipt.status_code),
            });
        }

        Ok(to_file)
    }
}

/// Parses a remote URL and requires an http(s) scheme.
///
/// # Errors
/// Returns [`TransferError::InvalidUrl`] otherwise.
pub fn validate_remote_url(remote_url: &str) -> Result<Url, TransferError> {
    let parsed = Url::parse(remote_url)
        .map_err(|error| TransferError::InvalidUrl(format!("{remote_url}: {error}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(TransferError::InvalidUrl(format!(
            "unsupported scheme `{other}` in {remote_url}"
        ))),
    }
}

/// Object stored by [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object body.
    pub body: Vec<u8>,
    /// MIME type recorded at write time.
    pub content_type: String,
}

/// In-process [`ObjectStore`] used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    rejection: Mutex<Option<TransferError>>,
    attempts: Mutex<u32>,
}

impl MemoryObjectStore {
    /// Creates an empty store that accepts every write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with `error`.
    pub fn reject_puts_with(&self, error: TransferError) {
        *lock(&self.rejection) = Some(error);
    }

    /// Accepts writes again.
    pub fn accept_puts(&self) {
        *lock(&self.rejection) = None;
    }

    /// Reads one stored object.
    pub fn get(&self, bucket_path: &str, key: &str) -> Option<StoredObject> {
        lock(&self.objects)
            .get(&(bucket_path.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        lock(&self.objects).is_empty()
    }

    /// Number of `put_object` calls, accepted or not.
    pub fn attempts(&self) -> u32 {
        *lock(&self.attempts)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), TransferError> {
        *lock(&self.attempts) += 1;
        if let Some(error) = lock(&self.rejection).clone() {
            return Err(error);
        }

        lock(&self.objects).insert(
            (request.bucket_path, request.key),
            StoredObject {
                body: request.body,
                content_type: request.content_type,
            },
        );
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transfer layer error type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Upload destination is unusable.
    #[error("invalid bucket path: {0}")]
    InvalidBucketPath(String),
    /// Download source is not an http(s) URL.
    #[error("invalid remote url: {0}")]
    InvalidUrl(String),
    /// Request never reached the backend or timed out.
    #[error("network failure: {0}")]
    Network(String),
    /// Backend answered with an error status.
    #[error("rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Backend error detail.
        message: String,
    },
    /// Any other storage backend failure.
    #[error("storage backend failure: {0}")]
    Storage(String),
    /// Local filesystem failure during download.
    #[error("filesystem failure: {0}")]
    FileSystem(FsError),
}
