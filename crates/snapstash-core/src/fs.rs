//! Filesystem capability shared by capture and transfer code.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Remote fetch request handed to [`FileSystem::download_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Source URL.
    pub from_url: String,
    /// Destination file path.
    pub to_file: String,
}

/// Result of a completed fetch.
///
/// A non-2xx `status_code` is still reported here; deciding whether that is a
/// failure is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReceipt {
    /// HTTP-style status code returned by the remote end.
    pub status_code: u16,
    /// Bytes written to the destination file.
    pub bytes_written: u64,
}

impl DownloadReceipt {
    /// Returns `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Local storage operations consumed by the core.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Reads a whole file and returns it base64-encoded.
    async fn read_file_as_base64(&self, path: &str) -> Result<String, FsError>;

    /// Creates or truncates `path` with `contents`.
    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError>;

    /// Removes a file.
    async fn remove_file(&self, path: &str) -> Result<(), FsError>;

    /// Platform download directory.
    fn download_directory(&self) -> String;

    /// Fetches `request.from_url` and writes the body to `request.to_file`.
    async fn download_file(&self, request: &DownloadRequest) -> Result<DownloadReceipt, FsError>;
}

/// In-process [`FileSystem`] with a table of fetchable remote objects.
#[derive(Debug)]
pub struct MemoryFileSystem {
    download_dir: String,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    remote: Mutex<BTreeMap<String, Vec<u8>>>,
    offline: Mutex<bool>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem whose download directory is `download_dir`.
    pub fn new(download_dir: impl Into<String>) -> Self {
        Self {
            download_dir: download_dir.into(),
            files: Mutex::new(BTreeMap::new()),
            remote: Mutex::new(BTreeMap::new()),
            offline: Mutex::new(false),
        }
    }

    /// Registers a remote object that `download_file` can fetch.
    pub fn serve(&self, url: impl Into<String>, body: Vec<u8>) {
        lock(&self.remote).insert(url.into(), body);
    }

    /// Makes every subsequent fetch fail with [`FsError::Network`].
    pub fn set_offline(&self, offline: bool) {
        *lock(&self.offline) = offline;
    }

    /// Returns a copy of a stored file.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.files).get(path).cloned()
    }

    /// Returns `true` when `path` exists.
    pub fn exists(&self, path: &str) -> bool {
        lock(&self.files).contains_key(path)
    }

    /// Lists stored file paths in lexical order.
    pub fn paths(&self) -> Vec<String> {
        lock(&self.files).keys().cloned().collect()
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new("/downloads")
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read_file_as_base64(&self, path: &str) -> Result<String, FsError> {
        lock(&self.files)
            .get(path)
            .map(|bytes| STANDARD.encode(bytes))
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        lock(&self.files).insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<(), FsError> {
        lock(&self.files)
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    fn download_directory(&self) -> String {
        self.download_dir.clone()
    }

    async fn download_file(&self, request: &DownloadRequest) -> Result<DownloadReceipt, FsError> {
        if *lock(&self.offline) {
            return Err(FsError::Network(format!(
                "unable to reach {}",
                request.from_url
            )));
        }

        let body = lock(&self.remote).get(&request.from_url).cloned();
        match body {
            Some(body) => {
                let bytes_written = body.len() as u64;
                lock(&self.files).insert(request.to_file.clone(), body);
                Ok(DownloadReceipt {
                    status_code: 200,
                    bytes_written,
                })
            }
            None => Ok(DownloadReceipt {
                status_code: 404,
                bytes_written: 0,
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Filesystem capability error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FsError {
    /// Path does not exist.
    #[error("file not found: {0}")]
    NotFound(String),
    /// Local I/O failure.
    #[error("i/o failure on {path}: {message}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Underlying error text.
        message: String,
    },
    /// Remote fetch failed before a status was received.
    #[error("network failure: {0}")]
    Network(String),
}
