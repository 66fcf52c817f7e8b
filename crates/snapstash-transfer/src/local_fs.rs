//! [`FileSystem`] on the local disk with HTTP downloads.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use snapstash_core::{DownloadReceipt, DownloadRequest, FileSystem, FsError};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Local-disk filesystem. Paths may be plain or `file://` URIs.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    download_dir: PathBuf,
    http: reqwest::Client,
}

impl LocalFileSystem {
    /// Creates a filesystem whose download directory is `download_dir`.
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Replaces the HTTP client used for downloads.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read_file_as_base64(&self, path: &str) -> Result<String, FsError> {
        let local = local_path(path);
        let bytes = tokio::fs::read(&local)
            .await
            .map_err(|error| io_error(&local, error))?;
        Ok(STANDARD.encode(bytes))
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let local = local_path(path);
        ensure_parent(&local).await?;
        tokio::fs::write(&local, contents)
            .await
            .map_err(|error| io_error(&local, error))
    }

    async fn remove_file(&self, path: &str) -> Result<(), FsError> {
        let local = local_path(path);
        tokio::fs::remove_file(&local)
            .await
            .map_err(|error| io_error(&local, error))
    }

    fn download_directory(&self) -> String {
        self.download_dir.display().to_string()
    }

    async fn download_file(&self, request: &DownloadRequest) -> Result<DownloadReceipt, FsError> {
        let mut response = self
            .http
            .get(&request.from_url)
            .send()
            .await
            .map_err(|error| FsError::Network(error.to_string()))?;

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            return Ok(DownloadReceipt {
                status_code,
                bytes_written: 0,
            });
        }

        let total = response.content_length();
        let local = local_path(&request.to_file);
        ensure_parent(&local).await?;
        let mut file = tokio::fs::File::create(&local)
            .await
            .map_err(|error| io_error(&local, error))?;

        let mut bytes_written = 0_u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|error| FsError::Network(error.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|error| io_error(&local, error))?;
            bytes_written += chunk.len() as u64;
            debug!(bytes_written, total = ?total, path = %local.display(), "download progress");
        }
        file.flush().await.map_err(|error| io_error(&local, error))?;

        Ok(DownloadReceipt {
            status_code,
            bytes_written,
        })
    }
}

fn local_path(path: &str) -> PathBuf {
    PathBuf::from(path.strip_prefix("file://").unwrap_or(path))
}

async fn ensure_parent(path: &Path) -> Result<(), FsError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|error| io_error(parent, error)),
        _ => Ok(()),
    }
}

fn io_error(path: &Path, error: std::io::Error) -> FsError {
    if error.kind() == std::io::ErrorKind::NotFound {
        return FsError::NotFound(path.display().to_string());
    }
    FsError::Io {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}
