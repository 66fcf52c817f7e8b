//! Environment-backed runtime configuration.

use std::env;

use snapstash_transfer::{DEFAULT_DOWNLOAD_SUFFIX, validate_remote_url};
use thiserror::Error;

use crate::{CAPTURE_ENABLED_VAR, capture_enabled_from_value};

const BUCKET_PATH_VAR: &str = "SNAPSTASH_BUCKET_PATH";
const DOCUMENT_URL_VAR: &str = "SNAPSTASH_DOCUMENT_URL";
const DOWNLOAD_DIR_VAR: &str = "SNAPSTASH_DOWNLOAD_DIR";
const ARTIFACT_NAME_VAR: &str = "SNAPSTASH_ARTIFACT_NAME";
const DOWNLOAD_SUFFIX_VAR: &str = "SNAPSTASH_DOWNLOAD_SUFFIX";

/// Display name given to captured artifacts by default.
pub const DEFAULT_ARTIFACT_NAME: &str = "test";

/// Injected settings for the orchestration controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Upload destination, `bucket` or `bucket/prefix`.
    pub bucket_path: String,
    /// Document fetched by the download action.
    pub document_url: String,
    /// Download target; the filesystem's download directory when `None`.
    pub download_dir: Option<String>,
    /// Display name used in transfer keys.
    pub artifact_name: String,
    /// Suffix of downloaded file names.
    pub download_suffix: String,
    /// Capture kill switch.
    pub capture_enabled: bool,
}

impl AppConfig {
    /// Creates a config with defaults for everything but the two endpoints.
    pub fn new(bucket_path: impl Into<String>, document_url: impl Into<String>) -> Self {
        Self {
            bucket_path: bucket_path.into(),
            document_url: document_url.into(),
            download_dir: None,
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            download_suffix: DEFAULT_DOWNLOAD_SUFFIX.to_string(),
            capture_enabled: true,
        }
    }

    /// Overrides the download directory.
    pub fn with_download_dir(mut self, dir: impl Into<String>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Sets the kill switch.
    pub fn with_capture_enabled(mut self, enabled: bool) -> Self {
        self.capture_enabled = enabled;
        self
    }

    /// Loads settings from the process environment.
    ///
    /// # Errors
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads settings through `lookup`; blank values count as unset.
    ///
    /// # Errors
    /// - [`ConfigError::Missing`] when the bucket path or document URL is unset.
    /// - [`ConfigError::Invalid`] when the document URL is not http(s) or the
    ///   artifact name contains a path separator.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bucket_path = read(BUCKET_PATH_VAR).ok_or(ConfigError::Missing(BUCKET_PATH_VAR))?;
        let document_url = read(DOCUMENT_URL_VAR).ok_or(ConfigError::Missing(DOCUMENT_URL_VAR))?;
        validate_remote_url(&document_url).map_err(|error| ConfigError::Invalid {
            name: DOCUMENT_URL_VAR,
            reason: error.to_string(),
        })?;

        let artifact_name =
            read(ARTIFACT_NAME_VAR).unwrap_or_else(|| DEFAULT_ARTIFACT_NAME.to_string());
        if artifact_name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                name: ARTIFACT_NAME_VAR,
                reason: "must not contain path separators".to_string(),
            });
        }

        Ok(Self {
            bucket_path,
            document_url,
            download_dir: read(DOWNLOAD_DIR_VAR),
            artifact_name,
            download_suffix: read(DOWNLOAD_SUFFIX_VAR)
                .unwrap_or_else(|| DEFAULT_DOWNLOAD_SUFFIX.to_string()),
            capture_enabled: capture_enabled_from_value(lookup(CAPTURE_ENABLED_VAR).as_deref()),
        })
    }
}

/// Configuration loading error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Required variable unset or blank.
    #[error("{0} is required")]
    Missing(&'static str),
    /// Variable present but unusable.
    #[error("{name} is invalid: {reason}")]
    Invalid {
        /// Offending variable.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
