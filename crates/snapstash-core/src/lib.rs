#![warn(missing_docs)]
//! # snapstash-core
//!
//! ## Purpose
//! Defines the pure data model and shared capabilities used across the
//! `snapstash` workspace.
//!
//! ## Responsibilities
//! - Represent camera permission states and snapshot options.
//! - Represent the single staged [`CaptureArtifact`] awaiting transfer.
//! - Represent terminal transfer outcomes ([`TransferResult`]).
//! - Define the [`FileSystem`] and [`Clock`] capabilities consumed by capture
//!   and transfer code.
//!
//! ## Data flow
//! Capture code reads snapshot files through [`FileSystem`] and stages a
//! [`CaptureArtifact`]. Transfer code consumes the artifact and reports a
//! [`TransferResult`] that the controller projects into UI state.
//!
//! ## Ownership and lifetimes
//! Artifacts own their payload (`Vec<u8>`) so an upload can borrow a copy while
//! the controller keeps the original slot intact for retries.
//!
//! ## Error model
//! Validation failures return [`CoreError`]; filesystem capability failures
//! return [`FsError`].
//!
//! ## Security and privacy notes
//! Payload bytes are never included in `Debug` output or error messages.
//!
//! ## Example
//! ```rust
//! use snapstash_core::{CaptureArtifact, PermissionState, SnapshotOptions};
//!
//! let artifact = CaptureArtifact::new("/tmp/snap.jpg", vec![0xFF, 0xD8], "test").unwrap();
//! assert_eq!(artifact.payload_len(), 2);
//! assert!(PermissionState::Authorized.is_authorized());
//! assert_eq!(SnapshotOptions::default().quality(), 85);
//! ```

mod fs;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fs::{DownloadReceipt, DownloadRequest, FileSystem, FsError, MemoryFileSystem};

/// Snapshot quality used for every capture.
pub const DEFAULT_SNAPSHOT_QUALITY: u8 = 85;

/// Content type attached to uploaded artifacts.
pub const ARTIFACT_CONTENT_TYPE: &str = "image/jpeg";

/// Camera authorization as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Camera access granted.
    Authorized,
    /// The user has not answered the permission prompt yet.
    NotDetermined,
    /// Camera access refused or restricted.
    Denied,
}

impl PermissionState {
    /// Returns `true` for [`PermissionState::Authorized`].
    pub fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized)
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Authorized => "authorized",
            Self::NotDetermined => "not_determined",
            Self::Denied => "denied",
        };
        f.write_str(label)
    }
}

/// Hardware snapshot options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    quality: u8,
    skip_metadata: bool,
}

impl SnapshotOptions {
    /// Creates validated snapshot options.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidQuality`] unless `1 <= quality <= 100`.
    pub fn new(quality: u8, skip_metadata: bool) -> Result<Self, CoreError> {
        if quality == 0 || quality > 100 {
            return Err(CoreError::InvalidQuality(quality));
        }
        Ok(Self {
            quality,
            skip_metadata,
        })
    }

    /// JPEG quality in percent.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Whether EXIF/metadata is stripped from the snapshot.
    pub fn skip_metadata(&self) -> bool {
        self.skip_metadata
    }
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_SNAPSHOT_QUALITY,
            skip_metadata: true,
        }
    }
}

/// Captured image staged locally and awaiting transfer.
#[derive(Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    local_path: String,
    payload: Vec<u8>,
    display_name: String,
}

impl CaptureArtifact {
    /// Constructs a validated artifact.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyPayload`] when `payload` is empty and
    /// [`CoreError::InvalidDisplayName`] when the name is blank.
    pub fn new(
        local_path: impl Into<String>,
        payload: Vec<u8>,
        display_name: impl Into<String>,
    ) -> Result<Self, CoreError> {
        if payload.is_empty() {
            return Err(CoreError::EmptyPayload);
        }

        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(CoreError::InvalidDisplayName);
        }

        Ok(Self {
            local_path: local_path.into(),
            payload,
            display_name,
        })
    }

    /// Filesystem location of the snapshot the payload was read from.
    pub fn local_path(&self) -> &str {
        &self.local_path
    }

    /// Binary image payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Name used when deriving the transfer key.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl fmt::Debug for CaptureArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureArtifact")
            .field("local_path", &self.local_path)
            .field("payload_len", &self.payload.len())
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Whether a failed transfer is worth a manual retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Network or server-side condition that may clear up.
    Retriable,
    /// Request was rejected and will fail again as-is.
    Permanent,
}

/// Terminal outcome of one upload or download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferResult {
    /// Transfer completed.
    Success {
        /// Object key for uploads, written file path for downloads.
        location: String,
    },
    /// Transfer failed; nothing was retried.
    Failure {
        /// Backend-provided failure detail.
        reason: String,
        /// Retry hint surfaced to the user.
        class: FailureClass,
    },
}

impl TransferResult {
    /// Returns `true` for [`TransferResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(reason),
        }
    }
}

/// Wall-clock source used for key and filename generation.
pub trait Clock: Send + Sync {
    /// Current Unix time in milliseconds.
    fn now_ms(&self) -> u64;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
        u64::try_from(nanos / 1_000_000).unwrap_or(0)
    }
}

/// Error type for core model validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Snapshot quality outside `1..=100`.
    #[error("invalid snapshot quality: {0} (expected 1..=100)")]
    InvalidQuality(u8),
    /// Artifacts must carry at least one payload byte.
    #[error("capture payload is empty")]
    EmptyPayload,
    /// Artifact display names must be non-blank.
    #[error("artifact display name is empty")]
    InvalidDisplayName,
}
