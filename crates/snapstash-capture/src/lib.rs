#![warn(missing_docs)]
//! # snapstash-capture
//!
//! ## Purpose
//! Owns the camera mode toggle and the single captured-artifact slot.
//!
//! ## Responsibilities
//! - Define a backend-agnostic [`CameraDevice`] capability.
//! - Model the Idle/Live session as [`CaptureSession`].
//! - Convert a snapshot file into a binary payload (file -> base64 -> bytes).
//! - Provide a deterministic [`SyntheticCamera`] for CI and the demo binary.
//!
//! ## Data flow
//! [`CaptureSession::enter_live`] -> [`CaptureSession::begin_capture`] ->
//! [`SnapshotRequest::execute`] (device snapshot + file read) ->
//! [`CaptureSession::complete_capture`] stores the [`CaptureArtifact`] and
//! returns the session to Idle.
//!
//! ## Ownership and lifetimes
//! The session owns the artifact slot. [`SnapshotRequest`] holds its own device
//! handle so the async part of a capture never borrows the session; owners can
//! release their locks while the hardware works.
//!
//! ## Error model
//! Missing hardware is [`CaptureError::DeviceUnavailable`]. Capturing outside
//! the Live mode is [`CaptureError::ContractViolation`], a caller bug that
//! leaves state untouched. I/O failures map to the remaining variants.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use snapstash_core::{
    CaptureArtifact, CoreError, FileSystem, FsError, PermissionState, SnapshotOptions,
};
use snapstash_permission::PermissionSource;
use thiserror::Error;
use tracing::{debug, info};

/// File produced by one hardware snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    /// Location of the encoded image.
    pub path: String,
}

/// Camera hardware capability.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Takes one still snapshot and stores it as a file.
    ///
    /// # Errors
    /// Returns [`CaptureError::Snapshot`] when the hardware fails.
    async fn take_snapshot(&self, options: SnapshotOptions) -> Result<SnapshotFile, CaptureError>;
}

/// Camera mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Hardware off, review UI shown.
    Idle,
    /// Hardware on, shutter UI shown.
    Live,
}

/// Pending hardware snapshot, detached from the session that issued it.
#[derive(Clone)]
pub struct SnapshotRequest {
    device: Arc<dyn CameraDevice>,
    options: SnapshotOptions,
}

impl SnapshotRequest {
    /// Options the snapshot will be taken with.
    pub fn options(&self) -> SnapshotOptions {
        self.options
    }

    /// Takes the snapshot and reads it back as an artifact.
    ///
    /// # Errors
    /// Returns [`CaptureError::Snapshot`], [`CaptureError::Read`] or
    /// [`CaptureError::Decode`] for the respective I/O stage, and
    /// [`CaptureError::Artifact`] when the decoded payload is empty.
    pub async fn execute(
        self,
        fs: &dyn FileSystem,
        display_name: &str,
    ) -> Result<CaptureArtifact, CaptureError> {
        let file = self.device.take_snapshot(self.options).await?;
        debug!(path = %file.path, quality = self.options.quality(), "snapshot written");

        let encoded = fs
            .read_file_as_base64(&file.path)
            .await
            .map_err(CaptureError::Read)?;
        let payload = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|error| CaptureError::Decode(error.to_string()))?;

        CaptureArtifact::new(file.path, payload, display_name).map_err(CaptureError::Artifact)
    }
}

impl fmt::Debug for SnapshotRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotRequest")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Idle/Live camera session with a single artifact slot.
pub struct CaptureSession {
    device: Option<Arc<dyn CameraDevice>>,
    options: SnapshotOptions,
    mode: CaptureMode,
    artifact: Option<CaptureArtifact>,
}

impl CaptureSession {
    /// Creates an idle session. `None` means no camera hardware was found.
    pub fn new(device: Option<Arc<dyn CameraDevice>>) -> Self {
        Self {
            device,
            options: SnapshotOptions::default(),
            mode: CaptureMode::Idle,
            artifact: None,
        }
    }

    /// Replaces the snapshot options.
    pub fn with_options(mut self, options: SnapshotOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns `true` when a camera handle is available.
    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    /// Current mode.
    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Camera-active flag.
    pub fn is_live(&self) -> bool {
        self.mode == CaptureMode::Live
    }

    /// Staged artifact, if any.
    pub fn artifact(&self) -> Option<&CaptureArtifact> {
        self.artifact.as_ref()
    }

    /// Switches Idle -> Live.
    ///
    /// # Errors
    /// Returns [`CaptureError::DeviceUnavailable`] when the session has no
    /// camera handle.
    pub fn enter_live(&mut self) -> Result<(), CaptureError> {
        if self.device.is_none() {
            return Err(CaptureError::DeviceUnavailable);
        }
        if self.mode != CaptureMode::Live {
            info!("camera entering live mode");
        }
        self.mode = CaptureMode::Live;
        Ok(())
    }

    /// Switches Live -> Idle without capturing.
    pub fn leave_live(&mut self) {
        if self.mode == CaptureMode::Live {
            info!("camera leaving live mode without capture");
        }
        self.mode = CaptureMode::Idle;
    }

    /// Checks capture preconditions and detaches a snapshot request.
    ///
    /// # Errors
    /// Returns [`CaptureError::ContractViolation`] outside Live mode or without
    /// a device.
    pub fn begin_capture(&self) -> Result<SnapshotRequest, CaptureError> {
        let device = self.device.as_ref().ok_or_else(|| {
            CaptureError::ContractViolation("capture requested without a camera device".to_string())
        })?;
        if self.mode != CaptureMode::Live {
            return Err(CaptureError::ContractViolation(
                "capture requested while camera is not live".to_string(),
            ));
        }

        Ok(SnapshotRequest {
            device: Arc::clone(device),
            options: self.options,
        })
    }

    /// Stores a finished capture and returns to Idle.
    ///
    /// # Returns
    /// The artifact that was overwritten, if any, so its file can be reclaimed.
    ///
    /// # Errors
    /// Returns [`CaptureError::ContractViolation`] when the session left Live
    /// mode while the snapshot was in flight.
    pub fn complete_capture(
        &mut self,
        artifact: CaptureArtifact,
    ) -> Result<Option<CaptureArtifact>, CaptureError> {
        if self.mode != CaptureMode::Live {
            return Err(CaptureError::ContractViolation(
                "capture completed after camera left live mode".to_string(),
            ));
        }

        info!(
            path = %artifact.local_path(),
            payload_len = artifact.payload_len(),
            "capture stored"
        );
        self.mode = CaptureMode::Idle;
        Ok(self.artifact.replace(artifact))
    }

    /// Captures one frame: Live -> Idle with a stored artifact.
    ///
    /// # Errors
    /// See [`CaptureSession::begin_capture`] and [`SnapshotRequest::execute`].
    /// On error the session is unchanged.
    pub async fn capture(
        &mut self,
        fs: &dyn FileSystem,
        display_name: &str,
    ) -> Result<CaptureArtifact, CaptureError> {
        let request = self.begin_capture()?;
        let artifact = request.execute(fs, display_name).await?;
        self.complete_capture(artifact.clone())?;
        Ok(artifact)
    }

    /// Clears the artifact slot. Idempotent.
    pub fn discard_artifact(&mut self) -> Option<CaptureArtifact> {
        self.artifact.take()
    }

    /// Clears the slot only if it still holds an artifact read from
    /// `local_path`.
    pub fn discard_if_current(&mut self, local_path: &str) -> Option<CaptureArtifact> {
        match &self.artifact {
            Some(current) if current.local_path() == local_path => self.artifact.take(),
            _ => None,
        }
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("has_device", &self.device.is_some())
            .field("options", &self.options)
            .field("mode", &self.mode)
            .field("artifact", &self.artifact)
            .finish()
    }
}

/// Deterministic camera for tests and headless runs.
///
/// Snapshots are small JPEG-framed files written through the injected
/// [`FileSystem`] as `{directory}/snapshot-{sequence}.jpg`.
pub struct SyntheticCamera {
    fs: Arc<dyn FileSystem>,
    directory: String,
    status: Mutex<PermissionState>,
    answer: Mutex<PermissionState>,
    sequence: Mutex<u64>,
    failure: Mutex<Option<String>>,
}

impl SyntheticCamera {
    /// Creates an authorized synthetic camera.
    pub fn new(fs: Arc<dyn FileSystem>, directory: impl Into<String>) -> Self {
        Self {
            fs,
            directory: directory.into(),
            status: Mutex::new(PermissionState::Authorized),
            answer: Mutex::new(PermissionState::Authorized),
            sequence: Mutex::new(0),
            failure: Mutex::new(None),
        }
    }

    /// Sets the current permission status.
    pub fn with_permission(self, status: PermissionState) -> Self {
        *lock(&self.status) = status;
        self
    }

    /// Sets the answer the simulated OS prompt gives.
    pub fn answering_requests_with(self, answer: PermissionState) -> Self {
        *lock(&self.answer) = answer;
        self
    }

    /// Makes the next snapshot fail with `reason`.
    pub fn fail_next_snapshot(&self, reason: impl Into<String>) {
        *lock(&self.failure) = Some(reason.into());
    }

    /// Number of snapshots taken so far.
    pub fn snapshots_taken(&self) -> u64 {
        *lock(&self.sequence)
    }
}

#[async_trait]
impl CameraDevice for SyntheticCamera {
    async fn take_snapshot(&self, options: SnapshotOptions) -> Result<SnapshotFile, CaptureError> {
        if let Some(reason) = lock(&self.failure).take() {
            return Err(CaptureError::Snapshot(reason));
        }

        let sequence = {
            let mut sequence = lock(&self.sequence);
            *sequence += 1;
            *sequence
        };

        let path = format!(
            "{}/snapshot-{sequence}.jpg",
            self.directory.trim_end_matches('/')
        );
        let bytes = synthetic_jpeg(sequence, options);
        self.fs
            .write_file(&path, &bytes)
            .await
            .map_err(|error| CaptureError::Snapshot(error.to_string()))?;

        Ok(SnapshotFile { path })
    }
}

#[async_trait]
impl PermissionSource for SyntheticCamera {
    async fn permission_status(&self) -> PermissionState {
        *lock(&self.status)
    }

    async fn request_permission(&self) -> PermissionState {
        let answer = *lock(&self.answer);
        *lock(&self.status) = answer;
        answer
    }
}

fn synthetic_jpeg(sequence: u64, options: SnapshotOptions) -> Vec<u8> {
    // SOI, APP0, body, EOI
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    if !options.skip_metadata() {
        bytes.extend_from_slice(b"Exif\0\0");
    }
    bytes.push(options.quality());
    bytes.extend_from_slice(&sequence.to_be_bytes());
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Session has no camera hardware.
    #[error("no camera device is available")]
    DeviceUnavailable,
    /// Capture was invoked outside its valid mode.
    #[error("capture contract violation: {0}")]
    ContractViolation(String),
    /// Hardware snapshot failed.
    #[error("snapshot failed: {0}")]
    Snapshot(String),
    /// Snapshot file could not be read back.
    #[error("snapshot read failed: {0}")]
    Read(FsError),
    /// Snapshot file was not valid base64.
    #[error("snapshot decode failed: {0}")]
    Decode(String),
    /// Decoded payload failed artifact validation.
    #[error("invalid capture artifact: {0}")]
    Artifact(CoreError),
}

impl CaptureError {
    /// Returns `true` for caller bugs rather than runtime conditions.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation(_))
    }
}
