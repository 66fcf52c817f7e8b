//! Event-driven orchestration over permission, capture, and transfer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use snapstash_capture::{CameraDevice, CaptureError, CaptureSession};
use snapstash_core::{CaptureArtifact, Clock, FileSystem, TransferResult};
use snapstash_permission::{PermissionGate, PermissionResolver};
use snapstash_transfer::{ObjectStore, TransferClient};
use snapstash_ui::{ControllerPhase, Notification, UiState};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{AppConfig, AppError, app_version, redact_sensitive};

/// Capabilities the controller is wired with.
pub struct ControllerDeps {
    /// Permission resolution and remediation.
    pub permissions: PermissionResolver,
    /// Camera hardware; `None` when the device has no camera.
    pub camera: Option<Arc<dyn CameraDevice>>,
    /// Filesystem for reading captures, downloads, and reclamation.
    pub fs: Arc<dyn FileSystem>,
    /// Upload destination backend.
    pub store: Arc<dyn ObjectStore>,
    /// Time source for transfer keys and download names.
    pub clock: Arc<dyn Clock>,
}

struct ControllerState {
    session: CaptureSession,
    gate: PermissionGate,
    ui: UiState,
}

impl ControllerState {
    fn sync_ui(&mut self) {
        self.ui.camera_active = self.session.is_live();
        self.ui.artifact = self.session.artifact().map(Into::into);
        self.ui.permission = self.gate.state();
    }
}

/// Owns the capture flow state and applies user events to it.
///
/// Every event method takes `&self`; share the controller through an `Arc` to
/// drive it from several tasks.
pub struct OrchestrationController {
    permissions: PermissionResolver,
    transfer: TransferClient,
    fs: Arc<dyn FileSystem>,
    config: AppConfig,
    state: Mutex<ControllerState>,
    publisher: watch::Sender<UiState>,
    snapshot_flight: AtomicBool,
    capture_flight: AtomicBool,
    upload_flight: AtomicBool,
    download_flight: AtomicBool,
}

impl OrchestrationController {
    /// Wires a controller in the `AwaitingPermission` phase.
    pub fn new(deps: ControllerDeps, config: AppConfig) -> Self {
        let transfer = TransferClient::new(deps.store, Arc::clone(&deps.fs), deps.clock)
            .with_download_suffix(config.download_suffix.clone());
        let ui = UiState::new(app_version());
        let (publisher, _) = watch::channel(ui.clone());

        Self {
            permissions: deps.permissions,
            transfer,
            fs: deps.fs,
            config,
            state: Mutex::new(ControllerState {
                session: CaptureSession::new(deps.camera),
                gate: PermissionGate::new(),
                ui,
            }),
            publisher,
            snapshot_flight: AtomicBool::new(false),
            capture_flight: AtomicBool::new(false),
            upload_flight: AtomicBool::new(false),
            download_flight: AtomicBool::new(false),
        }
    }

    /// Subscribes to UI snapshots; the receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.publisher.subscribe()
    }

    /// Current UI snapshot.
    pub fn snapshot(&self) -> UiState {
        self.with_state(|state| state.ui.clone())
    }

    /// Current phase.
    pub fn phase(&self) -> ControllerPhase {
        self.with_state(|state| state.ui.phase())
    }

    /// Config the controller was built with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Resolves camera permission on first display.
    ///
    /// Queries the status and remediates anything other than `Authorized`.
    /// The controller becomes ready whatever the outcome; the camera stays
    /// gated until a later `press_snapshot` succeeds in remediation.
    ///
    /// # Errors
    /// - [`AppError::InvalidEvent`] when already mounted.
    /// - [`AppError::Busy`] while a permission check is in flight.
    pub async fn mount(&self) -> Result<UiState, AppError> {
        let _flight = InFlight::acquire(&self.snapshot_flight, "permission check")?;
        self.expect_phase("mount", &[ControllerPhase::AwaitingPermission])?;

        let outcome = self.permissions.ensure_authorized().await;

        let ui = self.update(|state| {
            state.gate.observe(outcome.state);
            state.ui.mounted = true;
            if !state.session.has_device() {
                state.ui.device_available = false;
                state.ui.notify(Notification::failure(
                    "Camera unavailable",
                    "This device has no camera.",
                ));
            }
            state.ui.clone()
        });
        info!(
            permission = %outcome.state,
            action = ?outcome.action,
            phase = ?ui.phase(),
            "mounted"
        );
        Ok(ui)
    }

    /// Switches the camera live after re-checking permission.
    ///
    /// # Errors
    /// - [`AppError::Busy`] while an upload is in flight.
    /// - [`AppError::CaptureDisabled`] when the kill switch is off.
    /// - [`AppError::InvalidEvent`] outside ReadyIdle/Reviewing.
    /// - [`AppError::PermissionDenied`] when remediation does not end
    ///   `Authorized`.
    /// - [`AppError::Capture`] with [`CaptureError::DeviceUnavailable`] when no
    ///   camera exists.
    pub async fn press_snapshot(&self) -> Result<(), AppError> {
        let _flight = InFlight::acquire(&self.snapshot_flight, "permission check")?;
        if self.upload_flight.load(Ordering::Acquire) {
            return Err(AppError::Busy("upload"));
        }
        if !self.config.capture_enabled {
            warn!("snapshot requested while capture is disabled");
            self.update(|state| {
                state.ui.notify(Notification::failure(
                    "Camera disabled",
                    "Capture is switched off for this installation.",
                ))
            });
            return Err(AppError::CaptureDisabled);
        }
        self.expect_phase(
            "snapshot",
            &[ControllerPhase::ReadyIdle, ControllerPhase::Reviewing],
        )?;

        let outcome = self.permissions.ensure_authorized().await;
        self.update(|state| {
            state.gate.observe(outcome.state);
            if !state.gate.allows_camera() {
                state.ui.notify(Notification::failure(
                    "Camera access required",
                    "Allow camera access in Settings to take a photo.",
                ));
                return Err(AppError::PermissionDenied(outcome.state));
            }
            match state.session.enter_live() {
                Ok(()) => Ok(()),
                Err(CaptureError::DeviceUnavailable) => {
                    state.ui.device_available = false;
                    state.ui.notify(Notification::failure(
                        "Camera unavailable",
                        "This device has no camera.",
                    ));
                    Err(AppError::Capture(CaptureError::DeviceUnavailable))
                }
                Err(error) => Err(error.into()),
            }
        })
        .inspect(|_| info!("camera live"))
        .inspect_err(|error| warn!(error = %error, "camera did not go live"))
    }

    /// Captures a frame while live and stages it for review.
    ///
    /// On failure the camera stays live and the error is surfaced as a
    /// notification.
    ///
    /// # Errors
    /// - [`AppError::InvalidEvent`] outside ReadyLive.
    /// - [`AppError::Busy`] while a capture is in flight.
    /// - [`AppError::Capture`] when the snapshot or its read-back fails.
    pub async fn press_shot(&self) -> Result<CaptureArtifact, AppError> {
        let _flight = InFlight::acquire(&self.capture_flight, "capture")?
            .clearing(self, capturing);
        self.expect_phase("shot", &[ControllerPhase::ReadyLive])?;

        let request = self.update(|state| {
            let request = state.session.begin_capture();
            if request.is_ok() {
                state.ui.capturing = true;
            }
            request
        });
        let request = match request {
            Ok(request) => request,
            Err(error) => return Err(self.capture_failed(error)),
        };

        let executed = request
            .execute(self.fs.as_ref(), &self.config.artifact_name)
            .await;
        let artifact = match executed {
            Ok(artifact) => artifact,
            Err(error) => return Err(self.capture_failed(error)),
        };

        let committed = self.update(|state| {
            state.ui.capturing = false;
            state.session.complete_capture(artifact.clone())
        });
        match committed {
            Ok(replaced) => {
                if let Some(replaced) = replaced {
                    self.reclaim(&replaced).await;
                }
                Ok(artifact)
            }
            Err(error) => {
                self.reclaim(&artifact).await;
                Err(self.capture_failed(error))
            }
        }
    }

    /// Uploads the staged artifact.
    ///
    /// On `Success` the artifact is cleared and its file reclaimed; on
    /// `Failure` it stays staged for another attempt. Either way the outcome
    /// becomes a notification.
    ///
    /// # Errors
    /// - [`AppError::Busy`] while an upload is in flight.
    /// - [`AppError::InvalidEvent`] while the camera is live.
    /// - [`AppError::NoArtifact`] when nothing is staged.
    pub async fn press_upload(&self) -> Result<TransferResult, AppError> {
        let _flight = InFlight::acquire(&self.upload_flight, "upload")?
            .clearing(self, uploading);
        let artifact = self.update(|state| {
            let phase = state.ui.phase();
            if phase != ControllerPhase::Reviewing {
                if phase == ControllerPhase::ReadyIdle {
                    return Err(AppError::NoArtifact);
                }
                return Err(AppError::InvalidEvent {
                    event: "upload",
                    phase,
                });
            }
            let artifact = state
                .session
                .artifact()
                .cloned()
                .ok_or(AppError::NoArtifact)?;
            state.ui.uploading = true;
            Ok(artifact)
        })?;

        let result = redact_result(
            self.transfer
                .upload(&artifact, &self.config.bucket_path)
                .await,
        );

        let cleared = self.update(|state| {
            state.ui.uploading = false;
            state.ui.notify(Notification::from_transfer("Upload", &result));
            if result.is_success() {
                state.session.discard_if_current(artifact.local_path())
            } else {
                None
            }
        });
        match &result {
            TransferResult::Success { location } => info!(key = %location, "upload finished"),
            TransferResult::Failure { reason, class } => {
                warn!(reason = %reason, class = ?class, "upload failed; artifact kept")
            }
        }
        if let Some(cleared) = cleared {
            self.reclaim(&cleared).await;
        }
        Ok(result)
    }

    /// Downloads the configured document into the download directory.
    ///
    /// The phase does not change; the outcome becomes a notification.
    ///
    /// # Errors
    /// - [`AppError::Busy`] while a download is in flight.
    /// - [`AppError::InvalidEvent`] before mount or while the camera is live.
    pub async fn press_download(&self) -> Result<TransferResult, AppError> {
        let _flight = InFlight::acquire(&self.download_flight, "download")?
            .clearing(self, downloading);
        self.update(|state| {
            let phase = state.ui.phase();
            if !state.ui.mounted || state.ui.camera_active {
                return Err(AppError::InvalidEvent {
                    event: "download",
                    phase,
                });
            }
            state.ui.downloading = true;
            Ok(())
        })?;

        let directory = self
            .config
            .download_dir
            .clone()
            .unwrap_or_else(|| self.fs.download_directory());
        let result = redact_result(
            self.transfer
                .download(&self.config.document_url, &directory)
                .await,
        );

        self.update(|state| {
            state.ui.downloading = false;
            state.ui.notify(Notification::from_transfer("Download", &result));
        });
        match &result {
            TransferResult::Success { location } => info!(path = %location, "download finished"),
            TransferResult::Failure { reason, class } => {
                warn!(reason = %reason, class = ?class, "download failed")
            }
        }
        Ok(result)
    }

    /// Leaves live mode without capturing.
    ///
    /// # Errors
    /// [`AppError::InvalidEvent`] outside ReadyLive, or while a capture is in
    /// flight.
    pub fn cancel_live(&self) -> Result<(), AppError> {
        self.update(|state| {
            let phase = state.ui.phase();
            if phase != ControllerPhase::ReadyLive || state.ui.capturing {
                return Err(AppError::InvalidEvent {
                    event: "cancel",
                    phase,
                });
            }
            state.session.leave_live();
            Ok(())
        })?;
        info!("camera left live mode");
        Ok(())
    }

    /// Drops the staged artifact without uploading it.
    ///
    /// # Errors
    /// - [`AppError::Busy`] while an upload is in flight.
    /// - [`AppError::InvalidEvent`] outside Reviewing.
    pub async fn discard(&self) -> Result<(), AppError> {
        if self.upload_flight.load(Ordering::Acquire) {
            return Err(AppError::Busy("upload"));
        }
        let discarded = self.update(|state| {
            let phase = state.ui.phase();
            if phase != ControllerPhase::Reviewing {
                return Err(AppError::InvalidEvent {
                    event: "discard",
                    phase,
                });
            }
            state.session.discard_artifact().ok_or(AppError::NoArtifact)
        })?;

        info!(path = %discarded.local_path(), "artifact discarded");
        self.reclaim(&discarded).await;
        Ok(())
    }

    /// Clears the notification banner only.
    pub fn dismiss_notification(&self) {
        self.update(|state| state.ui.dismiss_notification());
    }

    fn expect_phase(
        &self,
        event: &'static str,
        allowed: &[ControllerPhase],
    ) -> Result<(), AppError> {
        let phase = self.phase();
        if allowed.contains(&phase) {
            Ok(())
        } else {
            debug!(event, phase = ?phase, "event rejected");
            Err(AppError::InvalidEvent { event, phase })
        }
    }

    fn capture_failed(&self, error: CaptureError) -> AppError {
        if error.is_contract_violation() {
            error!(error = %error, "capture contract violated");
        } else {
            warn!(error = %error, "capture failed");
        }
        let message = redact_sensitive(&error.to_string());
        self.update(|state| {
            state.ui.capturing = false;
            state
                .ui
                .notify(Notification::failure("Capture failed", message));
        });
        AppError::Capture(error)
    }

    /// Removes an artifact's file unless the slot still references it.
    async fn reclaim(&self, artifact: &CaptureArtifact) {
        let path = artifact.local_path();
        let still_staged = self.with_state(|state| {
            state
                .session
                .artifact()
                .is_some_and(|current| current.local_path() == path)
        });
        if still_staged {
            return;
        }

        match self.fs.remove_file(path).await {
            Ok(()) => debug!(path = %path, "reclaimed capture file"),
            Err(error) => warn!(path = %path, error = %error, "could not reclaim capture file"),
        }
    }

    /// Resets a busy field left set by an interrupted operation.
    fn clear_busy(&self, field: BusyField) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let busy = field(&mut state.ui);
        if !*busy {
            return;
        }
        *busy = false;
        debug!("cleared busy flag of an interrupted operation");
        state.sync_ui();
        self.publisher.send_replace(state.ui.clone());
    }

    fn with_state<T>(&self, read: impl FnOnce(&ControllerState) -> T) -> T {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        read(&state)
    }

    /// Applies `change` under the lock, then publishes the resulting UI state.
    fn update<T>(&self, change: impl FnOnce(&mut ControllerState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let out = change(&mut state);
        state.sync_ui();
        self.publisher.send_replace(state.ui.clone());
        out
    }
}

fn redact_result(result: TransferResult) -> TransferResult {
    match result {
        TransferResult::Failure { reason, class } => TransferResult::Failure {
            reason: redact_sensitive(&reason),
            class,
        },
        success => success,
    }
}

/// Selects one busy field of [`UiState`].
type BusyField = fn(&mut UiState) -> &mut bool;

/// Marks an operation class busy until dropped.
///
/// Dropping also resets the paired UI busy field, so an abandoned event
/// future (timeout, `select!`) cannot leave a trigger hidden.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    busy: Option<(&'a OrchestrationController, BusyField)>,
}

fn capturing(ui: &mut UiState) -> &mut bool {
    &mut ui.capturing
}

fn uploading(ui: &mut UiState) -> &mut bool {
    &mut ui.uploading
}

fn downloading(ui: &mut UiState) -> &mut bool {
    &mut ui.downloading
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, operation: &'static str) -> Result<Self, AppError> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(operation, "rejected re-entrant call");
            return Err(AppError::Busy(operation));
        }
        Ok(Self { flag, busy: None })
    }

    fn clearing(mut self, controller: &'a OrchestrationController, field: BusyField) -> Self {
        self.busy = Some((controller, field));
        self
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some((controller, field)) = self.busy.take() {
            controller.clear_busy(field);
        }
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the in-flight guard and failure redaction.

    use snapstash_core::FailureClass;

    use super::*;

    #[test]
    fn in_flight_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = InFlight::acquire(&flag, "upload").expect("first acquire");
        assert!(matches!(
            InFlight::acquire(&flag, "upload"),
            Err(AppError::Busy("upload"))
        ));
        drop(guard);
        assert!(InFlight::acquire(&flag, "upload").is_ok());
    }

    #[test]
    fn failure_reasons_are_redacted() {
        let result = redact_result(TransferResult::Failure {
            reason: "403 for X-Amz-Credential=AKIA/2024".to_string(),
            class: FailureClass::Permanent,
        });
        assert_eq!(
            result.failure_reason(),
            Some("403 for x-amz-credential=<redacted>")
        );
    }
}
