#![warn(missing_docs)]
//! # snapstash-ui
//!
//! ## Purpose
//! Defines the UI-facing state snapshot published by the orchestration
//! controller.
//!
//! ## Responsibilities
//! - Represent permission, camera, artifact, busy and notification state.
//! - Derive the controller phase from that state.
//! - Expose guard checks the view uses to show or hide triggers.
//!
//! ## Data flow
//! Controller transitions mutate [`UiState`] and publish a clone to
//! subscribers; the view renders whatever it receives.
//!
//! ## Ownership and lifetimes
//! `UiState` owns every value so snapshots can cross task boundaries freely.
//!
//! ## Security and privacy notes
//! The snapshot carries artifact metadata only, never payload bytes.

use serde::{Deserialize, Serialize};
use snapstash_core::{CaptureArtifact, PermissionState, TransferResult};

/// Controller phase derived from [`UiState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    /// Not mounted yet; permission unresolved.
    AwaitingPermission,
    /// Camera off, nothing staged.
    ReadyIdle,
    /// Camera live, shutter available.
    ReadyLive,
    /// Camera off, an artifact awaits upload.
    Reviewing,
    /// No camera hardware; fallback view.
    DeviceUnavailable,
}

/// Banner severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Operation completed.
    Success,
    /// Operation failed.
    Failure,
}

/// Dismissible user-visible banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Severity.
    pub kind: NotificationKind,
    /// Short heading.
    pub title: String,
    /// Detail line.
    pub message: String,
}

impl Notification {
    /// Success banner.
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Failure banner.
    pub fn failure(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Failure,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Banner for a transfer outcome.
    pub fn from_transfer(operation: &str, result: &TransferResult) -> Self {
        match result {
            TransferResult::Success { location } => {
                Self::success(format!("{operation} complete"), location.clone())
            }
            TransferResult::Failure { reason, class } => {
                let hint = match class {
                    snapstash_core::FailureClass::Retriable => " You can try again.",
                    snapstash_core::FailureClass::Permanent => "",
                };
                let reason = reason.trim_end().trim_end_matches('.');
                Self::failure(format!("{operation} failed"), format!("{reason}.{hint}"))
            }
        }
    }
}

/// Artifact metadata shown in the review screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactView {
    /// Preview source path.
    pub local_path: String,
    /// Name used for the transfer key.
    pub display_name: String,
    /// Payload size in bytes.
    pub size_bytes: usize,
}

impl From<&CaptureArtifact> for ArtifactView {
    fn from(artifact: &CaptureArtifact) -> Self {
        Self {
            local_path: artifact.local_path().to_string(),
            display_name: artifact.display_name().to_string(),
            size_bytes: artifact.payload_len(),
        }
    }
}

/// Aggregate UI state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    /// App version string.
    pub version: String,
    /// Whether the mount sequence has finished.
    pub mounted: bool,
    /// Last observed camera permission.
    pub permission: Option<PermissionState>,
    /// Whether camera hardware exists.
    pub device_available: bool,
    /// Camera-active flag.
    pub camera_active: bool,
    /// Staged artifact, if any.
    pub artifact: Option<ArtifactView>,
    /// A capture is in flight.
    pub capturing: bool,
    /// An upload is in flight.
    pub uploading: bool,
    /// A download is in flight.
    pub downloading: bool,
    /// Current banner.
    pub notification: Option<Notification>,
}

impl UiState {
    /// Creates the pre-mount state.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            mounted: false,
            permission: None,
            device_available: true,
            camera_active: false,
            artifact: None,
            capturing: false,
            uploading: false,
            downloading: false,
            notification: None,
        }
    }

    /// Derives the controller phase.
    pub fn phase(&self) -> ControllerPhase {
        if !self.device_available {
            ControllerPhase::DeviceUnavailable
        } else if !self.mounted {
            ControllerPhase::AwaitingPermission
        } else if self.camera_active {
            ControllerPhase::ReadyLive
        } else if self.artifact.is_some() {
            ControllerPhase::Reviewing
        } else {
            ControllerPhase::ReadyIdle
        }
    }

    /// Whether the "snapshot" trigger is shown.
    pub fn can_snapshot(&self) -> bool {
        matches!(
            self.phase(),
            ControllerPhase::ReadyIdle | ControllerPhase::Reviewing
        ) && !self.uploading
    }

    /// Whether the "shot" trigger is shown.
    pub fn can_shot(&self) -> bool {
        self.phase() == ControllerPhase::ReadyLive && !self.capturing
    }

    /// Whether the "upload" trigger is shown.
    pub fn can_upload(&self) -> bool {
        self.phase() == ControllerPhase::Reviewing && !self.uploading
    }

    /// Whether the "download" trigger is shown.
    pub fn can_download(&self) -> bool {
        self.mounted && !self.camera_active && !self.downloading
    }

    /// Replaces the banner.
    pub fn notify(&mut self, notification: Notification) {
        self.notification = Some(notification);
    }

    /// Clears the banner only.
    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for phase derivation and trigger guards.

    use super::*;

    fn mounted() -> UiState {
        let mut state = UiState::new("0.1.0");
        state.mounted = true;
        state.permission = Some(PermissionState::Authorized);
        state
    }

    #[test]
    fn phase_follows_camera_and_artifact() {
        let mut state = UiState::new("0.1.0");
        assert_eq!(state.phase(), ControllerPhase::AwaitingPermission);

        state.mounted = true;
        assert_eq!(state.phase(), ControllerPhase::ReadyIdle);

        state.camera_active = true;
        assert_eq!(state.phase(), ControllerPhase::ReadyLive);

        state.camera_active = false;
        state.artifact = Some(ArtifactView {
            local_path: "/tmp/a.jpg".to_string(),
            display_name: "test".to_string(),
            size_bytes: 3,
        });
        assert_eq!(state.phase(), ControllerPhase::Reviewing);

        state.device_available = false;
        assert_eq!(state.phase(), ControllerPhase::DeviceUnavailable);
    }

    #[test]
    fn triggers_hide_while_operations_are_in_flight() {
        let mut state = mounted();
        state.camera_active = true;
        assert!(state.can_shot());
        assert!(!state.can_download());

        state.capturing = true;
        assert!(!state.can_shot());

        state.camera_active = false;
        state.capturing = false;
        state.artifact = Some(ArtifactView {
            local_path: "/tmp/a.jpg".to_string(),
            display_name: "test".to_string(),
            size_bytes: 3,
        });
        state.uploading = true;
        assert!(!state.can_upload());
        assert!(!state.can_snapshot());
        assert!(state.can_download());
    }
}
