#![warn(missing_docs)]
//! # snapstash-app
//!
//! ## Purpose
//! Orchestrates permission, capture, transfer, and UI state for `snapstash`.
//!
//! ## Responsibilities
//! - Drive the capture → review → upload flow from user events.
//! - Gate the camera on permission and on the capture kill switch.
//! - Reject re-entrant operations while one of the same class is in flight.
//! - Publish UI snapshots to observers after every transition.
//!
//! ## Data flow
//! User event -> [`OrchestrationController`] -> {permission resolver | capture
//! session | transfer client} -> result -> state update -> `watch` publish.
//!
//! ## Ownership and lifetimes
//! The controller owns the capture session and UI state behind one mutex. The
//! lock is taken only for synchronous bookkeeping; every await happens with the
//! lock released, on owned copies of the data the operation needs.
//!
//! ## Error model
//! Event preconditions and subsystem failures surface as [`AppError`].
//! Transfer failures are values ([`snapstash_core::TransferResult`]) and turn
//! into dismissible notifications instead of errors.
//!
//! ## Security and privacy notes
//! - Capture is blocked unless permission is granted and the kill switch is on.
//! - Failure reasons pass through [`redact_sensitive`] before they are shown or
//!   logged by the controller.
//! - Payload bytes are never logged; transfers log a sha256 fingerprint.

mod config;
mod controller;
mod telemetry;

pub use config::{AppConfig, ConfigError};
pub use controller::{ControllerDeps, OrchestrationController};
pub use telemetry::init_tracing;

use snapstash_capture::CaptureError;
use snapstash_core::PermissionState;
use snapstash_ui::ControllerPhase;
use thiserror::Error;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("SNAPSTASH_VERSION");

/// Env var holding the capture kill switch.
pub const CAPTURE_ENABLED_VAR: &str = "SNAPSTASH_CAPTURE_ENABLED";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Redacts common secret markers in log-safe output.
///
/// Everything from the first marker onward is replaced, since backend error
/// strings do not reliably delimit the secret value.
pub fn redact_sensitive(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let first = SENSITIVE_MARKERS
        .iter()
        .filter_map(|marker| lower.find(marker).map(|position| (position, *marker)))
        .min_by_key(|(position, _)| *position);

    match first {
        Some((position, marker)) => format!("{}{marker}=<redacted>", &input[..position]),
        None => input.to_string(),
    }
}

const SENSITIVE_MARKERS: [&str; 7] = [
    "x-amz-security-token",
    "x-amz-signature",
    "x-amz-credential",
    "secret",
    "authorization",
    "password",
    "token",
];

/// Interprets a kill-switch value.
///
/// Semantics:
/// - `None` => capture enabled.
/// - `0`, `false`, `off` (case-insensitive) => capture disabled.
/// - Any other value => capture enabled.
pub fn capture_enabled_from_value(value: Option<&str>) -> bool {
    match value {
        Some(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            !(normalized == "0" || normalized == "false" || normalized == "off")
        }
        None => true,
    }
}

/// Checks the runtime kill-switch env var.
pub fn capture_enabled_from_env() -> bool {
    capture_enabled_from_value(std::env::var(CAPTURE_ENABLED_VAR).ok().as_deref())
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Capture subsystem error.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Camera permission was not granted after remediation.
    #[error("camera permission not granted ({0})")]
    PermissionDenied(PermissionState),
    /// Event does not apply to the current phase.
    #[error("`{event}` is not valid in phase {phase:?}")]
    InvalidEvent {
        /// Rejected event.
        event: &'static str,
        /// Phase at rejection time.
        phase: ControllerPhase,
    },
    /// An operation of the same class is already running.
    #[error("{0} already in progress")]
    Busy(&'static str),
    /// Capture is switched off by the kill switch.
    #[error("capture disabled by {CAPTURE_ENABLED_VAR}")]
    CaptureDisabled,
    /// No staged artifact to act on.
    #[error("no captured artifact")]
    NoArtifact,
    /// Tracing subscriber could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),
}
