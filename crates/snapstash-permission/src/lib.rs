#![warn(missing_docs)]
//! # snapstash-permission
//!
//! ## Purpose
//! Resolves camera authorization before the controller turns the camera on.
//!
//! ## Responsibilities
//! - Query and request camera permission through an injectable
//!   [`PermissionSource`].
//! - Remediate non-authorized states: prompt when undetermined, offer a
//!   settings redirect or application exit when denied.
//! - Track the last observed state for capture gating ([`PermissionGate`]).
//!
//! ## Data flow
//! Controller event -> [`PermissionResolver::query_status`] ->
//! [`PermissionResolver::remediate`] -> [`RemediationOutcome`] ->
//! [`PermissionGate::observe`].
//!
//! ## Error model
//! Nothing here fails. Every platform answer is a valid [`PermissionState`]
//! and the capabilities are assumed infallible.
//!
//! ## Example
//! ```rust
//! use snapstash_core::PermissionState;
//! use snapstash_permission::PermissionGate;
//!
//! let mut gate = PermissionGate::new();
//! assert!(!gate.allows_camera());
//! gate.observe(PermissionState::Authorized);
//! assert!(gate.allows_camera());
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snapstash_core::PermissionState;
use tracing::{debug, info, warn};

/// Platform permission API for the camera.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Reads the current authorization without prompting.
    async fn permission_status(&self) -> PermissionState;

    /// Shows the OS prompt and waits for the user's answer.
    async fn request_permission(&self) -> PermissionState;
}

/// Operating-system actions offered when access is denied.
#[async_trait]
pub trait SystemShell: Send + Sync {
    /// Opens this application's settings page.
    async fn open_app_settings(&self);

    /// Terminates the application.
    async fn exit_application(&self);
}

/// Choice presented to the user after a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialChoice {
    /// Send the user to the settings page to grant access.
    OpenSettings,
    /// Quit the application.
    ExitApplication,
}

/// Asks the user how to proceed after a denial.
#[async_trait]
pub trait DenialPrompt: Send + Sync {
    /// Presents the binary choice and returns the answer.
    async fn choose(&self) -> DenialChoice;
}

/// Side effect performed by [`PermissionResolver::remediate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    /// Already authorized; nothing happened.
    None,
    /// The OS prompt was shown.
    Requested,
    /// The settings page was opened.
    OpenedSettings,
    /// Application exit was requested.
    ExitRequested,
}

/// Result of one remediation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemediationOutcome {
    /// State after remediation.
    pub state: PermissionState,
    /// Last side effect performed.
    pub action: RemediationAction,
}

impl RemediationOutcome {
    /// Returns `true` when the camera may be used.
    pub fn is_authorized(&self) -> bool {
        self.state.is_authorized()
    }
}

/// Camera permission resolver.
#[derive(Clone)]
pub struct PermissionResolver {
    source: Arc<dyn PermissionSource>,
    shell: Arc<dyn SystemShell>,
    prompt: Arc<dyn DenialPrompt>,
}

impl PermissionResolver {
    /// Creates a resolver over the given capabilities.
    pub fn new(
        source: Arc<dyn PermissionSource>,
        shell: Arc<dyn SystemShell>,
        prompt: Arc<dyn DenialPrompt>,
    ) -> Self {
        Self {
            source,
            shell,
            prompt,
        }
    }

    /// Reads the current authorization.
    pub async fn query_status(&self) -> PermissionState {
        let state = self.source.permission_status().await;
        debug!(permission = %state, "queried camera permission");
        state
    }

    /// Prompts for authorization.
    ///
    /// Returns immediately, without prompting, when access is already granted.
    pub async fn request_authorization(&self) -> PermissionState {
        if self.source.permission_status().await.is_authorized() {
            return PermissionState::Authorized;
        }

        let state = self.source.request_permission().await;
        info!(permission = %state, "camera permission prompt answered");
        state
    }

    /// Remediates a non-authorized state.
    ///
    /// # Semantics
    /// - `Authorized`: no-op.
    /// - `NotDetermined`: prompts once and remediates the answer once more; a
    ///   second `NotDetermined` ends remediation unresolved.
    /// - `Denied`: asks the [`DenialPrompt`] and performs the chosen shell
    ///   action.
    pub async fn remediate(&self, state: PermissionState) -> RemediationOutcome {
        let mut current = state;
        let mut action = RemediationAction::None;
        let mut prompted = false;

        loop {
            match current {
                PermissionState::Authorized => {
                    return RemediationOutcome {
                        state: current,
                        action,
                    };
                }
                PermissionState::NotDetermined if !prompted => {
                    prompted = true;
                    action = RemediationAction::Requested;
                    current = self.request_authorization().await;
                }
                PermissionState::NotDetermined => {
                    warn!("camera permission still undetermined after prompt");
                    return RemediationOutcome {
                        state: current,
                        action,
                    };
                }
                PermissionState::Denied => {
                    let choice = self.prompt.choose().await;
                    info!(?choice, "camera permission denied; applying user choice");
                    let action = match choice {
                        DenialChoice::OpenSettings => {
                            self.shell.open_app_settings().await;
                            RemediationAction::OpenedSettings
                        }
                        DenialChoice::ExitApplication => {
                            self.shell.exit_application().await;
                            RemediationAction::ExitRequested
                        }
                    };
                    return RemediationOutcome {
                        state: current,
                        action,
                    };
                }
            }
        }
    }

    /// Queries the current state and remediates it when needed.
    pub async fn ensure_authorized(&self) -> RemediationOutcome {
        let state = self.query_status().await;
        self.remediate(state).await
    }
}

/// Last observed permission state.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    state: Option<PermissionState>,
}

impl PermissionGate {
    /// Creates a gate that has observed nothing yet.
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Records a freshly observed state.
    pub fn observe(&mut self, state: PermissionState) {
        self.state = Some(state);
    }

    /// Last observed state, if any.
    pub fn state(&self) -> Option<PermissionState> {
        self.state
    }

    /// Returns `true` when the last observed state is `Authorized`.
    pub fn allows_camera(&self) -> bool {
        matches!(self.state, Some(PermissionState::Authorized))
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}
