//! Integration tests for permission remediation policy.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use snapstash_core::PermissionState;
use snapstash_permission::{
    DenialChoice, DenialPrompt, PermissionResolver, PermissionSource, RemediationAction,
    SystemShell,
};

#[derive(Default)]
struct CountingSource {
    status: Mutex<Option<PermissionState>>,
    answer: Mutex<Option<PermissionState>>,
    requests: Mutex<u32>,
}

impl CountingSource {
    fn with(status: PermissionState, answer: PermissionState) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(Some(status)),
            answer: Mutex::new(Some(answer)),
            requests: Mutex::new(0),
        })
    }

    fn requests(&self) -> u32 {
        *self.requests.lock().expect("request lock")
    }
}

#[async_trait]
impl PermissionSource for CountingSource {
    async fn permission_status(&self) -> PermissionState {
        self.status
            .lock()
            .expect("status lock")
            .unwrap_or(PermissionState::NotDetermined)
    }

    async fn request_permission(&self) -> PermissionState {
        *self.requests.lock().expect("request lock") += 1;
        let answer = self
            .answer
            .lock()
            .expect("answer lock")
            .unwrap_or(PermissionState::Denied);
        *self.status.lock().expect("status lock") = Some(answer);
        answer
    }
}

#[derive(Default)]
struct RecordingShell {
    settings_opened: Mutex<u32>,
    exits: Mutex<u32>,
}

#[async_trait]
impl SystemShell for RecordingShell {
    async fn open_app_settings(&self) {
        *self.settings_opened.lock().expect("settings lock") += 1;
    }

    async fn exit_application(&self) {
        *self.exits.lock().expect("exit lock") += 1;
    }
}

struct FixedChoice(DenialChoice);

#[async_trait]
impl DenialPrompt for FixedChoice {
    async fn choose(&self) -> DenialChoice {
        self.0
    }
}

fn build(
    source: Arc<CountingSource>,
    shell: Arc<RecordingShell>,
    choice: DenialChoice,
) -> PermissionResolver {
    PermissionResolver::new(source, shell, Arc::new(FixedChoice(choice)))
}

#[tokio::test]
async fn remediation_tests_never_requests_when_authorized() {
    let states = [
        PermissionState::Authorized,
        PermissionState::NotDetermined,
        PermissionState::Denied,
    ];

    for status in states {
        for answer in states {
            let source = CountingSource::with(status, answer);
            let shell = Arc::new(RecordingShell::default());
            let resolver = build(source.clone(), shell, DenialChoice::OpenSettings);

            let outcome = resolver.remediate(PermissionState::Authorized).await;
            assert_eq!(outcome.action, RemediationAction::None);
            assert_eq!(source.requests(), 0, "status={status} answer={answer}");

            let state = resolver.request_authorization().await;
            if status.is_authorized() {
                assert_eq!(state, PermissionState::Authorized);
                assert_eq!(source.requests(), 0);
            }
        }
    }
}

#[tokio::test]
async fn remediation_tests_undetermined_then_authorized_skips_settings() {
    let source = CountingSource::with(PermissionState::NotDetermined, PermissionState::Authorized);
    let shell = Arc::new(RecordingShell::default());
    let resolver = build(source.clone(), shell.clone(), DenialChoice::OpenSettings);

    let outcome = resolver.remediate(PermissionState::NotDetermined).await;

    assert!(outcome.is_authorized());
    assert_eq!(outcome.action, RemediationAction::Requested);
    assert_eq!(source.requests(), 1);
    assert_eq!(*shell.settings_opened.lock().expect("settings lock"), 0);
    assert_eq!(*shell.exits.lock().expect("exit lock"), 0);
}

#[tokio::test]
async fn remediation_tests_denied_performs_chosen_action() {
    let source = CountingSource::with(PermissionState::Denied, PermissionState::Denied);
    let shell = Arc::new(RecordingShell::default());
    let resolver = build(source.clone(), shell.clone(), DenialChoice::ExitApplication);

    let outcome = resolver.remediate(PermissionState::Denied).await;

    assert_eq!(outcome.state, PermissionState::Denied);
    assert_eq!(outcome.action, RemediationAction::ExitRequested);
    assert_eq!(*shell.exits.lock().expect("exit lock"), 1);
    assert_eq!(*shell.settings_opened.lock().expect("settings lock"), 0);
    assert_eq!(source.requests(), 0);
}

#[tokio::test]
async fn remediation_tests_ensure_authorized_queries_first() {
    let source = CountingSource::with(PermissionState::Authorized, PermissionState::Denied);
    let shell = Arc::new(RecordingShell::default());
    let resolver = build(source.clone(), shell, DenialChoice::OpenSettings);

    let outcome = resolver.ensure_authorized().await;

    assert!(outcome.is_authorized());
    assert_eq!(source.requests(), 0);
}
