#![warn(missing_docs)]
//! # snapstash-app binary
//!
//! Headless entry point for snapstash. Wires the controller to the local
//! filesystem, a synthetic camera, and S3 (or an in-memory store when no S3
//! endpoint or credentials are configured), then walks one
//! mount → snapshot → shot → upload → download pass and prints the final UI
//! state as JSON.

use std::sync::Arc;

use async_trait::async_trait;
use snapstash_app::{
    AppConfig, AppError, ControllerDeps, OrchestrationController, app_version, init_tracing,
};
use snapstash_capture::{CameraDevice, SyntheticCamera};
use snapstash_core::{FileSystem, PermissionState, SystemClock};
use snapstash_permission::{
    DenialChoice, DenialPrompt, PermissionResolver, PermissionSource, SystemShell,
};
use snapstash_transfer::{LocalFileSystem, MemoryObjectStore, ObjectStore, S3Config, S3ObjectStore};
use tracing::{info, warn};

/// CLI entry point.
#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("snapstash failed: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    init_tracing("info")?;
    let config = AppConfig::from_env()?;
    info!(
        version = app_version(),
        bucket_path = %config.bucket_path,
        capture_enabled = config.capture_enabled,
        "starting snapstash"
    );

    let work_dir = std::env::temp_dir().join("snapstash");
    let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new(work_dir.join("downloads")));
    let camera = Arc::new(
        SyntheticCamera::new(Arc::clone(&fs), work_dir.join("camera").display().to_string())
            .with_permission(PermissionState::NotDetermined)
            .answering_requests_with(PermissionState::Authorized),
    );
    let source: Arc<dyn PermissionSource> = camera.clone();
    let device: Arc<dyn CameraDevice> = camera;

    let s3 = S3Config::from_env();
    let store: Arc<dyn ObjectStore> = if s3.is_configured() {
        info!(region = %s3.region, endpoint = ?s3.endpoint_url, "using S3 object store");
        Arc::new(S3ObjectStore::connect(&s3).await)
    } else {
        warn!("no S3 endpoint or credentials configured; uploads stay in memory");
        Arc::new(MemoryObjectStore::new())
    };

    let controller = OrchestrationController::new(
        ControllerDeps {
            permissions: PermissionResolver::new(
                source,
                Arc::new(ConsoleShell),
                Arc::new(HeadlessPrompt),
            ),
            camera: Some(device),
            fs,
            store,
            clock: Arc::new(SystemClock),
        },
        config,
    );

    controller.mount().await?;
    controller.press_snapshot().await?;
    let artifact = controller.press_shot().await?;
    info!(
        path = %artifact.local_path(),
        payload_len = artifact.payload_len(),
        "captured"
    );
    controller.press_upload().await?;
    controller.press_download().await?;

    let state = controller.snapshot();
    match serde_json::to_string_pretty(&state) {
        Ok(rendered) => println!("{rendered}"),
        Err(error) => warn!(error = %error, "could not render final state"),
    }
    Ok(())
}

/// Shell without a settings app; exit terminates the process.
struct ConsoleShell;

#[async_trait]
impl SystemShell for ConsoleShell {
    async fn open_app_settings(&self) {
        warn!("grant camera access in the system settings and re-run");
    }

    async fn exit_application(&self) {
        info!("exiting on user request");
        std::process::exit(0);
    }
}

/// Non-interactive denial prompt; always points at settings.
struct HeadlessPrompt;

#[async_trait]
impl DenialPrompt for HeadlessPrompt {
    async fn choose(&self) -> DenialChoice {
        DenialChoice::OpenSettings
    }
}
