//! Shared fakes and wiring for controller integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use snapstash_app::{AppConfig, ControllerDeps, OrchestrationController};
use snapstash_capture::{CameraDevice, CaptureError, SnapshotFile, SyntheticCamera};
use snapstash_core::{
    Clock, DownloadReceipt, DownloadRequest, FileSystem, FsError, MemoryFileSystem,
    PermissionState, SnapshotOptions,
};
use snapstash_permission::{
    DenialChoice, DenialPrompt, PermissionResolver, PermissionSource, SystemShell,
};
use snapstash_transfer::{MemoryObjectStore, ObjectStore, PutObjectRequest, TransferError};
use tokio::sync::Notify;

#[allow(dead_code)]
pub const BUCKET: &str = "bucket/path";
#[allow(dead_code)]
pub const DOCUMENT_URL: &str = "https://docs.example.com/test.pdf";
#[allow(dead_code)]
pub const NOW_MS: u64 = 1_700_000_000_000;

/// Clock frozen at [`NOW_MS`].
pub struct FrozenClock;

impl Clock for FrozenClock {
    fn now_ms(&self) -> u64 {
        NOW_MS
    }
}

/// Shell that counts the actions it was asked to perform.
#[derive(Default)]
pub struct RecordingShell {
    settings_opened: Mutex<u32>,
    exits: Mutex<u32>,
}

#[allow(dead_code)]
impl RecordingShell {
    pub fn settings_opened(&self) -> u32 {
        *self.settings_opened.lock().expect("settings lock")
    }

    pub fn exits(&self) -> u32 {
        *self.exits.lock().expect("exit lock")
    }
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

struct OpenSettings;

#[async_trait]
impl DenialPrompt for OpenSettings {
    async fn choose(&self) -> DenialChoice {
        DenialChoice::OpenSettings
    }
}

/// Parks callers until the test opens it.
#[allow(dead_code)]
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

#[allow(dead_code)]
impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }

    /// Waits until a caller is parked.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Lets one parked caller through.
    pub fn open(&self) {
        self.release.notify_one();
    }
}

/// Store that parks every put at its gate.
#[allow(dead_code)]
#[derive(Default)]
pub struct GatedStore {
    pub gate: Gate,
}

#[async_trait]
impl ObjectStore for GatedStore {
    async fn put_object(&self, _request: PutObjectRequest) -> Result<(), TransferError> {
        self.gate.pass().await;
        Ok(())
    }
}

/// Camera that parks every snapshot at its gate, then writes a tiny JPEG.
#[allow(dead_code)]
pub struct GatedCamera {
    fs: Arc<dyn FileSystem>,
    pub gate: Gate,
    taken: Mutex<u64>,
}

#[allow(dead_code)]
impl GatedCamera {
    pub fn snapshots_taken(&self) -> u64 {
        *self.taken.lock().expect("count lock")
    }
}

#[async_trait]
impl CameraDevice for GatedCamera {
    async fn take_snapshot(&self, options: SnapshotOptions) -> Result<SnapshotFile, CaptureError> {
        let sequence = {
            let mut taken = self.taken.lock().expect("count lock");
            *taken += 1;
            *taken
        };
        self.gate.pass().await;

        let path = format!("/tmp/gated/snapshot-{sequence}.jpg");
        self.fs
            .write_file(&path, &[0xFF, 0xD8, options.quality(), 0xFF, 0xD9])
            .await
            .map_err(|error| CaptureError::Snapshot(error.to_string()))?;
        Ok(SnapshotFile { path })
    }
}

/// Memory filesystem whose downloads park at a gate.
#[allow(dead_code)]
pub struct GatedFileSystem {
    inner: Arc<MemoryFileSystem>,
    pub gate: Gate,
}

#[async_trait]
impl FileSystem for GatedFileSystem {
    async fn read_file_as_base64(&self, path: &str) -> Result<String, FsError> {
        self.inner.read_file_as_base64(path).await
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        self.inner.write_file(path, contents).await
    }

    async fn remove_file(&self, path: &str) -> Result<(), FsError> {
        self.inner.remove_file(path).await
    }

    fn download_directory(&self) -> String {
        self.inner.download_directory()
    }

    async fn download_file(&self, request: &DownloadRequest) -> Result<DownloadReceipt, FsError> {
        self.gate.pass().await;
        self.inner.download_file(request).await
    }
}

/// Wired controller plus handles on its fakes.
#[allow(dead_code)]
pub struct Harness {
    pub controller: Arc<OrchestrationController>,
    pub camera: Arc<SyntheticCamera>,
    pub fs: Arc<MemoryFileSystem>,
    pub shell: Arc<RecordingShell>,
    pub gated_camera: Option<Arc<GatedCamera>>,
    pub gated_fs: Option<Arc<GatedFileSystem>>,
}

/// Harness options; defaults to an authorized camera and an accepting store.
pub struct HarnessBuilder {
    permission: PermissionState,
    answer: PermissionState,
    with_camera: bool,
    gate_camera: bool,
    gate_downloads: bool,
    store: Arc<dyn ObjectStore>,
    config: AppConfig,
}

#[allow(dead_code)]
impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            permission: PermissionState::Authorized,
            answer: PermissionState::Authorized,
            with_camera: true,
            gate_camera: false,
            gate_downloads: false,
            store: Arc::new(MemoryObjectStore::new()),
            config: AppConfig::new(BUCKET, DOCUMENT_URL),
        }
    }

    pub fn permission(mut self, status: PermissionState, answer: PermissionState) -> Self {
        self.permission = status;
        self.answer = answer;
        self
    }

    pub fn without_camera(mut self) -> Self {
        self.with_camera = false;
        self
    }

    pub fn gated_camera(mut self) -> Self {
        self.gate_camera = true;
        self
    }

    pub fn gated_downloads(mut self) -> Self {
        self.gate_downloads = true;
        self
    }

    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Harness {
        let fs = Arc::new(MemoryFileSystem::new("/downloads"));
        let gated_fs = self.gate_downloads.then(|| {
            Arc::new(GatedFileSystem {
                inner: fs.clone(),
                gate: Gate::default(),
            })
        });
        let shared_fs: Arc<dyn FileSystem> = match &gated_fs {
            Some(gated) => gated.clone() as Arc<dyn FileSystem>,
            None => fs.clone() as Arc<dyn FileSystem>,
        };
        let camera = Arc::new(
            SyntheticCamera::new(Arc::clone(&shared_fs), "/tmp/camera")
                .with_permission(self.permission)
                .answering_requests_with(self.answer),
        );
        let shell = Arc::new(RecordingShell::default());

        let source: Arc<dyn PermissionSource> = camera.clone();
        let gated_camera = self.gate_camera.then(|| {
            Arc::new(GatedCamera {
                fs: Arc::clone(&shared_fs),
                gate: Gate::default(),
                taken: Mutex::new(0),
            })
        });
        let device: Option<Arc<dyn CameraDevice>> = match (&gated_camera, self.with_camera) {
            (Some(gated), _) => Some(gated.clone() as Arc<dyn CameraDevice>),
            (None, true) => Some(camera.clone() as Arc<dyn CameraDevice>),
            (None, false) => None,
        };

        let controller = OrchestrationController::new(
            ControllerDeps {
                permissions: PermissionResolver::new(
                    source,
                    shell.clone(),
                    Arc::new(OpenSettings),
                ),
                camera: device,
                fs: shared_fs,
                store: self.store,
                clock: Arc::new(FrozenClock),
            },
            self.config,
        );

        Harness {
            controller: Arc::new(controller),
            camera,
            fs,
            shell,
            gated_camera,
            gated_fs,
        }
    }
}

/// Drives a fresh harness to Reviewing and returns the staged file path.
#[allow(dead_code)]
pub async fn reviewing(harness: &Harness) -> String {
    harness.controller.mount().await.expect("mount");
    harness.controller.press_snapshot().await.expect("snapshot");
    let artifact = harness.controller.press_shot().await.expect("shot");
    artifact.local_path().to_string()
}
