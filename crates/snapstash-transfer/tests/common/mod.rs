//! Shared fixtures for transfer integration tests.

use std::sync::Mutex;

use snapstash_core::{CaptureArtifact, Clock};

/// Clock that returns scripted timestamps, repeating the last one.
#[allow(dead_code)]
pub struct ScriptedClock {
    ticks: Mutex<Vec<u64>>,
}

#[allow(dead_code)]
impl ScriptedClock {
    pub fn new(mut ticks: Vec<u64>) -> Self {
        ticks.reverse();
        Self {
            ticks: Mutex::new(ticks),
        }
    }
}

impl Clock for ScriptedClock {
    fn now_ms(&self) -> u64 {
        let mut ticks = self.ticks.lock().expect("clock lock");
        if ticks.len() > 1 {
            ticks.pop().expect("non-empty ticks")
        } else {
            ticks.last().copied().unwrap_or(0)
        }
    }
}

/// Creates a small JPEG-framed artifact fixture.
#[allow(dead_code)]
pub fn fixture_artifact(name: &str) -> CaptureArtifact {
    CaptureArtifact::new(
        "/tmp/camera/snapshot-1.jpg",
        vec![0xFF, 0xD8, 0xFF, 0xE0, 85, 0xFF, 0xD9],
        name,
    )
    .expect("artifact fixture should be valid")
}
