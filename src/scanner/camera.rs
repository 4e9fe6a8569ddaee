//! Seam to the external camera/decoding primitive. The barcode decoding
//! itself happens behind these traits.

use crate::errors::AppResult;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraDevice {
    pub id: String,
    pub label: String,
}

/// What to open: an explicit device, or a facing-mode hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    Device(String),
    FacingMode(String),
}

impl CameraSource {
    pub fn rear() -> Self {
        CameraSource::FacingMode("environment".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub fps: u32,
    pub detection_box: u32,
}

impl From<&crate::config::ScannerConfig> for CaptureConfig {
    fn from(cfg: &crate::config::ScannerConfig) -> Self {
        Self {
            fps: cfg.fps,
            detection_box: cfg.detection_box,
        }
    }
}

/// One decode attempt reported by the primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Raw text of a detected code
    Decoded(String),
    /// The attempt failed; most of the time this is just "no code in view"
    Failed(String),
}

#[async_trait]
pub trait CameraBackend: Send + Sync + 'static {
    async fn enumerate(&self) -> AppResult<Vec<CameraDevice>>;

    /// Open a capture session rendering into `target`. The primitive is not
    /// safe for concurrent open/close on the same device.
    async fn open(
        &self,
        source: &CameraSource,
        config: &CaptureConfig,
        target: &str,
    ) -> AppResult<Box<dyn CameraHandle>>;
}

/// An open capture session. Frames form a lazy, infinite sequence of
/// decode attempts until the session is stopped or the device goes away.
#[async_trait]
pub trait CameraHandle: Send {
    /// Next decode attempt; `None` once the underlying stream has ended.
    async fn next_frame(&mut self) -> Option<Frame>;

    async fn stop(&mut self) -> AppResult<()>;

    /// Release rendering resources bound to the target element.
    fn clear(&mut self);
}

static NO_CODE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(notfoundexception|no multiformat readers|no (qr |bar)?code (found|detected|in view)|qr code parse error)")
        .expect("static regex")
});

/// "No code in this frame" failures are emitted many times per second by the
/// primitive and carry no information.
pub fn is_no_code_noise(message: &str) -> bool {
    message.trim().is_empty() || NO_CODE_NOISE.is_match(message)
}

static REAR_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(back|rear|environment)\b").expect("static regex")
});

/// Rear-facing device, judged by its label.
pub fn preferred_camera(cameras: &[CameraDevice]) -> Option<&CameraDevice> {
    cameras.iter().find(|c| REAR_LABEL.is_match(&c.label))
}
