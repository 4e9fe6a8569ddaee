//! Camera backend fed by text lines: a handheld wedge scanner, a pipe or a
//! test fixture. Each non-empty line is one decoded code; an empty line is
//! a decode attempt that found nothing.

use super::camera::{CameraBackend, CameraDevice, CameraHandle, CameraSource, CaptureConfig, Frame};
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

pub type LineReader = Box<dyn AsyncBufRead + Send + Unpin>;
type ReaderFactory = Box<dyn Fn() -> AppResult<LineReader> + Send + Sync>;

pub const LINE_DEVICE_ID: &str = "line-input";

pub struct LineCameraBackend {
    label: String,
    factory: ReaderFactory,
}

impl LineCameraBackend {
    pub fn new<F>(label: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> AppResult<LineReader> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            factory: Box::new(factory),
        }
    }

    /// Read codes from standard input. Only one session may consume it.
    pub fn stdin() -> Self {
        let taken = Mutex::new(false);
        Self::new("Standard input (rear)", move || {
            let mut taken = taken.lock().unwrap_or_else(|p| p.into_inner());
            if *taken {
                return Err(AppError::Camera(
                    "device in use: standard input already consumed".to_string(),
                ));
            }
            *taken = true;
            Ok(Box::new(BufReader::new(tokio::io::stdin())) as LineReader)
        })
    }

    /// Serve a fixed list of lines, once per open.
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self::new("Fixture (rear)", move || {
            let mut text = lines.join("\n");
            text.push('\n');
            Ok(Box::new(BufReader::new(std::io::Cursor::new(text.into_bytes()))) as LineReader)
        })
    }
}

#[async_trait]
impl CameraBackend for LineCameraBackend {
    async fn enumerate(&self) -> AppResult<Vec<CameraDevice>> {
        Ok(vec![CameraDevice {
            id: LINE_DEVICE_ID.to_string(),
            label: self.label.clone(),
        }])
    }

    async fn open(
        &self,
        source: &CameraSource,
        config: &CaptureConfig,
        target: &str,
    ) -> AppResult<Box<dyn CameraHandle>> {
        if let CameraSource::Device(id) = source
            && id != LINE_DEVICE_ID
        {
            return Err(AppError::Camera(format!("NotFoundError: no camera '{}'", id)));
        }

        tracing::debug!(fps = config.fps, target, "line input opened");
        let reader = (self.factory)()?;
        Ok(Box::new(LineCameraHandle {
            reader: Some(reader),
            buf: String::new(),
        }))
    }
}

struct LineCameraHandle {
    reader: Option<LineReader>,
    buf: String,
}

#[async_trait]
impl CameraHandle for LineCameraHandle {
    async fn next_frame(&mut self) -> Option<Frame> {
        let reader = self.reader.as_mut()?;
        self.buf.clear();
        match reader.read_line(&mut self.buf).await {
            Ok(0) => None,
            Ok(_) => {
                let line = self.buf.trim();
                if line.is_empty() {
                    Some(Frame::Failed("No QR code found".to_string()))
                } else {
                    Some(Frame::Decoded(line.to_string()))
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "line input failed");
                None
            }
        }
    }

    async fn stop(&mut self) -> AppResult<()> {
        self.reader = None;
        Ok(())
    }

    fn clear(&mut self) {
        self.buf.clear();
    }
}
