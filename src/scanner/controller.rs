//! Scanner lifecycle: owns the single camera handle and serializes
//! start/stop/reset through an explicit state machine.
//!
//! ```text
//!   Idle ──start──▶ Starting ──open ok──▶ Running ──stop──▶ Stopping ──▶ Idle
//!                      └──open failed──▶ Idle
//!   any ──reset──▶ Idle
//! ```
//!
//! A call that arrives while a transition is in flight is rejected, never
//! queued: callers observe [`ScannerStatus`] and retry. The state lives
//! under a `std::sync::Mutex` that is never held across an `.await`.
//!
//! Frames are pulled by a single pump task that owns the open handle and
//! routes decoded text through the payload codec to one subscriber.

use super::camera::{
    CameraBackend, CameraDevice, CameraHandle, CameraSource, CaptureConfig, Frame,
    is_no_code_noise, preferred_camera,
};
use super::payload::{self, ScanPayload};
use crate::errors::{AppError, AppResult};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerState {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Result of a lifecycle call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// No-op: the scanner was in the given state
    Ignored(ScannerState),
}

/// What the single subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A decoded code that passed checksum validation
    Success(ScanPayload),
    /// A decoded code that failed validation
    Error(String),
    /// A decode attempt failed for a reason other than "no code in view"
    FrameError(String),
    /// The frame stream ended without a stop request (device lost, input closed)
    Closed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScannerStatus {
    pub state: ScannerState,
    pub is_scanning: bool,
    pub error: Option<String>,
    pub cameras: Vec<CameraDevice>,
    pub selected_camera: Option<String>,
}

struct Pump {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<AppResult<()>>,
}

impl Pump {
    /// Ask the pump to stop the handle and wait for it.
    async fn shutdown(self) -> AppResult<()> {
        let _ = self.shutdown.send(());
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(AppError::Camera(format!("frame pump crashed: {}", e))),
        }
    }
}

struct Deferred {
    id: u64,
    task: JoinHandle<()>,
}

struct Inner {
    state: ScannerState,
    /// Bumped by every start and reset; a completion that sees a different
    /// value has been superseded.
    generation: u64,
    cameras: Option<Vec<CameraDevice>>,
    selected: Option<String>,
    error: Option<String>,
    pump: Option<Pump>,
    deferred: Option<Deferred>,
    next_deferred_id: u64,
}

struct Shared {
    backend: Arc<dyn CameraBackend>,
    capture: CaptureConfig,
    events: mpsc::UnboundedSender<ScanEvent>,
    inner: Mutex<Inner>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(d) = inner.deferred.take() {
            d.task.abort();
        }
        if let Some(p) = inner.pump.take() {
            let _ = p.shutdown.send(());
        }
    }
}

#[derive(Clone)]
pub struct ScannerController {
    shared: Arc<Shared>,
}

/// Message shown to the operator; every one of them is retryable.
fn operator_message(e: &AppError) -> String {
    let raw = e.to_string();
    let lower = raw.to_lowercase();
    if lower.contains("notallowed") || lower.contains("permission") {
        "Camera permission denied. Allow camera access and try again.".to_string()
    } else if lower.contains("notfound") || lower.contains("no camera") {
        "No camera found. Connect a camera and try again.".to_string()
    } else if lower.contains("notreadable") || lower.contains("in use") {
        "Camera is in use by another application. Close it and try again.".to_string()
    } else {
        format!("Failed to start camera: {}. Try again.", raw)
    }
}

impl ScannerController {
    /// Build a controller for one scanning session, returning the receiving
    /// side of its event stream.
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        capture: CaptureConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Shared {
            backend,
            capture,
            events: tx,
            inner: Mutex::new(Inner {
                state: ScannerState::Idle,
                generation: 0,
                cameras: None,
                selected: None,
                error: None,
                pump: None,
                deferred: None,
                next_deferred_id: 0,
            }),
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            rx,
        )
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> ScannerState {
        self.lock().state
    }

    pub fn is_scanning(&self) -> bool {
        self.state() == ScannerState::Running
    }

    pub fn status(&self) -> ScannerStatus {
        let inner = self.lock();
        ScannerStatus {
            state: inner.state,
            is_scanning: inner.state == ScannerState::Running,
            error: inner.error.clone(),
            cameras: inner.cameras.clone().unwrap_or_default(),
            selected_camera: inner.selected.clone(),
        }
    }

    /// Dismiss the surfaced error message.
    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    /// Enumerate devices once per controller; later calls hit the cache.
    pub async fn get_cameras(&self) -> AppResult<Vec<CameraDevice>> {
        if let Some(cached) = self.lock().cameras.clone() {
            return Ok(cached);
        }

        let found = self.shared.backend.enumerate().await?;
        tracing::debug!(count = found.len(), "cameras enumerated");
        self.lock().cameras = Some(found.clone());
        Ok(found)
    }

    async fn resolve_source(&self) -> CameraSource {
        let selected = self.lock().selected.clone();
        if let Some(id) = selected {
            return CameraSource::Device(id);
        }

        let cameras = match self.get_cameras().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "camera enumeration failed, using facing mode");
                Vec::new()
            }
        };

        match preferred_camera(&cameras) {
            Some(c) => CameraSource::Device(c.id.clone()),
            None => CameraSource::rear(),
        }
    }

    /// Idle → Starting → Running. Ignored unless Idle.
    pub async fn start(&self, target: &str) -> AppResult<Transition> {
        let (generation, stale) = {
            let mut inner = self.lock();
            if inner.state != ScannerState::Idle {
                tracing::debug!(state = ?inner.state, "start ignored: transition in flight or already running");
                return Ok(Transition::Ignored(inner.state));
            }
            inner.state = ScannerState::Starting;
            inner.error = None;
            inner.generation += 1;
            (inner.generation, inner.pump.take())
        };

        if let Some(pump) = stale
            && let Err(e) = pump.shutdown().await
        {
            tracing::debug!(error = %e, "stale camera handle teardown failed");
        }

        let source = self.resolve_source().await;
        tracing::info!(?source, target, "opening camera");
        let opened = self
            .shared
            .backend
            .open(&source, &self.shared.capture, target)
            .await;

        // Superseded by reset() while the open was in flight: the late
        // handle must not become a second active one.
        let superseded = {
            let inner = self.lock();
            inner.generation != generation || inner.state != ScannerState::Starting
        };
        if superseded {
            if let Ok(mut handle) = opened {
                let _ = handle.stop().await;
                handle.clear();
            }
            tracing::debug!("camera open superseded by reset");
            return Ok(Transition::Ignored(self.state()));
        }

        match opened {
            Ok(handle) => {
                let pump = self.spawn_pump(handle, generation);
                let mut inner = self.lock();
                inner.pump = Some(pump);
                inner.state = ScannerState::Running;
                tracing::info!("scanner running");
                Ok(Transition::Applied)
            }
            Err(e) => {
                let mut inner = self.lock();
                inner.state = ScannerState::Idle;
                inner.error = Some(operator_message(&e));
                tracing::warn!(error = %e, "camera failed to start");
                Err(e)
            }
        }
    }

    /// Running → Stopping → Idle. No-op when Idle; rejected while a
    /// transition is in flight.
    pub async fn stop(&self) -> AppResult<Transition> {
        let (pump, generation) = {
            let mut inner = self.lock();
            match inner.state {
                ScannerState::Running => {
                    inner.state = ScannerState::Stopping;
                    (inner.pump.take(), inner.generation)
                }
                other => {
                    tracing::debug!(state = ?other, "stop ignored");
                    return Ok(Transition::Ignored(other));
                }
            }
        };

        let result = match pump {
            Some(p) => p.shutdown().await,
            None => Ok(()),
        };

        let mut inner = self.lock();
        if inner.generation == generation && inner.state == ScannerState::Stopping {
            inner.state = ScannerState::Idle;
        }
        match result {
            Ok(()) => {
                tracing::info!("scanner stopped");
                Ok(Transition::Applied)
            }
            Err(e) => {
                inner.error = Some(format!("Failed to stop camera: {}", e));
                Err(e)
            }
        }
    }

    /// Force Idle from any state, swallowing teardown errors.
    pub async fn reset(&self) {
        let pump = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state = ScannerState::Stopping;
            inner.pump.take()
        };
        let generation = self.lock().generation;

        if let Some(p) = pump
            && let Err(e) = p.shutdown().await
        {
            tracing::debug!(error = %e, "teardown error swallowed by reset");
        }

        let mut inner = self.lock();
        if inner.generation == generation {
            inner.state = ScannerState::Idle;
        }
        tracing::info!("scanner reset");
    }

    /// Record the device for the next start; a running session is stopped first.
    pub async fn switch_camera(&self, id: &str) -> AppResult<()> {
        if self.is_scanning() {
            self.stop().await?;
        }
        self.lock().selected = Some(id.to_string());
        Ok(())
    }

    /// Schedule a start after `delay`. Cancelled by [`Self::cancel_deferred`]
    /// or [`Self::dispose`] as long as the delay has not elapsed.
    pub fn start_deferred(&self, target: impl Into<String>, delay: Duration) {
        let target = target.into();
        let this = self.clone();
        let mut inner = self.lock();
        inner.next_deferred_id += 1;
        let id = inner.next_deferred_id;

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Past the delay the start is no longer cancellable.
            {
                let mut inner = this.lock();
                if inner.deferred.as_ref().is_some_and(|d| d.id == id) {
                    inner.deferred = None;
                }
            }
            if let Err(e) = this.start(&target).await {
                tracing::warn!(error = %e, "deferred scanner start failed");
            }
        });

        if let Some(prev) = inner.deferred.replace(Deferred { id, task }) {
            prev.task.abort();
        }
    }

    pub fn cancel_deferred(&self) -> bool {
        match self.lock().deferred.take() {
            Some(d) => {
                d.task.abort();
                true
            }
            None => false,
        }
    }

    /// Owner is going away: cancel pending work and tear down unconditionally.
    pub async fn dispose(&self) {
        self.cancel_deferred();
        self.reset().await;
    }

    fn spawn_pump(&self, handle: Box<dyn CameraHandle>, generation: u64) -> Pump {
        let (tx, rx) = oneshot::channel();
        let events = self.shared.events.clone();
        let owner = Arc::downgrade(&self.shared);
        let task = tokio::spawn(run_pump(handle, rx, events, owner, generation));
        Pump { shutdown: tx, task }
    }
}

fn route_decoded(text: &str, events: &mpsc::UnboundedSender<ScanEvent>) {
    let decoded = payload::decode(text);
    let event = match decoded.error.clone() {
        None => match decoded.into_payload() {
            Some(p) => ScanEvent::Success(p),
            None => ScanEvent::Error("invalid QR code".to_string()),
        },
        Some(err) => ScanEvent::Error(err.to_string()),
    };
    let _ = events.send(event);
}

async fn run_pump(
    mut handle: Box<dyn CameraHandle>,
    mut shutdown: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<ScanEvent>,
    owner: Weak<Shared>,
    generation: u64,
) -> AppResult<()> {
    let mut ended = false;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            frame = handle.next_frame() => match frame {
                Some(Frame::Decoded(text)) => route_decoded(&text, &events),
                Some(Frame::Failed(msg)) => {
                    if !is_no_code_noise(&msg) {
                        tracing::debug!(message = %msg, "decode attempt failed");
                        let _ = events.send(ScanEvent::FrameError(msg));
                    }
                }
                None => {
                    ended = true;
                    break;
                }
            }
        }
    }

    let result = handle.stop().await;
    handle.clear();

    if ended {
        // Stream ended on its own: return the controller to Idle unless a
        // newer session already took over.
        if let Some(shared) = owner.upgrade() {
            let mut inner = shared.inner.lock().unwrap_or_else(|p| p.into_inner());
            if inner.generation == generation && inner.state == ScannerState::Running {
                inner.state = ScannerState::Idle;
                inner.pump = None;
            }
        }
        let _ = events.send(ScanEvent::Closed);
    }

    result
}
