//! Drains the offline queue against the attendance server once connectivity
//! is back. A drain pass never runs twice concurrently; a pass requested
//! while one is running is a no-op, retries happen on the next pass.

use super::queue::OfflineQueue;
use crate::errors::AppResult;
use crate::models::attendance::{
    CheckInRequest, CheckInResponse, CheckOutRequest, CheckOutResponse,
};
use crate::models::intent_kind::IntentKind;
use crate::models::pending_intent::{NewIntent, PendingCounts, PendingIntent};
use crate::rpc::AttendanceApi;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Syncing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncError {
    pub local_id: i64,
    pub kind: IntentKind,
    pub subject_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub synced_count: u64,
    pub errors: Vec<SyncError>,
    /// Set when the pass did not run (offline, or another pass in flight)
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

impl SyncReport {
    fn skipped() -> Self {
        Self {
            success: true,
            skipped: true,
            ..Default::default()
        }
    }
}

/// Outcome of a scan handed to [`SyncCoordinator::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    CheckedIn(CheckInResponse),
    CheckedOut(CheckOutResponse),
    /// Not delivered; stored for the next drain pass under this local id
    Queued(i64),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    pub pending_count: PendingCounts,
    pub sync_errors: Vec<SyncError>,
}

struct SyncState {
    is_online: bool,
    phase: SyncPhase,
    pending: PendingCounts,
    errors: Vec<SyncError>,
}

struct Shared {
    api: Arc<dyn AttendanceApi>,
    queue: Arc<OfflineQueue>,
    state: Mutex<SyncState>,
}

#[derive(Clone)]
pub struct SyncCoordinator {
    shared: Arc<Shared>,
}

/// Resets the phase even when the pass future is dropped mid-way.
struct PassGuard<'a>(&'a SyncCoordinator);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().phase = SyncPhase::Idle;
    }
}

/// Hand one intent to the server, without any queueing.
pub async fn deliver(
    api: &dyn AttendanceApi,
    kind: IntentKind,
    intent: &NewIntent,
) -> AppResult<Submission> {
    match kind {
        IntentKind::CheckIn => api
            .check_in(CheckInRequest {
                student_id: intent.subject_id.clone(),
                event_id: intent.event_id.clone(),
                activity_id: intent.activity_id.clone().unwrap_or_default(),
                scanned_by: intent.scanned_by.clone(),
            })
            .await
            .map(Submission::CheckedIn),
        IntentKind::CheckOut => api
            .check_out(CheckOutRequest {
                student_id: intent.subject_id.clone(),
                event_id: intent.event_id.clone(),
                scanned_by: intent.scanned_by.clone(),
            })
            .await
            .map(Submission::CheckedOut),
    }
}

impl SyncCoordinator {
    pub fn new(api: Arc<dyn AttendanceApi>, queue: Arc<OfflineQueue>, is_online: bool) -> Self {
        let pending = queue.counts().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read offline queue counts");
            PendingCounts::default()
        });

        Self {
            shared: Arc::new(Shared {
                api,
                queue,
                state: Mutex::new(SyncState {
                    is_online,
                    phase: SyncPhase::Idle,
                    pending,
                    errors: Vec::new(),
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.shared.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.shared.queue
    }

    pub fn status(&self) -> SyncStatus {
        let st = self.lock();
        SyncStatus {
            is_online: st.is_online,
            is_syncing: st.phase == SyncPhase::Syncing,
            pending_count: st.pending,
            sync_errors: st.errors.clone(),
        }
    }

    pub fn refresh_counts(&self) -> AppResult<PendingCounts> {
        let counts = self.shared.queue.counts()?;
        self.lock().pending = counts;
        Ok(counts)
    }

    /// Store an intent that could not be delivered.
    pub fn enqueue(&self, kind: IntentKind, intent: &NewIntent) -> AppResult<i64> {
        let id = self.shared.queue.enqueue(kind, intent)?;
        self.refresh_counts()?;
        Ok(id)
    }

    /// Deliver a scan now, or queue it when the server cannot be reached.
    /// Offline intents go straight to the queue; fatal errors (unknown
    /// student, bad input) are returned, never queued.
    pub async fn submit(&self, kind: IntentKind, intent: NewIntent) -> AppResult<Submission> {
        if !self.lock().is_online {
            return Ok(Submission::Queued(self.enqueue(kind, &intent)?));
        }

        let delivered = deliver(self.shared.api.as_ref(), kind, &intent).await;

        match delivered {
            Err(e) if e.is_retryable() => {
                tracing::warn!(%kind, error = %e, "server unreachable, queueing intent");
                Ok(Submission::Queued(self.enqueue(kind, &intent)?))
            }
            other => other,
        }
    }

    /// Record a connectivity change. Going online with a non-empty queue
    /// starts a drain pass in the background.
    pub fn set_online(&self, online: bool) -> Option<JoinHandle<AppResult<SyncReport>>> {
        let (went_online, pending) = {
            let mut st = self.lock();
            let went_online = online && !st.is_online;
            st.is_online = online;
            (went_online, st.pending.total)
        };

        tracing::info!(online, "connectivity changed");
        if went_online && pending > 0 {
            let this = self.clone();
            return Some(tokio::spawn(async move { this.sync_pending().await }));
        }
        None
    }

    /// Follow a connectivity signal until its sender goes away.
    pub fn watch(&self, mut connectivity: watch::Receiver<bool>) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let initial = *connectivity.borrow_and_update();
            if let Some(task) = this.set_online(initial) {
                let _ = task.await;
            }
            while connectivity.changed().await.is_ok() {
                let online = *connectivity.borrow_and_update();
                if let Some(task) = this.set_online(online) {
                    match task.await {
                        Ok(Ok(report)) => tracing::info!(
                            synced = report.synced_count,
                            errors = report.errors.len(),
                            "automatic sync finished"
                        ),
                        Ok(Err(e)) => tracing::warn!(error = %e, "automatic sync failed"),
                        Err(e) => tracing::warn!(error = %e, "automatic sync task failed"),
                    }
                }
            }
            tracing::debug!("connectivity watch ended");
        })
    }

    async fn replay(&self, intent: &PendingIntent) -> AppResult<()> {
        let new = NewIntent::new(
            intent.subject_id.as_str(),
            intent.event_id.as_str(),
            intent.activity_id.clone(),
            intent.scanned_by.as_str(),
        );
        let outcome = deliver(self.shared.api.as_ref(), intent.kind, &new).await?;

        let refused = match &outcome {
            Submission::CheckedIn(r) => (!r.success).then(|| r.error.clone()),
            Submission::CheckedOut(r) => (!r.success).then(|| r.error.clone()),
            Submission::Queued(_) => None,
        };
        if let Some(error) = refused {
            tracing::info!(local_id = intent.local_id, kind = %intent.kind, ?error, "queued intent answered without success");
        }
        Ok(())
    }

    /// One drain pass: check-ins first, then check-outs, each in enqueue
    /// order. A failed item stays queued and does not stop the pass.
    pub async fn sync_pending(&self) -> AppResult<SyncReport> {
        {
            let mut st = self.lock();
            if !st.is_online || st.phase == SyncPhase::Syncing {
                tracing::debug!(online = st.is_online, phase = ?st.phase, "sync pass skipped");
                return Ok(SyncReport::skipped());
            }
            st.phase = SyncPhase::Syncing;
            st.errors.clear();
        }
        let _guard = PassGuard(self);

        let mut synced = 0u64;
        let mut errors = Vec::new();

        for kind in [IntentKind::CheckIn, IntentKind::CheckOut] {
            for intent in self.shared.queue.list_pending(kind)? {
                match self.replay(&intent).await {
                    Ok(()) => {
                        self.shared.queue.remove(kind, intent.local_id)?;
                        synced += 1;
                    }
                    Err(e) => {
                        tracing::warn!(%kind, local_id = intent.local_id, error = %e, "queued intent not delivered");
                        errors.push(SyncError {
                            local_id: intent.local_id,
                            kind,
                            subject_id: intent.subject_id.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        let counts = self.shared.queue.counts()?;
        {
            let mut st = self.lock();
            st.pending = counts;
            st.errors = errors.clone();
        }

        tracing::info!(synced, failed = errors.len(), remaining = counts.total, "sync pass finished");

        Ok(SyncReport {
            success: errors.is_empty(),
            synced_count: synced,
            errors,
            skipped: false,
        })
    }
}
