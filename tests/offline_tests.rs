use async_trait::async_trait;
use rattendance::errors::{AppError, AppResult};
use rattendance::models::attendance::{
    CheckInRequest, CheckInResponse, CheckOutRequest, CheckOutResponse, ForceAllRequest,
    ForceAllResponse, ForceCheckOutRequest, ForceCheckOutResponse, SummaryRequest,
    SummaryResponse,
};
use rattendance::models::intent_kind::IntentKind;
use rattendance::models::pending_intent::NewIntent;
use rattendance::offline::{OfflineQueue, Submission, SyncCoordinator};
use rattendance::rpc::AttendanceApi;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, watch};

/// Records every call; subjects listed in `unreachable` fail with a
/// transport error, those in `duplicate` get a structured refusal.
#[derive(Default)]
struct MockApi {
    calls: Mutex<Vec<String>>,
    unreachable: Mutex<Vec<String>>,
    duplicate: Vec<String>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl MockApi {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn set_unreachable(&self, subjects: &[&str]) {
        *self.unreachable.lock().unwrap() = subjects.iter().map(|s| s.to_string()).collect();
    }

    async fn record(&self, call: String, subject: &str) -> AppResult<()> {
        self.calls.lock().unwrap().push(call);
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.unreachable.lock().unwrap().iter().any(|s| s == subject) {
            return Err(AppError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceApi for MockApi {
    async fn check_in(&self, req: CheckInRequest) -> AppResult<CheckInResponse> {
        self.record(format!("in:{}", req.student_id), &req.student_id)
            .await?;
        if self.duplicate.contains(&req.student_id) {
            return Ok(CheckInResponse::duplicate());
        }
        Ok(CheckInResponse {
            success: true,
            student_name: Some(req.student_id.to_uppercase()),
            entry_id: Some(1),
            ..Default::default()
        })
    }

    async fn check_out(&self, req: CheckOutRequest) -> AppResult<CheckOutResponse> {
        self.record(format!("out:{}", req.student_id), &req.student_id)
            .await?;
        Ok(CheckOutResponse {
            success: true,
            hours_worked: Some(1.0),
            ..Default::default()
        })
    }

    async fn force_check_out(
        &self,
        _actor: &str,
        _req: ForceCheckOutRequest,
    ) -> AppResult<ForceCheckOutResponse> {
        Err(AppError::Other("not used".to_string()))
    }

    async fn force_all_check_out(
        &self,
        _actor: &str,
        _req: ForceAllRequest,
    ) -> AppResult<ForceAllResponse> {
        Err(AppError::Other("not used".to_string()))
    }

    async fn get_daily_review_summary(
        &self,
        _actor: &str,
        _req: SummaryRequest,
    ) -> AppResult<SummaryResponse> {
        Ok(SummaryResponse::default())
    }
}

fn intent(subject: &str) -> NewIntent {
    NewIntent::new(subject, "food-drive", Some("sorting".to_string()), "op-1")
}

fn coordinator(api: Arc<MockApi>, online: bool) -> SyncCoordinator {
    let queue = Arc::new(OfflineQueue::open_in_memory().expect("queue"));
    SyncCoordinator::new(api, queue, online)
}

#[test]
fn test_queue_keeps_enqueue_order_per_kind() {
    let queue = OfflineQueue::open_in_memory().expect("queue");
    let a = queue.enqueue(IntentKind::CheckIn, &intent("s1")).expect("enqueue");
    let b = queue.enqueue(IntentKind::CheckIn, &intent("s2")).expect("enqueue");
    queue.enqueue(IntentKind::CheckOut, &intent("s3")).expect("enqueue");
    assert!(b > a);

    let ins = queue.list_pending(IntentKind::CheckIn).expect("list");
    let subjects: Vec<_> = ins.iter().map(|p| p.subject_id.as_str()).collect();
    assert_eq!(subjects, ["s1", "s2"]);
    assert!(ins.iter().all(|p| p.kind == IntentKind::CheckIn));
    assert_eq!(ins[0].activity_id.as_deref(), Some("sorting"));

    let counts = queue.counts().expect("counts");
    assert_eq!((counts.check_ins, counts.check_outs, counts.total), (2, 1, 3));

    assert!(queue.remove(IntentKind::CheckIn, a).expect("remove"));
    assert!(!queue.remove(IntentKind::CheckIn, a).expect("remove again"));
    assert_eq!(queue.clear(IntentKind::CheckOut).expect("clear"), 1);
    assert_eq!(queue.counts().expect("counts").total, 1);
}

#[test]
fn test_queue_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("queue.sqlite");
    let path = path.to_string_lossy().to_string();

    {
        let queue = OfflineQueue::open(&path).expect("open");
        queue.enqueue(IntentKind::CheckOut, &intent("s1")).expect("enqueue");
    }

    let queue = OfflineQueue::open(&path).expect("reopen");
    let pending = queue.list_pending(IntentKind::CheckOut).expect("list");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].subject_id, "s1");
}

#[tokio::test]
async fn test_offline_submissions_drain_when_back_online() {
    let api = Arc::new(MockApi::default());
    let sync = coordinator(api.clone(), false);

    let first = sync
        .submit(IntentKind::CheckIn, intent("s1"))
        .await
        .expect("submit");
    let second = sync
        .submit(IntentKind::CheckOut, intent("s2"))
        .await
        .expect("submit");
    assert!(matches!(first, Submission::Queued(_)));
    assert!(matches!(second, Submission::Queued(_)));
    assert_eq!(sync.status().pending_count.total, 2);
    assert!(api.calls().is_empty());

    let task = sync.set_online(true).expect("drain pass started");
    let report = task.await.expect("join").expect("sync");

    assert!(report.success);
    assert_eq!(report.synced_count, 2);
    assert_eq!(sync.status().pending_count.total, 0);
    assert!(!sync.status().is_syncing);
    assert_eq!(api.calls(), ["in:s1", "out:s2"]);
}

#[tokio::test]
async fn test_check_ins_replay_before_check_outs() {
    let api = Arc::new(MockApi::default());
    let sync = coordinator(api.clone(), true);

    sync.enqueue(IntentKind::CheckOut, &intent("s9")).expect("enqueue");
    sync.enqueue(IntentKind::CheckIn, &intent("s1")).expect("enqueue");
    sync.enqueue(IntentKind::CheckIn, &intent("s2")).expect("enqueue");

    sync.sync_pending().await.expect("sync");
    assert_eq!(api.calls(), ["in:s1", "in:s2", "out:s9"]);
}

#[tokio::test]
async fn test_failed_item_stays_queued_without_aborting_pass() {
    let api = Arc::new(MockApi::default());
    api.set_unreachable(&["s2"]);
    let sync = coordinator(api.clone(), true);

    for s in ["s1", "s2", "s3"] {
        sync.enqueue(IntentKind::CheckIn, &intent(s)).expect("enqueue");
    }

    let report = sync.sync_pending().await.expect("sync");
    assert!(!report.success);
    assert_eq!(report.synced_count, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].subject_id, "s2");
    assert_eq!(sync.status().sync_errors.len(), 1);

    let left = sync.queue().list_pending(IntentKind::CheckIn).expect("list");
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].subject_id, "s2");

    api.set_unreachable(&[]);
    let retry = sync.sync_pending().await.expect("retry");
    assert!(retry.success);
    assert_eq!(retry.synced_count, 1);
    assert!(sync.status().sync_errors.is_empty());
}

#[tokio::test]
async fn test_structured_refusal_counts_as_delivered() {
    let api = Arc::new(MockApi {
        duplicate: vec!["s1".to_string()],
        ..Default::default()
    });
    let sync = coordinator(api.clone(), true);
    sync.enqueue(IntentKind::CheckIn, &intent("s1")).expect("enqueue");

    let report = sync.sync_pending().await.expect("sync");
    assert!(report.success);
    assert_eq!(report.synced_count, 1);
    assert_eq!(sync.queue().counts().expect("counts").total, 0);
}

#[tokio::test]
async fn test_submit_queues_on_transport_error() {
    let api = Arc::new(MockApi::default());
    api.set_unreachable(&["s1"]);
    let sync = coordinator(api.clone(), true);

    let out = sync
        .submit(IntentKind::CheckIn, intent("s1"))
        .await
        .expect("submit");
    assert!(matches!(out, Submission::Queued(id) if id > 0));
    assert_eq!(sync.status().pending_count.check_ins, 1);

    let ok = sync
        .submit(IntentKind::CheckIn, intent("s2"))
        .await
        .expect("submit");
    match ok {
        Submission::CheckedIn(r) => assert_eq!(r.student_name.as_deref(), Some("S2")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_sync_skipped_while_offline() {
    let api = Arc::new(MockApi::default());
    let sync = coordinator(api.clone(), false);
    sync.enqueue(IntentKind::CheckIn, &intent("s1")).expect("enqueue");

    let report = sync.sync_pending().await.expect("sync");
    assert!(report.skipped);
    assert_eq!(report.synced_count, 0);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_overlapping_pass_is_skipped() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let api = Arc::new(MockApi {
        gate: Some((entered.clone(), release.clone())),
        ..Default::default()
    });
    let sync = coordinator(api.clone(), true);
    sync.enqueue(IntentKind::CheckIn, &intent("s1")).expect("enqueue");

    let running = {
        let sync = sync.clone();
        tokio::spawn(async move { sync.sync_pending().await })
    };
    entered.notified().await;
    assert!(sync.status().is_syncing);

    let second = sync.sync_pending().await.expect("second pass");
    assert!(second.skipped);

    release.notify_one();
    let first = running.await.expect("join").expect("first pass");
    assert_eq!(first.synced_count, 1);
    assert_eq!(api.calls().len(), 1);
    assert!(!sync.status().is_syncing);
}

#[tokio::test]
async fn test_connectivity_watch_triggers_drain() {
    let api = Arc::new(MockApi::default());
    let sync = coordinator(api.clone(), false);
    sync.enqueue(IntentKind::CheckIn, &intent("s1")).expect("enqueue");

    let (tx, rx) = watch::channel(false);
    let watcher = sync.watch(rx);
    tx.send(true).expect("send");

    for _ in 0..50 {
        if sync.status().pending_count.total == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(sync.status().pending_count.total, 0);
    assert!(sync.status().is_online);

    drop(tx);
    watcher.await.expect("watch task");
}
