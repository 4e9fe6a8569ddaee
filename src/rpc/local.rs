use super::AttendanceApi;
use crate::core::attendance::AttendanceService;
use crate::core::reconcile::ReconcileLogic;
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::models::attendance::{
    CheckInRequest, CheckInResponse, CheckOutRequest, CheckOutResponse, ForceAllRequest,
    ForceAllResponse, ForceCheckOutRequest, ForceCheckOutResponse, SummaryRequest, SummaryResponse,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Runs the services against a local database on the blocking pool.
/// Shared by the HTTP server and by CLI commands that skip the network.
#[derive(Clone)]
pub struct LocalAttendanceApi {
    pool: Arc<Mutex<DbPool>>,
    attendance: Arc<AttendanceService>,
    reconcile: Arc<ReconcileLogic>,
}

impl LocalAttendanceApi {
    pub fn new(pool: DbPool, attendance: AttendanceService) -> Self {
        let reconcile = ReconcileLogic::new(attendance.policy());
        Self {
            pool: Arc::new(Mutex::new(pool)),
            attendance: Arc::new(attendance),
            reconcile: Arc::new(reconcile),
        }
    }

    /// Run `f` with exclusive access to the connection, off the async workers.
    pub async fn with_pool<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut DbPool, &AttendanceService, &ReconcileLogic) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        let attendance = Arc::clone(&self.attendance);
        let reconcile = Arc::clone(&self.reconcile);

        tokio::task::spawn_blocking(move || {
            let mut guard = pool.lock().unwrap_or_else(|p| p.into_inner());
            f(&mut guard, &attendance, &reconcile)
        })
        .await
        .map_err(|e| AppError::Other(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl AttendanceApi for LocalAttendanceApi {
    async fn check_in(&self, req: CheckInRequest) -> AppResult<CheckInResponse> {
        self.with_pool(move |pool, svc, _| svc.check_in(pool, &req)).await
    }

    async fn check_out(&self, req: CheckOutRequest) -> AppResult<CheckOutResponse> {
        self.with_pool(move |pool, svc, _| svc.check_out(pool, &req)).await
    }

    async fn force_check_out(
        &self,
        actor: &str,
        req: ForceCheckOutRequest,
    ) -> AppResult<ForceCheckOutResponse> {
        let actor = actor.to_string();
        self.with_pool(move |pool, _, rec| rec.force_check_out(pool, &req, &actor))
            .await
    }

    async fn force_all_check_out(
        &self,
        actor: &str,
        req: ForceAllRequest,
    ) -> AppResult<ForceAllResponse> {
        let actor = actor.to_string();
        self.with_pool(move |pool, _, rec| rec.force_all_check_out(pool, &req, &actor))
            .await
    }

    async fn get_daily_review_summary(
        &self,
        actor: &str,
        req: SummaryRequest,
    ) -> AppResult<SummaryResponse> {
        if actor.trim().is_empty() {
            return Err(AppError::Unauthenticated);
        }
        self.with_pool(move |pool, _, rec| rec.daily_review_summary(pool, &req))
            .await
            .map(SummaryResponse::from)
    }
}
