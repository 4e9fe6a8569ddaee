pub mod attendance;
pub mod config;
pub mod db;
pub mod init;
pub mod log;
pub mod qr;
pub mod queue;
pub mod reconcile;
pub mod roster;
pub mod scan;
pub mod serve;

use crate::config::Config;
use crate::core::attendance::AttendanceService;
use crate::db::open_initialized;
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::offline::{OfflineQueue, SyncCoordinator};
use crate::rpc::AttendanceApi;
use crate::rpc::client::HttpAttendanceApi;
use crate::rpc::local::LocalAttendanceApi;
use std::sync::Arc;

pub(crate) fn runtime() -> AppResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::from)
}

pub(crate) fn open_db(cfg: &Config) -> AppResult<DbPool> {
    open_initialized(&cfg.database)
}

pub(crate) fn local_api(cfg: &Config) -> AppResult<LocalAttendanceApi> {
    Ok(LocalAttendanceApi::new(
        open_db(cfg)?,
        AttendanceService::from_config(cfg),
    ))
}

/// HTTP endpoint when `remote`, else the local database.
pub(crate) fn api(cfg: &Config, remote: bool) -> AppResult<Arc<dyn AttendanceApi>> {
    if remote {
        Ok(Arc::new(HttpAttendanceApi::from_config(&cfg.server)?))
    } else {
        Ok(Arc::new(local_api(cfg)?))
    }
}

/// Remote delivery backed by the offline queue.
pub(crate) fn coordinator(cfg: &Config) -> AppResult<SyncCoordinator> {
    let queue = Arc::new(OfflineQueue::open(&cfg.queue_database)?);
    Ok(SyncCoordinator::new(api(cfg, true)?, queue, true))
}

pub(crate) fn operator(cfg: &Config, explicit: &Option<String>) -> String {
    explicit.clone().unwrap_or_else(|| cfg.actor.clone())
}
