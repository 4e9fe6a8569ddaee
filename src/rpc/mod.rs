//! Remote procedure surface of the attendance server.
//!
//! [`AttendanceApi`] is the seam the client side (sync coordinator, CLI)
//! talks through; it is implemented in-process by [`local::LocalAttendanceApi`]
//! and over HTTP by [`client::HttpAttendanceApi`], which targets the axum
//! router in [`server`].

use crate::errors::AppResult;
use crate::models::attendance::{
    CheckInRequest, CheckInResponse, CheckOutRequest, CheckOutResponse, ForceAllRequest,
    ForceAllResponse, ForceCheckOutRequest, ForceCheckOutResponse, SummaryRequest, SummaryResponse,
};
use async_trait::async_trait;

pub mod client;
pub mod local;
pub mod server;

/// Header carrying the authenticated actor of admin operations.
pub const ACTOR_HEADER: &str = "x-actor-id";

#[async_trait]
pub trait AttendanceApi: Send + Sync {
    async fn check_in(&self, req: CheckInRequest) -> AppResult<CheckInResponse>;

    async fn check_out(&self, req: CheckOutRequest) -> AppResult<CheckOutResponse>;

    async fn force_check_out(
        &self,
        actor: &str,
        req: ForceCheckOutRequest,
    ) -> AppResult<ForceCheckOutResponse>;

    async fn force_all_check_out(
        &self,
        actor: &str,
        req: ForceAllRequest,
    ) -> AppResult<ForceAllResponse>;

    async fn get_daily_review_summary(
        &self,
        actor: &str,
        req: SummaryRequest,
    ) -> AppResult<SummaryResponse>;
}
