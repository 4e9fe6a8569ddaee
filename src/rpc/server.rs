//! HTTP front of the attendance server: `POST /rpc/<name>` with JSON bodies.

use super::local::LocalAttendanceApi;
use super::{ACTOR_HEADER, AttendanceApi};
use crate::errors::AppError;
use crate::models::attendance::{
    CheckInRequest, CheckInResponse, CheckOutRequest, CheckOutResponse, ForceAllRequest,
    ForceAllResponse, ForceCheckOutRequest, ForceCheckOutResponse, SummaryRequest, SummaryResponse,
};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// `AppError` on the HTTP boundary.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        ApiError(e)
    }
}

pub fn status_for(e: &AppError) -> StatusCode {
    if matches!(e, AppError::Unauthenticated) {
        StatusCode::UNAUTHORIZED
    } else if e.is_validation() {
        StatusCode::BAD_REQUEST
    } else if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }
        let body = ErrorBody {
            success: false,
            error: self.0.to_string(),
            code: Some(self.0.code().to_string()),
            detail: Some(self.0.detail()),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn actor_from(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ApiError(AppError::Unauthenticated))
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn check_in(
    State(api): State<LocalAttendanceApi>,
    Json(req): Json<CheckInRequest>,
) -> ApiResult<CheckInResponse> {
    Ok(Json(api.check_in(req).await?))
}

async fn check_out(
    State(api): State<LocalAttendanceApi>,
    Json(req): Json<CheckOutRequest>,
) -> ApiResult<CheckOutResponse> {
    Ok(Json(api.check_out(req).await?))
}

async fn force_check_out(
    State(api): State<LocalAttendanceApi>,
    headers: HeaderMap,
    Json(req): Json<ForceCheckOutRequest>,
) -> ApiResult<ForceCheckOutResponse> {
    let actor = actor_from(&headers)?;
    Ok(Json(api.force_check_out(&actor, req).await?))
}

async fn force_all_check_out(
    State(api): State<LocalAttendanceApi>,
    headers: HeaderMap,
    Json(req): Json<ForceAllRequest>,
) -> ApiResult<ForceAllResponse> {
    let actor = actor_from(&headers)?;
    Ok(Json(api.force_all_check_out(&actor, req).await?))
}

async fn daily_review_summary(
    State(api): State<LocalAttendanceApi>,
    headers: HeaderMap,
    Json(req): Json<SummaryRequest>,
) -> ApiResult<SummaryResponse> {
    let actor = actor_from(&headers)?;
    Ok(Json(api.get_daily_review_summary(&actor, req).await?))
}

pub fn router(api: LocalAttendanceApi) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/rpc/checkIn", post(check_in))
        .route("/rpc/checkOut", post(check_out))
        .route("/rpc/forceCheckOut", post(force_check_out))
        .route("/rpc/forceAllCheckOut", post(force_all_check_out))
        .route("/rpc/getDailyReviewSummary", post(daily_review_summary))
        .layer(TraceLayer::new_for_http())
        .with_state(api)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    api: LocalAttendanceApi,
    shutdown: F,
) -> crate::errors::AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "attendance server listening");

    axum::serve(listener, router(api))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("attendance server stopped");
    Ok(())
}
