//! HTTP client for the attendance server.

use super::server::ErrorBody;
use super::{ACTOR_HEADER, AttendanceApi};
use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::models::attendance::{
    CheckInRequest, CheckInResponse, CheckOutRequest, CheckOutResponse, ForceAllRequest,
    ForceAllResponse, ForceCheckOutRequest, ForceCheckOutResponse, SummaryRequest, SummaryResponse,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub struct HttpAttendanceApi {
    base_url: String,
    http: Client,
}

/// Map a failed response back onto the server's error classes. The body's
/// `code` wins; the status is the fallback for bodies without one.
fn error_for_status(status: StatusCode, body: Option<ErrorBody>) -> AppError {
    let message = match body {
        Some(ErrorBody {
            code: Some(code),
            detail,
            error,
            ..
        }) => {
            if let Some(err) = AppError::from_code(&code, detail.unwrap_or_else(|| error.clone())) {
                return err;
            }
            error
        }
        Some(body) => body.error,
        None => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthenticated,
        StatusCode::BAD_REQUEST => AppError::InvalidPayload(message),
        s if s.is_server_error() => AppError::Transport(format!("server error {}: {}", s, message)),
        s => AppError::Remote(format!("{}: {}", s, message)),
    }
}

impl HttpAttendanceApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(cfg: &ServerConfig) -> AppResult<Self> {
        Self::new(cfg.endpoint.clone(), Duration::from_secs(cfg.timeout_secs))
    }

    async fn call<B, T>(&self, name: &str, actor: Option<&str>, body: &B) -> AppResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/rpc/{}", self.base_url, name);
        let mut request = self.http.post(&url).json(body);
        if let Some(actor) = actor {
            request = request.header(ACTOR_HEADER, actor);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| AppError::Transport(format!("invalid response body: {}", e)));
        }

        let body = response.json::<ErrorBody>().await.ok();
        let err = error_for_status(status, body);
        tracing::debug!(name, %status, error = %err, "rpc call failed");
        Err(err)
    }

    pub async fn health(&self) -> AppResult<serde_json::Value> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))
    }
}

#[async_trait]
impl AttendanceApi for HttpAttendanceApi {
    async fn check_in(&self, req: CheckInRequest) -> AppResult<CheckInResponse> {
        self.call("checkIn", None, &req).await
    }

    async fn check_out(&self, req: CheckOutRequest) -> AppResult<CheckOutResponse> {
        self.call("checkOut", None, &req).await
    }

    async fn force_check_out(
        &self,
        actor: &str,
        req: ForceCheckOutRequest,
    ) -> AppResult<ForceCheckOutResponse> {
        self.call("forceCheckOut", Some(actor), &req).await
    }

    async fn force_all_check_out(
        &self,
        actor: &str,
        req: ForceAllRequest,
    ) -> AppResult<ForceAllResponse> {
        self.call("forceAllCheckOut", Some(actor), &req).await
    }

    async fn get_daily_review_summary(
        &self,
        actor: &str,
        req: SummaryRequest,
    ) -> AppResult<SummaryResponse> {
        self.call("getDailyReviewSummary", Some(actor), &req).await
    }
}
