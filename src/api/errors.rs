use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::{
    aggregation::ParseTimeframeError,
    gateway::{models::ParseSensorError, GatewayError},
};

/// Failures that originate in the HTTP layer itself.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("dashboard has not been compiled yet")]
    DashboardNotReady,

    #[error("invalid date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(e) = self.0.downcast_ref::<GatewayError>() {
            return match e {
                GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
                GatewayError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
                GatewayError::RequestFailed { .. }
                | GatewayError::Transport { .. }
                | GatewayError::Decode { .. } => StatusCode::BAD_GATEWAY,
            };
        }
        if let Some(e) = self.0.downcast_ref::<ApiError>() {
            return match e {
                ApiError::DashboardNotReady => StatusCode::SERVICE_UNAVAILABLE,
                ApiError::InvalidDate(_) => StatusCode::BAD_REQUEST,
            };
        }
        if self.0.is::<ParseSensorError>() || self.0.is::<ParseTimeframeError>() {
            return StatusCode::BAD_REQUEST;
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %format!("{:#}", self.0), "Request failed");
        }

        let body = match self.0.downcast_ref::<GatewayError>().and_then(GatewayError::status) {
            Some(backend) => json!({ "error": self.0.to_string(), "backendStatus": backend.as_u16() }),
            None => json!({ "error": self.0.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}
