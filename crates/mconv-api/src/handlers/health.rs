//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use mconv_media::{check_ffmpeg, check_ffprobe};
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    pub storage: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
        }
    }

    fn disabled() -> Self {
        Self {
            status: "disabled".to_string(),
            error: None,
        }
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

/// Readiness check endpoint. Remote storage is optional and never fails it.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let ffmpeg = check_ffmpeg()
        .map(|_| CheckStatus::ok())
        .unwrap_or_else(|e| CheckStatus::error(e.to_string()));
    let ffprobe = check_ffprobe()
        .map(|_| CheckStatus::ok())
        .unwrap_or_else(|e| CheckStatus::error(e.to_string()));
    let storage = if state.runner.has_uploader() {
        CheckStatus::ok()
    } else {
        CheckStatus::disabled()
    };

    let ready = !ffmpeg.is_error() && !ffprobe.is_error();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            checks: ReadinessChecks {
                ffmpeg,
                ffprobe,
                storage,
            },
        }),
    )
}
