//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mconv_models::{FailureKind, JobFailure, Operation, ParameterError};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Summary for remote upload failures.
pub const UPLOAD_FAILURE_SUMMARY: &str = "Upload to remote storage failed";

const REDACTED_DETAILS: &str = "An internal error occurred";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{summary}: {diagnostic}")]
    TranscodeFailure {
        summary: &'static str,
        diagnostic: String,
    },

    #[error("Upload to remote storage failed: {diagnostic}")]
    UploadFailure {
        diagnostic: String,
        /// The local output survives an upload failure
        local_url: Option<String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map a failed job outcome to the response it produces.
    pub fn from_failure(operation: Operation, failure: JobFailure) -> Self {
        match failure.kind {
            FailureKind::Transcode => Self::TranscodeFailure {
                summary: operation.failure_summary(),
                diagnostic: failure.diagnostic,
            },
            FailureKind::Upload => Self::UploadFailure {
                diagnostic: failure.diagnostic,
                local_url: failure.outputs.first().map(|o| o.url.clone()),
            },
        }
    }

    /// Map a multipart read error; body-limit overruns become 413.
    pub fn from_multipart(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(err.body_text())
        }
    }

    /// Hide internal error details when running in production.
    pub fn redact(self, production: bool) -> Self {
        match self {
            ApiError::Internal(_) if production => {
                ApiError::Internal(REDACTED_DETAILS.to_string())
            }
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Parameter(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::TranscodeFailure { .. }
            | ApiError::UploadFailure { .. }
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short text for the `error` field.
    fn summary(&self) -> String {
        match self {
            ApiError::Parameter(e) => e.summary(),
            ApiError::PayloadTooLarge(_) => "File too large".to_string(),
            ApiError::BadRequest(_) => "Invalid request".to_string(),
            ApiError::TranscodeFailure { summary, .. } => summary.to_string(),
            ApiError::UploadFailure { .. } => UPLOAD_FAILURE_SUMMARY.to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Longer text for the `details` field.
    fn details(&self) -> String {
        match self {
            ApiError::Parameter(e) => e.to_string(),
            ApiError::PayloadTooLarge(msg) | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::TranscodeFailure { diagnostic, .. }
            | ApiError::UploadFailure { diagnostic, .. } => diagnostic.clone(),
            ApiError::Internal(msg) => msg.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_url: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.summary(),
            details: self.details(),
            local_url: match self {
                ApiError::UploadFailure { local_url, .. } => local_url,
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mconv_models::OutputFile;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_parameter_errors_are_bad_requests() {
        let (status, body) = body_json(ParameterError::Missing("duration").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required parameter: duration");

        let (status, body) = body_json(
            ParameterError::Invalid {
                name: "resolution",
                value: "999p".to_string(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid resolution");
        assert_eq!(body["details"], "Invalid resolution: 999p");
    }

    #[tokio::test]
    async fn test_transcode_failure_carries_diagnostic() {
        let failure = JobFailure {
            kind: FailureKind::Transcode,
            diagnostic: "FFmpeg exited with status 1: Invalid data found".to_string(),
            cause: String::new(),
            outputs: Vec::new(),
        };
        let (status, body) =
            body_json(ApiError::from_failure(Operation::Trim, failure)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Video trimming failed");
        assert!(body["details"].as_str().unwrap().contains("Invalid data"));
        assert!(body.get("localUrl").is_none());
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_local_url() {
        let failure = JobFailure {
            kind: FailureKind::Upload,
            diagnostic: "bucket unreachable".to_string(),
            cause: String::new(),
            outputs: vec![OutputFile {
                path: "outputs/video-1-2-converted.mp4".into(),
                url: "/outputs/video-1-2-converted.mp4".to_string(),
            }],
        };
        let (status, body) =
            body_json(ApiError::from_failure(Operation::TranscodeVideo, failure)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], UPLOAD_FAILURE_SUMMARY);
        assert_eq!(body["localUrl"], "/outputs/video-1-2-converted.mp4");
    }

    #[tokio::test]
    async fn test_internal_details_hidden_in_production() {
        let err = || ApiError::internal("Failed to store upload: disk full");

        let (status, body) = body_json(err().redact(true)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["details"], REDACTED_DETAILS);

        let (_, body) = body_json(err().redact(false)).await;
        assert_eq!(body["details"], "Failed to store upload: disk full");
    }

    #[tokio::test]
    async fn test_redact_keeps_client_errors() {
        let (status, body) =
            body_json(ApiError::from(ParameterError::Missing("duration")).redact(true)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "Missing required parameter: duration");
    }
}
