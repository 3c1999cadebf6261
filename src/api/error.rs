//! Error handling

use crate::models::inference::AnalysisError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Input errors
    Validation(String),
    BadRequest(String),

    // Auth errors
    Unauthorized,

    // Analysis errors
    Timeout { request_id: String },
    Internal {
        message: String,
        request_id: Option<String>,
    },
}

impl AppError {
    fn request_id(&self) -> Option<&str> {
        match self {
            AppError::Timeout { request_id } => Some(request_id),
            AppError::Internal { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid or missing API key"),
            AppError::Timeout { request_id } => {
                tracing::error!(request_id = %request_id, "Analysis timed out");
                (StatusCode::GATEWAY_TIMEOUT, "Analysis timed out")
            }
            AppError::Internal { message, request_id } => {
                tracing::error!(
                    request_id = request_id.as_deref().unwrap_or("unknown"),
                    "Internal error: {}",
                    message
                );
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let mut body = json!({
            "error": error_message,
            "status": status.as_u16()
        });
        if let Some(request_id) = self.request_id() {
            body["request_id"] = json!(request_id);
        }

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => AppError::Validation(err.body_text()),
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::Internal {
            request_id: Some(err.request_id().to_string()),
            message: err.to_string(),
        }
    }
}
