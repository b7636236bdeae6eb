use crate::services::{extractor::ExtractorError, media_service::MediaError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// A lightweight wrapper for errors that reach the HTTP boundary.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Underlying diagnostic (tool stderr, backend message), if any.
    pub details: Option<String>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            details: None,
        }
    }

    /// Shortcut for a 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        if !matches!(err, MediaError::MissingSourceUrl) {
            error!(error = %err, "media request failed");
        }
        match err {
            MediaError::MissingSourceUrl => AppError::bad_request("Instagram URL missing"),
            MediaError::Resolve(inner) => {
                AppError::internal("Failed to extract video URL").with_details(inner.diagnostic())
            }
            MediaError::Download(ExtractorError::FileMissing { .. }) => {
                AppError::internal("Video file not found after download")
            }
            MediaError::Download(inner) => {
                AppError::internal("Failed to download video").with_details(inner.diagnostic())
            }
            MediaError::Staging(inner) => {
                AppError::internal("Internal server error").with_details(inner.to_string())
            }
            MediaError::Upload(inner) => AppError::internal("Failed to upload to Cloudflare R2")
                .with_details(inner.message()),
            MediaError::Link(inner) => AppError::internal("Failed to generate presigned URL")
                .with_details(inner.message()),
            MediaError::Delete(inner) => {
                AppError::internal("Failed to delete file from Cloudflare R2")
                    .with_details(inner.message())
            }
        }
    }
}
