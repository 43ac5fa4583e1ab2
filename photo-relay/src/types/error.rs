//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::generation::GenerationError;
use crate::relay::RelayError;
use crate::storage::StorageError;

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error message
    pub message: &'static str,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                allow_retry: retry,
                error: ErrorBody { code, message: msg },
            },
        }
    }

    /// HTTP status of this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.inner.error.code
    }

    /// Human-readable error message
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.inner.error.message
    }

    /// Logs the error at a level matching its status code
    pub fn log(&self) {
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert generation errors to application errors
impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        let retry = err.is_retryable();

        match &err {
            GenerationError::ContentBlocked(reason) => {
                tracing::warn!("Generation blocked: {reason}");
                Self::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "content_blocked",
                    "The photo could not be processed by the image service",
                    false,
                )
            }
            GenerationError::Api { status, message } => {
                tracing::error!("Image API returned {status}: {message}");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "generation_failed",
                    "Failed to process image",
                    retry,
                )
            }
            GenerationError::Network(_)
            | GenerationError::MissingImage
            | GenerationError::Decode(_)
            | GenerationError::Encode(_)
            | GenerationError::MalformedResponse(_) => {
                tracing::error!("Image generation failed: {err}");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "generation_failed",
                    "Failed to process image",
                    retry,
                )
            }
        }
    }
}

/// Convert storage errors to application errors
impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::InvalidName(name) => {
                tracing::debug!("Rejected file name: {name:?}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_filename",
                    "Invalid file name",
                    false,
                )
            }
            StorageError::NotFound(name) => {
                tracing::debug!("Result not found: {name}");
                Self::new(StatusCode::NOT_FOUND, "not_found", "File not found", false)
            }
            StorageError::UnsupportedFormat(mime_type) => {
                tracing::error!("Generated image has unsupported type {mime_type:?}");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "unsupported_format",
                    "The image service returned an unsupported format",
                    false,
                )
            }
            StorageError::Io(e) => {
                tracing::error!("Temp storage error: {e}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    true,
                )
            }
        }
    }
}

/// Convert relay errors to application errors
impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::EmptyImage => Self::new(
                StatusCode::BAD_REQUEST,
                "empty_image",
                "Uploaded image is empty",
                false,
            ),
            RelayError::NotAnImage(mime_type) => {
                tracing::debug!("Rejected upload with content type {mime_type:?}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_image",
                    "Uploaded file is not an image",
                    false,
                )
            }
            RelayError::Storage(e) => e.into(),
            RelayError::Generation(e) => e.into(),
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
