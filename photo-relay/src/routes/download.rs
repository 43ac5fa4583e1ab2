use std::sync::Arc;

use axum::{
    body::Body,
    extract::Path,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use tracing::instrument;

use crate::{storage::TempStorage, types::AppError};

/// Streams a stored result as an attachment, then deletes it
///
/// # Errors
///
/// - `invalid_filename` (400) for names that were never handed out
/// - `not_found` (404) once the result was downloaded or expired
#[instrument(skip(storage))]
pub async fn handler(
    Extension(storage): Extension<Arc<TempStorage>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let download = storage.open_result(&filename).await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        download.name()
    ))
    .map_err(|e| {
        tracing::error!("Invalid content disposition for {filename}: {e}");
        AppError::new(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
            false,
        )
    })?;
    let content_type = HeaderValue::from_static(download.format().mime_type());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        Body::from_stream(download.into_stream()),
    )
        .into_response())
}
