use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use tracing::instrument;

use super::upload;
use crate::{relay::PhotoRelay, types::AppError};

/// Enhances an uploaded photo and returns the generated image bytes
///
/// # Errors
///
/// Returns a JSON error envelope for bad uploads (400), blocked content (422)
/// and image service failures (502)
#[instrument(skip_all)]
pub async fn handler(
    Extension(relay): Extension<Arc<PhotoRelay>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let upload = upload::read_image(multipart).await?;
    let image = relay.enhance(upload).await?;

    let content_type = HeaderValue::from_str(&image.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        image.data,
    )
        .into_response())
}
