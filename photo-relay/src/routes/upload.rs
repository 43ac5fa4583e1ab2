//! Multipart upload extraction shared by the relay endpoints

use axum::{
    extract::{multipart::MultipartRejection, Multipart},
    http::StatusCode,
};

use crate::{image::UploadedImage, types::AppError};

/// Form field carrying the photo
pub const IMAGE_FIELD: &str = "image";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Reads the `image` field of a multipart form
///
/// Other fields are skipped. Only the first `image` field is used.
///
/// # Errors
///
/// - `invalid_multipart` if the body is not a readable multipart form
/// - `image_too_large` if the body exceeds the upload limit
/// - `missing_image` if no `image` field is present
pub async fn read_image(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedImage, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Multipart rejected: {rejection}");
        invalid_multipart()
    })?;

    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let mime_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(ToString::to_string);
        let data = field.bytes().await.map_err(field_error)?;

        return Ok(UploadedImage {
            data: data.to_vec(),
            mime_type,
            file_name,
        });
    }

    Err(AppError::new(
        StatusCode::BAD_REQUEST,
        "missing_image",
        "No image uploaded",
        false,
    ))
}

fn field_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "image_too_large",
            "Uploaded image is too large",
            false,
        );
    }

    tracing::debug!("Failed to read multipart field: {err}");
    invalid_multipart()
}

const fn invalid_multipart() -> AppError {
    AppError::new(
        StatusCode::BAD_REQUEST,
        "invalid_multipart",
        "Request must be a multipart form with an image field",
        false,
    )
}
