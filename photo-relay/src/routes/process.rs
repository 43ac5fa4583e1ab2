use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart},
    response::{Html, IntoResponse, Response},
    Extension,
};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::instrument;

use super::upload;
use crate::{
    image::GeneratedImage,
    pages,
    relay::PhotoRelay,
    types::{AppError, Environment},
};

/// Enhances an uploaded photo and renders the result page
///
/// Failures render the error page with the matching status code
/// (400 for bad uploads, 502 when the image service fails).
#[instrument(skip_all)]
pub async fn handler(
    Extension(relay): Extension<Arc<PhotoRelay>>,
    Extension(environment): Extension<Environment>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    match process(&relay, multipart).await {
        Ok((image, name)) => {
            let expires_at = expiry(environment.result_ttl());
            tracing::info!(%name, expires_at = ?expires_at, "Result ready for download");
            Html(pages::result_page(&image, &name, expires_at)).into_response()
        }
        Err(err) => {
            err.log();
            (err.status(), Html(pages::failure_page(err.message()))).into_response()
        }
    }
}

async fn process(
    relay: &PhotoRelay,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(GeneratedImage, String), AppError> {
    let upload = upload::read_image(multipart).await?;
    Ok(relay.enhance_and_store(upload).await?)
}

fn expiry(ttl: std::time::Duration) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
}
