use axum::{response::Html, Extension};

use crate::{pages, types::Environment};

/// Serves the upload form
#[allow(clippy::unused_async)]
pub async fn handler(Extension(environment): Extension<Environment>) -> Html<String> {
    Html(pages::upload_form(environment.max_upload_bytes()))
}
