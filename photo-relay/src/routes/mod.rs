mod docs;
mod download;
mod enhance;
mod health;
mod index;
mod process;
pub(crate) mod upload;

use aide::axum::{routing::get, ApiRouter};
use axum::routing::{get as html_get, post};

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .route("/", html_get(index::handler))
        .route("/process", post(process::handler))
        .route("/api/enhance-photo", post(enhance::handler))
        .route("/download/{filename}", html_get(download::handler))
}
