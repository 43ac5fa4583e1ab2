use std::sync::Arc;

use aide::openapi::OpenApi;
use axum::{extract::DefaultBodyLimit, Extension};
use datadog_tracing::axum::{shutdown_signal, OtelAxumLayer, OtelInResponseLayer};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::routes;
use crate::{relay::PhotoRelay, storage::TempStorage, types::Environment};

/// Multipart framing on top of the raw image bytes
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Request body cap for a given upload cap
const fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// Starts the server with the given environment and dependencies
///
/// `shutdown_token` is cancelled once the server has stopped accepting requests.
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    relay: Arc<PhotoRelay>,
    storage: Arc<TempStorage>,
    shutdown_token: CancellationToken,
) -> anyhow::Result<()> {
    let mut openapi = OpenApi::default();

    let router = routes::handler()
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(relay))
        .layer(Extension(storage))
        .layer(DefaultBodyLimit::max(body_limit(
            environment.max_upload_bytes(),
        )))
        // Include trace context as header into the response
        .layer(OtelInResponseLayer)
        // Start OpenTelemetry trace on incoming request
        .layer(OtelAxumLayer::default())
        .layer(tower_http::timeout::TimeoutLayer::new(
            environment.request_timeout(),
        ));

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(8001), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Photo Relay started on http://{addr} ({environment})");

    let result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from);

    shutdown_token.cancel();
    result
}
