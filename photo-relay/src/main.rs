use std::sync::Arc;

use photo_relay::{
    generation::GeminiClient,
    relay::PhotoRelay,
    server,
    storage::{run_sweeper, TempStorage},
    types::Environment,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // JSON logs for staging/production (Datadog), human-readable for development
    if environment.json_logs() {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        fmt().with_env_filter(EnvFilter::from_default_env()).init();
    }

    let generator = Arc::new(GeminiClient::new(
        &environment.gemini_api_base_url(),
        &environment.gemini_model(),
        environment.gemini_api_key(),
        environment.generation_timeout(),
    ));

    let work_dir = environment.work_dir();
    let storage = Arc::new(TempStorage::new(&work_dir)?);
    tracing::info!(work_dir = %work_dir.display(), "Temp storage ready");

    let relay = Arc::new(PhotoRelay::new(
        generator,
        storage.clone(),
        environment.enhance_prompt(),
    ));

    let shutdown_token = CancellationToken::new();
    let sweeper = tokio::spawn(run_sweeper(
        storage.clone(),
        environment.result_ttl(),
        environment.result_sweep_interval(),
        shutdown_token.clone(),
    ));

    let result = server::start(environment, relay, storage, shutdown_token.clone()).await;

    shutdown_token.cancel();
    if let Err(e) = sweeper.await {
        tracing::error!("Result sweeper task failed: {e}");
    }

    result
}
