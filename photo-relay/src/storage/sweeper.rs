use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::TempStorage;

/// Periodically removes expired results until the token is cancelled
pub async fn run_sweeper(
    storage: Arc<TempStorage>,
    ttl: Duration,
    interval: Duration,
    shutdown_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = interval.as_secs(),
        "Result sweeper started"
    );

    loop {
        tokio::select! {
            () = shutdown_token.cancelled() => break,
            _ = ticker.tick() => {
                match storage.sweep_expired(ttl).await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "Swept expired temp files"),
                    Err(e) => error!("Failed to sweep expired temp files: {e}"),
                }
            }
        }
    }

    info!("Result sweeper stopped");
}
