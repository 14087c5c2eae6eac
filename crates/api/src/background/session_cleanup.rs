//! Periodic cleanup of dead web sessions.
//!
//! Spawns a background task that deletes expired or revoked rows from
//! `web_sessions`. Session auth only ever reads live rows, so this is
//! purely about keeping the table from growing without bound. Runs on a
//! fixed interval using `tokio::time::interval`.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use nbrelay_db::repositories::SessionRepo;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the session cleanup loop until `cancel` is triggered.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Session cleanup job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match SessionRepo::cleanup_expired(&pool).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Session cleanup: purged dead sessions");
                        } else {
                            tracing::debug!("Session cleanup: no rows to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Session cleanup failed");
                    }
                }
            }
        }
    }
}
