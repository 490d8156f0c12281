/**
 * Server Initialization
 *
 * # Initialization Process
 *
 * 1. Open the database and run migrations (`build_state`)
 * 2. Create the blob store, token verifier and push gateway
 * 3. Start background tasks: retention sweep and channel cleanup
 *    (`spawn_background_tasks`)
 * 4. Create the router with tracing (`create_app`)
 */

use std::time::Duration;

use axum::Router;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::backend::error::BackendError;
use crate::backend::retention;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::load_database;
use crate::backend::server::state::AppState;
use crate::shared::AppConfig;

/// How often idle conversation channels are pruned
const CHANNEL_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Open the database and assemble the application state
pub async fn build_state(config: AppConfig) -> Result<AppState, BackendError> {
    tracing::info!("Initializing wazap backend");
    let pool = load_database(&config.database_url).await?;
    tokio::fs::create_dir_all(&config.blob_dir)
        .await
        .map_err(|e| BackendError::storage(format!("cannot create blob directory: {}", e)))?;
    AppState::new(pool, config)
}

/// Create the Axum application for a prepared state
pub fn create_app(state: AppState) -> Router<()> {
    create_router(state).layer(TraceLayer::new_for_http())
}

/// Start the retention sweep and the broadcast channel cleanup
///
/// The handles are returned so callers can abort the tasks on shutdown.
pub fn spawn_background_tasks(state: &AppState) -> Vec<JoinHandle<()>> {
    let sweep_state = state.clone();
    let sweep = tokio::spawn(async move {
        retention::run_periodic(sweep_state).await;
    });

    let cleanup_state = state.broadcast.clone();
    let cleanup = tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHANNEL_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = cleanup_state.cleanup_inactive_channels();
            tracing::debug!("Cleaned up {} inactive conversation channels", removed);
        }
    });

    tracing::info!("Background tasks started");
    vec![sweep, cleanup]
}
