/**
 * Router Configuration
 *
 * Combines the public and authenticated route tables into one router.
 *
 * # Layers
 *
 * - Authenticated routes run behind `auth_middleware`, which resolves the
 *   bearer token to a `User`
 * - Unknown paths fall back to a JSON 404
 */

use axum::{middleware, routing::get, Json, Router};

use crate::backend::error::BackendError;
use crate::backend::middleware::auth_middleware;
use crate::backend::routes::api_routes::{protected_routes, public_routes};
use crate::backend::server::state::AppState;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> BackendError {
    BackendError::not_found("Route not found")
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let protected = protected_routes().route_layer(middleware::from_fn_with_state(
        app_state.clone(),
        auth_middleware,
    ));

    Router::new()
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected)
        .fallback(not_found)
        .with_state(app_state)
}
