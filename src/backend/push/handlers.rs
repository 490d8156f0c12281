//! Push subscription HTTP handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::push::service;
use crate::backend::server::state::AppState;
use crate::shared::messaging::{RemoveSubscriptionRequest, SaveSubscriptionRequest};

/// POST /api/push/subscriptions
pub async fn handle_save_subscription(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<SaveSubscriptionRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), BackendError> {
    let id = service::save_subscription(&state, &user, &request.subscription).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// DELETE /api/push/subscriptions
pub async fn handle_remove_subscription(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<RemoveSubscriptionRequest>,
) -> Result<StatusCode, BackendError> {
    service::remove_subscription(&state, &user, &request.endpoint).await?;
    Ok(StatusCode::NO_CONTENT)
}
