//! User HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::backend::users::service;
use crate::shared::messaging::{ConversationId, User, UserPage, UserSearchParams};

/// GET /api/users/me
pub async fn handle_get_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// GET /api/users
pub async fn handle_get_users(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<User>>, BackendError> {
    Ok(Json(service::get_users(&state, &user).await?))
}

/// GET /api/users/search?search=&cursor=&page_size=
pub async fn handle_paged_users(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<UserSearchParams>,
) -> Result<Json<UserPage>, BackendError> {
    Ok(Json(service::paged_users(&state, &user, &params).await?))
}

/// GET /api/conversations/{id}/members
pub async fn handle_get_group_members(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<ConversationId>,
) -> Result<Json<Vec<User>>, BackendError> {
    Ok(Json(
        service::get_group_members(&state, &user, conversation_id).await?,
    ))
}
