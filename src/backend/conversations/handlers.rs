//! Conversation HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::conversations::service;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::messaging::{
    AddParticipantsRequest, Conversation, ConversationId, GroupInfo, ListConversationsResponse,
    UpdateAdminsRequest, UpdateGroupInfoRequest, UpsertConversationRequest, UserId,
};

/// POST /api/conversations
///
/// 201 when a conversation was created, 200 when an existing one was found.
pub async fn handle_upsert_conversation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpsertConversationRequest>,
) -> Result<Response, BackendError> {
    let response = service::upsert_conversation(&state, &user, request).await?;
    let status = if response.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)).into_response())
}

/// GET /api/conversations
pub async fn handle_get_my_conversations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ListConversationsResponse>, BackendError> {
    let conversations = service::get_my_conversations(&state, &user).await?;
    Ok(Json(ListConversationsResponse { conversations }))
}

/// DELETE /api/conversations/{id}
pub async fn handle_delete_conversation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<ConversationId>,
) -> Result<StatusCode, BackendError> {
    service::delete_conversation(&state, &user, conversation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/conversations/{id}/participants
pub async fn handle_add_participants(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<ConversationId>,
    Json(request): Json<AddParticipantsRequest>,
) -> Result<Json<Conversation>, BackendError> {
    Ok(Json(
        service::add_participants(&state, &user, conversation_id, request).await?,
    ))
}

/// DELETE /api/conversations/{id}/participants/{user_id}
///
/// 204 when the group was removed together with its last member.
pub async fn handle_kick_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((conversation_id, user_id)): Path<(ConversationId, UserId)>,
) -> Result<Response, BackendError> {
    match service::kick_user(&state, &user, conversation_id, user_id).await? {
        Some(conversation) => Ok(Json(conversation).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// PUT /api/conversations/{id}/admins
pub async fn handle_update_admins(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<ConversationId>,
    Json(request): Json<UpdateAdminsRequest>,
) -> Result<Json<Conversation>, BackendError> {
    Ok(Json(
        service::update_admins(&state, &user, conversation_id, request).await?,
    ))
}

/// PATCH /api/conversations/{id}/group
pub async fn handle_update_group_info(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<ConversationId>,
    Json(request): Json<UpdateGroupInfoRequest>,
) -> Result<Json<GroupInfo>, BackendError> {
    Ok(Json(
        service::update_group_info(&state, &user, conversation_id, request).await?,
    ))
}
