//! Messaging HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::backend::error::BackendError;
use crate::backend::messaging::service;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::messaging::{
    ConversationId, ListMessagesResponse, Message, MessageId, SendMessageRequest,
    SendMessageResponse,
};

/// GET /api/conversations/{id}/messages
pub async fn handle_get_messages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<ConversationId>,
) -> Result<Json<ListMessagesResponse>, BackendError> {
    let messages = service::get_messages(&state, &user, conversation_id).await?;
    Ok(Json(ListMessagesResponse { messages }))
}

/// POST /api/conversations/{id}/messages
pub async fn handle_send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<ConversationId>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<SendMessageResponse>), BackendError> {
    let message = service::send_message(&state, &user, conversation_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            message_id: message.id,
        }),
    ))
}

/// PATCH /api/messages/{id}/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<MessageId>,
) -> Result<Json<Message>, BackendError> {
    Ok(Json(service::mark_read(&state, &user, message_id).await?))
}

/// DELETE /api/messages/{id}
pub async fn handle_delete_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<MessageId>,
) -> Result<Json<Message>, BackendError> {
    Ok(Json(service::delete_message(&state, &user, message_id).await?))
}

/// DELETE /api/messages/{id}/destroy
pub async fn handle_destroy_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<MessageId>,
) -> Result<StatusCode, BackendError> {
    service::destroy_message(&state, &user, message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
