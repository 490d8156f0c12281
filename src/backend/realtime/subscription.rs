/**
 * Conversation Event Stream
 *
 * `GET /api/conversations/{id}/events` streams the events of one
 * conversation as Server-Sent Events. Only participants may subscribe.
 *
 * # Event Filtering
 *
 * Clients can filter events by type using the `types` query parameter:
 * - `?types=message_created,message_updated` - only message changes
 * - `?types=presence_changed` - only presence
 * - No parameter - every event type
 *
 * # Connection Management
 *
 * - Connections are kept alive using the SSE keep-alive mechanism
 * - The stream ends after a `conversation_deleted` event, and for a member
 *   who is removed, after the `conversation_updated` that drops them
 * - Lagged receivers skip ahead once the database confirms they are still a
 *   participant
 */

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::backend::conversations::db as conversation_db;
use crate::backend::conversations::load_for_participant;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::messaging::{ConversationId, UserId};
use crate::shared::{EventType, RealtimeEvent};

/// Parse the `types` query parameter
///
/// Unknown names are ignored; an empty result means "no filter".
pub fn parse_type_filter(query: &HashMap<String, String>) -> Option<Vec<EventType>> {
    query
        .get("types")
        .map(|types| types.split(',').filter_map(EventType::parse).collect::<Vec<_>>())
        .filter(|types| !types.is_empty())
}

async fn still_participant(state: &AppState, conversation_id: ConversationId, user_id: UserId) -> bool {
    match conversation_db::get_conversation(&state.pool, conversation_id).await {
        Ok(Some(conversation)) => conversation.has_participant(user_id),
        Ok(None) => false,
        Err(e) => {
            tracing::error!(conversation = %conversation_id, "[Realtime] membership check failed: {}", e);
            false
        }
    }
}

/// Events of one conversation as delivered to `user_id`
///
/// `rx` must be subscribed before membership was checked, so that a removal
/// racing with the check is still observed.
pub fn conversation_events(
    state: AppState,
    conversation_id: ConversationId,
    user_id: UserId,
    rx: broadcast::Receiver<RealtimeEvent>,
    filter: Option<Vec<EventType>>,
) -> impl Stream<Item = RealtimeEvent> {
    stream::unfold(Some(rx), move |rx| {
        let state = state.clone();
        let filter = filter.clone();
        async move {
            let mut rx = rx?;
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let closing = event.removes(user_id);
                        if closing {
                            tracing::info!(
                                conversation = %conversation_id,
                                user = %user_id,
                                "[Realtime] subscriber left the conversation, closing stream"
                            );
                        }
                        let wanted = filter
                            .as_ref()
                            .map_or(true, |types| types.contains(&event.event_type));
                        if wanted {
                            return Some((event, (!closing).then_some(rx)));
                        }
                        if closing {
                            return None;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[Realtime] receiver lagged, skipped {} events", skipped);
                        if !still_participant(&state, conversation_id, user_id).await {
                            return None;
                        }
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    })
}

/// Handle a conversation subscription
pub async fn handle_conversation_events(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<ConversationId>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, BackendError> {
    let rx = state.broadcast.subscribe(conversation_id);
    load_for_participant(&state, conversation_id, &user).await?;

    let filter = parse_type_filter(&query);
    tracing::info!(
        conversation = %conversation_id,
        user = %user.id,
        filter = ?filter,
        "[Realtime] subscription opened"
    );

    // Keep-alive comments are injected by axum, so only real events are yielded.
    let stream = conversation_events(state, conversation_id, user.id, rx, filter).filter_map(
        |event| async move {
            match serde_json::to_string(&event) {
                Ok(data) => Some(Ok::<_, axum::Error>(
                    Event::default().event(event.event_type.as_str()).data(data),
                )),
                Err(e) => {
                    tracing::error!("[Realtime] failed to serialize event: {:?}", e);
                    None
                }
            }
        },
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
