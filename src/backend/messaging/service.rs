//! Message fan-out
//!
//! Sending validates the caller against the conversation, resolves media to
//! URLs, snapshots the quoted message, stores the row and fans it out to the
//! conversation channel and to the receivers' push subscriptions.

use chrono::Utc;
use uuid::Uuid;

use crate::backend::conversations::load_for_participant;
use crate::backend::error::BackendError;
use crate::backend::messaging::db as message_db;
use crate::backend::messaging::reply::{build_reply, SnapshotCache};
use crate::backend::push::service as push;
use crate::backend::server::state::AppState;
use crate::backend::storage::handlers::FILE_IN_USE;
use crate::backend::storage::{attach_blob, discard_blob};
use crate::shared::messaging::{
    Conversation, ConversationId, Message, MessageId, MessagePayload, MessageView,
    SendMessageRequest, StorageId, User,
};
use crate::shared::RealtimeEvent;

pub const MESSAGE_NOT_FOUND: &str = "Message not found";
pub const INVALID_SENDER: &str = "Invalid sender provided";

/// Turn a send request into a payload plus the blob it references
async fn build_payload(
    state: &AppState,
    caller: &User,
    request: &SendMessageRequest,
) -> Result<(MessagePayload, Option<StorageId>), BackendError> {
    let (storage_id, payload) = match request {
        SendMessageRequest::Text { content, .. } => {
            if content.trim().is_empty() {
                return Err(BackendError::validation("Message content cannot be empty"));
            }
            return Ok((MessagePayload::text(content.clone()), None));
        }
        SendMessageRequest::Image {
            storage_id, caption, ..
        } => (
            *storage_id,
            MessagePayload::Image {
                url: attach_blob(state, *storage_id, caller).await?,
                caption: caption.clone(),
            },
        ),
        SendMessageRequest::Video {
            storage_id,
            caption,
            gif_playback,
            ..
        } => (
            *storage_id,
            MessagePayload::Video {
                url: attach_blob(state, *storage_id, caller).await?,
                caption: caption.clone(),
                gif_playback: gif_playback.unwrap_or(false),
            },
        ),
        SendMessageRequest::Audio { storage_id, .. } => (
            *storage_id,
            MessagePayload::Audio {
                url: attach_blob(state, *storage_id, caller).await?,
            },
        ),
        SendMessageRequest::Document {
            storage_id,
            mimetype,
            title,
            length,
            caption,
            file_name,
            page_count,
            ..
        } => {
            if title.trim().is_empty() {
                return Err(BackendError::validation("Document title cannot be empty"));
            }
            (
                *storage_id,
                MessagePayload::Document {
                    url: attach_blob(state, *storage_id, caller).await?,
                    mimetype: mimetype.clone(),
                    length: *length,
                    title: title.clone(),
                    caption: caption.clone(),
                    file_name: file_name.clone(),
                    page_count: *page_count,
                    jpeg_thumbnail: None,
                },
            )
        }
    };
    Ok((payload, Some(storage_id)))
}

/// Send a message of any kind
pub async fn send_message(
    state: &AppState,
    caller: &User,
    conversation_id: ConversationId,
    request: SendMessageRequest,
) -> Result<Message, BackendError> {
    let conversation = load_for_participant(state, conversation_id, caller).await?;
    if request.sender() != caller.id {
        return Err(BackendError::forbidden(INVALID_SENDER));
    }

    let (payload, storage_id) = build_payload(state, caller, &request).await?;

    let mut cache = SnapshotCache::new();
    let reply = match request.reply_to() {
        Some(reply_to) => {
            build_reply(&state.pool, &mut cache, conversation.id, reply_to.message_id).await?
        }
        None => None,
    };

    let message = Message {
        id: Uuid::new_v4(),
        conversation_id: conversation.id,
        sender: caller.id,
        payload,
        storage_id,
        receivers: conversation.receivers_for(caller.id),
        readers: vec![caller.id],
        reply,
        created_at: Utc::now(),
    };

    message_db::insert_message(&state.pool, &message)
        .await
        .map_err(|e| BackendError::unique_conflict(e, FILE_IN_USE))?;
    state.broadcast.publish(RealtimeEvent::message_created(&message));
    push::spawn_message_notifications(state, &conversation, &message, caller);

    tracing::info!(
        message_id = %message.id,
        conversation_id = %conversation.id,
        message_type = %message.message_type(),
        receivers = message.receivers.len(),
        "[Messaging] message sent"
    );
    Ok(message)
}

/// Messages of a conversation, oldest first, with resolved senders
pub async fn get_messages(
    state: &AppState,
    caller: &User,
    conversation_id: ConversationId,
) -> Result<Vec<MessageView>, BackendError> {
    let conversation = load_for_participant(state, conversation_id, caller).await?;
    let messages = message_db::messages_for_conversation(&state.pool, conversation.id).await?;

    let mut cache = SnapshotCache::new();
    let senders: Vec<_> = messages.iter().map(|m| m.sender).collect();
    cache.prime(&state.pool, &senders).await?;

    let mut views = Vec::with_capacity(messages.len());
    for message in messages {
        let sender = cache.get(&state.pool, message.sender).await?;
        views.push(MessageView::new(message, sender));
    }
    Ok(views)
}

/// Load a message together with its conversation, checking membership
async fn load_message(
    state: &AppState,
    caller: &User,
    message_id: MessageId,
) -> Result<(Message, Conversation), BackendError> {
    let message = message_db::get_message(&state.pool, message_id)
        .await?
        .ok_or_else(|| BackendError::not_found(MESSAGE_NOT_FOUND))?;
    let conversation = load_for_participant(state, message.conversation_id, caller).await?;
    Ok((message, conversation))
}

fn can_remove(conversation: &Conversation, message: &Message, caller: &User) -> bool {
    message.sender == caller.id || (conversation.is_group && conversation.is_admin(caller.id))
}

/// Record that the caller read a message
pub async fn mark_read(
    state: &AppState,
    caller: &User,
    message_id: MessageId,
) -> Result<Message, BackendError> {
    let (message, _) = load_message(state, caller, message_id).await?;
    if message.is_read_by(caller.id) {
        return Ok(message);
    }
    if !message_db::add_reader(&state.pool, message.id, caller.id).await? {
        return Ok(message);
    }

    // Re-read so concurrent readers are all reflected
    let message = message_db::get_message(&state.pool, message.id)
        .await?
        .ok_or_else(|| BackendError::not_found(MESSAGE_NOT_FOUND))?;
    state.broadcast.publish(RealtimeEvent::message_updated(&message));
    Ok(message)
}

/// Replace a message with the deleted placeholder
pub async fn delete_message(
    state: &AppState,
    caller: &User,
    message_id: MessageId,
) -> Result<Message, BackendError> {
    let (mut message, conversation) = load_message(state, caller, message_id).await?;
    if !can_remove(&conversation, &message, caller) {
        return Err(BackendError::forbidden("You can only delete your own messages"));
    }

    let storage_id = message.tombstone();
    message_db::write_tombstone(&state.pool, &message).await?;
    if let Some(storage_id) = storage_id {
        discard_blob(state, storage_id).await;
    }
    state.broadcast.publish(RealtimeEvent::message_updated(&message));
    tracing::info!(message_id = %message.id, "[Messaging] message deleted");
    Ok(message)
}

/// Remove a message entirely
pub async fn destroy_message(
    state: &AppState,
    caller: &User,
    message_id: MessageId,
) -> Result<(), BackendError> {
    let (message, conversation) = load_message(state, caller, message_id).await?;
    if !can_remove(&conversation, &message, caller) {
        return Err(BackendError::forbidden("You can only delete your own messages"));
    }

    message_db::delete_message(&state.pool, message.id).await?;
    if let Some(storage_id) = message.storage_id {
        discard_blob(state, storage_id).await;
    }
    state
        .broadcast
        .publish(RealtimeEvent::message_deleted(message.conversation_id, message.id));
    tracing::info!(message_id = %message.id, "[Messaging] message destroyed");
    Ok(())
}
