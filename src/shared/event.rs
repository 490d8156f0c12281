/**
 * Real-time Event System
 *
 * This module defines the events pushed to clients watching a conversation.
 * They replace the reactive query subscriptions a hosted document database
 * would give the frontend: whenever a message or the conversation itself
 * changes, an event is broadcast on that conversation's channel.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::messaging::{Conversation, ConversationId, Message, MessageId, UserId};

/// Type of real-time event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A message was sent
    MessageCreated,
    /// A message changed (tombstoned, read receipts)
    MessageUpdated,
    /// A message was removed for good
    MessageDeleted,
    /// Participants, admins, name or image changed
    ConversationUpdated,
    /// The conversation no longer exists
    ConversationDeleted,
    /// A participant went online or offline
    PresenceChanged,
}

impl EventType {
    /// Name used for the SSE `event:` field
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::MessageCreated => "message_created",
            EventType::MessageUpdated => "message_updated",
            EventType::MessageDeleted => "message_deleted",
            EventType::ConversationUpdated => "conversation_updated",
            EventType::ConversationDeleted => "conversation_deleted",
            EventType::PresenceChanged => "presence_changed",
        }
    }

    /// Parse a name from a `?types=` filter
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "message_created" => Some(EventType::MessageCreated),
            "message_updated" => Some(EventType::MessageUpdated),
            "message_deleted" => Some(EventType::MessageDeleted),
            "conversation_updated" => Some(EventType::ConversationUpdated),
            "conversation_deleted" => Some(EventType::ConversationDeleted),
            "presence_changed" => Some(EventType::PresenceChanged),
            _ => None,
        }
    }
}

/// Real-time event broadcast to the subscribers of one conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeEvent {
    /// Type of event
    pub event_type: EventType,
    /// Conversation the event belongs to
    pub conversation_id: ConversationId,
    /// Event payload (JSON-serializable data)
    pub payload: serde_json::Value,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
}

impl RealtimeEvent {
    /// Create a new real-time event
    pub fn new(
        event_type: EventType,
        conversation_id: ConversationId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            conversation_id,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Create a message event from a stored message
    pub fn message_created(message: &Message) -> Self {
        Self::new(
            EventType::MessageCreated,
            message.conversation_id,
            serde_json::to_value(message).unwrap_or_default(),
        )
    }

    pub fn message_updated(message: &Message) -> Self {
        Self::new(
            EventType::MessageUpdated,
            message.conversation_id,
            serde_json::to_value(message).unwrap_or_default(),
        )
    }

    pub fn message_deleted(conversation_id: ConversationId, message_id: MessageId) -> Self {
        Self::new(
            EventType::MessageDeleted,
            conversation_id,
            serde_json::json!({ "message_id": message_id }),
        )
    }

    pub fn conversation_updated(conversation: &Conversation) -> Self {
        Self::new(
            EventType::ConversationUpdated,
            conversation.id,
            serde_json::to_value(conversation).unwrap_or_default(),
        )
    }

    pub fn conversation_deleted(conversation_id: ConversationId) -> Self {
        Self::new(
            EventType::ConversationDeleted,
            conversation_id,
            serde_json::json!({ "conversation_id": conversation_id }),
        )
    }

    /// Whether this event takes `user_id` out of the conversation
    ///
    /// True for `conversation_deleted`, and for a `conversation_updated`
    /// whose participant list no longer contains the user. An update whose
    /// participants cannot be read counts as a removal.
    pub fn removes(&self, user_id: UserId) -> bool {
        match self.event_type {
            EventType::ConversationDeleted => true,
            EventType::ConversationUpdated => {
                match serde_json::from_value::<Vec<UserId>>(self.payload["participants"].clone()) {
                    Ok(participants) => !participants.contains(&user_id),
                    Err(_) => true,
                }
            }
            _ => false,
        }
    }

    pub fn presence_changed(conversation_id: ConversationId, user_id: UserId, is_online: bool) -> Self {
        Self::new(
            EventType::PresenceChanged,
            conversation_id,
            serde_json::json!({
                "user_id": user_id,
                "is_online": is_online,
            }),
        )
    }
}
