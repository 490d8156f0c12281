//! Messaging Module
//!
//! This module contains all the data structures for the messaging system:
//!
//! - `User` / `ParticipantSnapshot` - Chat users and their embedded snapshots
//! - `Conversation` - A 1:1 or group conversation
//! - `Message` - A message carrying exactly one typed payload
//! - `ReplySnapshot` - Inline copy of a quoted message
//! - `PushSubscription` - Browser push subscriptions
//!
//! # Usage
//!
//! ```rust
//! use wazap::shared::messaging::{Conversation, Message, MessagePayload};
//! ```

use uuid::Uuid;

pub mod conversation;
pub mod message;
pub mod push;
pub mod reply;
pub mod user;

/// Identifier of a user
pub type UserId = Uuid;
/// Identifier of a conversation
pub type ConversationId = Uuid;
/// Identifier of a message
pub type MessageId = Uuid;
/// Identifier of a stored blob
pub type StorageId = Uuid;

// Re-export all types
pub use conversation::{
    dedup_participants, direct_key, normalize_group_name, AddParticipantsRequest, Conversation,
    ConversationSummary, GroupInfo, ListConversationsResponse, UpdateAdminsRequest,
    UpdateGroupInfoRequest, UpsertConversationRequest, UpsertConversationResponse, ADMIN_ONLY,
    NOT_A_PARTICIPANT,
};
pub use message::{
    ListMessagesResponse, Message, MessagePayload, MessageType, MessageView, SendMessageRequest,
    SendMessageResponse, DELETED_MESSAGE_TEXT,
};
pub use push::{
    PushKeys, PushPayload, PushSubscription, RemoveSubscriptionRequest, SaveSubscriptionRequest,
    StoredPushSubscription,
};
pub use reply::{ReplySnapshot, ReplyTo};
pub use user::{
    ParticipantSnapshot, User, UserPage, UserRole, UserSearchParams, PLACEHOLDER_IMAGE,
};
