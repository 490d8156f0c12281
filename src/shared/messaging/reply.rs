//! Reply Snapshot
//!
//! A denormalized copy of a quoted message, stored inline on the reply so
//! clients can render the quote without fetching the original.

use serde::{Deserialize, Serialize};

use super::message::{MessagePayload, MessageType};
use super::user::ParticipantSnapshot;
use super::MessageId;

/// Reference to the message being replied to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyTo {
    pub message_id: MessageId,
}

/// Snapshot of a quoted message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplySnapshot {
    /// Id of the quoted message (it may since have been swept)
    pub message_id: MessageId,
    /// Type of the quoted message
    pub quoted_type: MessageType,
    /// Copy of the quoted payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_payload: Option<MessagePayload>,
    /// Who wrote the quoted message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<ParticipantSnapshot>,
}
