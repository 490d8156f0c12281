//! Conversation Data Structure
//!
//! Represents a 1:1 or group conversation between users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;
use super::user::User;
use super::{ConversationId, StorageId, UserId};
use crate::shared::error::SharedError;

pub const NOT_A_PARTICIPANT: &str = "You are not part of this conversation";
pub const ADMIN_ONLY: &str = "Only group admins can do that";

/// Represents a conversation between users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,
    /// Participant user IDs, in join order
    pub participants: Vec<UserId>,
    /// Group conversations have a name, an image and admins
    pub is_group: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    /// Public URL of the group image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_image: Option<String>,
    /// Blob behind `group_image`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_image_storage_id: Option<StorageId>,
    /// Group admins (always a subset of participants)
    #[serde(default)]
    pub admins: Vec<UserId>,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Check if user is a participant
    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    /// Check if user administers this group
    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id)
    }

    /// Get the other participant (for direct messages)
    pub fn other_participant(&self, current_user_id: UserId) -> Option<UserId> {
        self.participants
            .iter()
            .find(|&&id| id != current_user_id)
            .copied()
    }

    /// Everyone who should receive a message sent by `sender`
    pub fn receivers_for(&self, sender: UserId) -> Vec<UserId> {
        self.participants
            .iter()
            .copied()
            .filter(|&id| id != sender)
            .collect()
    }

    pub fn ensure_participant(&self, user_id: UserId) -> Result<(), SharedError> {
        if self.has_participant(user_id) {
            Ok(())
        } else {
            Err(SharedError::membership(NOT_A_PARTICIPANT))
        }
    }

    /// Fail unless this is a group administered by `user_id`
    pub fn ensure_group_admin(&self, user_id: UserId) -> Result<(), SharedError> {
        if !self.is_group {
            return Err(SharedError::validation("conversation", "Not a group conversation"));
        }
        if !self.is_admin(user_id) {
            return Err(SharedError::membership(ADMIN_ONLY));
        }
        Ok(())
    }

    /// Rename, re-image or delete: either side of a direct chat, admins of a group
    pub fn ensure_can_manage(&self, user_id: UserId) -> Result<(), SharedError> {
        if self.is_group && !self.is_admin(user_id) {
            return Err(SharedError::membership(ADMIN_ONLY));
        }
        Ok(())
    }

    /// Admins may remove anyone from a group; members may remove themselves
    pub fn ensure_can_remove(&self, caller: UserId, user_id: UserId) -> Result<(), SharedError> {
        if !self.is_group {
            return Err(SharedError::validation("conversation", "Not a group conversation"));
        }
        if caller != user_id && !self.is_admin(caller) {
            return Err(SharedError::membership(ADMIN_ONLY));
        }
        Ok(())
    }

    /// Drop a member and their admin role
    ///
    /// When the last admin leaves, the first remaining member is promoted and
    /// returned.
    pub fn remove_member(&mut self, user_id: UserId) -> Option<UserId> {
        self.participants.retain(|id| *id != user_id);
        self.admins.retain(|id| *id != user_id);

        if self.admins.is_empty() {
            let promoted = *self.participants.first()?;
            self.admins.push(promoted);
            return Some(promoted);
        }
        None
    }

    /// Replace the admin list; every admin must be a participant
    pub fn set_admins(&mut self, admins: &[UserId]) -> Result<(), SharedError> {
        let admins = dedup_participants(admins);
        if admins.is_empty() {
            return Err(SharedError::validation("admins", "A group needs at least one admin"));
        }
        if admins.iter().any(|id| !self.has_participant(*id)) {
            return Err(SharedError::validation("admins", "Admins must be participants"));
        }
        self.admins = admins;
        Ok(())
    }
}

/// Trim a group name, rejecting blank names
pub fn normalize_group_name(name: &str) -> Result<String, SharedError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SharedError::validation("group_name", "Group name cannot be empty"));
    }
    Ok(name.to_string())
}

/// Remove duplicate participants, keeping the first occurrence of each
pub fn dedup_participants(participants: &[UserId]) -> Vec<UserId> {
    let mut seen = Vec::with_capacity(participants.len());
    for id in participants {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

/// Order-independent key identifying a 1:1 conversation
///
/// `(a, b)` and `(b, a)` produce the same key.
pub fn direct_key(a: UserId, b: UserId) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{}:{}", low, high)
}

/// Conversation list entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    /// Profile of the other participant (direct conversations only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_user: Option<User>,
    /// Most recent message, if any
    pub last_message: Option<Message>,
}

impl ConversationSummary {
    /// Time of the last activity: last message, or creation
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.created_at)
            .unwrap_or(self.conversation.created_at)
    }
}

/// Response for listing conversations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

/// Request to find or create a conversation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpsertConversationRequest {
    /// Existing conversation to patch
    #[serde(default)]
    pub id: Option<ConversationId>,
    pub participants: Vec<UserId>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub group_name: Option<String>,
    /// Uploaded blob to use as group image
    #[serde(default)]
    pub group_image: Option<StorageId>,
    #[serde(default)]
    pub admins: Option<Vec<UserId>>,
}

/// Response after creating or resolving a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertConversationResponse {
    pub conversation_id: ConversationId,
    /// False when an existing conversation was returned
    pub created: bool,
}

/// Request to add members to a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddParticipantsRequest {
    pub participants: Vec<UserId>,
}

/// Request to replace the admin list of a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAdminsRequest {
    pub admins: Vec<UserId>,
}

/// Request to change a group's name and image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGroupInfoRequest {
    pub group_name: String,
    #[serde(default)]
    pub group_image: Option<StorageId>,
    #[serde(default)]
    pub remove_image: bool,
}

/// Name and image of a group after an update
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupInfo {
    pub group_name: Option<String>,
    pub group_image: Option<String>,
}
