//! User Data Structures
//!
//! Users are mirrored from the identity provider; they are never created by
//! the chat API itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Image shown for users that no longer exist
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.png";

/// Account role assigned in the identity provider's public metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Common,
    Admin,
    #[serde(alias = "superAdmin")]
    SuperAdmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Common => "common",
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "super_admin",
        }
    }

    /// Accepts both the stored form and the provider's camel-case spelling
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "common" => Some(UserRole::Common),
            "admin" => Some(UserRole::Admin),
            "super_admin" | "superAdmin" => Some(UserRole::SuperAdmin),
            _ => None,
        }
    }
}

/// A chat user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique user ID
    pub id: UserId,
    /// Stable identity-provider key: `<issuer>|<subject>`
    pub token_identifier: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address (may be empty)
    pub email: String,
    /// Avatar URL
    pub image: String,
    /// Presence flag, driven by identity-provider session events
    pub is_online: bool,
    #[serde(default)]
    pub role: UserRole,
    /// When the user was first seen
    pub created_at: DateTime<Utc>,
}

/// Lightweight copy of a user embedded in replies and message listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantSnapshot {
    pub id: UserId,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub token_identifier: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub is_online: bool,
}

impl ParticipantSnapshot {
    /// Snapshot used when the referenced user has been deleted
    pub fn placeholder(id: UserId) -> Self {
        Self {
            id,
            image: PLACEHOLDER_IMAGE.to_string(),
            name: None,
            token_identifier: String::new(),
            email: String::new(),
            created_at: Utc::now(),
            is_online: false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.token_identifier.is_empty()
    }
}

impl From<&User> for ParticipantSnapshot {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            image: user.image.clone(),
            name: user.name.clone(),
            token_identifier: user.token_identifier.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            is_online: user.is_online,
        }
    }
}

/// Query parameters for the paged user search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSearchParams {
    #[serde(default)]
    pub search: Option<String>,
    /// Opaque cursor returned by the previous page
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// One page of users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPage {
    pub page: Vec<User>,
    pub continue_cursor: Option<String>,
    pub is_done: bool,
}
