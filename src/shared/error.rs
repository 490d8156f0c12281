//! Shared Error Types
//!
//! Domain errors raised by the chat model itself, independent of the HTTP
//! layer. The backend maps them onto status codes.
//!
//! - `ValidationError` - A field failed validation
//! - `MembershipError` - The caller is not allowed to act on a conversation
//!
//! ```rust
//! use wazap::shared::error::SharedError;
//!
//! let error = SharedError::validation("group_name", "Group name cannot be empty");
//! assert_eq!(error.to_string(), "Group name cannot be empty");
//! ```
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// A field of a request or model value is invalid
    #[error("{message}")]
    ValidationError { field: String, message: String },

    /// Caller is not a participant, or lacks the admin role
    #[error("{message}")]
    MembershipError { message: String },
}

impl SharedError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn membership(message: impl Into<String>) -> Self {
        Self::MembershipError {
            message: message.into(),
        }
    }

    /// Name of the offending field, for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ValidationError { field, .. } => Some(field),
            Self::MembershipError { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_keeps_field() {
        let error = SharedError::validation("group_name", "Group name cannot be empty");
        assert_eq!(error.field(), Some("group_name"));
        assert_eq!(error.to_string(), "Group name cannot be empty");
    }

    #[test]
    fn test_membership_error_display() {
        let error = SharedError::membership("You are not part of this conversation");
        assert_eq!(error.field(), None);
        assert_eq!(error.to_string(), "You are not part of this conversation");
    }
}
