/**
 * Backend Error Types
 *
 * This module defines the error enum shared by every backend service.
 *
 * # Error Categories
 *
 * ## Caller errors (4xx)
 *
 * - `Unauthorized` - no token, bad token, or no matching user row
 * - `Forbidden` - the caller is not a participant or lacks the admin role
 * - `NotFound` - the addressed record does not exist
 * - `Validation` - malformed or empty input
 * - `Conflict` - the request contradicts stored state
 *
 * ## Server errors (5xx)
 *
 * - `Database` - sqlx errors, logged and reported without details
 * - `Storage` - the blob store could not read or write
 * - `Internal` - unexpected failures
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::shared::SharedError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use wazap::backend::error::BackendError;
///
/// let err = BackendError::forbidden("You are not part of this conversation");
/// let err = BackendError::not_found("Conversation not found");
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Missing or invalid credentials
    #[error("{message}")]
    Unauthorized { message: String },

    /// Caller is authenticated but not allowed to perform the action
    #[error("{message}")]
    Forbidden { message: String },

    /// Addressed record does not exist
    #[error("{message}")]
    NotFound { message: String },

    /// Request failed validation
    #[error("{message}")]
    Validation { message: String },

    /// Request conflicts with stored state
    #[error("{message}")]
    Conflict { message: String },

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Blob store failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Unexpected failure
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Permission or validation failure raised by the chat model
    #[error(transparent)]
    Shared(#[from] SharedError),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Report a unique violation as `Conflict`; other database errors pass through
    pub fn unique_conflict(err: sqlx::Error, message: impl Into<String>) -> Self {
        if is_unique_violation(&err) {
            Self::conflict(message)
        } else {
            Self::Database(err)
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `Unauthorized` - 401
    /// - `Forbidden` - 403 (also `SharedError::MembershipError`)
    /// - `NotFound` - 404
    /// - `Validation` - 400 (also `SharedError::ValidationError`)
    /// - `Conflict` - 409
    /// - everything else - 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Database(_) | Self::Storage { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Shared(SharedError::ValidationError { .. }) => StatusCode::BAD_REQUEST,
            Self::Shared(SharedError::MembershipError { .. }) => StatusCode::FORBIDDEN,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client
    ///
    /// Server-side failures are reported generically; the details go to the log.
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Validation { message }
            | Self::Conflict { message } => message.clone(),
            Self::Shared(err) => err.to_string(),
            Self::Database(_) => "Database error".to_string(),
            Self::Storage { .. } => "Storage error".to_string(),
            Self::Internal { .. } | Self::Serialization(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            BackendError::unauthorized("Unauthorized").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            BackendError::forbidden("nope").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            BackendError::not_found("Message not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BackendError::conflict("taken").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            BackendError::from(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_shared_errors_map_to_client_errors() {
        let validation: BackendError = SharedError::validation("content", "empty").into();
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.message(), "empty");

        let membership: BackendError =
            SharedError::membership("You are not part of this conversation").into();
        assert_eq!(membership.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_database_details_are_hidden() {
        let error = BackendError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(error.message(), "Database error");
        assert!(error.to_string().contains("pool timed out"));
    }
}
