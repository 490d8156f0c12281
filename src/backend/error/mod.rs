//! Backend Error Module
//!
//! This module defines error types specific to the backend server.
//! These errors are returned by the service functions and HTTP handlers and
//! convert directly into HTTP responses.
//!
//! # Architecture
//!
//! - **`types`** - Error type definitions and constructors
//! - **`conversion`** - Error conversion implementations (IntoResponse, etc.)
//!
//! # Error Types
//!
//! - `Unauthorized` - Missing or invalid credentials, unknown user
//! - `Forbidden` - Authenticated but not allowed (not a member, not admin)
//! - `NotFound` - Conversation, message, blob or ticket does not exist
//! - `Validation` - Request failed validation
//! - `Conflict` - Request collides with existing state
//! - `Database` - sqlx failure
//! - `Storage` - Blob store failure
//! - `Internal` - Anything else
//!
//! # HTTP Response Conversion
//!
//! All backend errors implement `IntoResponse` from Axum. The response body is
//! JSON of the form `{ "error": "...", "status": 403 }`.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::{is_unique_violation, BackendError};
