//! Backend Module
//!
//! This module contains all server-side code for wazap. It provides an Axum
//! HTTP API over a SQLite database, per-conversation real-time streams, blob
//! storage, web push delivery, and the scheduled retention sweep.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Application state, configuration loading, initialization
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`auth`** - Bearer token verification and identity webhooks
//! - **`middleware`** - Authentication middleware and the `AuthUser` extractor
//! - **`users`** - User directory and presence
//! - **`conversations`** - Conversation resolver and group administration
//! - **`messaging`** - Message fan-out and reply snapshots
//! - **`retention`** - Batched purge of expired messages
//! - **`storage`** - Blob store and upload tickets
//! - **`push`** - Push subscriptions and delivery
//! - **`realtime`** - Per-conversation broadcast channels and SSE
//! - **`error`** - Backend error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Server binary
//! ├── server/         - State, configuration, initialization
//! ├── routes/         - Route configuration
//! ├── auth/           - Tokens and webhooks
//! ├── middleware/     - Request middleware
//! ├── users/          - Users and presence
//! ├── conversations/  - Conversations and groups
//! ├── messaging/      - Messages and replies
//! ├── retention/      - Retention sweep
//! ├── storage/        - Blobs
//! ├── push/           - Web push
//! ├── realtime/       - Event broadcasting
//! └── error/          - Error types
//! ```
//!
//! # Service Layer
//!
//! Each domain module exposes plain async functions taking `&AppState` and
//! the authenticated `User`. HTTP handlers are thin wrappers around them, so
//! the same operations are reachable from tests and background tasks.

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Backend error types
pub mod error;

/// Token verification and identity webhooks
pub mod auth;

/// Middleware for request processing
pub mod middleware;

/// User directory and presence
pub mod users;

/// Conversation resolver and group administration
pub mod conversations;

/// Message fan-out and reply snapshots
pub mod messaging;

/// Retention sweep
pub mod retention;

/// Blob storage
pub mod storage;

/// Web push subscriptions and delivery
pub mod push;

/// Real-time update system
pub mod realtime;

/// Boxed future returned by the object-safe service traits (`BlobStore`, `PushGateway`)
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Re-export commonly used types
pub use error::BackendError;
pub use server::{create_app, AppState};
