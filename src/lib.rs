//! wazap - Main Library
//!
//! wazap is the backend of a WhatsApp-style chat application: 1:1 and group
//! conversations, typed messages (text, image, video, audio, document),
//! replies, presence, web push notifications, and group administration.
//!
//! # Module Structure
//!
//! - **`shared`** - Domain types shared between the server and API clients
//!   - Users, conversations, messages, reply snapshots, push subscriptions
//!   - Real-time event types
//!   - Configuration and error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP API with bearer-token authentication
//!   - SQLite persistence through sqlx
//!   - Per-conversation Server-Sent Events
//!   - Blob storage, web push delivery, and the retention sweep
//!
//! # Feature Flags
//!
//! - **`ssr`** - Enables the backend modules and the `wazap-server` binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use wazap::backend::server::init::{build_state, create_app};
//! use wazap::shared::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::builder()
//!     .jwt_secret("dev-secret")
//!     .jwt_issuer("https://id.example")
//!     .build()?;
//! let state = build_state(config).await?;
//! let app = create_app(state);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - **Server**: shared state is cheap to clone (`Arc`, pooled connections,
//!   `broadcast::Sender`) and every handler is `Send + Sync`
//! - **Background jobs**: the retention sweep and channel cleanup run on
//!   their own tokio tasks
//!
//! # Error Handling
//!
//! - `shared::error::SharedError` for membership and validation rules of the
//!   chat model
//! - `backend::error::BackendError` for everything the server can fail with,
//!   rendered as a JSON error response

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
