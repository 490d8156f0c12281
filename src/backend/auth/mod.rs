//! Authentication Module
//!
//! Authentication is delegated to an external identity provider. This module
//! covers the two points where the API meets it:
//!
//! - **`sessions`** - Bearer JWT verification and the token identifier
//! - **`webhook`** - Signed user/session webhooks that maintain the user table
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs      - Module exports and documentation
//! ├── sessions.rs - JWT verification
//! └── webhook.rs  - Webhook verification and event handling
//! ```
//!
//! # Authentication Flow
//!
//! 1. The identity provider creates the user and posts `user.created`
//! 2. The client calls the API with the provider's JWT as bearer token
//! 3. The auth middleware maps `<iss>|<sub>` to the user row

/// JWT verification
pub mod sessions;

/// Identity-provider webhooks
pub mod webhook;

pub use sessions::{token_identifier, Claims, TokenVerifier};
pub use webhook::handle_identity_webhook;
