//! Real-time Update Module
//!
//! Clients watch a conversation through Server-Sent Events instead of
//! polling. Every write that changes what a client would render publishes a
//! `RealtimeEvent` on the conversation's channel.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs          - Module exports and documentation
//! ├── broadcast.rs    - Per-conversation broadcast channels
//! └── subscription.rs - SSE subscription handler
//! ```
//!
//! # Event Types
//!
//! - `message_created` / `message_updated` / `message_deleted`
//! - `conversation_updated` / `conversation_deleted`
//! - `presence_changed`

/// Per-conversation broadcast channels
pub mod broadcast;

/// Server-Sent Events subscription handler
pub mod subscription;

pub use broadcast::ConversationBroadcastState;
pub use subscription::{conversation_events, handle_conversation_events};
