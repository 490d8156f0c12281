//! Conversations Module
//!
//! 1:1 and group conversations.
//!
//! # Module Structure
//!
//! ```text
//! conversations/
//! ├── mod.rs      - Module exports and documentation
//! ├── db.rs       - SQL for conversations, participants and admins
//! ├── service.rs  - Resolver and group management
//! └── handlers.rs - HTTP handlers
//! ```
//!
//! # Membership Rules
//!
//! - A direct conversation has exactly two participants and is unique per pair
//! - Groups always keep at least one admin while they have members
//! - Admins are always participants

pub mod db;
pub mod handlers;
pub mod service;

pub use handlers::*;
pub use service::load_for_participant;
