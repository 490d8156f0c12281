//! Messaging Module
//!
//! Sending, listing and removing messages.
//!
//! - **`db`** - SQL for the `messages` table
//! - **`reply`** - Reply snapshots and the per-request user cache
//! - **`service`** - Message fan-out and permission checks
//! - **`handlers`** - HTTP handlers

pub mod db;
pub mod handlers;
pub mod reply;
pub mod service;

pub use handlers::*;
pub use reply::{build_reply, SnapshotCache};
