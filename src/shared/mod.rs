//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the HTTP layer, the background jobs, and API clients. None of it depends
//! on the server runtime, so it compiles without the `ssr` feature.

/// Real-time event system
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Chat domain types: users, conversations, messages, replies, push
pub mod messaging;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use event::{EventType, RealtimeEvent};
