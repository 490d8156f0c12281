//! Server Module
//!
//! This module contains the code that initializes and configures the Axum
//! HTTP server.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs     - Module exports and documentation
//! ├── state.rs   - AppState and FromRef implementations
//! ├── config.rs  - Configuration and database loading
//! ├── clock.rs   - Timestamp column conversion
//! └── init.rs    - State assembly, background tasks, app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: defaults, TOML file, environment
//! 2. **Database**: SQLite pool plus embedded migrations
//! 3. **State Creation**: blob store, verifier, push gateway, channels
//! 4. **Background Tasks**: retention sweep and channel cleanup
//! 5. **Router Creation**: all routes plus the trace layer

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Timestamp helpers
pub mod clock;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use init::{build_state, create_app, spawn_background_tasks};
pub use state::AppState;
