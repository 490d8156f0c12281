//! Route Configuration Module
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs        - Module exports and documentation
//! ├── router.rs     - Router assembly and middleware
//! └── api_routes.rs - Route tables
//! ```

/// Main router creation
pub mod router;

/// Route tables
pub mod api_routes;

pub use router::create_router;
