//! Users Module
//!
//! Users mirror the identity provider's accounts. They are written by the
//! webhook handlers in `auth::webhook` and read by the API.
//!
//! - **`db`** - SQL for the `users` table
//! - **`service`** - Presence fan-out, search and membership reads
//! - **`handlers`** - HTTP handlers

pub mod db;
pub mod handlers;
pub mod service;

pub use handlers::*;
