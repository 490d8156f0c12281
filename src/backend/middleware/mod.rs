//! Middleware Module
//!
//! HTTP middleware applied to the API routes.
//!
//! - **`auth`** - Bearer token authentication and the `AuthUser` extractor

pub mod auth;

pub use auth::{auth_middleware, bearer_token, AuthUser};
