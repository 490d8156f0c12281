//! Push Notifications Module
//!
//! Browser push subscriptions and delivery.
//!
//! - **`db`** - SQL for `push_subscriptions`
//! - **`gateway`** - `PushGateway` trait and the VAPID web push client
//! - **`service`** - Subscription management, fan-out to a user's devices
//! - **`handlers`** - HTTP handlers
//!
//! Delivery is disabled when no VAPID keys are configured; sends are then
//! skipped with a warning.

pub mod db;
pub mod gateway;
pub mod handlers;
pub mod service;

pub use gateway::{DeliveryOutcome, PushGateway, WebPushGateway};
pub use handlers::*;
pub use service::{send_to_user, DeliveryReport};
