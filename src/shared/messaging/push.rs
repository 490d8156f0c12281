//! Web Push Subscription Types
//!
//! Browser push subscriptions as produced by `PushManager.subscribe()`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Keys the browser hands out with a subscription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A browser push subscription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,
    pub keys: PushKeys,
}

/// A subscription stored for a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredPushSubscription {
    pub id: Uuid,
    pub user_id: UserId,
    pub subscription: PushSubscription,
}

/// Request body for saving a subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSubscriptionRequest {
    pub subscription: PushSubscription,
}

/// Request body for removing a subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveSubscriptionRequest {
    pub endpoint: String,
}

/// Notification content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
