//! Push subscription management and delivery

use futures_util::future::join_all;

use crate::backend::error::BackendError;
use crate::backend::push::db as push_db;
use crate::backend::push::gateway::DeliveryOutcome;
use crate::backend::server::state::AppState;
use crate::shared::messaging::{
    Conversation, Message, PushPayload, PushSubscription, User, UserId,
};

/// Longest notification body
const PREVIEW_LEN: usize = 120;

/// Counts of one `send_to_user` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Push services are public https hosts; anything else is refused
fn check_endpoint(endpoint: &str) -> Result<(), BackendError> {
    if endpoint.trim().is_empty() {
        return Err(BackendError::validation("Subscription endpoint is required"));
    }
    let url = reqwest::Url::parse(endpoint.trim())
        .map_err(|_| BackendError::validation("Subscription endpoint is not a valid URL"))?;
    if url.scheme() != "https" || url.host_str().map_or(true, str::is_empty) {
        return Err(BackendError::validation("Subscription endpoint must be an https URL"));
    }
    Ok(())
}

pub async fn save_subscription(
    state: &AppState,
    user: &User,
    subscription: &PushSubscription,
) -> Result<uuid::Uuid, BackendError> {
    check_endpoint(&subscription.endpoint)?;
    let id = push_db::save_subscription(&state.pool, user.id, subscription).await?;
    tracing::debug!(user_id = %user.id, "[Push] subscription saved");
    Ok(id)
}

/// Remove the caller's subscription for `endpoint`; missing ones are ignored
pub async fn remove_subscription(
    state: &AppState,
    user: &User,
    endpoint: &str,
) -> Result<(), BackendError> {
    push_db::remove_subscription(&state.pool, user.id, endpoint).await?;
    Ok(())
}

/// Deliver a notification to every subscription of a user
///
/// Subscriptions the push service reports as gone are deleted.
pub async fn send_to_user(
    state: &AppState,
    user_id: UserId,
    payload: &PushPayload,
) -> Result<DeliveryReport, BackendError> {
    let Some(gateway) = state.push.clone() else {
        tracing::warn!("Push notifications skipped: missing VAPID keys");
        return Ok(DeliveryReport::default());
    };

    let subscriptions = push_db::subscriptions_for_user(&state.pool, user_id).await?;
    if subscriptions.is_empty() {
        return Ok(DeliveryReport::default());
    }

    let outcomes = join_all(
        subscriptions
            .iter()
            .map(|entry| gateway.deliver(&entry.subscription, payload)),
    )
    .await;

    let mut report = DeliveryReport::default();
    for (entry, outcome) in subscriptions.iter().zip(outcomes) {
        match outcome {
            DeliveryOutcome::Delivered => report.delivered += 1,
            DeliveryOutcome::Gone => {
                push_db::remove_by_id(&state.pool, entry.id).await?;
                report.removed += 1;
            }
            DeliveryOutcome::Failed(reason) => {
                tracing::error!(subscription_id = %entry.id, %reason, "Failed to deliver push notification");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Notification announcing `message`
pub fn message_notification(
    conversation: &Conversation,
    message: &Message,
    sender: &User,
) -> PushPayload {
    let sender_name = sender.name.clone().unwrap_or_else(|| "Someone".to_string());
    let title = match (conversation.is_group, &conversation.group_name) {
        (true, Some(group)) => format!("{} @ {}", sender_name, group),
        _ => sender_name,
    };
    PushPayload {
        title,
        body: message.payload.preview(PREVIEW_LEN),
        icon: conversation
            .group_image
            .clone()
            .filter(|_| conversation.is_group)
            .or_else(|| Some(sender.image.clone()).filter(|image| !image.is_empty())),
        badge: None,
        data: Some(serde_json::json!({
            "conversation_id": conversation.id,
            "message_id": message.id,
        })),
    }
}

/// Notify the receivers of a freshly sent message in the background
pub fn spawn_message_notifications(
    state: &AppState,
    conversation: &Conversation,
    message: &Message,
    sender: &User,
) {
    if state.push.is_none() || message.receivers.is_empty() {
        return;
    }

    let state = state.clone();
    let receivers = message.receivers.clone();
    let payload = message_notification(conversation, message, sender);
    tokio::spawn(async move {
        for receiver in receivers {
            if let Err(e) = send_to_user(&state, receiver, &payload).await {
                tracing::warn!(user_id = %receiver, error = %e, "[Push] notification failed");
            }
        }
    });
}
