/**
 * Identity-provider Webhooks
 *
 * The identity provider notifies us about user and session changes through
 * Svix-signed webhooks. This is the only way user rows are created, updated
 * or deleted, and it drives the presence flag.
 *
 * # Signature Scheme
 *
 * - `svix-id`, `svix-timestamp` and `svix-signature` headers
 * - signed content: `{svix-id}.{svix-timestamp}.{raw body}`
 * - HMAC-SHA256 keyed with the base64 part of the `whsec_...` secret
 * - `svix-signature` holds one or more space separated `v1,<base64>` entries
 * - timestamps more than five minutes away from now are rejected
 */

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::backend::auth::sessions::token_identifier;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::backend::users::service as users;
use crate::shared::messaging::UserRole;

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock skew between the sender and us
const TOLERANCE_SECS: i64 = 5 * 60;

/// Webhook verification failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),
    #[error("invalid timestamp")]
    InvalidTimestamp,
    #[error("timestamp outside of tolerance")]
    TimestampOutOfTolerance,
    #[error("invalid signing secret")]
    InvalidSecret,
    #[error("no matching signature")]
    SignatureMismatch,
}

impl From<WebhookError> for BackendError {
    fn from(err: WebhookError) -> Self {
        BackendError::validation(format!("Webhook verification failed: {}", err))
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}

fn signing_key(secret: &str) -> Result<Vec<u8>, WebhookError> {
    let encoded = secret.strip_prefix("whsec_").unwrap_or(secret);
    STANDARD.decode(encoded).map_err(|_| WebhookError::InvalidSecret)
}

/// Compute the `v1` signature for a message
pub fn sign(secret: &str, msg_id: &str, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
    let key = signing_key(secret)?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(format!("{}.{}.", msg_id, timestamp).as_bytes());
    mac.update(payload);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a webhook delivery
pub fn verify(
    secret: &str,
    headers: &HeaderMap,
    payload: &[u8],
    now: DateTime<Utc>,
) -> Result<(), WebhookError> {
    let msg_id = header(headers, "svix-id")?;
    let timestamp: i64 = header(headers, "svix-timestamp")?
        .trim()
        .parse()
        .map_err(|_| WebhookError::InvalidTimestamp)?;
    let signatures = header(headers, "svix-signature")?;

    if (now.timestamp() - timestamp).abs() > TOLERANCE_SECS {
        return Err(WebhookError::TimestampOutOfTolerance);
    }

    let key = signing_key(secret)?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(format!("{}.{}.", msg_id, timestamp).as_bytes());
    mac.update(payload);

    let matched = signatures
        .split_whitespace()
        .filter_map(|entry| entry.split_once(','))
        .filter(|(version, _)| *version == "v1")
        .filter_map(|(_, signature)| STANDARD.decode(signature).ok())
        .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

    if matched {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// An email entry of an identity-provider user
#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

/// User payload of `user.created` / `user.updated`
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub public_metadata: PublicMetadata,
}

/// Free-form metadata the provider lets admins attach to a user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

impl IdentityUser {
    /// "First Last", with "Guest" standing in for a missing first name
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("Guest");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }

    pub fn primary_email(&self) -> String {
        self.email_addresses
            .first()
            .map(|e| e.email_address.clone())
            .unwrap_or_default()
    }

    pub fn image(&self) -> String {
        self.image_url.clone().unwrap_or_default()
    }

    /// Role from the public metadata; unknown roles are ignored
    pub fn role(&self) -> Option<UserRole> {
        let raw = self.public_metadata.role.as_deref()?;
        let role = UserRole::parse(raw);
        if role.is_none() {
            tracing::warn!(user = %self.id, role = raw, "[Webhook] unknown role");
        }
        role
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletedUser {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionData {
    pub user_id: String,
}

/// Events we react to
#[derive(Debug, Clone)]
pub enum IdentityEvent {
    UserCreated(IdentityUser),
    UserUpdated(IdentityUser),
    UserDeleted(DeletedUser),
    SessionCreated(SessionData),
    SessionEnded(SessionData),
    Other(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl IdentityEvent {
    /// Parse a webhook body. Unknown event types become `Other`.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let Envelope { event_type, data } = serde_json::from_slice(body)?;
        let event = match event_type.as_str() {
            "user.created" => IdentityEvent::UserCreated(serde_json::from_value(data)?),
            "user.updated" => IdentityEvent::UserUpdated(serde_json::from_value(data)?),
            "user.deleted" => IdentityEvent::UserDeleted(serde_json::from_value(data)?),
            "session.created" => IdentityEvent::SessionCreated(serde_json::from_value(data)?),
            "session.ended" | "session.removed" | "session.revoked" => {
                IdentityEvent::SessionEnded(serde_json::from_value(data)?)
            }
            _ => IdentityEvent::Other(event_type),
        };
        Ok(event)
    }
}

/// Apply a verified event
pub async fn apply_event(state: &AppState, event: IdentityEvent) -> Result<(), BackendError> {
    // Must match the `iss` claim of the provider's tokens, see `Claims::token_identifier`
    let issuer = state
        .config
        .auth
        .jwt_issuer
        .as_deref()
        .ok_or_else(|| BackendError::internal("JWT_ISSUER is not configured"))?;
    match event {
        IdentityEvent::UserCreated(user) => {
            users::create_user(
                state,
                &token_identifier(issuer, &user.id),
                &user.display_name(),
                &user.primary_email(),
                &user.image(),
                user.role().unwrap_or_default(),
            )
            .await?;
        }
        IdentityEvent::UserUpdated(user) => {
            users::update_user(
                state,
                &token_identifier(issuer, &user.id),
                &user.display_name(),
                &user.image(),
                user.role(),
            )
            .await?;
        }
        IdentityEvent::UserDeleted(deleted) => {
            if let Some(id) = deleted.id {
                users::delete_user(state, &token_identifier(issuer, &id)).await?;
            }
        }
        IdentityEvent::SessionCreated(session) => {
            users::set_presence(state, &token_identifier(issuer, &session.user_id), true).await?;
        }
        IdentityEvent::SessionEnded(session) => {
            users::set_presence(state, &token_identifier(issuer, &session.user_id), false).await?;
        }
        IdentityEvent::Other(event_type) => {
            tracing::debug!(%event_type, "[Webhook] ignoring unhandled event type");
        }
    }
    Ok(())
}

/// POST /api/webhooks/identity
pub async fn handle_identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, BackendError> {
    let secret = state
        .config
        .auth
        .webhook_signing_secret
        .as_deref()
        .ok_or_else(|| BackendError::internal("webhook signing secret not configured"))?;

    verify(secret, &headers, &body, Utc::now()).map_err(|e| {
        tracing::warn!("[Webhook] rejected delivery: {}", e);
        BackendError::from(e)
    })?;

    let event = IdentityEvent::parse(&body)
        .map_err(|e| BackendError::validation(format!("Invalid webhook payload: {}", e)))?;
    tracing::info!("[Webhook] identity event received");

    apply_event(&state, event).await?;
    Ok(Json(serde_json::json!({ "received": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    fn signed_headers(payload: &[u8], timestamp: i64) -> HeaderMap {
        let signature = sign(SECRET, "msg_1", timestamp, payload).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("svix-id", HeaderValue::from_static("msg_1"));
        headers.insert("svix-timestamp", HeaderValue::from_str(&timestamp.to_string()).unwrap());
        headers.insert(
            "svix-signature",
            HeaderValue::from_str(&format!("v1,bm9wZQ== v1,{}", signature)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_valid_signature() {
        let now = Utc::now();
        let payload = br#"{"type":"user.created"}"#;
        let headers = signed_headers(payload, now.timestamp());
        assert_eq!(verify(SECRET, &headers, payload, now), Ok(()));
    }

    #[test]
    fn test_tampered_payload() {
        let now = Utc::now();
        let headers = signed_headers(b"original", now.timestamp());
        assert_eq!(
            verify(SECRET, &headers, b"tampered", now),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_stale_timestamp() {
        let now = Utc::now();
        let payload = b"{}";
        let headers = signed_headers(payload, now.timestamp() - 600);
        assert_eq!(
            verify(SECRET, &headers, payload, now),
            Err(WebhookError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            verify(SECRET, &HeaderMap::new(), b"{}", Utc::now()),
            Err(WebhookError::MissingHeader("svix-id"))
        );
    }

    #[test]
    fn test_event_parsing() {
        let created = IdentityEvent::parse(
            serde_json::json!({
                "type": "user.created",
                "data": {
                    "id": "user_1",
                    "first_name": "Ana",
                    "last_name": null,
                    "image_url": "https://img/ana.png",
                    "email_addresses": [{ "email_address": "ana@example.com" }]
                }
            })
            .to_string()
            .as_bytes(),
        )
        .unwrap();
        match created {
            IdentityEvent::UserCreated(user) => {
                assert_eq!(user.display_name(), "Ana");
                assert_eq!(user.primary_email(), "ana@example.com");
                assert_eq!(user.role(), None);
            }
            other => panic!("unexpected event {:?}", other),
        }

        let promoted = IdentityEvent::parse(
            br#"{"type":"user.updated","data":{"id":"user_1","public_metadata":{"role":"superAdmin"}}}"#,
        )
        .unwrap();
        match promoted {
            IdentityEvent::UserUpdated(user) => assert_eq!(user.role(), Some(UserRole::SuperAdmin)),
            other => panic!("unexpected event {:?}", other),
        }

        let revoked =
            IdentityEvent::parse(br#"{"type":"session.revoked","data":{"user_id":"user_1"}}"#)
                .unwrap();
        assert!(matches!(revoked, IdentityEvent::SessionEnded(_)));

        let other = IdentityEvent::parse(br#"{"type":"email.created","data":{}}"#).unwrap();
        assert!(matches!(other, IdentityEvent::Other(t) if t == "email.created"));

        assert!(IdentityEvent::parse(br#"{"type":"user.created","data":{}}"#).is_err());
    }
}
