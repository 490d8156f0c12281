/**
 * Push Gateway
 *
 * `PushGateway` delivers one notification to one browser subscription.
 * `WebPushGateway` encrypts the JSON payload for the subscription's keys
 * (RFC 8291, aes128gcm), signs a VAPID token (RFC 8292) and POSTs the result
 * to the browser vendor's push service.
 */

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use web_push::{
    request_builder, ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessage,
    WebPushMessageBuilder,
};

use crate::backend::error::BackendError;
use crate::backend::BoxFuture;
use crate::shared::config::PushConfig;
use crate::shared::messaging::{PushPayload, PushSubscription};

/// How long the push service keeps an undelivered notification
const PUSH_TTL_SECS: u32 = 24 * 60 * 60;

/// Result of a single delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The subscription no longer exists (404/410) and should be removed
    Gone,
    Failed(String),
}

impl DeliveryOutcome {
    /// Classify a push service response status
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_success() {
            DeliveryOutcome::Delivered
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            DeliveryOutcome::Gone
        } else {
            DeliveryOutcome::Failed(format!("push service answered {}", status))
        }
    }
}

/// Delivers notifications to browser subscriptions
pub trait PushGateway: Send + Sync {
    fn deliver<'a>(
        &'a self,
        subscription: &'a PushSubscription,
        payload: &'a PushPayload,
    ) -> BoxFuture<'a, DeliveryOutcome>;
}

/// VAPID-authenticated, payload-encrypting web push over HTTP
pub struct WebPushGateway {
    client: Client,
    private_pem: String,
    contact: String,
}

impl WebPushGateway {
    pub fn from_config(config: &PushConfig) -> Result<Self, BackendError> {
        let (Some(_), Some(private_pem)) =
            (&config.vapid_public_key, &config.vapid_private_key_pem)
        else {
            return Err(BackendError::internal("VAPID keys not configured"));
        };

        VapidSignatureBuilder::from_pem_no_sub(private_pem.as_bytes())
            .map_err(|e| BackendError::internal(format!("invalid VAPID private key: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BackendError::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            private_pem: private_pem.clone(),
            contact: config.contact.clone(),
        })
    }

    /// Encrypted, signed message for one subscription
    fn message(
        &self,
        subscription: &PushSubscription,
        body: &[u8],
    ) -> Result<WebPushMessage, String> {
        let info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut signature = VapidSignatureBuilder::from_pem_no_sub(self.private_pem.as_bytes())
            .map_err(|e| format!("invalid VAPID private key: {}", e))?
            .add_sub_info(&info);
        signature.add_claim("sub", self.contact.as_str());
        let signature = signature
            .build()
            .map_err(|e| format!("failed to sign VAPID token: {}", e))?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_ttl(PUSH_TTL_SECS);
        builder.set_payload(ContentEncoding::Aes128Gcm, body);
        builder.set_vapid_signature(signature);
        builder
            .build()
            .map_err(|e| format!("failed to encrypt payload: {}", e))
    }

    async fn send(&self, subscription: &PushSubscription, payload: &PushPayload) -> DeliveryOutcome {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(e) => return DeliveryOutcome::Failed(format!("failed to encode payload: {}", e)),
        };
        let message = match self.message(subscription, &body) {
            Ok(message) => message,
            Err(e) => return DeliveryOutcome::Failed(e),
        };

        let request = request_builder::build_request::<Vec<u8>>(message);
        let method = match Method::from_bytes(request.method().as_str().as_bytes()) {
            Ok(method) => method,
            Err(e) => return DeliveryOutcome::Failed(format!("invalid method: {}", e)),
        };
        let mut outgoing = self
            .client
            .request(method, request.uri().to_string());
        for (name, value) in request.headers() {
            outgoing = outgoing.header(name.as_str(), value.as_bytes());
        }

        match outgoing.body(request.into_body()).send().await {
            Ok(response) => DeliveryOutcome::from_status(response.status()),
            Err(e) => DeliveryOutcome::Failed(format!("network error: {}", e)),
        }
    }
}

impl PushGateway for WebPushGateway {
    fn deliver<'a>(
        &'a self,
        subscription: &'a PushSubscription,
        payload: &'a PushPayload,
    ) -> BoxFuture<'a, DeliveryOutcome> {
        Box::pin(self.send(subscription, payload))
    }
}
