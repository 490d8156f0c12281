//! Common test utilities and helpers
//!
//! - `TestApp`: in-memory database, temporary blob directory, a test server
//!   and a recording push gateway
//! - Token minting and user fixtures
//! - Webhook signing
//! - Assertion macros

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use wazap::backend::auth::sessions::{create_token, token_identifier};
use wazap::backend::auth::webhook::sign;
use wazap::backend::push::{DeliveryOutcome, PushGateway};
use wazap::backend::server::{build_state, create_app, AppState};
use wazap::backend::users::db as user_db;
use wazap::backend::BoxFuture;
use wazap::shared::config::RetentionConfig;
use wazap::shared::messaging::{PushPayload, PushSubscription, User, UserRole};
use wazap::shared::AppConfig;

pub const JWT_SECRET: &str = "test-secret";
pub const ISSUER: &str = "https://id.test";

/// Webhook signing secret in the provider's `whsec_` format
pub fn webhook_secret() -> String {
    format!("whsec_{}", STANDARD.encode(b"wazap-webhook-test-key"))
}

/// Push gateway that records deliveries instead of calling push services
#[derive(Default)]
pub struct RecordingPushGateway {
    pub delivered: Mutex<Vec<(String, PushPayload)>>,
    /// Endpoints answered with "gone"
    pub gone: Mutex<Vec<String>>,
}

impl RecordingPushGateway {
    pub fn deliveries(&self) -> Vec<(String, PushPayload)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn mark_gone(&self, endpoint: &str) {
        self.gone.lock().unwrap().push(endpoint.to_string());
    }
}

impl PushGateway for RecordingPushGateway {
    fn deliver<'a>(
        &'a self,
        subscription: &'a PushSubscription,
        payload: &'a PushPayload,
    ) -> BoxFuture<'a, DeliveryOutcome> {
        Box::pin(async move {
            if self.gone.lock().unwrap().contains(&subscription.endpoint) {
                return DeliveryOutcome::Gone;
            }
            self.delivered
                .lock()
                .unwrap()
                .push((subscription.endpoint.clone(), payload.clone()));
            DeliveryOutcome::Delivered
        })
    }
}

/// A fully wired application over an in-memory database
pub struct TestApp {
    pub state: AppState,
    pub server: TestServer,
    pub push: Arc<RecordingPushGateway>,
    _blob_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_retention(RetentionConfig::default()).await
    }

    pub async fn with_retention(retention: RetentionConfig) -> Self {
        let blob_dir = tempfile::tempdir().unwrap();
        let config = AppConfig::builder()
            .database_url("sqlite::memory:")
            .public_base_url("http://localhost:3000")
            .blob_dir(blob_dir.path())
            .jwt_secret(JWT_SECRET)
            .jwt_issuer(ISSUER)
            .webhook_signing_secret(webhook_secret())
            .retention(retention)
            .build()
            .unwrap();

        let push = Arc::new(RecordingPushGateway::default());
        let state = build_state(config)
            .await
            .unwrap()
            .with_push_gateway(push.clone());
        let server = TestServer::new(create_app(state.clone())).unwrap();

        Self {
            state,
            server,
            push,
            _blob_dir: blob_dir,
        }
    }

    /// Insert a user and mint a bearer token for them
    pub async fn user(&self, subject: &str, name: &str) -> (User, String) {
        let user = user_db::create_user(
            &self.state.pool,
            &token_identifier(ISSUER, subject),
            name,
            &format!("{}@example.com", subject),
            &format!("https://img.test/{}.png", subject),
            UserRole::Common,
        )
        .await
        .unwrap();
        (user, token_for(subject))
    }
}

/// Bearer token for an identity-provider subject
pub fn token_for(subject: &str) -> String {
    create_token(JWT_SECRET, Some(ISSUER), subject, 3600).unwrap()
}

/// Svix headers for a webhook body
pub fn webhook_headers(body: &str) -> Vec<(HeaderName, HeaderValue)> {
    let timestamp = Utc::now().timestamp();
    let signature = sign(&webhook_secret(), "msg_test", timestamp, body.as_bytes()).unwrap();
    vec![
        (HeaderName::from_static("svix-id"), HeaderValue::from_static("msg_test")),
        (
            HeaderName::from_static("svix-timestamp"),
            HeaderValue::from_str(&timestamp.to_string()).unwrap(),
        ),
        (
            HeaderName::from_static("svix-signature"),
            HeaderValue::from_str(&format!("v1,{}", signature)).unwrap(),
        ),
    ]
}

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a result is an error of the given variant
#[macro_export]
macro_rules! assert_err {
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => panic!("Expected different error variant, got: {:?}", e),
        }
    };
}
