/**
 * Application State Management
 *
 * `AppState` is the central state container handed to every handler and
 * service function. All fields are cheap to clone: the pool is reference
 * counted, the services sit behind `Arc`, and the broadcast state shares one
 * channel map.
 *
 * # State Extraction
 *
 * The `FromRef` implementations allow handlers to extract specific parts of
 * the state, e.g. `State(pool): State<SqlitePool>`.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::backend::auth::sessions::TokenVerifier;
use crate::backend::error::BackendError;
use crate::backend::push::gateway::{PushGateway, WebPushGateway};
use crate::backend::realtime::ConversationBroadcastState;
use crate::backend::storage::{BlobStore, FsBlobStore, UploadTickets};
use crate::shared::AppConfig;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub pool: SqlitePool,

    /// Validated configuration
    pub config: Arc<AppConfig>,

    /// Bearer token verifier
    pub verifier: Arc<TokenVerifier>,

    /// Per-conversation event channels
    pub broadcast: ConversationBroadcastState,

    /// Blob storage for media and group images
    pub blobs: Arc<dyn BlobStore>,

    /// Outstanding one-time upload tickets
    pub tickets: UploadTickets,

    /// Push delivery; `None` when VAPID keys are not configured
    pub push: Option<Arc<dyn PushGateway>>,
}

impl AppState {
    /// Build the state from a pool and configuration
    ///
    /// Uses the filesystem blob store and, when VAPID keys are present, the
    /// web push gateway.
    pub fn new(pool: SqlitePool, config: AppConfig) -> Result<Self, BackendError> {
        let verifier = TokenVerifier::from_config(&config.auth)?;
        let blobs = FsBlobStore::new(pool.clone(), config.blob_dir.clone(), &config.public_base_url);
        let push: Option<Arc<dyn PushGateway>> = if config.push.is_enabled() {
            Some(Arc::new(WebPushGateway::from_config(&config.push)?))
        } else {
            tracing::warn!("VAPID keys not configured; push notifications are disabled");
            None
        };
        let tickets = UploadTickets::new(Duration::from_secs(config.upload_ticket_ttl_secs));

        Ok(Self {
            pool,
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            broadcast: ConversationBroadcastState::new(),
            blobs: Arc::new(blobs),
            tickets,
            push,
        })
    }

    /// Replace the push gateway
    pub fn with_push_gateway(mut self, gateway: Arc<dyn PushGateway>) -> Self {
        self.push = Some(gateway);
        self
    }

    /// Replace the blob store
    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = blobs;
        self
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for ConversationBroadcastState {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.broadcast.clone()
    }
}
