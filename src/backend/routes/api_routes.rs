/**
 * API Route Table
 *
 * # Public
 * - `POST /api/webhooks/identity` - Identity-provider webhook (signed)
 * - `POST /api/storage/upload/{ticket}` - Upload against a one-time ticket
 * - `GET /api/storage/{id}` - Blob download
 *
 * # Authenticated
 * - `/api/users/...` - Profiles, listing and search
 * - `/api/conversations/...` - Conversations, membership, messages, events
 * - `/api/messages/...` - Read receipts and deletion
 * - `/api/storage/upload-url` - One-time upload URL
 * - `/api/push/subscriptions` - Push subscriptions
 */

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::backend::auth::handle_identity_webhook;
use crate::backend::conversations::{
    handle_add_participants, handle_delete_conversation, handle_get_my_conversations,
    handle_kick_user, handle_update_admins, handle_update_group_info, handle_upsert_conversation,
};
use crate::backend::messaging::{
    handle_delete_message, handle_destroy_message, handle_get_messages, handle_mark_read,
    handle_send_message,
};
use crate::backend::push::{handle_remove_subscription, handle_save_subscription};
use crate::backend::realtime::handle_conversation_events;
use crate::backend::server::state::AppState;
use crate::backend::storage::handlers::{
    handle_download, handle_generate_upload_url, handle_upload, MAX_UPLOAD_BYTES,
};
use crate::backend::users::{
    handle_get_group_members, handle_get_me, handle_get_users, handle_paged_users,
};

/// Routes reachable without a bearer token
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/webhooks/identity", post(handle_identity_webhook))
        .route(
            "/api/storage/upload/{ticket}",
            post(handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/storage/{id}", get(handle_download))
}

/// Routes behind the auth middleware
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // Users
        .route("/api/users", get(handle_get_users))
        .route("/api/users/me", get(handle_get_me))
        .route("/api/users/search", get(handle_paged_users))
        // Conversations
        .route(
            "/api/conversations",
            get(handle_get_my_conversations).post(handle_upsert_conversation),
        )
        .route("/api/conversations/{id}", delete(handle_delete_conversation))
        .route(
            "/api/conversations/{id}/participants",
            post(handle_add_participants),
        )
        .route(
            "/api/conversations/{id}/participants/{user_id}",
            delete(handle_kick_user),
        )
        .route("/api/conversations/{id}/admins", put(handle_update_admins))
        .route("/api/conversations/{id}/group", patch(handle_update_group_info))
        .route("/api/conversations/{id}/members", get(handle_get_group_members))
        .route(
            "/api/conversations/{id}/messages",
            get(handle_get_messages).post(handle_send_message),
        )
        .route("/api/conversations/{id}/events", get(handle_conversation_events))
        // Messages
        .route("/api/messages/{id}", delete(handle_delete_message))
        .route("/api/messages/{id}/read", patch(handle_mark_read))
        .route("/api/messages/{id}/destroy", delete(handle_destroy_message))
        // Storage
        .route("/api/storage/upload-url", post(handle_generate_upload_url))
        // Push
        .route(
            "/api/push/subscriptions",
            post(handle_save_subscription).delete(handle_remove_subscription),
        )
}
