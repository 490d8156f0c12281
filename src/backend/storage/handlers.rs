//! Storage HTTP handlers and operations

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::storage::db as storage_db;
use crate::backend::server::state::AppState;
use crate::shared::messaging::{StorageId, User};

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// One-time upload URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub ticket: Uuid,
    pub expires_in_secs: u64,
}

/// Result of an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub storage_id: StorageId,
}

/// Issue a one-time upload URL for the caller
pub fn generate_upload_url(state: &AppState, user: &User) -> UploadUrlResponse {
    let ticket = state.tickets.issue(user.id);
    UploadUrlResponse {
        upload_url: format!(
            "{}/api/storage/upload/{}",
            state.config.public_base_url.trim_end_matches('/'),
            ticket
        ),
        ticket,
        expires_in_secs: state.tickets.ttl().as_secs(),
    }
}

/// Store an upload against a ticket
pub async fn upload(
    state: &AppState,
    ticket: Uuid,
    content_type: &str,
    body: Bytes,
) -> Result<StorageId, BackendError> {
    let owner = state
        .tickets
        .consume(ticket)
        .ok_or_else(|| BackendError::not_found("Upload URL is invalid or has expired"))?;
    if body.is_empty() {
        return Err(BackendError::validation("Upload body is empty"));
    }
    let storage_id = state.blobs.put(owner, content_type, body).await?;
    tracing::info!(storage_id = %storage_id, owner = %owner, "[Storage] upload stored");
    Ok(storage_id)
}

pub const FILE_NOT_FOUND: &str = "File not found";
pub const FILE_NOT_OWNED: &str = "You can only attach your own uploads";
pub const FILE_IN_USE: &str = "File is already attached elsewhere";

/// Check that `caller` may attach a blob and return its public URL
///
/// A blob is attached once, by the user who uploaded it.
pub async fn attach_blob(
    state: &AppState,
    storage_id: StorageId,
    caller: &User,
) -> Result<String, BackendError> {
    let meta = state
        .blobs
        .meta(storage_id)
        .await?
        .ok_or_else(|| BackendError::not_found(FILE_NOT_FOUND))?;
    if meta.owner != caller.id {
        return Err(BackendError::forbidden(FILE_NOT_OWNED));
    }
    if storage_db::is_referenced(&state.pool, storage_id).await? {
        return Err(BackendError::conflict(FILE_IN_USE));
    }
    Ok(state.blobs.url(storage_id))
}

/// Delete a blob as a side effect of another operation
///
/// Failures are logged; the caller's operation still succeeds.
pub async fn discard_blob(state: &AppState, storage_id: StorageId) -> bool {
    match state.blobs.delete(storage_id).await {
        Ok(deleted) => deleted,
        Err(e) => {
            tracing::warn!(storage_id = %storage_id, error = %e, "[Storage] failed to delete blob");
            false
        }
    }
}

/// POST /api/storage/upload-url
pub async fn handle_generate_upload_url(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<UploadUrlResponse> {
    Json(generate_upload_url(&state, &user))
}

/// POST /api/storage/upload/{ticket}
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(ticket): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, BackendError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let storage_id = upload(&state, ticket, content_type, body).await?;
    Ok(Json(UploadResponse { storage_id }))
}

/// GET /api/storage/{id}
pub async fn handle_download(
    State(state): State<AppState>,
    Path(storage_id): Path<StorageId>,
) -> Result<Response, BackendError> {
    let (meta, bytes) = state
        .blobs
        .get(storage_id)
        .await?
        .ok_or_else(|| BackendError::not_found(FILE_NOT_FOUND))?;

    let content_type = HeaderValue::from_str(&meta.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static("private, max-age=86400")),
        ],
        bytes,
    )
        .into_response())
}
