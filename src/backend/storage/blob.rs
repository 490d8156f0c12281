/**
 * Blob Store
 *
 * Media messages and group images reference blobs by `StorageId`. The
 * `BlobStore` trait hides where the bytes live; `FsBlobStore` keeps them in a
 * directory and their metadata in the `blobs` table.
 */

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::server::clock::{from_millis, to_millis};
use crate::backend::BoxFuture;
use crate::shared::messaging::{StorageId, UserId};

/// Metadata of a stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub id: StorageId,
    /// User whose upload ticket produced the blob
    pub owner: UserId,
    pub content_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Storage backend for message media and group images
pub trait BlobStore: Send + Sync {
    /// Store bytes on behalf of `owner`, returning the new id
    fn put(
        &self,
        owner: UserId,
        content_type: &str,
        bytes: Bytes,
    ) -> BoxFuture<'_, Result<StorageId, BackendError>>;

    /// Load a blob with its metadata
    fn get(&self, id: StorageId) -> BoxFuture<'_, Result<Option<(BlobMeta, Bytes)>, BackendError>>;

    /// Remove a blob; returns false when it did not exist
    fn delete(&self, id: StorageId) -> BoxFuture<'_, Result<bool, BackendError>>;

    /// Metadata of a stored blob, without reading its bytes
    fn meta(&self, id: StorageId) -> BoxFuture<'_, Result<Option<BlobMeta>, BackendError>>;

    /// Public URL under which the blob is served
    fn url(&self, id: StorageId) -> String;
}

/// Filesystem-backed blob store
#[derive(Clone)]
pub struct FsBlobStore {
    pool: SqlitePool,
    root: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(pool: SqlitePool, root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            pool,
            root: root.into(),
            base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: StorageId) -> PathBuf {
        self.root.join(id.simple().to_string())
    }
}

fn io_error(context: &str, err: std::io::Error) -> BackendError {
    BackendError::storage(format!("{}: {}", context, err))
}

impl BlobStore for FsBlobStore {
    fn put(
        &self,
        owner: UserId,
        content_type: &str,
        bytes: Bytes,
    ) -> BoxFuture<'_, Result<StorageId, BackendError>> {
        let content_type = content_type.to_string();
        Box::pin(async move {
            let id = Uuid::new_v4();
            tokio::fs::create_dir_all(&self.root)
                .await
                .map_err(|e| io_error("failed to create blob directory", e))?;
            tokio::fs::write(self.path_for(id), &bytes)
                .await
                .map_err(|e| io_error("failed to write blob", e))?;

            sqlx::query(
                "INSERT INTO blobs (id, owner_id, content_type, size, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(owner)
            .bind(&content_type)
            .bind(bytes.len() as i64)
            .bind(to_millis(Utc::now()))
            .execute(&self.pool)
            .await?;

            tracing::debug!(storage_id = %id, size = bytes.len(), "[Storage] blob stored");
            Ok(id)
        })
    }

    fn get(&self, id: StorageId) -> BoxFuture<'_, Result<Option<(BlobMeta, Bytes)>, BackendError>> {
        Box::pin(async move {
            let Some(meta) = self.meta(id).await? else {
                return Ok(None);
            };

            let bytes = match tokio::fs::read(self.path_for(id)).await {
                Ok(bytes) => Bytes::from(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(storage_id = %id, "[Storage] metadata without bytes");
                    return Ok(None);
                }
                Err(e) => return Err(io_error("failed to read blob", e)),
            };

            Ok(Some((meta, bytes)))
        })
    }

    fn delete(&self, id: StorageId) -> BoxFuture<'_, Result<bool, BackendError>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM blobs WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;

            match tokio::fs::remove_file(self.path_for(id)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error("failed to remove blob", e)),
            }

            Ok(result.rows_affected() > 0)
        })
    }

    fn meta(&self, id: StorageId) -> BoxFuture<'_, Result<Option<BlobMeta>, BackendError>> {
        Box::pin(async move {
            let row: Option<(UserId, String, i64, i64)> = sqlx::query_as(
                "SELECT owner_id, content_type, size, created_at FROM blobs WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(row.map(|(owner, content_type, size, created_at)| BlobMeta {
                id,
                owner,
                content_type,
                size: size.max(0) as u64,
                created_at: from_millis(created_at),
            }))
        })
    }

    fn url(&self, id: StorageId) -> String {
        format!("{}/api/storage/{}", self.base_url, id)
    }
}
