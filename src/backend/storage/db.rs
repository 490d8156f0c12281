//! Blob reference lookups

use sqlx::SqlitePool;

use crate::shared::messaging::StorageId;

/// Whether a message or a group image already points at the blob
pub async fn is_referenced(pool: &SqlitePool, id: StorageId) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1 FROM messages WHERE storage_id = ?
        UNION ALL
        SELECT 1 FROM conversations WHERE group_image_storage_id = ?
        LIMIT 1
        "#,
    )
    .bind(id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}
