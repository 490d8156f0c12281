//! Database operations for conversations
//!
//! A conversation row is stored together with its ordered participant list
//! (`conversation_participants.position`) and its admin set.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqliteExecutor, SqlitePool};

use crate::backend::server::clock::{from_millis, to_millis};
use crate::shared::messaging::{Conversation, ConversationId, StorageId, UserId};

const CONVERSATION_COLUMNS: &str =
    "id, is_group, group_name, group_image, group_image_storage_id, created_at";

async fn load_members(
    conn: &mut SqliteConnection,
    row: &SqliteRow,
) -> Result<Conversation, sqlx::Error> {
    let id: ConversationId = row.get("id");

    let participants: Vec<UserId> = sqlx::query_scalar(
        "SELECT user_id FROM conversation_participants WHERE conversation_id = ? ORDER BY position",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let admins: Vec<UserId> = sqlx::query_scalar(
        "SELECT user_id FROM conversation_admins WHERE conversation_id = ? ORDER BY rowid",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Conversation {
        id,
        participants,
        is_group: row.get::<i64, _>("is_group") != 0,
        group_name: row.get("group_name"),
        group_image: row.get("group_image"),
        group_image_storage_id: row.get("group_image_storage_id"),
        admins,
        created_at: from_millis(row.get("created_at")),
    })
}

async fn load_conversation(
    conn: &mut SqliteConnection,
    id: ConversationId,
) -> Result<Option<Conversation>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM conversations WHERE id = ?",
        CONVERSATION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(load_members(conn, &row).await?)),
        None => Ok(None),
    }
}

pub async fn get_conversation(
    pool: &SqlitePool,
    id: ConversationId,
) -> Result<Option<Conversation>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    load_conversation(&mut conn, id).await
}

/// Load a conversation inside a transaction that is about to modify it
///
/// Touches the row first so the transaction holds the write lock before
/// anything is read; concurrent membership changes then apply one after
/// the other instead of overwriting each other.
pub async fn lock_conversation(
    conn: &mut SqliteConnection,
    id: ConversationId,
) -> Result<Option<Conversation>, sqlx::Error> {
    let touched = sqlx::query("UPDATE conversations SET id = id WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if touched.rows_affected() == 0 {
        return Ok(None);
    }
    load_conversation(conn, id).await
}

/// Look up a 1:1 conversation by its normalized participant pair
pub async fn find_by_direct_key(
    pool: &SqlitePool,
    key: &str,
) -> Result<Option<Conversation>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM conversations WHERE direct_key = ?",
        CONVERSATION_COLUMNS
    ))
    .bind(key)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let mut conn = pool.acquire().await?;
            Ok(Some(load_members(&mut conn, &row).await?))
        }
        None => Ok(None),
    }
}

/// All conversations `user_id` participates in
pub async fn conversations_for_user(
    pool: &SqlitePool,
    user_id: UserId,
) -> Result<Vec<Conversation>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM conversations
        WHERE id IN (SELECT conversation_id FROM conversation_participants WHERE user_id = ?)
        "#,
        CONVERSATION_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut conn = pool.acquire().await?;
    let mut conversations = Vec::with_capacity(rows.len());
    for row in &rows {
        conversations.push(load_members(&mut conn, row).await?);
    }
    Ok(conversations)
}

pub async fn conversation_ids_for_user(
    pool: &SqlitePool,
    user_id: UserId,
) -> Result<Vec<ConversationId>, sqlx::Error> {
    sqlx::query_scalar("SELECT conversation_id FROM conversation_participants WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

async fn write_members(
    conn: &mut SqliteConnection,
    conversation: &Conversation,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM conversation_participants WHERE conversation_id = ?")
        .bind(conversation.id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM conversation_admins WHERE conversation_id = ?")
        .bind(conversation.id)
        .execute(&mut *conn)
        .await?;

    for (position, user_id) in conversation.participants.iter().enumerate() {
        sqlx::query(
            "INSERT INTO conversation_participants (conversation_id, user_id, position) VALUES (?, ?, ?)",
        )
        .bind(conversation.id)
        .bind(user_id)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }
    for user_id in &conversation.admins {
        sqlx::query("INSERT INTO conversation_admins (conversation_id, user_id) VALUES (?, ?)")
            .bind(conversation.id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Insert a new conversation with its members
///
/// Fails with a unique violation when `direct_key` is already taken.
pub async fn insert_conversation(
    pool: &SqlitePool,
    conversation: &Conversation,
    direct_key: Option<&str>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO conversations (id, is_group, group_name, group_image, group_image_storage_id, direct_key, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(conversation.id)
    .bind(conversation.is_group as i64)
    .bind(&conversation.group_name)
    .bind(&conversation.group_image)
    .bind(conversation.group_image_storage_id)
    .bind(direct_key)
    .bind(to_millis(conversation.created_at))
    .execute(&mut *tx)
    .await?;

    write_members(&mut tx, conversation).await?;
    tx.commit().await
}

/// Replace participants and admins with those of `conversation`
pub async fn replace_members(
    conn: &mut SqliteConnection,
    conversation: &Conversation,
) -> Result<(), sqlx::Error> {
    write_members(conn, conversation).await
}

/// Overwrite group name and image
pub async fn update_group_fields(
    executor: impl SqliteExecutor<'_>,
    id: ConversationId,
    group_name: Option<&str>,
    group_image: Option<&str>,
    group_image_storage_id: Option<StorageId>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE conversations SET group_name = ?, group_image = ?, group_image_storage_id = ? WHERE id = ?",
    )
    .bind(group_name)
    .bind(group_image)
    .bind(group_image_storage_id)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Delete a conversation; members and messages cascade
pub async fn delete_conversation(
    executor: impl SqliteExecutor<'_>,
    id: ConversationId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
