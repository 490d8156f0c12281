//! Database operations for messages
//!
//! Payload, receivers, readers and reply snapshot are stored as JSON text.
//! `message_type` is kept in its own column so it can be filtered on without
//! parsing the payload.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteExecutor, SqlitePool};

use crate::backend::server::clock::{from_millis, to_millis};
use crate::shared::messaging::{ConversationId, Message, MessageId, StorageId, UserId};

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, payload, storage_id, receivers, readers, reply, created_at";

fn decode_json<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

fn message_from_row(row: &SqliteRow) -> Result<Message, sqlx::Error> {
    let reply: Option<String> = row.get("reply");
    Ok(Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        sender: row.get("sender_id"),
        payload: decode_json("payload", row.get("payload"))?,
        storage_id: row.get("storage_id"),
        receivers: decode_json("receivers", row.get("receivers"))?,
        readers: decode_json("readers", row.get("readers"))?,
        reply: reply.as_deref().map(|raw| decode_json("reply", raw)).transpose()?,
        created_at: from_millis(row.get("created_at")),
    })
}

pub async fn insert_message(pool: &SqlitePool, message: &Message) -> Result<(), sqlx::Error> {
    let reply = message.reply.as_ref().map(encode_json).transpose()?;

    sqlx::query(
        r#"
        INSERT INTO messages (id, conversation_id, sender_id, message_type, payload, storage_id, receivers, readers, reply, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(message.id)
    .bind(message.conversation_id)
    .bind(message.sender)
    .bind(message.message_type().as_str())
    .bind(encode_json(&message.payload)?)
    .bind(message.storage_id)
    .bind(encode_json(&message.receivers)?)
    .bind(encode_json(&message.readers)?)
    .bind(reply)
    .bind(to_millis(message.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_message(pool: &SqlitePool, id: MessageId) -> Result<Option<Message>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM messages WHERE id = ?", MESSAGE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(message_from_row).transpose()
}

/// Messages of a conversation, oldest first
pub async fn messages_for_conversation(
    pool: &SqlitePool,
    conversation_id: ConversationId,
) -> Result<Vec<Message>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM messages WHERE conversation_id = ? ORDER BY created_at, rowid",
        MESSAGE_COLUMNS
    ))
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(message_from_row).collect()
}

/// Most recent message of a conversation
pub async fn last_message(
    pool: &SqlitePool,
    conversation_id: ConversationId,
) -> Result<Option<Message>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM messages WHERE conversation_id = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
        MESSAGE_COLUMNS
    ))
    .bind(conversation_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(message_from_row).transpose()
}

/// Storage ids referenced by the messages of a conversation
pub async fn storage_ids_for_conversation(
    executor: impl SqliteExecutor<'_>,
    conversation_id: ConversationId,
) -> Result<Vec<StorageId>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT storage_id FROM messages WHERE conversation_id = ? AND storage_id IS NOT NULL",
    )
    .bind(conversation_id)
    .fetch_all(executor)
    .await
}

/// Append `reader` to the readers list unless already present
///
/// Returns whether the list changed. The check and the append happen in one
/// statement so concurrent readers are never lost.
pub async fn add_reader(
    pool: &SqlitePool,
    id: MessageId,
    reader: UserId,
) -> Result<bool, sqlx::Error> {
    let reader = reader.to_string();
    let result = sqlx::query(
        r#"
        UPDATE messages SET readers = json_insert(readers, '$[#]', ?)
        WHERE id = ?
          AND NOT EXISTS (SELECT 1 FROM json_each(messages.readers) WHERE value = ?)
        "#,
    )
    .bind(&reader)
    .bind(id)
    .bind(&reader)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Persist a tombstoned message: payload, type, reply and storage id
pub async fn write_tombstone(pool: &SqlitePool, message: &Message) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE messages SET message_type = ?, payload = ?, reply = NULL, storage_id = NULL WHERE id = ?",
    )
    .bind(message.message_type().as_str())
    .bind(encode_json(&message.payload)?)
    .bind(message.id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_message(pool: &SqlitePool, id: MessageId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM messages WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// A message selected for expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiredMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub storage_id: Option<StorageId>,
}

/// Up to `limit` messages older than `cutoff_millis`, oldest first
pub async fn expired_messages(
    pool: &SqlitePool,
    cutoff_millis: i64,
    limit: u32,
) -> Result<Vec<ExpiredMessage>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, conversation_id, storage_id FROM messages WHERE created_at < ? ORDER BY created_at, rowid LIMIT ?",
    )
    .bind(cutoff_millis)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ExpiredMessage {
            id: row.get("id"),
            conversation_id: row.get("conversation_id"),
            storage_id: row.get("storage_id"),
        })
        .collect())
}

/// Delete a batch of messages by id
pub async fn delete_messages(pool: &SqlitePool, ids: &[MessageId]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM messages WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let result = query.build().execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::conversations::db as conversation_db;
    use crate::backend::server::config::load_database;
    use crate::shared::messaging::{Conversation, MessagePayload, ReplySnapshot};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    async fn setup() -> (SqlitePool, Conversation) {
        let pool = load_database("sqlite::memory:").await.unwrap();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            participants: vec![Uuid::new_v4(), Uuid::new_v4()],
            is_group: false,
            group_name: None,
            group_image: None,
            group_image_storage_id: None,
            admins: vec![],
            created_at: Utc::now(),
        };
        conversation_db::insert_conversation(&pool, &conversation, None)
            .await
            .unwrap();
        (pool, conversation)
    }

    fn message(conversation: &Conversation, text: &str, age: Duration) -> Message {
        let sender = conversation.participants[0];
        Message {
            id: Uuid::new_v4(),
            conversation_id: conversation.id,
            sender,
            payload: MessagePayload::text(text),
            storage_id: None,
            receivers: conversation.receivers_for(sender),
            readers: vec![sender],
            reply: None,
            created_at: Utc::now() - age,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_in_order() {
        let (pool, conversation) = setup().await;
        let older = message(&conversation, "first", Duration::minutes(5));
        let mut newer = message(&conversation, "second", Duration::zero());
        newer.reply = Some(ReplySnapshot {
            message_id: older.id,
            quoted_type: older.message_type(),
            quoted_payload: Some(older.payload.clone()),
            participant: None,
        });

        insert_message(&pool, &newer).await.unwrap();
        insert_message(&pool, &older).await.unwrap();

        let listed = messages_for_conversation(&pool, conversation.id).await.unwrap();
        assert_eq!(listed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![older.id, newer.id]);
        assert_eq!(listed[1].reply, newer.reply);
        assert_eq!(last_message(&pool, conversation.id).await.unwrap().map(|m| m.id), Some(newer.id));
    }

    #[tokio::test]
    async fn test_add_reader_appends_once() {
        let (pool, conversation) = setup().await;
        let stored = message(&conversation, "hi", Duration::zero());
        insert_message(&pool, &stored).await.unwrap();
        let reader = conversation.participants[1];

        assert!(add_reader(&pool, stored.id, reader).await.unwrap());
        assert!(!add_reader(&pool, stored.id, reader).await.unwrap());
        assert!(!add_reader(&pool, stored.id, stored.sender).await.unwrap());

        let loaded = get_message(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.readers, vec![stored.sender, reader]);
    }

    #[tokio::test]
    async fn test_storage_id_is_referenced_once() {
        let (pool, conversation) = setup().await;
        let storage_id = Uuid::new_v4();
        let mut first = message(&conversation, "a", Duration::zero());
        first.storage_id = Some(storage_id);
        let mut second = message(&conversation, "b", Duration::zero());
        second.storage_id = Some(storage_id);

        insert_message(&pool, &first).await.unwrap();
        let err = insert_message(&pool, &second).await.unwrap_err();
        assert!(crate::backend::error::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_expired_messages_oldest_first() {
        let (pool, conversation) = setup().await;
        let ancient = message(&conversation, "a", Duration::hours(30));
        let old = message(&conversation, "b", Duration::hours(25));
        let fresh = message(&conversation, "c", Duration::hours(1));
        for m in [&fresh, &old, &ancient] {
            insert_message(&pool, m).await.unwrap();
        }

        let cutoff = to_millis(Utc::now() - Duration::hours(24));
        let expired = expired_messages(&pool, cutoff, 10).await.unwrap();
        assert_eq!(expired.iter().map(|m| m.id).collect::<Vec<_>>(), vec![ancient.id, old.id]);

        let deleted = delete_messages(&pool, &[ancient.id, old.id]).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(get_message(&pool, fresh.id).await.unwrap().is_some());
    }
}
