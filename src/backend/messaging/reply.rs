//! Reply snapshots and the per-request user snapshot cache

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::backend::error::BackendError;
use crate::backend::messaging::db as message_db;
use crate::backend::users::db as user_db;
use crate::shared::messaging::{
    ConversationId, MessageId, ParticipantSnapshot, ReplySnapshot, UserId,
};

/// Loads each referenced user at most once per request
///
/// Users that no longer exist resolve to `ParticipantSnapshot::placeholder`
/// and are cached as such.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: HashMap<UserId, ParticipantSnapshot>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a batch of users with a single query
    pub async fn prime(&mut self, pool: &SqlitePool, ids: &[UserId]) -> Result<(), sqlx::Error> {
        let missing: Vec<UserId> = ids
            .iter()
            .copied()
            .filter(|id| !self.entries.contains_key(id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        for user in user_db::get_users_by_ids(pool, &missing).await? {
            self.entries.insert(user.id, ParticipantSnapshot::from(&user));
        }
        for id in missing {
            self.entries
                .entry(id)
                .or_insert_with(|| ParticipantSnapshot::placeholder(id));
        }
        Ok(())
    }

    pub async fn get(&mut self, pool: &SqlitePool, id: UserId) -> Result<ParticipantSnapshot, sqlx::Error> {
        if let Some(snapshot) = self.entries.get(&id) {
            return Ok(snapshot.clone());
        }

        let snapshot = match user_db::get_user_by_id(pool, id).await? {
            Some(user) => ParticipantSnapshot::from(&user),
            None => ParticipantSnapshot::placeholder(id),
        };
        self.entries.insert(id, snapshot.clone());
        Ok(snapshot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the snapshot of a quoted message
///
/// A quoted message that no longer exists yields `None`. Quoting a message
/// of another conversation is rejected.
pub async fn build_reply(
    pool: &SqlitePool,
    cache: &mut SnapshotCache,
    conversation_id: ConversationId,
    quoted_id: MessageId,
) -> Result<Option<ReplySnapshot>, BackendError> {
    let Some(quoted) = message_db::get_message(pool, quoted_id).await? else {
        tracing::debug!(message_id = %quoted_id, "quoted message is gone; sending without snapshot");
        return Ok(None);
    };

    if quoted.conversation_id != conversation_id {
        return Err(BackendError::validation(
            "Quoted message belongs to another conversation",
        ));
    }

    let participant = cache.get(pool, quoted.sender).await?;
    Ok(Some(ReplySnapshot {
        message_id: quoted.id,
        quoted_type: quoted.message_type(),
        quoted_payload: Some(quoted.payload),
        participant: Some(participant),
    }))
}
