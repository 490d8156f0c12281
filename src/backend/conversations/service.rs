//! Conversation resolver
//!
//! Finds or creates conversations and manages group membership. Every
//! operation runs on behalf of an authenticated caller. The membership rules
//! live on `Conversation`; membership changes run in a transaction that
//! locks the conversation first.

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::backend::conversations::db as conversation_db;
use crate::backend::error::{is_unique_violation, BackendError};
use crate::backend::messaging::db as message_db;
use crate::backend::server::state::AppState;
use crate::backend::storage::handlers::FILE_IN_USE;
use crate::backend::storage::{attach_blob, discard_blob};
use crate::backend::users::db as user_db;
use crate::shared::messaging::{
    dedup_participants, direct_key, normalize_group_name, AddParticipantsRequest, Conversation,
    ConversationId, ConversationSummary, GroupInfo, StorageId, UpdateAdminsRequest,
    UpdateGroupInfoRequest, UpsertConversationRequest, UpsertConversationResponse, User, UserId,
};
use crate::shared::RealtimeEvent;

pub const CONVERSATION_NOT_FOUND: &str = "Conversation not found";

/// Load a conversation the caller participates in
pub async fn load_for_participant(
    state: &AppState,
    conversation_id: ConversationId,
    caller: &User,
) -> Result<Conversation, BackendError> {
    let conversation = conversation_db::get_conversation(&state.pool, conversation_id)
        .await?
        .ok_or_else(|| BackendError::not_found(CONVERSATION_NOT_FOUND))?;
    conversation.ensure_participant(caller.id)?;
    Ok(conversation)
}

/// Like `load_for_participant`, holding the write lock of `conn`'s transaction
async fn lock_for_participant(
    conn: &mut SqliteConnection,
    conversation_id: ConversationId,
    caller: &User,
) -> Result<Conversation, BackendError> {
    let conversation = conversation_db::lock_conversation(conn, conversation_id)
        .await?
        .ok_or_else(|| BackendError::not_found(CONVERSATION_NOT_FOUND))?;
    conversation.ensure_participant(caller.id)?;
    Ok(conversation)
}

async fn ensure_users_exist(
    conn: &mut SqliteConnection,
    ids: &[UserId],
) -> Result<(), BackendError> {
    let found = user_db::get_users_by_ids(conn, ids).await?;
    if found.len() != ids.len() {
        return Err(BackendError::not_found("User not found"));
    }
    Ok(())
}

fn publish_updated(state: &AppState, conversation: &Conversation) {
    state
        .broadcast
        .publish(RealtimeEvent::conversation_updated(conversation));
}

/// Point the group image at `storage_id`, returning the blob it replaced
///
/// Re-sending the current image is a no-op.
async fn set_group_image(
    state: &AppState,
    caller: &User,
    conversation: &mut Conversation,
    storage_id: StorageId,
) -> Result<Option<StorageId>, BackendError> {
    if conversation.group_image_storage_id == Some(storage_id) {
        return Ok(None);
    }
    conversation.group_image = Some(attach_blob(state, storage_id, caller).await?);
    Ok(conversation.group_image_storage_id.replace(storage_id))
}

async fn write_group_fields(state: &AppState, conversation: &Conversation) -> Result<(), BackendError> {
    conversation_db::update_group_fields(
        &state.pool,
        conversation.id,
        conversation.group_name.as_deref(),
        conversation.group_image.as_deref(),
        conversation.group_image_storage_id,
    )
    .await
    .map_err(|e| BackendError::unique_conflict(e, FILE_IN_USE))
}

/// Apply a name/image patch from an upsert to an existing conversation
async fn patch_existing(
    state: &AppState,
    caller: &User,
    mut conversation: Conversation,
    group_name: Option<String>,
    group_image: Option<StorageId>,
) -> Result<Conversation, BackendError> {
    let group_name = group_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    if group_name.is_none() && group_image.is_none() {
        return Ok(conversation);
    }
    conversation.ensure_can_manage(caller.id)?;

    if let Some(name) = group_name {
        conversation.group_name = Some(name);
    }
    let replaced_image = match group_image {
        Some(storage_id) => set_group_image(state, caller, &mut conversation, storage_id).await?,
        None => None,
    };

    write_group_fields(state, &conversation).await?;
    if let Some(old) = replaced_image {
        discard_blob(state, old).await;
    }
    publish_updated(state, &conversation);
    Ok(conversation)
}

/// Find or create a conversation
///
/// - With `id`: patch that conversation's name/image
/// - Direct: the sorted participant pair identifies the conversation
/// - Group: always a new conversation; the caller administers it unless
///   admins are given
pub async fn upsert_conversation(
    state: &AppState,
    caller: &User,
    request: UpsertConversationRequest,
) -> Result<UpsertConversationResponse, BackendError> {
    if let Some(id) = request.id {
        let existing = load_for_participant(state, id, caller).await?;
        let patched =
            patch_existing(state, caller, existing, request.group_name, request.group_image).await?;
        return Ok(UpsertConversationResponse {
            conversation_id: patched.id,
            created: false,
        });
    }

    let mut participants = dedup_participants(&request.participants);
    if !participants.contains(&caller.id) {
        participants.push(caller.id);
    }

    let key = if request.is_group {
        if participants.len() < 2 {
            return Err(BackendError::validation(
                "A group needs at least one other participant",
            ));
        }
        None
    } else {
        if participants.len() != 2 {
            return Err(BackendError::validation(
                "A direct conversation has exactly two participants",
            ));
        }
        participants.sort();
        let key = direct_key(participants[0], participants[1]);
        if let Some(existing) = conversation_db::find_by_direct_key(&state.pool, &key).await? {
            let patched =
                patch_existing(state, caller, existing, request.group_name, request.group_image)
                    .await?;
            return Ok(UpsertConversationResponse {
                conversation_id: patched.id,
                created: false,
            });
        }
        Some(key)
    };

    {
        let mut conn = state.pool.acquire().await?;
        ensure_users_exist(&mut conn, &participants).await?;
    }

    let group_image = match request.group_image {
        Some(storage_id) => Some(attach_blob(state, storage_id, caller).await?),
        None => None,
    };
    let admins = if request.is_group {
        let admins: Vec<UserId> = dedup_participants(&request.admins.unwrap_or_default())
            .into_iter()
            .filter(|id| participants.contains(id))
            .collect();
        if admins.is_empty() {
            vec![caller.id]
        } else {
            admins
        }
    } else {
        Vec::new()
    };

    let conversation = Conversation {
        id: Uuid::new_v4(),
        participants,
        is_group: request.is_group,
        group_name: request
            .group_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
        group_image,
        group_image_storage_id: request.group_image,
        admins,
        created_at: Utc::now(),
    };

    if let Err(err) =
        conversation_db::insert_conversation(&state.pool, &conversation, key.as_deref()).await
    {
        if !is_unique_violation(&err) {
            return Err(BackendError::from(err));
        }
        // Lost a race against a concurrent create of the same pair
        if let Some(key) = key.as_deref() {
            if let Some(existing) = conversation_db::find_by_direct_key(&state.pool, key).await? {
                return Ok(UpsertConversationResponse {
                    conversation_id: existing.id,
                    created: false,
                });
            }
        }
        return Err(BackendError::conflict(FILE_IN_USE));
    }

    tracing::info!(
        conversation_id = %conversation.id,
        is_group = conversation.is_group,
        participants = conversation.participants.len(),
        "[Conversations] conversation created"
    );
    Ok(UpsertConversationResponse {
        conversation_id: conversation.id,
        created: true,
    })
}

/// Add members to a group; existing members keep their order
pub async fn add_participants(
    state: &AppState,
    caller: &User,
    conversation_id: ConversationId,
    request: AddParticipantsRequest,
) -> Result<Conversation, BackendError> {
    let mut tx = state.pool.begin().await?;
    let mut conversation = lock_for_participant(&mut tx, conversation_id, caller).await?;
    conversation.ensure_group_admin(caller.id)?;

    let additions: Vec<UserId> = dedup_participants(&request.participants)
        .into_iter()
        .filter(|id| !conversation.has_participant(*id))
        .collect();
    if additions.is_empty() {
        return Ok(conversation);
    }
    ensure_users_exist(&mut tx, &additions).await?;

    conversation.participants.extend(additions.iter().copied());
    conversation_db::replace_members(&mut tx, &conversation).await?;
    tx.commit().await?;

    publish_updated(state, &conversation);
    tracing::info!(
        conversation_id = %conversation.id,
        added = additions.len(),
        "[Conversations] participants added"
    );
    Ok(conversation)
}

/// Remove a member from a group
///
/// Admins may remove anyone; members may remove themselves. Returns `None`
/// when the last member left and the group was deleted.
pub async fn kick_user(
    state: &AppState,
    caller: &User,
    conversation_id: ConversationId,
    user_id: UserId,
) -> Result<Option<Conversation>, BackendError> {
    let mut tx = state.pool.begin().await?;
    let mut conversation = lock_for_participant(&mut tx, conversation_id, caller).await?;
    conversation.ensure_can_remove(caller.id, user_id)?;
    if !conversation.has_participant(user_id) {
        return Err(BackendError::not_found("User is not part of this conversation"));
    }

    let promoted = conversation.remove_member(user_id);
    if conversation.participants.is_empty() {
        let blobs = delete_rows(&mut tx, &conversation).await?;
        tx.commit().await?;
        finish_removal(state, conversation.id, blobs).await;
        return Ok(None);
    }

    conversation_db::replace_members(&mut tx, &conversation).await?;
    tx.commit().await?;

    if let Some(promoted) = promoted {
        tracing::info!(
            conversation_id = %conversation.id,
            user_id = %promoted,
            "[Conversations] promoted first member after last admin left"
        );
    }
    publish_updated(state, &conversation);
    Ok(Some(conversation))
}

/// Replace the admin list of a group
pub async fn update_admins(
    state: &AppState,
    caller: &User,
    conversation_id: ConversationId,
    request: UpdateAdminsRequest,
) -> Result<Conversation, BackendError> {
    let mut tx = state.pool.begin().await?;
    let mut conversation = lock_for_participant(&mut tx, conversation_id, caller).await?;
    conversation.ensure_group_admin(caller.id)?;
    conversation.set_admins(&request.admins)?;

    conversation_db::replace_members(&mut tx, &conversation).await?;
    tx.commit().await?;
    publish_updated(state, &conversation);
    Ok(conversation)
}

/// Rename a group and replace or remove its image
pub async fn update_group_info(
    state: &AppState,
    caller: &User,
    conversation_id: ConversationId,
    request: UpdateGroupInfoRequest,
) -> Result<GroupInfo, BackendError> {
    let mut conversation = load_for_participant(state, conversation_id, caller).await?;
    conversation.ensure_group_admin(caller.id)?;
    conversation.group_name = Some(normalize_group_name(&request.group_name)?);

    let discarded = if request.remove_image {
        conversation.group_image = None;
        conversation.group_image_storage_id.take()
    } else if let Some(storage_id) = request.group_image {
        set_group_image(state, caller, &mut conversation, storage_id).await?
    } else {
        None
    };

    write_group_fields(state, &conversation).await?;
    if let Some(old) = discarded {
        discard_blob(state, old).await;
    }
    publish_updated(state, &conversation);

    Ok(GroupInfo {
        group_name: conversation.group_name,
        group_image: conversation.group_image,
    })
}

/// Delete the conversation inside a transaction
///
/// Returns the blobs that were referenced; they are discarded once the
/// transaction has committed.
async fn delete_rows(
    conn: &mut SqliteConnection,
    conversation: &Conversation,
) -> Result<Vec<StorageId>, BackendError> {
    let mut blobs = message_db::storage_ids_for_conversation(&mut *conn, conversation.id).await?;
    blobs.extend(conversation.group_image_storage_id);
    conversation_db::delete_conversation(&mut *conn, conversation.id).await?;
    Ok(blobs)
}

async fn finish_removal(state: &AppState, conversation_id: ConversationId, blobs: Vec<StorageId>) {
    for storage_id in blobs {
        discard_blob(state, storage_id).await;
    }
    state
        .broadcast
        .publish(RealtimeEvent::conversation_deleted(conversation_id));
    tracing::info!(conversation_id = %conversation_id, "[Conversations] conversation deleted");
}

/// Delete a conversation with its messages and blobs
///
/// Groups can be deleted by admins, direct conversations by either side.
pub async fn delete_conversation(
    state: &AppState,
    caller: &User,
    conversation_id: ConversationId,
) -> Result<(), BackendError> {
    let mut tx = state.pool.begin().await?;
    let conversation = lock_for_participant(&mut tx, conversation_id, caller).await?;
    conversation.ensure_can_manage(caller.id)?;

    let blobs = delete_rows(&mut tx, &conversation).await?;
    tx.commit().await?;
    finish_removal(state, conversation.id, blobs).await;
    Ok(())
}

/// The caller's conversations, most recently active first
pub async fn get_my_conversations(
    state: &AppState,
    caller: &User,
) -> Result<Vec<ConversationSummary>, BackendError> {
    let conversations = conversation_db::conversations_for_user(&state.pool, caller.id).await?;

    let mut summaries = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let other_user = match (conversation.is_group, conversation.other_participant(caller.id)) {
            (false, Some(other)) => user_db::get_user_by_id(&state.pool, other).await?,
            _ => None,
        };
        let last_message = message_db::last_message(&state.pool, conversation.id).await?;
        summaries.push(ConversationSummary {
            conversation,
            other_user,
            last_message,
        });
    }

    summaries.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
    Ok(summaries)
}
