//! User operations
//!
//! Writes come from the identity-provider webhook; reads serve the
//! authenticated API.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::backend::conversations::db as conversation_db;
use crate::backend::conversations::load_for_participant;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::backend::users::db::{self as user_db, SearchPosition};
use crate::shared::messaging::{ConversationId, User, UserPage, UserRole, UserSearchParams};
use crate::shared::RealtimeEvent;

/// Page size when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

pub async fn create_user(
    state: &AppState,
    token_identifier: &str,
    name: &str,
    email: &str,
    image: &str,
    role: UserRole,
) -> Result<User, BackendError> {
    let user =
        user_db::create_user(&state.pool, token_identifier, name, email, image, role).await?;
    tracing::info!(user_id = %user.id, role = role.as_str(), "[Users] user created");
    Ok(user)
}

pub async fn update_user(
    state: &AppState,
    token_identifier: &str,
    name: &str,
    image: &str,
    role: Option<UserRole>,
) -> Result<User, BackendError> {
    let user = user_db::update_user(&state.pool, token_identifier, name, image, role)
        .await?
        .ok_or_else(|| BackendError::not_found("User not found"))?;
    tracing::info!(user_id = %user.id, "[Users] user updated");
    Ok(user)
}

/// Remove a user
///
/// Messages and memberships are kept; readers see the placeholder snapshot.
pub async fn delete_user(state: &AppState, token_identifier: &str) -> Result<User, BackendError> {
    let user = user_db::delete_user_by_token(&state.pool, token_identifier)
        .await?
        .ok_or_else(|| BackendError::not_found("User not found"))?;
    tracing::info!(user_id = %user.id, "[Users] user deleted");
    Ok(user)
}

/// Update presence and tell every conversation of the user
pub async fn set_presence(
    state: &AppState,
    token_identifier: &str,
    is_online: bool,
) -> Result<User, BackendError> {
    let user = user_db::set_online(&state.pool, token_identifier, is_online)
        .await?
        .ok_or_else(|| BackendError::not_found("User not found"))?;

    let conversations = conversation_db::conversation_ids_for_user(&state.pool, user.id).await?;
    for conversation_id in &conversations {
        state
            .broadcast
            .publish(RealtimeEvent::presence_changed(*conversation_id, user.id, is_online));
    }
    tracing::debug!(
        user_id = %user.id,
        is_online,
        conversations = conversations.len(),
        "[Users] presence changed"
    );
    Ok(user)
}

/// Everyone except the caller
pub async fn get_users(state: &AppState, caller: &User) -> Result<Vec<User>, BackendError> {
    Ok(user_db::list_users_except(&state.pool, caller.id).await?)
}

/// Encode a page position as an opaque cursor
pub fn encode_cursor(position: &SearchPosition) -> String {
    let raw = serde_json::json!([position.name, position.id]).to_string();
    URL_SAFE_NO_PAD.encode(raw)
}

/// Decode a cursor produced by `encode_cursor`
pub fn decode_cursor(cursor: &str) -> Result<SearchPosition, BackendError> {
    let invalid = || BackendError::validation("Invalid cursor");
    let raw = URL_SAFE_NO_PAD.decode(cursor).map_err(|_| invalid())?;
    let (name, id): (String, uuid::Uuid) = serde_json::from_slice(&raw).map_err(|_| invalid())?;
    Ok(SearchPosition { name, id })
}

/// Paged user search over name and email, excluding the caller
pub async fn paged_users(
    state: &AppState,
    caller: &User,
    params: &UserSearchParams,
) -> Result<UserPage, BackendError> {
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let after = params
        .cursor
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(decode_cursor)
        .transpose()?;

    let mut page = user_db::search_users(
        &state.pool,
        caller.id,
        params.search.as_deref(),
        after.as_ref(),
        page_size + 1,
    )
    .await?;

    let is_done = page.len() <= page_size as usize;
    page.truncate(page_size as usize);
    let continue_cursor = if is_done {
        None
    } else {
        page.last().map(|user| {
            encode_cursor(&SearchPosition {
                name: user.name.clone().unwrap_or_default(),
                id: user.id,
            })
        })
    };

    Ok(UserPage {
        page,
        continue_cursor,
        is_done,
    })
}

/// Members of a conversation, in participant order
pub async fn get_group_members(
    state: &AppState,
    caller: &User,
    conversation_id: ConversationId,
) -> Result<Vec<User>, BackendError> {
    let conversation = load_for_participant(state, conversation_id, caller).await?;

    let users = user_db::get_users_by_ids(&state.pool, &conversation.participants).await?;
    let mut members = Vec::with_capacity(users.len());
    for id in &conversation.participants {
        if let Some(user) = users.iter().find(|u| u.id == *id) {
            members.push(user.clone());
        }
    }
    Ok(members)
}
