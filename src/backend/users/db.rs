//! Database operations for users
//!
//! Users are keyed by `token_identifier`, the `<issuer>|<subject>` pair of
//! the identity provider. Rows are only written by the webhook handlers.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::backend::server::clock::{from_millis, to_millis};
use crate::shared::messaging::{User, UserId, UserRole};

const USER_COLUMNS: &str =
    "id, token_identifier, name, email, image, is_online, role, created_at";

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        token_identifier: row.get("token_identifier"),
        name: row.get("name"),
        email: row.get("email"),
        image: row.get("image"),
        is_online: row.get::<i64, _>("is_online") != 0,
        role: UserRole::parse(row.get("role")).unwrap_or_default(),
        created_at: from_millis(row.get("created_at")),
    }
}

/// Insert a user, or refresh profile and presence of an existing one
///
/// Identity providers may retry `user.created`; the second delivery must not
/// create a duplicate row.
pub async fn create_user(
    pool: &SqlitePool,
    token_identifier: &str,
    name: &str,
    email: &str,
    image: &str,
    role: UserRole,
) -> Result<User, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO users (id, token_identifier, name, email, image, is_online, role, created_at)
        VALUES (?, ?, ?, ?, ?, 1, ?, ?)
        ON CONFLICT (token_identifier) DO UPDATE SET
            name = excluded.name,
            email = excluded.email,
            image = excluded.image,
            role = excluded.role,
            is_online = 1
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(token_identifier)
    .bind(name)
    .bind(email)
    .bind(image)
    .bind(role.as_str())
    .bind(to_millis(chrono::Utc::now()))
    .fetch_one(pool)
    .await?;

    Ok(user_from_row(&row))
}

/// Patch name and image, and the role when one is given
///
/// Returns `None` when the user does not exist.
pub async fn update_user(
    pool: &SqlitePool,
    token_identifier: &str,
    name: &str,
    image: &str,
    role: Option<UserRole>,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "UPDATE users SET name = ?, image = ?, role = COALESCE(?, role) WHERE token_identifier = ? RETURNING {}",
        USER_COLUMNS
    ))
    .bind(name)
    .bind(image)
    .bind(role.map(|r| r.as_str()))
    .bind(token_identifier)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(user_from_row))
}

/// Delete a user; returns the removed row
pub async fn delete_user_by_token(
    pool: &SqlitePool,
    token_identifier: &str,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "DELETE FROM users WHERE token_identifier = ? RETURNING {}",
        USER_COLUMNS
    ))
    .bind(token_identifier)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(user_from_row))
}

/// Set the presence flag
pub async fn set_online(
    pool: &SqlitePool,
    token_identifier: &str,
    is_online: bool,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "UPDATE users SET is_online = ? WHERE token_identifier = ? RETURNING {}",
        USER_COLUMNS
    ))
    .bind(is_online as i64)
    .bind(token_identifier)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(user_from_row))
}

pub async fn get_user_by_token(
    pool: &SqlitePool,
    token_identifier: &str,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE token_identifier = ?",
        USER_COLUMNS
    ))
    .bind(token_identifier)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(user_from_row))
}

pub async fn get_user_by_id(pool: &SqlitePool, id: UserId) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(user_from_row))
}

/// Load several users at once; unknown ids are silently skipped
pub async fn get_users_by_ids(
    executor: impl SqliteExecutor<'_>,
    ids: &[UserId],
) -> Result<Vec<User>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM users WHERE id IN (", USER_COLUMNS));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows = query.build().fetch_all(executor).await?;
    Ok(rows.iter().map(user_from_row).collect())
}

/// Every user except `exclude`, ordered by name
pub async fn list_users_except(pool: &SqlitePool, exclude: UserId) -> Result<Vec<User>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM users WHERE id != ? ORDER BY COALESCE(name, ''), id",
        USER_COLUMNS
    ))
    .bind(exclude)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(user_from_row).collect())
}

/// Position after which a page continues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPosition {
    pub name: String,
    pub id: UserId,
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Keyset-paginated user search
///
/// Orders by `(name, id)` and returns at most `limit` rows strictly after
/// `after`. Matches the search term against name and email.
pub async fn search_users(
    pool: &SqlitePool,
    exclude: UserId,
    search: Option<&str>,
    after: Option<&SearchPosition>,
    limit: u32,
) -> Result<Vec<User>, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM users WHERE id != ",
        USER_COLUMNS
    ));
    query.push_bind(exclude);

    if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(term);
        query
            .push(" AND (COALESCE(name, '') LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR email LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(position) = after {
        query
            .push(" AND (COALESCE(name, '') > ")
            .push_bind(position.name.clone())
            .push(" OR (COALESCE(name, '') = ")
            .push_bind(position.name.clone())
            .push(" AND id > ")
            .push_bind(position.id)
            .push("))");
    }

    query
        .push(" ORDER BY COALESCE(name, ''), id LIMIT ")
        .push_bind(limit as i64);

    let rows = query.build().fetch_all(pool).await?;
    Ok(rows.iter().map(user_from_row).collect())
}
