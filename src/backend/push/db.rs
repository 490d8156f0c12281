//! Database operations for push subscriptions

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::backend::server::clock::to_millis;
use crate::shared::messaging::{PushKeys, PushSubscription, StoredPushSubscription, UserId};

fn subscription_from_row(row: &SqliteRow) -> StoredPushSubscription {
    StoredPushSubscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        subscription: PushSubscription {
            endpoint: row.get("endpoint"),
            expiration_time: row.get("expiration_time"),
            keys: PushKeys {
                p256dh: row.get("p256dh"),
                auth: row.get("auth"),
            },
        },
    }
}

/// Store a subscription, replacing the keys of an existing (user, endpoint)
pub async fn save_subscription(
    pool: &SqlitePool,
    user_id: UserId,
    subscription: &PushSubscription,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO push_subscriptions (id, user_id, endpoint, expiration_time, p256dh, auth, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, endpoint) DO UPDATE SET
            expiration_time = excluded.expiration_time,
            p256dh = excluded.p256dh,
            auth = excluded.auth
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&subscription.endpoint)
    .bind(subscription.expiration_time)
    .bind(&subscription.keys.p256dh)
    .bind(&subscription.keys.auth)
    .bind(to_millis(chrono::Utc::now()))
    .fetch_one(pool)
    .await
}

pub async fn remove_subscription(
    pool: &SqlitePool,
    user_id: UserId,
    endpoint: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM push_subscriptions WHERE user_id = ? AND endpoint = ?")
        .bind(user_id)
        .bind(endpoint)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn subscriptions_for_user(
    pool: &SqlitePool,
    user_id: UserId,
) -> Result<Vec<StoredPushSubscription>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, endpoint, expiration_time, p256dh, auth
        FROM push_subscriptions
        WHERE user_id = ?
        ORDER BY created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(subscription_from_row).collect())
}

pub async fn remove_by_id(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM push_subscriptions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::server::config::load_database;

    fn subscription(endpoint: &str, auth: &str) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.to_string(),
            expiration_time: None,
            keys: PushKeys {
                p256dh: "BPub".to_string(),
                auth: auth.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_save_upserts_by_user_and_endpoint() {
        let pool = load_database("sqlite::memory:").await.unwrap();
        let user = Uuid::new_v4();

        let first = save_subscription(&pool, user, &subscription("https://push/1", "a")).await.unwrap();
        let second = save_subscription(&pool, user, &subscription("https://push/1", "b")).await.unwrap();
        assert_eq!(first, second);

        let stored = subscriptions_for_user(&pool, user).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].subscription.keys.auth, "b");
    }

    #[tokio::test]
    async fn test_remove_is_scoped_to_user() {
        let pool = load_database("sqlite::memory:").await.unwrap();
        let (owner, other) = (Uuid::new_v4(), Uuid::new_v4());
        save_subscription(&pool, owner, &subscription("https://push/1", "a")).await.unwrap();

        assert!(!remove_subscription(&pool, other, "https://push/1").await.unwrap());
        assert!(remove_subscription(&pool, owner, "https://push/1").await.unwrap());
        assert!(subscriptions_for_user(&pool, owner).await.unwrap().is_empty());
    }
}
