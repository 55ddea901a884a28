use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{Plan, Subscription};
use crate::error::{AppError, AppResult};

// ============================================================================
// Subscription Repository
// ============================================================================

pub struct SubscriptionRepository;

impl SubscriptionRepository {
    /// Look up the subscription a (email, access code) pair belongs to.
    pub async fn find_by_email_and_code(
        pool: &SqlitePool,
        email: &str,
        access_code: &str,
    ) -> AppResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, email, plan, access_code, expires_at, created_at
            FROM subscriptions
            WHERE email = ? AND access_code = ?
            "#,
        )
        .bind(email)
        .bind(access_code)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, email, plan, access_code, expires_at, created_at
            FROM subscriptions
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Insert or overwrite the subscription for `email` in one transaction.
    ///
    /// A lifetime subscription is never overwritten: the existing row is
    /// returned unchanged instead. Errors with a unique violation when
    /// `access_code` already belongs to another subscription.
    pub async fn upsert_unless_lifetime(
        pool: &SqlitePool,
        email: &str,
        plan: Plan,
        access_code: &str,
        expires_at: Option<NaiveDateTime>,
    ) -> AppResult<Subscription> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        let written = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, email, plan, access_code, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                plan = excluded.plan,
                access_code = excluded.access_code,
                expires_at = excluded.expires_at
            WHERE subscriptions.plan <> 'lifetime'
            RETURNING id, email, plan, access_code, expires_at, created_at
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(plan.as_str())
        .bind(access_code)
        .bind(expires_at)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let subscription = match written {
            Some(subscription) => subscription,
            // The conflict update was suppressed: a lifetime row already exists.
            None => sqlx::query_as::<_, Subscription>(
                r#"
                SELECT id, email, plan, access_code, expires_at, created_at
                FROM subscriptions
                WHERE email = ?
                "#,
            )
            .bind(email)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?,
        };

        tx.commit().await.map_err(AppError::Database)?;

        Ok(subscription)
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, email, plan, access_code, expires_at, created_at
            FROM subscriptions
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Swap the access code of an existing subscription, leaving its expiration untouched.
    ///
    /// Returns `None` when no subscription exists for `email` or when
    /// `access_code` is already its current code.
    pub async fn replace_code(
        pool: &SqlitePool,
        email: &str,
        access_code: &str,
    ) -> AppResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET access_code = ?
            WHERE email = ? AND access_code <> ?
            RETURNING id, email, plan, access_code, expires_at, created_at
            "#,
        )
        .bind(access_code)
        .bind(email)
        .bind(access_code)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }
}

/// Whether an error is the access-code unique constraint firing.
pub fn is_code_collision(err: &AppError) -> bool {
    match err {
        AppError::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::Duration;

    #[tokio::test]
    async fn upsert_inserts_then_overwrites() {
        let pool = test_pool().await;
        let now = Utc::now().naive_utc();

        let first = SubscriptionRepository::upsert_unless_lifetime(
            &pool,
            "fan@example.com",
            Plan::Monthly,
            "1111",
            Some(now + Duration::days(30)),
        )
        .await
        .unwrap();
        assert_eq!(first.access_code, "1111");

        let second = SubscriptionRepository::upsert_unless_lifetime(
            &pool,
            "fan@example.com",
            Plan::Yearly,
            "2222",
            Some(now + Duration::days(365)),
        )
        .await
        .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.plan, "yearly");
        assert_eq!(second.access_code, "2222");
        assert_eq!(SubscriptionRepository::list_all(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_leaves_lifetime_rows_alone() {
        let pool = test_pool().await;

        SubscriptionRepository::upsert_unless_lifetime(
            &pool,
            "vip@example.com",
            Plan::Lifetime,
            "7777",
            None,
        )
        .await
        .unwrap();

        let again = SubscriptionRepository::upsert_unless_lifetime(
            &pool,
            "vip@example.com",
            Plan::Monthly,
            "8888",
            Some(Utc::now().naive_utc()),
        )
        .await
        .unwrap();

        assert_eq!(again.access_code, "7777");
        assert_eq!(again.plan, "lifetime");
        assert_eq!(again.expires_at, None);
    }

    #[tokio::test]
    async fn duplicate_code_is_reported_as_collision() {
        let pool = test_pool().await;

        SubscriptionRepository::upsert_unless_lifetime(&pool, "a@example.com", Plan::Lifetime, "4242", None)
            .await
            .unwrap();
        let err = SubscriptionRepository::upsert_unless_lifetime(
            &pool,
            "b@example.com",
            Plan::Lifetime,
            "4242",
            None,
        )
        .await
        .unwrap_err();

        assert!(is_code_collision(&err));
    }

    #[tokio::test]
    async fn replace_code_keeps_expiration() {
        let pool = test_pool().await;
        let expires = Utc::now().naive_utc() + Duration::days(30);

        SubscriptionRepository::upsert_unless_lifetime(
            &pool,
            "fan@example.com",
            Plan::Monthly,
            "1111",
            Some(expires),
        )
        .await
        .unwrap();

        let updated = SubscriptionRepository::replace_code(&pool, "fan@example.com", "9999")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.access_code, "9999");
        assert_eq!(updated.expires_at, Some(expires));

        assert!(
            SubscriptionRepository::find_by_email_and_code(&pool, "fan@example.com", "1111")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            SubscriptionRepository::replace_code(&pool, "nobody@example.com", "0000")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn replace_code_never_writes_the_current_code_back() {
        let pool = test_pool().await;

        SubscriptionRepository::upsert_unless_lifetime(&pool, "fan@example.com", Plan::Lifetime, "5555", None)
            .await
            .unwrap();

        assert!(
            SubscriptionRepository::replace_code(&pool, "fan@example.com", "5555")
                .await
                .unwrap()
                .is_none()
        );
        let current = SubscriptionRepository::find_by_email(&pool, "fan@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.access_code, "5555");
        assert!(SubscriptionRepository::find_by_email(&pool, "ghost@example.com")
            .await
            .unwrap()
            .is_none());
    }
}
