use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres};

use crate::db::subscription_repository::SubscriptionRepository;
use crate::models::subscription::{NewSubscription, Subscription};

pub struct PostgresSubscriptionRepository {
    pub pool: PgPool,
}

/// Shared with the payment approval transaction.
pub(crate) async fn insert_subscription(
    conn: &mut PgConnection,
    subscription: &NewSubscription,
) -> Result<Subscription, sqlx::Error> {
    sqlx::query_as::<Postgres, Subscription>(
        r#"
        INSERT INTO subscriptions (
            student_id,
            folder_id,
            subscription_type,
            start_date,
            end_date,
            is_active,
            payment_method,
            monthly_price,
            granted_by,
            payment_id
        )
        VALUES ($1, $2, $3, $4, $5, true, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(subscription.student_id)
    .bind(subscription.folder_id)
    .bind(subscription.subscription_type)
    .bind(subscription.window.start_date)
    .bind(subscription.window.end_date)
    .bind(&subscription.payment_method)
    .bind(subscription.monthly_price)
    .bind(subscription.granted_by)
    .bind(subscription.payment_id)
    .fetch_one(conn)
    .await
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn create_subscription(
        &self,
        subscription: &NewSubscription,
    ) -> Result<Subscription, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_subscription(&mut *conn, subscription).await
    }

    async fn has_active_subscription(
        &self,
        student_id: i64,
        folder_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<Postgres, i32>(
            r#"
            SELECT 1
            FROM subscriptions
            WHERE student_id = $1
              AND folder_id = $2
              AND is_active = true
              AND end_date >= $3
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .bind(folder_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .is_some();

        Ok(exists)
    }

    async fn list_subscriptions_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        sqlx::query_as::<Postgres, Subscription>(
            "SELECT * FROM subscriptions WHERE student_id = $1 ORDER BY created_at DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn deactivate(&self, subscription_id: i64) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<Postgres, Subscription>(
            "UPDATE subscriptions SET is_active = false WHERE id = $1 RETURNING *",
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
    }
}
