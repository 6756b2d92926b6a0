use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::subscription::{NewSubscription, Subscription};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create_subscription(
        &self,
        subscription: &NewSubscription,
    ) -> Result<Subscription, sqlx::Error>;

    async fn has_active_subscription(
        &self,
        student_id: i64,
        folder_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error>;

    async fn list_subscriptions_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<Subscription>, sqlx::Error>;

    /// Returns `None` when no subscription has this id.
    async fn deactivate(&self, subscription_id: i64) -> Result<Option<Subscription>, sqlx::Error>;
}
