use async_trait::async_trait;

use crate::models::notification::{NewNotification, Notification};

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, sqlx::Error>;

    async fn list_notifications_for_student(
        &self,
        student_id: i64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, sqlx::Error>;

    async fn mark_read(&self, notification_id: i64) -> Result<bool, sqlx::Error>;

    async fn delete_notification(&self, notification_id: i64) -> Result<bool, sqlx::Error>;
}
