use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use crate::db::notification_repository::NotificationRepository;
use crate::models::notification::{NewNotification, Notification};

pub struct PostgresNotificationRepository {
    pub pool: PgPool,
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, sqlx::Error> {
        sqlx::query_as::<Postgres, Notification>(
            r#"
            INSERT INTO notifications (student_id, notification_type, message, lesson_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(notification.student_id)
        .bind(notification.notification_type)
        .bind(&notification.message)
        .bind(notification.lesson_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_notifications_for_student(
        &self,
        student_id: i64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<Postgres, Notification>(
            r#"
            SELECT *
            FROM notifications
            WHERE student_id = $1
              AND ($2 = false OR is_read = false)
            ORDER BY created_at DESC
            "#,
        )
        .bind(student_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_read(&self, notification_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_notification(&self, notification_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
