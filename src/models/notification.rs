use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewLesson,
    SubscriptionExpiring,
    PaymentApproved,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub student_id: i64,
    pub notification_type: NotificationType,
    pub message: String,
    pub lesson_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub student_id: i64,
    pub notification_type: NotificationType,
    pub message: String,
    pub lesson_id: Option<i64>,
}

impl NewNotification {
    pub fn payment_approved(student_id: i64) -> Self {
        Self {
            student_id,
            notification_type: NotificationType::PaymentApproved,
            message: "تم تأكيد الدفع بنجاح وتفعيل اشتراكك لمدة شهر".to_string(),
            lesson_id: None,
        }
    }
}
