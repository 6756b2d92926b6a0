use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::responses::JsonResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

pub async fn list_notifications(
    State(app_state): State<AppState>,
    Path(student_id): Path<i64>,
    Query(query): Query<NotificationsQuery>,
) -> Response {
    match app_state
        .notifications
        .list_notifications_for_student(student_id, query.unread_only)
        .await
    {
        Ok(notifications) => (
            StatusCode::OK,
            Json(json!({ "success": true, "notifications": notifications })),
        )
            .into_response(),
        Err(err) => {
            error!(?err, student_id, "failed to list notifications");
            JsonResponse::server_error("Failed to load notifications").into_response()
        }
    }
}

pub async fn mark_notification_read(
    State(app_state): State<AppState>,
    Path(notification_id): Path<i64>,
) -> Response {
    match app_state.notifications.mark_read(notification_id).await {
        Ok(true) => JsonResponse::success("Notification marked as read").into_response(),
        Ok(false) => JsonResponse::not_found("Notification not found").into_response(),
        Err(err) => {
            error!(?err, notification_id, "failed to mark notification read");
            JsonResponse::server_error("Failed to update notification").into_response()
        }
    }
}

pub async fn delete_notification(
    State(app_state): State<AppState>,
    Path(notification_id): Path<i64>,
) -> Response {
    match app_state
        .notifications
        .delete_notification(notification_id)
        .await
    {
        Ok(true) => JsonResponse::success("Notification deleted").into_response(),
        Ok(false) => JsonResponse::not_found("Notification not found").into_response(),
        Err(err) => {
            error!(?err, notification_id, "failed to delete notification");
            JsonResponse::server_error("Failed to delete notification").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::MockDb;
    use crate::db::notification_repository::NotificationRepository;
    use crate::models::notification::NewNotification;
    use crate::routes::test_support::{body_json, configured_state};
    use std::sync::Arc;

    async fn seeded() -> (Arc<MockDb>, AppState, i64) {
        let db = Arc::new(MockDb::default());
        let first = db
            .create_notification(&NewNotification::payment_approved(42))
            .await
            .unwrap();
        db.create_notification(&NewNotification::payment_approved(42))
            .await
            .unwrap();
        db.create_notification(&NewNotification::payment_approved(43))
            .await
            .unwrap();
        let state = configured_state(db.clone());
        (db, state, first.id)
    }

    async fn listed(state: &AppState, unread_only: bool) -> usize {
        let resp = list_notifications(
            State(state.clone()),
            Path(42),
            Query(NotificationsQuery { unread_only }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        body_json(resp).await["notifications"]
            .as_array()
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn reading_hides_from_unread_list() {
        let (_db, state, first) = seeded().await;
        assert_eq!(listed(&state, false).await, 2);
        assert_eq!(listed(&state, true).await, 2);

        let resp = mark_notification_read(State(state.clone()), Path(first)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        assert_eq!(listed(&state, true).await, 1);
        assert_eq!(listed(&state, false).await, 2);
    }

    #[tokio::test]
    async fn delete_removes_only_that_notification() {
        let (db, state, first) = seeded().await;
        let resp = delete_notification(State(state.clone()), Path(first)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(db.notifications().len(), 2);

        let resp = delete_notification(State(state), Path(first)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_notification_is_not_found() {
        let (_db, state, _) = seeded().await;
        let resp = mark_notification_read(State(state), Path(9999)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
