pub mod notifications;
pub mod payments;
pub mod subscriptions;
pub mod webhooks;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

/// Provider callbacks. Mounted without rate limiting or CORS: throttling a gateway only
/// produces retries.
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/fawry", post(webhooks::fawry_webhook))
        .route("/paymob", post(webhooks::paymob_webhook))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/access", get(subscriptions::check_access))
        .route("/subscriptions/grant", post(subscriptions::grant_subscription))
        .route(
            "/subscriptions/{subscription_id}/cancel",
            post(subscriptions::cancel_subscription),
        )
        .route(
            "/students/{student_id}/subscriptions",
            get(subscriptions::list_subscriptions),
        )
        .route(
            "/students/{student_id}/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/notifications/{notification_id}/read",
            post(notifications::mark_notification_read),
        )
        .route(
            "/notifications/{notification_id}",
            delete(notifications::delete_notification),
        )
        .route(
            "/payments/{merchant_order_id}",
            get(payments::get_payment_status),
        )
}
