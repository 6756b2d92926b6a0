use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::models::payment::SubscriptionType;
use crate::models::subscription::{NewSubscription, SubscriptionWindow, MANUAL_PAYMENT_METHOD};
use crate::responses::JsonResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub student_id: i64,
    pub folder_id: i64,
}

pub async fn check_access(
    State(app_state): State<AppState>,
    Query(query): Query<AccessQuery>,
) -> Response {
    match app_state
        .subscriptions
        .has_active_subscription(query.student_id, query.folder_id, Utc::now())
        .await
    {
        Ok(has_access) => (
            StatusCode::OK,
            Json(json!({ "success": true, "has_access": has_access })),
        )
            .into_response(),
        Err(err) => {
            error!(
                ?err,
                student_id = query.student_id,
                folder_id = query.folder_id,
                "access check failed"
            );
            JsonResponse::server_error("Failed to check access").into_response()
        }
    }
}

pub async fn list_subscriptions(
    State(app_state): State<AppState>,
    Path(student_id): Path<i64>,
) -> Response {
    match app_state
        .subscriptions
        .list_subscriptions_for_student(student_id)
        .await
    {
        Ok(subscriptions) => (
            StatusCode::OK,
            Json(json!({ "success": true, "subscriptions": subscriptions })),
        )
            .into_response(),
        Err(err) => {
            error!(?err, student_id, "failed to list subscriptions");
            JsonResponse::server_error("Failed to load subscriptions").into_response()
        }
    }
}

/// Owner-issued access without a payment.
#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub student_id: i64,
    pub folder_id: i64,
    pub subscription_type: SubscriptionType,
    #[serde(default)]
    pub monthly_price: i64,
    pub granted_by: i64,
}

pub async fn grant_subscription(
    State(app_state): State<AppState>,
    Json(payload): Json<GrantRequest>,
) -> Response {
    if payload.monthly_price < 0 {
        return JsonResponse::bad_request("monthly_price must not be negative").into_response();
    }

    let new_subscription = NewSubscription {
        student_id: payload.student_id,
        folder_id: payload.folder_id,
        subscription_type: payload.subscription_type,
        window: SubscriptionWindow::one_month_from(Utc::now()),
        payment_method: MANUAL_PAYMENT_METHOD.to_string(),
        monthly_price: payload.monthly_price,
        granted_by: Some(payload.granted_by),
        payment_id: None,
    };

    match app_state
        .subscriptions
        .create_subscription(&new_subscription)
        .await
    {
        Ok(subscription) => {
            info!(
                subscription_id = subscription.id,
                student_id = subscription.student_id,
                folder_id = subscription.folder_id,
                granted_by = payload.granted_by,
                "manual subscription granted"
            );
            (
                StatusCode::OK,
                Json(json!({ "success": true, "subscription": subscription })),
            )
                .into_response()
        }
        Err(err) => {
            error!(?err, student_id = payload.student_id, "failed to grant subscription");
            JsonResponse::server_error("Failed to grant subscription").into_response()
        }
    }
}

pub async fn cancel_subscription(
    State(app_state): State<AppState>,
    Path(subscription_id): Path<i64>,
) -> Response {
    match app_state.subscriptions.deactivate(subscription_id).await {
        Ok(Some(subscription)) => {
            info!(subscription_id, "subscription cancelled");
            (
                StatusCode::OK,
                Json(json!({ "success": true, "subscription": subscription })),
            )
                .into_response()
        }
        Ok(None) => JsonResponse::not_found("Subscription not found").into_response(),
        Err(err) => {
            error!(?err, subscription_id, "failed to cancel subscription");
            JsonResponse::server_error("Failed to cancel subscription").into_response()
        }
    }
}
