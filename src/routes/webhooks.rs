use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::responses::JsonResponse;
use crate::services::payments::{Callback, PaymentCallbackAdapter, WebhookError};
use crate::state::AppState;

pub async fn fawry_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let adapter = app_state.fawry.clone();
    handle_callback(&app_state, adapter.as_ref(), &headers, &body)
        .await
        .0
}

pub async fn paymob_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let adapter = app_state.paymob.clone();
    handle_callback(&app_state, adapter.as_ref(), &headers, &body)
        .await
        .0
}

/// Every path acknowledges with 200 except a refused signature (401) and a missing
/// secret (503). The second element is the notification task, if one was spawned.
pub(crate) async fn handle_callback(
    app_state: &AppState,
    adapter: &dyn PaymentCallbackAdapter,
    headers: &HeaderMap,
    body: &[u8],
) -> (Response, Option<JoinHandle<()>>) {
    let provider = adapter.provider();

    let event = match adapter.verify(headers, body) {
        Ok(Callback::Event(event)) => event,
        Ok(Callback::Ignored(reason)) => {
            info!(%provider, %reason, "acknowledged callback without transition");
            return (JsonResponse::ack().into_response(), None);
        }
        Err(WebhookError::Malformed(reason)) => {
            warn!(%provider, %reason, "ignoring malformed callback");
            return (JsonResponse::ack().into_response(), None);
        }
        Err(err @ WebhookError::Unauthenticated(_)) => {
            warn!(%provider, %err, "rejected callback");
            return (
                JsonResponse::unauthorized("Invalid signature").into_response(),
                None,
            );
        }
        Err(err @ WebhookError::NotConfigured(_)) => {
            error!(%provider, %err, "refusing callback until the provider secret is configured");
            return (
                JsonResponse::service_unavailable("Payment provider is not configured")
                    .into_response(),
                None,
            );
        }
    };

    let processed = app_state.activation.process(&event).await;
    info!(
        %provider,
        merchant_order_id = %event.merchant_order_id,
        outcome = ?processed.outcome,
        "callback processed"
    );
    (JsonResponse::ack().into_response(), processed.notification)
}
