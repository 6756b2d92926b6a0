use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::models::payment::PaymentProvider;
use crate::responses::JsonResponse;
use crate::state::AppState;

fn provider_for(merchant_order_id: &str) -> Option<PaymentProvider> {
    let tag = merchant_order_id.split('_').next()?;
    [PaymentProvider::Fawry, PaymentProvider::Paymob]
        .into_iter()
        .find(|p| p.order_tag() == tag)
}

/// Status lookup for the checkout page while it waits on the provider callback.
pub async fn get_payment_status(
    State(app_state): State<AppState>,
    Path(merchant_order_id): Path<String>,
) -> Response {
    let Some(provider) = provider_for(&merchant_order_id) else {
        return JsonResponse::bad_request("Unrecognised order id").into_response();
    };

    match app_state
        .payments
        .find_by_merchant_order_id(provider, &merchant_order_id)
        .await
    {
        Ok(Some(payment)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "payment": {
                    "id": payment.id,
                    "merchant_order_id": payment.merchant_order_id,
                    "provider": payment.provider,
                    "status": payment.status,
                    "amount": payment.amount,
                    "subscription_type": payment.subscription_type,
                    "updated_at": payment.updated_at,
                },
            })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("Payment not found").into_response(),
        Err(err) => {
            error!(?err, %merchant_order_id, "failed to load payment");
            JsonResponse::server_error("Failed to load payment").into_response()
        }
    }
}
