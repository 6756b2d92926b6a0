use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::Value;

use super::order_ref::OrderRef;
use super::{Callback, PaymentCallbackAdapter, PaymentOutcome, VerifiedPaymentEvent, WebhookError};
use crate::config::FawrySettings;
use crate::models::payment::PaymentProvider;
use crate::utils::signature::{hex_digest_matches, sha256_hex};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FawryCallback {
    merchant_ref_number: Option<String>,
    fawry_ref_number: Option<String>,
    order_status: Option<String>,
    message_signature: Option<String>,
    merchant_code: Option<String>,
    order_amount: Option<Value>,
    payment_amount: Option<Value>,
}

/// Fawry signs `merchantRefNumber + fawryRefNumber + secureKey` with SHA-256 and sends the
/// hex digest in the body as `messageSignature`.
pub struct FawryAdapter {
    merchant_code: Option<String>,
    secure_key: Option<String>,
}

impl FawryAdapter {
    pub fn new(settings: &FawrySettings) -> Self {
        Self {
            merchant_code: settings.merchant_code.clone(),
            secure_key: settings.secure_key.clone(),
        }
    }
}

pub fn callback_signature(merchant_ref: &str, fawry_ref: &str, secure_key: &str) -> String {
    sha256_hex(&[merchant_ref, fawry_ref, secure_key])
}

fn map_status(order_status: &str) -> Option<PaymentOutcome> {
    match order_status.trim().to_ascii_uppercase().as_str() {
        "PAID" => Some(PaymentOutcome::Succeeded),
        "FAILED" => Some(PaymentOutcome::Failed),
        "EXPIRED" => Some(PaymentOutcome::Expired),
        "CANCELLED" | "CANCELED" => Some(PaymentOutcome::Cancelled),
        // NEW, UNPAID, REFUNDED and anything unknown leave the payment alone.
        _ => None,
    }
}

/// Fawry reports pounds as a decimal number (sometimes as a string).
fn amount_in_piasters(value: &Value) -> Option<i64> {
    let pounds = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !pounds.is_finite() || pounds < 0.0 {
        return None;
    }
    Some((pounds * 100.0).round() as i64)
}

/// `paymentAmount` includes `fawryFees` when the customer bears them, so the order
/// amount is what must match the stored payment.
fn settled_amount(callback: &FawryCallback) -> Option<i64> {
    callback
        .order_amount
        .as_ref()
        .or(callback.payment_amount.as_ref())
        .and_then(amount_in_piasters)
}

impl PaymentCallbackAdapter for FawryAdapter {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Fawry
    }

    fn verify(&self, _headers: &HeaderMap, body: &[u8]) -> Result<Callback, WebhookError> {
        let secure_key = self
            .secure_key
            .as_deref()
            .ok_or(WebhookError::NotConfigured(PaymentProvider::Fawry))?;

        // Without a JSON body there is no signature to check.
        let raw: Value = serde_json::from_slice(body)
            .map_err(|_| WebhookError::Unauthenticated("body is not JSON"))?;
        let callback: FawryCallback = serde_json::from_value(raw.clone())
            .map_err(|_| WebhookError::Unauthenticated("body is not a callback object"))?;

        let provided = callback
            .message_signature
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::Unauthenticated("missing messageSignature"))?;

        let merchant_ref = callback.merchant_ref_number.clone().unwrap_or_default();
        let fawry_ref = callback.fawry_ref_number.clone().unwrap_or_default();
        let expected = callback_signature(&merchant_ref, &fawry_ref, secure_key);
        if !hex_digest_matches(&expected, provided) {
            return Err(WebhookError::Unauthenticated("messageSignature mismatch"));
        }

        if let (Some(configured), Some(received)) = (&self.merchant_code, &callback.merchant_code) {
            if configured.trim() != received.trim() {
                return Err(WebhookError::Unauthenticated("merchantCode mismatch"));
            }
        }

        if merchant_ref.trim().is_empty() {
            return Err(WebhookError::Malformed("missing merchantRefNumber".into()));
        }

        let order_status = callback.order_status.as_deref().unwrap_or_default();
        let Some(outcome) = map_status(order_status) else {
            return Ok(Callback::Ignored(format!(
                "orderStatus {order_status:?} is not final"
            )));
        };

        let order = OrderRef::decode(PaymentProvider::Fawry, &merchant_ref)
            .map_err(|e| WebhookError::Malformed(format!("merchantRefNumber: {e}")))?;

        Ok(Callback::Event(VerifiedPaymentEvent {
            provider: PaymentProvider::Fawry,
            merchant_order_id: merchant_ref,
            order,
            outcome,
            provider_reference: Some(fawry_ref).filter(|r| !r.is_empty()),
            paid_amount: settled_amount(&callback),
            raw,
        }))
    }
}
