use axum::http::HeaderMap;
use serde_json::Value;

use super::order_ref::OrderRef;
use super::{Callback, PaymentCallbackAdapter, PaymentOutcome, VerifiedPaymentEvent, WebhookError};
use crate::config::PaymobSettings;
use crate::models::payment::PaymentProvider;
use crate::utils::signature::{hex_digest_matches, hmac_sha256_hex};

pub const SIGNATURE_HEADER: &str = "x-hmac-signature";

/// PayMob signs the raw request body with HMAC-SHA256 and sends the hex digest in
/// `x-hmac-signature`. The body is only parsed once the signature holds.
pub struct PaymobAdapter {
    hmac_secret: Option<String>,
}

impl PaymobAdapter {
    pub fn new(settings: &PaymobSettings) -> Self {
        Self {
            hmac_secret: settings.hmac_secret.clone(),
        }
    }
}

fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flag(transaction: &Value, name: &str) -> Option<bool> {
    transaction.get(name).and_then(Value::as_bool)
}

fn map_outcome(transaction: &Value) -> Option<PaymentOutcome> {
    // A voided capture still carries `success: true`.
    if flag(transaction, "is_voided") == Some(true) {
        return Some(PaymentOutcome::Cancelled);
    }
    if flag(transaction, "success") == Some(true) {
        return Some(PaymentOutcome::Succeeded);
    }
    let status = transaction
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase();
    match status.as_str() {
        "SUCCESS" | "PAID" => Some(PaymentOutcome::Succeeded),
        "FAILED" | "DECLINED" => Some(PaymentOutcome::Failed),
        "EXPIRED" => Some(PaymentOutcome::Expired),
        "CANCELLED" | "CANCELED" | "VOIDED" => Some(PaymentOutcome::Cancelled),
        // Legacy `obj` transactions carry no status, only the flags.
        "" if flag(transaction, "success") == Some(false)
            && flag(transaction, "pending") == Some(false) =>
        {
            Some(PaymentOutcome::Failed)
        }
        _ => None,
    }
}

impl PaymentCallbackAdapter for PaymobAdapter {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Paymob
    }

    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<Callback, WebhookError> {
        let secret = self
            .hmac_secret
            .as_deref()
            .ok_or(WebhookError::NotConfigured(PaymentProvider::Paymob))?;

        let provided = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::Unauthenticated("missing x-hmac-signature header"))?;

        let expected = hmac_sha256_hex(secret.as_bytes(), body);
        if !hex_digest_matches(&expected, provided) {
            return Err(WebhookError::Unauthenticated("x-hmac-signature mismatch"));
        }

        let raw: Value = serde_json::from_slice(body)
            .map_err(|e| WebhookError::Malformed(format!("body is not JSON: {e}")))?;

        let event_type = raw.get("type").and_then(Value::as_str).unwrap_or_default();
        if !event_type.eq_ignore_ascii_case("TRANSACTION") {
            return Ok(Callback::Ignored(format!(
                "event type {event_type:?} is not handled"
            )));
        }

        let transaction = raw
            .get("data")
            .or_else(|| raw.get("obj"))
            .filter(|v| v.is_object())
            .ok_or_else(|| WebhookError::Malformed("missing data object".into()))?;

        let merchant_order_id = transaction
            .get("merchant_order_id")
            .or_else(|| transaction.pointer("/order/merchant_order_id"))
            .and_then(text_field)
            .ok_or_else(|| WebhookError::Malformed("missing merchant_order_id".into()))?;

        let Some(outcome) = map_outcome(transaction) else {
            return Ok(Callback::Ignored("transaction is not final".into()));
        };

        let order = OrderRef::decode(PaymentProvider::Paymob, &merchant_order_id)
            .map_err(|e| WebhookError::Malformed(format!("merchant_order_id: {e}")))?;

        let provider_reference = transaction
            .get("id")
            .and_then(text_field)
            .or_else(|| transaction.get("intention_id").and_then(text_field));
        let paid_amount = transaction.get("amount_cents").and_then(Value::as_i64);

        Ok(Callback::Event(VerifiedPaymentEvent {
            provider: PaymentProvider::Paymob,
            merchant_order_id,
            order,
            outcome,
            provider_reference,
            paid_amount,
            raw,
        }))
    }
}
