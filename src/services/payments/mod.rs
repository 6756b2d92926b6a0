//! Provider callbacks normalised into one verified event, plus the pipeline that applies it.

pub mod activation;
pub mod fawry;
pub mod order_ref;
pub mod paymob;

use axum::http::HeaderMap;
use serde_json::Value;

use crate::models::payment::{PaymentProvider, PaymentStatus};
use order_ref::OrderRef;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The provider secret is missing from configuration; callbacks are refused.
    #[error("{0} webhook secret is not configured")]
    NotConfigured(PaymentProvider),
    #[error("callback authentication failed: {0}")]
    Unauthenticated(&'static str),
    /// Authentic but unusable. Acknowledged so the provider stops retrying.
    #[error("malformed callback: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
    Expired,
    Cancelled,
}

impl PaymentOutcome {
    pub fn target_status(&self) -> PaymentStatus {
        match self {
            PaymentOutcome::Succeeded => PaymentStatus::Approved,
            PaymentOutcome::Failed => PaymentStatus::Failed,
            PaymentOutcome::Expired => PaymentStatus::Expired,
            PaymentOutcome::Cancelled => PaymentStatus::Cancelled,
        }
    }
}

/// A callback that passed authentication and carries a final outcome.
#[derive(Debug, Clone)]
pub struct VerifiedPaymentEvent {
    pub provider: PaymentProvider,
    pub merchant_order_id: String,
    pub order: OrderRef,
    pub outcome: PaymentOutcome,
    pub provider_reference: Option<String>,
    /// Amount the provider reports as paid, in piasters.
    pub paid_amount: Option<i64>,
    /// Callback body kept on the payment row for reconciliation.
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub enum Callback {
    Event(VerifiedPaymentEvent),
    /// Authentic callback that does not move the payment (non-final status, other event type).
    Ignored(String),
}

pub trait PaymentCallbackAdapter: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    /// Authenticates the raw request and normalises it.
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<Callback, WebhookError>;
}
