use async_trait::async_trait;
use serde_json::Value;

use crate::models::{
    payment::{NewPayment, Payment, PaymentProvider, PaymentStatus},
    subscription::{NewSubscription, Subscription},
};

/// Result of a compare-and-swap on `payments.status`.
#[derive(Debug, Clone)]
pub enum Transition {
    Applied(Payment),
    /// The row had already left `pending`; nothing was written.
    NotPending(PaymentStatus),
}

#[derive(Debug, Clone)]
pub enum Approval {
    Approved {
        payment: Payment,
        subscription: Subscription,
    },
    NotPending(PaymentStatus),
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn insert_pending(&self, payment: &NewPayment) -> Result<Payment, sqlx::Error>;

    async fn find_by_merchant_order_id(
        &self,
        provider: PaymentProvider,
        merchant_order_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error>;

    /// Moves a pending payment to `approved` and inserts its subscription in one
    /// transaction. `subscription.payment_id` is overwritten with `payment_id`.
    async fn approve_pending(
        &self,
        payment_id: i64,
        provider_reference: Option<&str>,
        callback_metadata: &Value,
        subscription: &NewSubscription,
    ) -> Result<Approval, sqlx::Error>;

    /// Moves a pending payment to a non-approved terminal state.
    async fn close_pending(
        &self,
        payment_id: i64,
        status: PaymentStatus,
        provider_reference: Option<&str>,
        callback_metadata: &Value,
    ) -> Result<Transition, sqlx::Error>;
}
