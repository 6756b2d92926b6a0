//! Applies a verified callback: compare-and-swap on the payment status, subscription
//! issuance on approval, then a best-effort notification.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{PaymentOutcome, VerifiedPaymentEvent};
use crate::config::RetryPolicy;
use crate::db::is_transient;
use crate::db::notification_repository::NotificationRepository;
use crate::db::payment_repository::{Approval, PaymentRepository, Transition};
use crate::models::notification::NewNotification;
use crate::models::payment::{Payment, PaymentStatus};
use crate::models::subscription::{NewSubscription, SubscriptionWindow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Approved {
        payment_id: i64,
        subscription_id: i64,
    },
    /// Pending payment moved to failed, expired or cancelled.
    Closed {
        payment_id: i64,
        status: PaymentStatus,
    },
    /// Duplicate or stale delivery; nothing was written.
    AlreadyTerminal {
        payment_id: i64,
        status: PaymentStatus,
    },
    PaymentNotFound,
    /// The student or folder embedded in the order id disagrees with the stored payment.
    OrderMismatch {
        payment_id: i64,
    },
    AmountMismatch {
        payment_id: i64,
        expected: i64,
        paid: i64,
    },
    /// Persistence kept failing; the payment needs manual reconciliation.
    ReconciliationRequired {
        payment_id: Option<i64>,
    },
}

pub struct Processed {
    pub outcome: ActivationOutcome,
    /// Handle of the spawned notification task, present only after an approval.
    pub notification: Option<JoinHandle<()>>,
}

impl Processed {
    fn done(outcome: ActivationOutcome) -> Self {
        Self {
            outcome,
            notification: None,
        }
    }
}

pub struct PaymentActivationService {
    payments: Arc<dyn PaymentRepository>,
    notifications: Arc<dyn NotificationRepository>,
    retry: RetryPolicy,
}

impl PaymentActivationService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        notifications: Arc<dyn NotificationRepository>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            payments,
            notifications,
            retry,
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or the retry budget is spent.
    async fn with_retry<T, F, Fut>(
        &self,
        action: &'static str,
        mut op: F,
    ) -> Result<T, sqlx::Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff_for(attempt);
                    warn!(?err, action, attempt, ?delay, "transient database error, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn process(&self, event: &VerifiedPaymentEvent) -> Processed {
        let provider = event.provider;
        let merchant_order_id = event.merchant_order_id.as_str();
        let payments = self.payments.as_ref();

        let found = self
            .with_retry("lookup", move || {
                payments.find_by_merchant_order_id(provider, merchant_order_id)
            })
            .await;

        let payment = match found {
            Ok(Some(payment)) => payment,
            Ok(None) => {
                warn!(%provider, merchant_order_id, "callback for unknown payment");
                return Processed::done(ActivationOutcome::PaymentNotFound);
            }
            Err(err) => {
                error!(
                    ?err,
                    %provider,
                    merchant_order_id,
                    reconciliation = true,
                    "failed to load payment for callback"
                );
                return Processed::done(ActivationOutcome::ReconciliationRequired {
                    payment_id: None,
                });
            }
        };

        if payment.student_id != event.order.student_id
            || payment.folder_id != event.order.folder_id
        {
            warn!(
                %provider,
                merchant_order_id,
                payment_id = payment.id,
                order_student_id = event.order.student_id,
                order_folder_id = event.order.folder_id,
                "order id does not match stored payment"
            );
            return Processed::done(ActivationOutcome::OrderMismatch {
                payment_id: payment.id,
            });
        }

        if payment.status.is_terminal() {
            info!(
                %provider,
                merchant_order_id,
                payment_id = payment.id,
                status = %payment.status,
                "payment already settled, ignoring callback"
            );
            return Processed::done(ActivationOutcome::AlreadyTerminal {
                payment_id: payment.id,
                status: payment.status,
            });
        }

        match event.outcome {
            PaymentOutcome::Succeeded => self.approve(event, &payment).await,
            other => self.close(event, &payment, other.target_status()).await,
        }
    }

    async fn approve(&self, event: &VerifiedPaymentEvent, payment: &Payment) -> Processed {
        let provider = event.provider;
        let merchant_order_id = event.merchant_order_id.as_str();

        if let Some(paid) = event.paid_amount {
            if paid != payment.amount {
                error!(
                    %provider,
                    merchant_order_id,
                    payment_id = payment.id,
                    expected = payment.amount,
                    paid,
                    reconciliation = true,
                    "paid amount differs from payment amount, not approving"
                );
                return Processed::done(ActivationOutcome::AmountMismatch {
                    payment_id: payment.id,
                    expected: payment.amount,
                    paid,
                });
            }
        }

        let subscription = NewSubscription {
            student_id: payment.student_id,
            folder_id: payment.folder_id,
            subscription_type: payment.subscription_type,
            window: SubscriptionWindow::one_month_from(Utc::now()),
            payment_method: provider.as_str().to_string(),
            monthly_price: payment.amount,
            granted_by: None,
            payment_id: Some(payment.id),
        };

        let payments = self.payments.as_ref();
        let payment_id = payment.id;
        let reference = event.provider_reference.as_deref();
        let raw = &event.raw;
        let subscription = &subscription;
        let approval = self
            .with_retry("approve", move || {
                payments.approve_pending(payment_id, reference, raw, subscription)
            })
            .await;

        match approval {
            Ok(Approval::Approved {
                payment,
                subscription,
            }) => {
                info!(
                    %provider,
                    merchant_order_id,
                    payment_id = payment.id,
                    subscription_id = subscription.id,
                    student_id = payment.student_id,
                    folder_id = payment.folder_id,
                    end_date = %subscription.end_date,
                    "payment approved, subscription issued"
                );
                Processed {
                    outcome: ActivationOutcome::Approved {
                        payment_id: payment.id,
                        subscription_id: subscription.id,
                    },
                    notification: Some(self.spawn_notification(payment.student_id, payment.id)),
                }
            }
            Ok(Approval::NotPending(status)) => {
                info!(
                    %provider,
                    merchant_order_id,
                    payment_id,
                    %status,
                    "payment settled concurrently, skipping activation"
                );
                Processed::done(ActivationOutcome::AlreadyTerminal { payment_id, status })
            }
            Err(err) => {
                error!(
                    ?err,
                    %provider,
                    merchant_order_id,
                    payment_id,
                    reconciliation = true,
                    "failed to approve payment"
                );
                Processed::done(ActivationOutcome::ReconciliationRequired {
                    payment_id: Some(payment_id),
                })
            }
        }
    }

    async fn close(
        &self,
        event: &VerifiedPaymentEvent,
        payment: &Payment,
        status: PaymentStatus,
    ) -> Processed {
        let provider = event.provider;
        let merchant_order_id = event.merchant_order_id.as_str();
        let payments = self.payments.as_ref();
        let payment_id = payment.id;
        let reference = event.provider_reference.as_deref();
        let raw = &event.raw;

        let transition = self
            .with_retry("close", move || {
                payments.close_pending(payment_id, status, reference, raw)
            })
            .await;

        match transition {
            Ok(Transition::Applied(payment)) => {
                info!(
                    %provider,
                    merchant_order_id,
                    payment_id,
                    status = %payment.status,
                    "payment closed"
                );
                Processed::done(ActivationOutcome::Closed {
                    payment_id,
                    status: payment.status,
                })
            }
            Ok(Transition::NotPending(current)) => {
                info!(
                    %provider,
                    merchant_order_id,
                    payment_id,
                    status = %current,
                    "payment settled concurrently, ignoring callback"
                );
                Processed::done(ActivationOutcome::AlreadyTerminal {
                    payment_id,
                    status: current,
                })
            }
            Err(err) => {
                error!(
                    ?err,
                    %provider,
                    merchant_order_id,
                    payment_id,
                    target = %status,
                    reconciliation = true,
                    "failed to close payment"
                );
                Processed::done(ActivationOutcome::ReconciliationRequired {
                    payment_id: Some(payment_id),
                })
            }
        }
    }

    fn spawn_notification(&self, student_id: i64, payment_id: i64) -> JoinHandle<()> {
        let notifications = Arc::clone(&self.notifications);
        tokio::spawn(async move {
            let notification = NewNotification::payment_approved(student_id);
            if let Err(err) = notifications.create_notification(&notification).await {
                warn!(?err, student_id, payment_id, "failed to create payment notification");
            }
        })
    }
}
