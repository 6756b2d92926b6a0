use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Mutex;

use super::notification_repository::NotificationRepository;
use super::payment_repository::{Approval, PaymentRepository, Transition};
use super::subscription_repository::SubscriptionRepository;
use crate::models::notification::{NewNotification, Notification};
use crate::models::payment::{
    NewPayment, Payment, PaymentProvider, PaymentStatus, SubscriptionType,
};
use crate::models::subscription::{NewSubscription, Subscription};

/// In-memory stand-in for all three stores. One lock guards the whole dataset so the
/// approve path behaves like the single Postgres transaction it replaces.
#[derive(Default)]
pub struct MockDb {
    pub data: Mutex<MockData>,
    /// Every repository call fails with a non-transient error.
    pub should_fail: bool,
    /// Number of upcoming status transitions that fail with a pool timeout.
    pub transient_transition_failures: Mutex<usize>,
    pub transition_attempts: Mutex<usize>,
}

#[derive(Default)]
pub struct MockData {
    pub payments: Vec<Payment>,
    pub subscriptions: Vec<Subscription>,
    pub notifications: Vec<Notification>,
    next_id: i64,
}

impl MockData {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn store_subscription(&mut self, new: &NewSubscription) -> Subscription {
        let subscription = Subscription {
            id: self.next_id(),
            student_id: new.student_id,
            folder_id: new.folder_id,
            subscription_type: new.subscription_type,
            start_date: new.window.start_date,
            end_date: new.window.end_date,
            is_active: true,
            payment_method: new.payment_method.clone(),
            monthly_price: new.monthly_price,
            granted_by: new.granted_by,
            payment_id: new.payment_id,
            created_at: Utc::now(),
        };
        self.subscriptions.push(subscription.clone());
        subscription
    }
}

/// A pending premium payment of 150 EGP, as checkout would have stored it.
pub fn pending_payment(
    id: i64,
    provider: PaymentProvider,
    merchant_order_id: &str,
    student_id: i64,
    folder_id: i64,
) -> Payment {
    let now = Utc::now();
    Payment {
        id,
        student_id,
        folder_id,
        subscription_type: SubscriptionType::Premium,
        amount: 15000,
        provider,
        merchant_order_id: merchant_order_id.to_string(),
        status: PaymentStatus::Pending,
        provider_reference: None,
        metadata: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    }
}

impl MockDb {
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn seed_payment(&self, payment: Payment) {
        let mut data = self.data.lock().unwrap();
        data.next_id = data.next_id.max(payment.id);
        data.payments.push(payment);
    }

    pub fn payment(&self, payment_id: i64) -> Option<Payment> {
        let data = self.data.lock().unwrap();
        data.payments.iter().find(|p| p.id == payment_id).cloned()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.data.lock().unwrap().subscriptions.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.data.lock().unwrap().notifications.clone()
    }

    fn fail_check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }

    fn transition_check(&self) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        *self.transition_attempts.lock().unwrap() += 1;
        let mut remaining = self.transient_transition_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

fn merge_callback(payment: &mut Payment, provider_reference: Option<&str>, callback: &Value) {
    if let Some(reference) = provider_reference {
        payment.provider_reference = Some(reference.to_string());
    }
    if let Value::Object(map) = &mut payment.metadata {
        map.insert("callback".to_string(), callback.clone());
    } else {
        payment.metadata = serde_json::json!({ "callback": callback });
    }
    payment.updated_at = Utc::now();
}

#[async_trait]
impl PaymentRepository for MockDb {
    async fn insert_pending(&self, new: &NewPayment) -> Result<Payment, sqlx::Error> {
        self.fail_check()?;
        let mut data = self.data.lock().unwrap();
        if data
            .payments
            .iter()
            .any(|p| p.provider == new.provider && p.merchant_order_id == new.merchant_order_id)
        {
            return Err(sqlx::Error::Protocol("duplicate merchant_order_id".into()));
        }
        let now = Utc::now();
        let payment = Payment {
            id: data.next_id(),
            student_id: new.student_id,
            folder_id: new.folder_id,
            subscription_type: new.subscription_type,
            amount: new.amount,
            provider: new.provider,
            merchant_order_id: new.merchant_order_id.clone(),
            status: PaymentStatus::Pending,
            provider_reference: None,
            metadata: new.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        data.payments.push(payment.clone());
        Ok(payment)
    }

    async fn find_by_merchant_order_id(
        &self,
        provider: PaymentProvider,
        merchant_order_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        self.fail_check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .payments
            .iter()
            .find(|p| p.provider == provider && p.merchant_order_id == merchant_order_id)
            .cloned())
    }

    async fn approve_pending(
        &self,
        payment_id: i64,
        provider_reference: Option<&str>,
        callback_metadata: &Value,
        subscription: &NewSubscription,
    ) -> Result<Approval, sqlx::Error> {
        self.transition_check()?;
        let mut data = self.data.lock().unwrap();
        let index = data
            .payments
            .iter()
            .position(|p| p.id == payment_id)
            .ok_or(sqlx::Error::RowNotFound)?;

        let current = data.payments[index].status;
        if current != PaymentStatus::Pending {
            return Ok(Approval::NotPending(current));
        }

        let payment = &mut data.payments[index];
        payment.status = PaymentStatus::Approved;
        merge_callback(payment, provider_reference, callback_metadata);
        let payment = payment.clone();

        let subscription = data.store_subscription(&NewSubscription {
            payment_id: Some(payment_id),
            ..subscription.clone()
        });

        Ok(Approval::Approved {
            payment,
            subscription,
        })
    }

    async fn close_pending(
        &self,
        payment_id: i64,
        status: PaymentStatus,
        provider_reference: Option<&str>,
        callback_metadata: &Value,
    ) -> Result<Transition, sqlx::Error> {
        self.transition_check()?;
        let mut data = self.data.lock().unwrap();
        let payment = data
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(sqlx::Error::RowNotFound)?;

        if payment.status != PaymentStatus::Pending {
            return Ok(Transition::NotPending(payment.status));
        }

        payment.status = status;
        merge_callback(payment, provider_reference, callback_metadata);
        Ok(Transition::Applied(payment.clone()))
    }
}

#[async_trait]
impl SubscriptionRepository for MockDb {
    async fn create_subscription(
        &self,
        subscription: &NewSubscription,
    ) -> Result<Subscription, sqlx::Error> {
        self.fail_check()?;
        Ok(self.data.lock().unwrap().store_subscription(subscription))
    }

    async fn has_active_subscription(
        &self,
        student_id: i64,
        folder_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        self.fail_check()?;
        let data = self.data.lock().unwrap();
        Ok(data.subscriptions.iter().any(|s| {
            s.student_id == student_id && s.folder_id == folder_id && s.grants_access_at(now)
        }))
    }

    async fn list_subscriptions_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        self.fail_check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .subscriptions
            .iter()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn deactivate(&self, subscription_id: i64) -> Result<Option<Subscription>, sqlx::Error> {
        self.fail_check()?;
        let mut data = self.data.lock().unwrap();
        Ok(data
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
            .map(|s| {
                s.is_active = false;
                s.clone()
            }))
    }
}

#[async_trait]
impl NotificationRepository for MockDb {
    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, sqlx::Error> {
        self.fail_check()?;
        let mut data = self.data.lock().unwrap();
        let stored = Notification {
            id: data.next_id(),
            student_id: notification.student_id,
            notification_type: notification.notification_type,
            message: notification.message.clone(),
            lesson_id: notification.lesson_id,
            is_read: false,
            created_at: Utc::now(),
        };
        data.notifications.push(stored.clone());
        Ok(stored)
    }

    async fn list_notifications_for_student(
        &self,
        student_id: i64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        self.fail_check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .notifications
            .iter()
            .filter(|n| n.student_id == student_id && (!unread_only || !n.is_read))
            .cloned()
            .collect())
    }

    async fn mark_read(&self, notification_id: i64) -> Result<bool, sqlx::Error> {
        self.fail_check()?;
        let mut data = self.data.lock().unwrap();
        match data.notifications.iter_mut().find(|n| n.id == notification_id) {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_notification(&self, notification_id: i64) -> Result<bool, sqlx::Error> {
        self.fail_check()?;
        let mut data = self.data.lock().unwrap();
        let before = data.notifications.len();
        data.notifications.retain(|n| n.id != notification_id);
        Ok(data.notifications.len() < before)
    }
}
