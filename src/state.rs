use crate::db::{
    notification_repository::NotificationRepository, payment_repository::PaymentRepository,
    subscription_repository::SubscriptionRepository,
};
use crate::services::payments::{activation::PaymentActivationService, PaymentCallbackAdapter};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<dyn PaymentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub activation: Arc<PaymentActivationService>,
    pub fawry: Arc<dyn PaymentCallbackAdapter>,
    pub paymob: Arc<dyn PaymentCallbackAdapter>,
}
