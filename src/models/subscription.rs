use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::payment::SubscriptionType;

pub const MANUAL_PAYMENT_METHOD: &str = "manual";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub student_id: i64,
    pub folder_id: i64,
    pub subscription_type: SubscriptionType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub payment_method: String,
    pub monthly_price: i64,
    pub granted_by: Option<i64>,
    pub payment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn grants_access_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_date >= now
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub student_id: i64,
    pub folder_id: i64,
    pub subscription_type: SubscriptionType,
    pub window: SubscriptionWindow,
    pub payment_method: String,
    pub monthly_price: i64,
    pub granted_by: Option<i64>,
    pub payment_id: Option<i64>,
}

/// The date range a subscription grants access for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionWindow {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl SubscriptionWindow {
    /// One calendar month starting at `start`. Month ends clamp (Jan 31 -> Feb 28/29).
    pub fn one_month_from(start: DateTime<Utc>) -> Self {
        let end_date = start
            .checked_add_months(Months::new(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            start_date: start,
            end_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_spans_one_calendar_month() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        let window = SubscriptionWindow::one_month_from(start);
        assert_eq!(window.start_date, start);
        assert_eq!(
            window.end_date,
            Utc.with_ymd_and_hms(2024, 4, 15, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn window_clamps_to_end_of_shorter_month() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let window = SubscriptionWindow::one_month_from(start);
        assert_eq!(
            window.end_date,
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn inactive_or_lapsed_subscription_grants_nothing() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let window = SubscriptionWindow::one_month_from(start);
        let mut sub = Subscription {
            id: 1,
            student_id: 1,
            folder_id: 1,
            subscription_type: SubscriptionType::Premium,
            start_date: window.start_date,
            end_date: window.end_date,
            is_active: true,
            payment_method: "fawry".into(),
            monthly_price: 15000,
            granted_by: None,
            payment_id: Some(1),
            created_at: start,
        };
        assert!(sub.grants_access_at(window.end_date));
        assert!(!sub.grants_access_at(window.end_date + chrono::Duration::seconds(1)));

        sub.is_active = false;
        assert!(!sub.grants_access_at(start));
    }
}
