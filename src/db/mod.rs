pub mod notification_repository;
pub mod payment_repository;
pub mod postgres_notification_repository;
pub mod postgres_payment_repository;
pub mod postgres_subscription_repository;
pub mod subscription_repository;

#[cfg(test)]
pub mod mock_db;

/// Errors worth retrying: lock/serialization conflicts and connection trouble.
/// Constraint violations and decode errors are permanent.
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            // serialization_failure, deadlock_detected, lock_not_available
            Some("40001") | Some("40P01") | Some("55P03")
        ),
        _ => false,
    }
}
