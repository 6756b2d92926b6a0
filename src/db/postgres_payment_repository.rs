use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgConnection, PgPool, Postgres};

use crate::db::payment_repository::{Approval, PaymentRepository, Transition};
use crate::db::postgres_subscription_repository::insert_subscription;
use crate::models::{
    payment::{NewPayment, Payment, PaymentProvider, PaymentStatus},
    subscription::NewSubscription,
};

pub struct PostgresPaymentRepository {
    pub pool: PgPool,
}

async fn current_status(
    conn: &mut PgConnection,
    payment_id: i64,
) -> Result<PaymentStatus, sqlx::Error> {
    sqlx::query_scalar::<Postgres, PaymentStatus>("SELECT status FROM payments WHERE id = $1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert_pending(&self, payment: &NewPayment) -> Result<Payment, sqlx::Error> {
        sqlx::query_as::<Postgres, Payment>(
            r#"
            INSERT INTO payments (
                student_id,
                folder_id,
                subscription_type,
                amount,
                provider,
                merchant_order_id,
                status,
                metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            RETURNING *
            "#,
        )
        .bind(payment.student_id)
        .bind(payment.folder_id)
        .bind(payment.subscription_type)
        .bind(payment.amount)
        .bind(payment.provider)
        .bind(&payment.merchant_order_id)
        .bind(&payment.metadata)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_by_merchant_order_id(
        &self,
        provider: PaymentProvider,
        merchant_order_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<Postgres, Payment>(
            "SELECT * FROM payments WHERE provider = $1 AND merchant_order_id = $2",
        )
        .bind(provider)
        .bind(merchant_order_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn approve_pending(
        &self,
        payment_id: i64,
        provider_reference: Option<&str>,
        callback_metadata: &Value,
        subscription: &NewSubscription,
    ) -> Result<Approval, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<Postgres, Payment>(
            r#"
            UPDATE payments
            SET status = 'approved',
                provider_reference = COALESCE($2, provider_reference),
                metadata = metadata || jsonb_build_object('callback', $3::jsonb),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(provider_reference)
        .bind(callback_metadata)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(payment) = updated else {
            // Dropping `tx` rolls back; nothing was written.
            let status = current_status(&mut *tx, payment_id).await?;
            return Ok(Approval::NotPending(status));
        };

        let subscription = NewSubscription {
            payment_id: Some(payment.id),
            ..subscription.clone()
        };
        let subscription = insert_subscription(&mut *tx, &subscription).await?;

        tx.commit().await?;

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
        let mut conn = self.pool.acquire().await?;

        let updated = sqlx::query_as::<Postgres, Payment>(
            r#"
            UPDATE payments
            SET status = $2,
                provider_reference = COALESCE($3, provider_reference),
                metadata = metadata || jsonb_build_object('callback', $4::jsonb),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(status)
        .bind(provider_reference)
        .bind(callback_metadata)
        .fetch_optional(&mut *conn)
        .await?;

        match updated {
            Some(payment) => Ok(Transition::Applied(payment)),
            None => Ok(Transition::NotPending(
                current_status(&mut *conn, payment_id).await?,
            )),
        }
    }
}
