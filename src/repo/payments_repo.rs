use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct PaymentsRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub authorization_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub capture_id: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl PaymentsRepo {
    pub async fn insert_authorized_tx(
        tx: &mut Transaction<'_, Postgres>,
        payment_id: Uuid,
        booking_id: Uuid,
        authorization_id: &str,
        amount_minor: i64,
        currency: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, booking_id, authorization_id, amount_minor, currency, status)
            VALUES ($1, $2, $3, $4, $5, 'AUTHORIZED')
            "#,
        )
        .bind(payment_id)
        .bind(booking_id)
        .bind(authorization_id)
        .bind(amount_minor)
        .bind(currency)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    /// Latest payment for a booking (historically there can be several).
    pub async fn find_latest_for_booking(&self, booking_id: Uuid) -> anyhow::Result<Option<PaymentRow>> {
        let row = sqlx::query(
            r#"
            SELECT payment_id, booking_id, authorization_id, amount_minor, currency,
                   status, capture_id, captured_at
            FROM payments
            WHERE booking_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| PaymentRow {
            payment_id: r.get("payment_id"),
            booking_id: r.get("booking_id"),
            authorization_id: r.get("authorization_id"),
            amount_minor: r.get("amount_minor"),
            currency: r.get("currency"),
            status: r.get("status"),
            capture_id: r.get("capture_id"),
            captured_at: r.get("captured_at"),
        }))
    }

    /// Capture is final: the guard on AUTHORIZED means a second capture of
    /// the same payment affects zero rows.
    pub async fn mark_captured_tx(
        tx: &mut Transaction<'_, Postgres>,
        payment_id: Uuid,
        capture_id: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'CAPTURED', capture_id = $2, captured_at = now(), updated_at = now()
            WHERE payment_id = $1 AND status = 'AUTHORIZED'
            "#,
        )
        .bind(payment_id)
        .bind(capture_id)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn mark_voided_tx(
        tx: &mut Transaction<'_, Postgres>,
        payment_id: Uuid,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'VOIDED', voided_at = now(), updated_at = now()
            WHERE payment_id = $1 AND status = 'AUTHORIZED'
            "#,
        )
        .bind(payment_id)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
