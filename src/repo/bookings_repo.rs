use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct BookingsRepo {
    pub pool: PgPool,
}

pub struct NewBooking {
    pub booking_id: Uuid,
    pub car_id: Uuid,
    pub customer_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price_minor: i64,
    pub currency: String,
    pub idempotency_token: String,
    pub request_hash: String,
}

#[derive(Debug, Clone)]
pub struct BookingRow {
    pub booking_id: Uuid,
    pub car_id: Uuid,
    pub customer_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price_minor: i64,
    pub currency: String,
    pub overall_status: String,
    pub payment_status: String,
    pub contract_status: String,
}

#[derive(Debug, Clone)]
pub struct StoredBookingRef {
    pub booking_id: Uuid,
    pub request_hash: String,
}

impl BookingsRepo {
    pub async fn find_by_idempotency(&self, token: &str) -> anyhow::Result<Option<StoredBookingRef>> {
        let row = sqlx::query(
            "SELECT booking_id, request_hash FROM bookings WHERE idempotency_token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StoredBookingRef {
            booking_id: r.get("booking_id"),
            request_hash: r.get("request_hash"),
        }))
    }

    pub async fn get(&self, booking_id: Uuid) -> anyhow::Result<Option<BookingRow>> {
        let row = sqlx::query(
            r#"
            SELECT booking_id, car_id, customer_id, start_date, end_date, total_price_minor,
                   currency, overall_status, payment_status, contract_status
            FROM bookings
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| BookingRow {
            booking_id: r.get("booking_id"),
            car_id: r.get("car_id"),
            customer_id: r.get("customer_id"),
            start_date: r.get("start_date"),
            end_date: r.get("end_date"),
            total_price_minor: r.get("total_price_minor"),
            currency: r.get("currency"),
            overall_status: r.get("overall_status"),
            payment_status: r.get("payment_status"),
            contract_status: r.get("contract_status"),
        }))
    }

    pub async fn exists(&self, booking_id: Uuid) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT 1 AS one FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn insert_tx(tx: &mut Transaction<'_, Postgres>, data: &NewBooking) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                booking_id, car_id, customer_id, start_date, end_date,
                total_price_minor, currency, overall_status, payment_status,
                contract_status, idempotency_token, request_hash
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 'PENDING', 'NONE', 'NOT_SENT', $8, $9)
            "#,
        )
        .bind(data.booking_id)
        .bind(data.car_id)
        .bind(data.customer_id)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.total_price_minor)
        .bind(data.currency.clone())
        .bind(data.idempotency_token.clone())
        .bind(data.request_hash.clone())
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    /// Guarded transition NONE -> AUTHORIZED; returns false if the guard
    /// did not match.
    pub async fn mark_authorized_tx(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET payment_status = 'AUTHORIZED', updated_at = now()
            WHERE booking_id = $1 AND payment_status = 'NONE'
            "#,
        )
        .bind(booking_id)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Guarded transition AUTHORIZED -> CAPTURED; also confirms the booking.
    pub async fn mark_captured_tx(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET payment_status = 'CAPTURED', overall_status = 'UPCOMING', updated_at = now()
            WHERE booking_id = $1 AND payment_status = 'AUTHORIZED'
            "#,
        )
        .bind(booking_id)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Guarded transition AUTHORIZED -> VOIDED; cancels the booking.
    pub async fn mark_voided_tx(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET payment_status = 'VOIDED', overall_status = 'CANCELLED', updated_at = now()
            WHERE booking_id = $1 AND payment_status = 'AUTHORIZED'
            "#,
        )
        .bind(booking_id)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Cancels a booking that never reached authorization.
    pub async fn mark_cancelled_unpaid_tx(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET overall_status = 'CANCELLED', updated_at = now()
            WHERE booking_id = $1 AND payment_status = 'NONE' AND overall_status = 'PENDING'
            "#,
        )
        .bind(booking_id)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Advances `contract_status` only from one of `allowed_from`. The guard
    /// lives in the UPDATE itself so that concurrent workers applying
    /// out-of-order contract events can never downgrade a later status:
    /// whichever commits second matches zero rows.
    pub async fn set_contract_status_tx(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        contract_status: &str,
        allowed_from: &[&str],
    ) -> anyhow::Result<bool> {
        let allowed: Vec<String> = allowed_from.iter().map(|s| s.to_string()).collect();
        let result = sqlx::query(
            r#"
            UPDATE bookings SET contract_status = $2, updated_at = now()
            WHERE booking_id = $1 AND contract_status = ANY($3)
            "#,
        )
        .bind(booking_id)
        .bind(contract_status)
        .bind(allowed)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn mark_contract_declined_tx(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET contract_status = 'DECLINED', overall_status = 'CANCELLED', updated_at = now()
            WHERE booking_id = $1 AND contract_status <> 'DECLINED'
            "#,
        )
        .bind(booking_id)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
