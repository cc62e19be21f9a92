use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct AvailabilityRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct AvailabilityDayRow {
    pub car_id: Uuid,
    pub day: NaiveDate,
    pub status: String,
    pub booking_id: Option<Uuid>,
}

impl AvailabilityRepo {
    /// Claims every day in [start, end] for `booking_id` in one statement.
    ///
    /// The upsert only takes over rows whose status is AVAILABLE; rows held
    /// by another booking conflict on (car_id, day) and are left untouched,
    /// so the returned count falls short of the day count and the caller
    /// rolls the surrounding transaction back. There is no separate
    /// existence check anywhere: concurrent claimers serialize on the row
    /// locks taken by ON CONFLICT DO UPDATE.
    pub async fn claim_range_tx(
        tx: &mut Transaction<'_, Postgres>,
        car_id: Uuid,
        booking_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO car_availability (car_id, day, status, booking_id)
            SELECT $1, d::date, 'PENDING', $2
            FROM generate_series($3::date, $4::date, interval '1 day') AS d
            ON CONFLICT (car_id, day) DO UPDATE SET
                status = 'PENDING',
                booking_id = EXCLUDED.booking_id,
                updated_at = now()
            WHERE car_availability.status = 'AVAILABLE'
            "#,
        )
        .bind(car_id)
        .bind(booking_id)
        .bind(start)
        .bind(end)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected())
    }

    /// PENDING -> BOOKED once the payment is captured.
    pub async fn confirm_booked_tx(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE car_availability SET status = 'BOOKED', updated_at = now()
            WHERE booking_id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(booking_id)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected())
    }

    /// Returns the slots to the pool on void or cancellation.
    pub async fn release_tx(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE car_availability
            SET status = 'AVAILABLE', booking_id = NULL, updated_at = now()
            WHERE booking_id = $1 AND status IN ('PENDING', 'BOOKED')
            "#,
        )
        .bind(booking_id)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_for_booking(&self, booking_id: Uuid) -> anyhow::Result<Vec<AvailabilityDayRow>> {
        let rows = sqlx::query(
            r#"
            SELECT car_id, day, status, booking_id
            FROM car_availability
            WHERE booking_id = $1
            ORDER BY day ASC
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| AvailabilityDayRow {
                car_id: r.get("car_id"),
                day: r.get("day"),
                status: r.get("status"),
                booking_id: r.get("booking_id"),
            })
            .collect())
    }
}
