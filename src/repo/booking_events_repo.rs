use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct BookingEventsRepo {
    pub pool: PgPool,
}

pub struct NewBookingEvent {
    pub booking_id: Uuid,
    pub event_type: String,
    pub actor_type: String,
    pub actor_id: Option<String>,
    pub summary: String,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BookingEventRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub event_type: String,
    pub actor_type: String,
    pub actor_id: Option<String>,
    pub summary: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl BookingEventsRepo {
    /// Append-only; events commit with the state change that caused them.
    pub async fn append_tx(tx: &mut Transaction<'_, Postgres>, event: &NewBookingEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_events (id, booking_id, event_type, actor_type, actor_id, summary, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.booking_id)
        .bind(event.event_type.clone())
        .bind(event.actor_type.clone())
        .bind(event.actor_id.clone())
        .bind(event.summary.clone())
        .bind(event.details.clone())
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    pub async fn append(&self, event: &NewBookingEvent) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::append_tx(&mut tx, event).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_for_booking(&self, booking_id: Uuid) -> Result<Vec<BookingEventRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, booking_id, event_type, actor_type, actor_id, summary, details, created_at
            FROM booking_events
            WHERE booking_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| BookingEventRow {
                id: r.get("id"),
                booking_id: r.get("booking_id"),
                event_type: r.get("event_type"),
                actor_type: r.get("actor_type"),
                actor_id: r.get("actor_id"),
                summary: r.get("summary"),
                details: r.get("details"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}
