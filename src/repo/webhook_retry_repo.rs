use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct WebhookRetryRepo {
    pub pool: PgPool,
}

pub struct NewWebhookRetry {
    pub provider: String,
    pub webhook_id: String,
    pub event_type: String,
    pub booking_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub endpoint: String,
    pub max_attempts: i32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WebhookRetryRow {
    pub id: Uuid,
    pub provider: String,
    pub webhook_id: String,
    pub event_type: String,
    pub booking_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub endpoint: String,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub status: String,
    pub last_error: Option<String>,
    pub succeeded_at: Option<DateTime<Utc>>,
    pub failed_permanently_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EnqueueOutcome {
    pub id: Uuid,
    pub duplicate: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RetryCount {
    pub provider: String,
    pub status: String,
    pub count: i64,
}

fn map_row(r: sqlx::postgres::PgRow) -> WebhookRetryRow {
    WebhookRetryRow {
        id: r.get("id"),
        provider: r.get("provider"),
        webhook_id: r.get("webhook_id"),
        event_type: r.get("event_type"),
        booking_id: r.get("booking_id"),
        payload: r.get("payload"),
        endpoint: r.get("endpoint"),
        attempt_count: r.get("attempt_count"),
        max_attempts: r.get("max_attempts"),
        next_retry_at: r.get("next_retry_at"),
        status: r.get("status"),
        last_error: r.get("last_error"),
        succeeded_at: r.get("succeeded_at"),
        failed_permanently_at: r.get("failed_permanently_at"),
        created_at: r.get("created_at"),
    }
}

const ROW_COLUMNS: &str = "id, provider, webhook_id, event_type, booking_id, payload, endpoint, \
     attempt_count, max_attempts, next_retry_at, status, last_error, succeeded_at, \
     failed_permanently_at, created_at";

impl WebhookRetryRepo {
    /// Idempotent ingestion: UNIQUE(provider, webhook_id) turns a redelivery
    /// into a no-op that returns the existing record.
    pub async fn enqueue(&self, data: &NewWebhookRetry) -> Result<EnqueueOutcome> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO webhook_retry (
                id, provider, webhook_id, event_type, booking_id, payload,
                endpoint, attempt_count, max_attempts, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, 'PENDING')
            ON CONFLICT (provider, webhook_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.provider.clone())
        .bind(data.webhook_id.clone())
        .bind(data.event_type.clone())
        .bind(data.booking_id)
        .bind(data.payload.clone())
        .bind(data.endpoint.clone())
        .bind(data.max_attempts)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(EnqueueOutcome {
                id: row.get("id"),
                duplicate: false,
            });
        }

        let existing = sqlx::query("SELECT id FROM webhook_retry WHERE provider = $1 AND webhook_id = $2")
            .bind(data.provider.clone())
            .bind(data.webhook_id.clone())
            .fetch_one(&self.pool)
            .await?;

        Ok(EnqueueOutcome {
            id: existing.get("id"),
            duplicate: true,
        })
    }

    /// Claims due PENDING records and flips them to PROCESSING in one
    /// transaction. SKIP LOCKED keeps concurrent sweepers off each other's
    /// rows; the PROCESSING status keeps them off already-claimed rows.
    pub async fn claim_due(&self, batch_size: i64) -> Result<Vec<WebhookRetryRow>> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ROW_COLUMNS}
            FROM webhook_retry
            WHERE status = 'PENDING' AND (next_retry_at IS NULL OR next_retry_at <= now())
            ORDER BY created_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#
        ))
        .bind(batch_size)
        .fetch_all(tx.as_mut())
        .await?;

        if rows.is_empty() {
            tx.rollback().await?;
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.get("id")).collect();
        sqlx::query("UPDATE webhook_retry SET status = 'PROCESSING', updated_at = now() WHERE id = ANY($1)")
            .bind(&ids)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;

        Ok(rows.into_iter().map(map_row).collect())
    }

    pub async fn mark_succeeded(&self, id: Uuid, attempt_count: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE webhook_retry
            SET status = 'SUCCEEDED', attempt_count = $2, succeeded_at = now(),
                last_error = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempt_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_retry(
        &self,
        id: Uuid,
        attempt_count: i32,
        next_retry_at: DateTime<Utc>,
        error: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE webhook_retry
            SET status = 'PENDING', attempt_count = $2, next_retry_at = $3,
                last_error = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempt_count)
        .bind(next_retry_at)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_dead_letter(&self, id: Uuid, attempt_count: i32, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE webhook_retry
            SET status = 'DEAD_LETTER', attempt_count = $2, failed_permanently_at = now(),
                next_retry_at = NULL, last_error = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempt_count)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns stalled PROCESSING records to the queue. A record stays
    /// PROCESSING only for the duration of one apply attempt, so anything
    /// older than the threshold belongs to a worker that died between the
    /// claim and its mark write.
    pub async fn requeue_stale_processing(&self, older_than_secs: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_retry
            SET status = 'PENDING', next_retry_at = now(),
                last_error = 'attempt abandoned mid-flight, requeued', updated_at = now()
            WHERE status = 'PROCESSING'
              AND updated_at < now() - ($1 * interval '1 second')
            "#,
        )
        .bind(older_than_secs)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Administrative re-injection after an external fix.
    pub async fn reset_dead_letter(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_retry
            SET status = 'PENDING', attempt_count = 0, next_retry_at = NULL,
                failed_permanently_at = NULL, last_error = NULL, updated_at = now()
            WHERE id = $1 AND status = 'DEAD_LETTER'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn list_dead_letter(&self, limit: i64) -> Result<Vec<WebhookRetryRow>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ROW_COLUMNS}
            FROM webhook_retry
            WHERE status = 'DEAD_LETTER'
            ORDER BY failed_permanently_at DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(map_row).collect())
    }

    pub async fn counts_by_provider_status(&self) -> Result<Vec<RetryCount>> {
        let rows = sqlx::query(
            r#"
            SELECT provider, status, count(*) AS count
            FROM webhook_retry
            GROUP BY provider, status
            ORDER BY provider, status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| RetryCount {
                provider: r.get("provider"),
                status: r.get("status"),
                count: r.get("count"),
            })
            .collect())
    }
}
