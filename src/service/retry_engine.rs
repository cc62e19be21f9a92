use crate::domain::booking::ContractStatus;
use crate::domain::webhook::WebhookEventType;
use crate::repo::availability_repo::AvailabilityRepo;
use crate::repo::booking_events_repo::{BookingEventsRepo, NewBookingEvent};
use crate::repo::bookings_repo::BookingsRepo;
use crate::repo::webhook_retry_repo::{RetryCount, WebhookRetryRepo, WebhookRetryRow};
use crate::service::payment_service::{PaymentError, PaymentService};
use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// How a failed application attempt is handled.
#[derive(Debug)]
pub enum ApplyError {
    /// Worth another attempt after backoff (network, 5xx, transient DB).
    Transient(String),
    /// Straight to dead-letter, no more attempts.
    Permanent(String),
}

#[derive(Debug)]
pub enum FailureDisposition {
    Retry(Duration),
    DeadLetter,
}

/// Delay before attempt `attempt_count + 1`, doubling per completed attempt
/// and capped. `attempt_count` is the number of attempts already made (>= 1
/// when a failure is being scheduled).
pub fn backoff_delay(attempt_count: i32, base_secs: i64, cap_secs: i64) -> Duration {
    let exponent = (attempt_count - 1).clamp(0, 32) as u32;
    let secs = base_secs.saturating_mul(1_i64 << exponent.min(62)).min(cap_secs);
    Duration::seconds(secs)
}

/// Pure scheduling decision for a failed attempt. `attempt_count` includes
/// the attempt that just failed.
pub fn after_failure(
    attempt_count: i32,
    max_attempts: i32,
    error: &ApplyError,
    base_secs: i64,
    cap_secs: i64,
) -> FailureDisposition {
    match error {
        ApplyError::Permanent(_) => FailureDisposition::DeadLetter,
        ApplyError::Transient(_) => {
            if attempt_count >= max_attempts {
                FailureDisposition::DeadLetter
            } else {
                FailureDisposition::Retry(backoff_delay(attempt_count, base_secs, cap_secs))
            }
        }
    }
}

#[derive(Debug, Default, serde::Serialize)]
pub struct SweepSummary {
    pub reclaimed: u64,
    pub claimed: usize,
    pub succeeded: usize,
    pub retried: usize,
    pub dead_lettered: usize,
}

#[derive(Clone)]
pub struct RetryEngine {
    pub pool: PgPool,
    pub webhook_retry_repo: WebhookRetryRepo,
    pub bookings_repo: BookingsRepo,
    pub availability_repo: AvailabilityRepo,
    pub booking_events_repo: BookingEventsRepo,
    pub payment_service: PaymentService,
    pub retry_base_secs: i64,
    pub retry_cap_secs: i64,
    pub stalled_reclaim_secs: i64,
    pub void_on_contract_decline: bool,
}

impl RetryEngine {
    /// Drains everything due. Safe to run from several workers at once:
    /// claiming flips rows to PROCESSING under SKIP LOCKED, so each record
    /// has at most one in-flight attempt.
    pub async fn process_due(&self, batch_size: i64) -> Result<SweepSummary> {
        let reclaimed = self
            .webhook_retry_repo
            .requeue_stale_processing(self.stalled_reclaim_secs)
            .await?;
        if reclaimed > 0 {
            tracing::warn!(reclaimed, "requeued stalled PROCESSING records");
        }

        let rows = self.webhook_retry_repo.claim_due(batch_size).await?;
        let mut summary = SweepSummary {
            reclaimed,
            claimed: rows.len(),
            ..SweepSummary::default()
        };

        for row in rows {
            let attempt_count = row.attempt_count + 1;
            match self.apply(&row).await {
                Ok(()) => {
                    self.webhook_retry_repo
                        .mark_succeeded(row.id, attempt_count)
                        .await?;
                    summary.succeeded += 1;
                }
                Err(error) => {
                    let detail = match &error {
                        ApplyError::Transient(d) | ApplyError::Permanent(d) => d.clone(),
                    };
                    match after_failure(
                        attempt_count,
                        row.max_attempts,
                        &error,
                        self.retry_base_secs,
                        self.retry_cap_secs,
                    ) {
                        FailureDisposition::Retry(delay) => {
                            self.webhook_retry_repo
                                .mark_retry(row.id, attempt_count, Utc::now() + delay, &detail)
                                .await?;
                            summary.retried += 1;
                            tracing::warn!(
                                id = %row.id,
                                webhook_id = %row.webhook_id,
                                attempt_count,
                                %detail,
                                "webhook attempt failed, scheduled for retry"
                            );
                        }
                        FailureDisposition::DeadLetter => {
                            self.webhook_retry_repo
                                .mark_dead_letter(row.id, attempt_count, &detail)
                                .await?;
                            summary.dead_lettered += 1;
                            tracing::error!(
                                id = %row.id,
                                webhook_id = %row.webhook_id,
                                attempt_count,
                                %detail,
                                "webhook dead-lettered"
                            );
                        }
                    }
                }
            }
        }

        Ok(summary)
    }

    pub async fn retry_dead_letter(&self, id: Uuid) -> Result<bool> {
        self.webhook_retry_repo.reset_dead_letter(id).await
    }

    pub async fn stats(&self) -> Result<Vec<RetryCount>> {
        self.webhook_retry_repo.counts_by_provider_status().await
    }

    /// Applies one claimed record to booking/payment state. Every branch is
    /// idempotent: replaying an already-applied event is an Ok no-op.
    async fn apply(&self, row: &WebhookRetryRow) -> Result<(), ApplyError> {
        let event_type = WebhookEventType::parse(&row.event_type)
            .ok_or_else(|| ApplyError::Permanent(format!("unknown event type {}", row.event_type)))?;
        let booking_id = row
            .booking_id
            .ok_or_else(|| ApplyError::Permanent("record has no booking reference".to_string()))?;

        let booking = self
            .bookings_repo
            .get(booking_id)
            .await
            .map_err(|e| ApplyError::Transient(e.to_string()))?
            .ok_or_else(|| ApplyError::Permanent(format!("booking {booking_id} no longer exists")))?;

        match event_type {
            WebhookEventType::PaymentCaptured => {
                let capture_id = row
                    .payload
                    .pointer("/resource/id")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&row.webhook_id)
                    .to_string();
                // The processor already captured; only the local half runs.
                // finalize_capture returns false when the payment is no
                // longer AUTHORIZED, which covers replays and a void that
                // won the race.
                self.payment_service
                    .finalize_capture(
                        booking_id,
                        &capture_id,
                        "webhook",
                        Some(row.provider.clone()),
                        serde_json::json!({
                            "webhook_id": row.webhook_id,
                            "capture_id": capture_id,
                        }),
                    )
                    .await
                    .map(|_| ())
                    .map_err(|e| ApplyError::Transient(e.to_string()))
            }
            WebhookEventType::PaymentVoided => self
                .payment_service
                .finalize_void(
                    booking_id,
                    "webhook",
                    Some(row.provider.clone()),
                    serde_json::json!({"webhook_id": row.webhook_id}),
                )
                .await
                .map(|_| ())
                .map_err(|e| ApplyError::Transient(e.to_string())),
            WebhookEventType::ContractViewed => {
                self.advance_contract(row, &booking, ContractStatus::Viewed).await
            }
            WebhookEventType::ContractSigned => {
                self.advance_contract(row, &booking, ContractStatus::Signed).await
            }
            WebhookEventType::ContractDeclined => self.apply_contract_decline(row, &booking).await,
            WebhookEventType::EmailSent | WebhookEventType::EmailFailed => {
                self.booking_events_repo
                    .append(&NewBookingEvent {
                        booking_id,
                        event_type: event_type.as_str().to_string(),
                        actor_type: "webhook".to_string(),
                        actor_id: Some(row.provider.clone()),
                        summary: format!("email provider reported {}", row.event_type),
                        details: serde_json::json!({"webhook_id": row.webhook_id}),
                    })
                    .await
                    .map_err(|e| ApplyError::Transient(e.to_string()))
            }
        }
    }

    /// Contract progression is monotonic; a stale VIEWED arriving after
    /// SIGNED must not downgrade. The rank comparison here is only a fast
    /// path on a possibly stale row; the authoritative guard is the
    /// ranked-below list inside the UPDATE, which holds even when two
    /// workers interleave on the same booking.
    async fn advance_contract(
        &self,
        row: &WebhookRetryRow,
        booking: &crate::repo::bookings_repo::BookingRow,
        target: ContractStatus,
    ) -> Result<(), ApplyError> {
        let current = ContractStatus::parse(&booking.contract_status).ok_or_else(|| {
            ApplyError::Permanent(format!("unreadable contract status {}", booking.contract_status))
        })?;

        if current.rank() >= target.rank() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ApplyError::Transient(e.to_string()))?;
        let moved = BookingsRepo::set_contract_status_tx(
            &mut tx,
            booking.booking_id,
            target.as_str(),
            &target.ranked_below(),
        )
        .await
        .map_err(|e| ApplyError::Transient(e.to_string()))?;
        if moved {
            BookingEventsRepo::append_tx(
                &mut tx,
                &NewBookingEvent {
                    booking_id: booking.booking_id,
                    event_type: match target {
                        ContractStatus::Signed => "contract_signed".to_string(),
                        _ => "contract_viewed".to_string(),
                    },
                    actor_type: "webhook".to_string(),
                    actor_id: Some(row.provider.clone()),
                    summary: format!("contract status advanced to {}", target.as_str()),
                    details: serde_json::json!({"webhook_id": row.webhook_id}),
                },
            )
            .await
            .map_err(|e| ApplyError::Transient(e.to_string()))?;
        }
        tx.commit()
            .await
            .map_err(|e| ApplyError::Transient(e.to_string()))?;

        Ok(())
    }

    async fn apply_contract_decline(
        &self,
        row: &WebhookRetryRow,
        booking: &crate::repo::bookings_repo::BookingRow,
    ) -> Result<(), ApplyError> {
        // No early return on an already-declined contract: a replay may be
        // here because the follow-up void failed transiently last attempt.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ApplyError::Transient(e.to_string()))?;
        let moved = BookingsRepo::mark_contract_declined_tx(&mut tx, booking.booking_id)
            .await
            .map_err(|e| ApplyError::Transient(e.to_string()))?;
        if moved {
            // An unpaid booking frees its days here; an authorized one
            // frees them through the void below.
            if booking.payment_status == "NONE" {
                AvailabilityRepo::release_tx(&mut tx, booking.booking_id)
                    .await
                    .map_err(|e| ApplyError::Transient(e.to_string()))?;
            }
            BookingEventsRepo::append_tx(
                &mut tx,
                &NewBookingEvent {
                    booking_id: booking.booking_id,
                    event_type: "contract_declined".to_string(),
                    actor_type: "webhook".to_string(),
                    actor_id: Some(row.provider.clone()),
                    summary: "contract declined, booking cancelled".to_string(),
                    details: serde_json::json!({"webhook_id": row.webhook_id}),
                },
            )
            .await
            .map_err(|e| ApplyError::Transient(e.to_string()))?;
        }
        tx.commit()
            .await
            .map_err(|e| ApplyError::Transient(e.to_string()))?;

        if self.void_on_contract_decline && booking.payment_status == "AUTHORIZED" {
            match self
                .payment_service
                .void(booking.booking_id, "contract declined")
                .await
            {
                Ok(_) => {}
                // Already terminal surfaces as InvalidState only when a
                // concurrent transition raced us; both are done states.
                Err(PaymentError::InvalidState(_)) | Err(PaymentError::NotFound) => {}
                Err(PaymentError::ProcessorTimeout) => {
                    return Err(ApplyError::Transient("void timed out at processor".to_string()))
                }
                Err(PaymentError::ProcessorDeclined { code, message }) => {
                    return Err(ApplyError::Permanent(format!(
                        "processor rejected void: {} {}",
                        code.unwrap_or_default(),
                        message.unwrap_or_default()
                    )))
                }
                Err(PaymentError::Internal(e)) => {
                    return Err(ApplyError::Transient(e.to_string()))
                }
            }
        }

        Ok(())
    }
}
