use crate::domain::booking::{error_envelope, ErrorEnvelope};
use crate::domain::payment::{PaymentActionResponse, PaymentStatus};
use crate::processor::{AuthorizeRequest, PaymentProcessor, ProcessorOutcome, ProcessorResponse};
use crate::repo::availability_repo::AvailabilityRepo;
use crate::repo::booking_events_repo::{BookingEventsRepo, NewBookingEvent};
use crate::repo::bookings_repo::BookingsRepo;
use crate::repo::payments_repo::PaymentsRepo;
use axum::http::StatusCode;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug)]
pub enum PaymentError {
    NotFound,
    InvalidState(String),
    ProcessorDeclined {
        code: Option<String>,
        message: Option<String>,
    },
    ProcessorTimeout,
    Internal(anyhow::Error),
}

impl PaymentError {
    pub fn http(self) -> (StatusCode, ErrorEnvelope) {
        match self {
            PaymentError::NotFound => (
                StatusCode::NOT_FOUND,
                error_envelope("NOT_FOUND", "unknown booking"),
            ),
            PaymentError::InvalidState(msg) => (
                StatusCode::CONFLICT,
                error_envelope("INVALID_STATUS_VALUE", &msg),
            ),
            PaymentError::ProcessorDeclined { code, message } => {
                let mut envelope = error_envelope(
                    "PROCESSOR_ERROR",
                    &message.unwrap_or_else(|| "processor rejected the request".to_string()),
                );
                envelope.error.details = code;
                (StatusCode::BAD_GATEWAY, envelope)
            }
            PaymentError::ProcessorTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                error_envelope(
                    "PROCESSOR_TIMEOUT",
                    "processor did not answer in time; state unchanged, safe to retry",
                ),
            ),
            PaymentError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_envelope("INTERNAL_ERROR", &e.to_string()),
            ),
        }
    }
}

impl From<anyhow::Error> for PaymentError {
    fn from(e: anyhow::Error) -> Self {
        PaymentError::Internal(e)
    }
}

impl From<sqlx::Error> for PaymentError {
    fn from(e: sqlx::Error) -> Self {
        PaymentError::Internal(e.into())
    }
}

#[derive(Clone)]
pub struct PaymentService {
    pub pool: PgPool,
    pub bookings_repo: BookingsRepo,
    pub payments_repo: PaymentsRepo,
    pub availability_repo: AvailabilityRepo,
    pub booking_events_repo: BookingEventsRepo,
    pub processor: Arc<dyn PaymentProcessor>,
}

impl PaymentService {
    /// Places a hold for the booking's full price. A failed or timed-out
    /// authorization leaves the booking exactly as it was.
    pub async fn authorize(&self, booking_id: Uuid) -> Result<PaymentActionResponse, PaymentError> {
        let booking = self
            .bookings_repo
            .get(booking_id)
            .await?
            .ok_or(PaymentError::NotFound)?;

        let status = PaymentStatus::parse(&booking.payment_status)
            .ok_or_else(|| PaymentError::InvalidState("unreadable payment status".to_string()))?;
        if !status.can_authorize() {
            return Err(PaymentError::InvalidState(format!(
                "cannot authorize from {}",
                status.as_str()
            )));
        }

        let response = self
            .processor
            .authorize(AuthorizeRequest {
                booking_id,
                amount_minor: booking.total_price_minor,
                currency: booking.currency.clone(),
            })
            .await?;

        let authorization_id = match check_outcome(response)? {
            Some(id) => id,
            None => {
                return Err(PaymentError::ProcessorDeclined {
                    code: Some("MISSING_AUTHORIZATION_ID".to_string()),
                    message: Some("processor did not return an authorization id".to_string()),
                })
            }
        };

        let mut tx = self.pool.begin().await?;
        let moved = BookingsRepo::mark_authorized_tx(&mut tx, booking_id).await?;
        if !moved {
            // Lost a race with another authorize; the hold we just placed is
            // orphaned and gets released rather than recorded.
            tx.rollback().await?;
            let _ = self
                .processor
                .void(&authorization_id, "duplicate authorization")
                .await;
            return Err(PaymentError::InvalidState(
                "payment already authorized".to_string(),
            ));
        }
        PaymentsRepo::insert_authorized_tx(
            &mut tx,
            Uuid::new_v4(),
            booking_id,
            &authorization_id,
            booking.total_price_minor,
            &booking.currency,
        )
        .await?;
        BookingEventsRepo::append_tx(
            &mut tx,
            &NewBookingEvent {
                booking_id,
                event_type: "payment_authorized".to_string(),
                actor_type: "system".to_string(),
                actor_id: Some(self.processor.name().to_string()),
                summary: format!(
                    "hold of {} {} placed",
                    booking.total_price_minor, booking.currency
                ),
                details: serde_json::json!({
                    "authorization_id": authorization_id,
                    "amount_minor": booking.total_price_minor,
                    "currency": booking.currency,
                }),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(%booking_id, "payment authorized");

        Ok(PaymentActionResponse {
            booking_id,
            payment_status: PaymentStatus::Authorized,
            transaction_id: Some(authorization_id),
            already_terminal: false,
        })
    }

    /// Final capture of the authorized amount. A second call on a terminal
    /// payment is a no-op that never reaches the processor.
    pub async fn capture(&self, booking_id: Uuid) -> Result<PaymentActionResponse, PaymentError> {
        let (status, payment) = self.load_payment_state(booking_id).await?;

        if status.is_terminal() {
            return Ok(PaymentActionResponse {
                booking_id,
                payment_status: status,
                transaction_id: payment.and_then(|p| p.capture_id),
                already_terminal: true,
            });
        }
        if !status.can_capture() {
            return Err(PaymentError::InvalidState(format!(
                "cannot capture from {}",
                status.as_str()
            )));
        }
        let payment = payment.ok_or_else(|| {
            PaymentError::InvalidState("authorized booking has no payment record".to_string())
        })?;

        let idempotency_key = format!("{}-{}", booking_id, Utc::now().timestamp());
        let response = self
            .processor
            .capture(
                &payment.authorization_id,
                payment.amount_minor,
                &payment.currency,
                &idempotency_key,
            )
            .await?;

        let capture_id = match check_outcome(response)? {
            Some(id) => id,
            None => payment.authorization_id.clone(),
        };

        self.finalize_capture(
            booking_id,
            &capture_id,
            "system",
            Some(self.processor.name().to_string()),
            serde_json::json!({
                "capture_id": capture_id,
                "amount_minor": payment.amount_minor,
                "currency": payment.currency,
            }),
        )
        .await?;

        tracing::info!(%booking_id, %capture_id, "payment captured");

        Ok(PaymentActionResponse {
            booking_id,
            payment_status: PaymentStatus::Captured,
            transaction_id: Some(capture_id),
            already_terminal: false,
        })
    }

    /// Releases the hold and the booked days. Same no-op rule as capture.
    pub async fn void(
        &self,
        booking_id: Uuid,
        reason: &str,
    ) -> Result<PaymentActionResponse, PaymentError> {
        let (status, payment) = self.load_payment_state(booking_id).await?;

        if status.is_terminal() {
            return Ok(PaymentActionResponse {
                booking_id,
                payment_status: status,
                transaction_id: None,
                already_terminal: true,
            });
        }
        if !status.can_void() {
            return Err(PaymentError::InvalidState(format!(
                "cannot void from {}",
                status.as_str()
            )));
        }
        let payment = payment.ok_or_else(|| {
            PaymentError::InvalidState("authorized booking has no payment record".to_string())
        })?;

        let response = self.processor.void(&payment.authorization_id, reason).await?;
        check_outcome(response)?;

        self.finalize_void(
            booking_id,
            "system",
            Some(self.processor.name().to_string()),
            serde_json::json!({
                "authorization_id": payment.authorization_id,
                "amount_minor": payment.amount_minor,
                "currency": payment.currency,
                "reason": reason,
            }),
        )
        .await?;

        tracing::info!(%booking_id, reason, "payment voided");

        Ok(PaymentActionResponse {
            booking_id,
            payment_status: PaymentStatus::Voided,
            transaction_id: Some(payment.authorization_id),
            already_terminal: false,
        })
    }

    /// Local half of a capture: payment + booking status flips, PENDING
    /// days become BOOKED, and the audit event, all in one transaction.
    /// Used by the synchronous path after the processor confirms, and by
    /// the webhook path where the processor already captured. Returns false
    /// when the payment was no longer AUTHORIZED (idempotent no-op).
    pub async fn finalize_capture(
        &self,
        booking_id: Uuid,
        capture_id: &str,
        actor_type: &str,
        actor_id: Option<String>,
        details: serde_json::Value,
    ) -> anyhow::Result<bool> {
        let Some(payment) = self.payments_repo.find_latest_for_booking(booking_id).await? else {
            anyhow::bail!("booking {booking_id} has no payment record");
        };

        let mut tx = self.pool.begin().await?;
        let moved = PaymentsRepo::mark_captured_tx(&mut tx, payment.payment_id, capture_id).await?;
        if !moved {
            tx.rollback().await?;
            return Ok(false);
        }
        BookingsRepo::mark_captured_tx(&mut tx, booking_id).await?;
        AvailabilityRepo::confirm_booked_tx(&mut tx, booking_id).await?;
        BookingEventsRepo::append_tx(
            &mut tx,
            &NewBookingEvent {
                booking_id,
                event_type: "payment_captured".to_string(),
                actor_type: actor_type.to_string(),
                actor_id,
                summary: format!(
                    "captured {} {} (transaction {})",
                    payment.amount_minor, payment.currency, capture_id
                ),
                details,
            },
        )
        .await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Local half of a void, mirror of `finalize_capture`: releases the
    /// availability rows back to AVAILABLE.
    pub async fn finalize_void(
        &self,
        booking_id: Uuid,
        actor_type: &str,
        actor_id: Option<String>,
        details: serde_json::Value,
    ) -> anyhow::Result<bool> {
        let Some(payment) = self.payments_repo.find_latest_for_booking(booking_id).await? else {
            anyhow::bail!("booking {booking_id} has no payment record");
        };

        let mut tx = self.pool.begin().await?;
        let moved = PaymentsRepo::mark_voided_tx(&mut tx, payment.payment_id).await?;
        if !moved {
            tx.rollback().await?;
            return Ok(false);
        }
        BookingsRepo::mark_voided_tx(&mut tx, booking_id).await?;
        AvailabilityRepo::release_tx(&mut tx, booking_id).await?;
        BookingEventsRepo::append_tx(
            &mut tx,
            &NewBookingEvent {
                booking_id,
                event_type: "payment_voided".to_string(),
                actor_type: actor_type.to_string(),
                actor_id,
                summary: format!(
                    "voided hold of {} {} (authorization {})",
                    payment.amount_minor, payment.currency, payment.authorization_id
                ),
                details,
            },
        )
        .await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn load_payment_state(
        &self,
        booking_id: Uuid,
    ) -> Result<(PaymentStatus, Option<crate::repo::payments_repo::PaymentRow>), PaymentError> {
        let booking = self
            .bookings_repo
            .get(booking_id)
            .await?
            .ok_or(PaymentError::NotFound)?;
        let status = PaymentStatus::parse(&booking.payment_status)
            .ok_or_else(|| PaymentError::InvalidState("unreadable payment status".to_string()))?;
        let payment = self.payments_repo.find_latest_for_booking(booking_id).await?;
        Ok((status, payment))
    }
}

/// Collapses a processor response into either the transaction id or the
/// matching error; a timeout is indeterminate and mapped on its own.
fn check_outcome(response: ProcessorResponse) -> Result<Option<String>, PaymentError> {
    match response.outcome {
        ProcessorOutcome::Completed => Ok(response.transaction_id),
        ProcessorOutcome::Timeout => Err(PaymentError::ProcessorTimeout),
        ProcessorOutcome::Declined => Err(PaymentError::ProcessorDeclined {
            code: response.error_code,
            message: response.error_message,
        }),
    }
}
