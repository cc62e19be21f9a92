use crate::domain::booking::{
    error_envelope, CreateBookingRequest, CreateBookingResponse, ErrorEnvelope,
};
use crate::repo::availability_repo::AvailabilityRepo;
use crate::repo::booking_events_repo::{BookingEventsRepo, NewBookingEvent};
use crate::repo::bookings_repo::{BookingsRepo, NewBooking};
use crate::repo::customers_repo::CustomersRepo;
use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

const MAX_RANGE_DAYS: i64 = 90;
const SUPPORTED_CURRENCIES: &[&str] = &["EUR", "USD", "GBP"];

#[derive(Clone)]
pub struct BookingService {
    pub pool: PgPool,
    pub bookings_repo: BookingsRepo,
    pub availability_repo: AvailabilityRepo,
    pub booking_events_repo: BookingEventsRepo,
}

impl BookingService {
    /// Customer upsert, booking insert, availability claim and the
    /// booking_created event are one transaction: either all of it commits
    /// or none of it exists.
    pub async fn create(
        &self,
        req: CreateBookingRequest,
    ) -> Result<CreateBookingResponse, (StatusCode, ErrorEnvelope)> {
        validate_request(&req, Utc::now().date_naive())?;

        let request_hash = hash_request(&req);
        if let Some(found) = self
            .bookings_repo
            .find_by_idempotency(&req.idempotency_token)
            .await
            .map_err(internal)?
        {
            if found.request_hash != request_hash {
                return Err((
                    StatusCode::CONFLICT,
                    error_envelope(
                        "IDEMPOTENCY_TOKEN_REUSED",
                        "token was already used with a different payload",
                    ),
                ));
            }

            return Ok(CreateBookingResponse {
                booking_id: found.booking_id,
                idempotency_token: req.idempotency_token,
                replayed: true,
            });
        }

        let booking_id = Uuid::new_v4();
        let days = day_count(req.start_date, req.end_date);

        let mut tx = self.pool.begin().await.map_err(|e| internal(e.into()))?;

        let customer_id = CustomersRepo::upsert_tx(&mut tx, &req.customer)
            .await
            .map_err(internal)?;

        let insert = BookingsRepo::insert_tx(
            &mut tx,
            &NewBooking {
                booking_id,
                car_id: req.car_id,
                customer_id,
                start_date: req.start_date,
                end_date: req.end_date,
                total_price_minor: req.total_price_minor,
                currency: req.currency.clone(),
                idempotency_token: req.idempotency_token.clone(),
                request_hash: request_hash.clone(),
            },
        )
        .await;

        if let Err(e) = insert {
            // Two requests raced on the same token; both missed the lookup
            // above and only one insert can commit. The stored row decides
            // for the loser.
            if is_unique_violation(&e, "bookings_idempotency_token_key") {
                tx.rollback().await.map_err(|e| internal(e.into()))?;
                let found = self
                    .bookings_repo
                    .find_by_idempotency(&req.idempotency_token)
                    .await
                    .map_err(internal)?;
                return match found {
                    Some(found) if found.request_hash == request_hash => {
                        Ok(CreateBookingResponse {
                            booking_id: found.booking_id,
                            idempotency_token: req.idempotency_token,
                            replayed: true,
                        })
                    }
                    _ => Err((
                        StatusCode::CONFLICT,
                        error_envelope(
                            "IDEMPOTENCY_TOKEN_REUSED",
                            "token was already used with a different payload",
                        ),
                    )),
                };
            }
            return Err(internal(e));
        }

        let claimed = AvailabilityRepo::claim_range_tx(
            &mut tx,
            req.car_id,
            booking_id,
            req.start_date,
            req.end_date,
        )
        .await
        .map_err(internal)?;

        if claimed != days as u64 {
            tx.rollback().await.map_err(|e| internal(e.into()))?;
            return Err((
                StatusCode::CONFLICT,
                error_envelope(
                    "DATES_UNAVAILABLE",
                    "one or more requested days are already booked",
                ),
            ));
        }

        BookingEventsRepo::append_tx(
            &mut tx,
            &NewBookingEvent {
                booking_id,
                event_type: "booking_created".to_string(),
                actor_type: "customer".to_string(),
                actor_id: Some(req.customer.email.trim().to_lowercase()),
                summary: format!(
                    "booking created for car {} from {} to {}",
                    req.car_id, req.start_date, req.end_date
                ),
                details: serde_json::json!({
                    "car_id": req.car_id,
                    "start_date": req.start_date,
                    "end_date": req.end_date,
                    "total_price_minor": req.total_price_minor,
                    "currency": req.currency,
                }),
            },
        )
        .await
        .map_err(internal)?;

        tx.commit().await.map_err(|e| internal(e.into()))?;

        tracing::info!(%booking_id, car_id = %req.car_id, days, "booking created");

        Ok(CreateBookingResponse {
            booking_id,
            idempotency_token: req.idempotency_token,
            replayed: false,
        })
    }

    /// Cancels a booking that never reached authorization and returns its
    /// days to the pool.
    pub async fn cancel_pending(
        &self,
        booking_id: Uuid,
        actor_id: Option<String>,
    ) -> Result<(), (StatusCode, ErrorEnvelope)> {
        let booking = self
            .bookings_repo
            .get(booking_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| {
                (
                    StatusCode::NOT_FOUND,
                    error_envelope("NOT_FOUND", "unknown booking"),
                )
            })?;

        if booking.payment_status != "NONE" {
            return Err((
                StatusCode::CONFLICT,
                error_envelope(
                    "INVALID_STATUS_VALUE",
                    "booking has a payment; void it instead of cancelling",
                ),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(|e| internal(e.into()))?;

        let cancelled = crate::repo::bookings_repo::BookingsRepo::mark_cancelled_unpaid_tx(&mut tx, booking_id)
            .await
            .map_err(internal)?;
        if !cancelled {
            tx.rollback().await.map_err(|e| internal(e.into()))?;
            return Err((
                StatusCode::CONFLICT,
                error_envelope("INVALID_STATUS_VALUE", "booking is not pending"),
            ));
        }

        AvailabilityRepo::release_tx(&mut tx, booking_id)
            .await
            .map_err(internal)?;

        BookingEventsRepo::append_tx(
            &mut tx,
            &NewBookingEvent {
                booking_id,
                event_type: "admin_action".to_string(),
                actor_type: "admin".to_string(),
                actor_id,
                summary: "pending booking cancelled, availability released".to_string(),
                details: serde_json::json!({"action": "cancel_pending"}),
            },
        )
        .await
        .map_err(internal)?;

        tx.commit().await.map_err(|e| internal(e.into()))?;

        tracing::info!(%booking_id, "pending booking cancelled");
        Ok(())
    }
}

/// Inclusive day count of the range.
pub fn day_count(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

pub fn validate_request(
    req: &CreateBookingRequest,
    today: NaiveDate,
) -> Result<(), (StatusCode, ErrorEnvelope)> {
    if req.start_date > req.end_date {
        return Err(validation("start_date must not be after end_date"));
    }
    if req.start_date < today {
        return Err(validation("start_date must be today or later"));
    }
    if day_count(req.start_date, req.end_date) > MAX_RANGE_DAYS {
        return Err(validation("date range exceeds the maximum rental length"));
    }
    if req.total_price_minor <= 0 {
        return Err(validation("total_price_minor must be > 0"));
    }
    if !SUPPORTED_CURRENCIES.contains(&req.currency.as_str()) {
        return Err(validation("unsupported currency"));
    }
    let email = req.customer.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(validation("customer email is required"));
    }
    if req.idempotency_token.trim().is_empty() {
        return Err(validation("idempotency_token is required"));
    }
    Ok(())
}

pub fn hash_request(req: &CreateBookingRequest) -> String {
    let s = serde_json::to_string(req).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

fn is_unique_violation(e: &anyhow::Error, constraint: &str) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation() && db.constraint() == Some(constraint))
}

fn validation(message: &str) -> (StatusCode, ErrorEnvelope) {
    (
        StatusCode::BAD_REQUEST,
        error_envelope("VALIDATION_ERROR", message),
    )
}

fn internal(e: anyhow::Error) -> (StatusCode, ErrorEnvelope) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_envelope("INTERNAL_ERROR", &e.to_string()),
    )
}
