use booking_engine::domain::booking::{CreateBookingRequest, CustomerInput};
use booking_engine::processor::mock::MockProcessor;
use booking_engine::repo::availability_repo::AvailabilityRepo;
use booking_engine::repo::booking_events_repo::BookingEventsRepo;
use booking_engine::repo::bookings_repo::BookingsRepo;
use booking_engine::repo::payments_repo::PaymentsRepo;
use booking_engine::repo::webhook_retry_repo::{NewWebhookRetry, WebhookRetryRepo};
use booking_engine::service::booking_service::BookingService;
use booking_engine::service::payment_service::PaymentService;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;
use std::sync::Arc;
use uuid::Uuid;

async fn pool() -> sqlx::PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("connect");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");
    pool
}

fn booking_service(pool: sqlx::PgPool) -> BookingService {
    BookingService {
        pool: pool.clone(),
        bookings_repo: BookingsRepo { pool: pool.clone() },
        availability_repo: AvailabilityRepo { pool: pool.clone() },
        booking_events_repo: BookingEventsRepo { pool },
    }
}

fn payment_service(pool: sqlx::PgPool) -> PaymentService {
    PaymentService {
        pool: pool.clone(),
        bookings_repo: BookingsRepo { pool: pool.clone() },
        payments_repo: PaymentsRepo { pool: pool.clone() },
        availability_repo: AvailabilityRepo { pool: pool.clone() },
        booking_events_repo: BookingEventsRepo { pool },
        processor: Arc::new(MockProcessor {
            behavior: "ALWAYS_SUCCESS".to_string(),
        }),
    }
}

fn request(car_id: Uuid) -> CreateBookingRequest {
    let start = Utc::now().date_naive() + Duration::days(30);
    CreateBookingRequest {
        car_id,
        start_date: start,
        end_date: start + Duration::days(2),
        customer: CustomerInput {
            first_name: "Rui".to_string(),
            last_name: "Mendes".to_string(),
            email: format!("rui-{}@example.com", Uuid::new_v4()),
            phone: None,
        },
        total_price_minor: 30_000,
        currency: "EUR".to_string(),
        idempotency_token: format!("webhook-idem-{}", Uuid::new_v4()),
    }
}

fn retry_record(webhook_id: &str) -> NewWebhookRetry {
    NewWebhookRetry {
        provider: "PAYMENT".to_string(),
        webhook_id: webhook_id.to_string(),
        event_type: "payment_captured".to_string(),
        booking_id: None,
        payload: serde_json::json!({"id": webhook_id}),
        endpoint: "/webhooks/payment".to_string(),
        max_attempts: 8,
    }
}

/// Redelivery of the same (provider, webhook_id) lands on the existing
/// record instead of creating a second one.
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn duplicate_delivery_enqueues_once() {
    let pool = pool().await;
    let repo = WebhookRetryRepo { pool };

    let webhook_id = format!("WH-{}", Uuid::new_v4());
    let record = retry_record(&webhook_id);

    let first = repo.enqueue(&record).await.expect("first enqueue");
    assert!(!first.duplicate);

    let second = repo.enqueue(&record).await.expect("second enqueue");
    assert!(second.duplicate);
    assert_eq!(first.id, second.id);
}

/// Applying the same capture twice flips state once and appends exactly one
/// payment_captured event; the replay is a no-op.
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn replayed_capture_is_a_no_op() {
    let pool = pool().await;

    let created = booking_service(pool.clone())
        .create(request(Uuid::new_v4()))
        .await
        .expect("booking created");
    let booking_id = created.booking_id;

    let payments = payment_service(pool.clone());
    payments.authorize(booking_id).await.expect("authorize");

    let details = serde_json::json!({"webhook_id": "WH-REPLAY", "capture_id": "CAP-REPLAY"});
    let first = payments
        .finalize_capture(booking_id, "CAP-REPLAY", "webhook", Some("PAYMENT".to_string()), details.clone())
        .await
        .expect("first apply");
    assert!(first);

    let second = payments
        .finalize_capture(booking_id, "CAP-REPLAY", "webhook", Some("PAYMENT".to_string()), details)
        .await
        .expect("second apply");
    assert!(!second, "replay must not re-apply the capture");

    let events = BookingEventsRepo { pool: pool.clone() }
        .list_for_booking(booking_id)
        .await
        .expect("events");
    assert_eq!(
        events.iter().filter(|e| e.event_type == "payment_captured").count(),
        1
    );

    let days = AvailabilityRepo { pool }
        .list_for_booking(booking_id)
        .await
        .expect("days");
    assert!(days.iter().all(|d| d.status == "BOOKED"));
}

/// A record stranded in PROCESSING by a dead worker comes back to PENDING;
/// fresh in-flight records are left alone.
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn stalled_processing_record_is_requeued() {
    let pool = pool().await;
    let repo = WebhookRetryRepo { pool: pool.clone() };

    let webhook_id = format!("WH-{}", Uuid::new_v4());
    let enqueued = repo.enqueue(&retry_record(&webhook_id)).await.expect("enqueue");

    sqlx::query(
        "UPDATE webhook_retry SET status = 'PROCESSING', updated_at = now() - interval '1 hour' WHERE id = $1",
    )
    .bind(enqueued.id)
    .execute(&pool)
    .await
    .expect("strand record");

    let reclaimed = repo.requeue_stale_processing(300).await.expect("requeue");
    assert!(reclaimed >= 1);

    let status: String = sqlx::query("SELECT status FROM webhook_retry WHERE id = $1")
        .bind(enqueued.id)
        .fetch_one(&pool)
        .await
        .expect("row")
        .get("status");
    assert_eq!(status, "PENDING");

    sqlx::query("UPDATE webhook_retry SET status = 'PROCESSING', updated_at = now() WHERE id = $1")
        .bind(enqueued.id)
        .execute(&pool)
        .await
        .expect("reclaim record");

    repo.requeue_stale_processing(300).await.expect("requeue again");
    let status: String = sqlx::query("SELECT status FROM webhook_retry WHERE id = $1")
        .bind(enqueued.id)
        .fetch_one(&pool)
        .await
        .expect("row")
        .get("status");
    assert_eq!(status, "PROCESSING", "a fresh claim must not be stolen");
}
