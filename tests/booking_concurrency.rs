use booking_engine::domain::booking::{CreateBookingRequest, CustomerInput};
use booking_engine::repo::availability_repo::AvailabilityRepo;
use booking_engine::repo::booking_events_repo::BookingEventsRepo;
use booking_engine::repo::bookings_repo::BookingsRepo;
use booking_engine::service::booking_service::BookingService;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

fn service(pool: sqlx::PgPool) -> BookingService {
    BookingService {
        pool: pool.clone(),
        bookings_repo: BookingsRepo { pool: pool.clone() },
        availability_repo: AvailabilityRepo { pool: pool.clone() },
        booking_events_repo: BookingEventsRepo { pool },
    }
}

fn request(car_id: Uuid, n: usize) -> CreateBookingRequest {
    let start = Utc::now().date_naive() + Duration::days(30);
    CreateBookingRequest {
        car_id,
        start_date: start,
        end_date: start + Duration::days(4),
        customer: CustomerInput {
            first_name: format!("Caller{n}"),
            last_name: "Concurrent".to_string(),
            email: format!("caller{n}-{}@example.com", Uuid::new_v4()),
            phone: None,
        },
        total_price_minor: 50_000,
        currency: "EUR".to_string(),
        idempotency_token: format!("concurrency-{n}-{}", Uuid::new_v4()),
    }
}

/// Five identical-range requests race for the same car; exactly one may win.
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn five_concurrent_requests_yield_one_booking() {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("connect");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");

    let car_id = Uuid::new_v4();
    let svc = service(pool.clone());

    let mut handles = Vec::new();
    for n in 0..5 {
        let svc = svc.clone();
        let req = request(car_id, n);
        handles.push(tokio::spawn(async move { svc.create(req).await }));
    }

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(resp) => winners.push(resp.booking_id),
            Err((status, body)) => {
                assert_eq!(status, axum::http::StatusCode::CONFLICT);
                assert_eq!(body.error.code, "DATES_UNAVAILABLE");
                conflicts += 1;
            }
        }
    }

    assert_eq!(winners.len(), 1, "exactly one request may win");
    assert_eq!(conflicts, 4);

    // Every day in the range belongs to the single winner.
    let days = AvailabilityRepo { pool }
        .list_for_booking(winners[0])
        .await
        .expect("list");
    assert_eq!(days.len(), 5);
    assert!(days.iter().all(|d| d.status == "PENDING" && d.booking_id == Some(winners[0])));
}

/// Replaying the same idempotency token returns the original booking.
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn idempotency_token_replay_returns_original() {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("connect");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");

    let svc = service(pool);
    let req = request(Uuid::new_v4(), 0);

    let first = svc.create(req.clone()).await.expect("first create succeeds");
    assert!(!first.replayed);

    let second = svc.create(req).await.expect("replay succeeds");
    assert!(second.replayed);
    assert_eq!(first.booking_id, second.booking_id);
}

/// Two simultaneous requests carrying the same token must both get the same
/// booking back; the one whose insert loses the unique-constraint race is
/// served the stored row, never an internal error.
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn racing_same_token_requests_converge_on_one_booking() {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("connect");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");

    let svc = service(pool);
    let req = request(Uuid::new_v4(), 0);

    let a = tokio::spawn({
        let svc = svc.clone();
        let req = req.clone();
        async move { svc.create(req).await }
    });
    let b = tokio::spawn({
        let svc = svc.clone();
        let req = req.clone();
        async move { svc.create(req).await }
    });

    let first = a.await.expect("task completes").expect("create succeeds");
    let second = b.await.expect("task completes").expect("create succeeds");

    assert_eq!(first.booking_id, second.booking_id);
    let originals = [first.replayed, second.replayed]
        .iter()
        .filter(|replayed| !**replayed)
        .count();
    assert_eq!(originals, 1, "exactly one request owns the insert");
}
