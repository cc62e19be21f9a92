use booking_engine::domain::booking::{CreateBookingRequest, CustomerInput};
use booking_engine::service::booking_service::{day_count, hash_request, validate_request};
use chrono::NaiveDate;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn request() -> CreateBookingRequest {
    CreateBookingRequest {
        car_id: Uuid::new_v4(),
        start_date: date(2030, 7, 1),
        end_date: date(2030, 7, 5),
        customer: CustomerInput {
            first_name: "Ana".to_string(),
            last_name: "Costa".to_string(),
            email: "ana@example.com".to_string(),
            phone: None,
        },
        total_price_minor: 50_000,
        currency: "EUR".to_string(),
        idempotency_token: "tok-1".to_string(),
    }
}

const TODAY: (i32, u32, u32) = (2030, 6, 1);

fn today() -> NaiveDate {
    date(TODAY.0, TODAY.1, TODAY.2)
}

#[test]
fn valid_request_passes() {
    assert!(validate_request(&request(), today()).is_ok());
}

#[test]
fn inverted_range_rejected() {
    let mut req = request();
    req.start_date = date(2030, 7, 5);
    req.end_date = date(2030, 7, 1);
    let (status, body) = validate_request(&req, today()).unwrap_err();
    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(body.error.code, "VALIDATION_ERROR");
}

#[test]
fn past_start_date_rejected() {
    let mut req = request();
    req.start_date = date(2030, 5, 31);
    req.end_date = date(2030, 6, 2);
    assert!(validate_request(&req, today()).is_err());
}

#[test]
fn start_today_accepted() {
    let mut req = request();
    req.start_date = today();
    req.end_date = today();
    assert!(validate_request(&req, today()).is_ok());
}

#[test]
fn overlong_range_rejected() {
    let mut req = request();
    req.start_date = date(2030, 7, 1);
    req.end_date = date(2030, 11, 1);
    assert!(validate_request(&req, today()).is_err());
}

#[test]
fn missing_email_rejected() {
    let mut req = request();
    req.customer.email = "  ".to_string();
    assert!(validate_request(&req, today()).is_err());
}

#[test]
fn unsupported_currency_rejected() {
    let mut req = request();
    req.currency = "XXX".to_string();
    assert!(validate_request(&req, today()).is_err());
}

#[test]
fn non_positive_price_rejected() {
    let mut req = request();
    req.total_price_minor = 0;
    assert!(validate_request(&req, today()).is_err());
}

#[test]
fn blank_idempotency_token_rejected() {
    let mut req = request();
    req.idempotency_token = "".to_string();
    assert!(validate_request(&req, today()).is_err());
}

#[test]
fn day_count_is_inclusive() {
    assert_eq!(day_count(date(2030, 7, 1), date(2030, 7, 5)), 5);
    assert_eq!(day_count(date(2030, 7, 1), date(2030, 7, 1)), 1);
}

#[test]
fn request_hash_is_stable_and_payload_sensitive() {
    let a = request();
    let mut b = request();
    assert_eq!(hash_request(&a), hash_request(&b));

    b.total_price_minor = 60_000;
    assert_ne!(hash_request(&a), hash_request(&b));
}
