use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use booking_engine::config::AppConfig;
use booking_engine::processor::mock::MockProcessor;
use booking_engine::processor::paypal::PaypalProcessor;
use booking_engine::processor::PaymentProcessor;
use booking_engine::repo::availability_repo::AvailabilityRepo;
use booking_engine::repo::booking_events_repo::BookingEventsRepo;
use booking_engine::repo::bookings_repo::BookingsRepo;
use booking_engine::repo::payments_repo::PaymentsRepo;
use booking_engine::repo::provider_config_repo::ProviderConfigRepo;
use booking_engine::repo::webhook_retry_repo::WebhookRetryRepo;
use booking_engine::service::booking_service::BookingService;
use booking_engine::service::payment_service::PaymentService;
use booking_engine::service::retry_engine::RetryEngine;
use booking_engine::service::secret_cache::SecretCache;
use booking_engine::service::webhook_ingest::WebhookIngest;
use booking_engine::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let bookings_repo = BookingsRepo { pool: pool.clone() };
    let availability_repo = AvailabilityRepo { pool: pool.clone() };
    let payments_repo = PaymentsRepo { pool: pool.clone() };
    let booking_events_repo = BookingEventsRepo { pool: pool.clone() };
    let webhook_retry_repo = WebhookRetryRepo { pool: pool.clone() };
    let provider_config_repo = ProviderConfigRepo { pool: pool.clone() };

    let processor: Arc<dyn PaymentProcessor> = match std::env::var("PROCESSOR_ADAPTER")
        .unwrap_or_else(|_| "MOCK".to_string())
        .as_str()
    {
        "PAYPAL" => Arc::new(PaypalProcessor {
            base_url: std::env::var("PAYPAL_BASE_URL")
                .unwrap_or_else(|_| "https://api-m.paypal.com".to_string()),
            access_token: std::env::var("PAYPAL_ACCESS_TOKEN").unwrap_or_default(),
            timeout_ms: std::env::var("PROCESSOR_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(2500),
            client: reqwest::Client::new(),
        }),
        _ => Arc::new(MockProcessor {
            behavior: std::env::var("MOCK_PROCESSOR_BEHAVIOR")
                .unwrap_or_else(|_| "ALWAYS_SUCCESS".to_string()),
        }),
    };

    let booking_service = BookingService {
        pool: pool.clone(),
        bookings_repo: bookings_repo.clone(),
        availability_repo: availability_repo.clone(),
        booking_events_repo: booking_events_repo.clone(),
    };

    let payment_service = PaymentService {
        pool: pool.clone(),
        bookings_repo: bookings_repo.clone(),
        payments_repo,
        availability_repo: availability_repo.clone(),
        booking_events_repo: booking_events_repo.clone(),
        processor,
    };

    let secret_cache = SecretCache::new(
        provider_config_repo,
        std::time::Duration::from_secs(cfg.secret_cache_ttl_secs),
    );

    let webhook_ingest = WebhookIngest {
        secret_cache: secret_cache.clone(),
        bookings_repo: bookings_repo.clone(),
        webhook_retry_repo: webhook_retry_repo.clone(),
        signature_tolerance_secs: cfg.signature_tolerance_secs,
        retry_max_attempts: cfg.retry_max_attempts,
    };

    let retry_engine = RetryEngine {
        pool: pool.clone(),
        webhook_retry_repo,
        bookings_repo,
        availability_repo,
        booking_events_repo: booking_events_repo.clone(),
        payment_service: payment_service.clone(),
        retry_base_secs: cfg.retry_base_secs,
        retry_cap_secs: cfg.retry_cap_secs,
        stalled_reclaim_secs: cfg.stalled_reclaim_secs,
        void_on_contract_decline: cfg.void_on_contract_decline,
    };

    let sweeper = retry_engine.clone();
    let sweep_interval = cfg.sweep_interval_secs;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(sweep_interval));
        loop {
            ticker.tick().await;
            match sweeper.process_due(100).await {
                Ok(summary) if summary.claimed > 0 => {
                    tracing::info!(
                        claimed = summary.claimed,
                        succeeded = summary.succeeded,
                        retried = summary.retried,
                        dead_lettered = summary.dead_lettered,
                        "retry sweep finished"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "retry sweep failed"),
            }
        }
    });

    let state = AppState {
        booking_service,
        payment_service,
        webhook_ingest,
        retry_engine,
        booking_events_repo,
        secret_cache,
    };

    let admin_key = cfg.internal_api_key.clone();
    let admin_routes = Router::new()
        .route(
            "/admin/webhook-retries/dead-letter",
            get(booking_engine::http::handlers::retries::list_dead_letter),
        )
        .route(
            "/admin/webhook-retries/:id/retry",
            post(booking_engine::http::handlers::retries::retry_dead_letter),
        )
        .route(
            "/admin/webhook-retries/process-due",
            post(booking_engine::http::handlers::retries::process_due),
        )
        .route(
            "/admin/webhook-retries/stats",
            get(booking_engine::http::handlers::retries::stats),
        )
        .route(
            "/admin/bookings/:booking_id/events",
            get(booking_engine::http::handlers::retries::list_booking_events),
        )
        .route(
            "/admin/bookings/:booking_id/cancel",
            post(booking_engine::http::handlers::bookings::cancel_pending_booking),
        )
        .route(
            "/admin/webhook-providers/:provider/secret",
            post(booking_engine::http::handlers::retries::rotate_provider_secret),
        )
        .layer(from_fn_with_state(
            admin_key,
            booking_engine::http::middleware::admin_auth::require_internal_api_key,
        ));

    let app = Router::new()
        .route("/health", get(booking_engine::http::handlers::bookings::health))
        .route("/bookings", post(booking_engine::http::handlers::bookings::create_booking))
        .route(
            "/bookings/:booking_id/authorize",
            post(booking_engine::http::handlers::payments::authorize),
        )
        .route(
            "/bookings/:booking_id/capture",
            post(booking_engine::http::handlers::payments::capture),
        )
        .route(
            "/bookings/:booking_id/void",
            post(booking_engine::http::handlers::payments::void),
        )
        .route(
            "/webhooks/payment",
            post(booking_engine::http::handlers::webhooks::receive_payment),
        )
        .route(
            "/webhooks/esign",
            post(booking_engine::http::handlers::webhooks::receive_esign),
        )
        .route(
            "/webhooks/email",
            post(booking_engine::http::handlers::webhooks::receive_email),
        )
        .route("/ops/readiness", get(booking_engine::http::handlers::ops::readiness))
        .route("/ops/liveness", get(booking_engine::http::handlers::ops::liveness))
        .merge(admin_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
