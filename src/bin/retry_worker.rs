use anyhow::Result;
use booking_engine::config::AppConfig;
use booking_engine::processor::mock::MockProcessor;
use booking_engine::processor::paypal::PaypalProcessor;
use booking_engine::processor::PaymentProcessor;
use booking_engine::repo::availability_repo::AvailabilityRepo;
use booking_engine::repo::booking_events_repo::BookingEventsRepo;
use booking_engine::repo::bookings_repo::BookingsRepo;
use booking_engine::repo::payments_repo::PaymentsRepo;
use booking_engine::repo::webhook_retry_repo::WebhookRetryRepo;
use booking_engine::service::payment_service::PaymentService;
use booking_engine::service::retry_engine::RetryEngine;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Standalone sweeper for the webhook retry queue. Multiple instances can
/// run next to the in-server sweep; claiming uses SKIP LOCKED so they never
/// double-process a record.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.database_url)
        .await?;

    let bookings_repo = BookingsRepo { pool: pool.clone() };
    let availability_repo = AvailabilityRepo { pool: pool.clone() };
    let booking_events_repo = BookingEventsRepo { pool: pool.clone() };

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

    let payment_service = PaymentService {
        pool: pool.clone(),
        bookings_repo: bookings_repo.clone(),
        payments_repo: PaymentsRepo { pool: pool.clone() },
        availability_repo: availability_repo.clone(),
        booking_events_repo: booking_events_repo.clone(),
        processor,
    };

    let engine = RetryEngine {
        pool: pool.clone(),
        webhook_retry_repo: WebhookRetryRepo { pool },
        bookings_repo,
        availability_repo,
        booking_events_repo,
        payment_service,
        retry_base_secs: cfg.retry_base_secs,
        retry_cap_secs: cfg.retry_cap_secs,
        stalled_reclaim_secs: cfg.stalled_reclaim_secs,
        void_on_contract_decline: cfg.void_on_contract_decline,
    };

    loop {
        match engine.process_due(100).await {
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

        tokio::time::sleep(std::time::Duration::from_secs(cfg.sweep_interval_secs)).await;
    }
}
