pub mod config;
pub mod domain {
    pub mod booking;
    pub mod payment;
    pub mod webhook;
}
pub mod processor;
pub mod webhooks {
    pub mod normalize;
    pub mod signature;
}
pub mod http {
    pub mod handlers {
        pub mod bookings;
        pub mod ops;
        pub mod payments;
        pub mod retries;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod admin_auth;
    }
}
pub mod repo {
    pub mod availability_repo;
    pub mod booking_events_repo;
    pub mod bookings_repo;
    pub mod customers_repo;
    pub mod payments_repo;
    pub mod provider_config_repo;
    pub mod webhook_retry_repo;
}
pub mod service {
    pub mod booking_service;
    pub mod payment_service;
    pub mod retry_engine;
    pub mod secret_cache;
    pub mod webhook_ingest;
}

#[derive(Clone)]
pub struct AppState {
    pub booking_service: service::booking_service::BookingService,
    pub payment_service: service::payment_service::PaymentService,
    pub webhook_ingest: service::webhook_ingest::WebhookIngest,
    pub retry_engine: service::retry_engine::RetryEngine,
    pub booking_events_repo: repo::booking_events_repo::BookingEventsRepo,
    pub secret_cache: service::secret_cache::SecretCache,
}
