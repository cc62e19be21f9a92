use crate::domain::booking::{error_envelope, ErrorEnvelope};
use crate::domain::webhook::WebhookProvider;
use crate::repo::bookings_repo::BookingsRepo;
use crate::repo::webhook_retry_repo::{NewWebhookRetry, WebhookRetryRepo};
use crate::service::secret_cache::SecretCache;
use crate::webhooks::normalize::{normalize, NormalizeError};
use crate::webhooks::signature::{verify_envelope, verify_hmac_hex};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;

#[derive(Debug, serde::Serialize)]
pub struct IngestResponse {
    pub webhook_id: Option<String>,
    pub duplicate: bool,
    pub ignored: bool,
}

#[derive(Clone)]
pub struct WebhookIngest {
    pub secret_cache: SecretCache,
    pub bookings_repo: BookingsRepo,
    pub webhook_retry_repo: WebhookRetryRepo,
    pub signature_tolerance_secs: i64,
    pub retry_max_attempts: i32,
}

impl WebhookIngest {
    /// Verification happens on the exact raw bytes before any parsing; a
    /// well-formed, authentic payload is acked here and applied later by
    /// the retry engine.
    pub async fn ingest(
        &self,
        provider: WebhookProvider,
        headers: &HeaderMap,
        body: &[u8],
        endpoint: &str,
    ) -> Result<IngestResponse, (StatusCode, ErrorEnvelope)> {
        let config = self
            .secret_cache
            .get(provider)
            .await
            .map_err(internal)?
            .filter(|c| c.is_enabled)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    error_envelope("UNKNOWN_PROVIDER", "provider is not configured"),
                )
            })?;

        if !self.verify_signature(provider, &config.secret, headers, body) {
            tracing::warn!(provider = provider.as_str(), "webhook signature rejected");
            return Err((
                StatusCode::UNAUTHORIZED,
                error_envelope("INVALID_SIGNATURE", "missing or invalid webhook signature"),
            ));
        }

        let event = match normalize(provider, body) {
            Ok(event) => event,
            Err(NormalizeError::UnsupportedEvent(name)) => {
                tracing::debug!(provider = provider.as_str(), event = %name, "unsubscribed event acked");
                return Ok(IngestResponse {
                    webhook_id: None,
                    duplicate: false,
                    ignored: true,
                });
            }
            Err(NormalizeError::Malformed(detail)) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    error_envelope("VALIDATION_ERROR", &format!("malformed payload: {detail}")),
                ));
            }
            Err(NormalizeError::MissingBookingRef) => {
                return Err((
                    StatusCode::UNPROCESSABLE_ENTITY,
                    error_envelope("UNKNOWN_BOOKING", "payload carries no usable booking reference"),
                ));
            }
        };

        let known = self
            .bookings_repo
            .exists(event.booking_id)
            .await
            .map_err(internal)?;
        if !known {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                error_envelope("UNKNOWN_BOOKING", "booking referenced by payload does not exist"),
            ));
        }

        let outcome = self
            .webhook_retry_repo
            .enqueue(&NewWebhookRetry {
                provider: provider.as_str().to_string(),
                webhook_id: event.webhook_id.clone(),
                event_type: event.event_type.as_str().to_string(),
                booking_id: Some(event.booking_id),
                payload: event.raw_payload.clone(),
                endpoint: endpoint.to_string(),
                max_attempts: self.retry_max_attempts,
            })
            .await
            .map_err(internal)?;

        tracing::info!(
            provider = provider.as_str(),
            webhook_id = %event.webhook_id,
            duplicate = outcome.duplicate,
            "webhook enqueued"
        );

        Ok(IngestResponse {
            webhook_id: Some(event.webhook_id),
            duplicate: outcome.duplicate,
            ignored: false,
        })
    }

    fn verify_signature(
        &self,
        provider: WebhookProvider,
        secret: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> bool {
        match provider {
            // Signed envelope: t=<ts>,v1=<hmac of "ts.body">.
            WebhookProvider::Payment => header_str(headers, "X-Payment-Signature")
                .map(|value| {
                    verify_envelope(
                        secret,
                        body,
                        value,
                        Utc::now().timestamp(),
                        self.signature_tolerance_secs,
                    )
                })
                .unwrap_or(false),
            // Plain HMAC over the raw body, hex in a provider header.
            WebhookProvider::Esign => header_str(headers, "X-Esign-Signature")
                .map(|value| verify_hmac_hex(secret, body, value))
                .unwrap_or(false),
            WebhookProvider::Email => header_str(headers, "X-Email-Signature")
                .map(|value| verify_hmac_hex(secret, body, value))
                .unwrap_or(false),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

fn internal(e: anyhow::Error) -> (StatusCode, ErrorEnvelope) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_envelope("INTERNAL_ERROR", &e.to_string()),
    )
}
