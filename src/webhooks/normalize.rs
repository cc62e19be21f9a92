use crate::domain::webhook::{NormalizedWebhookEvent, WebhookEventType, WebhookProvider};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug)]
pub enum NormalizeError {
    /// Body is not valid JSON or misses required fields. Never retried.
    Malformed(String),
    /// Booking reference missing or not a UUID. Caller-visible client error.
    MissingBookingRef,
    /// A real event type we do not subscribe to; acked and dropped.
    UnsupportedEvent(String),
}

#[derive(Debug, Deserialize)]
struct PaymentWebhookPayload {
    id: String,
    event_type: String,
    #[serde(default)]
    create_time: Option<DateTime<Utc>>,
    resource: PaymentResource,
}

#[derive(Debug, Deserialize)]
struct PaymentResource {
    #[serde(default)]
    custom_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EsignWebhookPayload {
    event_id: String,
    event: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    data: EsignData,
}

#[derive(Debug, Deserialize)]
struct EsignData {
    #[serde(default)]
    metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmailWebhookPayload {
    message_id: String,
    event: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: serde_json::Value,
}

/// Maps one provider's payload to the canonical event. Operates on the raw
/// bytes that already passed signature verification.
pub fn normalize(
    provider: WebhookProvider,
    raw: &[u8],
) -> Result<NormalizedWebhookEvent, NormalizeError> {
    let raw_payload: serde_json::Value =
        serde_json::from_slice(raw).map_err(|e| NormalizeError::Malformed(e.to_string()))?;

    match provider {
        WebhookProvider::Payment => {
            let payload: PaymentWebhookPayload = serde_json::from_value(raw_payload.clone())
                .map_err(|e| NormalizeError::Malformed(e.to_string()))?;

            let event_type = match payload.event_type.as_str() {
                "PAYMENT.CAPTURE.COMPLETED" => WebhookEventType::PaymentCaptured,
                "PAYMENT.AUTHORIZATION.VOIDED" => WebhookEventType::PaymentVoided,
                other => return Err(NormalizeError::UnsupportedEvent(other.to_string())),
            };

            let booking_id = parse_booking_ref(payload.resource.custom_id.as_deref())?;

            Ok(NormalizedWebhookEvent {
                provider,
                webhook_id: payload.id,
                event_type,
                booking_id,
                occurred_at: payload.create_time.unwrap_or_else(Utc::now),
                raw_payload,
            })
        }
        WebhookProvider::Esign => {
            let payload: EsignWebhookPayload = serde_json::from_value(raw_payload.clone())
                .map_err(|e| NormalizeError::Malformed(e.to_string()))?;

            let event_type = match payload.event.as_str() {
                "submission.completed" => WebhookEventType::ContractSigned,
                "submission.declined" => WebhookEventType::ContractDeclined,
                "submission.viewed" | "submission.opened" => WebhookEventType::ContractViewed,
                other => return Err(NormalizeError::UnsupportedEvent(other.to_string())),
            };

            let booking_ref = payload
                .data
                .metadata
                .get("booking_id")
                .and_then(|v| v.as_str());
            let booking_id = parse_booking_ref(booking_ref)?;

            Ok(NormalizedWebhookEvent {
                provider,
                webhook_id: payload.event_id,
                event_type,
                booking_id,
                occurred_at: payload.created_at.unwrap_or_else(Utc::now),
                raw_payload,
            })
        }
        WebhookProvider::Email => {
            let payload: EmailWebhookPayload = serde_json::from_value(raw_payload.clone())
                .map_err(|e| NormalizeError::Malformed(e.to_string()))?;

            let event_type = match payload.event.as_str() {
                "delivered" | "sent" => WebhookEventType::EmailSent,
                "bounced" | "failed" | "complained" => WebhookEventType::EmailFailed,
                other => return Err(NormalizeError::UnsupportedEvent(other.to_string())),
            };

            let booking_ref = payload.metadata.get("booking_id").and_then(|v| v.as_str());
            let booking_id = parse_booking_ref(booking_ref)?;

            Ok(NormalizedWebhookEvent {
                provider,
                webhook_id: payload.message_id,
                event_type,
                booking_id,
                occurred_at: payload.timestamp.unwrap_or_else(Utc::now),
                raw_payload,
            })
        }
    }
}

fn parse_booking_ref(value: Option<&str>) -> Result<Uuid, NormalizeError> {
    value
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(NormalizeError::MissingBookingRef)
}
