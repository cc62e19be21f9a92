use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of external callback sources. Each provider has its own
/// signature scheme and payload shape; everything downstream of ingestion
/// only sees the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookProvider {
    Payment,
    Esign,
    Email,
}

impl WebhookProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookProvider::Payment => "PAYMENT",
            WebhookProvider::Esign => "ESIGN",
            WebhookProvider::Email => "EMAIL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PAYMENT" => Some(WebhookProvider::Payment),
            "ESIGN" => Some(WebhookProvider::Esign),
            "EMAIL" => Some(WebhookProvider::Email),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    PaymentCaptured,
    PaymentVoided,
    ContractViewed,
    ContractSigned,
    ContractDeclined,
    EmailSent,
    EmailFailed,
}

impl WebhookEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventType::PaymentCaptured => "payment_captured",
            WebhookEventType::PaymentVoided => "payment_voided",
            WebhookEventType::ContractViewed => "contract_viewed",
            WebhookEventType::ContractSigned => "contract_signed",
            WebhookEventType::ContractDeclined => "contract_declined",
            WebhookEventType::EmailSent => "email_sent",
            WebhookEventType::EmailFailed => "email_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "payment_captured" => Some(WebhookEventType::PaymentCaptured),
            "payment_voided" => Some(WebhookEventType::PaymentVoided),
            "contract_viewed" => Some(WebhookEventType::ContractViewed),
            "contract_signed" => Some(WebhookEventType::ContractSigned),
            "contract_declined" => Some(WebhookEventType::ContractDeclined),
            "email_sent" => Some(WebhookEventType::EmailSent),
            "email_failed" => Some(WebhookEventType::EmailFailed),
            _ => None,
        }
    }
}

/// Canonical record every provider payload normalizes into before it
/// touches booking or payment state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedWebhookEvent {
    pub provider: WebhookProvider,
    pub webhook_id: String,
    pub event_type: WebhookEventType,
    pub booking_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub raw_payload: serde_json::Value,
}
