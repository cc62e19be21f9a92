use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    NotSent,
    Sent,
    Viewed,
    Signed,
    Declined,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 5] = [
        ContractStatus::NotSent,
        ContractStatus::Sent,
        ContractStatus::Viewed,
        ContractStatus::Signed,
        ContractStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::NotSent => "NOT_SENT",
            ContractStatus::Sent => "SENT",
            ContractStatus::Viewed => "VIEWED",
            ContractStatus::Signed => "SIGNED",
            ContractStatus::Declined => "DECLINED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NOT_SENT" => Some(ContractStatus::NotSent),
            "SENT" => Some(ContractStatus::Sent),
            "VIEWED" => Some(ContractStatus::Viewed),
            "SIGNED" => Some(ContractStatus::Signed),
            "DECLINED" => Some(ContractStatus::Declined),
            _ => None,
        }
    }

    /// Position in the monotonic progression
    /// NOT_SENT < SENT < VIEWED < SIGNED < DECLINED. A status never moves
    /// to one of equal or lower rank.
    pub fn rank(self) -> u8 {
        match self {
            ContractStatus::NotSent => 0,
            ContractStatus::Sent => 1,
            ContractStatus::Viewed => 2,
            ContractStatus::Signed => 3,
            ContractStatus::Declined => 4,
        }
    }

    /// Storage forms of every status ranked strictly below `self`; these are
    /// the only states an UPDATE to `self` may transition from.
    pub fn ranked_below(self) -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|s| s.rank() < self.rank())
            .map(|s| s.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub car_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub customer: CustomerInput,
    pub total_price_minor: i64,
    pub currency: String,
    pub idempotency_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateBookingResponse {
    pub booking_id: Uuid,
    pub idempotency_token: String,
    pub replayed: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

pub fn error_envelope(code: &str, message: &str) -> ErrorEnvelope {
    ErrorEnvelope {
        error: ErrorPayload {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        },
    }
}
