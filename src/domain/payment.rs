use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Allowed transitions: NONE -> AUTHORIZED -> {CAPTURED, VOIDED}.
/// CAPTURED and VOIDED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    None,
    Authorized,
    Captured,
    Voided,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::None => "NONE",
            PaymentStatus::Authorized => "AUTHORIZED",
            PaymentStatus::Captured => "CAPTURED",
            PaymentStatus::Voided => "VOIDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(PaymentStatus::None),
            "AUTHORIZED" => Some(PaymentStatus::Authorized),
            "CAPTURED" => Some(PaymentStatus::Captured),
            "VOIDED" => Some(PaymentStatus::Voided),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Captured | PaymentStatus::Voided)
    }

    pub fn can_authorize(&self) -> bool {
        matches!(self, PaymentStatus::None)
    }

    pub fn can_capture(&self) -> bool {
        matches!(self, PaymentStatus::Authorized)
    }

    pub fn can_void(&self) -> bool {
        matches!(self, PaymentStatus::Authorized)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentActionResponse {
    pub booking_id: Uuid,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub already_terminal: bool,
}
