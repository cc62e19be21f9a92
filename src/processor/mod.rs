use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod mock;
pub mod paypal;

#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub booking_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessorOutcome {
    Completed,
    Declined,
    Timeout,
}

/// Every adapter maps its wire responses into this shape; an indeterminate
/// outcome (timeout, connection drop) is Timeout, never Completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorResponse {
    pub outcome: ProcessorOutcome,
    pub transaction_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub response_code: Option<String>,
}

impl ProcessorResponse {
    pub fn completed(transaction_id: &str) -> Self {
        Self {
            outcome: ProcessorOutcome::Completed,
            transaction_id: Some(transaction_id.to_string()),
            error_code: None,
            error_message: None,
            response_code: Some("200".to_string()),
        }
    }
}

#[async_trait::async_trait]
pub trait PaymentProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Place a hold on funds. On Completed, `transaction_id` is the
    /// authorization id to use for capture/void.
    async fn authorize(&self, request: AuthorizeRequest) -> Result<ProcessorResponse>;

    /// Final capture of the full authorized amount. `idempotency_key` makes
    /// a resend of the same capture safe on the processor side.
    async fn capture(
        &self,
        authorization_id: &str,
        amount_minor: i64,
        currency: &str,
        idempotency_key: &str,
    ) -> Result<ProcessorResponse>;

    /// Release the hold. Success is a 204-style empty response.
    async fn void(&self, authorization_id: &str, reason: &str) -> Result<ProcessorResponse>;
}
