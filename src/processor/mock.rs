use crate::processor::{AuthorizeRequest, PaymentProcessor, ProcessorOutcome, ProcessorResponse};
use anyhow::Result;

/// Deterministic stand-in used in dev environments and tests.
pub struct MockProcessor {
    pub behavior: String,
}

impl MockProcessor {
    fn respond(&self, prefix: &str) -> ProcessorResponse {
        match self.behavior.as_str() {
            "ALWAYS_DECLINE" => ProcessorResponse {
                outcome: ProcessorOutcome::Declined,
                transaction_id: None,
                error_code: Some("MOCK_DECLINED".to_string()),
                error_message: Some("mock decline".to_string()),
                response_code: Some("400".to_string()),
            },
            "ALWAYS_TIMEOUT" => ProcessorResponse {
                outcome: ProcessorOutcome::Timeout,
                transaction_id: None,
                error_code: Some("MOCK_TIMEOUT".to_string()),
                error_message: Some("mock timeout".to_string()),
                response_code: Some("504".to_string()),
            },
            _ => ProcessorResponse::completed(&format!("mock_{}_{}", prefix, uuid::Uuid::new_v4())),
        }
    }
}

#[async_trait::async_trait]
impl PaymentProcessor for MockProcessor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn authorize(&self, _request: AuthorizeRequest) -> Result<ProcessorResponse> {
        Ok(self.respond("auth"))
    }

    async fn capture(
        &self,
        _authorization_id: &str,
        _amount_minor: i64,
        _currency: &str,
        _idempotency_key: &str,
    ) -> Result<ProcessorResponse> {
        Ok(self.respond("cap"))
    }

    async fn void(&self, authorization_id: &str, _reason: &str) -> Result<ProcessorResponse> {
        let mut resp = self.respond("void");
        if resp.outcome == ProcessorOutcome::Completed {
            resp.transaction_id = Some(authorization_id.to_string());
        }
        Ok(resp)
    }
}
