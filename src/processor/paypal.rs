use crate::processor::{AuthorizeRequest, PaymentProcessor, ProcessorOutcome, ProcessorResponse};
use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

pub struct PaypalProcessor {
    pub base_url: String,
    pub access_token: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl PaypalProcessor {
    fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    fn from_send_error(e: reqwest::Error) -> ProcessorResponse {
        if e.is_timeout() {
            ProcessorResponse {
                outcome: ProcessorOutcome::Timeout,
                transaction_id: None,
                error_code: Some("TIMEOUT".to_string()),
                error_message: Some("processor timeout".to_string()),
                response_code: Some("504".to_string()),
            }
        } else {
            ProcessorResponse {
                outcome: ProcessorOutcome::Declined,
                transaction_id: None,
                error_code: Some("NETWORK_ERROR".to_string()),
                error_message: Some(e.to_string()),
                response_code: None,
            }
        }
    }

    async fn from_error_response(r: reqwest::Response) -> ProcessorResponse {
        let status = r.status();
        let body = r.text().await.unwrap_or_default();
        ProcessorResponse {
            outcome: if status == StatusCode::REQUEST_TIMEOUT {
                ProcessorOutcome::Timeout
            } else {
                ProcessorOutcome::Declined
            },
            transaction_id: None,
            error_code: Some(format!("HTTP_{}", status.as_u16())),
            error_message: Some(body.chars().take(200).collect()),
            response_code: Some(status.as_u16().to_string()),
        }
    }
}

#[async_trait::async_trait]
impl PaymentProcessor for PaypalProcessor {
    fn name(&self) -> &'static str {
        "paypal"
    }

    async fn authorize(&self, request: AuthorizeRequest) -> Result<ProcessorResponse> {
        let url = format!("{}/v2/payments/authorizations", self.base_url);
        let body = json!({
            "amount": {
                "value": format_minor(request.amount_minor),
                "currency_code": request.currency,
            },
            "custom_id": request.booking_id.to_string(),
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await;

        let result = match resp {
            Ok(r) if r.status().is_success() => {
                let v: serde_json::Value = r.json().await.unwrap_or_default();
                match v.get("id").and_then(|id| id.as_str()) {
                    Some(id) => ProcessorResponse::completed(id),
                    None => ProcessorResponse {
                        outcome: ProcessorOutcome::Declined,
                        transaction_id: None,
                        error_code: Some("MISSING_AUTHORIZATION_ID".to_string()),
                        error_message: Some("2xx response without an authorization id".to_string()),
                        response_code: Some("200".to_string()),
                    },
                }
            }
            Ok(r) => Self::from_error_response(r).await,
            Err(e) => Self::from_send_error(e),
        };

        Ok(result)
    }

    async fn capture(
        &self,
        authorization_id: &str,
        amount_minor: i64,
        currency: &str,
        idempotency_key: &str,
    ) -> Result<ProcessorResponse> {
        let url = format!(
            "{}/v2/payments/authorizations/{}/capture",
            self.base_url, authorization_id
        );
        let body = json!({
            "amount": {
                "value": format_minor(amount_minor),
                "currency_code": currency,
            },
            "final_capture": true,
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .header("PayPal-Request-Id", idempotency_key)
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await;

        let result = match resp {
            Ok(r) if r.status().is_success() => {
                let v: serde_json::Value = r.json().await.unwrap_or_default();
                let status = v.get("status").and_then(|s| s.as_str()).unwrap_or("");
                if status == "COMPLETED" {
                    let id = v.get("id").and_then(|id| id.as_str()).unwrap_or(authorization_id);
                    ProcessorResponse::completed(id)
                } else {
                    // A 2xx with a non-COMPLETED status is still not a capture.
                    ProcessorResponse {
                        outcome: ProcessorOutcome::Declined,
                        transaction_id: None,
                        error_code: Some(format!("CAPTURE_STATUS_{status}")),
                        error_message: Some("capture did not complete".to_string()),
                        response_code: Some("200".to_string()),
                    }
                }
            }
            Ok(r) => Self::from_error_response(r).await,
            Err(e) => Self::from_send_error(e),
        };

        Ok(result)
    }

    async fn void(&self, authorization_id: &str, _reason: &str) -> Result<ProcessorResponse> {
        let url = format!(
            "{}/v2/payments/authorizations/{}/void",
            self.base_url, authorization_id
        );

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .timeout(self.timeout())
            .send()
            .await;

        let result = match resp {
            Ok(r) if r.status().is_success() => ProcessorResponse {
                outcome: ProcessorOutcome::Completed,
                transaction_id: Some(authorization_id.to_string()),
                error_code: None,
                error_message: None,
                response_code: Some(r.status().as_u16().to_string()),
            },
            Ok(r) => Self::from_error_response(r).await,
            Err(e) => Self::from_send_error(e),
        };

        Ok(result)
    }
}

fn format_minor(amount_minor: i64) -> String {
    format!("{}.{:02}", amount_minor / 100, (amount_minor % 100).abs())
}
