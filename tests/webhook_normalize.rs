use booking_engine::domain::webhook::{WebhookEventType, WebhookProvider};
use booking_engine::webhooks::normalize::{normalize, NormalizeError};
use uuid::Uuid;

fn payment_body(event_type: &str, booking_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": "WH-58D329510W468432D-8HN650336L201105X",
        "event_type": event_type,
        "create_time": "2030-07-01T10:00:00Z",
        "resource": {
            "id": "CAP-7XL12345",
            "custom_id": booking_id,
        }
    }))
    .expect("serializes")
}

#[test]
fn payment_capture_maps_to_payment_captured() {
    let booking_id = Uuid::new_v4();
    let event = normalize(
        WebhookProvider::Payment,
        &payment_body("PAYMENT.CAPTURE.COMPLETED", &booking_id.to_string()),
    )
    .expect("normalizes");

    assert_eq!(event.provider, WebhookProvider::Payment);
    assert_eq!(event.event_type, WebhookEventType::PaymentCaptured);
    assert_eq!(event.booking_id, booking_id);
    assert_eq!(event.webhook_id, "WH-58D329510W468432D-8HN650336L201105X");
}

#[test]
fn payment_void_maps_to_payment_voided() {
    let booking_id = Uuid::new_v4();
    let event = normalize(
        WebhookProvider::Payment,
        &payment_body("PAYMENT.AUTHORIZATION.VOIDED", &booking_id.to_string()),
    )
    .expect("normalizes");
    assert_eq!(event.event_type, WebhookEventType::PaymentVoided);
}

#[test]
fn unsubscribed_payment_event_is_unsupported() {
    let booking_id = Uuid::new_v4().to_string();
    let result = normalize(
        WebhookProvider::Payment,
        &payment_body("CHECKOUT.ORDER.APPROVED", &booking_id),
    );
    assert!(matches!(result, Err(NormalizeError::UnsupportedEvent(_))));
}

#[test]
fn missing_booking_reference_is_rejected() {
    let body = serde_json::to_vec(&serde_json::json!({
        "id": "WH-1",
        "event_type": "PAYMENT.CAPTURE.COMPLETED",
        "resource": {}
    }))
    .expect("serializes");
    let result = normalize(WebhookProvider::Payment, &body);
    assert!(matches!(result, Err(NormalizeError::MissingBookingRef)));
}

#[test]
fn non_uuid_booking_reference_is_rejected() {
    let result = normalize(
        WebhookProvider::Payment,
        &payment_body("PAYMENT.CAPTURE.COMPLETED", "order-42"),
    );
    assert!(matches!(result, Err(NormalizeError::MissingBookingRef)));
}

#[test]
fn non_json_body_is_malformed() {
    let result = normalize(WebhookProvider::Payment, b"not json at all");
    assert!(matches!(result, Err(NormalizeError::Malformed(_))));
}

fn esign_body(event: &str, booking_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "event_id": "evt_01HZX",
        "event": event,
        "created_at": "2030-07-01T11:00:00Z",
        "data": {
            "metadata": { "booking_id": booking_id }
        }
    }))
    .expect("serializes")
}

#[test]
fn esign_vocabulary_maps_to_contract_statuses() {
    let booking_id = Uuid::new_v4().to_string();

    let signed = normalize(WebhookProvider::Esign, &esign_body("submission.completed", &booking_id))
        .expect("normalizes");
    assert_eq!(signed.event_type, WebhookEventType::ContractSigned);

    let declined = normalize(WebhookProvider::Esign, &esign_body("submission.declined", &booking_id))
        .expect("normalizes");
    assert_eq!(declined.event_type, WebhookEventType::ContractDeclined);

    let viewed = normalize(WebhookProvider::Esign, &esign_body("submission.viewed", &booking_id))
        .expect("normalizes");
    assert_eq!(viewed.event_type, WebhookEventType::ContractViewed);
}

fn email_body(event: &str, booking_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "message_id": "msg_9f2c",
        "event": event,
        "timestamp": "2030-07-01T12:00:00Z",
        "metadata": { "booking_id": booking_id }
    }))
    .expect("serializes")
}

#[test]
fn email_vocabulary_maps_to_email_events() {
    let booking_id = Uuid::new_v4().to_string();

    let sent = normalize(WebhookProvider::Email, &email_body("delivered", &booking_id))
        .expect("normalizes");
    assert_eq!(sent.event_type, WebhookEventType::EmailSent);

    let failed = normalize(WebhookProvider::Email, &email_body("bounced", &booking_id))
        .expect("normalizes");
    assert_eq!(failed.event_type, WebhookEventType::EmailFailed);
}

#[test]
fn raw_payload_is_preserved_verbatim() {
    let booking_id = Uuid::new_v4();
    let body = payment_body("PAYMENT.CAPTURE.COMPLETED", &booking_id.to_string());
    let event = normalize(WebhookProvider::Payment, &body).expect("normalizes");
    let reparsed: serde_json::Value = serde_json::from_slice(&body).expect("valid json");
    assert_eq!(event.raw_payload, reparsed);
}
