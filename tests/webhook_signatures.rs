use booking_engine::webhooks::signature::{
    compute_hmac_hex, parse_envelope_header, verify_envelope, verify_hmac_hex,
};

const SECRET: &str = "whsec_test123secret456";

fn sign_envelope(body: &[u8], secret: &str, timestamp: i64) -> String {
    let mut signed = timestamp.to_string().into_bytes();
    signed.push(b'.');
    signed.extend_from_slice(body);
    format!("t={},v1={}", timestamp, compute_hmac_hex(secret, &signed))
}

#[test]
fn raw_hmac_accepts_valid_signature() {
    let body = b"{\"event\":\"submission.completed\"}";
    let sig = compute_hmac_hex(SECRET, body);
    assert!(verify_hmac_hex(SECRET, body, &sig));
}

#[test]
fn raw_hmac_rejects_wrong_secret() {
    let body = b"{\"event\":\"submission.completed\"}";
    let sig = compute_hmac_hex("other-secret", body);
    assert!(!verify_hmac_hex(SECRET, body, &sig));
}

#[test]
fn raw_hmac_rejects_modified_body() {
    let body = b"{\"event\":\"submission.completed\"}";
    let tampered = b"{\"event\":\"submission.completed\",\"extra\":true}";
    let sig = compute_hmac_hex(SECRET, body);
    assert!(!verify_hmac_hex(SECRET, tampered, &sig));
}

#[test]
fn raw_hmac_rejects_garbage_signature() {
    let body = b"{}";
    assert!(!verify_hmac_hex(SECRET, body, "not-hex"));
    assert!(!verify_hmac_hex(SECRET, body, ""));
}

#[test]
fn envelope_accepts_fresh_valid_signature() {
    let body = b"{\"event_type\":\"PAYMENT.CAPTURE.COMPLETED\"}";
    let now = 1_900_000_000;
    let header = sign_envelope(body, SECRET, now);
    assert!(verify_envelope(SECRET, body, &header, now, 300));
}

#[test]
fn envelope_rejects_wrong_secret() {
    let body = b"{}";
    let now = 1_900_000_000;
    let header = sign_envelope(body, "wrong", now);
    assert!(!verify_envelope(SECRET, body, &header, now, 300));
}

#[test]
fn envelope_rejects_stale_timestamp() {
    let body = b"{}";
    let now = 1_900_000_000;
    // Signed 10 minutes ago, tolerance is 5.
    let header = sign_envelope(body, SECRET, now - 600);
    assert!(!verify_envelope(SECRET, body, &header, now, 300));
}

#[test]
fn envelope_rejects_future_timestamp_outside_tolerance() {
    let body = b"{}";
    let now = 1_900_000_000;
    let header = sign_envelope(body, SECRET, now + 600);
    assert!(!verify_envelope(SECRET, body, &header, now, 300));
}

#[test]
fn envelope_rejects_modified_body() {
    let body = b"{\"amount\":500}";
    let tampered = b"{\"amount\":5000}";
    let now = 1_900_000_000;
    let header = sign_envelope(body, SECRET, now);
    assert!(!verify_envelope(SECRET, tampered, &header, now, 300));
}

#[test]
fn envelope_rejects_malformed_header() {
    let body = b"{}";
    let now = 1_900_000_000;
    assert!(!verify_envelope(SECRET, body, "", now, 300));
    assert!(!verify_envelope(SECRET, body, "v1=abc", now, 300));
    assert!(!verify_envelope(SECRET, body, "t=notanumber,v1=abc", now, 300));
}

#[test]
fn envelope_header_parses_both_fields() {
    let parsed = parse_envelope_header("t=1700000000,v1=deadbeef").expect("parses");
    assert_eq!(parsed.timestamp, 1_700_000_000);
    assert_eq!(parsed.signature_hex, "deadbeef");

    assert!(parse_envelope_header("t=1700000000").is_none());
    assert!(parse_envelope_header("v1=deadbeef").is_none());
}
