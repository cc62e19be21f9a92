use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 over the exact raw body bytes.
pub fn compute_hmac_hex(secret: &str, body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of a provided hex signature against the raw body.
pub fn verify_hmac_hex(secret: &str, body: &[u8], provided_hex: &str) -> bool {
    let Ok(provided) = hex::decode(provided_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEnvelope {
    pub timestamp: i64,
    pub signature_hex: String,
}

/// Parses a signed-envelope header of the form `t=<unix ts>,v1=<hex hmac>`.
pub fn parse_envelope_header(value: &str) -> Option<ParsedEnvelope> {
    let mut timestamp = None;
    let mut signature_hex = None;

    for part in value.split(',') {
        let (key, val) = part.trim().split_once('=')?;
        match key {
            "t" => timestamp = val.parse::<i64>().ok(),
            "v1" => signature_hex = Some(val.to_string()),
            _ => {}
        }
    }

    Some(ParsedEnvelope {
        timestamp: timestamp?,
        signature_hex: signature_hex?,
    })
}

/// Signed-envelope verification: the HMAC covers `"<ts>.<raw body>"` and the
/// timestamp must be within `tolerance_secs` of `now_unix` (replay guard).
pub fn verify_envelope(
    secret: &str,
    body: &[u8],
    header_value: &str,
    now_unix: i64,
    tolerance_secs: i64,
) -> bool {
    let Some(envelope) = parse_envelope_header(header_value) else {
        return false;
    };

    if (now_unix - envelope.timestamp).abs() > tolerance_secs {
        return false;
    }

    let mut signed = envelope.timestamp.to_string().into_bytes();
    signed.push(b'.');
    signed.extend_from_slice(body);

    verify_hmac_hex(secret, &signed, &envelope.signature_hex)
}
