//! Webhook signature verification.
//!
//! Shared-secret HMAC-SHA256 over `"{timestamp}.{payload}"`, delivered in a
//! `t=<unix>,v1=<hex>` header. Verification fails closed: any parse or
//! comparison failure rejects the event before a byte of the body is
//! trusted. The timestamp bound limits replay of captured deliveries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature on payment confirmations.
pub const SIGNATURE_HEADER: &str = "Pledgeline-Signature";

/// Default replay tolerance.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header missing")]
    MissingHeader,

    #[error("signature header malformed")]
    MalformedHeader,

    #[error("signature timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a signature header against the raw request body.
pub fn verify_signature(
    secret: &[u8],
    header: &str,
    payload: &[u8],
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    let (timestamp, provided) = parse_header(header)?;

    let skew = (now.timestamp() - timestamp).unsigned_abs();
    if skew > tolerance.as_secs() {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let provided = hex::decode(provided).map_err(|_| SignatureError::MalformedHeader)?;

    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::MalformedHeader)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

/// Produce a signature header for a payload. Used by tests and by client
/// code simulating the processor.
pub fn sign(secret: &[u8], payload: &[u8], at: DateTime<Utc>) -> String {
    let timestamp = at.timestamp();
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let digest = mac.finalize().into_bytes();
    format!("t={},v1={}", timestamp, hex::encode(digest))
}

fn parse_header(header: &str) -> Result<(i64, &str), SignatureError> {
    let mut timestamp = None;
    let mut v1 = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => v1 = Some(value),
            _ => {}
        }
    }
    match (timestamp, v1) {
        (Some(t), Some(sig)) => Ok((t, sig)),
        _ => Err(SignatureError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_test_secret";

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_roundtrip_verifies() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(SECRET, payload, now());
        assert_eq!(
            verify_signature(SECRET, &header, payload, now(), DEFAULT_TOLERANCE),
            Ok(())
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = sign(SECRET, br#"{"id":"evt_1"}"#, now());
        assert_eq!(
            verify_signature(SECRET, &header, br#"{"id":"evt_2"}"#, now(), DEFAULT_TOLERANCE),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(b"other_secret", payload, now());
        assert_eq!(
            verify_signature(SECRET, &header, payload, now(), DEFAULT_TOLERANCE),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(SECRET, payload, now());
        let later = now() + chrono::Duration::seconds(600);
        assert_eq!(
            verify_signature(SECRET, &header, payload, later, DEFAULT_TOLERANCE),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn test_malformed_header_rejected() {
        for header in ["", "t=abc,v1=00", "v1=00", "t=1700000000", "t=1,v1=zz"] {
            let result = verify_signature(SECRET, header, b"{}", now(), DEFAULT_TOLERANCE);
            assert!(result.is_err(), "header {:?} should fail", header);
        }
    }
}
