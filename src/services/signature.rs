//! Webhook signature verification.
//!
//! The provider signs `"{timestamp}.{raw_body}"` with HMAC-SHA256 and sends
//! `t=<unix_ts>,v1=<hex>` (several `v1` entries while the provider rotates
//! its own key). Verification runs over the exact request bytes, before any
//! parsing, against the configured secrets in order — the first match wins,
//! which is what lets us rotate our secrets without downtime.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,

    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,

    #[error("no configured secret matched the signature")]
    NoSecretMatched,
}

#[derive(Clone)]
pub struct SignatureVerifier {
    secrets: Vec<String>,
    tolerance_secs: i64,
}

struct ParsedHeader<'a> {
    timestamp_raw: &'a str,
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl SignatureVerifier {
    pub fn new(secrets: Vec<String>, tolerance_secs: i64) -> Self {
        SignatureVerifier {
            secrets,
            tolerance_secs,
        }
    }

    pub fn verify(
        &self,
        payload: &[u8],
        header: &str,
        now_unix: i64,
    ) -> Result<(), SignatureError> {
        let parsed = parse_header(header)?;

        if (now_unix - parsed.timestamp).abs() > self.tolerance_secs {
            return Err(SignatureError::StaleTimestamp);
        }

        for secret in &self.secrets {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .expect("HMAC accepts keys of any size");
            mac.update(parsed.timestamp_raw.as_bytes());
            mac.update(b".");
            mac.update(payload);

            for signature in &parsed.signatures {
                // verify_slice is constant-time.
                if mac.clone().verify_slice(signature).is_ok() {
                    return Ok(());
                }
            }
        }

        Err(SignatureError::NoSecretMatched)
    }
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, SignatureError> {
    let mut timestamp_raw = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part.trim().split_once('=').ok_or(SignatureError::Malformed)?;
        match key {
            "t" => timestamp_raw = Some(value),
            "v1" => signatures.push(hex::decode(value).map_err(|_| SignatureError::Malformed)?),
            // Unknown schemes (v0 etc.) are skipped, not rejected.
            _ => {}
        }
    }

    let timestamp_raw = timestamp_raw.ok_or(SignatureError::Malformed)?;
    let timestamp: i64 = timestamp_raw
        .parse()
        .map_err(|_| SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }

    Ok(ParsedHeader {
        timestamp_raw,
        timestamp,
        signatures,
    })
}
