//! Webhook signature gate.
//!
//! LINE signs every webhook body with HMAC-SHA256 keyed by the channel secret
//! and sends the base64 digest in `x-line-signature`. Verification must run on
//! the exact bytes received, before any JSON parsing.

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    hmac::{Hmac, Mac},
    sha2::Sha256,
    tracing::debug,
};

use crate::error::VerificationError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Optional algorithm prefix accepted in front of the base64 digest.
pub const SIGNATURE_PREFIX: &str = "sha256=";

const DIGEST_LEN: usize = 32;

/// Compute the base64 HMAC-SHA256 of `body` (without prefix).
pub fn compute_signature(body: &[u8], secret: &[u8]) -> Result<String, VerificationError> {
    let mut mac = new_mac(secret)?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify `signature_header` against the raw `body` bytes.
///
/// The header may carry a `sha256=` prefix; without it the whole header is
/// taken as the digest. The comparison is constant-time.
pub fn verify(body: &[u8], signature_header: &str, secret: &[u8]) -> Result<(), VerificationError> {
    let header = signature_header.trim();
    if header.is_empty() {
        return Err(VerificationError::MissingSignature);
    }

    let encoded = header.strip_prefix(SIGNATURE_PREFIX).unwrap_or(header);
    if encoded.is_empty() {
        return Err(VerificationError::malformed("empty digest"));
    }

    let provided = STANDARD
        .decode(encoded)
        .map_err(|e| VerificationError::malformed(format!("invalid base64: {e}")))?;
    if provided.len() != DIGEST_LEN {
        return Err(VerificationError::malformed(format!(
            "digest is {} bytes, expected {DIGEST_LEN}",
            provided.len()
        )));
    }

    let mut mac = new_mac(secret)?;
    mac.update(body);
    mac.verify_slice(&provided).map_err(|_| {
        debug!(body_len = body.len(), "webhook signature mismatch");
        VerificationError::SignatureMismatch
    })
}

fn new_mac(secret: &[u8]) -> Result<HmacSha256, VerificationError> {
    HmacSha256::new_from_slice(secret).map_err(|_| VerificationError::UnusableSecret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_channel_secret";

    fn header_for(body: &[u8], secret: &[u8]) -> String {
        format!("{SIGNATURE_PREFIX}{}", compute_signature(body, secret).unwrap())
    }

    #[test]
    fn accepts_prefixed_signature() {
        let body = br#"{"destination":"U1","events":[]}"#;
        assert_eq!(verify(body, &header_for(body, SECRET), SECRET), Ok(()));
    }

    #[test]
    fn accepts_bare_signature() {
        let body = br#"{"destination":"U1","events":[]}"#;
        let bare = compute_signature(body, SECRET).unwrap();
        assert_eq!(verify(body, &bare, SECRET), Ok(()));
    }

    #[test]
    fn any_flipped_byte_fails() {
        let body = br#"{"events":[{"type":"follow"}]}"#.to_vec();
        let header = header_for(&body, SECRET);
        for i in 0..body.len() {
            let mut tampered = body.clone();
            tampered[i] ^= 0x01;
            assert_eq!(
                verify(&tampered, &header, SECRET),
                Err(VerificationError::SignatureMismatch),
                "byte {i} flipped but signature still verified"
            );
        }
    }

    #[test]
    fn any_secret_length_keys_the_mac() {
        let body = b"{}";
        for secret in [&b""[..], &[0x5a; 200][..]] {
            let bare = compute_signature(body, secret).unwrap();
            assert_eq!(verify(body, &bare, secret), Ok(()));
        }
    }

    #[test]
    fn reserialized_json_fails() {
        let body = br#"{"destination": "U1", "events": []}"#;
        let header = header_for(body, SECRET);
        let value: serde_json::Value = serde_json::from_slice(body).unwrap();
        let reencoded = serde_json::to_vec(&value).unwrap();
        assert_ne!(body.as_slice(), reencoded.as_slice());
        assert_eq!(
            verify(&reencoded, &header, SECRET),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn wrong_secret_fails() {
        let body = b"payload";
        let header = header_for(body, b"another_secret");
        assert_eq!(
            verify(body, &header, SECRET),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn empty_header_is_missing() {
        assert_eq!(
            verify(b"x", "", SECRET),
            Err(VerificationError::MissingSignature)
        );
        assert_eq!(
            verify(b"x", "   ", SECRET),
            Err(VerificationError::MissingSignature)
        );
    }

    #[test]
    fn malformed_headers() {
        assert!(matches!(
            verify(b"x", "sha256=", SECRET),
            Err(VerificationError::MalformedSignature { .. })
        ));
        assert!(matches!(
            verify(b"x", "sha256=invalid_signature!", SECRET),
            Err(VerificationError::MalformedSignature { .. })
        ));
        // Valid base64, wrong digest length.
        assert!(matches!(
            verify(b"x", "sha256=aGVsbG8=", SECRET),
            Err(VerificationError::MalformedSignature { .. })
        ));
    }

    #[test]
    fn empty_body_and_empty_secret_still_sign() {
        let header = header_for(b"", b"");
        assert_eq!(verify(b"", &header, b""), Ok(()));
    }
}
