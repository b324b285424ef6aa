use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign(secret: &str, payload: &[u8]) -> String {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature is not lowercase hex")]
    NotHex,
    #[error("signature does not match payload")]
    Mismatch,
}

/// Checks a hex signature over the exact bytes given, in constant time.
/// Only the canonical lowercase encoding that `sign` produces is accepted.
pub fn check(secret: &str, payload: &[u8], signature_hex: &str) -> Result<(), SignatureError> {
    if !signature_hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(SignatureError::NotHex);
    }
    let expected = hex::decode(signature_hex).map_err(|_| SignatureError::NotHex)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(payload);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

pub fn verify(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    check(secret, payload, signature_hex).is_ok()
}

/// Checkout callback signature: HMAC over `"<order_id>|<payment_id>"` with the API key secret.
pub fn verify_checkout(key_secret: &str, order_id: &str, payment_id: &str, signature_hex: &str) -> bool {
    let payload = format!("{order_id}|{payment_id}");
    verify(key_secret, payload.as_bytes(), signature_hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_the_same_secret() {
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign("whsec", body);
        assert_eq!(sig.len(), 64);
        assert!(verify("whsec", body, &sig));
        assert!(!verify("other", body, &sig));
    }

    #[test]
    fn any_flipped_byte_fails() {
        let body = br#"{"event":"payment.captured","created_at":1}"#.to_vec();
        let sig = sign("whsec", &body);
        for i in 0..body.len() {
            let mut tampered = body.clone();
            tampered[i] ^= 0x01;
            assert!(!verify("whsec", &tampered, &sig), "byte {i} not detected");
        }
    }

    #[test]
    fn only_the_exact_lowercase_encoding_matches() {
        let body = br#"{"event":"order.paid"}"#;
        let sig = sign("whsec", body);
        assert!(verify("whsec", body, &sig));
        assert_eq!(check("whsec", body, &sig.to_uppercase()), Err(SignatureError::NotHex));
        assert_eq!(check("whsec", body, &format!(" {sig}")), Err(SignatureError::NotHex));
        assert_eq!(check("whsec", body, &format!("{sig}\n")), Err(SignatureError::NotHex));
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        assert!(!verify("whsec", b"{}", "not-hex"));
        assert_eq!(check("whsec", b"{}", "zz"), Err(SignatureError::NotHex));
        assert_eq!(check("whsec", b"{}", "00ff"), Err(SignatureError::Mismatch));
    }

    #[test]
    fn checkout_signature_uses_pipe_joined_ids() {
        let sig = sign("key_secret", b"order_1|pay_1");
        assert!(verify_checkout("key_secret", "order_1", "pay_1", &sig));
        assert!(!verify_checkout("key_secret", "order_1", "pay_2", &sig));
    }
}
