use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::ServerError;

/// Base64-encoded HMAC-SHA256 over `data`, the same scheme the payment processor uses to sign webhook bodies.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> Result<String, ServerError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ServerError::ConfigurationError(format!("Invalid HMAC key. {e}")))?;
    mac.update(data);
    Ok(base64::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod test {
    use super::calculate_hmac;

    #[test]
    fn hmac_is_stable_and_keyed() {
        let sig = calculate_hmac("topsecret", b"{\"event_type\":\"payment_captured\"}").unwrap();
        let same = calculate_hmac("topsecret", b"{\"event_type\":\"payment_captured\"}").unwrap();
        let other_key = calculate_hmac("othersecret", b"{\"event_type\":\"payment_captured\"}").unwrap();
        let other_body = calculate_hmac("topsecret", b"{}").unwrap();
        assert_eq!(sig, same);
        assert_ne!(sig, other_key);
        assert_ne!(sig, other_body);
    }
}
