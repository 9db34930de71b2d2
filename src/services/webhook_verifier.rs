//! HMAC-SHA256 signature verification for provider webhooks (§10.6).

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::{EngineError, EngineResult};
use crate::services::secret_service::SecretService;

type HmacSha256 = Hmac<Sha256>;

/// Verifies `signature` (hex-encoded HMAC-SHA256) over `raw_body` using the
/// `<PROVIDER>_WEBHOOK_SECRET` environment secret. Constant-time comparison
/// is delegated to `hmac`'s `verify_slice`.
pub fn verify(provider: &str, raw_body: &[u8], signature: &str) -> EngineResult<()> {
    let secret = SecretService::new()
        .get_webhook_secret(provider)
        .map_err(|e| EngineError::Configuration { message: e.to_string() })?;

    let signature_bytes = hex::decode(signature).map_err(|_| EngineError::Unauthorized { message: "malformed webhook signature".to_string() })?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| EngineError::internal(format!("invalid webhook secret: {e}")))?;
    mac.update(raw_body);

    mac.verify_slice(&signature_bytes)
        .map_err(|_| EngineError::Unauthorized { message: "webhook signature verification failed".to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::Mac as _;

    #[test]
    fn accepts_matching_signature() {
        std::env::set_var("TESTPROVIDER_WEBHOOK_SECRET", "a-sufficiently-long-shared-secret");
        let body = b"{\"event\":\"payment.settled\"}";
        let mut mac = HmacSha256::new_from_slice(b"a-sufficiently-long-shared-secret").unwrap();
        mac.update(body);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify("testprovider", body, &signature).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        std::env::set_var("TESTPROVIDER2_WEBHOOK_SECRET", "a-sufficiently-long-shared-secret");
        let mut mac = HmacSha256::new_from_slice(b"a-sufficiently-long-shared-secret").unwrap();
        mac.update(b"original");
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify("testprovider2", b"tampered", &signature).is_err());
    }
}
