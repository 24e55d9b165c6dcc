use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded HMAC-SHA256 of the webhook body.
pub const SIGNATURE_HEADER: &str = "X-Rail-Signature";
/// Header carrying the unix timestamp the signature was computed over.
pub const TIMESTAMP_HEADER: &str = "X-Rail-Timestamp";

/// Signature verification for payment-rail webhook deliveries.
///
/// The rail signs `"{timestamp}{body}"` with a shared secret; no replay
/// window is enforced beyond the timestamp being part of the signed payload.
#[derive(Clone)]
pub struct WebhookAuth {
    secret: Vec<u8>,
    enabled: bool,
}

impl WebhookAuth {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.clone().unwrap_or_default().as_bytes().to_vec(),
            enabled: secret.is_some(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Create HMAC-SHA256 signature for a body with timestamp
    pub fn create_signature(&self, body: &str, timestamp: i64) -> Result<String, String> {
        if !self.enabled {
            return Ok(String::new());
        }

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| format!("Failed to create HMAC: {}", e))?;

        let payload = format!("{}{}", timestamp, body);
        mac.update(payload.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify HMAC signature for a body with timestamp
    pub fn verify_signature(&self, body: &str, timestamp: i64, signature: &str) -> bool {
        if !self.enabled {
            return true;
        }

        match self.create_signature(body, timestamp) {
            Ok(expected) => expected == signature,
            Err(_) => false,
        }
    }
}
