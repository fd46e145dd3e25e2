//! HMAC signature generation and verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Scheme version carried in the `X-Signature-Version` header.
pub const SIGNATURE_VERSION: &str = "v1";

/// Signs delivery payloads with a shared secret.
///
/// The signature is the lowercase hex HMAC-SHA256 digest of the raw
/// payload bytes, prefixed with the scheme: `sha256=<hex>`.
pub struct PayloadSigner {
    secret: String,
}

impl PayloadSigner {
    /// Creates a new signer with the given secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generates a signature for the given payload.
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Verifies a signature against the payload.
    pub fn verify(&self, signature: &str, payload: &[u8]) -> bool {
        let expected = self.sign(payload);
        constant_time_compare(&expected, signature)
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
