//! Webhook signatures: `x-uploadthing-signature: hmac-sha256=<hex>` over the
//! raw request body, keyed by the API secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::errors::{UploadError, UtResult};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-uploadthing-signature";
const SIGNATURE_PREFIX: &str = "hmac-sha256=";

/// Header value for `payload`.
pub fn sign_payload(payload: &[u8], secret: &str) -> UtResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| UploadError::internal("Invalid signing secret"))?;
    mac.update(payload);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Constant-time check of a signature header against `payload`.
pub fn verify_signature(payload: &[u8], signature: Option<&str>, secret: &str) -> bool {
    let Some(signature) = signature else {
        return false;
    };
    let Ok(expected) = sign_payload(payload, secret) else {
        return false;
    };
    expected.as_bytes().ct_eq(signature.trim().as_bytes()).into()
}
