//! HOTP and TOTP one-time password engine
//!
//! Implements RFC 4226 (counter-based) and RFC 6238 (time-based) codes with
//! SHA-1, SHA-256 and SHA-512 digests, plus the otpauth:// provisioning URI
//! format understood by authenticator apps.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use thiserror::Error;

mod hotp;
mod totp;

pub use hotp::Hotp;
pub use totp::Totp;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("invalid OTP configuration: {0}")]
    Configuration(String),

    #[error("invalid shared secret: {0}")]
    Secret(String),

    #[error("system clock error: {0}")]
    Clock(String),
}

pub type Result<T> = std::result::Result<T, OtpError>;

/// HMAC digest used as the moving-factor PRF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpDigest {
    Sha1,
    Sha256,
    Sha512,
}

impl OtpDigest {
    /// Name used in the provisioning URI `algorithm` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpDigest::Sha1 => "SHA1",
            OtpDigest::Sha256 => "SHA256",
            OtpDigest::Sha512 => "SHA512",
        }
    }
}

/// Generate a new shared secret (Base32 format, 256-bit entropy)
///
/// Returned without padding so it can be pasted into authenticator apps
/// or embedded in a provisioning URI directly.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    token_codec::base32_encode(&bytes)
}

pub(crate) fn hmac_bytes(digest: OtpDigest, secret: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match digest {
        OtpDigest::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(secret)
                .map_err(|e| OtpError::Secret(format!("invalid HMAC key: {e}")))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        OtpDigest::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret)
                .map_err(|e| OtpError::Secret(format!("invalid HMAC key: {e}")))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        OtpDigest::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(secret)
                .map_err(|e| OtpError::Secret(format!("invalid HMAC key: {e}")))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret() {
        let secret = generate_secret();
        // 32 bytes of entropy encode to 52 unpadded Base32 characters
        assert_eq!(secret.len(), 52);
        assert!(token_codec::base32_decode(&secret).is_ok());
        assert_ne!(secret, generate_secret());
    }

    #[test]
    fn test_digest_names() {
        assert_eq!(OtpDigest::Sha1.as_str(), "SHA1");
        assert_eq!(OtpDigest::Sha256.as_str(), "SHA256");
        assert_eq!(OtpDigest::Sha512.as_str(), "SHA512");
    }
}
