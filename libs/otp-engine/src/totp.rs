//! Time-based one-time passwords (RFC 6238)

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Hotp, OtpDigest, OtpError, Result};
use token_codec::ct_eq;

/// Default time step, in seconds
pub const DEFAULT_INTERVAL: u64 = 30;

/// TOTP generator and verifier
///
/// A thin layer over [`Hotp`] with `counter = unix_time / interval`.
#[derive(Debug, Clone, Copy)]
pub struct Totp {
    hotp: Hotp,
    interval: u64,
}

impl Totp {
    pub fn new(digits: u32, digest: OtpDigest, interval: u64) -> Result<Self> {
        if interval == 0 {
            return Err(OtpError::Configuration(
                "time step must be at least 1 second".into(),
            ));
        }
        Ok(Self {
            hotp: Hotp::new(digits, digest)?,
            interval,
        })
    }

    /// Six digits, SHA-1, 30-second step: what authenticator apps assume
    pub fn standard() -> Self {
        Self {
            hotp: Hotp {
                digits: 6,
                digest: OtpDigest::Sha1,
            },
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn digits(&self) -> u32 {
        self.hotp.digits()
    }

    pub fn digest(&self) -> OtpDigest {
        self.hotp.digest()
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Code for an explicit unix timestamp (seconds)
    pub fn at(&self, secret: &[u8], unix_time: u64) -> Result<String> {
        self.hotp.code_at(secret, unix_time / self.interval)
    }

    /// Code for the current wall clock
    pub fn now(&self, secret: &[u8]) -> Result<String> {
        self.at(secret, unix_now()?)
    }

    /// Check a submitted code at an explicit timestamp
    ///
    /// Accepts codes from the current window and up to `look_ahead` windows
    /// on either side, absorbing clock drift between prover and verifier.
    /// All candidate windows are evaluated; the result never discloses which
    /// one matched.
    pub fn verify_at(
        &self,
        secret: &[u8],
        code: &str,
        unix_time: u64,
        look_ahead: u64,
    ) -> Result<bool> {
        if code.len() != self.digits() as usize || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }

        let current = unix_time / self.interval;
        let start = current.saturating_sub(look_ahead);
        let end = current.saturating_add(look_ahead);

        let mut matched = false;
        for counter in start..=end {
            let expected = self.hotp.code_at(secret, counter)?;
            matched |= ct_eq(code.as_bytes(), expected.as_bytes());
        }
        Ok(matched)
    }

    /// Check a submitted code against the current wall clock
    pub fn verify(&self, secret: &[u8], code: &str, look_ahead: u64) -> Result<bool> {
        self.verify_at(secret, code, unix_now()?, look_ahead)
    }

    /// Build the otpauth:// provisioning URI for this engine
    ///
    /// `secret` must already be Base32-encoded.
    pub fn provisioning_uri(&self, secret: &str, account: &str, issuer: &str) -> String {
        let issuer_enc = urlencoding::encode(issuer);
        let account_enc = urlencoding::encode(account);
        format!(
            "otpauth://totp/{issuer_enc}:{account_enc}?secret={secret}&issuer={issuer_enc}&algorithm={alg}&digits={digits}&period={period}",
            alg = self.digest().as_str(),
            digits = self.digits(),
            period = self.interval,
        )
    }
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| OtpError::Clock(e.to_string()))?
        .as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B secrets, one per digest
    const SECRET_SHA1: &[u8] = b"12345678901234567890";
    const SECRET_SHA256: &[u8] = b"12345678901234567890123456789012";
    const SECRET_SHA512: &[u8] =
        b"1234567890123456789012345678901234567890123456789012345678901234";

    #[test]
    fn test_rfc6238_sha1_vectors() {
        let totp = Totp::new(8, OtpDigest::Sha1, 30).unwrap();
        let cases = [
            (59u64, "94287082"),
            (1111111109, "07081804"),
            (1111111111, "14050471"),
            (1234567890, "89005924"),
            (2000000000, "69279037"),
            (20000000000, "65353130"),
        ];
        for (time, want) in cases {
            assert_eq!(totp.at(SECRET_SHA1, time).unwrap(), want, "t={time}");
        }
    }

    #[test]
    fn test_rfc6238_sha256_vectors() {
        let totp = Totp::new(8, OtpDigest::Sha256, 30).unwrap();
        assert_eq!(totp.at(SECRET_SHA256, 59).unwrap(), "46119246");
        assert_eq!(totp.at(SECRET_SHA256, 1111111109).unwrap(), "68084774");
    }

    #[test]
    fn test_rfc6238_sha512_vectors() {
        let totp = Totp::new(8, OtpDigest::Sha512, 30).unwrap();
        assert_eq!(totp.at(SECRET_SHA512, 59).unwrap(), "90693936");
        assert_eq!(totp.at(SECRET_SHA512, 1111111109).unwrap(), "25091201");
    }

    #[test]
    fn test_verify_with_drift() {
        let totp = Totp::standard();
        let t = 1_111_111_111u64;
        let code = totp.at(SECRET_SHA1, t).unwrap();

        assert!(totp.verify_at(SECRET_SHA1, &code, t, 0).unwrap());
        // one step behind and ahead, inside the tolerance window
        assert!(totp.verify_at(SECRET_SHA1, &code, t + 30, 1).unwrap());
        assert!(totp.verify_at(SECRET_SHA1, &code, t - 30, 1).unwrap());
        // two steps away with a one-step window
        assert!(!totp.verify_at(SECRET_SHA1, &code, t + 60, 1).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_codes() {
        let totp = Totp::standard();
        assert!(!totp.verify_at(SECRET_SHA1, "12345", 59, 1).unwrap());
        assert!(!totp.verify_at(SECRET_SHA1, "1234a6", 59, 1).unwrap());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Totp::new(6, OtpDigest::Sha1, 0).is_err());
    }

    #[test]
    fn test_now_matches_at() {
        let totp = Totp::standard();
        let code = totp.now(SECRET_SHA1).unwrap();
        assert!(totp.verify(SECRET_SHA1, &code, 1).unwrap());
    }

    #[test]
    fn test_provisioning_uri() {
        let totp = Totp::standard();
        let uri = totp.provisioning_uri("JBSWY3DPEHPK3PXP", "user@example.com", "Keyforge");
        assert!(uri.starts_with("otpauth://totp/Keyforge:user%40example.com?"));
        assert!(uri.contains("secret=JBSWY3DPEHPK3PXP"));
        assert!(uri.contains("algorithm=SHA1"));
        assert!(uri.contains("digits=6"));
        assert!(uri.contains("period=30"));
    }
}
