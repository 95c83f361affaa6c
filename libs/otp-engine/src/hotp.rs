//! Counter-based one-time passwords (RFC 4226)

use tracing::warn;

use crate::{hmac_bytes, OtpDigest, OtpError, Result};
use token_codec::{ct_eq, pack_u64_be};

/// Stateless HOTP generator and verifier
///
/// Counter state lives with the caller; the engine only derives and checks
/// codes for the counters it is handed.
#[derive(Debug, Clone, Copy)]
pub struct Hotp {
    pub(crate) digits: u32,
    pub(crate) digest: OtpDigest,
}

impl Hotp {
    /// Build an HOTP engine
    ///
    /// `digits` must be within 6..=10; anything else is rejected at
    /// construction so call sites never see a truncated code.
    pub fn new(digits: u32, digest: OtpDigest) -> Result<Self> {
        if !(6..=10).contains(&digits) {
            return Err(OtpError::Configuration(format!(
                "digits must be within 6..=10, got {digits}"
            )));
        }
        Ok(Self { digits, digest })
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn digest(&self) -> OtpDigest {
        self.digest
    }

    /// Derive the code for a counter value
    ///
    /// HMAC over the big-endian counter, dynamic truncation per RFC 4226
    /// section 5.3, then reduction modulo 10^digits with zero padding.
    pub fn code_at(&self, secret: &[u8], counter: u64) -> Result<String> {
        let hash = hmac_bytes(self.digest, secret, &pack_u64_be(counter))?;

        let offset = (hash[hash.len() - 1] & 0x0f) as usize;
        let p = u32::from_be_bytes([
            hash[offset] & 0x7f,
            hash[offset + 1],
            hash[offset + 2],
            hash[offset + 3],
        ]);

        let code = u64::from(p) % 10u64.pow(self.digits);
        Ok(format!("{code:0width$}", width = self.digits as usize))
    }

    /// Check a submitted code against `[counter, counter + look_ahead]`
    ///
    /// Every window in the range is evaluated and compared in constant time;
    /// the result never discloses which window matched.
    pub fn verify(&self, secret: &[u8], code: &str, counter: u64, look_ahead: u64) -> Result<bool> {
        if code.len() != self.digits as usize || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }

        let mut matched = false;
        for offset in 0..=look_ahead {
            let expected = self.code_at(secret, counter + offset)?;
            matched |= ct_eq(code.as_bytes(), expected.as_bytes());
        }

        if !matched {
            warn!(counter, look_ahead, "HOTP verification failed");
        }
        Ok(matched)
    }

    /// Build the otpauth:// provisioning URI for this engine
    ///
    /// `secret` must already be Base32-encoded. Label and issuer are
    /// percent-encoded for QR-code consumption.
    pub fn provisioning_uri(
        &self,
        secret: &str,
        account: &str,
        issuer: &str,
        counter: u64,
    ) -> String {
        let issuer_enc = urlencoding::encode(issuer);
        let account_enc = urlencoding::encode(account);
        format!(
            "otpauth://hotp/{issuer_enc}:{account_enc}?secret={secret}&issuer={issuer_enc}&algorithm={alg}&digits={digits}&counter={counter}",
            alg = self.digest.as_str(),
            digits = self.digits,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4226 appendix D reference secret
    const SECRET: &[u8] = b"12345678901234567890";

    #[test]
    fn test_rfc4226_vectors() {
        let hotp = Hotp::new(6, OtpDigest::Sha1).unwrap();
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        for (counter, want) in expected.iter().enumerate() {
            let code = hotp.code_at(SECRET, counter as u64).unwrap();
            assert_eq!(&code, want, "counter {counter}");
        }
    }

    #[test]
    fn test_digit_range_enforced() {
        assert!(Hotp::new(5, OtpDigest::Sha1).is_err());
        assert!(Hotp::new(11, OtpDigest::Sha1).is_err());
        assert!(Hotp::new(10, OtpDigest::Sha1).is_ok());
    }

    #[test]
    fn test_verify_within_look_ahead() {
        let hotp = Hotp::new(6, OtpDigest::Sha1).unwrap();
        let code = hotp.code_at(SECRET, 5).unwrap();

        assert!(hotp.verify(SECRET, &code, 5, 0).unwrap());
        assert!(hotp.verify(SECRET, &code, 3, 2).unwrap());
        // outside the window
        assert!(!hotp.verify(SECRET, &code, 3, 1).unwrap());
        assert!(!hotp.verify(SECRET, &code, 6, 4).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_codes() {
        let hotp = Hotp::new(6, OtpDigest::Sha1).unwrap();
        assert!(!hotp.verify(SECRET, "75522", 0, 0).unwrap());
        assert!(!hotp.verify(SECRET, "7552245", 0, 0).unwrap());
        assert!(!hotp.verify(SECRET, "75522a", 0, 0).unwrap());
    }

    #[test]
    fn test_eight_digit_codes() {
        let hotp = Hotp::new(8, OtpDigest::Sha1).unwrap();
        let code = hotp.code_at(SECRET, 0).unwrap();
        assert_eq!(code.len(), 8);
        // the 6-digit RFC value is the low-order suffix of the 8-digit code
        assert!(code.ends_with("755224"));
    }

    #[test]
    fn test_provisioning_uri() {
        let hotp = Hotp::new(6, OtpDigest::Sha1).unwrap();
        let uri = hotp.provisioning_uri("JBSWY3DPEHPK3PXP", "user@example.com", "Keyforge", 7);
        assert!(uri.starts_with("otpauth://hotp/Keyforge:user%40example.com?"));
        assert!(uri.contains("secret=JBSWY3DPEHPK3PXP"));
        assert!(uri.contains("algorithm=SHA1"));
        assert!(uri.contains("digits=6"));
        assert!(uri.contains("counter=7"));
    }
}
