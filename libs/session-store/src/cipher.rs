//! Sealed session identifiers
//!
//! The id a backend stores under never leaves the process in the clear: the
//! caller sees `enc.` followed by base64url(nonce || ciphertext || tag).
//! Opening returns `None` on any failure, so a forged or corrupted id is
//! indistinguishable from a session that never existed.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

use token_codec::{b64url_decode, b64url_encode};

use crate::{Result, SessionError};

const MARKER: &str = "enc.";
const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct SessionCipher {
    key: [u8; 32],
}

impl SessionCipher {
    pub fn new(key: &[u8]) -> Result<Self> {
        let key: [u8; 32] = key.try_into().map_err(|_| {
            SessionError::Configuration(format!(
                "session cipher key must be exactly 32 bytes, got {}",
                key.len()
            ))
        })?;
        Ok(Self { key })
    }

    pub(crate) fn seal(&self, id: &str) -> Result<String> {
        let nonce = random_nonce();
        let cipher = Aes256Gcm::new(&self.key.into());
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), id.as_bytes())
            .map_err(|_| SessionError::Crypto("session id encryption failed".into()))?;

        let mut raw = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&ciphertext);
        Ok(format!("{MARKER}{}", b64url_encode(&raw)))
    }

    /// `None` on a missing marker, bad encoding or failed AEAD check
    pub(crate) fn open(&self, sealed: &str) -> Option<String> {
        let encoded = sealed.strip_prefix(MARKER)?;
        let raw = b64url_decode(encoded).ok()?;
        if raw.len() <= NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(&self.key.into());
        let plaintext = cipher.decrypt(Nonce::from_slice(nonce), ciphertext).ok()?;
        String::from_utf8(plaintext).ok()
    }
}

fn random_nonce() -> [u8; NONCE_LEN] {
    use rand::RngCore;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
