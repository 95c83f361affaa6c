//! Version 2: Sodium-era primitives
//!
//! local  = XChaCha20-Poly1305 with a fresh random 24-byte nonce, the
//!          pre-authentication encoding as associated data
//! public = Ed25519

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use ed25519_dalek::{Signer, Verifier};

use crate::pae::pae;
use crate::{PasetoError, Result};

pub(crate) const HEADER_LOCAL: &[u8] = b"v2.local.";
pub(crate) const HEADER_PUBLIC: &[u8] = b"v2.public.";

const NONCE_LEN: usize = 24;
const AEAD_TAG_LEN: usize = 16;
const SIG_LEN: usize = 64;

/// Encrypt `message` into the raw token payload `nonce || ct`
///
/// The AEAD tag is appended to the ciphertext by the cipher itself.
/// `nonce` is the test seam.
pub(crate) fn local_seal(
    key: &[u8; 32],
    message: &[u8],
    footer: &[u8],
    nonce: Option<[u8; NONCE_LEN]>,
) -> Result<Vec<u8>> {
    let nonce = nonce.unwrap_or_else(random_nonce);
    let aad = pae(&[HEADER_LOCAL, &nonce, footer]);

    let cipher = XChaCha20Poly1305::new(key.into());
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: message,
                aad: &aad,
            },
        )
        .map_err(|_| PasetoError::Crypto("AEAD encryption failed".into()))?;

    let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);
    Ok(payload)
}

/// Authenticate and decrypt a raw `nonce || ct` payload
pub(crate) fn local_open(key: &[u8; 32], payload: &[u8], footer: &[u8]) -> Result<Vec<u8>> {
    if payload.len() < NONCE_LEN + AEAD_TAG_LEN {
        return Err(PasetoError::Malformed("payload too short".into()));
    }
    let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
    let aad = pae(&[HEADER_LOCAL, nonce, footer]);

    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| PasetoError::Integrity)
}

/// Sign `message` into the raw token payload `message || sig`
pub(crate) fn public_sign(
    key: &ed25519_dalek::SigningKey,
    message: &[u8],
    footer: &[u8],
) -> Result<Vec<u8>> {
    let m2 = pae(&[HEADER_PUBLIC, message, footer]);
    let sig = key.sign(&m2);

    let mut payload = Vec::with_capacity(message.len() + SIG_LEN);
    payload.extend_from_slice(message);
    payload.extend_from_slice(&sig.to_bytes());
    Ok(payload)
}

/// Verify a raw `message || sig` payload and return the message
pub(crate) fn public_verify(
    key: &ed25519_dalek::VerifyingKey,
    payload: &[u8],
    footer: &[u8],
) -> Result<Vec<u8>> {
    if payload.len() <= SIG_LEN {
        return Err(PasetoError::Malformed("payload too short".into()));
    }
    let (message, sig) = payload.split_at(payload.len() - SIG_LEN);
    let sig = ed25519_dalek::Signature::from_slice(sig).map_err(|_| PasetoError::Integrity)?;

    let m2 = pae(&[HEADER_PUBLIC, message, footer]);
    key.verify(&m2, &sig).map_err(|_| PasetoError::Integrity)?;
    Ok(message.to_vec())
}

fn random_nonce() -> [u8; NONCE_LEN] {
    use rand::RngCore;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
