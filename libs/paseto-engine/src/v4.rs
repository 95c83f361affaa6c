//! Version 4: modern Sodium primitives
//!
//! local  = XChaCha20 + BLAKE2b-MAC (encrypt-then-MAC), keys and stream
//!          nonce split from the shared key with keyed BLAKE2b
//! public = Ed25519

use blake2::digest::consts::{U32, U56};
use blake2::digest::Mac;
use blake2::Blake2bMac;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::XChaCha20;
use ed25519_dalek::{Signer, Verifier};

use crate::pae::pae;
use crate::{PasetoError, Result};

pub(crate) const HEADER_LOCAL: &[u8] = b"v4.local.";
pub(crate) const HEADER_PUBLIC: &[u8] = b"v4.public.";

const NONCE_LEN: usize = 32;
const TAG_LEN: usize = 32;
const SIG_LEN: usize = 64;

// implicit assertions are not part of the API surface; always empty
const IMPLICIT: &[u8] = b"";

type KdfMac = Blake2bMac<U56>;
type AuthMac = Blake2bMac<U32>;

/// Encrypt `message` into the raw token payload `nonce || ct || tag`
///
/// `nonce` is the test seam.
pub(crate) fn local_seal(
    key: &[u8; 32],
    message: &[u8],
    footer: &[u8],
    nonce: Option<[u8; NONCE_LEN]>,
) -> Result<Vec<u8>> {
    let nonce = nonce.unwrap_or_else(random_nonce);
    let (ek, n2, ak) = derive_keys(key, &nonce)?;

    let mut ciphertext = message.to_vec();
    let mut cipher = XChaCha20::new(&ek.into(), &n2.into());
    cipher.apply_keystream(&mut ciphertext);

    let pre_auth = pae(&[HEADER_LOCAL, &nonce, &ciphertext, footer, IMPLICIT]);
    let mut mac = new_auth_mac(&ak)?;
    mac.update(&pre_auth);
    let tag = mac.finalize().into_bytes();

    let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len() + TAG_LEN);
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);
    payload.extend_from_slice(&tag);
    Ok(payload)
}

/// Authenticate and decrypt a raw `nonce || ct || tag` payload
pub(crate) fn local_open(key: &[u8; 32], payload: &[u8], footer: &[u8]) -> Result<Vec<u8>> {
    if payload.len() < NONCE_LEN + TAG_LEN {
        return Err(PasetoError::Malformed("payload too short".into()));
    }
    let nonce: [u8; NONCE_LEN] = payload[..NONCE_LEN]
        .try_into()
        .map_err(|_| PasetoError::Malformed("payload too short".into()))?;
    let ciphertext = &payload[NONCE_LEN..payload.len() - TAG_LEN];
    let tag = &payload[payload.len() - TAG_LEN..];

    let (ek, n2, ak) = derive_keys(key, &nonce)?;

    let pre_auth = pae(&[HEADER_LOCAL, &nonce, ciphertext, footer, IMPLICIT]);
    let mut mac = new_auth_mac(&ak)?;
    mac.update(&pre_auth);
    let expected = mac.finalize().into_bytes();
    if !token_codec::ct_eq(&expected, tag) {
        return Err(PasetoError::Integrity);
    }

    let mut plaintext = ciphertext.to_vec();
    let mut cipher = XChaCha20::new(&ek.into(), &n2.into());
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}

/// Sign `message` into the raw token payload `message || sig`
pub(crate) fn public_sign(
    key: &ed25519_dalek::SigningKey,
    message: &[u8],
    footer: &[u8],
) -> Result<Vec<u8>> {
    let m2 = pae(&[HEADER_PUBLIC, message, footer, IMPLICIT]);
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

    let m2 = pae(&[HEADER_PUBLIC, message, footer, IMPLICIT]);
    key.verify(&m2, &sig).map_err(|_| PasetoError::Integrity)?;
    Ok(message.to_vec())
}

/// Keyed-BLAKE2b key split: one 56-byte derivation yields the XChaCha20 key
/// and its 24-byte stream nonce, a second 32-byte derivation yields the
/// authentication key.
fn derive_keys(key: &[u8; 32], nonce: &[u8; NONCE_LEN]) -> Result<([u8; 32], [u8; 24], [u8; 32])> {
    let mut mac =
        <KdfMac as Mac>::new_from_slice(key).map_err(|e| PasetoError::Crypto(e.to_string()))?;
    mac.update(b"paseto-encryption-key");
    mac.update(nonce);
    let tmp = mac.finalize().into_bytes();
    let mut ek = [0u8; 32];
    ek.copy_from_slice(&tmp[..32]);
    let mut n2 = [0u8; 24];
    n2.copy_from_slice(&tmp[32..56]);

    let mut mac = new_auth_mac(key)?;
    mac.update(b"paseto-auth-key-for-aead");
    mac.update(nonce);
    let mut ak = [0u8; 32];
    ak.copy_from_slice(&mac.finalize().into_bytes());

    Ok((ek, n2, ak))
}

fn new_auth_mac(key: &[u8]) -> Result<AuthMac> {
    <AuthMac as Mac>::new_from_slice(key).map_err(|e| PasetoError::Crypto(e.to_string()))
}

fn random_nonce() -> [u8; NONCE_LEN] {
    use rand::RngCore;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
