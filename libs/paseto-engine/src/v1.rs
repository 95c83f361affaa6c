//! Version 1: NIST-compatible primitives
//!
//! local  = AES-256-CTR + HMAC-SHA384 (encrypt-then-MAC), keys split from
//!          the shared key with HKDF-SHA384
//! public = RSA-PSS with SHA-384, MGF1-SHA384, salt length = digest length

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rsa::pss;
use rsa::sha2::Sha384;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::pae::pae;
use crate::{PasetoError, Result};

pub(crate) const HEADER_LOCAL: &[u8] = b"v1.local.";
pub(crate) const HEADER_PUBLIC: &[u8] = b"v1.public.";

const NONCE_LEN: usize = 32;
const TAG_LEN: usize = 48;
const SIG_LEN: usize = 256;

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;
type HmacSha384 = Hmac<Sha384>;

/// Encrypt `message` into the raw token payload `nonce || ct || tag`
///
/// The nonce is derived from a random seed and the message itself
/// (HMAC-SHA384, truncated), so a repeated RNG output still cannot repeat a
/// (nonce, message) pair. `seed` is the test seam.
pub(crate) fn local_seal(
    key: &[u8; 32],
    message: &[u8],
    footer: &[u8],
    seed: Option<[u8; 32]>,
) -> Result<Vec<u8>> {
    let seed = seed.unwrap_or_else(random_bytes);
    let mut mac = new_hmac(&seed)?;
    mac.update(message);
    let digest = mac.finalize().into_bytes();
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&digest[..NONCE_LEN]);

    let (ek, ak) = derive_keys(key, &nonce)?;

    let mut ciphertext = message.to_vec();
    apply_ctr(&ek, &nonce[16..32], &mut ciphertext)?;

    let pre_auth = pae(&[HEADER_LOCAL, &nonce, &ciphertext, footer]);
    let mut mac = new_hmac(&ak)?;
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

    let (ek, ak) = derive_keys(key, &nonce)?;

    let pre_auth = pae(&[HEADER_LOCAL, &nonce, ciphertext, footer]);
    let mut mac = new_hmac(&ak)?;
    mac.update(&pre_auth);
    let expected = mac.finalize().into_bytes();
    if !token_codec::ct_eq(&expected, tag) {
        return Err(PasetoError::Integrity);
    }

    let mut plaintext = ciphertext.to_vec();
    apply_ctr(&ek, &nonce[16..32], &mut plaintext)?;
    Ok(plaintext)
}

/// Sign `message` into the raw token payload `message || sig`
pub(crate) fn public_sign(key: &RsaPrivateKey, message: &[u8], footer: &[u8]) -> Result<Vec<u8>> {
    let m2 = pae(&[HEADER_PUBLIC, message, footer]);
    let sk = pss::BlindedSigningKey::<Sha384>::new(key.clone());
    let sig = sk
        .try_sign_with_rng(&mut rand::thread_rng(), &m2)
        .map_err(|e| PasetoError::Crypto(e.to_string()))?;

    let mut payload = Vec::with_capacity(message.len() + SIG_LEN);
    payload.extend_from_slice(message);
    payload.extend_from_slice(&sig.to_vec());
    Ok(payload)
}

/// Verify a raw `message || sig` payload and return the message
pub(crate) fn public_verify(key: &RsaPublicKey, payload: &[u8], footer: &[u8]) -> Result<Vec<u8>> {
    if payload.len() <= SIG_LEN {
        return Err(PasetoError::Malformed("payload too short".into()));
    }
    let (message, sig) = payload.split_at(payload.len() - SIG_LEN);

    let m2 = pae(&[HEADER_PUBLIC, message, footer]);
    let vk = pss::VerifyingKey::<Sha384>::new(key.clone());
    let sig = pss::Signature::try_from(sig).map_err(|_| PasetoError::Integrity)?;
    vk.verify(&m2, &sig).map_err(|_| PasetoError::Integrity)?;
    Ok(message.to_vec())
}

fn derive_keys(key: &[u8; 32], nonce: &[u8; NONCE_LEN]) -> Result<([u8; 32], [u8; 32])> {
    let salt = &nonce[..16];
    let mut ek = [0u8; 32];
    Hkdf::<Sha384>::new(Some(salt), key)
        .expand(b"paseto-encryption-key", &mut ek)
        .map_err(|e| PasetoError::Crypto(e.to_string()))?;
    let mut ak = [0u8; 32];
    Hkdf::<Sha384>::new(Some(salt), key)
        .expand(b"paseto-auth-key", &mut ak)
        .map_err(|e| PasetoError::Crypto(e.to_string()))?;
    Ok((ek, ak))
}

fn apply_ctr(ek: &[u8; 32], iv: &[u8], buf: &mut [u8]) -> Result<()> {
    use aes::cipher::{KeyIvInit, StreamCipher};
    let mut cipher = Aes256Ctr::new_from_slices(ek, iv)
        .map_err(|e| PasetoError::Crypto(e.to_string()))?;
    cipher.apply_keystream(buf);
    Ok(())
}

fn new_hmac(key: &[u8]) -> Result<HmacSha384> {
    HmacSha384::new_from_slice(key).map_err(|e| PasetoError::Crypto(e.to_string()))
}

fn random_bytes<const N: usize>() -> [u8; N] {
    use rand::RngCore;
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
