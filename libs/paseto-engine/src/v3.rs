//! Version 3: modern NIST primitives
//!
//! local  = AES-256-CTR + HMAC-SHA384, both keys and the counter IV derived
//!          from the shared key and nonce with HKDF-SHA384
//! public = ECDSA over P-384 with SHA-384, low-S signatures, the compressed
//!          public key bound into the signed pre-authentication encoding

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use p384::ecdsa::signature::{Signer, Verifier};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use sha2::Sha384;

use crate::pae::pae;
use crate::{PasetoError, Result};

pub(crate) const HEADER_LOCAL: &[u8] = b"v3.local.";
pub(crate) const HEADER_PUBLIC: &[u8] = b"v3.public.";

const NONCE_LEN: usize = 32;
const TAG_LEN: usize = 48;
const SIG_LEN: usize = 96;

// implicit assertions are not part of the API surface; always empty
const IMPLICIT: &[u8] = b"";

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;
type HmacSha384 = Hmac<Sha384>;

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
    let (ek, iv, ak) = derive_keys(key, &nonce)?;

    let mut ciphertext = message.to_vec();
    apply_ctr(&ek, &iv, &mut ciphertext)?;

    let pre_auth = pae(&[HEADER_LOCAL, &nonce, &ciphertext, footer, IMPLICIT]);
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

    let (ek, iv, ak) = derive_keys(key, &nonce)?;

    let pre_auth = pae(&[HEADER_LOCAL, &nonce, ciphertext, footer, IMPLICIT]);
    let mut mac = new_hmac(&ak)?;
    mac.update(&pre_auth);
    let expected = mac.finalize().into_bytes();
    if !token_codec::ct_eq(&expected, tag) {
        return Err(PasetoError::Integrity);
    }

    let mut plaintext = ciphertext.to_vec();
    apply_ctr(&ek, &iv, &mut plaintext)?;
    Ok(plaintext)
}

/// Sign `message` into the raw token payload `message || sig`
pub(crate) fn public_sign(key: &SigningKey, message: &[u8], footer: &[u8]) -> Result<Vec<u8>> {
    let pk = key.verifying_key().to_encoded_point(true);
    let m2 = pae(&[pk.as_bytes(), HEADER_PUBLIC, message, footer, IMPLICIT]);

    let sig: Signature = key.sign(&m2);
    let sig = sig.normalize_s().unwrap_or(sig);

    let mut payload = Vec::with_capacity(message.len() + SIG_LEN);
    payload.extend_from_slice(message);
    payload.extend_from_slice(&sig.to_bytes());
    Ok(payload)
}

/// Verify a raw `message || sig` payload and return the message
pub(crate) fn public_verify(key: &VerifyingKey, payload: &[u8], footer: &[u8]) -> Result<Vec<u8>> {
    if payload.len() <= SIG_LEN {
        return Err(PasetoError::Malformed("payload too short".into()));
    }
    let (message, sig) = payload.split_at(payload.len() - SIG_LEN);
    let sig = Signature::from_slice(sig).map_err(|_| PasetoError::Integrity)?;

    let pk = key.to_encoded_point(true);
    let m2 = pae(&[pk.as_bytes(), HEADER_PUBLIC, message, footer, IMPLICIT]);
    key.verify(&m2, &sig).map_err(|_| PasetoError::Integrity)?;
    Ok(message.to_vec())
}

/// HKDF-SHA384 expansion of the shared key: the encryption key and counter
/// IV come from one info string, the authentication key from another, with
/// the nonce appended to both so each token gets a distinct key pair.
fn derive_keys(key: &[u8; 32], nonce: &[u8; NONCE_LEN]) -> Result<([u8; 32], [u8; 16], [u8; 48])> {
    let hk = Hkdf::<Sha384>::new(None, key);

    let mut info = Vec::with_capacity(21 + NONCE_LEN);
    info.extend_from_slice(b"paseto-encryption-key");
    info.extend_from_slice(nonce);
    let mut tmp = [0u8; 48];
    hk.expand(&info, &mut tmp)
        .map_err(|e| PasetoError::Crypto(e.to_string()))?;
    let mut ek = [0u8; 32];
    ek.copy_from_slice(&tmp[..32]);
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&tmp[32..48]);

    let mut info = Vec::with_capacity(24 + NONCE_LEN);
    info.extend_from_slice(b"paseto-auth-key-for-aead");
    info.extend_from_slice(nonce);
    let mut ak = [0u8; 48];
    hk.expand(&info, &mut ak)
        .map_err(|e| PasetoError::Crypto(e.to_string()))?;

    Ok((ek, iv, ak))
}

fn apply_ctr(ek: &[u8; 32], iv: &[u8; 16], buf: &mut [u8]) -> Result<()> {
    use aes::cipher::{KeyIvInit, StreamCipher};
    let mut cipher =
        Aes256Ctr::new_from_slices(ek, iv).map_err(|e| PasetoError::Crypto(e.to_string()))?;
    cipher.apply_keystream(buf);
    Ok(())
}

fn new_hmac(key: &[u8]) -> Result<HmacSha384> {
    HmacSha384::new_from_slice(key).map_err(|e| PasetoError::Crypto(e.to_string()))
}

fn random_nonce() -> [u8; NONCE_LEN] {
    use rand::RngCore;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
