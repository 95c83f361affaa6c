//! Signature primitives behind the engine
//!
//! One arm per algorithm, mirroring the closed [`Algorithm`] set. HMAC tags
//! are compared in constant time; ECDSA signatures travel as fixed-width
//! `r || s` (64 bytes for P-256, 96 for P-384), never DER.

use hmac::{Hmac, Mac};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use rsa::{pkcs1v15, pss};
use sha2::{Sha256, Sha384, Sha512};

use crate::{Algorithm, JwtError, Result, SigningKey, VerifyKey};
use token_codec::ct_eq;

pub(crate) fn sign(alg: Algorithm, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>> {
    match (alg, key) {
        (Algorithm::HS256, SigningKey::Hmac(secret)) => hmac_tag::<Sha256>(secret, data),
        (Algorithm::HS384, SigningKey::Hmac(secret)) => hmac_tag::<Sha384>(secret, data),
        (Algorithm::HS512, SigningKey::Hmac(secret)) => hmac_tag::<Sha512>(secret, data),

        (Algorithm::RS256, SigningKey::Rsa(key)) => {
            let sk = pkcs1v15::SigningKey::<Sha256>::new(key.clone());
            Ok(try_sign(&sk, data)?)
        }
        (Algorithm::RS384, SigningKey::Rsa(key)) => {
            let sk = pkcs1v15::SigningKey::<Sha384>::new(key.clone());
            Ok(try_sign(&sk, data)?)
        }
        (Algorithm::RS512, SigningKey::Rsa(key)) => {
            let sk = pkcs1v15::SigningKey::<Sha512>::new(key.clone());
            Ok(try_sign(&sk, data)?)
        }

        (Algorithm::PS256, SigningKey::Rsa(key)) => {
            let sk = pss::BlindedSigningKey::<Sha256>::new(key.clone());
            Ok(try_sign_with_rng(&sk, data)?)
        }
        (Algorithm::PS384, SigningKey::Rsa(key)) => {
            let sk = pss::BlindedSigningKey::<Sha384>::new(key.clone());
            Ok(try_sign_with_rng(&sk, data)?)
        }
        (Algorithm::PS512, SigningKey::Rsa(key)) => {
            let sk = pss::BlindedSigningKey::<Sha512>::new(key.clone());
            Ok(try_sign_with_rng(&sk, data)?)
        }

        (Algorithm::ES256, SigningKey::Es256(sk)) => {
            let sig: p256::ecdsa::Signature = sk
                .try_sign(data)
                .map_err(|e| JwtError::Crypto(e.to_string()))?;
            Ok(sig.to_vec())
        }
        (Algorithm::ES384, SigningKey::Es384(sk)) => {
            let sig: p384::ecdsa::Signature = sk
                .try_sign(data)
                .map_err(|e| JwtError::Crypto(e.to_string()))?;
            Ok(sig.to_vec())
        }

        _ => Err(JwtError::Configuration(
            "signing key does not match configured algorithm".into(),
        )),
    }
}

pub(crate) fn verify(alg: Algorithm, key: &VerifyKey, data: &[u8], sig: &[u8]) -> Result<()> {
    match (alg, key) {
        (Algorithm::HS256, VerifyKey::Hmac(secret)) => hmac_check::<Sha256>(secret, data, sig),
        (Algorithm::HS384, VerifyKey::Hmac(secret)) => hmac_check::<Sha384>(secret, data, sig),
        (Algorithm::HS512, VerifyKey::Hmac(secret)) => hmac_check::<Sha512>(secret, data, sig),

        (Algorithm::RS256, VerifyKey::Rsa(key)) => {
            let vk = pkcs1v15::VerifyingKey::<Sha256>::new(key.clone());
            let sig = pkcs1v15::Signature::try_from(sig).map_err(|_| JwtError::SignatureInvalid)?;
            vk.verify(data, &sig).map_err(|_| JwtError::SignatureInvalid)
        }
        (Algorithm::RS384, VerifyKey::Rsa(key)) => {
            let vk = pkcs1v15::VerifyingKey::<Sha384>::new(key.clone());
            let sig = pkcs1v15::Signature::try_from(sig).map_err(|_| JwtError::SignatureInvalid)?;
            vk.verify(data, &sig).map_err(|_| JwtError::SignatureInvalid)
        }
        (Algorithm::RS512, VerifyKey::Rsa(key)) => {
            let vk = pkcs1v15::VerifyingKey::<Sha512>::new(key.clone());
            let sig = pkcs1v15::Signature::try_from(sig).map_err(|_| JwtError::SignatureInvalid)?;
            vk.verify(data, &sig).map_err(|_| JwtError::SignatureInvalid)
        }

        (Algorithm::PS256, VerifyKey::Rsa(key)) => {
            let vk = pss::VerifyingKey::<Sha256>::new(key.clone());
            let sig = pss::Signature::try_from(sig).map_err(|_| JwtError::SignatureInvalid)?;
            vk.verify(data, &sig).map_err(|_| JwtError::SignatureInvalid)
        }
        (Algorithm::PS384, VerifyKey::Rsa(key)) => {
            let vk = pss::VerifyingKey::<Sha384>::new(key.clone());
            let sig = pss::Signature::try_from(sig).map_err(|_| JwtError::SignatureInvalid)?;
            vk.verify(data, &sig).map_err(|_| JwtError::SignatureInvalid)
        }
        (Algorithm::PS512, VerifyKey::Rsa(key)) => {
            let vk = pss::VerifyingKey::<Sha512>::new(key.clone());
            let sig = pss::Signature::try_from(sig).map_err(|_| JwtError::SignatureInvalid)?;
            vk.verify(data, &sig).map_err(|_| JwtError::SignatureInvalid)
        }

        (Algorithm::ES256, VerifyKey::Es256(vk)) => {
            let sig = p256::ecdsa::Signature::from_slice(sig)
                .map_err(|_| JwtError::SignatureInvalid)?;
            vk.verify(data, &sig).map_err(|_| JwtError::SignatureInvalid)
        }
        (Algorithm::ES384, VerifyKey::Es384(vk)) => {
            let sig = p384::ecdsa::Signature::from_slice(sig)
                .map_err(|_| JwtError::SignatureInvalid)?;
            vk.verify(data, &sig).map_err(|_| JwtError::SignatureInvalid)
        }

        _ => Err(JwtError::Configuration(
            "verification key does not match configured algorithm".into(),
        )),
    }
}

fn try_sign<S, Sig>(signer: &S, data: &[u8]) -> Result<Vec<u8>>
where
    S: Signer<Sig>,
    Sig: SignatureEncoding,
{
    let sig = signer
        .try_sign(data)
        .map_err(|e| JwtError::Crypto(e.to_string()))?;
    Ok(sig.to_vec())
}

fn try_sign_with_rng<S, Sig>(signer: &S, data: &[u8]) -> Result<Vec<u8>>
where
    S: RandomizedSigner<Sig>,
    Sig: SignatureEncoding,
{
    let sig = signer
        .try_sign_with_rng(&mut rand::thread_rng(), data)
        .map_err(|e| JwtError::Crypto(e.to_string()))?;
    Ok(sig.to_vec())
}

fn hmac_tag<D>(secret: &[u8], data: &[u8]) -> Result<Vec<u8>>
where
    Hmac<D>: Mac + hmac::digest::KeyInit,
    D: hmac::digest::core_api::CoreProxy,
    D::Core: hmac::digest::core_api::FixedOutputCore
        + hmac::digest::HashMarker
        + hmac::digest::core_api::BufferKindUser<BufferKind = hmac::digest::block_buffer::Eager>
        + Default
        + Clone,
    <D::Core as hmac::digest::core_api::BlockSizeUser>::BlockSize:
        hmac::digest::typenum::IsLess<hmac::digest::consts::U256>,
    hmac::digest::typenum::Le<
        <D::Core as hmac::digest::core_api::BlockSizeUser>::BlockSize,
        hmac::digest::consts::U256,
    >: hmac::digest::typenum::NonZero,
{
    let mut mac = <Hmac<D> as Mac>::new_from_slice(secret)
        .map_err(|e| JwtError::Configuration(format!("invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hmac_check<D>(secret: &[u8], data: &[u8], sig: &[u8]) -> Result<()>
where
    Hmac<D>: Mac + hmac::digest::KeyInit,
    D: hmac::digest::core_api::CoreProxy,
    D::Core: hmac::digest::core_api::FixedOutputCore
        + hmac::digest::HashMarker
        + hmac::digest::core_api::BufferKindUser<BufferKind = hmac::digest::block_buffer::Eager>
        + Default
        + Clone,
    <D::Core as hmac::digest::core_api::BlockSizeUser>::BlockSize:
        hmac::digest::typenum::IsLess<hmac::digest::consts::U256>,
    hmac::digest::typenum::Le<
        <D::Core as hmac::digest::core_api::BlockSizeUser>::BlockSize,
        hmac::digest::consts::U256,
    >: hmac::digest::typenum::NonZero,
{
    let expected = hmac_tag::<D>(secret, data)?;
    if ct_eq(&expected, sig) {
        Ok(())
    } else {
        Err(JwtError::SignatureInvalid)
    }
}
