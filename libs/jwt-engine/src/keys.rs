//! Key material for the JWT engine
//!
//! Keys are parsed and validated once at construction. PEM input accepts
//! both PKCS#8 and the older type-specific encodings (PKCS#1 for RSA,
//! SEC1 for EC).

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::{Algorithm, JwtError, Result};

/// Private side of a signing configuration
pub enum SigningKey {
    Hmac(Vec<u8>),
    Rsa(RsaPrivateKey),
    Es256(p256::ecdsa::SigningKey),
    Es384(p384::ecdsa::SigningKey),
}

impl SigningKey {
    pub fn hmac(secret: impl Into<Vec<u8>>) -> Self {
        SigningKey::Hmac(secret.into())
    }

    pub fn rsa_pem(pem: &str) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| JwtError::Configuration(format!("invalid RSA private key: {e}")))?;
        Ok(SigningKey::Rsa(key))
    }

    pub fn p256_pem(pem: &str) -> Result<Self> {
        let secret = p256::SecretKey::from_pkcs8_pem(pem)
            .or_else(|_| p256::SecretKey::from_sec1_pem(pem))
            .map_err(|e| JwtError::Configuration(format!("invalid P-256 private key: {e}")))?;
        Ok(SigningKey::Es256(secret.into()))
    }

    pub fn p384_pem(pem: &str) -> Result<Self> {
        let secret = p384::SecretKey::from_pkcs8_pem(pem)
            .or_else(|_| p384::SecretKey::from_sec1_pem(pem))
            .map_err(|e| JwtError::Configuration(format!("invalid P-384 private key: {e}")))?;
        Ok(SigningKey::Es384(secret.into()))
    }

    /// Derive the matching verification key
    pub fn verify_key(&self) -> VerifyKey {
        match self {
            SigningKey::Hmac(secret) => VerifyKey::Hmac(secret.clone()),
            SigningKey::Rsa(key) => VerifyKey::Rsa(key.to_public_key()),
            SigningKey::Es256(key) => VerifyKey::Es256(p256::ecdsa::VerifyingKey::from(key)),
            SigningKey::Es384(key) => VerifyKey::Es384(p384::ecdsa::VerifyingKey::from(key)),
        }
    }

    pub(crate) fn compatible_with(&self, alg: Algorithm) -> bool {
        use Algorithm::*;
        matches!(
            (alg, self),
            (HS256 | HS384 | HS512, SigningKey::Hmac(_))
                | (RS256 | RS384 | RS512 | PS256 | PS384 | PS512, SigningKey::Rsa(_))
                | (ES256, SigningKey::Es256(_))
                | (ES384, SigningKey::Es384(_))
        )
    }
}

/// Public side of a signing configuration
pub enum VerifyKey {
    Hmac(Vec<u8>),
    Rsa(RsaPublicKey),
    Es256(p256::ecdsa::VerifyingKey),
    Es384(p384::ecdsa::VerifyingKey),
}

impl VerifyKey {
    pub fn hmac(secret: impl Into<Vec<u8>>) -> Self {
        VerifyKey::Hmac(secret.into())
    }

    pub fn rsa_pem(pem: &str) -> Result<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| JwtError::Configuration(format!("invalid RSA public key: {e}")))?;
        Ok(VerifyKey::Rsa(key))
    }

    pub fn p256_pem(pem: &str) -> Result<Self> {
        let key = p256::ecdsa::VerifyingKey::from_public_key_pem(pem)
            .map_err(|e| JwtError::Configuration(format!("invalid P-256 public key: {e}")))?;
        Ok(VerifyKey::Es256(key))
    }

    pub fn p384_pem(pem: &str) -> Result<Self> {
        let key = p384::ecdsa::VerifyingKey::from_public_key_pem(pem)
            .map_err(|e| JwtError::Configuration(format!("invalid P-384 public key: {e}")))?;
        Ok(VerifyKey::Es384(key))
    }

    pub(crate) fn compatible_with(&self, alg: Algorithm) -> bool {
        use Algorithm::*;
        matches!(
            (alg, self),
            (HS256 | HS384 | HS512, VerifyKey::Hmac(_))
                | (RS256 | RS384 | RS512 | PS256 | PS384 | PS512, VerifyKey::Rsa(_))
                | (ES256, VerifyKey::Es256(_))
                | (ES384, VerifyKey::Es384(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePrivateKey;

    #[test]
    fn test_hmac_keys_are_symmetric() {
        let signing = SigningKey::hmac(b"shared-secret".to_vec());
        match signing.verify_key() {
            VerifyKey::Hmac(secret) => assert_eq!(secret, b"shared-secret"),
            _ => panic!("expected HMAC verify key"),
        }
    }

    #[test]
    fn test_p256_pem_round_trip() {
        let secret = p256::SecretKey::random(&mut rand::thread_rng());
        let pem = secret.to_pkcs8_pem(Default::default()).unwrap();

        let signing = SigningKey::p256_pem(&pem).unwrap();
        assert!(signing.compatible_with(Algorithm::ES256));
        assert!(!signing.compatible_with(Algorithm::ES384));
    }

    #[test]
    fn test_garbage_pem_rejected() {
        assert!(SigningKey::rsa_pem("not a pem").is_err());
        assert!(SigningKey::p256_pem("not a pem").is_err());
        assert!(VerifyKey::p384_pem("not a pem").is_err());
    }

    #[test]
    fn test_compatibility_matrix() {
        let hmac = SigningKey::hmac(b"secret".to_vec());
        assert!(hmac.compatible_with(Algorithm::HS256));
        assert!(hmac.compatible_with(Algorithm::HS512));
        assert!(!hmac.compatible_with(Algorithm::RS256));
        assert!(!hmac.compatible_with(Algorithm::ES256));
    }
}
