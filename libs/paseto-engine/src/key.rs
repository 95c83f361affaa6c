//! Key material for the PASETO engine
//!
//! One variant per supported (version, purpose, side) triple. Constructors
//! validate size and format, so an engine holding a key can never apply it
//! to the wrong construction.

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::{PasetoError, Purpose, Result, Version};

pub enum PasetoKey {
    V1Local([u8; 32]),
    V1PublicSigner(RsaPrivateKey),
    V1PublicVerifier(RsaPublicKey),
    V2Local([u8; 32]),
    V2PublicSigner(ed25519_dalek::SigningKey),
    V2PublicVerifier(ed25519_dalek::VerifyingKey),
    V3Local([u8; 32]),
    V3PublicSigner(p384::ecdsa::SigningKey),
    V3PublicVerifier(p384::ecdsa::VerifyingKey),
    V4Local([u8; 32]),
    V4PublicSigner(ed25519_dalek::SigningKey),
    V4PublicVerifier(ed25519_dalek::VerifyingKey),
}

impl PasetoKey {
    pub fn v1_local(bytes: &[u8]) -> Result<Self> {
        Ok(PasetoKey::V1Local(shared_key(bytes)?))
    }

    pub fn v2_local(bytes: &[u8]) -> Result<Self> {
        Ok(PasetoKey::V2Local(shared_key(bytes)?))
    }

    pub fn v3_local(bytes: &[u8]) -> Result<Self> {
        Ok(PasetoKey::V3Local(shared_key(bytes)?))
    }

    pub fn v4_local(bytes: &[u8]) -> Result<Self> {
        Ok(PasetoKey::V4Local(shared_key(bytes)?))
    }

    pub fn v1_public_signer_pem(pem: &str) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| PasetoError::Configuration(format!("invalid RSA private key: {e}")))?;
        Ok(PasetoKey::V1PublicSigner(key))
    }

    pub fn v1_public_verifier_pem(pem: &str) -> Result<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| PasetoError::Configuration(format!("invalid RSA public key: {e}")))?;
        Ok(PasetoKey::V1PublicVerifier(key))
    }

    /// Ed25519 signing key from its 32-byte seed
    pub fn v2_public_signer(seed: &[u8]) -> Result<Self> {
        Ok(PasetoKey::V2PublicSigner(ed25519_signer(seed)?))
    }

    pub fn v2_public_verifier(bytes: &[u8]) -> Result<Self> {
        Ok(PasetoKey::V2PublicVerifier(ed25519_verifier(bytes)?))
    }

    pub fn v3_public_signer_pem(pem: &str) -> Result<Self> {
        let secret = p384::SecretKey::from_pkcs8_pem(pem)
            .or_else(|_| p384::SecretKey::from_sec1_pem(pem))
            .map_err(|e| PasetoError::Configuration(format!("invalid P-384 private key: {e}")))?;
        Ok(PasetoKey::V3PublicSigner(secret.into()))
    }

    /// P-384 signing key from its raw 48-byte scalar
    pub fn v3_public_signer(bytes: &[u8]) -> Result<Self> {
        let key = p384::ecdsa::SigningKey::from_slice(bytes)
            .map_err(|e| PasetoError::Configuration(format!("invalid P-384 private key: {e}")))?;
        Ok(PasetoKey::V3PublicSigner(key))
    }

    pub fn v3_public_verifier_pem(pem: &str) -> Result<Self> {
        let key = p384::ecdsa::VerifyingKey::from_public_key_pem(pem)
            .map_err(|e| PasetoError::Configuration(format!("invalid P-384 public key: {e}")))?;
        Ok(PasetoKey::V3PublicVerifier(key))
    }

    /// P-384 verifying key from an SEC1 point, compressed or uncompressed
    pub fn v3_public_verifier_sec1(bytes: &[u8]) -> Result<Self> {
        let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PasetoError::Configuration(format!("invalid P-384 public key: {e}")))?;
        Ok(PasetoKey::V3PublicVerifier(key))
    }

    /// Ed25519 signing key from its 32-byte seed
    pub fn v4_public_signer(seed: &[u8]) -> Result<Self> {
        Ok(PasetoKey::V4PublicSigner(ed25519_signer(seed)?))
    }

    pub fn v4_public_verifier(bytes: &[u8]) -> Result<Self> {
        Ok(PasetoKey::V4PublicVerifier(ed25519_verifier(bytes)?))
    }

    pub fn version(&self) -> Version {
        match self {
            PasetoKey::V1Local(_) | PasetoKey::V1PublicSigner(_) | PasetoKey::V1PublicVerifier(_) => {
                Version::V1
            }
            PasetoKey::V2Local(_) | PasetoKey::V2PublicSigner(_) | PasetoKey::V2PublicVerifier(_) => {
                Version::V2
            }
            PasetoKey::V3Local(_) | PasetoKey::V3PublicSigner(_) | PasetoKey::V3PublicVerifier(_) => {
                Version::V3
            }
            PasetoKey::V4Local(_) | PasetoKey::V4PublicSigner(_) | PasetoKey::V4PublicVerifier(_) => {
                Version::V4
            }
        }
    }

    pub fn purpose(&self) -> Purpose {
        match self {
            PasetoKey::V1Local(_)
            | PasetoKey::V2Local(_)
            | PasetoKey::V3Local(_)
            | PasetoKey::V4Local(_) => Purpose::Local,
            _ => Purpose::Public,
        }
    }

    /// Wire header carried by tokens under this key, e.g. `v3.local.`
    pub(crate) fn header(&self) -> String {
        format!("{}.{}.", self.version().as_str(), self.purpose().as_str())
    }
}

fn shared_key(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|_| {
        PasetoError::Configuration(format!(
            "shared key must be exactly 32 bytes, got {}",
            bytes.len()
        ))
    })
}

fn ed25519_signer(seed: &[u8]) -> Result<ed25519_dalek::SigningKey> {
    let seed: &[u8; 32] = seed.try_into().map_err(|_| {
        PasetoError::Configuration(format!(
            "Ed25519 seed must be exactly 32 bytes, got {}",
            seed.len()
        ))
    })?;
    Ok(ed25519_dalek::SigningKey::from_bytes(seed))
}

fn ed25519_verifier(bytes: &[u8]) -> Result<ed25519_dalek::VerifyingKey> {
    let bytes: &[u8; 32] = bytes.try_into().map_err(|_| {
        PasetoError::Configuration(format!(
            "Ed25519 public key must be exactly 32 bytes, got {}",
            bytes.len()
        ))
    })?;
    ed25519_dalek::VerifyingKey::from_bytes(bytes)
        .map_err(|e| PasetoError::Configuration(format!("invalid Ed25519 public key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_key_size_enforced() {
        assert!(PasetoKey::v2_local(&[0u8; 32]).is_ok());
        assert!(PasetoKey::v2_local(&[0u8; 31]).is_err());
        assert!(PasetoKey::v4_local(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_headers() {
        let key = PasetoKey::v4_local(&[0u8; 32]).unwrap();
        assert_eq!(key.header(), "v4.local.");
        assert_eq!(key.version(), Version::V4);
        assert_eq!(key.purpose(), Purpose::Local);

        let signer = PasetoKey::v2_public_signer(&[7u8; 32]).unwrap();
        assert_eq!(signer.header(), "v2.public.");
        assert_eq!(signer.purpose(), Purpose::Public);
    }

    #[test]
    fn test_ed25519_seed_size_enforced() {
        assert!(PasetoKey::v4_public_signer(&[0u8; 16]).is_err());
        assert!(PasetoKey::v4_public_signer(&[0u8; 32]).is_ok());
    }
}
