//! JWT signing and verification engine
//!
//! Compact JWS serialization (RFC 7515) with JSON claim sets (RFC 7519).
//! The algorithm is pinned at engine construction; the `alg` header of an
//! incoming token is only ever compared against that pin, never dispatched
//! on, which closes the classic algorithm-confusion downgrade.

use thiserror::Error;

mod algorithm;
mod engine;
mod keys;
mod sign;

pub use algorithm::Algorithm;
pub use engine::{decode, Claims, Header, JwtEngine};
pub use keys::{SigningKey, VerifyKey};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("token algorithm mismatch: expected {expected}, got {got}")]
    AlgorithmMismatch { expected: String, got: String },

    #[error("token expired")]
    Expired,

    #[error("token missing required exp claim")]
    MissingExpiration,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("token revoked")]
    Revoked,

    #[error("token not whitelisted")]
    NotWhitelisted,

    #[error("revocation backend error: {0}")]
    Revocation(#[from] revocation_list::RevocationError),

    #[error("invalid JWT configuration: {0}")]
    Configuration(String),

    #[error("claims serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cryptographic failure: {0}")]
    Crypto(String),
}

pub type Result<T> = std::result::Result<T, JwtError>;
