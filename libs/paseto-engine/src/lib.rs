//! PASETO token engine, versions 1 through 4
//!
//! Each protocol version fixes its primitives; there is no algorithm header
//! to negotiate. The key variant chosen at construction decides the version
//! and purpose, so mixing primitives across versions is impossible by
//! construction. Footers ride along as authenticated associated data.

use thiserror::Error;

mod engine;
mod key;
mod pae;
mod v1;
mod v2;
mod v3;
mod v4;

pub use engine::{Claims, Footer, PasetoEngine};
pub use key::PasetoKey;

#[derive(Debug, Error)]
pub enum PasetoError {
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Any MAC, AEAD or signature failure. Deliberately carries no detail.
    #[error("token integrity check failed")]
    Integrity,

    #[error("token header mismatch: key is {expected}, token is {got}")]
    HeaderMismatch { expected: String, got: String },

    #[error("token footer mismatch")]
    FooterMismatch,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid PASETO configuration: {0}")]
    Configuration(String),

    #[error("claims serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cryptographic failure: {0}")]
    Crypto(String),
}

pub type Result<T> = std::result::Result<T, PasetoError>;

/// Protocol version of a key or token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1,
    V2,
    V3,
    V4,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V1 => "v1",
            Version::V2 => "v2",
            Version::V3 => "v3",
            Version::V4 => "v4",
        }
    }
}

/// Shared-key encryption or public-key signing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Local,
    Public,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Local => "local",
            Purpose::Public => "public",
        }
    }
}
