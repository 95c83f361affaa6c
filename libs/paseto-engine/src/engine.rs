//! Assemble, parse and validate PASETO tokens

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};

use token_codec::{b64url_decode, b64url_encode, ct_eq};

use crate::{v1, v2, v3, v4, PasetoError, PasetoKey, Result};

/// JSON claim set
pub type Claims = serde_json::Map<String, Value>;

/// Token footer, authenticated but never encrypted
#[derive(Debug, Clone, PartialEq)]
pub enum Footer {
    Text(String),
    Json(Claims),
}

impl Footer {
    /// JSON footer carrying only a key identifier
    pub fn key_id(kid: &str) -> Self {
        let mut map = Claims::new();
        map.insert("kid".to_string(), json!(kid));
        Footer::Json(map)
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Footer::Text(text) => Ok(text.clone().into_bytes()),
            Footer::Json(map) => Ok(serde_json::to_vec(map)?),
        }
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if let Ok(map) = serde_json::from_slice::<Claims>(bytes) {
            return Ok(Footer::Json(map));
        }
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|_| PasetoError::Malformed("footer is neither JSON nor UTF-8".into()))?;
        Ok(Footer::Text(text))
    }
}

/// Immutable token configuration around a single key
///
/// The key decides version and purpose once, at construction. `decode` only
/// ever accepts tokens whose header matches that key; nothing in the token
/// can select a different primitive.
pub struct PasetoEngine {
    key: PasetoKey,
    ttl: Option<Duration>,
}

impl PasetoEngine {
    pub fn new(key: PasetoKey) -> Self {
        Self { key, ttl: None }
    }

    /// Stamp `exp = iat + ttl` into tokens that do not carry their own
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn key(&self) -> &PasetoKey {
        &self.key
    }

    /// Seal or sign a claim set into token form
    ///
    /// `iat` is stamped, and `exp` is derived from the engine TTL, unless the
    /// caller already supplied them. Timestamps are RFC 3339 strings.
    pub fn encode(&self, payload: &Claims, footer: Option<&Footer>) -> Result<String> {
        let mut claims = payload.clone();
        let now = Utc::now();
        claims
            .entry("iat".to_string())
            .or_insert(json!(rfc3339(now)));
        if let Some(ttl) = self.ttl {
            let exp = now + chrono::Duration::seconds(ttl.as_secs() as i64);
            claims
                .entry("exp".to_string())
                .or_insert(json!(rfc3339(exp)));
        }

        let message = serde_json::to_vec(&claims)?;
        let footer_bytes = match footer {
            Some(f) => f.to_bytes()?,
            None => Vec::new(),
        };

        let raw = match &self.key {
            PasetoKey::V1Local(k) => v1::local_seal(k, &message, &footer_bytes, None)?,
            PasetoKey::V2Local(k) => v2::local_seal(k, &message, &footer_bytes, None)?,
            PasetoKey::V3Local(k) => v3::local_seal(k, &message, &footer_bytes, None)?,
            PasetoKey::V4Local(k) => v4::local_seal(k, &message, &footer_bytes, None)?,
            PasetoKey::V1PublicSigner(k) => v1::public_sign(k, &message, &footer_bytes)?,
            PasetoKey::V2PublicSigner(k) => v2::public_sign(k, &message, &footer_bytes)?,
            PasetoKey::V3PublicSigner(k) => v3::public_sign(k, &message, &footer_bytes)?,
            PasetoKey::V4PublicSigner(k) => v4::public_sign(k, &message, &footer_bytes)?,
            PasetoKey::V1PublicVerifier(_)
            | PasetoKey::V2PublicVerifier(_)
            | PasetoKey::V3PublicVerifier(_)
            | PasetoKey::V4PublicVerifier(_) => {
                return Err(PasetoError::Configuration(
                    "verification key cannot issue tokens".into(),
                ));
            }
        };

        let mut token = self.key.header();
        token.push_str(&b64url_encode(&raw));
        if !footer_bytes.is_empty() {
            token.push('.');
            token.push_str(&b64url_encode(&footer_bytes));
        }
        debug!(header = %self.key.header(), "issued token");
        Ok(token)
    }

    /// Open or verify a token and return its claims and footer
    ///
    /// When `expected_footer` is given the token's raw footer bytes must
    /// match it exactly. `check_exp` controls whether an `exp` claim is
    /// enforced; `nbf` is enforced whenever present.
    pub fn decode(
        &self,
        token: &str,
        expected_footer: Option<&Footer>,
        check_exp: bool,
    ) -> Result<(Claims, Option<Footer>)> {
        let (payload_b64, footer_b64) = self.split(token)?;

        let payload = b64url_decode(payload_b64)
            .map_err(|e| PasetoError::Malformed(format!("payload encoding: {e}")))?;
        let footer_bytes = match footer_b64 {
            Some(f) => b64url_decode(f)
                .map_err(|e| PasetoError::Malformed(format!("footer encoding: {e}")))?,
            None => Vec::new(),
        };

        if let Some(expected) = expected_footer {
            let expected_bytes = expected.to_bytes()?;
            if !ct_eq(&expected_bytes, &footer_bytes) {
                warn!(header = %self.key.header(), "footer mismatch");
                return Err(PasetoError::FooterMismatch);
            }
        }

        let message = match &self.key {
            PasetoKey::V1Local(k) => v1::local_open(k, &payload, &footer_bytes)?,
            PasetoKey::V2Local(k) => v2::local_open(k, &payload, &footer_bytes)?,
            PasetoKey::V3Local(k) => v3::local_open(k, &payload, &footer_bytes)?,
            PasetoKey::V4Local(k) => v4::local_open(k, &payload, &footer_bytes)?,
            PasetoKey::V1PublicSigner(k) => {
                v1::public_verify(&k.to_public_key(), &payload, &footer_bytes)?
            }
            PasetoKey::V1PublicVerifier(k) => v1::public_verify(k, &payload, &footer_bytes)?,
            PasetoKey::V2PublicSigner(k) => {
                v2::public_verify(&k.verifying_key(), &payload, &footer_bytes)?
            }
            PasetoKey::V2PublicVerifier(k) => v2::public_verify(k, &payload, &footer_bytes)?,
            PasetoKey::V3PublicSigner(k) => {
                v3::public_verify(k.verifying_key(), &payload, &footer_bytes)?
            }
            PasetoKey::V3PublicVerifier(k) => v3::public_verify(k, &payload, &footer_bytes)?,
            PasetoKey::V4PublicSigner(k) => {
                v4::public_verify(&k.verifying_key(), &payload, &footer_bytes)?
            }
            PasetoKey::V4PublicVerifier(k) => v4::public_verify(k, &payload, &footer_bytes)?,
        };

        let claims: Claims = serde_json::from_slice(&message)?;

        let now = Utc::now();
        if let Some(nbf) = time_claim(&claims, "nbf")? {
            if nbf > now {
                return Err(PasetoError::NotYetValid);
            }
        }
        if check_exp {
            if let Some(exp) = time_claim(&claims, "exp")? {
                if exp <= now {
                    return Err(PasetoError::Expired);
                }
            }
        }

        let footer = if footer_bytes.is_empty() {
            None
        } else {
            Some(Footer::from_bytes(&footer_bytes)?)
        };
        Ok((claims, footer))
    }

    /// Split a token into payload and optional footer segments, enforcing
    /// that its `vN.purpose.` header matches this engine's key
    fn split<'a>(&self, token: &'a str) -> Result<(&'a str, Option<&'a str>)> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() < 3 || parts.len() > 4 {
            return Err(PasetoError::Malformed(format!(
                "expected 3 or 4 token segments, got {}",
                parts.len()
            )));
        }
        let got = format!("{}.{}.", parts[0], parts[1]);
        let expected = self.key.header();
        if got != expected {
            warn!(%expected, %got, "header mismatch");
            return Err(PasetoError::HeaderMismatch { expected, got });
        }
        if parts[2].is_empty() {
            return Err(PasetoError::Malformed("empty payload segment".into()));
        }
        Ok((parts[2], parts.get(3).copied()))
    }
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 time claim if present
fn time_claim(claims: &Claims, name: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = claims.get(name) else {
        return Ok(None);
    };
    let text = value
        .as_str()
        .ok_or_else(|| PasetoError::Malformed(format!("`{name}` claim is not a string")))?;
    let parsed = DateTime::parse_from_rfc3339(text)
        .map_err(|e| PasetoError::Malformed(format!("`{name}` claim: {e}")))?;
    Ok(Some(parsed.with_timezone(&Utc)))
}
