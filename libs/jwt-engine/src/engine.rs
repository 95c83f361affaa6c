//! Encode, decode and verify JWTs

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use revocation_list::{ListKind, RevocationList};
use token_codec::{b64url_decode, b64url_encode};

use crate::{sign, Algorithm, JwtError, Result, SigningKey, VerifyKey};

/// JSON claim set
pub type Claims = serde_json::Map<String, Value>;

/// Protected header of a compact token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Immutable signing/verification configuration
///
/// The algorithm and keys are fixed at construction. `verify` only ever
/// checks tokens against this configuration; the token's own header cannot
/// select a different primitive.
pub struct JwtEngine {
    alg: Algorithm,
    signing: Option<SigningKey>,
    verifying: Option<VerifyKey>,
    ttl: Option<Duration>,
    exp_required: bool,
}

impl JwtEngine {
    /// Build an engine from explicit key material
    ///
    /// When only a signing key is supplied the matching verification key is
    /// derived from it. Key/algorithm mismatches fail here, not at call time.
    pub fn new(
        alg: Algorithm,
        signing: Option<SigningKey>,
        verifying: Option<VerifyKey>,
    ) -> Result<Self> {
        if signing.is_none() && verifying.is_none() {
            return Err(JwtError::Configuration(
                "at least one of signing or verification key is required".into(),
            ));
        }
        if let Some(key) = &signing {
            if !key.compatible_with(alg) {
                return Err(JwtError::Configuration(format!(
                    "signing key is not usable with {alg}"
                )));
            }
        }
        if let Some(key) = &verifying {
            if !key.compatible_with(alg) {
                return Err(JwtError::Configuration(format!(
                    "verification key is not usable with {alg}"
                )));
            }
        }
        let verifying = verifying.or_else(|| signing.as_ref().map(SigningKey::verify_key));
        Ok(Self {
            alg,
            signing,
            verifying,
            ttl: None,
            exp_required: true,
        })
    }

    /// Shortcut for the symmetric algorithms
    pub fn hmac(alg: Algorithm, secret: &[u8]) -> Result<Self> {
        Self::new(alg, Some(SigningKey::hmac(secret.to_vec())), None)
    }

    /// Stamp `exp = iat + ttl` into tokens that do not carry their own
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Whether verification demands an `exp` claim (on by default)
    pub fn with_exp_required(mut self, required: bool) -> Self {
        self.exp_required = required;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.alg
    }

    /// Sign a claim set into compact form
    ///
    /// `iat` is stamped, and `exp` is derived from the engine TTL, unless the
    /// caller already supplied them.
    pub fn encode(&self, payload: &Claims) -> Result<String> {
        let signing = self.signing.as_ref().ok_or_else(|| {
            JwtError::Configuration("engine has no signing key, verification only".into())
        })?;

        let mut claims = payload.clone();
        let now = Utc::now().timestamp();
        claims.entry("iat".to_string()).or_insert(json!(now));
        if let Some(ttl) = self.ttl {
            claims
                .entry("exp".to_string())
                .or_insert(json!(now + ttl.as_secs() as i64));
        }

        let header = Header {
            alg: self.alg.as_str().to_string(),
            typ: Some("JWT".to_string()),
        };
        let signing_input = format!(
            "{}.{}",
            b64url_encode(&serde_json::to_vec(&header)?),
            b64url_encode(&serde_json::to_vec(&claims)?),
        );
        let signature = sign::sign(self.alg, signing, signing_input.as_bytes())?;

        debug!(alg = %self.alg, "token signed");
        Ok(format!("{signing_input}.{}", b64url_encode(&signature)))
    }

    /// Verify a compact token and return its claims
    ///
    /// Checks, in order: shape, pinned algorithm, signature over the exact
    /// received bytes, `nbf`, `exp` (when `check_exp`), then the optional
    /// revocation list.
    pub fn verify(
        &self,
        token: &str,
        check_exp: bool,
        revocation: Option<&RevocationList>,
    ) -> Result<Claims> {
        let verifying = self.verifying.as_ref().ok_or_else(|| {
            JwtError::Configuration("engine has no verification key".into())
        })?;

        let (header_b64, payload_b64, signature_b64) = split_compact(token)?;

        let header: Header = serde_json::from_slice(&decode_segment(header_b64)?)
            .map_err(|_| JwtError::Malformed("header is not valid JSON".into()))?;
        if header.alg != self.alg.as_str() {
            warn!(expected = %self.alg, got = %header.alg, "token algorithm mismatch");
            return Err(JwtError::AlgorithmMismatch {
                expected: self.alg.as_str().to_string(),
                got: header.alg,
            });
        }

        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
        let signature = decode_segment(signature_b64)?;
        if let Err(e) = sign::verify(self.alg, verifying, signing_input.as_bytes(), &signature) {
            warn!(alg = %self.alg, "token signature rejected");
            return Err(e);
        }

        let claims: Claims = serde_json::from_slice(&decode_segment(payload_b64)?)
            .map_err(|_| JwtError::Malformed("payload is not a JSON object".into()))?;

        let now = Utc::now().timestamp();
        if let Some(nbf) = numeric_claim(&claims, "nbf") {
            if nbf > now {
                return Err(JwtError::NotYetValid);
            }
        }
        if check_exp {
            match numeric_claim(&claims, "exp") {
                Some(exp) if exp <= now => return Err(JwtError::Expired),
                Some(_) => {}
                None if self.exp_required => return Err(JwtError::MissingExpiration),
                None => {}
            }
        }

        if let Some(list) = revocation {
            if !list.check(token)? {
                warn!(kind = ?list.kind(), "token rejected by revocation list");
                return Err(match list.kind() {
                    ListKind::Black => JwtError::Revoked,
                    ListKind::White => JwtError::NotWhitelisted,
                });
            }
        }

        debug!(alg = %self.alg, "token verified");
        Ok(claims)
    }
}

/// Parse a token without any verification, for inspection only
pub fn decode(token: &str) -> Result<(Header, Claims)> {
    let (header_b64, payload_b64, _) = split_compact(token)?;
    let header: Header = serde_json::from_slice(&decode_segment(header_b64)?)
        .map_err(|_| JwtError::Malformed("header is not valid JSON".into()))?;
    let claims: Claims = serde_json::from_slice(&decode_segment(payload_b64)?)
        .map_err(|_| JwtError::Malformed("payload is not a JSON object".into()))?;
    Ok((header, claims))
}

fn split_compact(token: &str) -> Result<(&str, &str, &str)> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() && !s.is_empty() => {
            Ok((h, p, s))
        }
        _ => Err(JwtError::Malformed(
            "expected three dot-separated segments".into(),
        )),
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>> {
    b64url_decode(segment).map_err(|_| JwtError::Malformed("invalid base64url segment".into()))
}

fn numeric_claim(claims: &Claims, name: &str) -> Option<i64> {
    claims
        .get(name)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
}
