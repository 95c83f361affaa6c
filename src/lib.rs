//! Keyforge: one façade over several token mechanisms
//!
//! An [`Auth`] instance is bound to exactly one authentication mode at
//! construction: JWT, PASETO, server-side sessions or one-time passwords.
//! Calling a method of a mode the instance is not bound to fails with
//! [`AuthError::Configuration`] instead of silently doing the wrong thing.
//! Suspension-mode callers use [`aio::Auth`] over async backends.

use thiserror::Error;

pub mod aio;

pub use jwt_engine::{
    decode as jwt_inspect, Algorithm, Claims, Header, JwtEngine, JwtError, SigningKey, VerifyKey,
};
pub use otp_engine::{generate_secret, Hotp, OtpDigest, OtpError, Totp};
pub use paseto_engine::{Footer, PasetoEngine, PasetoError, PasetoKey};
pub use revocation_list::{
    hash_token, JsonFileRevocations, ListKind, RedisRevocations, RevocationError, RevocationList,
};
pub use session_store::{
    JsonFileSessions, RedisSessions, SessionBackend, SessionCipher, SessionConfig, SessionData,
    SessionError,
};
pub use token_codec::CodecError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid auth configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Paseto(#[from] PasetoError),

    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Revocation(#[from] RevocationError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Counter-based or time-based one-time passwords
pub enum OtpFlavor {
    Hotp(Hotp),
    Totp(Totp),
}

/// The single mechanism an [`Auth`] instance is bound to
pub enum AuthMode {
    Jwt {
        engine: JwtEngine,
        revocation: Option<RevocationList>,
    },
    Paseto {
        engine: PasetoEngine,
    },
    Session {
        store: Box<dyn SessionBackend>,
    },
    Otp {
        otp: OtpFlavor,
    },
}

/// Blocking façade
pub struct Auth {
    mode: AuthMode,
}

impl Auth {
    pub fn new(mode: AuthMode) -> Self {
        Self { mode }
    }

    pub fn jwt_create(&self, claims: &Claims) -> Result<String> {
        match &self.mode {
            AuthMode::Jwt { engine, .. } => Ok(engine.encode(claims)?),
            _ => Err(wrong_mode("jwt_create", "JWT")),
        }
    }

    /// Verify a JWT; `check_list` additionally consults the configured
    /// revocation list and is an error when none is configured
    pub fn jwt_verify(&self, token: &str, check_exp: bool, check_list: bool) -> Result<Claims> {
        match &self.mode {
            AuthMode::Jwt { engine, revocation } => {
                let list = match (check_list, revocation) {
                    (true, Some(list)) => Some(list),
                    (true, None) => {
                        return Err(AuthError::Configuration(
                            "no revocation list configured".into(),
                        ))
                    }
                    (false, _) => None,
                };
                Ok(engine.verify(token, check_exp, list)?)
            }
            _ => Err(wrong_mode("jwt_verify", "JWT")),
        }
    }

    /// Parse a JWT without verifying it, for inspection only
    pub fn jwt_decode(&self, token: &str) -> Result<(Header, Claims)> {
        match &self.mode {
            AuthMode::Jwt { .. } => Ok(jwt_inspect(token)?),
            _ => Err(wrong_mode("jwt_decode", "JWT")),
        }
    }

    pub fn paseto_create(&self, payload: &Claims, footer: Option<&Footer>) -> Result<String> {
        match &self.mode {
            AuthMode::Paseto { engine } => Ok(engine.encode(payload, footer)?),
            _ => Err(wrong_mode("paseto_create", "PASETO")),
        }
    }

    pub fn paseto_decode(
        &self,
        token: &str,
        footer: Option<&Footer>,
    ) -> Result<(Claims, Option<Footer>)> {
        match &self.mode {
            AuthMode::Paseto { engine } => Ok(engine.decode(token, footer, true)?),
            _ => Err(wrong_mode("paseto_decode", "PASETO")),
        }
    }

    /// Code for `factor`: the counter for HOTP, a unix timestamp for TOTP.
    /// `secret` is Base32, as produced by [`generate_secret`].
    pub fn otp_code(&self, secret: &str, factor: u64) -> Result<String> {
        let secret = token_codec::base32_decode(secret)?;
        match &self.mode {
            AuthMode::Otp {
                otp: OtpFlavor::Hotp(hotp),
            } => Ok(hotp.code_at(&secret, factor)?),
            AuthMode::Otp {
                otp: OtpFlavor::Totp(totp),
            } => Ok(totp.at(&secret, factor)?),
            _ => Err(wrong_mode("otp_code", "OTP")),
        }
    }

    pub fn otp_verify(
        &self,
        secret: &str,
        code: &str,
        factor: u64,
        look_ahead: u64,
    ) -> Result<bool> {
        let secret = token_codec::base32_decode(secret)?;
        match &self.mode {
            AuthMode::Otp {
                otp: OtpFlavor::Hotp(hotp),
            } => Ok(hotp.verify(&secret, code, factor, look_ahead)?),
            AuthMode::Otp {
                otp: OtpFlavor::Totp(totp),
            } => Ok(totp.verify_at(&secret, code, factor, look_ahead)?),
            _ => Err(wrong_mode("otp_verify", "OTP")),
        }
    }

    /// Provisioning URI for enrolment; `counter` is ignored for TOTP
    pub fn otp_uri(
        &self,
        secret: &str,
        account: &str,
        issuer: &str,
        counter: u64,
    ) -> Result<String> {
        match &self.mode {
            AuthMode::Otp {
                otp: OtpFlavor::Hotp(hotp),
            } => Ok(hotp.provisioning_uri(secret, account, issuer, counter)),
            AuthMode::Otp {
                otp: OtpFlavor::Totp(totp),
            } => Ok(totp.provisioning_uri(secret, account, issuer)),
            _ => Err(wrong_mode("otp_uri", "OTP")),
        }
    }

    pub fn session_create(&self, session_key: &str, data: &SessionData) -> Result<String> {
        Ok(self.session_store("session_create")?.create(session_key, data)?)
    }

    pub fn session_get(&self, id: &str) -> Result<SessionData> {
        Ok(self.session_store("session_get")?.get(id)?)
    }

    pub fn session_update(&self, id: &str, data: &SessionData) -> Result<()> {
        Ok(self.session_store("session_update")?.update(id, data)?)
    }

    pub fn session_delete(&self, id: &str) -> Result<()> {
        Ok(self.session_store("session_delete")?.delete(id)?)
    }

    pub fn session_clear(&self, session_key: &str) -> Result<()> {
        Ok(self.session_store("session_clear")?.clear(session_key)?)
    }

    pub fn session_rotate(&self, id: &str) -> Result<String> {
        Ok(self.session_store("session_rotate")?.rotate(id)?)
    }

    fn session_store(&self, method: &str) -> Result<&dyn SessionBackend> {
        match &self.mode {
            AuthMode::Session { store } => Ok(store.as_ref()),
            _ => Err(wrong_mode(method, "session")),
        }
    }
}

pub(crate) fn wrong_mode(method: &str, needs: &str) -> AuthError {
    AuthError::Configuration(format!("{method} requires the {needs} mode"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn claims() -> Claims {
        let mut map = Claims::new();
        map.insert("sub".to_string(), json!("user-1"));
        map
    }

    #[test]
    fn test_jwt_mode_round_trip() {
        let engine = JwtEngine::hmac(Algorithm::HS256, b"0123456789abcdef0123456789abcdef")
            .unwrap()
            .with_exp_required(false);
        let auth = Auth::new(AuthMode::Jwt {
            engine,
            revocation: None,
        });

        let token = auth.jwt_create(&claims()).unwrap();
        let verified = auth.jwt_verify(&token, true, false).unwrap();
        assert_eq!(verified.get("sub"), Some(&json!("user-1")));

        let (header, decoded) = auth.jwt_decode(&token).unwrap();
        assert_eq!(header.alg, "HS256");
        assert_eq!(decoded.get("sub"), Some(&json!("user-1")));
    }

    #[test]
    fn test_check_list_without_list_is_configuration_error() {
        let engine = JwtEngine::hmac(Algorithm::HS256, b"0123456789abcdef0123456789abcdef")
            .unwrap()
            .with_exp_required(false);
        let auth = Auth::new(AuthMode::Jwt {
            engine,
            revocation: None,
        });
        let token = auth.jwt_create(&claims()).unwrap();
        assert!(matches!(
            auth.jwt_verify(&token, true, true),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_unbound_mode_is_rejected() {
        let auth = Auth::new(AuthMode::Otp {
            otp: OtpFlavor::Totp(Totp::standard()),
        });
        assert!(matches!(
            auth.jwt_create(&claims()),
            Err(AuthError::Configuration(_))
        ));
        assert!(matches!(
            auth.paseto_decode("v4.local.abc", None),
            Err(AuthError::Configuration(_))
        ));
        assert!(matches!(
            auth.session_get("id"),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_otp_mode_round_trip() {
        let auth = Auth::new(AuthMode::Otp {
            otp: OtpFlavor::Totp(Totp::standard()),
        });
        let secret = generate_secret();

        let code = auth.otp_code(&secret, 1_700_000_000).unwrap();
        assert!(auth.otp_verify(&secret, &code, 1_700_000_000, 1).unwrap());
        assert!(!auth.otp_verify(&secret, "000000", 1_700_000_000, 1).unwrap()
            || code == "000000");

        let uri = auth.otp_uri(&secret, "alice", "Keyforge", 0).unwrap();
        assert!(uri.starts_with("otpauth://totp/"));
    }

    #[test]
    fn test_paseto_mode_round_trip() {
        let engine = PasetoEngine::new(PasetoKey::v4_local(&[9u8; 32]).unwrap());
        let auth = Auth::new(AuthMode::Paseto { engine });

        let token = auth.paseto_create(&claims(), None).unwrap();
        let (decoded, footer) = auth.paseto_decode(&token, None).unwrap();
        assert_eq!(decoded.get("sub"), Some(&json!("user-1")));
        assert!(footer.is_none());
    }

    #[test]
    fn test_session_mode_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessions::new(dir.path().join("sessions.json"), SessionConfig::default());
        let auth = Auth::new(AuthMode::Session {
            store: Box::new(store),
        });

        let id = auth.session_create("user-1", &claims()).unwrap();
        assert_eq!(auth.session_get(&id).unwrap(), claims());
        let fresh = auth.session_rotate(&id).unwrap();
        auth.session_delete(&fresh).unwrap();
        assert!(matches!(
            auth.session_get(&fresh),
            Err(AuthError::Session(SessionError::NotFound))
        ));
    }
}
