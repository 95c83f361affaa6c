//! Suspension-mode façade
//!
//! Same surface as the blocking [`crate::Auth`], over async backends. The
//! crypto paths never yield; only session and revocation calls await their
//! backend.

use revocation_list::ListKind;
use tracing::warn;

pub use revocation_list::{AsyncRedisRevocations, AsyncRevocationList};
pub use session_store::{AsyncRedisSessions, AsyncSessionBackend};

use crate::{
    jwt_inspect, wrong_mode, AuthError, Claims, Footer, Header, JwtEngine, JwtError, OtpFlavor,
    PasetoEngine, Result, SessionData,
};

/// The single mechanism an [`Auth`] instance is bound to
pub enum AuthMode {
    Jwt {
        engine: JwtEngine,
        revocation: Option<AsyncRevocationList>,
    },
    Paseto {
        engine: PasetoEngine,
    },
    Session {
        store: Box<dyn AsyncSessionBackend>,
    },
    Otp {
        otp: OtpFlavor,
    },
}

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
    pub async fn jwt_verify(
        &self,
        token: &str,
        check_exp: bool,
        check_list: bool,
    ) -> Result<Claims> {
        match &self.mode {
            AuthMode::Jwt { engine, revocation } => {
                let claims = engine.verify(token, check_exp, None)?;
                if check_list {
                    let Some(list) = revocation else {
                        return Err(AuthError::Configuration(
                            "no revocation list configured".into(),
                        ));
                    };
                    if !list.check(token).await? {
                        warn!(kind = ?list.kind(), "token rejected by revocation list");
                        return Err(AuthError::Jwt(match list.kind() {
                            ListKind::Black => JwtError::Revoked,
                            ListKind::White => JwtError::NotWhitelisted,
                        }));
                    }
                }
                Ok(claims)
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
    /// `secret` is Base32, as produced by [`crate::generate_secret`].
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

    pub async fn session_create(&self, session_key: &str, data: &SessionData) -> Result<String> {
        Ok(self
            .session_store("session_create")?
            .create(session_key, data)
            .await?)
    }

    pub async fn session_get(&self, id: &str) -> Result<SessionData> {
        Ok(self.session_store("session_get")?.get(id).await?)
    }

    pub async fn session_update(&self, id: &str, data: &SessionData) -> Result<()> {
        Ok(self.session_store("session_update")?.update(id, data).await?)
    }

    pub async fn session_delete(&self, id: &str) -> Result<()> {
        Ok(self.session_store("session_delete")?.delete(id).await?)
    }

    pub async fn session_clear(&self, session_key: &str) -> Result<()> {
        Ok(self.session_store("session_clear")?.clear(session_key).await?)
    }

    pub async fn session_rotate(&self, id: &str) -> Result<String> {
        Ok(self.session_store("session_rotate")?.rotate(id).await?)
    }

    fn session_store(&self, method: &str) -> Result<&dyn AsyncSessionBackend> {
        match &self.mode {
            AuthMode::Session { store } => Ok(store.as_ref()),
            _ => Err(wrong_mode(method, "session")),
        }
    }
}
