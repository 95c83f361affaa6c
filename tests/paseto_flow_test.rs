//! PASETO Flow Integration Tests
//!
//! Purpose: Verify the complete PASETO lifecycle through the `Auth` façade
//!
//! Test Coverage:
//! 1. Local round trips across all four protocol versions
//! 2. Public sign and verify with separate issuer and verifier instances
//! 3. Footer authentication and mismatch rejection
//! 4. Version pinning, expiry, not-before and tamper rejection
//!
//! Run: cargo test --test paseto_flow_test

use std::time::Duration;

use serde_json::json;

use keyforge::{Auth, AuthError, AuthMode, Claims, Footer, PasetoEngine, PasetoError, PasetoKey};

const SHARED_KEY: &[u8] = b"keyforge-paseto-shared-key-32b!!";

fn claims() -> Claims {
    let mut map = Claims::new();
    map.insert("sub".to_string(), json!("user-42"));
    map.insert("scope".to_string(), json!("read write"));
    map
}

fn local_auth(key: PasetoKey) -> Auth {
    Auth::new(AuthMode::Paseto {
        engine: PasetoEngine::new(key),
    })
}

#[test]
fn test_v4_local_round_trip() {
    let auth = local_auth(PasetoKey::v4_local(SHARED_KEY).unwrap());

    let token = auth.paseto_create(&claims(), None).unwrap();
    assert!(token.starts_with("v4.local."));

    let (decoded, footer) = auth.paseto_decode(&token, None).unwrap();
    assert_eq!(decoded.get("sub"), Some(&json!("user-42")));
    assert!(decoded.contains_key("iat"), "iat should be stamped");
    assert!(footer.is_none());
}

#[test]
fn test_all_local_versions_round_trip() {
    let keys = [
        (PasetoKey::v1_local(SHARED_KEY).unwrap(), "v1.local."),
        (PasetoKey::v2_local(SHARED_KEY).unwrap(), "v2.local."),
        (PasetoKey::v3_local(SHARED_KEY).unwrap(), "v3.local."),
        (PasetoKey::v4_local(SHARED_KEY).unwrap(), "v4.local."),
    ];
    for (key, header) in keys {
        let auth = local_auth(key);
        let token = auth.paseto_create(&claims(), None).unwrap();
        assert!(token.starts_with(header), "{token} should start with {header}");

        let (decoded, _) = auth.paseto_decode(&token, None).unwrap();
        assert_eq!(decoded.get("scope"), Some(&json!("read write")));
    }
}

#[test]
fn test_public_sign_and_verify() {
    let seed = [11u8; 32];
    let public = ed25519_dalek::SigningKey::from_bytes(&seed)
        .verifying_key()
        .to_bytes();

    let issuer = local_auth(PasetoKey::v4_public_signer(&seed).unwrap());
    let verifier = local_auth(PasetoKey::v4_public_verifier(&public).unwrap());

    let token = issuer.paseto_create(&claims(), None).unwrap();
    assert!(token.starts_with("v4.public."));

    let (decoded, _) = verifier.paseto_decode(&token, None).unwrap();
    assert_eq!(decoded.get("sub"), Some(&json!("user-42")));
}

#[test]
fn test_verifier_cannot_issue() {
    let public = ed25519_dalek::SigningKey::from_bytes(&[11u8; 32])
        .verifying_key()
        .to_bytes();
    let verifier = local_auth(PasetoKey::v4_public_verifier(&public).unwrap());

    assert!(matches!(
        verifier.paseto_create(&claims(), None),
        Err(AuthError::Paseto(PasetoError::Configuration(_)))
    ));
}

#[test]
fn test_footer_round_trip_and_mismatch() {
    let auth = local_auth(PasetoKey::v4_local(SHARED_KEY).unwrap());
    let footer = Footer::key_id("key-2024");

    let token = auth.paseto_create(&claims(), Some(&footer)).unwrap();
    let (_, returned) = auth.paseto_decode(&token, Some(&footer)).unwrap();
    assert_eq!(returned, Some(footer));

    assert!(matches!(
        auth.paseto_decode(&token, Some(&Footer::key_id("other"))),
        Err(AuthError::Paseto(PasetoError::FooterMismatch))
    ));

    // expecting a footer on a bare token fails the same way
    let bare = auth.paseto_create(&claims(), None).unwrap();
    assert!(matches!(
        auth.paseto_decode(&bare, Some(&Footer::Text("x".into()))),
        Err(AuthError::Paseto(PasetoError::FooterMismatch))
    ));
}

#[test]
fn test_cross_version_tokens_are_rejected() {
    let v2 = local_auth(PasetoKey::v2_local(SHARED_KEY).unwrap());
    let token = v2.paseto_create(&claims(), None).unwrap();

    let v4 = local_auth(PasetoKey::v4_local(SHARED_KEY).unwrap());
    assert!(matches!(
        v4.paseto_decode(&token, None),
        Err(AuthError::Paseto(PasetoError::HeaderMismatch { .. }))
    ));
}

#[test]
fn test_expired_token_is_rejected() {
    let auth = local_auth(PasetoKey::v4_local(SHARED_KEY).unwrap());
    let mut payload = claims();
    payload.insert("exp".to_string(), json!("2020-01-01T00:00:00Z"));

    let token = auth.paseto_create(&payload, None).unwrap();
    assert!(matches!(
        auth.paseto_decode(&token, None),
        Err(AuthError::Paseto(PasetoError::Expired))
    ));

    // the engine can still read it with expiry checking off
    let engine = PasetoEngine::new(PasetoKey::v4_local(SHARED_KEY).unwrap());
    assert!(engine.decode(&token, None, false).is_ok());
}

#[test]
fn test_not_yet_valid_token_is_rejected() {
    let auth = local_auth(PasetoKey::v4_local(SHARED_KEY).unwrap());
    let mut payload = claims();
    payload.insert("nbf".to_string(), json!("2099-01-01T00:00:00Z"));

    let token = auth.paseto_create(&payload, None).unwrap();
    assert!(matches!(
        auth.paseto_decode(&token, None),
        Err(AuthError::Paseto(PasetoError::NotYetValid))
    ));
}

#[test]
fn test_ttl_stamps_expiry() {
    let engine = PasetoEngine::new(PasetoKey::v4_local(SHARED_KEY).unwrap())
        .with_ttl(Duration::from_secs(60));
    let auth = Auth::new(AuthMode::Paseto { engine });

    let token = auth.paseto_create(&claims(), None).unwrap();
    let (decoded, _) = auth.paseto_decode(&token, None).unwrap();

    let iat = chrono::DateTime::parse_from_rfc3339(decoded["iat"].as_str().unwrap()).unwrap();
    let exp = chrono::DateTime::parse_from_rfc3339(decoded["exp"].as_str().unwrap()).unwrap();
    assert_eq!((exp - iat).num_seconds(), 60);
}

#[test]
fn test_tampered_token_is_rejected() {
    let auth = local_auth(PasetoKey::v4_local(SHARED_KEY).unwrap());
    let token = auth.paseto_create(&claims(), None).unwrap();

    let mut bytes = token.into_bytes();
    let last = bytes.len() - 1;
    bytes[last] ^= 1;
    let tampered = String::from_utf8(bytes).unwrap();

    assert!(matches!(
        auth.paseto_decode(&tampered, None),
        Err(AuthError::Paseto(
            PasetoError::Integrity | PasetoError::Malformed(_)
        ))
    ));
}
