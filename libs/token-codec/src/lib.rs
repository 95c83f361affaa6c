//! Shared codec primitives for the token engines
//!
//! Base64url and Base32 without padding, counter packing, constant-time
//! comparison and the default random id factory.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64url payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid base32 payload")]
    Base32,
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Encode bytes as base64url without padding (the JOSE/PASETO convention).
pub fn b64url_encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode unpadded base64url
///
/// Padded or non-alphabet input is rejected.
pub fn b64url_decode(data: &str) -> Result<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(data)?)
}

/// Encode bytes as RFC 4648 Base32 without padding (authenticator-app convention)
pub fn base32_encode(data: &[u8]) -> String {
    base32::encode(base32::Alphabet::RFC4648 { padding: false }, data)
}

/// Decode RFC 4648 Base32, tolerating trailing padding
pub fn base32_decode(data: &str) -> Result<Vec<u8>> {
    base32::decode(
        base32::Alphabet::RFC4648 { padding: false },
        data.trim_end_matches('='),
    )
    .ok_or(CodecError::Base32)
}

/// Big-endian 8-byte counter packing (RFC 4226 moving factor)
pub fn pack_u64_be(counter: u64) -> [u8; 8] {
    counter.to_be_bytes()
}

/// Constant-time byte comparison (prevents timing attacks)
///
/// Length mismatch returns early; equal-length inputs are always scanned in
/// full, accumulating differences with XOR.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }

    diff == 0
}

/// 128-bit random identifier, lowercase hex
pub fn random_hex_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_b64url_round_trip() {
        let data = b"keyforge codec test \x00\xff\x10";
        let encoded = b64url_encode(data);
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert_eq!(b64url_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_b64url_rejects_padded_input() {
        // "ab" encodes to "YWI" unpadded; the padded form must not decode
        assert!(b64url_decode("YWI=").is_err());
    }

    #[test]
    fn test_b64url_rejects_standard_alphabet() {
        assert!(b64url_decode("a+b/").is_err());
    }

    #[test]
    fn test_base32_rfc4648_vectors() {
        assert_eq!(base32_encode(b""), "");
        assert_eq!(base32_encode(b"f"), "MY");
        assert_eq!(base32_encode(b"fo"), "MZXQ");
        assert_eq!(base32_encode(b"foo"), "MZXW6");
        assert_eq!(base32_encode(b"foob"), "MZXW6YQ");
        assert_eq!(base32_encode(b"fooba"), "MZXW6YTB");
        assert_eq!(base32_encode(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn test_base32_decode_tolerates_padding() {
        assert_eq!(base32_decode("MZXW6YTB").unwrap(), b"fooba");
        assert_eq!(base32_decode("MZXW6===").unwrap(), b"foo");
    }

    #[test]
    fn test_base32_rejects_invalid_chars() {
        assert!(base32_decode("MZXW6YT1").is_err()); // '1' is not in the alphabet
    }

    #[test]
    fn test_pack_u64_be() {
        assert_eq!(pack_u64_be(0), [0u8; 8]);
        assert_eq!(pack_u64_be(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(
            pack_u64_be(0x0102030405060708),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn test_ct_eq() {
        assert!(ct_eq(b"test", b"test"));
        assert!(!ct_eq(b"test", b"fail"));
        assert!(!ct_eq(b"test", b"t")); // different lengths
        assert!(ct_eq(b"", b""));
    }

    #[test]
    fn test_random_hex_id() {
        let a = random_hex_id();
        let b = random_hex_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }
}
