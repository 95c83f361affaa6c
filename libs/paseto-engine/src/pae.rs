//! Pre-authentication encoding
//!
//! `PAE(pieces) = LE64(count) || (LE64(len(p)) || p)*`, with the most
//! significant bit of every length cleared. Feeding the piece count and each
//! length into the MAC/signature input makes the encoding unambiguous, so no
//! concatenation of header, nonce, ciphertext and footer can collide with
//! another.

pub(crate) fn pae(pieces: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + pieces.iter().map(|p| 8 + p.len()).sum::<usize>());
    out.extend_from_slice(&le64(pieces.len() as u64));
    for piece in pieces {
        out.extend_from_slice(&le64(piece.len() as u64));
        out.extend_from_slice(piece);
    }
    out
}

fn le64(n: u64) -> [u8; 8] {
    (n & 0x7fff_ffff_ffff_ffff).to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    // reference outputs from the PASETO specification
    #[test]
    fn test_pae_spec_outputs() {
        assert_eq!(hex::encode(pae(&[])), "0000000000000000");
        assert_eq!(hex::encode(pae(&[b""])), "01000000000000000000000000000000");
        assert_eq!(
            hex::encode(pae(&[b"test"])),
            "0100000000000000040000000000000074657374"
        );
    }

    #[test]
    fn test_pae_is_injective_across_boundaries() {
        assert_ne!(pae(&[b"ab", b"c"]), pae(&[b"a", b"bc"]));
        assert_ne!(pae(&[b"abc"]), pae(&[b"abc", b""]));
    }
}
