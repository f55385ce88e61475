//! Concat KDF (NIST SP 800-56A §5.8.1, single-step, SHA-256).
//!
//! Derives JWE content or key-wrapping keys from an ECDH shared secret.
//! OtherInfo is `AlgorithmID ∥ PartyUInfo ∥ PartyVInfo ∥ SuppPubInfo`,
//! each of the first three as a 32-bit big-endian length prefix followed
//! by the data, and SuppPubInfo the key length in bits.

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Derive `key_len_bits / 8` bytes from shared secret `z`.
///
/// `alg` is the ASCII algorithm identifier ("A128KW", "A256GCM", ...);
/// `apu`/`apv` are the already-decoded PartyUInfo/PartyVInfo values, empty
/// when the header omits them. Outputs longer than one hash run the
/// counter-prefixed rounds the standard prescribes.
pub fn concat_kdf_sha256(
    z: &[u8],
    alg: &str,
    apu: &[u8],
    apv: &[u8],
    key_len_bits: u32,
) -> Zeroizing<Vec<u8>> {
    let key_len = (key_len_bits as usize) / 8;
    let rounds = key_len.div_ceil(32) as u32;

    let mut derived = Zeroizing::new(Vec::with_capacity(rounds as usize * 32));
    for round in 1..=rounds {
        let mut hasher = Sha256::new();
        hasher.update(round.to_be_bytes());
        hasher.update(z);

        // AlgorithmID
        hasher.update((alg.len() as u32).to_be_bytes());
        hasher.update(alg.as_bytes());

        // PartyUInfo / PartyVInfo
        hasher.update((apu.len() as u32).to_be_bytes());
        hasher.update(apu);
        hasher.update((apv.len() as u32).to_be_bytes());
        hasher.update(apv);

        // SuppPubInfo
        hasher.update(key_len_bits.to_be_bytes());

        derived.extend_from_slice(&hasher.finalize());
    }
    derived.truncate(key_len);
    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_lengths() {
        let z = [0u8; 32];
        for bits in [128u32, 192, 256, 384, 512] {
            let out = concat_kdf_sha256(&z, "alg", b"", b"", bits);
            assert_eq!(out.len(), bits as usize / 8);
        }
    }

    #[test]
    fn deterministic() {
        let z = [42u8; 32];
        let a = concat_kdf_sha256(&z, "A256KW", b"", b"", 256);
        let b = concat_kdf_sha256(&z, "A256KW", b"", b"", 256);
        assert_eq!(*a, *b);
    }

    #[test]
    fn inputs_separate_domains() {
        let z = [1u8; 32];
        let base = concat_kdf_sha256(&z, "A128KW", b"", b"", 128);
        assert_ne!(*base, *concat_kdf_sha256(&z, "A256KW", b"", b"", 128));
        assert_ne!(*base, *concat_kdf_sha256(&z, "A128KW", b"alice", b"", 128));
        assert_ne!(*base, *concat_kdf_sha256(&z, "A128KW", b"", b"bob", 128));
        assert_ne!(*base, *concat_kdf_sha256(&[2u8; 32], "A128KW", b"", b"", 128));
    }

    // RFC 7518 appendix C: ECDH-ES direct key agreement for A128GCM with
    // PartyUInfo "Alice" and PartyVInfo "Bob".
    #[test]
    fn rfc7518_appendix_c_vector() {
        let z = [
            158, 86, 217, 29, 129, 113, 53, 211, 114, 131, 66, 131, 191, 132, 38, 156, 251, 49,
            110, 163, 218, 128, 106, 72, 246, 218, 167, 121, 140, 254, 144, 196,
        ];
        let derived = concat_kdf_sha256(&z, "A128GCM", b"Alice", b"Bob", 128);
        assert_eq!(
            *derived,
            vec![86, 170, 141, 234, 248, 35, 109, 32, 92, 34, 40, 205, 113, 167, 16, 26]
        );
    }

    #[test]
    fn key_length_separates_domains() {
        // SuppPubInfo carries the key length, so a 512-bit derivation does
        // not share a prefix with a 256-bit one.
        let z = [7u8; 32];
        let long = concat_kdf_sha256(&z, "A256CBC-HS512", b"", b"", 512);
        let short = concat_kdf_sha256(&z, "A256CBC-HS512", b"", b"", 256);
        assert_ne!(long[..32], short[..]);
        // And the two rounds of the long output differ from each other.
        assert_ne!(long[..32], long[32..]);
    }
}
