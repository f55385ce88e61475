//! AES-CBC + HMAC composite authenticated encryption (RFC 7518 §5.2).
//!
//! The input key of 2·m bits is split in half: the first m bits key the
//! HMAC, the last m bits key AES-CBC. The tag is the leading m/8 bytes of
//! `HMAC(mac_key, A ∥ IV ∥ E ∥ AL)` where `AL` is the big-endian 64-bit
//! bit length of the associated data. Decryption verifies the tag in
//! constant time before any block is decrypted.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::hash::{ct_eq, HashAlgorithm};
use crate::hmac::HmacKey;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes192CbcEnc = cbc::Encryptor<Aes192>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes192CbcDec = cbc::Decryptor<Aes192>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// CBC-HMAC always uses a full AES block as nonce.
pub const NONCE_LEN: usize = 16;

/// A composite AES-CBC-HMAC cipher for one of the A128/192/256CBC-HS*
/// variants, selected by key length (32, 48, or 64 bytes).
pub struct CbcHmac {
    mac: HmacKey,
    enc_key: Zeroizing<Vec<u8>>,
    tag_len: usize,
}

impl CbcHmac {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let hash = match key.len() {
            32 => HashAlgorithm::Sha256,
            48 => HashAlgorithm::Sha384,
            64 => HashAlgorithm::Sha512,
            got => return Err(CryptoError::InvalidKeyLength { expected: 64, got }),
        };
        let half = key.len() / 2;
        let mac = HmacKey::new(hash, &key[..half])?;
        Ok(Self {
            mac,
            enc_key: Zeroizing::new(key[half..].to_vec()),
            tag_len: half,
        })
    }

    /// Truncated tag length in bytes: 16, 24, or 32.
    pub fn tag_len(&self) -> usize {
        self.tag_len
    }

    /// PKCS#7 output size: `(plaintext_len + 16) & !15`.
    pub const fn ciphertext_len(plaintext_len: usize) -> usize {
        (plaintext_len + 16) & !15
    }

    fn compute_tag(&self, aad: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Vec<u8> {
        let al = ((aad.len() as u64) * 8).to_be_bytes();
        let mut full = self.mac.sign_parts(&[aad, nonce, ciphertext, &al]);
        full.truncate(self.tag_len);
        full
    }

    /// Encrypt, returning `(ciphertext, tag)`.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::InvalidNonceLength {
                expected: NONCE_LEN,
                got: nonce.len(),
            });
        }
        let ciphertext = match self.enc_key.len() {
            16 => Aes128CbcEnc::new_from_slices(&self.enc_key, nonce)
                .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            24 => Aes192CbcEnc::new_from_slices(&self.enc_key, nonce)
                .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            32 => Aes256CbcEnc::new_from_slices(&self.enc_key, nonce)
                .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            _ => unreachable!("key length validated in new"),
        };
        let tag = self.compute_tag(aad, nonce, &ciphertext);
        Ok((ciphertext, tag))
    }

    /// Verify the tag, then decrypt. Tag mismatch, bad padding, and a
    /// malformed ciphertext length all report the same failure.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::InvalidNonceLength {
                expected: NONCE_LEN,
                got: nonce.len(),
            });
        }
        if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
            return Err(CryptoError::DecryptionFailed);
        }
        let expected = self.compute_tag(aad, nonce, ciphertext);
        if !ct_eq(&expected, tag) {
            return Err(CryptoError::DecryptionFailed);
        }
        let plaintext = match self.enc_key.len() {
            16 => Aes128CbcDec::new_from_slices(&self.enc_key, nonce)
                .map_err(|_| CryptoError::DecryptionFailed)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            24 => Aes192CbcDec::new_from_slices(&self.enc_key, nonce)
                .map_err(|_| CryptoError::DecryptionFailed)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            32 => Aes256CbcDec::new_from_slices(&self.enc_key, nonce)
                .map_err(|_| CryptoError::DecryptionFailed)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            _ => unreachable!("key length validated in new"),
        };
        plaintext.map_err(|_| CryptoError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    // RFC 7518 appendix B.1 (A128CBC-HS256).
    #[test]
    fn rfc7518_b1_vector() {
        let key = hex("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
        let plaintext: &[u8] = b"A cipher system must not be required to be secret, and it must be \
                                 able to fall into the hands of the enemy without inconvenience";
        let nonce = hex("1af38c2dc2b96ffdd86694092341bc04");
        let aad: &[u8] = b"The second principle of Auguste Kerckhoffs";

        let cipher = CbcHmac::new(&key).unwrap();
        let (ciphertext, tag) = cipher.encrypt(plaintext, &nonce, aad).unwrap();

        assert_eq!(
            ciphertext,
            hex(concat!(
                "c80edfa32ddf39d5ef00c0b468834279a2e46a1b8049f792f76bfe54b903a9c9",
                "a94ac9b47ad2655c5f10f9aef71427e2fc6f9b3f399a221489f16362c7032336",
                "09d45ac69864e3321cf82935ac4096c86e133314c54019e8ca7980dfa4b9cf1b",
                "384c486f3a54c51078158ee5d79de59fbd34d848b3d69550a67646344427ade5",
                "4b8851ffb598f7f80074b9473c82e2db"
            ))
        );
        assert_eq!(tag, hex("652c3fa36b0a7c5b3219fab3a30bc1c4"));

        let recovered = cipher.decrypt(&ciphertext, &nonce, aad, &tag).unwrap();
        assert_eq!(recovered, plaintext);
    }

    fn random_cipher(key_len: usize) -> CbcHmac {
        let mut key = vec![0u8; key_len];
        getrandom::getrandom(&mut key).unwrap();
        CbcHmac::new(&key).unwrap()
    }

    fn random_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        getrandom::getrandom(&mut nonce).unwrap();
        nonce
    }

    #[test]
    fn round_trip_all_variants() {
        for key_len in [32usize, 48, 64] {
            let cipher = random_cipher(key_len);
            let nonce = random_nonce();
            let (ct, tag) = cipher.encrypt(b"hello composite", &nonce, b"aad").unwrap();
            assert_eq!(tag.len(), key_len / 2);
            let pt = cipher.decrypt(&ct, &nonce, b"aad", &tag).unwrap();
            assert_eq!(pt, b"hello composite");
        }
    }

    #[test]
    fn ciphertext_size_contract() {
        let cipher = random_cipher(32);
        let nonce = random_nonce();
        for len in [0usize, 1, 15, 16, 17, 31, 32, 100] {
            let (ct, _) = cipher.encrypt(&vec![0u8; len], &nonce, b"").unwrap();
            assert_eq!(ct.len(), CbcHmac::ciphertext_len(len), "plaintext len {len}");
        }
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let cipher = random_cipher(32);
        let nonce = random_nonce();
        let (mut ct, tag) = cipher.encrypt(b"secret", &nonce, b"aad").unwrap();
        ct[0] ^= 0x01;
        assert!(cipher.decrypt(&ct, &nonce, b"aad", &tag).is_err());
    }

    #[test]
    fn tampered_tag_fails() {
        let cipher = random_cipher(48);
        let nonce = random_nonce();
        let (ct, mut tag) = cipher.encrypt(b"secret", &nonce, b"aad").unwrap();
        let last = tag.len() - 1;
        tag[last] ^= 0x80;
        assert!(cipher.decrypt(&ct, &nonce, b"aad", &tag).is_err());
    }

    #[test]
    fn wrong_aad_fails() {
        let cipher = random_cipher(64);
        let nonce = random_nonce();
        let (ct, tag) = cipher.encrypt(b"secret", &nonce, b"right").unwrap();
        assert!(cipher.decrypt(&ct, &nonce, b"wrong", &tag).is_err());
    }

    #[test]
    fn wrong_nonce_fails() {
        let cipher = random_cipher(32);
        let nonce = random_nonce();
        let (ct, tag) = cipher.encrypt(b"secret", &nonce, b"aad").unwrap();
        let other = random_nonce();
        assert!(cipher.decrypt(&ct, &other, b"aad", &tag).is_err());
    }

    #[test]
    fn rejects_bad_key_lengths() {
        assert!(CbcHmac::new(&[0u8; 16]).is_err());
        assert!(CbcHmac::new(&[0u8; 40]).is_err());
        assert!(CbcHmac::new(&[]).is_err());
    }

    #[test]
    fn rejects_bad_nonce_length() {
        let cipher = random_cipher(32);
        assert!(cipher.encrypt(b"x", &[0u8; 12], b"").is_err());
        assert!(cipher.decrypt(&[0u8; 16], &[0u8; 12], b"", &[0u8; 16]).is_err());
    }

    #[test]
    fn rejects_unaligned_ciphertext() {
        let cipher = random_cipher(32);
        let nonce = random_nonce();
        assert!(cipher.decrypt(&[0u8; 17], &nonce, b"", &[0u8; 16]).is_err());
        assert!(cipher.decrypt(&[], &nonce, b"", &[0u8; 16]).is_err());
    }
}
