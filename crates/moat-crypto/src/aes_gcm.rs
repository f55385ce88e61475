//! AES-GCM with detached tags (NIST SP 800-38D).
//!
//! JOSE transports ciphertext and tag as separate base64url segments, so
//! the API here splits the `aes-gcm` crate's combined output at the
//! 16-byte tag boundary and rejoins it on decrypt.

use aes::Aes192;
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};

use crate::error::CryptoError;

// The crate exports no 192-bit alias.
type Aes192Gcm = AesGcm<Aes192, U12>;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

enum Inner {
    A128(Aes128Gcm),
    A192(Aes192Gcm),
    A256(Aes256Gcm),
}

/// An AES-GCM cipher for 16-, 24-, or 32-byte keys.
pub struct Gcm {
    inner: Inner,
}

impl Gcm {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let inner = match key.len() {
            16 => Inner::A128(
                Aes128Gcm::new_from_slice(key)
                    .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?,
            ),
            24 => Inner::A192(
                Aes192Gcm::new_from_slice(key)
                    .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?,
            ),
            32 => Inner::A256(
                Aes256Gcm::new_from_slice(key)
                    .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?,
            ),
            got => {
                return Err(CryptoError::InvalidKeyLength { expected: 32, got });
            }
        };
        Ok(Self { inner })
    }

    /// Encrypt, returning `(ciphertext, tag)` with a 16-byte tag.
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
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload {
            msg: plaintext,
            aad,
        };
        let mut combined = match &self.inner {
            Inner::A128(cipher) => cipher.encrypt(nonce, payload),
            Inner::A192(cipher) => cipher.encrypt(nonce, payload),
            Inner::A256(cipher) => cipher.encrypt(nonce, payload),
        }
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let tag = combined.split_off(combined.len() - TAG_LEN);
        Ok((combined, tag))
    }

    /// Decrypt a detached `(ciphertext, tag)` pair. Fails atomically on
    /// any mismatch of ciphertext, nonce, AAD, or tag.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return Err(CryptoError::DecryptionFailed);
        }
        let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        combined.extend_from_slice(ciphertext);
        combined.extend_from_slice(tag);
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload {
            msg: &combined,
            aad,
        };
        match &self.inner {
            Inner::A128(cipher) => cipher.decrypt(nonce, payload),
            Inner::A192(cipher) => cipher.decrypt(nonce, payload),
            Inner::A256(cipher) => cipher.decrypt(nonce, payload),
        }
        .map_err(|_| CryptoError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_gcm(key_len: usize) -> Gcm {
        let mut key = vec![0u8; key_len];
        getrandom::getrandom(&mut key).unwrap();
        Gcm::new(&key).unwrap()
    }

    fn random_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        getrandom::getrandom(&mut nonce).unwrap();
        nonce
    }

    #[test]
    fn round_trip_all_key_sizes() {
        for key_len in [16usize, 24, 32] {
            let gcm = random_gcm(key_len);
            let nonce = random_nonce();
            let (ct, tag) = gcm.encrypt(b"plaintext", &nonce, b"header").unwrap();
            assert_eq!(tag.len(), TAG_LEN);
            assert_eq!(ct.len(), b"plaintext".len());
            let pt = gcm.decrypt(&ct, &nonce, b"header", &tag).unwrap();
            assert_eq!(pt, b"plaintext");
        }
    }

    #[test]
    fn empty_plaintext() {
        let gcm = random_gcm(32);
        let nonce = random_nonce();
        let (ct, tag) = gcm.encrypt(b"", &nonce, b"aad").unwrap();
        assert!(ct.is_empty());
        assert!(gcm.decrypt(&ct, &nonce, b"aad", &tag).unwrap().is_empty());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let gcm = random_gcm(16);
        let nonce = random_nonce();
        let (mut ct, tag) = gcm.encrypt(b"secret", &nonce, b"").unwrap();
        ct[0] ^= 0xff;
        assert!(gcm.decrypt(&ct, &nonce, b"", &tag).is_err());
    }

    #[test]
    fn tampered_tag_fails() {
        let gcm = random_gcm(16);
        let nonce = random_nonce();
        let (ct, mut tag) = gcm.encrypt(b"secret", &nonce, b"").unwrap();
        tag[15] ^= 0x01;
        assert!(gcm.decrypt(&ct, &nonce, b"", &tag).is_err());
    }

    #[test]
    fn wrong_aad_fails() {
        let gcm = random_gcm(32);
        let nonce = random_nonce();
        let (ct, tag) = gcm.encrypt(b"secret", &nonce, b"right").unwrap();
        assert!(gcm.decrypt(&ct, &nonce, b"wrong", &tag).is_err());
    }

    #[test]
    fn rejects_bad_key_length() {
        assert!(Gcm::new(&[0u8; 20]).is_err());
    }

    #[test]
    fn rejects_bad_nonce_and_tag_lengths() {
        let gcm = random_gcm(16);
        assert!(gcm.encrypt(b"x", &[0u8; 16], b"").is_err());
        assert!(gcm.decrypt(b"x", &[0u8; 12], b"", &[0u8; 8]).is_err());
        assert!(gcm.decrypt(b"x", &[0u8; 11], b"", &[0u8; 16]).is_err());
    }
}
