//! Content encryption engine dispatched over the `enc` registry.

use moat_crypto::{CbcHmac, CryptoError, Gcm};
use moat_jose::{EncryptionAlgorithm, JoseError};

enum EncrypterInner {
    CbcHmac(CbcHmac),
    Gcm(Gcm),
}

/// AEAD for one content encryption algorithm, keyed by the CEK.
pub struct ContentEncrypter {
    enc: EncryptionAlgorithm,
    inner: EncrypterInner,
}

impl ContentEncrypter {
    pub fn new(enc: EncryptionAlgorithm, cek: &[u8]) -> Result<Self, JoseError> {
        if cek.len() != enc.cek_len() {
            return Err(JoseError::Crypto(CryptoError::InvalidKeyLength {
                expected: enc.cek_len(),
                got: cek.len(),
            }));
        }
        let inner = if enc.is_gcm() {
            EncrypterInner::Gcm(Gcm::new(cek)?)
        } else {
            EncrypterInner::CbcHmac(CbcHmac::new(cek)?)
        };
        Ok(Self { enc, inner })
    }

    pub fn enc(&self) -> EncryptionAlgorithm {
        self.enc
    }

    /// Encrypt with the header's base64url form as associated data.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
        match &self.inner {
            EncrypterInner::CbcHmac(cipher) => Ok(cipher.encrypt(plaintext, nonce, aad)?),
            EncrypterInner::Gcm(cipher) => Ok(cipher.encrypt(plaintext, nonce, aad)?),
        }
    }

    /// Decrypt; fails atomically on any mismatch.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, JoseError> {
        match &self.inner {
            EncrypterInner::CbcHmac(cipher) => Ok(cipher.decrypt(ciphertext, nonce, aad, tag)?),
            EncrypterInner::Gcm(cipher) => Ok(cipher.decrypt(ciphertext, nonce, aad, tag)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moat_crypto::random_bytes;

    #[test]
    fn round_trip_every_algorithm() {
        for enc in EncryptionAlgorithm::ALL {
            let cek = random_bytes(enc.cek_len()).unwrap();
            let nonce = random_bytes(enc.iv_len()).unwrap();
            let encrypter = ContentEncrypter::new(enc, &cek).unwrap();
            let (ct, tag) = encrypter.encrypt(b"payload", &nonce, b"aad").unwrap();
            assert_eq!(tag.len(), enc.tag_len(), "{}", enc.name());
            let pt = encrypter.decrypt(&ct, &nonce, b"aad", &tag).unwrap();
            assert_eq!(pt, b"payload");
        }
    }

    #[test]
    fn tamper_detection_every_algorithm() {
        for enc in EncryptionAlgorithm::ALL {
            let cek = random_bytes(enc.cek_len()).unwrap();
            let nonce = random_bytes(enc.iv_len()).unwrap();
            let encrypter = ContentEncrypter::new(enc, &cek).unwrap();
            let (mut ct, tag) = encrypter.encrypt(b"payload", &nonce, b"aad").unwrap();
            ct[0] ^= 1;
            assert!(encrypter.decrypt(&ct, &nonce, b"aad", &tag).is_err());
        }
    }

    #[test]
    fn rejects_wrong_cek_length() {
        let cek = random_bytes(16).unwrap();
        assert!(ContentEncrypter::new(EncryptionAlgorithm::A128CbcHs256, &cek).is_err());
    }
}
