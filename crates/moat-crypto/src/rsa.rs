//! RSA signatures (PKCS#1 v1.5 and PSS) and key transport (PKCS#1 v1.5
//! and OAEP).
//!
//! Key material arrives as raw big-endian JWK components; the bignum
//! arithmetic is the `rsa` crate's. OAEP without a hash suffix uses
//! SHA-1 mask generation, which JOSE still mandates for `RSA-OAEP`.

use rand::rngs::OsRng;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use rsa::{pkcs1v15, pss, BigUint, Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::hash::HashAlgorithm;

/// Signature padding scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RsaSignaturePadding {
    Pkcs1,
    Pss,
}

/// CEK transport padding scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RsaEncryptionPadding {
    Pkcs1,
    OaepSha1,
    OaepSha256,
    OaepSha384,
    OaepSha512,
}

/// Build a public key from raw big-endian `n` and `e`.
pub fn public_key_from_components(n: &[u8], e: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
        .map_err(|e| CryptoError::InvalidRsaKey(e.to_string()))
}

/// Build a private key from raw big-endian components. The CRT primes
/// are optional; without them the `rsa` crate works from `n`, `e`, `d`
/// alone.
pub fn private_key_from_components(
    n: &[u8],
    e: &[u8],
    d: &[u8],
    p: Option<&[u8]>,
    q: Option<&[u8]>,
) -> Result<RsaPrivateKey, CryptoError> {
    let primes = match (p, q) {
        (Some(p), Some(q)) => vec![BigUint::from_bytes_be(p), BigUint::from_bytes_be(q)],
        _ => Vec::new(),
    };
    RsaPrivateKey::from_components(
        BigUint::from_bytes_be(n),
        BigUint::from_bytes_be(e),
        BigUint::from_bytes_be(d),
        primes,
    )
    .map_err(|e| CryptoError::InvalidRsaKey(e.to_string()))
}

enum SignerInner {
    Pkcs1Sha256(pkcs1v15::SigningKey<Sha256>),
    Pkcs1Sha384(pkcs1v15::SigningKey<Sha384>),
    Pkcs1Sha512(pkcs1v15::SigningKey<Sha512>),
    PssSha256(pss::SigningKey<Sha256>),
    PssSha384(pss::SigningKey<Sha384>),
    PssSha512(pss::SigningKey<Sha512>),
}

/// An RSA signing context, built once per key.
pub struct RsaSigner {
    inner: SignerInner,
}

impl RsaSigner {
    pub fn new(key: RsaPrivateKey, padding: RsaSignaturePadding, hash: HashAlgorithm) -> Self {
        let inner = match (padding, hash) {
            (RsaSignaturePadding::Pkcs1, HashAlgorithm::Sha256) => {
                SignerInner::Pkcs1Sha256(pkcs1v15::SigningKey::new(key))
            }
            (RsaSignaturePadding::Pkcs1, HashAlgorithm::Sha384) => {
                SignerInner::Pkcs1Sha384(pkcs1v15::SigningKey::new(key))
            }
            (RsaSignaturePadding::Pkcs1, HashAlgorithm::Sha512) => {
                SignerInner::Pkcs1Sha512(pkcs1v15::SigningKey::new(key))
            }
            (RsaSignaturePadding::Pss, HashAlgorithm::Sha256) => {
                SignerInner::PssSha256(pss::SigningKey::new(key))
            }
            (RsaSignaturePadding::Pss, HashAlgorithm::Sha384) => {
                SignerInner::PssSha384(pss::SigningKey::new(key))
            }
            (RsaSignaturePadding::Pss, HashAlgorithm::Sha512) => {
                SignerInner::PssSha512(pss::SigningKey::new(key))
            }
        };
        Self { inner }
    }

    /// Sign a message. PSS draws its salt from the system CSPRNG.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let bad = |e: rsa::signature::Error| CryptoError::SigningFailed(e.to_string());
        match &self.inner {
            SignerInner::Pkcs1Sha256(key) => Ok(key.try_sign(message).map_err(bad)?.to_vec()),
            SignerInner::Pkcs1Sha384(key) => Ok(key.try_sign(message).map_err(bad)?.to_vec()),
            SignerInner::Pkcs1Sha512(key) => Ok(key.try_sign(message).map_err(bad)?.to_vec()),
            SignerInner::PssSha256(key) => Ok(key
                .try_sign_with_rng(&mut OsRng, message)
                .map_err(bad)?
                .to_vec()),
            SignerInner::PssSha384(key) => Ok(key
                .try_sign_with_rng(&mut OsRng, message)
                .map_err(bad)?
                .to_vec()),
            SignerInner::PssSha512(key) => Ok(key
                .try_sign_with_rng(&mut OsRng, message)
                .map_err(bad)?
                .to_vec()),
        }
    }
}

enum VerifierInner {
    Pkcs1Sha256(pkcs1v15::VerifyingKey<Sha256>),
    Pkcs1Sha384(pkcs1v15::VerifyingKey<Sha384>),
    Pkcs1Sha512(pkcs1v15::VerifyingKey<Sha512>),
    PssSha256(pss::VerifyingKey<Sha256>),
    PssSha384(pss::VerifyingKey<Sha384>),
    PssSha512(pss::VerifyingKey<Sha512>),
}

/// An RSA verification context, built once per key.
pub struct RsaVerifier {
    inner: VerifierInner,
}

impl RsaVerifier {
    pub fn new(key: RsaPublicKey, padding: RsaSignaturePadding, hash: HashAlgorithm) -> Self {
        let inner = match (padding, hash) {
            (RsaSignaturePadding::Pkcs1, HashAlgorithm::Sha256) => {
                VerifierInner::Pkcs1Sha256(pkcs1v15::VerifyingKey::new(key))
            }
            (RsaSignaturePadding::Pkcs1, HashAlgorithm::Sha384) => {
                VerifierInner::Pkcs1Sha384(pkcs1v15::VerifyingKey::new(key))
            }
            (RsaSignaturePadding::Pkcs1, HashAlgorithm::Sha512) => {
                VerifierInner::Pkcs1Sha512(pkcs1v15::VerifyingKey::new(key))
            }
            (RsaSignaturePadding::Pss, HashAlgorithm::Sha256) => {
                VerifierInner::PssSha256(pss::VerifyingKey::new(key))
            }
            (RsaSignaturePadding::Pss, HashAlgorithm::Sha384) => {
                VerifierInner::PssSha384(pss::VerifyingKey::new(key))
            }
            (RsaSignaturePadding::Pss, HashAlgorithm::Sha512) => {
                VerifierInner::PssSha512(pss::VerifyingKey::new(key))
            }
        };
        Self { inner }
    }

    /// Verify a signature. Malformed signature bytes return false, never
    /// an error.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match &self.inner {
            VerifierInner::Pkcs1Sha256(key) => pkcs1v15::Signature::try_from(signature)
                .map(|sig| key.verify(message, &sig).is_ok())
                .unwrap_or(false),
            VerifierInner::Pkcs1Sha384(key) => pkcs1v15::Signature::try_from(signature)
                .map(|sig| key.verify(message, &sig).is_ok())
                .unwrap_or(false),
            VerifierInner::Pkcs1Sha512(key) => pkcs1v15::Signature::try_from(signature)
                .map(|sig| key.verify(message, &sig).is_ok())
                .unwrap_or(false),
            VerifierInner::PssSha256(key) => pss::Signature::try_from(signature)
                .map(|sig| key.verify(message, &sig).is_ok())
                .unwrap_or(false),
            VerifierInner::PssSha384(key) => pss::Signature::try_from(signature)
                .map(|sig| key.verify(message, &sig).is_ok())
                .unwrap_or(false),
            VerifierInner::PssSha512(key) => pss::Signature::try_from(signature)
                .map(|sig| key.verify(message, &sig).is_ok())
                .unwrap_or(false),
        }
    }
}

/// Encrypt a content-encryption key for transport.
pub fn encrypt_cek(
    key: &RsaPublicKey,
    padding: RsaEncryptionPadding,
    cek: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let bad = |e: rsa::Error| CryptoError::EncryptionFailed(e.to_string());
    match padding {
        RsaEncryptionPadding::Pkcs1 => key.encrypt(&mut OsRng, Pkcs1v15Encrypt, cek).map_err(bad),
        RsaEncryptionPadding::OaepSha1 => {
            key.encrypt(&mut OsRng, Oaep::new::<Sha1>(), cek).map_err(bad)
        }
        RsaEncryptionPadding::OaepSha256 => key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), cek)
            .map_err(bad),
        RsaEncryptionPadding::OaepSha384 => key
            .encrypt(&mut OsRng, Oaep::new::<Sha384>(), cek)
            .map_err(bad),
        RsaEncryptionPadding::OaepSha512 => key
            .encrypt(&mut OsRng, Oaep::new::<Sha512>(), cek)
            .map_err(bad),
    }
}

/// Decrypt a transported content-encryption key.
pub fn decrypt_cek(
    key: &RsaPrivateKey,
    padding: RsaEncryptionPadding,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let plaintext = match padding {
        RsaEncryptionPadding::Pkcs1 => key.decrypt(Pkcs1v15Encrypt, ciphertext),
        RsaEncryptionPadding::OaepSha1 => key.decrypt(Oaep::new::<Sha1>(), ciphertext),
        RsaEncryptionPadding::OaepSha256 => key.decrypt(Oaep::new::<Sha256>(), ciphertext),
        RsaEncryptionPadding::OaepSha384 => key.decrypt(Oaep::new::<Sha384>(), ciphertext),
        RsaEncryptionPadding::OaepSha512 => key.decrypt(Oaep::new::<Sha512>(), ciphertext),
    };
    plaintext
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;
    use std::sync::OnceLock;

    // 2048-bit key generation is slow in debug builds; share one.
    fn test_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).unwrap())
    }

    #[test]
    fn pkcs1_sign_verify_round_trip() {
        let key = test_key().clone();
        let public = key.to_public_key();
        for hash in [
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            let signer = RsaSigner::new(key.clone(), RsaSignaturePadding::Pkcs1, hash);
            let verifier = RsaVerifier::new(public.clone(), RsaSignaturePadding::Pkcs1, hash);
            let sig = signer.sign(b"payload").unwrap();
            assert_eq!(sig.len(), 256);
            assert!(verifier.verify(b"payload", &sig));
            assert!(!verifier.verify(b"other", &sig));
        }
    }

    #[test]
    fn pss_sign_verify_round_trip() {
        let key = test_key().clone();
        let public = key.to_public_key();
        let signer = RsaSigner::new(key, RsaSignaturePadding::Pss, HashAlgorithm::Sha256);
        let verifier = RsaVerifier::new(public, RsaSignaturePadding::Pss, HashAlgorithm::Sha256);
        let sig = signer.sign(b"payload").unwrap();
        assert!(verifier.verify(b"payload", &sig));
        assert!(!verifier.verify(b"other", &sig));
    }

    #[test]
    fn pss_signatures_are_randomized() {
        let key = test_key().clone();
        let signer = RsaSigner::new(key, RsaSignaturePadding::Pss, HashAlgorithm::Sha256);
        assert_ne!(signer.sign(b"m").unwrap(), signer.sign(b"m").unwrap());
    }

    #[test]
    fn padding_schemes_do_not_cross_verify() {
        let key = test_key().clone();
        let public = key.to_public_key();
        let signer = RsaSigner::new(key, RsaSignaturePadding::Pkcs1, HashAlgorithm::Sha256);
        let pss = RsaVerifier::new(public, RsaSignaturePadding::Pss, HashAlgorithm::Sha256);
        let sig = signer.sign(b"payload").unwrap();
        assert!(!pss.verify(b"payload", &sig));
    }

    #[test]
    fn malformed_signature_returns_false() {
        let public = test_key().to_public_key();
        let verifier = RsaVerifier::new(public, RsaSignaturePadding::Pkcs1, HashAlgorithm::Sha256);
        assert!(!verifier.verify(b"payload", &[]));
        assert!(!verifier.verify(b"payload", &[0u8; 10]));
        assert!(!verifier.verify(b"payload", &[0xffu8; 256]));
    }

    #[test]
    fn component_round_trip() {
        let key = test_key();
        let public = key.to_public_key();
        let n = public.n().to_bytes_be();
        let e = public.e().to_bytes_be();
        let rebuilt = public_key_from_components(&n, &e).unwrap();
        assert_eq!(rebuilt, public);
    }

    #[test]
    fn cek_transport_round_trip() {
        let key = test_key();
        let public = key.to_public_key();
        let cek = [0x42u8; 32];
        for padding in [
            RsaEncryptionPadding::Pkcs1,
            RsaEncryptionPadding::OaepSha1,
            RsaEncryptionPadding::OaepSha256,
            RsaEncryptionPadding::OaepSha384,
            RsaEncryptionPadding::OaepSha512,
        ] {
            let wrapped = encrypt_cek(&public, padding, &cek).unwrap();
            assert_eq!(wrapped.len(), 256);
            let recovered = decrypt_cek(key, padding, &wrapped).unwrap();
            assert_eq!(*recovered, cek);
        }
    }

    #[test]
    fn cek_tamper_fails() {
        let key = test_key();
        let public = key.to_public_key();
        let mut wrapped =
            encrypt_cek(&public, RsaEncryptionPadding::OaepSha256, &[0x42u8; 32]).unwrap();
        wrapped[0] ^= 0x01;
        assert!(decrypt_cek(key, RsaEncryptionPadding::OaepSha256, &wrapped).is_err());
    }

    #[test]
    fn oaep_hash_mismatch_fails() {
        let key = test_key();
        let public = key.to_public_key();
        let wrapped = encrypt_cek(&public, RsaEncryptionPadding::OaepSha256, &[1u8; 16]).unwrap();
        assert!(decrypt_cek(key, RsaEncryptionPadding::OaepSha512, &wrapped).is_err());
    }
}
