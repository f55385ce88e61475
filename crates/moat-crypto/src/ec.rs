//! Elliptic-curve operations: ECDSA signing/verification and ECDH.
//!
//! Signatures use the fixed-size `r ∥ s` encoding JOSE requires (64, 96,
//! or 132 bytes), not ASN.1 DER. JWK coordinates may arrive without
//! leading zeros and are left-padded to the field width before use.

use ecdsa::signature::{Signer, Verifier};
use elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// The NIST curves the JOSE algorithms use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    pub const fn name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "P-256" => Some(Self::P256),
            "P-384" => Some(Self::P384),
            "P-521" => Some(Self::P521),
            _ => None,
        }
    }

    /// Field element width in bytes (66 for P-521).
    pub const fn field_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// Fixed-size signature width: `2 · field_len`.
    pub const fn signature_len(self) -> usize {
        self.field_len() * 2
    }
}

fn left_pad(bytes: &[u8], len: usize) -> Result<Vec<u8>, CryptoError> {
    if bytes.len() > len {
        return Err(CryptoError::InvalidEcKey(format!(
            "coordinate is {} bytes, curve field is {len}",
            bytes.len()
        )));
    }
    let mut out = vec![0u8; len];
    out[len - bytes.len()..].copy_from_slice(bytes);
    Ok(out)
}

/// SEC1 uncompressed point: `0x04 ∥ x ∥ y`, coordinates padded to field width.
fn sec1_uncompressed(curve: EcCurve, x: &[u8], y: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let len = curve.field_len();
    let mut out = Vec::with_capacity(1 + 2 * len);
    out.push(0x04);
    out.extend_from_slice(&left_pad(x, len)?);
    out.extend_from_slice(&left_pad(y, len)?);
    Ok(out)
}

/// An EC public key on one of the supported curves.
#[derive(Clone, Debug)]
pub enum EcPublicKey {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
}

impl EcPublicKey {
    pub fn curve(&self) -> EcCurve {
        match self {
            Self::P256(_) => EcCurve::P256,
            Self::P384(_) => EcCurve::P384,
            Self::P521(_) => EcCurve::P521,
        }
    }

    /// Import from raw JWK coordinates.
    pub fn from_coordinates(curve: EcCurve, x: &[u8], y: &[u8]) -> Result<Self, CryptoError> {
        let sec1 = sec1_uncompressed(curve, x, y)?;
        let on_curve = |e: String| CryptoError::InvalidEcKey(e);
        match curve {
            EcCurve::P256 => {
                let point = p256::EncodedPoint::from_bytes(&sec1)
                    .map_err(|e| on_curve(e.to_string()))?;
                p256::PublicKey::from_encoded_point(&point)
                    .into_option()
                    .map(Self::P256)
                    .ok_or_else(|| on_curve("point not on P-256".into()))
            }
            EcCurve::P384 => {
                let point = p384::EncodedPoint::from_bytes(&sec1)
                    .map_err(|e| on_curve(e.to_string()))?;
                p384::PublicKey::from_encoded_point(&point)
                    .into_option()
                    .map(Self::P384)
                    .ok_or_else(|| on_curve("point not on P-384".into()))
            }
            EcCurve::P521 => {
                let point = p521::EncodedPoint::from_bytes(&sec1)
                    .map_err(|e| on_curve(e.to_string()))?;
                p521::PublicKey::from_encoded_point(&point)
                    .into_option()
                    .map(Self::P521)
                    .ok_or_else(|| on_curve("point not on P-521".into()))
            }
        }
    }

    /// Export `(x, y)` padded to the field width.
    pub fn coordinates(&self) -> (Vec<u8>, Vec<u8>) {
        let (x, y, len) = match self {
            Self::P256(pk) => {
                let point = pk.to_encoded_point(false);
                (
                    point.x().map(|c| c.to_vec()).unwrap_or_default(),
                    point.y().map(|c| c.to_vec()).unwrap_or_default(),
                    EcCurve::P256.field_len(),
                )
            }
            Self::P384(pk) => {
                let point = pk.to_encoded_point(false);
                (
                    point.x().map(|c| c.to_vec()).unwrap_or_default(),
                    point.y().map(|c| c.to_vec()).unwrap_or_default(),
                    EcCurve::P384.field_len(),
                )
            }
            Self::P521(pk) => {
                let point = pk.to_encoded_point(false);
                (
                    point.x().map(|c| c.to_vec()).unwrap_or_default(),
                    point.y().map(|c| c.to_vec()).unwrap_or_default(),
                    EcCurve::P521.field_len(),
                )
            }
        };
        (
            left_pad(&x, len).expect("encoded point fits the field"),
            left_pad(&y, len).expect("encoded point fits the field"),
        )
    }
}

/// An EC private key, usable for ECDH.
#[derive(Clone)]
pub enum EcPrivateKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl EcPrivateKey {
    pub fn curve(&self) -> EcCurve {
        match self {
            Self::P256(_) => EcCurve::P256,
            Self::P384(_) => EcCurve::P384,
            Self::P521(_) => EcCurve::P521,
        }
    }

    /// Generate a fresh key, e.g. an ECDH-ES ephemeral.
    pub fn random(curve: EcCurve) -> Self {
        match curve {
            EcCurve::P256 => Self::P256(p256::SecretKey::random(&mut OsRng)),
            EcCurve::P384 => Self::P384(p384::SecretKey::random(&mut OsRng)),
            EcCurve::P521 => Self::P521(p521::SecretKey::random(&mut OsRng)),
        }
    }

    /// Import from a raw JWK `d` scalar.
    pub fn from_scalar(curve: EcCurve, d: &[u8]) -> Result<Self, CryptoError> {
        let d = Zeroizing::new(left_pad(d, curve.field_len())?);
        let bad = |e: elliptic_curve::Error| CryptoError::InvalidEcKey(e.to_string());
        match curve {
            EcCurve::P256 => p256::SecretKey::from_slice(&d).map(Self::P256).map_err(bad),
            EcCurve::P384 => p384::SecretKey::from_slice(&d).map(Self::P384).map_err(bad),
            EcCurve::P521 => p521::SecretKey::from_slice(&d).map(Self::P521).map_err(bad),
        }
    }

    /// Raw scalar bytes, padded to the field width.
    pub fn scalar_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Self::P256(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
            Self::P384(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
            Self::P521(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
        }
    }

    pub fn public_key(&self) -> EcPublicKey {
        match self {
            Self::P256(sk) => EcPublicKey::P256(sk.public_key()),
            Self::P384(sk) => EcPublicKey::P384(sk.public_key()),
            Self::P521(sk) => EcPublicKey::P521(sk.public_key()),
        }
    }

    /// ECDH shared secret with a peer public key on the same curve.
    pub fn diffie_hellman(&self, peer: &EcPublicKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        match (self, peer) {
            (Self::P256(sk), EcPublicKey::P256(pk)) => Ok(Zeroizing::new(
                p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                    .raw_secret_bytes()
                    .to_vec(),
            )),
            (Self::P384(sk), EcPublicKey::P384(pk)) => Ok(Zeroizing::new(
                p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                    .raw_secret_bytes()
                    .to_vec(),
            )),
            (Self::P521(sk), EcPublicKey::P521(pk)) => Ok(Zeroizing::new(
                p521::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                    .raw_secret_bytes()
                    .to_vec(),
            )),
            _ => Err(CryptoError::InvalidEcKey(format!(
                "curve mismatch: {} vs {}",
                self.curve().name(),
                peer.curve().name()
            ))),
        }
    }
}

enum SignerInner {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    P521(p521::ecdsa::SigningKey),
}

/// An ECDSA signing context, built once per key.
pub struct EcSigner {
    curve: EcCurve,
    inner: SignerInner,
}

impl EcSigner {
    pub fn from_scalar(curve: EcCurve, d: &[u8]) -> Result<Self, CryptoError> {
        let d = Zeroizing::new(left_pad(d, curve.field_len())?);
        let bad = |e: ecdsa::Error| CryptoError::InvalidEcKey(e.to_string());
        let inner = match curve {
            EcCurve::P256 => {
                SignerInner::P256(p256::ecdsa::SigningKey::from_slice(&d).map_err(bad)?)
            }
            EcCurve::P384 => {
                SignerInner::P384(p384::ecdsa::SigningKey::from_slice(&d).map_err(bad)?)
            }
            EcCurve::P521 => {
                SignerInner::P521(p521::ecdsa::SigningKey::from_slice(&d).map_err(bad)?)
            }
        };
        Ok(Self { curve, inner })
    }

    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    /// Sign, producing the fixed-size `r ∥ s` encoding.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let bad = |e: ecdsa::Error| CryptoError::SigningFailed(e.to_string());
        match &self.inner {
            SignerInner::P256(key) => {
                let sig: p256::ecdsa::Signature = key.try_sign(message).map_err(bad)?;
                Ok(sig.to_bytes().to_vec())
            }
            SignerInner::P384(key) => {
                let sig: p384::ecdsa::Signature = key.try_sign(message).map_err(bad)?;
                Ok(sig.to_bytes().to_vec())
            }
            SignerInner::P521(key) => {
                let sig: p521::ecdsa::Signature = key.try_sign(message).map_err(bad)?;
                Ok(sig.to_bytes().to_vec())
            }
        }
    }

    /// Public coordinates of the signing key, for JWK export.
    pub fn public_coordinates(&self) -> (Vec<u8>, Vec<u8>) {
        let public = match &self.inner {
            SignerInner::P256(key) => EcPublicKey::P256((*key.verifying_key()).into()),
            SignerInner::P384(key) => EcPublicKey::P384((*key.verifying_key()).into()),
            SignerInner::P521(key) => {
                let verifying_key = p521::ecdsa::VerifyingKey::from(key);
                let public_key = p521::PublicKey::from_affine(*verifying_key.as_affine())
                    .expect("verifying key is never the identity point");
                EcPublicKey::P521(public_key)
            }
        };
        public.coordinates()
    }
}

enum VerifierInner {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    P521(p521::ecdsa::VerifyingKey),
}

/// An ECDSA verification context, built once per key.
pub struct EcVerifier {
    curve: EcCurve,
    inner: VerifierInner,
}

impl EcVerifier {
    pub fn from_coordinates(curve: EcCurve, x: &[u8], y: &[u8]) -> Result<Self, CryptoError> {
        let sec1 = sec1_uncompressed(curve, x, y)?;
        let bad = |e: ecdsa::Error| CryptoError::InvalidEcKey(e.to_string());
        let inner = match curve {
            EcCurve::P256 => {
                VerifierInner::P256(p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).map_err(bad)?)
            }
            EcCurve::P384 => {
                VerifierInner::P384(p384::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).map_err(bad)?)
            }
            EcCurve::P521 => {
                VerifierInner::P521(p521::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).map_err(bad)?)
            }
        };
        Ok(Self { curve, inner })
    }

    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    /// Verify a fixed-size `r ∥ s` signature. Malformed signature bytes
    /// return false, never an error.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match &self.inner {
            VerifierInner::P256(key) => p256::ecdsa::Signature::from_slice(signature)
                .map(|sig| key.verify(message, &sig).is_ok())
                .unwrap_or(false),
            VerifierInner::P384(key) => p384::ecdsa::Signature::from_slice(signature)
                .map(|sig| key.verify(message, &sig).is_ok())
                .unwrap_or(false),
            VerifierInner::P521(key) => p521::ecdsa::Signature::from_slice(signature)
                .map(|sig| key.verify(message, &sig).is_ok())
                .unwrap_or(false),
        }
    }
}
