//! Algorithm-dispatched signing and verification engines.
//!
//! An engine is built once per (algorithm, key) and holds the expensive
//! state: the HMAC keyed blocks, the parsed RSA key, or the ECDSA scalar.
//! All operations take `&self`, so one engine serves any number of
//! threads.

use moat_crypto::{EcSigner, EcVerifier, HmacKey, RsaSigner, RsaVerifier};
use moat_jose::{JoseError, Jwk, KeyKind, SignatureAlgorithm};

enum SignerInner {
    None,
    Hmac(HmacKey),
    Rsa(RsaSigner),
    Ec(EcSigner),
}

pub struct Signer {
    alg: SignatureAlgorithm,
    inner: SignerInner,
}

impl Signer {
    /// Build a signing engine for `alg` with `key`.
    pub fn for_key(alg: SignatureAlgorithm, key: &Jwk) -> Result<Self, JoseError> {
        let inner = match alg.key_kind() {
            KeyKind::None => SignerInner::None,
            KeyKind::Symmetric => {
                let secret = key.symmetric_key()?;
                if secret.len() * 8 < alg.min_key_bits() {
                    return Err(JoseError::InvalidJwk(format!(
                        "{} requires at least {} key bits",
                        alg.name(),
                        alg.min_key_bits()
                    )));
                }
                let hash = alg.hash().expect("HMAC algorithms carry a hash");
                SignerInner::Hmac(HmacKey::new(hash, &secret)?)
            }
            KeyKind::Rsa => {
                let padding = alg.rsa_padding().expect("RSA algorithms carry a padding");
                let hash = alg.hash().expect("RSA algorithms carry a hash");
                SignerInner::Rsa(RsaSigner::new(key.rsa_private_key()?, padding, hash))
            }
            KeyKind::EllipticCurve => {
                let curve = alg.curve().expect("ECDSA algorithms carry a curve");
                if key.ec_curve()? != curve {
                    return Err(JoseError::InvalidJwk(format!(
                        "{} requires curve {}",
                        alg.name(),
                        curve.name()
                    )));
                }
                let scalar = key.ec_private_scalar()?;
                SignerInner::Ec(EcSigner::from_scalar(curve, &scalar)?)
            }
        };
        Ok(Self { alg, inner })
    }

    /// The unsecured `alg: none` signer.
    pub fn none() -> Self {
        Self {
            alg: SignatureAlgorithm::None,
            inner: SignerInner::None,
        }
    }

    pub fn alg(&self) -> SignatureAlgorithm {
        self.alg
    }

    /// Sign the ASCII signing input. `none` yields an empty signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, JoseError> {
        match &self.inner {
            SignerInner::None => Ok(Vec::new()),
            SignerInner::Hmac(key) => Ok(key.sign(message)),
            SignerInner::Rsa(key) => Ok(key.sign(message)?),
            SignerInner::Ec(key) => Ok(key.sign(message)?),
        }
    }
}

enum VerifierInner {
    None,
    Hmac(HmacKey),
    Rsa(RsaVerifier),
    Ec(EcVerifier),
}

pub struct Verifier {
    inner: VerifierInner,
}

impl Verifier {
    /// Build a verification engine for `alg` with `key`. Asymmetric keys
    /// need only their public half.
    pub fn for_key(alg: SignatureAlgorithm, key: &Jwk) -> Result<Self, JoseError> {
        let inner = match alg.key_kind() {
            KeyKind::None => VerifierInner::None,
            KeyKind::Symmetric => {
                let secret = key.symmetric_key()?;
                let hash = alg.hash().expect("HMAC algorithms carry a hash");
                VerifierInner::Hmac(HmacKey::new(hash, &secret)?)
            }
            KeyKind::Rsa => {
                let padding = alg.rsa_padding().expect("RSA algorithms carry a padding");
                let hash = alg.hash().expect("RSA algorithms carry a hash");
                VerifierInner::Rsa(RsaVerifier::new(key.rsa_public_key()?, padding, hash))
            }
            KeyKind::EllipticCurve => {
                let curve = alg.curve().expect("ECDSA algorithms carry a curve");
                if key.ec_curve()? != curve {
                    return Err(JoseError::InvalidJwk(format!(
                        "{} requires curve {}",
                        alg.name(),
                        curve.name()
                    )));
                }
                let public = key.ec_public_key()?;
                let (x, y) = public.coordinates();
                VerifierInner::Ec(EcVerifier::from_coordinates(curve, &x, &y)?)
            }
        };
        Ok(Self { inner })
    }

    /// Constant-time for HMAC; false on any malformed signature.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match &self.inner {
            VerifierInner::None => signature.is_empty(),
            VerifierInner::Hmac(key) => key.verify(message, signature),
            VerifierInner::Rsa(key) => key.verify(message, signature),
            VerifierInner::Ec(key) => key.verify(message, signature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moat_crypto::{base64url_encode, EcCurve};
    use moat_jose::JwkParams;

    fn hmac_jwk(len: usize) -> Jwk {
        Jwk::new(JwkParams::Symmetric {
            k: base64url_encode(&vec![9u8; len]),
        })
    }

    #[test]
    fn hmac_sign_verify() {
        for alg in [
            SignatureAlgorithm::HS256,
            SignatureAlgorithm::HS384,
            SignatureAlgorithm::HS512,
        ] {
            let key = hmac_jwk(64);
            let signer = Signer::for_key(alg, &key).unwrap();
            let verifier = Verifier::for_key(alg, &key).unwrap();
            let sig = signer.sign(b"input").unwrap();
            assert_eq!(sig.len(), alg.hash().unwrap().output_len());
            assert!(verifier.verify(b"input", &sig));
            assert!(!verifier.verify(b"other", &sig));
        }
    }

    #[test]
    fn hmac_rejects_short_key() {
        let key = hmac_jwk(8);
        assert!(Signer::for_key(SignatureAlgorithm::HS256, &key).is_err());
    }

    #[test]
    fn ecdsa_sign_verify() {
        for (alg, curve) in [
            (SignatureAlgorithm::ES256, EcCurve::P256),
            (SignatureAlgorithm::ES384, EcCurve::P384),
            (SignatureAlgorithm::ES512, EcCurve::P521),
        ] {
            let key = Jwk::generate_ec(curve);
            let signer = Signer::for_key(alg, &key).unwrap();
            let verifier = Verifier::for_key(alg, &key.public_jwk()).unwrap();
            let sig = signer.sign(b"input").unwrap();
            assert_eq!(sig.len(), curve.signature_len());
            assert!(verifier.verify(b"input", &sig));
        }
    }

    #[test]
    fn ecdsa_rejects_wrong_curve() {
        let key = Jwk::generate_ec(EcCurve::P256);
        assert!(Signer::for_key(SignatureAlgorithm::ES384, &key).is_err());
        assert!(Verifier::for_key(SignatureAlgorithm::ES512, &key).is_err());
    }

    #[test]
    fn none_signer_emits_empty_signature() {
        let signer = Signer::none();
        assert!(signer.sign(b"anything").unwrap().is_empty());
    }

    #[test]
    fn kind_mismatch_is_an_error() {
        let key = hmac_jwk(32);
        assert!(Signer::for_key(SignatureAlgorithm::RS256, &key).is_err());
        assert!(Verifier::for_key(SignatureAlgorithm::ES256, &key).is_err());
    }
}
