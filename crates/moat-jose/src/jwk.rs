//! JSON Web Keys (RFC 7517) and the RFC 7638 thumbprint.
//!
//! A `Jwk` is the common members plus `kty`-tagged parameters. Binary
//! fields are base64url without padding. Ingress goes through
//! [`Jwk::from_json`], which enforces the per-`kty` invariants before a
//! key is usable.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use moat_crypto::{
    base64url_decode, base64url_encode, private_key_from_components, public_key_from_components,
    EcCurve, EcPrivateKey, EcPublicKey, HashAlgorithm, RsaPrivateKey, RsaPublicKey,
};

use crate::alg::{EncryptionAlgorithm, KeyKind, KeyManagementAlgorithm, SignatureAlgorithm};
use crate::error::JoseError;

/// Intended use of a public key (`use` member).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyUse {
    #[serde(rename = "sig")]
    Signature,
    #[serde(rename = "enc")]
    Encryption,
}

/// Per-`kty` key parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum JwkParams {
    #[serde(rename = "oct")]
    Symmetric { k: String },
    #[serde(rename = "RSA")]
    Rsa {
        n: String,
        e: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        p: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        q: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dp: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dq: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        qi: Option<String>,
    },
    #[serde(rename = "EC")]
    EllipticCurve {
        crv: String,
        x: String,
        y: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<String>,
    },
}

/// A JSON Web Key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(flatten)]
    pub params: JwkParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<KeyUse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
    #[serde(rename = "x5t#S256", default, skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,
}

impl Jwk {
    pub fn new(params: JwkParams) -> Self {
        Self {
            params,
            kid: None,
            key_use: None,
            alg: None,
            key_ops: None,
            x5c: None,
            x5t: None,
            x5t_s256: None,
        }
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn with_use(mut self, key_use: KeyUse) -> Self {
        self.key_use = Some(key_use);
        self
    }

    pub fn with_alg(mut self, alg: impl Into<String>) -> Self {
        self.alg = Some(alg.into());
        self
    }

    /// Parse and validate a JWK from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, JoseError> {
        let jwk: Self = serde_json::from_str(json).map_err(|e| JoseError::Json(e.to_string()))?;
        jwk.validate()?;
        Ok(jwk)
    }

    pub fn to_json(&self) -> Result<String, JoseError> {
        serde_json::to_string(self).map_err(|e| JoseError::Json(e.to_string()))
    }

    /// Enforce the per-`kty` invariants.
    pub fn validate(&self) -> Result<(), JoseError> {
        match &self.params {
            JwkParams::Symmetric { k } => {
                if k.is_empty() {
                    return Err(JoseError::MissingField("k"));
                }
                base64url_decode(k).map_err(|e| JoseError::InvalidJwk(format!("k: {e}")))?;
            }
            JwkParams::Rsa { n, e, .. } => {
                if n.is_empty() {
                    return Err(JoseError::MissingField("n"));
                }
                if e.is_empty() {
                    return Err(JoseError::MissingField("e"));
                }
                base64url_decode(n).map_err(|e| JoseError::InvalidJwk(format!("n: {e}")))?;
                base64url_decode(e).map_err(|e| JoseError::InvalidJwk(format!("e: {e}")))?;
            }
            JwkParams::EllipticCurve { crv, x, y, .. } => {
                if EcCurve::from_name(crv).is_none() {
                    return Err(JoseError::UnsupportedCurve(crv.clone()));
                }
                if x.is_empty() {
                    return Err(JoseError::MissingField("x"));
                }
                if y.is_empty() {
                    return Err(JoseError::MissingField("y"));
                }
                base64url_decode(x).map_err(|e| JoseError::InvalidJwk(format!("x: {e}")))?;
                base64url_decode(y).map_err(|e| JoseError::InvalidJwk(format!("y: {e}")))?;
            }
        }
        // The alg hint, when present, must belong to this key's family.
        if let Some(alg) = &self.alg {
            let kind = self.key_kind();
            let compatible = SignatureAlgorithm::from_name(alg)
                .map(|a| a.key_kind() == kind)
                .or_else(|| KeyManagementAlgorithm::from_name(alg).map(|a| a.key_kind() == kind))
                .or_else(|| {
                    EncryptionAlgorithm::from_name(alg).map(|_| kind == KeyKind::Symmetric)
                });
            match compatible {
                Some(true) => {}
                Some(false) => {
                    return Err(JoseError::InvalidJwk(format!(
                        "alg {alg} does not apply to kty {}",
                        self.kty()
                    )));
                }
                None => return Err(JoseError::UnknownAlgorithm(alg.clone())),
            }
        }
        Ok(())
    }

    pub const fn kty(&self) -> &'static str {
        match self.params {
            JwkParams::Symmetric { .. } => "oct",
            JwkParams::Rsa { .. } => "RSA",
            JwkParams::EllipticCurve { .. } => "EC",
        }
    }

    pub const fn key_kind(&self) -> KeyKind {
        match self.params {
            JwkParams::Symmetric { .. } => KeyKind::Symmetric,
            JwkParams::Rsa { .. } => KeyKind::Rsa,
            JwkParams::EllipticCurve { .. } => KeyKind::EllipticCurve,
        }
    }

    pub fn is_private(&self) -> bool {
        match &self.params {
            JwkParams::Symmetric { .. } => true,
            JwkParams::Rsa { d, .. } => d.is_some(),
            JwkParams::EllipticCurve { d, .. } => d.is_some(),
        }
    }

    /// The public half of this key. Symmetric keys have none and are
    /// returned as-is.
    pub fn public_jwk(&self) -> Self {
        let mut public = self.clone();
        match &mut public.params {
            JwkParams::Symmetric { .. } => {}
            JwkParams::Rsa {
                d, p, q, dp, dq, qi, ..
            } => {
                *d = None;
                *p = None;
                *q = None;
                *dp = None;
                *dq = None;
                *qi = None;
            }
            JwkParams::EllipticCurve { d, .. } => *d = None,
        }
        public
    }

    // --- key material accessors -------------------------------------

    pub fn symmetric_key(&self) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        match &self.params {
            JwkParams::Symmetric { k } => Ok(Zeroizing::new(base64url_decode(k)?)),
            _ => Err(JoseError::InvalidJwk(format!(
                "expected kty oct, got {}",
                self.kty()
            ))),
        }
    }

    pub fn ec_curve(&self) -> Result<EcCurve, JoseError> {
        match &self.params {
            JwkParams::EllipticCurve { crv, .. } => {
                EcCurve::from_name(crv).ok_or_else(|| JoseError::UnsupportedCurve(crv.clone()))
            }
            _ => Err(JoseError::InvalidJwk(format!(
                "expected kty EC, got {}",
                self.kty()
            ))),
        }
    }

    pub fn ec_public_key(&self) -> Result<EcPublicKey, JoseError> {
        match &self.params {
            JwkParams::EllipticCurve { crv, x, y, .. } => {
                let curve =
                    EcCurve::from_name(crv).ok_or_else(|| JoseError::UnsupportedCurve(crv.clone()))?;
                let x = base64url_decode(x)?;
                let y = base64url_decode(y)?;
                Ok(EcPublicKey::from_coordinates(curve, &x, &y)?)
            }
            _ => Err(JoseError::InvalidJwk(format!(
                "expected kty EC, got {}",
                self.kty()
            ))),
        }
    }

    pub fn ec_private_scalar(&self) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        match &self.params {
            JwkParams::EllipticCurve { d: Some(d), .. } => Ok(Zeroizing::new(base64url_decode(d)?)),
            JwkParams::EllipticCurve { d: None, .. } => Err(JoseError::MissingField("d")),
            _ => Err(JoseError::InvalidJwk(format!(
                "expected kty EC, got {}",
                self.kty()
            ))),
        }
    }

    pub fn ec_private_key(&self) -> Result<EcPrivateKey, JoseError> {
        let curve = self.ec_curve()?;
        let d = self.ec_private_scalar()?;
        Ok(EcPrivateKey::from_scalar(curve, &d)?)
    }

    pub fn rsa_public_key(&self) -> Result<RsaPublicKey, JoseError> {
        match &self.params {
            JwkParams::Rsa { n, e, .. } => {
                let n = base64url_decode(n)?;
                let e = base64url_decode(e)?;
                Ok(public_key_from_components(&n, &e)?)
            }
            _ => Err(JoseError::InvalidJwk(format!(
                "expected kty RSA, got {}",
                self.kty()
            ))),
        }
    }

    pub fn rsa_private_key(&self) -> Result<RsaPrivateKey, JoseError> {
        match &self.params {
            JwkParams::Rsa {
                n, e, d, p, q, ..
            } => {
                let d = d.as_deref().ok_or(JoseError::MissingField("d"))?;
                let n = base64url_decode(n)?;
                let e = base64url_decode(e)?;
                let d = Zeroizing::new(base64url_decode(d)?);
                let p = p.as_deref().map(base64url_decode).transpose()?.map(Zeroizing::new);
                let q = q.as_deref().map(base64url_decode).transpose()?.map(Zeroizing::new);
                Ok(private_key_from_components(
                    &n,
                    &e,
                    &d,
                    p.as_deref().map(Vec::as_slice),
                    q.as_deref().map(Vec::as_slice),
                )?)
            }
            _ => Err(JoseError::InvalidJwk(format!(
                "expected kty RSA, got {}",
                self.kty()
            ))),
        }
    }

    // --- generation ---------------------------------------------------

    /// Fresh random symmetric key of `len` bytes.
    pub fn generate_symmetric(len: usize) -> Result<Self, JoseError> {
        let key = Zeroizing::new(moat_crypto::random_bytes(len)?);
        Ok(Self::new(JwkParams::Symmetric {
            k: base64url_encode(&key),
        }))
    }

    /// Fresh EC keypair on `curve`, including the private scalar.
    pub fn generate_ec(curve: EcCurve) -> Self {
        let key = EcPrivateKey::random(curve);
        Self::from_ec_private_key(&key)
    }

    pub fn from_ec_private_key(key: &EcPrivateKey) -> Self {
        let (x, y) = key.public_key().coordinates();
        Self::new(JwkParams::EllipticCurve {
            crv: key.curve().name().to_owned(),
            x: base64url_encode(&x),
            y: base64url_encode(&y),
            d: Some(base64url_encode(&key.scalar_bytes())),
        })
    }

    pub fn from_ec_public_key(key: &EcPublicKey) -> Self {
        let (x, y) = key.coordinates();
        Self::new(JwkParams::EllipticCurve {
            crv: key.curve().name().to_owned(),
            x: base64url_encode(&x),
            y: base64url_encode(&y),
            d: None,
        })
    }

    // --- gating -------------------------------------------------------

    fn key_ops_allow(&self, ops: &[&str]) -> bool {
        match &self.key_ops {
            None => true,
            Some(listed) => listed.iter().any(|op| ops.contains(&op.as_str())),
        }
    }

    fn alg_hint_allows(&self, name: &str) -> bool {
        self.alg.as_deref().map(|hint| hint == name).unwrap_or(true)
    }

    /// Whether this key can sign or verify under `alg`.
    pub fn supports_signature(&self, alg: SignatureAlgorithm) -> bool {
        if self.key_use == Some(KeyUse::Encryption)
            || !self.alg_hint_allows(alg.name())
            || !self.key_ops_allow(&["sign", "verify"])
        {
            return false;
        }
        match (alg.key_kind(), &self.params) {
            (KeyKind::Symmetric, JwkParams::Symmetric { k }) => base64url_decode(k)
                .map(|key| key.len() * 8 >= alg.min_key_bits())
                .unwrap_or(false),
            (KeyKind::Rsa, JwkParams::Rsa { n, .. }) => base64url_decode(n)
                .map(|n| n.len() * 8 >= alg.min_key_bits())
                .unwrap_or(false),
            (KeyKind::EllipticCurve, JwkParams::EllipticCurve { crv, .. }) => {
                alg.curve().map(|c| c.name() == crv).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Whether this key can wrap or unwrap a CEK under `alg` for `enc`.
    pub fn supports_key_management(
        &self,
        alg: KeyManagementAlgorithm,
        enc: EncryptionAlgorithm,
    ) -> bool {
        if self.key_use == Some(KeyUse::Signature)
            || !self.alg_hint_allows(alg.name())
            || !self.key_ops_allow(&["encrypt", "decrypt", "wrapKey", "unwrapKey", "deriveKey"])
        {
            return false;
        }
        match (alg.key_kind(), &self.params) {
            (KeyKind::Symmetric, JwkParams::Symmetric { k }) => {
                let Ok(key) = base64url_decode(k) else {
                    return false;
                };
                match alg {
                    KeyManagementAlgorithm::Dir => key.len() == enc.cek_len(),
                    _ => Some(key.len()) == alg.kek_len(),
                }
            }
            (KeyKind::Rsa, JwkParams::Rsa { .. }) => true,
            (KeyKind::EllipticCurve, JwkParams::EllipticCurve { crv, .. }) => {
                EcCurve::from_name(crv).is_some()
            }
            _ => false,
        }
    }

    // --- thumbprint ---------------------------------------------------

    /// RFC 7638 thumbprint: SHA-256 of the canonical JSON containing only
    /// the required members in lexicographic order, base64url-encoded.
    pub fn thumbprint(&self) -> String {
        let canonical = match &self.params {
            JwkParams::Symmetric { k } => format!(r#"{{"k":"{k}","kty":"oct"}}"#),
            JwkParams::Rsa { n, e, .. } => format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#),
            JwkParams::EllipticCurve { crv, x, y, .. } => {
                format!(r#"{{"crv":"{crv}","kty":"EC","x":"{x}","y":"{y}"}}"#)
            }
        };
        base64url_encode(&HashAlgorithm::Sha256.digest(canonical.as_bytes()))
    }
}
