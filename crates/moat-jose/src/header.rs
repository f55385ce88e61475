//! The JOSE header (RFC 7515 §4, RFC 7516 §4).
//!
//! `alg`, `enc`, and `zip` stay as raw strings here: the token layer is
//! the place that resolves them against the closed registries, so that an
//! unrecognized value surfaces as an invalid-header error rather than a
//! parse failure. Members outside the registry are preserved verbatim in
//! `extra`. A header with `enc` present is a JWE (five segments); without
//! it, a JWS (three segments).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::alg::{
    CompressionAlgorithm, EncryptionAlgorithm, KeyManagementAlgorithm, SignatureAlgorithm,
};
use crate::error::JoseError;
use crate::jwk::Jwk;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwk: Option<Jwk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5u: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
    #[serde(rename = "x5t#S256", default, skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
    /// Ephemeral public key for the ECDH-ES family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<Jwk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2c: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2s: Option<String>,
    /// AES-GCM key wrap IV (RFC 7518 §4.7.1.1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    /// AES-GCM key wrap authentication tag (RFC 7518 §4.7.1.2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Members outside the registry, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// A JWS header for `alg`.
    pub fn jws(alg: SignatureAlgorithm) -> Self {
        Self {
            alg: Some(alg.name().to_owned()),
            ..Self::default()
        }
    }

    /// A JWE header for `alg` + `enc`.
    pub fn jwe(alg: KeyManagementAlgorithm, enc: EncryptionAlgorithm) -> Self {
        Self {
            alg: Some(alg.name().to_owned()),
            enc: Some(enc.name().to_owned()),
            ..Self::default()
        }
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn with_typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = Some(typ.into());
        self
    }

    /// `enc` present means the token is encrypted.
    pub fn is_jwe(&self) -> bool {
        self.enc.is_some()
    }

    /// Resolve `alg` against the signature registry.
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        self.alg.as_deref().and_then(SignatureAlgorithm::from_name)
    }

    /// Resolve `alg` against the key management registry.
    pub fn key_management_algorithm(&self) -> Option<KeyManagementAlgorithm> {
        self.alg
            .as_deref()
            .and_then(KeyManagementAlgorithm::from_name)
    }

    /// Resolve `enc` against the content encryption registry.
    pub fn encryption_algorithm(&self) -> Option<EncryptionAlgorithm> {
        self.enc.as_deref().and_then(EncryptionAlgorithm::from_name)
    }

    /// Resolve `zip`; `Ok(None)` when absent.
    pub fn compression_algorithm(&self) -> Result<Option<CompressionAlgorithm>, JoseError> {
        match self.zip.as_deref() {
            None => Ok(None),
            Some(name) => CompressionAlgorithm::from_name(name)
                .map(Some)
                .ok_or_else(|| JoseError::UnknownAlgorithm(name.to_owned())),
        }
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, JoseError> {
        serde_json::from_slice(bytes).map_err(|e| JoseError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, JoseError> {
        serde_json::to_string(self).map_err(|e| JoseError::Json(e.to_string()))
    }
}
