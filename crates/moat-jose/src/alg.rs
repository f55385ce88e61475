//! The four closed JOSE algorithm registries (RFC 7518).
//!
//! Each algorithm is a plain enum variant carrying its attributes as
//! `const fn` accessors. Identifiers serialize to the exact RFC names;
//! unrecognized identifiers are rejected where the registries are
//! consulted, not silently mapped.

use moat_crypto::{EcCurve, HashAlgorithm, RsaEncryptionPadding, RsaSignaturePadding};
use serde::{Deserialize, Serialize};

/// The kind of key material an algorithm consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    /// `alg: none` takes no key at all.
    None,
    Symmetric,
    Rsa,
    EllipticCurve,
}

/// JWS signature algorithms (RFC 7518 §3.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[serde(rename = "none")]
    None,
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
    ES512,
    PS256,
    PS384,
    PS512,
}

impl SignatureAlgorithm {
    pub const ALL: [Self; 13] = [
        Self::None,
        Self::HS256,
        Self::HS384,
        Self::HS512,
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::ES256,
        Self::ES384,
        Self::ES512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.name() == name)
    }

    pub const fn key_kind(self) -> KeyKind {
        match self {
            Self::None => KeyKind::None,
            Self::HS256 | Self::HS384 | Self::HS512 => KeyKind::Symmetric,
            Self::RS256 | Self::RS384 | Self::RS512 | Self::PS256 | Self::PS384 | Self::PS512 => {
                KeyKind::Rsa
            }
            Self::ES256 | Self::ES384 | Self::ES512 => KeyKind::EllipticCurve,
        }
    }

    /// Minimum key size in bits: a 128-bit floor for HMAC scaled with
    /// the hash, RSA at least 2048, EC the curve order.
    pub const fn min_key_bits(self) -> usize {
        match self {
            Self::None => 0,
            Self::HS256 => 128,
            Self::HS384 => 192,
            Self::HS512 => 256,
            Self::RS256 | Self::RS384 | Self::RS512 | Self::PS256 | Self::PS384 | Self::PS512 => {
                2048
            }
            Self::ES256 => 256,
            Self::ES384 => 384,
            Self::ES512 => 521,
        }
    }

    pub const fn hash(self) -> Option<HashAlgorithm> {
        match self {
            Self::None => None,
            Self::HS256 | Self::RS256 | Self::ES256 | Self::PS256 => Some(HashAlgorithm::Sha256),
            Self::HS384 | Self::RS384 | Self::ES384 | Self::PS384 => Some(HashAlgorithm::Sha384),
            Self::HS512 | Self::RS512 | Self::ES512 | Self::PS512 => Some(HashAlgorithm::Sha512),
        }
    }

    pub const fn curve(self) -> Option<EcCurve> {
        match self {
            Self::ES256 => Some(EcCurve::P256),
            Self::ES384 => Some(EcCurve::P384),
            Self::ES512 => Some(EcCurve::P521),
            _ => None,
        }
    }

    pub const fn rsa_padding(self) -> Option<RsaSignaturePadding> {
        match self {
            Self::RS256 | Self::RS384 | Self::RS512 => Some(RsaSignaturePadding::Pkcs1),
            Self::PS256 | Self::PS384 | Self::PS512 => Some(RsaSignaturePadding::Pss),
            _ => None,
        }
    }
}

/// JWE key management algorithms (RFC 7518 §4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyManagementAlgorithm {
    #[serde(rename = "dir")]
    Dir,
    #[serde(rename = "A128KW")]
    A128Kw,
    #[serde(rename = "A192KW")]
    A192Kw,
    #[serde(rename = "A256KW")]
    A256Kw,
    #[serde(rename = "A128GCMKW")]
    A128GcmKw,
    #[serde(rename = "A192GCMKW")]
    A192GcmKw,
    #[serde(rename = "A256GCMKW")]
    A256GcmKw,
    #[serde(rename = "RSA1_5")]
    Rsa1_5,
    #[serde(rename = "RSA-OAEP")]
    RsaOaep,
    #[serde(rename = "RSA-OAEP-256")]
    RsaOaep256,
    #[serde(rename = "RSA-OAEP-384")]
    RsaOaep384,
    #[serde(rename = "RSA-OAEP-512")]
    RsaOaep512,
    #[serde(rename = "ECDH-ES")]
    EcdhEs,
    #[serde(rename = "ECDH-ES+A128KW")]
    EcdhEsA128Kw,
    #[serde(rename = "ECDH-ES+A192KW")]
    EcdhEsA192Kw,
    #[serde(rename = "ECDH-ES+A256KW")]
    EcdhEsA256Kw,
}

impl KeyManagementAlgorithm {
    pub const ALL: [Self; 16] = [
        Self::Dir,
        Self::A128Kw,
        Self::A192Kw,
        Self::A256Kw,
        Self::A128GcmKw,
        Self::A192GcmKw,
        Self::A256GcmKw,
        Self::Rsa1_5,
        Self::RsaOaep,
        Self::RsaOaep256,
        Self::RsaOaep384,
        Self::RsaOaep512,
        Self::EcdhEs,
        Self::EcdhEsA128Kw,
        Self::EcdhEsA192Kw,
        Self::EcdhEsA256Kw,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Dir => "dir",
            Self::A128Kw => "A128KW",
            Self::A192Kw => "A192KW",
            Self::A256Kw => "A256KW",
            Self::A128GcmKw => "A128GCMKW",
            Self::A192GcmKw => "A192GCMKW",
            Self::A256GcmKw => "A256GCMKW",
            Self::Rsa1_5 => "RSA1_5",
            Self::RsaOaep => "RSA-OAEP",
            Self::RsaOaep256 => "RSA-OAEP-256",
            Self::RsaOaep384 => "RSA-OAEP-384",
            Self::RsaOaep512 => "RSA-OAEP-512",
            Self::EcdhEs => "ECDH-ES",
            Self::EcdhEsA128Kw => "ECDH-ES+A128KW",
            Self::EcdhEsA192Kw => "ECDH-ES+A192KW",
            Self::EcdhEsA256Kw => "ECDH-ES+A256KW",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.name() == name)
    }

    pub const fn key_kind(self) -> KeyKind {
        match self {
            Self::Dir
            | Self::A128Kw
            | Self::A192Kw
            | Self::A256Kw
            | Self::A128GcmKw
            | Self::A192GcmKw
            | Self::A256GcmKw => KeyKind::Symmetric,
            Self::Rsa1_5 | Self::RsaOaep | Self::RsaOaep256 | Self::RsaOaep384
            | Self::RsaOaep512 => KeyKind::Rsa,
            Self::EcdhEs | Self::EcdhEsA128Kw | Self::EcdhEsA192Kw | Self::EcdhEsA256Kw => {
                KeyKind::EllipticCurve
            }
        }
    }

    /// Whether the compact form carries a non-empty encrypted-key segment.
    pub const fn produces_wrapped_key(self) -> bool {
        !matches!(self, Self::Dir | Self::EcdhEs)
    }

    /// KEK length in bytes for the AES-KW and AES-GCM-KW families, and
    /// for the AES-KW half of the ECDH-ES+A*KW forms.
    pub const fn kek_len(self) -> Option<usize> {
        match self {
            Self::A128Kw | Self::A128GcmKw | Self::EcdhEsA128Kw => Some(16),
            Self::A192Kw | Self::A192GcmKw | Self::EcdhEsA192Kw => Some(24),
            Self::A256Kw | Self::A256GcmKw | Self::EcdhEsA256Kw => Some(32),
            _ => None,
        }
    }

    pub const fn rsa_padding(self) -> Option<RsaEncryptionPadding> {
        match self {
            Self::Rsa1_5 => Some(RsaEncryptionPadding::Pkcs1),
            Self::RsaOaep => Some(RsaEncryptionPadding::OaepSha1),
            Self::RsaOaep256 => Some(RsaEncryptionPadding::OaepSha256),
            Self::RsaOaep384 => Some(RsaEncryptionPadding::OaepSha384),
            Self::RsaOaep512 => Some(RsaEncryptionPadding::OaepSha512),
            _ => None,
        }
    }

    pub const fn is_ecdh(self) -> bool {
        matches!(
            self,
            Self::EcdhEs | Self::EcdhEsA128Kw | Self::EcdhEsA192Kw | Self::EcdhEsA256Kw
        )
    }

    pub const fn is_gcm_kw(self) -> bool {
        matches!(self, Self::A128GcmKw | Self::A192GcmKw | Self::A256GcmKw)
    }
}

/// JWE content encryption algorithms (RFC 7518 §5.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    #[serde(rename = "A128CBC-HS256")]
    A128CbcHs256,
    #[serde(rename = "A192CBC-HS384")]
    A192CbcHs384,
    #[serde(rename = "A256CBC-HS512")]
    A256CbcHs512,
    #[serde(rename = "A128GCM")]
    A128Gcm,
    #[serde(rename = "A192GCM")]
    A192Gcm,
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

impl EncryptionAlgorithm {
    pub const ALL: [Self; 6] = [
        Self::A128CbcHs256,
        Self::A192CbcHs384,
        Self::A256CbcHs512,
        Self::A128Gcm,
        Self::A192Gcm,
        Self::A256Gcm,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::A128CbcHs256 => "A128CBC-HS256",
            Self::A192CbcHs384 => "A192CBC-HS384",
            Self::A256CbcHs512 => "A256CBC-HS512",
            Self::A128Gcm => "A128GCM",
            Self::A192Gcm => "A192GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.name() == name)
    }

    /// Content-encryption key length in bytes. The CBC-HMAC composites
    /// take a double-length key, half MAC and half AES.
    pub const fn cek_len(self) -> usize {
        match self {
            Self::A128CbcHs256 => 32,
            Self::A192CbcHs384 => 48,
            Self::A256CbcHs512 => 64,
            Self::A128Gcm => 16,
            Self::A192Gcm => 24,
            Self::A256Gcm => 32,
        }
    }

    pub const fn iv_len(self) -> usize {
        match self {
            Self::A128CbcHs256 | Self::A192CbcHs384 | Self::A256CbcHs512 => 16,
            Self::A128Gcm | Self::A192Gcm | Self::A256Gcm => 12,
        }
    }

    pub const fn tag_len(self) -> usize {
        match self {
            Self::A128CbcHs256 => 16,
            Self::A192CbcHs384 => 24,
            Self::A256CbcHs512 => 32,
            Self::A128Gcm | Self::A192Gcm | Self::A256Gcm => 16,
        }
    }

    pub const fn is_gcm(self) -> bool {
        matches!(self, Self::A128Gcm | Self::A192Gcm | Self::A256Gcm)
    }

    /// The composite hash for the CBC-HMAC variants.
    pub const fn hash(self) -> Option<HashAlgorithm> {
        match self {
            Self::A128CbcHs256 => Some(HashAlgorithm::Sha256),
            Self::A192CbcHs384 => Some(HashAlgorithm::Sha384),
            Self::A256CbcHs512 => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }
}

/// JWE compression algorithms (RFC 7516 §4.1.3). Absence of a `zip`
/// header means no compression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Raw DEFLATE (RFC 1951).
    #[serde(rename = "DEF")]
    Deflate,
}

impl CompressionAlgorithm {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deflate => "DEF",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DEF" => Some(Self::Deflate),
            _ => None,
        }
    }
}
