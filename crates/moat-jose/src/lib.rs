//! JOSE data model for the Moat stack: the four closed algorithm
//! registries, JWK/JWKS keys (RFC 7517) with RFC 7638 thumbprints, the
//! JOSE header, and JWT claims (RFC 7519).
//!
//! This crate is pure data and gating logic; signing, encryption, and
//! token pipelines live in `moat-jwt`.

mod alg;
mod claims;
mod error;
mod header;
mod jwk;
mod jwks;

pub use alg::{
    CompressionAlgorithm, EncryptionAlgorithm, KeyKind, KeyManagementAlgorithm, SignatureAlgorithm,
};
pub use claims::{Audience, Claims};
pub use error::JoseError;
pub use header::Header;
pub use jwk::{Jwk, JwkParams, KeyUse};
pub use jwks::{IndexedJwkSet, JwkSet, SharedJwkSet};
