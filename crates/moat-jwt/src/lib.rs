//! Reading, validation, and writing of JSON Web Tokens in compact form
//! (RFC 7515/7516/7519), both signed and encrypted.
//!
//! The read path is policy-driven: build a [`ValidationPolicy`], then
//! feed tokens to a [`TokenReader`]. The write path serializes
//! [`JwsDescriptor`]/[`JweDescriptor`] values through a [`TokenWriter`].
//! Readers, writers, policies, and keys are all safe to share across
//! threads.
//!
//! ```
//! use moat_jwt::{
//!     Claims, Jwk, JwsDescriptor, SignatureAlgorithm, TokenReader, TokenWriter,
//!     ValidationPolicy,
//! };
//!
//! let key = Jwk::generate_symmetric(32).unwrap();
//! let writer = TokenWriter::new();
//! let token = writer
//!     .write_jws(&JwsDescriptor::new(
//!         SignatureAlgorithm::HS256,
//!         key.clone(),
//!         Claims::new().with_issuer("https://issuer.example"),
//!     ))
//!     .unwrap();
//!
//! let policy = ValidationPolicy::builder()
//!     .require_signature(key)
//!     .require_issuer("https://issuer.example")
//!     .build();
//! let read = TokenReader::new().read(token.as_bytes(), &policy).unwrap();
//! assert_eq!(
//!     read.claims().unwrap().iss.as_deref(),
//!     Some("https://issuer.example")
//! );
//! ```

mod cache;
mod encrypt;
mod error;
mod keys;
mod policy;
mod reader;
mod sign;
mod tokenizer;
mod wrap;
mod writer;
mod zip;

pub use encrypt::ContentEncrypter;
pub use error::{SignatureCause, TokenError};
pub use keys::KeyProvider;
pub use policy::{PolicyBuilder, ValidationPolicy, DEFAULT_MAX_TOKEN_SIZE};
pub use reader::{Token, TokenContent, TokenReader};
pub use sign::{Signer, Verifier};
pub use tokenizer::{tokenize, Segment, Segments, MAX_SEGMENTS, MIN_SEGMENTS};
pub use wrap::{unwrap_cek, wrap_cek, WrappedKey};
pub use writer::{JweDescriptor, JwePayload, JwsDescriptor, TokenWriter};

// The data model, re-exported so most callers need only this crate.
pub use moat_jose::{
    Audience, Claims, CompressionAlgorithm, EncryptionAlgorithm, Header, IndexedJwkSet,
    JoseError, Jwk, JwkParams, JwkSet, KeyKind, KeyManagementAlgorithm, KeyUse, SharedJwkSet,
    SignatureAlgorithm,
};
