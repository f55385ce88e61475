use std::fmt;

use thiserror::Error;

/// Why a signature failed to validate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureCause {
    /// The token carries no signature but the policy requires one.
    Missing,
    /// The signature segment is not decodable.
    Malformed,
    /// No candidate key verified the signature.
    Mismatch,
}

impl fmt::Display for SignatureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::Malformed => f.write_str("malformed"),
            Self::Mismatch => f.write_str("mismatch"),
        }
    }
}

/// Every way a token read or write can fail. Reads return these as
/// values; nothing in the pipeline unwinds.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Structural, base64, or JSON error in the input.
    #[error("malformed token")]
    Malformed,

    /// Unsupported or conflicting header value.
    #[error("invalid header value: {0}")]
    InvalidHeader(&'static str),

    /// A five-segment token without `enc`.
    #[error("JWE header is missing enc")]
    MissingEncryptionAlgorithm,

    #[error("no signing key matched the token")]
    SigningKeyNotFound,

    #[error("no encryption key matched the token")]
    EncryptionKeyNotFound,

    #[error("signature validation failed: {0}")]
    SignatureInvalid(SignatureCause),

    /// Key unwrap or AEAD tag mismatch.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("decompression failed")]
    DecompressionFailed,

    /// Lifetime, issuer, audience, or required-claim check failed.
    #[error("policy violation on claim {0:?}")]
    PolicyViolation(String),

    /// Recognized algorithm that this build does not implement.
    #[error("algorithm {0} is not supported")]
    Unsupported(String),

    /// Write-path failure, carrying the underlying cause.
    #[error("token generation failed: {0}")]
    Generation(String),
}
