use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("base64url decode failed: {0}")]
    Base64(String),

    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("invalid nonce length: expected {expected} bytes, got {got}")]
    InvalidNonceLength { expected: usize, got: usize },

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    // Deliberately detail-free: tag mismatch, padding error and wrong key
    // must be indistinguishable to the caller.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("AES-KW wrap failed: {0}")]
    WrapFailed(String),

    #[error("AES-KW unwrap failed")]
    UnwrapFailed,

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("invalid RSA key: {0}")]
    InvalidRsaKey(String),

    #[error("invalid EC key: {0}")]
    InvalidEcKey(String),

    #[error("unsupported elliptic curve: {0}")]
    UnsupportedCurve(String),

    #[error("random number generation failed: {0}")]
    RngFailed(String),
}
