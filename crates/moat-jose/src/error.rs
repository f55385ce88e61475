use moat_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JoseError {
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("unsupported elliptic curve: {0}")]
    UnsupportedCurve(String),

    #[error("JWK missing {0}")]
    MissingField(&'static str),

    #[error("invalid JWK: {0}")]
    InvalidJwk(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
