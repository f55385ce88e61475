//! HMAC-SHA-2 keyed MACs (RFC 2104).
//!
//! `HmacKey` runs the key schedule once at construction: keys longer than
//! the block size are hashed, shorter keys are zero-padded, and the
//! ipad/opad states are absorbed. Each sign operation clones that state
//! instead of re-deriving it.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};

use crate::error::CryptoError;
use crate::hash::{ct_eq, HashAlgorithm};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

#[derive(Clone)]
enum Inner {
    Sha256(HmacSha256),
    Sha384(HmacSha384),
    Sha512(HmacSha512),
}

/// A reusable HMAC key with precomputed inner/outer block state.
#[derive(Clone)]
pub struct HmacKey {
    hash: HashAlgorithm,
    inner: Inner,
}

impl HmacKey {
    pub fn new(hash: HashAlgorithm, key: &[u8]) -> Result<Self, CryptoError> {
        let inner = match hash {
            HashAlgorithm::Sha256 => Inner::Sha256(
                HmacSha256::new_from_slice(key)
                    .map_err(|e| CryptoError::SigningFailed(e.to_string()))?,
            ),
            HashAlgorithm::Sha384 => Inner::Sha384(
                HmacSha384::new_from_slice(key)
                    .map_err(|e| CryptoError::SigningFailed(e.to_string()))?,
            ),
            HashAlgorithm::Sha512 => Inner::Sha512(
                HmacSha512::new_from_slice(key)
                    .map_err(|e| CryptoError::SigningFailed(e.to_string()))?,
            ),
        };
        Ok(Self { hash, inner })
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    /// Tag length in bytes (full hash output).
    pub fn output_len(&self) -> usize {
        self.hash.output_len()
    }

    /// MAC over the concatenation of `parts`.
    pub fn sign_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        match &self.inner {
            Inner::Sha256(state) => {
                let mut mac = state.clone();
                for part in parts {
                    mac.update(part);
                }
                mac.finalize().into_bytes().to_vec()
            }
            Inner::Sha384(state) => {
                let mut mac = state.clone();
                for part in parts {
                    mac.update(part);
                }
                mac.finalize().into_bytes().to_vec()
            }
            Inner::Sha512(state) => {
                let mut mac = state.clone();
                for part in parts {
                    mac.update(part);
                }
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// MAC over a single message.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.sign_parts(&[message])
    }

    /// Constant-time verification over the full tag length.
    pub fn verify(&self, message: &[u8], tag: &[u8]) -> bool {
        ct_eq(&self.sign(message), tag)
    }
}
