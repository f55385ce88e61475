//! AES Key Wrap (RFC 3394).
//!
//! Wrapped output is always 8 bytes longer than the input. Unwrap checks
//! the recovered integrity IV (`A6A6A6A6A6A6A6A6`); a mismatch is an
//! authentication failure and the output buffer is zeroed before the
//! error is returned.

use aes_kw::{KekAes128, KekAes192, KekAes256};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Size delta between wrapped and unwrapped key material.
pub const WRAP_OVERHEAD: usize = 8;

enum Inner {
    A128(KekAes128),
    A192(KekAes192),
    A256(KekAes256),
}

/// An AES key-encryption key for RFC 3394 wrap/unwrap.
pub struct KeyWrap {
    inner: Inner,
}

impl KeyWrap {
    /// Build a KEK from 16, 24, or 32 bytes of key material.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let inner = match key.len() {
            16 => Inner::A128(KekAes128::from(
                <[u8; 16]>::try_from(key).expect("length checked"),
            )),
            24 => Inner::A192(KekAes192::from(
                <[u8; 24]>::try_from(key).expect("length checked"),
            )),
            32 => Inner::A256(KekAes256::from(
                <[u8; 32]>::try_from(key).expect("length checked"),
            )),
            got => {
                return Err(CryptoError::InvalidKeyLength { expected: 32, got });
            }
        };
        Ok(Self { inner })
    }

    /// Wrap `plaintext` (a multiple of 8 bytes, at least 16).
    pub fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut out = vec![0u8; plaintext.len() + WRAP_OVERHEAD];
        let result = match &self.inner {
            Inner::A128(kek) => kek.wrap(plaintext, &mut out),
            Inner::A192(kek) => kek.wrap(plaintext, &mut out),
            Inner::A256(kek) => kek.wrap(plaintext, &mut out),
        };
        result.map_err(|e| CryptoError::WrapFailed(format!("{e:?}")))?;
        Ok(out)
    }

    /// Unwrap `wrapped`, recovering `wrapped.len() - 8` bytes.
    pub fn unwrap(&self, wrapped: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if wrapped.len() < 2 * WRAP_OVERHEAD || wrapped.len() % 8 != 0 {
            return Err(CryptoError::UnwrapFailed);
        }
        let mut out = vec![0u8; wrapped.len() - WRAP_OVERHEAD];
        let result = match &self.inner {
            Inner::A128(kek) => kek.unwrap(wrapped, &mut out),
            Inner::A192(kek) => kek.unwrap(wrapped, &mut out),
            Inner::A256(kek) => kek.unwrap(wrapped, &mut out),
        };
        if result.is_err() {
            out.zeroize();
            return Err(CryptoError::UnwrapFailed);
        }
        Ok(out)
    }
}
