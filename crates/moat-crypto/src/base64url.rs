//! URL-safe base64 without padding (RFC 4648 §5), the JOSE wire encoding.

use base64ct::{Base64UrlUnpadded, Encoding};

use crate::error::CryptoError;

/// Base64url encode bytes without padding.
pub fn base64url_encode(data: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(data)
}

/// Base64url decode a string to bytes.
///
/// Fails on any byte outside the URL-safe alphabet and on non-zero
/// trailing bits.
pub fn base64url_decode(s: impl AsRef<[u8]>) -> Result<Vec<u8>, CryptoError> {
    let s = core::str::from_utf8(s.as_ref())
        .map_err(|e| CryptoError::Base64(e.to_string()))?;
    Base64UrlUnpadded::decode_vec(s).map_err(|e| CryptoError::Base64(e.to_string()))
}

/// Exact unpadded encoded length for `n` input bytes: ceil(4n/3).
pub const fn encoded_len(n: usize) -> usize {
    (n * 4).div_ceil(3)
}

/// Exact decoded length for `n` unpadded base64url characters: floor(3n/4).
pub const fn decoded_len(n: usize) -> usize {
    n * 3 / 4
}
