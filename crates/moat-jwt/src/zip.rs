//! Raw DEFLATE (RFC 1951) for the `zip: "DEF"` header.
//!
//! Inflation is capped so a small token cannot expand into an unbounded
//! allocation.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::TokenError;

/// Compress with raw deflate.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>, TokenError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| TokenError::Generation(e.to_string()))
}

/// Decompress raw deflate, refusing outputs larger than `max_len`.
pub fn inflate(data: &[u8], max_len: usize) -> Result<Vec<u8>, TokenError> {
    let mut out = Vec::new();
    let mut decoder = DeflateDecoder::new(data).take(max_len as u64 + 1);
    decoder
        .read_to_end(&mut out)
        .map_err(|_| TokenError::DecompressionFailed)?;
    if out.len() > max_len {
        return Err(TokenError::DecompressionFailed);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"compressible compressible compressible data";
        let packed = deflate(data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(inflate(&packed, 1024).unwrap(), data);
    }

    #[test]
    fn empty_round_trip() {
        let packed = deflate(b"").unwrap();
        assert_eq!(inflate(&packed, 16).unwrap(), b"");
    }

    #[test]
    fn rejects_garbage() {
        assert!(inflate(&[0xde, 0xad, 0xbe, 0xef], 1024).is_err());
    }

    #[test]
    fn enforces_inflation_cap() {
        let bomb = deflate(&vec![0u8; 1 << 16]).unwrap();
        assert!(inflate(&bomb, 1024).is_err());
        assert!(inflate(&bomb, 1 << 16).is_ok());
    }
}
