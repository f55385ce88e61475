//! Key resolution for the reader.
//!
//! A [`KeyProvider`] yields candidate keys for a header, synchronously
//! and in caller-defined order. The reader then narrows candidates by
//! `kid` and algorithm compatibility: keys matching the header `kid`
//! come first, keys with no `kid` follow, and keys carrying a different
//! `kid` are excluded.

use std::sync::Arc;

use moat_jose::{
    EncryptionAlgorithm, Header, Jwk, JwkSet, KeyManagementAlgorithm, SharedJwkSet,
    SignatureAlgorithm,
};

/// Source of keys for signature verification and JWE decryption.
///
/// Implementations that perform I/O (JWKS over HTTP) must resolve it
/// before returning; the pipeline never awaits.
pub trait KeyProvider: Send + Sync {
    fn signing_keys(&self, header: &Header) -> Vec<Jwk>;
    fn encryption_keys(&self, header: &Header) -> Vec<Jwk>;
}

impl KeyProvider for Jwk {
    fn signing_keys(&self, _header: &Header) -> Vec<Jwk> {
        vec![self.clone()]
    }

    fn encryption_keys(&self, _header: &Header) -> Vec<Jwk> {
        vec![self.clone()]
    }
}

impl KeyProvider for JwkSet {
    fn signing_keys(&self, header: &Header) -> Vec<Jwk> {
        ordered_by_kid(self.keys.clone(), header)
    }

    fn encryption_keys(&self, header: &Header) -> Vec<Jwk> {
        ordered_by_kid(self.keys.clone(), header)
    }
}

impl KeyProvider for SharedJwkSet {
    fn signing_keys(&self, header: &Header) -> Vec<Jwk> {
        let snapshot = self.load();
        if let Some(kid) = header.kid.as_deref() {
            if let Some(key) = snapshot.find(kid) {
                return vec![key.clone()];
            }
        }
        snapshot.keys().to_vec()
    }

    fn encryption_keys(&self, header: &Header) -> Vec<Jwk> {
        self.signing_keys(header)
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for Arc<P> {
    fn signing_keys(&self, header: &Header) -> Vec<Jwk> {
        (**self).signing_keys(header)
    }

    fn encryption_keys(&self, header: &Header) -> Vec<Jwk> {
        (**self).encryption_keys(header)
    }
}

fn ordered_by_kid(mut keys: Vec<Jwk>, header: &Header) -> Vec<Jwk> {
    if let Some(kid) = header.kid.as_deref() {
        // Stable: kid matches first, set order otherwise preserved.
        keys.sort_by_key(|key| key.kid.as_deref() != Some(kid));
    }
    keys
}

/// A key is admissible when its identifying header hints don't
/// contradict it: a differing `kid` or certificate thumbprint excludes
/// the key, absent hints admit it.
fn header_admits(header: &Header, key: &Jwk) -> bool {
    let matches = |wanted: &Option<String>, have: &Option<String>| match (wanted, have) {
        (Some(wanted), Some(have)) => wanted == have,
        _ => true,
    };
    matches(&header.kid, &key.kid)
        && matches(&header.x5t, &key.x5t)
        && matches(&header.x5t_s256, &key.x5t_s256)
}

/// Candidates for signature verification, in trial order.
pub(crate) fn signing_candidates(
    keys: Vec<Jwk>,
    header: &Header,
    alg: SignatureAlgorithm,
) -> Vec<Jwk> {
    let mut candidates: Vec<Jwk> = keys
        .into_iter()
        .filter(|key| header_admits(header, key) && key.supports_signature(alg))
        .collect();
    if header.kid.is_some() {
        candidates.sort_by_key(|key| key.kid.is_none());
    }
    candidates
}

/// Candidates for CEK resolution, in trial order.
pub(crate) fn encryption_candidates(
    keys: Vec<Jwk>,
    header: &Header,
    alg: KeyManagementAlgorithm,
    enc: EncryptionAlgorithm,
) -> Vec<Jwk> {
    let mut candidates: Vec<Jwk> = keys
        .into_iter()
        .filter(|key| header_admits(header, key) && key.supports_key_management(alg, enc))
        .collect();
    if header.kid.is_some() {
        candidates.sort_by_key(|key| key.kid.is_none());
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use moat_crypto::base64url_encode;
    use moat_jose::JwkParams;

    fn oct(kid: Option<&str>, len: usize) -> Jwk {
        let mut key = Jwk::new(JwkParams::Symmetric {
            k: base64url_encode(&vec![7u8; len]),
        });
        key.kid = kid.map(str::to_owned);
        key
    }

    fn header_with_kid(kid: &str) -> Header {
        Header::jws(SignatureAlgorithm::HS256).with_kid(kid)
    }

    #[test]
    fn kid_match_ordered_first() {
        let set = JwkSet::new(vec![oct(Some("a"), 32), oct(Some("b"), 32)]);
        let keys = set.signing_keys(&header_with_kid("b"));
        assert_eq!(keys[0].kid.as_deref(), Some("b"));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn candidates_exclude_mismatched_kid() {
        let keys = vec![oct(Some("a"), 32), oct(Some("b"), 32), oct(None, 32)];
        let candidates =
            signing_candidates(keys, &header_with_kid("a"), SignatureAlgorithm::HS256);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].kid.as_deref(), Some("a"));
        assert_eq!(candidates[1].kid, None);
    }

    #[test]
    fn candidates_filter_incompatible_keys() {
        let keys = vec![oct(None, 32), oct(None, 16)];
        let header = Header::jws(SignatureAlgorithm::HS256);
        // The 16-byte key is below the HS256 floor.
        let candidates = signing_candidates(keys, &header, SignatureAlgorithm::HS256);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn no_kid_tries_all_compatible() {
        let keys = vec![oct(Some("a"), 32), oct(Some("b"), 32)];
        let header = Header::jws(SignatureAlgorithm::HS256);
        let candidates = signing_candidates(keys, &header, SignatureAlgorithm::HS256);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn encryption_candidates_respect_dir_length() {
        let keys = vec![oct(None, 32), oct(None, 64)];
        let header = Header::jwe(
            KeyManagementAlgorithm::Dir,
            EncryptionAlgorithm::A256CbcHs512,
        );
        let candidates = encryption_candidates(
            keys,
            &header,
            KeyManagementAlgorithm::Dir,
            EncryptionAlgorithm::A256CbcHs512,
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].symmetric_key().unwrap().len(), 64);
    }

    #[test]
    fn shared_set_resolves_kid_directly() {
        let shared = SharedJwkSet::new(JwkSet::new(vec![oct(Some("a"), 32), oct(Some("b"), 32)]));
        let keys = shared.signing_keys(&header_with_kid("b"));
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].kid.as_deref(), Some("b"));
    }
}
