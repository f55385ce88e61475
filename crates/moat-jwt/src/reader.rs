//! The token read pipeline.
//!
//! `decode → validate header → verify or decrypt → parse payload →
//! validate claims`, per RFC 7515/7516 compact serialization. Every
//! structural failure maps to [`TokenError::Malformed`]; cryptographic
//! failures are atomic and detail-free. A bounded cache keyed by the
//! exact header segment bytes amortizes header parsing across tokens
//! minted by the same issuer.

use std::sync::Arc;

use tracing::debug;

use moat_crypto::base64url_decode;
use moat_jose::{
    Claims, CompressionAlgorithm, EncryptionAlgorithm, Header, Jwk, KeyManagementAlgorithm,
    SignatureAlgorithm,
};

use crate::cache::{LruCache, DEFAULT_CAPACITY};
use crate::encrypt::ContentEncrypter;
use crate::error::{SignatureCause, TokenError};
use crate::keys::{encryption_candidates, signing_candidates, KeyProvider};
use crate::policy::{KeySource, SignatureRequirement, ValidationPolicy};
use crate::sign::Verifier;
use crate::tokenizer::{tokenize, Segments};
use crate::wrap::unwrap_cek;
use crate::zip;

/// Decompressed payloads may legitimately exceed the raw token cap;
/// inflation is bounded by this multiple of `max_token_size`.
const INFLATION_FACTOR: usize = 8;

/// A validated token.
#[derive(Clone, Debug)]
pub struct Token {
    pub header: Header,
    pub content: TokenContent,
    /// The key that verified the signature or decrypted the payload.
    pub key: Option<Jwk>,
}

#[derive(Clone, Debug)]
pub enum TokenContent {
    /// Parsed JWS claims.
    Claims(Claims),
    /// A decrypted token, validated recursively.
    Nested(Box<Token>),
    /// Raw decrypted bytes, when nesting is ignored or the payload is
    /// not itself a token.
    Opaque(Vec<u8>),
}

impl Token {
    /// The innermost claims, walking through nesting.
    pub fn claims(&self) -> Option<&Claims> {
        match &self.content {
            TokenContent::Claims(claims) => Some(claims),
            TokenContent::Nested(inner) => inner.claims(),
            TokenContent::Opaque(_) => None,
        }
    }

    /// The raw payload when it was returned opaque.
    pub fn opaque_payload(&self) -> Option<&[u8]> {
        match &self.content {
            TokenContent::Opaque(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Reads and validates compact-form tokens. Safe to share across
/// threads; holds the header cache and a verifier cache keyed by key
/// thumbprint, so repeat tokens skip both header parsing and key setup
/// (HMAC block precompute, RSA key parsing).
pub struct TokenReader {
    header_cache: LruCache<Vec<u8>, Arc<Header>>,
    verifier_cache: LruCache<(String, SignatureAlgorithm), Arc<Verifier>>,
}

impl TokenReader {
    pub fn new() -> Self {
        Self {
            header_cache: LruCache::new(DEFAULT_CAPACITY),
            verifier_cache: LruCache::new(DEFAULT_CAPACITY),
        }
    }

    fn verifier_for(&self, alg: SignatureAlgorithm, key: &Jwk) -> Option<Arc<Verifier>> {
        let cache_key = (key.thumbprint(), alg);
        if let Some(verifier) = self.verifier_cache.get(&cache_key) {
            return Some(verifier);
        }
        let verifier = Arc::new(Verifier::for_key(alg, key).ok()?);
        self.verifier_cache.insert(cache_key, verifier.clone());
        Some(verifier)
    }

    /// Read a token under `policy`.
    pub fn read(&self, token: &[u8], policy: &ValidationPolicy) -> Result<Token, TokenError> {
        if token.is_empty() || token.len() > policy.max_token_size() {
            return Err(TokenError::Malformed);
        }
        let segments = tokenize(token)?;
        let header = self.parse_header(segments.get(0).slice(token))?;
        match segments.count() {
            3 => self.read_jws(token, &segments, header, policy),
            5 => self.read_jwe(token, &segments, header, policy),
            _ => Err(TokenError::Malformed),
        }
    }

    fn parse_header(&self, encoded: &[u8]) -> Result<Arc<Header>, TokenError> {
        if let Some(header) = self.header_cache.get(encoded) {
            return Ok(header);
        }
        let raw = base64url_decode(encoded).map_err(|_| TokenError::Malformed)?;
        let header =
            Arc::new(Header::from_json_bytes(&raw).map_err(|_| TokenError::Malformed)?);
        self.header_cache.insert(encoded.to_vec(), header.clone());
        Ok(header)
    }

    fn read_jws(
        &self,
        token: &[u8],
        segments: &Segments,
        header: Arc<Header>,
        policy: &ValidationPolicy,
    ) -> Result<Token, TokenError> {
        if header.is_jwe() {
            // Three segments cannot carry an encrypted payload.
            return Err(TokenError::InvalidHeader("enc"));
        }
        let alg = header
            .alg
            .as_deref()
            .and_then(SignatureAlgorithm::from_name)
            .ok_or(TokenError::InvalidHeader("alg"))?;
        policy.check_algorithm_allowed(alg)?;

        let signed = &token[..segments.get(1).end()];
        let signature = base64url_decode(segments.get(2).slice(token))
            .map_err(|_| TokenError::SignatureInvalid(SignatureCause::Malformed))?;
        if alg == SignatureAlgorithm::None && !signature.is_empty() {
            return Err(TokenError::Malformed);
        }

        let resolved_key = match &policy.signature {
            SignatureRequirement::None => None,
            requirement => {
                if alg == SignatureAlgorithm::None || signature.is_empty() {
                    return Err(TokenError::SignatureInvalid(SignatureCause::Missing));
                }
                let keys = match requirement {
                    SignatureRequirement::Key(key) => vec![key.clone()],
                    SignatureRequirement::Provider(provider) => provider.signing_keys(&header),
                    SignatureRequirement::None => unreachable!(),
                };
                let candidates = signing_candidates(keys, &header, alg);
                if candidates.is_empty() {
                    return Err(TokenError::SigningKeyNotFound);
                }
                debug!(
                    alg = alg.name(),
                    candidates = candidates.len(),
                    "verifying token signature"
                );
                let mut matched = None;
                for key in candidates {
                    let Some(verifier) = self.verifier_for(alg, &key) else {
                        continue;
                    };
                    if verifier.verify(signed, &signature) {
                        matched = Some(key);
                        break;
                    }
                }
                Some(matched.ok_or(TokenError::SignatureInvalid(SignatureCause::Mismatch))?)
            }
        };

        let payload =
            base64url_decode(segments.get(1).slice(token)).map_err(|_| TokenError::Malformed)?;
        let claims = Claims::from_json_bytes(&payload).map_err(|_| TokenError::Malformed)?;
        policy.validate_claims(&claims)?;

        Ok(Token {
            header: (*header).clone(),
            content: TokenContent::Claims(claims),
            key: resolved_key,
        })
    }

    fn read_jwe(
        &self,
        token: &[u8],
        segments: &Segments,
        header: Arc<Header>,
        policy: &ValidationPolicy,
    ) -> Result<Token, TokenError> {
        let enc = match header.enc.as_deref() {
            None => return Err(TokenError::MissingEncryptionAlgorithm),
            Some(name) => {
                EncryptionAlgorithm::from_name(name).ok_or(TokenError::InvalidHeader("enc"))?
            }
        };
        let alg = header
            .alg
            .as_deref()
            .and_then(KeyManagementAlgorithm::from_name)
            .ok_or(TokenError::InvalidHeader("alg"))?;
        let compression = header
            .compression_algorithm()
            .map_err(|_| TokenError::InvalidHeader("zip"))?;

        let encrypted_key =
            base64url_decode(segments.get(1).slice(token)).map_err(|_| TokenError::Malformed)?;
        let nonce =
            base64url_decode(segments.get(2).slice(token)).map_err(|_| TokenError::Malformed)?;
        let ciphertext =
            base64url_decode(segments.get(3).slice(token)).map_err(|_| TokenError::Malformed)?;
        let tag =
            base64url_decode(segments.get(4).slice(token)).map_err(|_| TokenError::Malformed)?;
        // AAD is the ASCII form of the encoded header segment.
        let aad = segments.get(0).slice(token);

        let keys = match &policy.decryption {
            KeySource::None => return Err(TokenError::EncryptionKeyNotFound),
            KeySource::Key(key) => vec![key.clone()],
            KeySource::Provider(provider) => provider.encryption_keys(&header),
        };
        let candidates = encryption_candidates(keys, &header, alg, enc);
        if candidates.is_empty() {
            return Err(TokenError::EncryptionKeyNotFound);
        }
        debug!(
            alg = alg.name(),
            enc = enc.name(),
            candidates = candidates.len(),
            "resolving content encryption key"
        );

        let mut decrypted = None;
        for key in candidates {
            let Ok(cek) = unwrap_cek(alg, enc, &key, &header, &encrypted_key) else {
                continue;
            };
            let Ok(encrypter) = ContentEncrypter::new(enc, &cek) else {
                continue;
            };
            if let Ok(plaintext) = encrypter.decrypt(&ciphertext, &nonce, aad, &tag) {
                decrypted = Some((plaintext, key));
                break;
            }
        }
        let (plaintext, key) = decrypted.ok_or(TokenError::DecryptionFailed)?;

        let plaintext = match compression {
            Some(CompressionAlgorithm::Deflate) => {
                zip::inflate(&plaintext, policy.max_token_size() * INFLATION_FACTOR)?
            }
            None => plaintext,
        };

        if policy.ignore_nested {
            return Ok(Token {
                header: (*header).clone(),
                content: TokenContent::Opaque(plaintext),
                key: Some(key),
            });
        }
        match self.read(&plaintext, policy) {
            Ok(inner) => Ok(Token {
                header: (*header).clone(),
                content: TokenContent::Nested(Box::new(inner)),
                key: Some(key),
            }),
            // Not a compact token. Without validators the caller asked
            // only for the decrypted content, so hand it back opaque.
            Err(TokenError::Malformed) if !policy.has_validation() => Ok(Token {
                header: (*header).clone(),
                content: TokenContent::Opaque(plaintext),
                key: Some(key),
            }),
            Err(err) => Err(err),
        }
    }
}

impl Default for TokenReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moat_crypto::{base64url_encode, HashAlgorithm, HmacKey};
    use moat_jose::JwkParams;

    fn hmac_jwk(secret: &[u8]) -> Jwk {
        Jwk::new(JwkParams::Symmetric {
            k: base64url_encode(secret),
        })
    }

    fn hs256_token(secret: &[u8], header_json: &str, payload_json: &str) -> String {
        let signing_input = format!(
            "{}.{}",
            base64url_encode(header_json.as_bytes()),
            base64url_encode(payload_json.as_bytes())
        );
        let mac = HmacKey::new(HashAlgorithm::Sha256, secret).unwrap();
        let signature = mac.sign(signing_input.as_bytes());
        format!("{signing_input}.{}", base64url_encode(&signature))
    }

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn reads_valid_hs256_token() {
        let token = hs256_token(SECRET, r#"{"alg":"HS256"}"#, r#"{"iss":"x"}"#);
        let policy = ValidationPolicy::builder()
            .require_signature(hmac_jwk(SECRET))
            .build();
        let reader = TokenReader::new();
        let read = reader.read(token.as_bytes(), &policy).unwrap();
        assert_eq!(read.claims().unwrap().iss.as_deref(), Some("x"));
        assert!(read.key.is_some());
    }

    #[test]
    fn rejects_oversized_token() {
        let policy = ValidationPolicy::builder().max_token_size(8).build();
        let reader = TokenReader::new();
        let err = reader.read(b"aaaa.bbbb.cccc", &policy).unwrap_err();
        assert!(matches!(err, TokenError::Malformed));
    }

    #[test]
    fn rejects_empty_input() {
        let reader = TokenReader::new();
        let policy = ValidationPolicy::builder().build();
        assert!(matches!(
            reader.read(b"", &policy),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let token = hs256_token(SECRET, r#"{"alg":"HS999"}"#, r#"{"iss":"x"}"#);
        let reader = TokenReader::new();
        let policy = ValidationPolicy::builder().build();
        let err = reader.read(token.as_bytes(), &policy).unwrap_err();
        assert!(matches!(err, TokenError::InvalidHeader("alg")));
    }

    #[test]
    fn rejects_four_segment_token() {
        let reader = TokenReader::new();
        let policy = ValidationPolicy::builder().build();
        let header = base64url_encode(br#"{"alg":"HS256"}"#);
        let token = format!("{header}.a.b.c");
        assert!(matches!(
            reader.read(token.as_bytes(), &policy),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn rejects_tampered_payload() {
        let token = hs256_token(SECRET, r#"{"alg":"HS256"}"#, r#"{"iss":"x"}"#);
        // Swap one byte inside the payload segment.
        let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();
        parts[1] = base64url_encode(br#"{"iss":"y"}"#);
        let tampered = parts.join(".");
        let policy = ValidationPolicy::builder()
            .require_signature(hmac_jwk(SECRET))
            .build();
        let reader = TokenReader::new();
        let err = reader.read(tampered.as_bytes(), &policy).unwrap_err();
        assert!(matches!(
            err,
            TokenError::SignatureInvalid(SignatureCause::Mismatch)
        ));
    }

    #[test]
    fn decodes_without_validation() {
        let token = hs256_token(SECRET, r#"{"alg":"HS256"}"#, r#"{"sub":"alice"}"#);
        let policy = ValidationPolicy::builder().build();
        let reader = TokenReader::new();
        let read = reader.read(token.as_bytes(), &policy).unwrap();
        assert_eq!(read.claims().unwrap().sub.as_deref(), Some("alice"));
        assert!(read.key.is_none());
    }

    #[test]
    fn unsigned_token_rejected_when_signature_required() {
        let header = base64url_encode(br#"{"alg":"none"}"#);
        let payload = base64url_encode(br#"{"iss":"x"}"#);
        let token = format!("{header}.{payload}.");
        let policy = ValidationPolicy::builder()
            .require_signature(hmac_jwk(SECRET))
            .build();
        let reader = TokenReader::new();
        let err = reader.read(token.as_bytes(), &policy).unwrap_err();
        assert!(matches!(
            err,
            TokenError::SignatureInvalid(SignatureCause::Missing)
        ));
    }

    #[test]
    fn unsigned_token_readable_without_policy() {
        let header = base64url_encode(br#"{"alg":"none"}"#);
        let payload = base64url_encode(br#"{"iss":"x"}"#);
        let token = format!("{header}.{payload}.");
        let policy = ValidationPolicy::builder().build();
        let reader = TokenReader::new();
        let read = reader.read(token.as_bytes(), &policy).unwrap();
        assert_eq!(read.claims().unwrap().iss.as_deref(), Some("x"));
    }

    #[test]
    fn malformed_header_base64_is_malformed_token() {
        let reader = TokenReader::new();
        let policy = ValidationPolicy::builder().build();
        assert!(matches!(
            reader.read(b"!!!.AAAA.AAAA", &policy),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn malformed_payload_json_is_malformed_token() {
        let header = base64url_encode(br#"{"alg":"none"}"#);
        let payload = base64url_encode(b"not json");
        let token = format!("{header}.{payload}.");
        let reader = TokenReader::new();
        let policy = ValidationPolicy::builder().build();
        assert!(matches!(
            reader.read(token.as_bytes(), &policy),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn header_cache_serves_repeat_headers() {
        let reader = TokenReader::new();
        let policy = ValidationPolicy::builder()
            .require_signature(hmac_jwk(SECRET))
            .build();
        for i in 0..10 {
            let token = hs256_token(
                SECRET,
                r#"{"alg":"HS256"}"#,
                &format!(r#"{{"iss":"issuer-{i}"}}"#),
            );
            let read = reader.read(token.as_bytes(), &policy).unwrap();
            assert_eq!(
                read.claims().unwrap().iss.as_deref(),
                Some(format!("issuer-{i}").as_str())
            );
        }
    }

    #[test]
    fn policy_violation_surfaces_claim_name() {
        let token = hs256_token(SECRET, r#"{"alg":"HS256"}"#, r#"{"iss":"other"}"#);
        let policy = ValidationPolicy::builder()
            .require_signature(hmac_jwk(SECRET))
            .require_issuer("expected")
            .build();
        let reader = TokenReader::new();
        let err = reader.read(token.as_bytes(), &policy).unwrap_err();
        assert!(matches!(err, TokenError::PolicyViolation(claim) if claim == "iss"));
    }
}
