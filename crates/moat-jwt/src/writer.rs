//! The token write pipeline and its descriptors.
//!
//! A descriptor is everything needed to mint one token. JWE build order:
//! resolve the header (including the key-wrap contributions `epk`, `iv`,
//! `tag`), wrap the CEK, draw a nonce from the CSPRNG, optionally
//! deflate, encrypt with the encoded header as associated data, then
//! join the base64url segments. Output is assembled once at its exact
//! final size, and never carries trailing newlines.

use std::sync::Arc;

use tracing::debug;

use moat_crypto::{base64url_encode, fill_random};
use moat_jose::{
    Claims, CompressionAlgorithm, EncryptionAlgorithm, Header, Jwk, KeyManagementAlgorithm,
    SignatureAlgorithm,
};

use crate::cache::{LruCache, DEFAULT_CAPACITY};
use crate::encrypt::ContentEncrypter;
use crate::error::TokenError;
use crate::sign::Signer;
use crate::wrap::wrap_cek;
use crate::zip;

fn generation(cause: impl std::fmt::Display) -> TokenError {
    TokenError::Generation(cause.to_string())
}

/// Everything needed to mint a JWS.
#[derive(Clone, Debug)]
pub struct JwsDescriptor {
    pub header: Header,
    pub claims: Claims,
    pub alg: SignatureAlgorithm,
    /// Absent only for `alg: none`.
    pub key: Option<Jwk>,
}

impl JwsDescriptor {
    pub fn new(alg: SignatureAlgorithm, key: Jwk, claims: Claims) -> Self {
        Self {
            header: Header::new(),
            claims,
            alg,
            key: Some(key),
        }
    }

    /// An unsecured (`alg: none`) token.
    pub fn unsecured(claims: Claims) -> Self {
        Self {
            header: Header::new(),
            claims,
            alg: SignatureAlgorithm::None,
            key: None,
        }
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.header = header;
        self
    }
}

/// The inner payload of a JWE: text, raw bytes, or a token to sign then
/// encrypt. The inner descriptor is owned by the outer one.
#[derive(Clone, Debug)]
pub enum JwePayload {
    Text(String),
    Binary(Vec<u8>),
    Nested(JwsDescriptor),
}

/// Everything needed to mint a JWE.
#[derive(Clone, Debug)]
pub struct JweDescriptor {
    pub header: Header,
    pub payload: JwePayload,
    pub alg: KeyManagementAlgorithm,
    pub enc: EncryptionAlgorithm,
    pub zip: Option<CompressionAlgorithm>,
    /// Recipient key: symmetric secret, RSA public, or EC public.
    pub key: Jwk,
}

impl JweDescriptor {
    pub fn new(
        alg: KeyManagementAlgorithm,
        enc: EncryptionAlgorithm,
        key: Jwk,
        payload: JwePayload,
    ) -> Self {
        Self {
            header: Header::new(),
            payload,
            alg,
            enc,
            zip: None,
            key,
        }
    }

    pub fn with_zip(mut self, zip: CompressionAlgorithm) -> Self {
        self.zip = Some(zip);
        self
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.header = header;
        self
    }
}

/// Serializes descriptors to compact form. Safe to share across
/// threads; holds the encoded-header cache and a signer cache keyed by
/// key thumbprint, so minting many tokens under one key reuses its
/// prepared signing state.
pub struct TokenWriter {
    header_cache: LruCache<String, Arc<str>>,
    signer_cache: LruCache<(String, SignatureAlgorithm), Arc<Signer>>,
}

impl TokenWriter {
    pub fn new() -> Self {
        Self {
            header_cache: LruCache::new(DEFAULT_CAPACITY),
            signer_cache: LruCache::new(DEFAULT_CAPACITY),
        }
    }

    fn encode_header_cached(&self, header_json: String) -> Arc<str> {
        if let Some(encoded) = self.header_cache.get(header_json.as_str()) {
            return encoded;
        }
        let encoded: Arc<str> = base64url_encode(header_json.as_bytes()).into();
        self.header_cache.insert(header_json, encoded.clone());
        encoded
    }

    fn signer_for(
        &self,
        alg: SignatureAlgorithm,
        key: &Jwk,
    ) -> Result<Arc<Signer>, TokenError> {
        let cache_key = (key.thumbprint(), alg);
        if let Some(signer) = self.signer_cache.get(&cache_key) {
            return Ok(signer);
        }
        let signer = Arc::new(Signer::for_key(alg, key).map_err(generation)?);
        self.signer_cache.insert(cache_key, signer.clone());
        Ok(signer)
    }

    /// Emit `BASE64URL(header) . BASE64URL(claims) . BASE64URL(signature)`.
    pub fn write_jws(&self, descriptor: &JwsDescriptor) -> Result<String, TokenError> {
        if descriptor.alg != SignatureAlgorithm::None && descriptor.key.is_none() {
            return Err(generation(format!(
                "{} requires a signing key",
                descriptor.alg.name()
            )));
        }

        let mut header = descriptor.header.clone();
        header.alg = Some(descriptor.alg.name().to_owned());
        if header.kid.is_none() {
            header.kid = descriptor.key.as_ref().and_then(|key| key.kid.clone());
        }
        let header_json = header.to_json().map_err(generation)?;
        let encoded_header = self.encode_header_cached(header_json);

        let payload_json = descriptor.claims.to_json().map_err(generation)?;
        let encoded_payload = base64url_encode(payload_json.as_bytes());

        let signing_input = format!("{encoded_header}.{encoded_payload}");
        let signature = match &descriptor.key {
            Some(key) => self
                .signer_for(descriptor.alg, key)?
                .sign(signing_input.as_bytes())
                .map_err(generation)?,
            None => Signer::none().sign(signing_input.as_bytes()).map_err(generation)?,
        };
        let encoded_signature = base64url_encode(&signature);

        let mut token =
            String::with_capacity(signing_input.len() + 1 + encoded_signature.len());
        token.push_str(&signing_input);
        token.push('.');
        token.push_str(&encoded_signature);
        Ok(token)
    }

    /// Emit the five JWE segments. The encrypted-key segment is empty
    /// for `dir` and `ECDH-ES`.
    pub fn write_jwe(&self, descriptor: &JweDescriptor) -> Result<String, TokenError> {
        let mut header = descriptor.header.clone();
        header.alg = Some(descriptor.alg.name().to_owned());
        header.enc = Some(descriptor.enc.name().to_owned());
        if let Some(zip_alg) = descriptor.zip {
            header.zip = Some(zip_alg.name().to_owned());
        }
        if header.kid.is_none() {
            header.kid = descriptor.key.kid.clone();
        }

        let payload = match &descriptor.payload {
            JwePayload::Text(text) => text.clone().into_bytes(),
            JwePayload::Binary(bytes) => bytes.clone(),
            JwePayload::Nested(inner) => {
                if header.cty.is_none() {
                    header.cty = Some("JWT".to_owned());
                }
                self.write_jws(inner)?.into_bytes()
            }
        };
        let payload = match descriptor.zip {
            Some(CompressionAlgorithm::Deflate) => zip::deflate(&payload)?,
            None => payload,
        };

        let wrapped = wrap_cek(descriptor.alg, descriptor.enc, &descriptor.key, &mut header)
            .map_err(generation)?;
        debug!(
            alg = descriptor.alg.name(),
            enc = descriptor.enc.name(),
            "wrapped content encryption key"
        );
        let header_json = header.to_json().map_err(generation)?;
        let encoded_header = base64url_encode(header_json.as_bytes());

        let mut nonce = vec![0u8; descriptor.enc.iv_len()];
        fill_random(&mut nonce).map_err(generation)?;

        let encrypter =
            ContentEncrypter::new(descriptor.enc, &wrapped.cek).map_err(generation)?;
        let (ciphertext, tag) = encrypter
            .encrypt(&payload, &nonce, encoded_header.as_bytes())
            .map_err(generation)?;

        let encoded_key = base64url_encode(&wrapped.encrypted_key);
        let encoded_nonce = base64url_encode(&nonce);
        let encoded_ciphertext = base64url_encode(&ciphertext);
        let encoded_tag = base64url_encode(&tag);

        let mut token = String::with_capacity(
            encoded_header.len()
                + encoded_key.len()
                + encoded_nonce.len()
                + encoded_ciphertext.len()
                + encoded_tag.len()
                + 4,
        );
        token.push_str(&encoded_header);
        token.push('.');
        token.push_str(&encoded_key);
        token.push('.');
        token.push_str(&encoded_nonce);
        token.push('.');
        token.push_str(&encoded_ciphertext);
        token.push('.');
        token.push_str(&encoded_tag);
        Ok(token)
    }
}

impl Default for TokenWriter {
    fn default() -> Self {
        Self::new()
    }
}
