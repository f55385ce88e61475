//! CEK wrapping and unwrapping for every key management algorithm.
//!
//! `dir` and `ECDH-ES` produce no encrypted-key segment; everything else
//! wraps a fresh CEK. Wrapping may extend the header: the ECDH-ES family
//! contributes `epk`, the AES-GCM-KW family contributes `iv` and `tag`.

use zeroize::Zeroizing;

use moat_crypto::{
    base64url_decode, base64url_encode, concat_kdf_sha256, decrypt_cek, encrypt_cek, random_bytes,
    CryptoError, EcPrivateKey, Gcm, KeyWrap,
};
use moat_jose::{EncryptionAlgorithm, Header, JoseError, Jwk, KeyManagementAlgorithm};

/// Outcome of CEK resolution on the write path.
pub struct WrappedKey {
    /// The content-encryption key to feed the AEAD.
    pub cek: Zeroizing<Vec<u8>>,
    /// The encrypted-key segment; empty for `dir` and `ECDH-ES`.
    pub encrypted_key: Vec<u8>,
}

fn party_info(header: &Header) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
    let apu = header
        .apu
        .as_deref()
        .map(base64url_decode)
        .transpose()?
        .unwrap_or_default();
    let apv = header
        .apv
        .as_deref()
        .map(base64url_decode)
        .transpose()?
        .unwrap_or_default();
    Ok((apu, apv))
}

fn expect_kek(key: &Jwk, alg: KeyManagementAlgorithm) -> Result<Zeroizing<Vec<u8>>, JoseError> {
    let kek = key.symmetric_key()?;
    let expected = alg.kek_len().expect("AES key management carries a KEK size");
    if kek.len() != expected {
        return Err(JoseError::Crypto(CryptoError::InvalidKeyLength {
            expected,
            got: kek.len(),
        }));
    }
    Ok(kek)
}

fn check_cek_len(cek: Zeroizing<Vec<u8>>, enc: EncryptionAlgorithm) -> Result<Zeroizing<Vec<u8>>, JoseError> {
    if cek.len() != enc.cek_len() {
        return Err(JoseError::Crypto(CryptoError::DecryptionFailed));
    }
    Ok(cek)
}

/// ECDH-ES shared KDF output: the CEK itself in direct mode, the KEK for
/// the `+A*KW` forms.
fn ecdh_derive(
    alg: KeyManagementAlgorithm,
    enc: EncryptionAlgorithm,
    private: &EcPrivateKey,
    public: &moat_crypto::EcPublicKey,
    header: &Header,
) -> Result<Zeroizing<Vec<u8>>, JoseError> {
    let z = private.diffie_hellman(public)?;
    let (apu, apv) = party_info(header)?;
    let (alg_id, bits) = match alg.kek_len() {
        // ECDH-ES+A*KW: the KDF output keys the AES key wrap.
        Some(kek_len) => (alg.name(), kek_len * 8),
        // Direct: the KDF output is the CEK.
        None => (enc.name(), enc.cek_len() * 8),
    };
    Ok(concat_kdf_sha256(&z, alg_id, &apu, &apv, bits as u32))
}

/// Resolve and wrap a CEK for the write path, extending `header` with
/// the algorithm's contributions.
pub fn wrap_cek(
    alg: KeyManagementAlgorithm,
    enc: EncryptionAlgorithm,
    key: &Jwk,
    header: &mut Header,
) -> Result<WrappedKey, JoseError> {
    match alg {
        KeyManagementAlgorithm::Dir => {
            let cek = check_cek_len(key.symmetric_key()?, enc)?;
            Ok(WrappedKey {
                cek,
                encrypted_key: Vec::new(),
            })
        }
        KeyManagementAlgorithm::A128Kw
        | KeyManagementAlgorithm::A192Kw
        | KeyManagementAlgorithm::A256Kw => {
            let kek = expect_kek(key, alg)?;
            let cek = Zeroizing::new(random_bytes(enc.cek_len())?);
            let encrypted_key = KeyWrap::new(&kek)?.wrap(&cek)?;
            Ok(WrappedKey { cek, encrypted_key })
        }
        KeyManagementAlgorithm::A128GcmKw
        | KeyManagementAlgorithm::A192GcmKw
        | KeyManagementAlgorithm::A256GcmKw => {
            let kek = expect_kek(key, alg)?;
            let cek = Zeroizing::new(random_bytes(enc.cek_len())?);
            let iv = random_bytes(moat_crypto::aes_gcm::NONCE_LEN)?;
            let (encrypted_key, tag) = Gcm::new(&kek)?.encrypt(&cek, &iv, b"")?;
            header.iv = Some(base64url_encode(&iv));
            header.tag = Some(base64url_encode(&tag));
            Ok(WrappedKey { cek, encrypted_key })
        }
        KeyManagementAlgorithm::Rsa1_5
        | KeyManagementAlgorithm::RsaOaep
        | KeyManagementAlgorithm::RsaOaep256
        | KeyManagementAlgorithm::RsaOaep384
        | KeyManagementAlgorithm::RsaOaep512 => {
            let padding = alg.rsa_padding().expect("RSA key management carries a padding");
            let public = key.rsa_public_key()?;
            let cek = Zeroizing::new(random_bytes(enc.cek_len())?);
            let encrypted_key = encrypt_cek(&public, padding, &cek)?;
            Ok(WrappedKey { cek, encrypted_key })
        }
        KeyManagementAlgorithm::EcdhEs
        | KeyManagementAlgorithm::EcdhEsA128Kw
        | KeyManagementAlgorithm::EcdhEsA192Kw
        | KeyManagementAlgorithm::EcdhEsA256Kw => {
            let static_public = key.ec_public_key()?;
            let ephemeral = EcPrivateKey::random(static_public.curve());
            let derived = ecdh_derive(alg, enc, &ephemeral, &static_public, header)?;
            header.epk = Some(Jwk::from_ec_public_key(&ephemeral.public_key()));
            if alg.kek_len().is_some() {
                let cek = Zeroizing::new(random_bytes(enc.cek_len())?);
                let encrypted_key = KeyWrap::new(&derived)?.wrap(&cek)?;
                Ok(WrappedKey { cek, encrypted_key })
            } else {
                Ok(WrappedKey {
                    cek: derived,
                    encrypted_key: Vec::new(),
                })
            }
        }
    }
}

/// Recover the CEK on the read path.
pub fn unwrap_cek(
    alg: KeyManagementAlgorithm,
    enc: EncryptionAlgorithm,
    key: &Jwk,
    header: &Header,
    encrypted_key: &[u8],
) -> Result<Zeroizing<Vec<u8>>, JoseError> {
    match alg {
        KeyManagementAlgorithm::Dir => {
            if !encrypted_key.is_empty() {
                return Err(JoseError::Crypto(CryptoError::DecryptionFailed));
            }
            check_cek_len(key.symmetric_key()?, enc)
        }
        KeyManagementAlgorithm::A128Kw
        | KeyManagementAlgorithm::A192Kw
        | KeyManagementAlgorithm::A256Kw => {
            let kek = expect_kek(key, alg)?;
            let cek = Zeroizing::new(KeyWrap::new(&kek)?.unwrap(encrypted_key)?);
            check_cek_len(cek, enc)
        }
        KeyManagementAlgorithm::A128GcmKw
        | KeyManagementAlgorithm::A192GcmKw
        | KeyManagementAlgorithm::A256GcmKw => {
            let kek = expect_kek(key, alg)?;
            let iv = base64url_decode(header.iv.as_deref().ok_or(JoseError::MissingField("iv"))?)?;
            let tag =
                base64url_decode(header.tag.as_deref().ok_or(JoseError::MissingField("tag"))?)?;
            let cek = Zeroizing::new(Gcm::new(&kek)?.decrypt(encrypted_key, &iv, b"", &tag)?);
            check_cek_len(cek, enc)
        }
        KeyManagementAlgorithm::Rsa1_5
        | KeyManagementAlgorithm::RsaOaep
        | KeyManagementAlgorithm::RsaOaep256
        | KeyManagementAlgorithm::RsaOaep384
        | KeyManagementAlgorithm::RsaOaep512 => {
            let padding = alg.rsa_padding().expect("RSA key management carries a padding");
            let private = key.rsa_private_key()?;
            let cek = decrypt_cek(&private, padding, encrypted_key)?;
            check_cek_len(cek, enc)
        }
        KeyManagementAlgorithm::EcdhEs
        | KeyManagementAlgorithm::EcdhEsA128Kw
        | KeyManagementAlgorithm::EcdhEsA192Kw
        | KeyManagementAlgorithm::EcdhEsA256Kw => {
            let epk = header.epk.as_ref().ok_or(JoseError::MissingField("epk"))?;
            let ephemeral_public = epk.ec_public_key()?;
            let private = key.ec_private_key()?;
            let derived = ecdh_derive(alg, enc, &private, &ephemeral_public, header)?;
            if alg.kek_len().is_some() {
                let cek = Zeroizing::new(KeyWrap::new(&derived)?.unwrap(encrypted_key)?);
                check_cek_len(cek, enc)
            } else {
                if !encrypted_key.is_empty() {
                    return Err(JoseError::Crypto(CryptoError::DecryptionFailed));
                }
                check_cek_len(derived, enc)
            }
        }
    }
}
