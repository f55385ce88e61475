//! Cryptographic primitives for the Moat JOSE stack.
//!
//! Everything here is a thin, policy-free layer over the RustCrypto
//! crates: base64url with exact sizing, SHA-2 and HMAC with precomputed
//! key state, the AES modes JOSE needs (CBC-HMAC composite, GCM, Key
//! Wrap), RSA and ECDSA signatures, RSA key transport, ECDH with the
//! Concat KDF, and CSPRNG access. Algorithm selection and token
//! semantics live in the higher crates.

pub mod aes_cbc_hmac;
pub mod aes_gcm;
pub mod aes_kw;
pub mod base64url;
pub mod concat_kdf;
pub mod ec;
pub mod error;
pub mod hash;
pub mod hmac;
pub mod rand;
pub mod rsa;

pub use self::aes_cbc_hmac::CbcHmac;
pub use self::aes_gcm::Gcm;
pub use self::aes_kw::{KeyWrap, WRAP_OVERHEAD};
pub use self::base64url::{base64url_decode, base64url_encode, decoded_len, encoded_len};
pub use self::concat_kdf::concat_kdf_sha256;
pub use self::ec::{EcCurve, EcPrivateKey, EcPublicKey, EcSigner, EcVerifier};
pub use self::error::CryptoError;
pub use self::hash::{ct_eq, HashAlgorithm};
pub use self::hmac::HmacKey;
pub use self::rand::{fill_random, random_bytes};
pub use self::rsa::{
    decrypt_cek, encrypt_cek, private_key_from_components, public_key_from_components,
    RsaEncryptionPadding, RsaSignaturePadding, RsaSigner, RsaVerifier,
};

// Re-exported so engine crates name RSA key types without a direct
// dependency on the `rsa` crate version.
pub use ::rsa::traits::{PrivateKeyParts, PublicKeyParts};
pub use ::rsa::{RsaPrivateKey, RsaPublicKey};
