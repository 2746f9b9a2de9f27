//! RSA-2048 encryption with OAEP padding over SHA-1.
//!
//! OAEP is randomised, so no IV is used and two encryptions of the same
//! plaintext differ. There is no sign/verify capability: callers needing
//! integrity must compose this provider with a MAC.
//!
//! A 2048-bit modulus bounds each plaintext to [`MAX_PLAINTEXT_LEN`] bytes.
//! Longer inputs are rejected, never truncated or chunked.

use std::sync::Arc;

use common::{FieldCryptoError, Result};
use rand::rngs::OsRng;
use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    traits::PublicKeyParts,
    Oaep, RsaPrivateKey, RsaPublicKey,
};
use sha1::Sha1;

use super::CryptoProvider;
use crate::keys::{KeyMaterial, KeyProvider};

/// Registry name and envelope tag of this algorithm.
pub const ALGORITHM: &str = "RSA-2048-OAEP-SHA1";

/// Modulus size in bytes (2048 bits).
pub const MODULUS_LEN: usize = 256;

/// Largest plaintext accepted per call: modulus minus OAEP/SHA-1 overhead (2 * 20 + 2).
pub const MAX_PLAINTEXT_LEN: usize = MODULUS_LEN - 2 * 20 - 2;

/// Parse a PEM public key (SPKI or PKCS#1) and check it is 2048 bits.
///
/// # Errors
///
/// Returns [`FieldCryptoError::Encryption`] if the material is not a PEM RSA
/// public key of the expected size.
pub fn parse_public_key(key: &KeyMaterial) -> Result<RsaPublicKey> {
    let pem = std::str::from_utf8(key.as_bytes()).map_err(|_| FieldCryptoError::Encryption)?;
    let public = RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|_| FieldCryptoError::Encryption)?;
    if public.size() != MODULUS_LEN {
        return Err(FieldCryptoError::Encryption);
    }
    Ok(public)
}

/// Parse a PEM private key (PKCS#1 or PKCS#8) and check it is 2048 bits.
///
/// # Errors
///
/// Returns [`FieldCryptoError::Decryption`] if the material is not a PEM RSA
/// private key of the expected size.
pub fn parse_private_key(key: &KeyMaterial) -> Result<RsaPrivateKey> {
    let pem = std::str::from_utf8(key.as_bytes()).map_err(|_| FieldCryptoError::Decryption)?;
    let private = RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|_| FieldCryptoError::Decryption)?;
    if private.size() != MODULUS_LEN {
        return Err(FieldCryptoError::Decryption);
    }
    Ok(private)
}

/// OAEP/SHA-1 encryption with a public key.
///
/// # Errors
///
/// Returns [`FieldCryptoError::Encryption`] if `plaintext` exceeds
/// [`MAX_PLAINTEXT_LEN`] or the RSA operation fails.
pub fn encrypt_oaep(plaintext: &[u8], public: &RsaPublicKey) -> Result<Vec<u8>> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(FieldCryptoError::Encryption);
    }
    public
        .encrypt(&mut OsRng, Oaep::new::<Sha1>(), plaintext)
        .map_err(|_| FieldCryptoError::Encryption)
}

/// OAEP/SHA-1 decryption with a private key.
///
/// # Errors
///
/// Returns [`FieldCryptoError::Decryption`] on padding failure or a block that
/// is not valid for the key.
pub fn decrypt_oaep(ciphertext: &[u8], private: &RsaPrivateKey) -> Result<Vec<u8>> {
    private
        .decrypt(Oaep::new::<Sha1>(), ciphertext)
        .map_err(|_| FieldCryptoError::Decryption)
}

/// `RSA-2048-OAEP-SHA1` crypto provider.
///
/// Encrypts with the key named by the caller (defaulting to the public key id)
/// and always decrypts with the configured private key id.
pub struct Rsa2048OaepSha1Provider {
    key_provider: Arc<dyn KeyProvider>,
    public_key_id: String,
    private_key_id: String,
}

impl Rsa2048OaepSha1Provider {
    /// Create a provider for the given public/private key identifier pair.
    pub fn new(
        key_provider: Arc<dyn KeyProvider>,
        public_key_id: impl Into<String>,
        private_key_id: impl Into<String>,
    ) -> Self {
        Self {
            key_provider,
            public_key_id: public_key_id.into(),
            private_key_id: private_key_id.into(),
        }
    }
}

impl std::fmt::Debug for Rsa2048OaepSha1Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rsa2048OaepSha1Provider")
            .field("public_key_id", &self.public_key_id)
            .field("private_key_id", &self.private_key_id)
            .finish_non_exhaustive()
    }
}

impl CryptoProvider for Rsa2048OaepSha1Provider {
    fn algorithm_name(&self) -> &str {
        ALGORITHM
    }

    fn key_id(&self) -> &str {
        &self.public_key_id
    }

    fn encrypt(&self, plaintext: &[u8], key_id: &str, _iv: Option<&[u8]>) -> Result<Vec<u8>> {
        let key = self.key_provider.get_key(key_id)?;
        let public = parse_public_key(&key)?;
        encrypt_oaep(plaintext, &public)
    }

    fn decrypt(&self, ciphertext: &[u8], _key_id: &str, _iv: Option<&[u8]>) -> Result<Vec<u8>> {
        let key = self.key_provider.get_key(&self.private_key_id)?;
        let private = parse_private_key(&key)?;
        decrypt_oaep(ciphertext, &private)
    }
}
