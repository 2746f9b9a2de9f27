//! AES-256-CBC encryption with HMAC-SHA256 authentication (encrypt-then-MAC).
//!
//! **Algorithm choice:** CBC with PKCS#7 padding is malleable and, on its own,
//! open to padding-oracle attacks. It is only safe here because the field
//! protocol verifies the HMAC over the length-framed `[alg, iv, ciphertext, kid]` *before*
//! calling [`decrypt_cbc`]. Do not expose decryption without that check.
//!
//! A fresh random 16-byte IV is required per encryption and must be stored
//! next to the ciphertext; it cannot be recovered otherwise.

use std::sync::Arc;

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use common::{FieldCryptoError, Result};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

use super::{CryptoProvider, MessageAuthenticator};
use crate::keys::{KeyMaterial, KeyProvider};

/// Registry name and envelope tag of this algorithm.
pub const ALGORITHM: &str = "AES-256-HMAC-SHA256";

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of a CBC IV, equal to the AES block size.
pub const IV_LEN: usize = 16;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Generate a random IV via the OS CSPRNG.
pub fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext` with AES-256-CBC and PKCS#7 padding. Output is raw bytes.
///
/// # Errors
///
/// Returns [`FieldCryptoError::Encryption`] if `key` is not [`KEY_LEN`] bytes
/// or `iv` is not [`IV_LEN`] bytes.
pub fn encrypt_cbc(plaintext: &[u8], key: &KeyMaterial, iv: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv)
        .map_err(|_| FieldCryptoError::Encryption)?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt AES-256-CBC ciphertext and strip PKCS#7 padding.
///
/// # Errors
///
/// Returns [`FieldCryptoError::Decryption`] for a bad key or IV length, a
/// ciphertext that is empty or not a whole number of blocks, or invalid
/// padding. The cases are not distinguished.
pub fn decrypt_cbc(ciphertext: &[u8], key: &KeyMaterial, iv: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(FieldCryptoError::Decryption);
    }
    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
        .map_err(|_| FieldCryptoError::Decryption)?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| FieldCryptoError::Decryption)
}

/// HMAC-SHA256 over `chunks`, each framed as a big-endian `u32` length
/// followed by its bytes, so no byte can move across a chunk boundary.
pub fn hmac_sign(key: &KeyMaterial, chunks: &[&[u8]]) -> Result<Vec<u8>> {
    Ok(hmac_over(key, chunks)?.finalize().into_bytes().to_vec())
}

/// Recompute the HMAC over `chunks` and compare with `signature` in constant time.
pub fn hmac_verify(key: &KeyMaterial, chunks: &[&[u8]], signature: &[u8]) -> Result<bool> {
    Ok(hmac_over(key, chunks)?.verify_slice(signature).is_ok())
}

fn hmac_over(key: &KeyMaterial, chunks: &[&[u8]]) -> Result<HmacSha256> {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| FieldCryptoError::Integrity)?;
    for chunk in chunks {
        let len = u32::try_from(chunk.len()).map_err(|_| FieldCryptoError::Integrity)?;
        mac.update(&len.to_be_bytes());
        mac.update(chunk);
    }
    Ok(mac)
}

/// `AES-256-HMAC-SHA256` crypto provider.
///
/// Holds the identifiers of the encryption key and the HMAC key; both are
/// resolved through the key provider on every call.
pub struct Aes256HmacSha256Provider {
    key_provider: Arc<dyn KeyProvider>,
    key_id: String,
    hmac_key_id: String,
}

impl Aes256HmacSha256Provider {
    /// Create a provider encrypting under `key_id` and signing with `hmac_key_id`.
    pub fn new(
        key_provider: Arc<dyn KeyProvider>,
        key_id: impl Into<String>,
        hmac_key_id: impl Into<String>,
    ) -> Self {
        Self {
            key_provider,
            key_id: key_id.into(),
            hmac_key_id: hmac_key_id.into(),
        }
    }
}

impl std::fmt::Debug for Aes256HmacSha256Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes256HmacSha256Provider")
            .field("key_id", &self.key_id)
            .field("hmac_key_id", &self.hmac_key_id)
            .finish_non_exhaustive()
    }
}

impl CryptoProvider for Aes256HmacSha256Provider {
    fn algorithm_name(&self) -> &str {
        ALGORITHM
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn generate_iv(&self) -> Option<Vec<u8>> {
        Some(random_iv().to_vec())
    }

    fn encrypt(&self, plaintext: &[u8], key_id: &str, iv: Option<&[u8]>) -> Result<Vec<u8>> {
        let iv = iv.ok_or(FieldCryptoError::Encryption)?;
        let key = self.key_provider.get_key(key_id)?;
        encrypt_cbc(plaintext, &key, iv)
    }

    fn decrypt(&self, ciphertext: &[u8], key_id: &str, iv: Option<&[u8]>) -> Result<Vec<u8>> {
        let iv = iv.ok_or(FieldCryptoError::Decryption)?;
        let key = self.key_provider.get_key(key_id)?;
        decrypt_cbc(ciphertext, &key, iv)
    }

    fn authenticator(&self) -> Option<&dyn MessageAuthenticator> {
        Some(self)
    }
}

impl MessageAuthenticator for Aes256HmacSha256Provider {
    fn sign(&self, chunks: &[&[u8]]) -> Result<Vec<u8>> {
        let key = self.key_provider.get_key(&self.hmac_key_id)?;
        hmac_sign(&key, chunks)
    }

    fn verify_signature(&self, chunks: &[&[u8]], signature: &[u8]) -> Result<bool> {
        let key = self.key_provider.get_key(&self.hmac_key_id)?;
        hmac_verify(&key, chunks, signature)
    }
}
