//! Pluggable cipher algorithms for field encryption.
//!
//! Every algorithm implements [`CryptoProvider`]. Algorithms that also
//! authenticate their output expose a [`MessageAuthenticator`] through
//! [`CryptoProvider::authenticator`]; the field-transform protocol signs and
//! verifies only through that capability.
//!
//! Providers hold key *identifiers*, never key bytes: each call resolves its key
//! through the provider's [`KeyProvider`](crate::keys::KeyProvider) so rotation
//! takes effect immediately.

pub mod aes_hmac;
pub mod rsa_oaep;

pub use aes_hmac::Aes256HmacSha256Provider;
pub use rsa_oaep::Rsa2048OaepSha1Provider;

use common::Result;

/// A cipher algorithm usable for field encryption.
///
/// Implementations hold no mutable per-call state and must be safe to invoke
/// concurrently.
pub trait CryptoProvider: Send + Sync {
    /// Stable algorithm identifier, e.g. `"AES-256-HMAC-SHA256"`.
    fn algorithm_name(&self) -> &str;

    /// Key identifier used when the caller does not override it.
    fn key_id(&self) -> &str;

    /// A fresh random IV, or `None` if the algorithm does not use one.
    fn generate_iv(&self) -> Option<Vec<u8>> {
        None
    }

    /// Encrypt `plaintext` under the key named `key_id`.
    ///
    /// # Errors
    ///
    /// Returns [`common::FieldCryptoError::KeyNotFound`] if the key cannot be
    /// resolved and [`common::FieldCryptoError::Encryption`] on cipher failure.
    fn encrypt(&self, plaintext: &[u8], key_id: &str, iv: Option<&[u8]>) -> Result<Vec<u8>>;

    /// Decrypt `ciphertext` produced under the key named `key_id`.
    ///
    /// # Errors
    ///
    /// Returns [`common::FieldCryptoError::Decryption`] on any cipher failure,
    /// without distinguishing bad padding from a wrong key.
    fn decrypt(&self, ciphertext: &[u8], key_id: &str, iv: Option<&[u8]>) -> Result<Vec<u8>>;

    /// The sign/verify capability, if this algorithm has one.
    fn authenticator(&self) -> Option<&dyn MessageAuthenticator> {
        None
    }
}

/// Keyed MAC over an ordered sequence of byte chunks.
pub trait MessageAuthenticator: Send + Sync {
    /// MAC over `chunks` in order. Chunk boundaries are part of the
    /// authenticated message.
    fn sign(&self, chunks: &[&[u8]]) -> Result<Vec<u8>>;

    /// Recompute the MAC over `chunks` and compare it with `signature` in
    /// constant time.
    fn verify_signature(&self, chunks: &[&[u8]], signature: &[u8]) -> Result<bool>;
}
