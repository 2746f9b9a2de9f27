//! Key resolution: the [`KeyProvider`] capability and the key bytes it returns.
//!
//! # Lifecycle
//!
//! 1. A crypto provider asks its [`KeyProvider`] for a key by identifier on
//!    every encrypt/decrypt/sign call. Nothing is pinned or cached by default.
//! 2. The returned [`KeyMaterial`] lives on the call stack only and is zeroed
//!    when dropped.
//! 3. Hosts that need to avoid repeated lookups opt in to
//!    [`CachingKeyProvider`], which supports explicit invalidation for rotation.
//!
//! # Security invariants
//!
//! - Key material is **never** logged. Its `Debug` output is redacted.

pub mod cache;
pub mod memory;

pub use cache::CachingKeyProvider;
pub use memory::InMemoryKeyProvider;

use std::sync::Arc;

use common::Result;
use zeroize::Zeroize;

/// Raw key bytes returned by a [`KeyProvider`].
///
/// When this type is dropped, the buffer is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    /// Take ownership of `bytes` as key material.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("KeyMaterial([REDACTED])")
    }
}

impl From<Vec<u8>> for KeyMaterial {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for KeyMaterial {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for KeyMaterial {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

/// Resolves a logical key identifier to raw key bytes.
///
/// Implementations may block (e.g. on a KMS round-trip); deadlines belong to
/// the implementation's own transport. Must be safe to call concurrently.
#[cfg_attr(test, mockall::automock)]
pub trait KeyProvider: Send + Sync {
    /// Load the key named `key_id`.
    ///
    /// # Errors
    ///
    /// Returns [`common::FieldCryptoError::KeyNotFound`] if the identifier is
    /// unknown. Callers treat any failure as fatal to the surrounding operation.
    fn get_key(&self, key_id: &str) -> Result<KeyMaterial>;
}

impl<T> KeyProvider for Arc<T>
where
    T: KeyProvider + ?Sized,
{
    fn get_key(&self, key_id: &str) -> Result<KeyMaterial> {
        (**self).get_key(key_id)
    }
}

impl<T> KeyProvider for Box<T>
where
    T: KeyProvider + ?Sized,
{
    fn get_key(&self, key_id: &str) -> Result<KeyMaterial> {
        (**self).get_key(key_id)
    }
}
