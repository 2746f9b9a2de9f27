//! [`InMemoryKeyProvider`]: fixed map of key identifiers to key bytes.

use std::collections::HashMap;

use common::{FieldCryptoError, Result};

use super::{KeyMaterial, KeyProvider};

/// A [`KeyProvider`] backed by an in-process map.
///
/// Intended for tests and for hosts that load keys themselves at startup.
#[derive(Clone, Debug, Default)]
pub struct InMemoryKeyProvider {
    keys: HashMap<String, KeyMaterial>,
}

impl InMemoryKeyProvider {
    /// Create a new, empty [`InMemoryKeyProvider`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the key stored under `key_id`.
    pub fn with_key(mut self, key_id: impl Into<String>, key: impl Into<KeyMaterial>) -> Self {
        self.keys.insert(key_id.into(), key.into());
        self
    }

    /// Return the number of stored keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Return `true` if no key is stored.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyProvider for InMemoryKeyProvider {
    fn get_key(&self, key_id: &str) -> Result<KeyMaterial> {
        self.keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| FieldCryptoError::KeyNotFound(key_id.to_owned()))
    }
}
