//! Algorithm name → [`CryptoProvider`] registry.
//!
//! Registration normally happens once during setup; lookups happen on every
//! field transform, possibly from many threads. The map lives behind `arc-swap`
//! so readers never block, and every (un)registration atomically swaps in a
//! new copy.
//!
//! A process-wide instance is available through [`global`]. It starts empty;
//! hosts populate it before first use and tests call [`reset_global`] to
//! isolate themselves.

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use arc_swap::ArcSwap;
use common::{FieldCryptoError, Result};
use tracing::{info, warn};

use crate::crypto::CryptoProvider;

type ProviderMap = HashMap<String, Arc<dyn CryptoProvider>>;

/// Shared, lock-free registry of crypto providers keyed by algorithm name.
///
/// Cloning is cheap and clones share the same underlying map.
#[derive(Clone)]
pub struct FieldCryptoRegistry {
    inner: Arc<ArcSwap<ProviderMap>>,
}

impl FieldCryptoRegistry {
    /// Create a new, empty [`FieldCryptoRegistry`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
        }
    }

    /// Register `provider` under `algorithm`, returning any provider it replaced.
    ///
    /// The name becomes the envelope tag of every field encrypted through it.
    pub fn register(
        &self,
        algorithm: impl Into<String>,
        provider: Arc<dyn CryptoProvider>,
    ) -> Option<Arc<dyn CryptoProvider>> {
        let algorithm = algorithm.into();
        let previous = self.inner.rcu(|current| {
            let mut next = ProviderMap::clone(current);
            next.insert(algorithm.clone(), Arc::clone(&provider));
            next
        });
        let replaced = previous.get(&algorithm).cloned();
        if replaced.is_some() {
            warn!(algorithm = %algorithm, "replaced registered crypto provider");
        } else {
            info!(algorithm = %algorithm, "registered crypto provider");
        }
        replaced
    }

    /// Register `provider` under its own [`CryptoProvider::algorithm_name`].
    pub fn register_provider(
        &self,
        provider: Arc<dyn CryptoProvider>,
    ) -> Option<Arc<dyn CryptoProvider>> {
        let algorithm = provider.algorithm_name().to_owned();
        self.register(algorithm, provider)
    }

    /// Remove the provider registered under `algorithm`.
    pub fn unregister(&self, algorithm: &str) -> Option<Arc<dyn CryptoProvider>> {
        let previous = self.inner.rcu(|current| {
            let mut next = ProviderMap::clone(current);
            next.remove(algorithm);
            next
        });
        previous.get(algorithm).cloned()
    }

    /// Look up a provider by algorithm name.
    ///
    /// This is a lock-free read; safe to call on the hot encryption path.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::ProviderNotFound`] if nothing is registered
    /// under `algorithm`.
    pub fn lookup(&self, algorithm: &str) -> Result<Arc<dyn CryptoProvider>> {
        self.inner
            .load()
            .get(algorithm)
            .cloned()
            .ok_or_else(|| FieldCryptoError::ProviderNotFound(algorithm.to_owned()))
    }

    /// Whether a provider is registered under `algorithm`.
    pub fn contains(&self, algorithm: &str) -> bool {
        self.inner.load().contains_key(algorithm)
    }

    /// Registered algorithm names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Return the number of registered providers.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Return `true` if no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Atomically remove every provider.
    pub fn clear(&self) {
        self.inner.store(Arc::new(HashMap::new()));
    }
}

impl Default for FieldCryptoRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FieldCryptoRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCryptoRegistry")
            .field("algorithms", &self.names())
            .finish()
    }
}

static GLOBAL: OnceLock<FieldCryptoRegistry> = OnceLock::new();

/// The process-wide registry. Empty until providers are registered.
pub fn global() -> &'static FieldCryptoRegistry {
    GLOBAL.get_or_init(FieldCryptoRegistry::new)
}

/// Remove every provider from the process-wide registry.
pub fn reset_global() {
    global().clear();
}
