//! Opt-in caching decorator for any [`KeyProvider`].
//!
//! The cache uses `arc-swap` for lock-free reads on the hot path. Entries are
//! only dropped through [`CachingKeyProvider::invalidate`] or
//! [`CachingKeyProvider::invalidate_all`]; hosts that rotate keys must call
//! one of them, which is why caching is never the default.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use common::Result;
use tracing::debug;

use super::{KeyMaterial, KeyProvider};

/// Cached keys plus an invalidation counter.
///
/// A fill started before an invalidation carries a stale epoch and is
/// discarded instead of re-inserting the old key.
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, KeyMaterial>,
    epoch: u64,
}

/// Wraps a [`KeyProvider`] and remembers every key it has resolved.
///
/// Failed lookups are not cached.
#[derive(Clone, Debug)]
pub struct CachingKeyProvider<P> {
    inner: P,
    cache: Arc<ArcSwap<CacheState>>,
}

impl<P: KeyProvider> CachingKeyProvider<P> {
    /// Wrap `inner` with an empty cache.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Arc::new(ArcSwap::from_pointee(CacheState::default())),
        }
    }

    /// Return the number of keys currently cached.
    pub fn len(&self) -> usize {
        self.cache.load().entries.len()
    }

    /// Return `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.load().entries.is_empty()
    }

    /// Drop the cached entry for `key_id`; the next lookup goes to the inner provider.
    pub fn invalidate(&self, key_id: &str) {
        self.cache.rcu(|current| {
            let mut entries = current.entries.clone();
            entries.remove(key_id);
            CacheState {
                entries,
                epoch: current.epoch.wrapping_add(1),
            }
        });
        debug!(key_id, "key cache entry invalidated");
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.cache.rcu(|current| CacheState {
            entries: HashMap::new(),
            epoch: current.epoch.wrapping_add(1),
        });
        debug!("key cache cleared");
    }
}

impl<P: KeyProvider> KeyProvider for CachingKeyProvider<P> {
    fn get_key(&self, key_id: &str) -> Result<KeyMaterial> {
        let epoch = {
            let state = self.cache.load();
            if let Some(key) = state.entries.get(key_id) {
                return Ok(key.clone());
            }
            state.epoch
        };

        let key = self.inner.get_key(key_id)?;
        self.cache.rcu(|current| {
            if current.epoch != epoch {
                return Arc::clone(current);
            }
            let mut entries = current.entries.clone();
            entries.insert(key_id.to_owned(), key.clone());
            Arc::new(CacheState { entries, epoch })
        });
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::MockKeyProvider;
    use common::FieldCryptoError;

    #[test]
    fn second_lookup_is_served_from_cache() {
        let mut inner = MockKeyProvider::new();
        inner
            .expect_get_key()
            .withf(|id| id == "k1")
            .times(1)
            .returning(|_| Ok(KeyMaterial::from("secret")));

        let cached = CachingKeyProvider::new(inner);
        assert_eq!(cached.get_key("k1").unwrap().as_bytes(), b"secret");
        assert_eq!(cached.get_key("k1").unwrap().as_bytes(), b"secret");
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn invalidate_forces_fresh_lookup() {
        let mut inner = MockKeyProvider::new();
        let mut seq = mockall::Sequence::new();
        inner
            .expect_get_key()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(KeyMaterial::from("old")));
        inner
            .expect_get_key()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(KeyMaterial::from("rotated")));

        let cached = CachingKeyProvider::new(inner);
        assert_eq!(cached.get_key("k").unwrap().as_bytes(), b"old");
        cached.invalidate("k");
        assert!(cached.is_empty());
        assert_eq!(cached.get_key("k").unwrap().as_bytes(), b"rotated");
    }

    #[test]
    fn invalidate_all_clears() {
        let inner = crate::keys::InMemoryKeyProvider::new()
            .with_key("a", "1")
            .with_key("b", "2");
        let cached = CachingKeyProvider::new(inner);
        cached.get_key("a").unwrap();
        cached.get_key("b").unwrap();
        assert_eq!(cached.len(), 2);
        cached.invalidate_all();
        assert!(cached.is_empty());
    }

    #[test]
    fn failures_are_not_cached() {
        let mut inner = MockKeyProvider::new();
        inner
            .expect_get_key()
            .times(2)
            .returning(|id| Err(FieldCryptoError::KeyNotFound(id.to_owned())));

        let cached = CachingKeyProvider::new(inner);
        assert!(cached.get_key("missing").is_err());
        assert!(cached.get_key("missing").is_err());
        assert!(cached.is_empty());
    }

    /// Blocks its first fetch until released, then serves the rotated key.
    struct GatedProvider {
        calls: std::sync::atomic::AtomicUsize,
        fetched: Arc<std::sync::Barrier>,
        release: Arc<std::sync::Barrier>,
    }

    impl KeyProvider for GatedProvider {
        fn get_key(&self, _key_id: &str) -> Result<KeyMaterial> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call == 0 {
                self.fetched.wait();
                self.release.wait();
                Ok(KeyMaterial::from("old"))
            } else {
                Ok(KeyMaterial::from("rotated"))
            }
        }
    }

    #[test]
    fn invalidate_during_fetch_discards_the_stale_fill() {
        let fetched = Arc::new(std::sync::Barrier::new(2));
        let release = Arc::new(std::sync::Barrier::new(2));
        let cached = Arc::new(CachingKeyProvider::new(GatedProvider {
            calls: std::sync::atomic::AtomicUsize::new(0),
            fetched: Arc::clone(&fetched),
            release: Arc::clone(&release),
        }));

        let reader = {
            let cached = Arc::clone(&cached);
            std::thread::spawn(move || cached.get_key("k").unwrap())
        };
        fetched.wait();
        cached.invalidate("k");
        release.wait();

        assert_eq!(reader.join().unwrap().as_bytes(), b"old");
        assert!(cached.is_empty());
        assert_eq!(cached.get_key("k").unwrap().as_bytes(), b"rotated");
        assert_eq!(cached.len(), 1);
    }
}
