//! Field-level encryption for JSON documents.
//!
//! Selected top-level fields of a document are replaced by algorithm-tagged
//! envelopes. Algorithms are pluggable [`CryptoProvider`]s held in a
//! [`FieldCryptoRegistry`]; key bytes are resolved per call through a host
//! supplied [`KeyProvider`].
//!
//! ```ignore
//! let keys = Arc::new(InMemoryKeyProvider::new()
//!     .with_key("orders-aes", aes_key)
//!     .with_key("orders-hmac", hmac_key));
//! let registry = FieldCryptoRegistry::new();
//! registry.register_provider(Arc::new(
//!     Aes256HmacSha256Provider::new(keys, "orders-aes", "orders-hmac"),
//! ));
//!
//! let transformer = FieldTransformer::new(registry);
//! let fields = [FieldSpec::new("card_number", "AES-256-HMAC-SHA256")];
//! let encrypted = transformer.encrypt_document(&order, &fields)?;
//! ```

pub mod config;
pub mod crypto;
pub mod keys;
pub mod registry;
pub mod telemetry;
pub mod transform;

#[cfg(test)]
mod test_support;

pub use common::{EncryptedFieldEnvelope, FieldCryptoError, FieldSpec, Result};
pub use config::Config;
pub use crypto::{
    Aes256HmacSha256Provider, CryptoProvider, MessageAuthenticator, Rsa2048OaepSha1Provider,
};
pub use keys::{CachingKeyProvider, InMemoryKeyProvider, KeyMaterial, KeyProvider};
pub use registry::FieldCryptoRegistry;
pub use transform::FieldTransformer;
