//! Configuration loading and validation for provider registration.
//!
//! Values come from an optional JSON file overlaid with environment variables
//! prefixed `FIELDCRYPT`, using `__` to separate nesting levels:
//!
//! ```text
//! FIELDCRYPT__AES__KEY_ID=orders-aes
//! FIELDCRYPT__AES__HMAC_KEY_ID=orders-hmac
//! FIELDCRYPT__RSA__PUBLIC_KEY_ID=orders-rsa-pub
//! FIELDCRYPT__RSA__PRIVATE_KEY_ID=orders-rsa-priv
//! FIELDCRYPT__LOG_LEVEL=debug
//! ```
//!
//! Only key *identifiers* are configured here. Key bytes always come from the
//! host's [`KeyProvider`].

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::crypto::{aes_hmac, rsa_oaep, Aes256HmacSha256Provider, Rsa2048OaepSha1Provider};
use crate::keys::KeyProvider;
use crate::registry::FieldCryptoRegistry;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FIELDCRYPT";

/// Validated field-encryption configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Settings for the AES-256-HMAC-SHA256 provider; not registered if absent.
    #[serde(default)]
    pub aes: Option<AesConfig>,

    /// Settings for the RSA-2048-OAEP-SHA1 provider; not registered if absent.
    #[serde(default)]
    pub rsa: Option<RsaConfig>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AesConfig {
    /// Encryption key identifier. **Required.**
    pub key_id: String,
    /// HMAC key identifier. **Required.**
    pub hmac_key_id: String,
    /// Registry name; doubles as the envelope tag.
    #[serde(default = "default_aes_algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RsaConfig {
    /// Public key identifier. **Required.**
    pub public_key_id: String,
    /// Private key identifier. **Required.**
    pub private_key_id: String,
    /// Registry name; doubles as the envelope tag.
    #[serde(default = "default_rsa_algorithm")]
    pub algorithm: String,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_aes_algorithm() -> String {
    aes_hmac::ALGORITHM.into()
}
fn default_rsa_algorithm() -> String {
    rsa_oaep::ALGORITHM.into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or validation fails.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load `file` (JSON) if given, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed, a variable cannot
    /// be parsed, or validation fails.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(true),
            );
        }
        let cfg = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("failed to build field-encryption configuration")?;

        Self::finish(cfg)
    }

    /// Parse and validate configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is malformed or validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()
            .context("failed to parse field-encryption configuration")?;

        Self::finish(cfg)
    }

    fn finish(cfg: config::Config) -> Result<Self> {
        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise field-encryption configuration")?;
        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.aes.is_none() && self.rsa.is_none() {
            anyhow::bail!("at least one of AES or RSA must be configured");
        }
        if let Some(aes) = &self.aes {
            ensure_non_empty(&aes.key_id, "AES__KEY_ID")?;
            ensure_non_empty(&aes.hmac_key_id, "AES__HMAC_KEY_ID")?;
            ensure_non_empty(&aes.algorithm, "AES__ALGORITHM")?;
        }
        if let Some(rsa) = &self.rsa {
            ensure_non_empty(&rsa.public_key_id, "RSA__PUBLIC_KEY_ID")?;
            ensure_non_empty(&rsa.private_key_id, "RSA__PRIVATE_KEY_ID")?;
            ensure_non_empty(&rsa.algorithm, "RSA__ALGORITHM")?;
        }
        if let (Some(aes), Some(rsa)) = (&self.aes, &self.rsa) {
            if aes.algorithm == rsa.algorithm {
                anyhow::bail!("AES and RSA must be registered under different names");
            }
        }
        Ok(())
    }

    /// Register every configured provider into `registry`.
    pub fn register_into(&self, registry: &FieldCryptoRegistry, key_provider: Arc<dyn KeyProvider>) {
        if let Some(aes) = &self.aes {
            registry.register(
                aes.algorithm.clone(),
                Arc::new(Aes256HmacSha256Provider::new(
                    Arc::clone(&key_provider),
                    aes.key_id.clone(),
                    aes.hmac_key_id.clone(),
                )),
            );
        }
        if let Some(rsa) = &self.rsa {
            registry.register(
                rsa.algorithm.clone(),
                Arc::new(Rsa2048OaepSha1Provider::new(
                    Arc::clone(&key_provider),
                    rsa.public_key_id.clone(),
                    rsa.private_key_id.clone(),
                )),
            );
        }
        info!(algorithms = ?registry.names(), "crypto providers registered from configuration");
    }

    /// A new registry holding every configured provider.
    pub fn build_registry(&self, key_provider: Arc<dyn KeyProvider>) -> FieldCryptoRegistry {
        let registry = FieldCryptoRegistry::new();
        self.register_into(&registry, key_provider);
        registry
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{ENV_PREFIX}__{name} is required and must not be empty");
    }
    Ok(())
}
