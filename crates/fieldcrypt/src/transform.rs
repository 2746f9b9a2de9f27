//! Field-transform protocol: swaps plaintext document fields for encrypted
//! envelopes and back.
//!
//! # Encrypt path
//!
//! value → canonical JSON bytes → provider encrypt (fresh IV if the algorithm
//! uses one) → HMAC over `[alg, iv, ciphertext, kid]` if the provider signs →
//! [`EncryptedFieldEnvelope`] stored in place of the value.
//!
//! # Decrypt path
//!
//! envelope → algorithm tag must match the caller's field spec → provider
//! lookup → signature check (strictly before any decryption) → provider
//! decrypt → JSON value stored in place of the envelope.
//!
//! # Atomicity
//!
//! A multi-field call is all-or-nothing. Every field is transformed against
//! the untouched document first and the results are written back only when
//! all of them succeeded. On failure the document is left as it was and the
//! error names the offending field.

use std::collections::HashSet;

use common::{EncryptedFieldEnvelope, FieldCryptoError, FieldSpec, Result};
use serde_json::Value;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::registry::{self, FieldCryptoRegistry};

/// Encrypts and decrypts top-level document fields through a
/// [`FieldCryptoRegistry`].
#[derive(Clone, Debug, Default)]
pub struct FieldTransformer {
    registry: FieldCryptoRegistry,
}

impl FieldTransformer {
    /// Create a transformer dispatching through `registry`.
    pub fn new(registry: FieldCryptoRegistry) -> Self {
        Self { registry }
    }

    /// A transformer backed by the process-wide registry.
    pub fn with_global_registry() -> Self {
        Self::new(registry::global().clone())
    }

    /// The registry providers are looked up in.
    pub fn registry(&self) -> &FieldCryptoRegistry {
        &self.registry
    }

    /// Encrypt a single value according to `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::ProviderNotFound`] if `spec.algorithm` is not
    /// registered, or any key-resolution or cipher error from the provider.
    pub fn encrypt_value(&self, value: &Value, spec: &FieldSpec) -> Result<EncryptedFieldEnvelope> {
        let provider = self.registry.lookup(&spec.algorithm)?;

        // serde_json keeps the type of every value (10 vs "10") and, with
        // `preserve_order`, the key order of objects.
        let plaintext =
            Zeroizing::new(serde_json::to_vec(value).map_err(|_| FieldCryptoError::Encryption)?);

        let key_id = spec
            .key_id
            .clone()
            .unwrap_or_else(|| provider.key_id().to_owned());
        let iv = provider.generate_iv();
        let ciphertext = provider.encrypt(&plaintext, &key_id, iv.as_deref())?;

        let mut envelope = EncryptedFieldEnvelope {
            alg: spec.algorithm.clone(),
            kid: Some(key_id),
            iv,
            ciphertext,
            sig: None,
        };
        if let Some(authenticator) = provider.authenticator() {
            envelope.sig = Some(authenticator.sign(&envelope.signed_chunks())?);
        }
        Ok(envelope)
    }

    /// Verify and decrypt a single envelope according to `spec`.
    ///
    /// # Errors
    ///
    /// - [`FieldCryptoError::Integrity`] if the envelope's algorithm differs from
    ///   `spec.algorithm`, or its signature is missing or does not verify.
    /// - [`FieldCryptoError::ProviderNotFound`] if the algorithm is not registered.
    /// - [`FieldCryptoError::InvalidEnvelope`] if a non-signing algorithm's
    ///   envelope carries a signature.
    /// - [`FieldCryptoError::Decryption`] if decryption fails or the plaintext is
    ///   not a JSON value.
    pub fn decrypt_envelope(&self, envelope: &EncryptedFieldEnvelope, spec: &FieldSpec) -> Result<Value> {
        if envelope.alg != spec.algorithm {
            warn!(
                field = %spec.name,
                expected = %spec.algorithm,
                found = %envelope.alg,
                "envelope algorithm does not match field spec"
            );
            return Err(FieldCryptoError::Integrity);
        }

        let provider = self.registry.lookup(&envelope.alg)?;

        match (provider.authenticator(), envelope.sig.as_deref()) {
            (Some(authenticator), Some(sig)) => {
                if !authenticator.verify_signature(&envelope.signed_chunks(), sig)? {
                    warn!(field = %spec.name, algorithm = %envelope.alg, "signature verification failed");
                    return Err(FieldCryptoError::Integrity);
                }
            }
            (Some(_), None) => {
                warn!(field = %spec.name, algorithm = %envelope.alg, "envelope is missing its signature");
                return Err(FieldCryptoError::Integrity);
            }
            (None, Some(_)) => {
                return Err(FieldCryptoError::InvalidEnvelope(format!(
                    "{} does not sign, but the envelope carries a signature",
                    envelope.alg
                )));
            }
            (None, None) => {}
        }

        let key_id = spec
            .key_id
            .as_deref()
            .or(envelope.kid.as_deref())
            .unwrap_or_else(|| provider.key_id());
        let plaintext = Zeroizing::new(provider.decrypt(
            &envelope.ciphertext,
            key_id,
            envelope.iv.as_deref(),
        )?);

        serde_json::from_slice(&plaintext).map_err(|_| FieldCryptoError::Decryption)
    }

    /// Replace each field named in `fields` with its encrypted envelope.
    ///
    /// # Errors
    ///
    /// Fails without modifying `document` if it is not an object, a field is
    /// listed twice, or any field fails; per-field failures are wrapped in
    /// [`FieldCryptoError::Field`].
    pub fn encrypt_fields(&self, document: &mut Value, fields: &[FieldSpec]) -> Result<()> {
        transform_fields(document, fields, |value, spec| {
            let envelope = self.encrypt_value(value, spec)?;
            debug!(field = %spec.name, algorithm = %spec.algorithm, "field encrypted");
            envelope.to_value()
        })
    }

    /// Replace each envelope named in `fields` with its decrypted value.
    ///
    /// # Errors
    ///
    /// Same discipline as [`FieldTransformer::encrypt_fields`]. A field that is
    /// not an envelope fails with [`FieldCryptoError::InvalidEnvelope`].
    pub fn decrypt_fields(&self, document: &mut Value, fields: &[FieldSpec]) -> Result<()> {
        transform_fields(document, fields, |value, spec| {
            let envelope = EncryptedFieldEnvelope::from_value(value)?;
            let plaintext = self.decrypt_envelope(&envelope, spec)?;
            debug!(field = %spec.name, algorithm = %spec.algorithm, "field decrypted");
            Ok(plaintext)
        })
    }

    /// Like [`FieldTransformer::encrypt_fields`], returning a transformed copy.
    pub fn encrypt_document(&self, document: &Value, fields: &[FieldSpec]) -> Result<Value> {
        let mut out = document.clone();
        self.encrypt_fields(&mut out, fields)?;
        Ok(out)
    }

    /// Like [`FieldTransformer::decrypt_fields`], returning a transformed copy.
    pub fn decrypt_document(&self, document: &Value, fields: &[FieldSpec]) -> Result<Value> {
        let mut out = document.clone();
        self.decrypt_fields(&mut out, fields)?;
        Ok(out)
    }
}

/// Stage `op` over every listed field, then write all results back at once.
fn transform_fields<F>(document: &mut Value, fields: &[FieldSpec], mut op: F) -> Result<()>
where
    F: FnMut(&Value, &FieldSpec) -> Result<Value>,
{
    let object = document
        .as_object_mut()
        .ok_or(FieldCryptoError::InvalidDocument)?;

    let mut seen = HashSet::with_capacity(fields.len());
    for spec in fields {
        if !seen.insert(spec.name.as_str()) {
            return Err(FieldCryptoError::DuplicateField(spec.name.clone()));
        }
    }

    let mut staged = Vec::with_capacity(fields.len());
    for spec in fields {
        let result = object
            .get(&spec.name)
            .ok_or_else(|| FieldCryptoError::FieldNotFound(spec.name.clone()))
            .and_then(|value| op(value, spec));
        match result {
            Ok(next) => staged.push((spec.name.as_str(), next)),
            Err(e) => {
                warn!(field = %spec.name, code = e.code(), error = %e, "field transform failed");
                return Err(e.for_field(&spec.name));
            }
        }
    }

    for (name, next) in staged {
        if let Some(slot) = object.get_mut(name) {
            *slot = next;
        }
    }
    Ok(())
}
