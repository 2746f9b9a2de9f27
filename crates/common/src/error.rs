//! Error taxonomy shared across crates.

use thiserror::Error;

/// Convenience alias used throughout the field-encryption layer.
pub type Result<T, E = FieldCryptoError> = std::result::Result<T, E>;

/// Every failure the field-encryption layer can surface.
///
/// None of these are transient; callers should not retry. Cipher failures are
/// deliberately opaque: [`FieldCryptoError::Decryption`] never says whether the
/// key, the padding, or the ciphertext length was at fault.
#[derive(Debug, Error)]
pub enum FieldCryptoError {
    /// The key provider does not know the requested key identifier.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// No crypto provider is registered under the algorithm name.
    #[error("no crypto provider registered for algorithm: {0}")]
    ProviderNotFound(String),

    /// The underlying cipher failed to encrypt.
    #[error("encryption failed")]
    Encryption,

    /// The underlying cipher failed to decrypt.
    #[error("decryption failed")]
    Decryption,

    /// Signature verification failed. Raised before any decryption attempt.
    #[error("integrity check failed")]
    Integrity,

    /// The requested field is absent from the document.
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// The field value is not a well-formed encrypted envelope.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// The document is not a JSON object.
    #[error("document must be a JSON object")]
    InvalidDocument,

    /// The same field was named more than once in a single transform.
    #[error("field listed more than once: {0}")]
    DuplicateField(String),

    /// A per-field failure, naming the field it happened on.
    #[error("field `{field}` failed")]
    Field {
        field: String,
        #[source]
        source: Box<FieldCryptoError>,
    },
}

impl FieldCryptoError {
    /// Attach the name of the field being transformed.
    pub fn for_field(self, field: impl Into<String>) -> Self {
        FieldCryptoError::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through any [`FieldCryptoError::Field`] wrappers.
    pub fn root(&self) -> &FieldCryptoError {
        match self {
            FieldCryptoError::Field { source, .. } => source.root(),
            other => other,
        }
    }

    /// Short machine-readable code, safe to put in log fields.
    pub fn code(&self) -> &'static str {
        match self.root() {
            FieldCryptoError::KeyNotFound(_) => "key_not_found",
            FieldCryptoError::ProviderNotFound(_) => "provider_not_found",
            FieldCryptoError::Encryption => "encryption_error",
            FieldCryptoError::Decryption => "decryption_error",
            FieldCryptoError::Integrity => "integrity_error",
            FieldCryptoError::FieldNotFound(_) => "field_not_found",
            FieldCryptoError::InvalidEnvelope(_) => "invalid_envelope",
            FieldCryptoError::InvalidDocument => "invalid_document",
            FieldCryptoError::DuplicateField(_) => "duplicate_field",
            FieldCryptoError::Field { .. } => "field_error",
        }
    }
}
