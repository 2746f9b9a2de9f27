//! Shared error taxonomy and envelope wire types for the `fieldcrypt` crates.

pub mod error;
pub mod protocol;

pub use error::{FieldCryptoError, Result};
pub use protocol::{EncryptedFieldEnvelope, FieldSpec};
