//! Wire types exchanged with the document-store layer.
//!
//! [`EncryptedFieldEnvelope`] is persisted inside documents in place of the
//! plaintext field, so its JSON shape must stay stable:
//!
//! ```text
//! {"alg": "...", "kid": "...", "iv": "<b64>", "ciphertext": "<b64>", "sig": "<b64>"}
//! ```
//!
//! `iv` is present iff the algorithm uses one and `sig` iff it signs. Byte
//! fields use standard padded base64.

use serde::{Deserialize, Serialize};

use crate::error::{FieldCryptoError, Result};

// ---------------------------------------------------------------------------
// Field options
// ---------------------------------------------------------------------------

/// Names one top-level document field to transform and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Top-level field name in the document.
    pub name: String,
    /// Registered algorithm name, e.g. `"AES-256-HMAC-SHA256"`.
    #[serde(rename = "alg")]
    pub algorithm: String,
    /// Overrides the provider's default key identifier.
    #[serde(rename = "kid", default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

impl FieldSpec {
    /// Transform field `name` with `algorithm` and its default key.
    pub fn new(name: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            algorithm: algorithm.into(),
            key_id: None,
        }
    }

    /// Use `key_id` instead of the provider's default key.
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// At-rest representation of one encrypted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptedFieldEnvelope {
    /// Algorithm tag; selects the crypto provider on decryption.
    pub alg: String,
    /// Identifier of the key the ciphertext was produced with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "b64_opt")]
    pub iv: Option<Vec<u8>>,
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "b64_opt")]
    pub sig: Option<Vec<u8>>,
}

impl EncryptedFieldEnvelope {
    /// The ordered chunks covered by the signature: algorithm tag, IV (if
    /// any), ciphertext, then the key identifier as associated data.
    pub fn signed_chunks(&self) -> Vec<&[u8]> {
        let mut chunks: Vec<&[u8]> = Vec::with_capacity(4);
        chunks.push(self.alg.as_bytes());
        if let Some(iv) = &self.iv {
            chunks.push(iv);
        }
        chunks.push(&self.ciphertext);
        if let Some(kid) = &self.kid {
            chunks.push(kid.as_bytes());
        }
        chunks
    }

    /// Encode as the JSON object stored in the document.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::InvalidEnvelope`] if serialisation fails.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| FieldCryptoError::InvalidEnvelope(e.to_string()))
    }

    /// Parse a document field value back into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::InvalidEnvelope`] if `value` is not an object
    /// of the expected shape or a byte field is not valid base64.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(FieldCryptoError::InvalidEnvelope(
                "expected a JSON object".into(),
            ));
        }
        Self::deserialize(value).map_err(|e| FieldCryptoError::InvalidEnvelope(e.to_string()))
    }
}

mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        STANDARD.decode(text).map_err(de::Error::custom)
    }
}

mod b64_opt {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_str(&STANDARD.encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|text| STANDARD.decode(text).map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> EncryptedFieldEnvelope {
        EncryptedFieldEnvelope {
            alg: "AES-256-HMAC-SHA256".into(),
            kid: Some("mykey".into()),
            iv: Some(vec![1; 16]),
            ciphertext: vec![0xAB; 32],
            sig: Some(vec![7; 32]),
        }
    }

    #[test]
    fn wire_shape_uses_base64_keys() {
        let v = sample().to_value().unwrap();
        assert_eq!(v["alg"], "AES-256-HMAC-SHA256");
        assert_eq!(v["kid"], "mykey");
        assert_eq!(v["iv"], "AQEBAQEBAQEBAQEBAQEBAQ==");
        assert!(v["ciphertext"].is_string());
        assert!(v["sig"].is_string());
    }

    #[test]
    fn absent_iv_and_sig_are_omitted() {
        let env = EncryptedFieldEnvelope {
            alg: "RSA-2048-OAEP-SHA1".into(),
            kid: None,
            iv: None,
            ciphertext: vec![1, 2, 3],
            sig: None,
        };
        let v = env.to_value().unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(!obj.contains_key("iv"));
        assert!(!obj.contains_key("sig"));
        assert_eq!(EncryptedFieldEnvelope::from_value(&v).unwrap(), env);
    }

    #[test]
    fn from_value_parses_stored_envelope() {
        let env = sample();
        let parsed = EncryptedFieldEnvelope::from_value(&env.to_value().unwrap()).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn from_value_rejects_plain_values() {
        assert!(EncryptedFieldEnvelope::from_value(&json!("hello")).is_err());
        assert!(EncryptedFieldEnvelope::from_value(&json!(10)).is_err());
        assert!(EncryptedFieldEnvelope::from_value(&json!({"myInt": 10})).is_err());
    }

    #[test]
    fn from_value_rejects_bad_base64() {
        let v = json!({"alg": "AES-256-HMAC-SHA256", "ciphertext": "!!!"});
        let err = EncryptedFieldEnvelope::from_value(&v).unwrap_err();
        assert!(matches!(err, FieldCryptoError::InvalidEnvelope(_)));
    }

    #[test]
    fn from_value_rejects_unknown_keys() {
        let v = json!({"alg": "x", "ciphertext": "AA==", "extra": 1});
        assert!(EncryptedFieldEnvelope::from_value(&v).is_err());
    }

    #[test]
    fn signed_chunks_order() {
        let env = sample();
        let chunks = env.signed_chunks();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], b"AES-256-HMAC-SHA256");
        assert_eq!(chunks[1], &[1u8; 16][..]);
        assert_eq!(chunks[2], &env.ciphertext[..]);
        assert_eq!(chunks[3], b"mykey");
    }

    #[test]
    fn field_spec_deserialises_short_keys() {
        let spec: FieldSpec =
            serde_json::from_value(json!({"name": "message", "kid": "k1", "alg": "AES-256-HMAC-SHA256"}))
                .unwrap();
        assert_eq!(
            spec,
            FieldSpec::new("message", "AES-256-HMAC-SHA256").with_key_id("k1")
        );
        let no_kid: FieldSpec =
            serde_json::from_value(json!({"name": "message", "alg": "RSA-2048-OAEP-SHA1"})).unwrap();
        assert_eq!(no_kid.key_id, None);
    }
}
