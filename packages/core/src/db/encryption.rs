//! Structure-preserving encryption of stored JSON
//!
//! Key management is external: callers supply a [`Cipher`] that seals and
//! opens strings. [`encrypt_value`] walks a JSON value, keeps objects and
//! arrays as they are and replaces every scalar leaf with a sentinel-prefixed
//! ciphertext of its JSON text. Leaves that already carry the sentinel are
//! left alone, so encrypting twice is the same as encrypting once.
//!
//! That shortcut means user text which happens to start with the sentinel
//! must be passed through [`escape_plaintext`] before it is stored, and
//! [`unescape_plaintext`] after it is read back.

use super::error::DatabaseError;
use serde_json::Value;

/// Marks a string leaf as ciphertext
pub const ENCRYPTED_PREFIX: &str = "enc:v1:";

/// Marks a plaintext string leaf that would otherwise read as ciphertext
pub const PLAIN_ESCAPE_PREFIX: &str = "enc:plain:";

/// Opaque encrypt/decrypt capability
pub trait Cipher: Send + Sync {
    fn seal(&self, plaintext: &str) -> anyhow::Result<String>;
    fn open(&self, ciphertext: &str) -> anyhow::Result<String>;
}

pub fn is_encrypted(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.starts_with(ENCRYPTED_PREFIX))
}

/// Encrypt every scalar leaf of `value`; `null` stays `null`
pub fn encrypt_value(value: &Value, cipher: &dyn Cipher) -> Result<Value, DatabaseError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Object(map) => map
            .iter()
            .map(|(key, v)| Ok((key.clone(), encrypt_value(v, cipher)?)))
            .collect::<Result<serde_json::Map<_, _>, DatabaseError>>()
            .map(Value::Object),
        Value::Array(items) => items
            .iter()
            .map(|v| encrypt_value(v, cipher))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        leaf if is_encrypted(leaf) => Ok(leaf.clone()),
        leaf => {
            let plaintext = serde_json::to_string(leaf)?;
            let sealed = cipher
                .seal(&plaintext)
                .map_err(|e| DatabaseError::encryption(e.to_string()))?;
            Ok(Value::String(format!("{}{}", ENCRYPTED_PREFIX, sealed)))
        }
    }
}

/// Inverse of [`encrypt_value`]; unencrypted leaves pass through unchanged
pub fn decrypt_value(value: &Value, cipher: &dyn Cipher) -> Result<Value, DatabaseError> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, v)| Ok((key.clone(), decrypt_value(v, cipher)?)))
            .collect::<Result<serde_json::Map<_, _>, DatabaseError>>()
            .map(Value::Object),
        Value::Array(items) => items
            .iter()
            .map(|v| decrypt_value(v, cipher))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::String(s) => match s.strip_prefix(ENCRYPTED_PREFIX) {
            Some(sealed) => {
                let plaintext = cipher
                    .open(sealed)
                    .map_err(|e| DatabaseError::encryption(e.to_string()))?;
                Ok(serde_json::from_str(&plaintext)?)
            }
            None => Ok(value.clone()),
        },
        other => Ok(other.clone()),
    }
}

/// Prefix string leaves that start with [`ENCRYPTED_PREFIX`] or
/// [`PLAIN_ESCAPE_PREFIX`], so no plaintext leaf is mistaken for ciphertext
pub fn escape_plaintext(value: &Value) -> Value {
    map_strings(value, &|s| {
        if s.starts_with(ENCRYPTED_PREFIX) || s.starts_with(PLAIN_ESCAPE_PREFIX) {
            format!("{}{}", PLAIN_ESCAPE_PREFIX, s)
        } else {
            s.to_string()
        }
    })
}

/// Inverse of [`escape_plaintext`]
pub fn unescape_plaintext(value: &Value) -> Value {
    map_strings(value, &|s| {
        s.strip_prefix(PLAIN_ESCAPE_PREFIX).unwrap_or(s).to_string()
    })
}

fn map_strings(value: &Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| (key.clone(), map_strings(v, f)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| map_strings(v, f)).collect()),
        other => other.clone(),
    }
}
