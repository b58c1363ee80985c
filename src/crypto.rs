//! At-rest encryption for persisted configurations
//!
//! Statement text and broker endpoints can carry credentials, so the file
//! store can seal the document before writing it. Supports key rotation
//! via key IDs: documents sealed with an older key stay readable.

use crate::error::{CepError, Result};
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, AeadCore, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Sealed document envelope written in place of the plain JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedDocument {
    /// Identifies which key was used for encryption
    pub key_id: String,

    /// Base64-encoded nonce (96-bit for AES-256-GCM)
    pub nonce: String,

    /// Base64-encoded ciphertext
    pub ciphertext: String,

    /// Marker to identify sealed documents
    #[serde(default = "default_encrypted")]
    pub encrypted: bool,
}

fn default_encrypted() -> bool {
    true
}

impl EncryptedDocument {
    /// Check if a JSON value is a sealed document
    pub fn is_encrypted(value: &serde_json::Value) -> bool {
        value
            .get("encrypted")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Trait for sealing and opening persisted documents
pub trait ConfigurationEncryptor: Send + Sync {
    /// Encrypt raw document bytes
    fn seal(&self, plaintext: &[u8]) -> Result<EncryptedDocument>;

    /// Decrypt a sealed document back to its raw bytes
    fn open(&self, document: &EncryptedDocument) -> Result<Vec<u8>>;

    /// The current active key ID used for sealing
    fn active_key_id(&self) -> &str;
}

/// AES-256-GCM encryptor with key rotation support
///
/// Seals with the active key, opens with any registered key.
pub struct Aes256GcmEncryptor {
    /// Active key ID for sealing
    active_key_id: String,

    /// All registered keys (key_id → cipher)
    keys: RwLock<HashMap<String, Aes256Gcm>>,
}

impl Aes256GcmEncryptor {
    /// Create a new encryptor with a single 256-bit key
    pub fn new(key_id: impl Into<String>, key: &[u8; 32]) -> Self {
        let key_id = key_id.into();
        let mut keys = HashMap::new();
        keys.insert(key_id.clone(), Aes256Gcm::new(key.into()));

        Self {
            active_key_id: key_id,
            keys: RwLock::new(keys),
        }
    }

    /// Create an encryptor from a base64-encoded 256-bit key
    pub fn from_base64(key_id: impl Into<String>, key: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(key)
            .map_err(|e| CepError::Crypto(format!("Invalid key encoding: {}", e)))?;
        let key: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CepError::Crypto(format!("Key must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Self::new(key_id, &key))
    }

    /// Add a key for opening older documents (key rotation)
    pub fn add_key(&self, key_id: impl Into<String>, key: &[u8; 32]) -> Result<()> {
        let mut keys = self.keys.write().map_err(|e| {
            CepError::Crypto(format!("Failed to acquire key lock: {}", e))
        })?;
        keys.insert(key_id.into(), Aes256Gcm::new(key.into()));
        Ok(())
    }

    /// Rotate to a new active key
    ///
    /// The new key must already be registered via `add_key()`.
    pub fn rotate_to(&mut self, key_id: &str) -> Result<()> {
        let keys = self.keys.read().map_err(|e| {
            CepError::Crypto(format!("Failed to acquire key lock: {}", e))
        })?;
        if !keys.contains_key(key_id) {
            return Err(CepError::Crypto(format!(
                "Key '{}' not registered, add it first",
                key_id
            )));
        }
        drop(keys);
        self.active_key_id = key_id.to_string();
        Ok(())
    }

    /// List all registered key IDs
    pub fn key_ids(&self) -> Vec<String> {
        self.keys
            .read()
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ConfigurationEncryptor for Aes256GcmEncryptor {
    fn seal(&self, plaintext: &[u8]) -> Result<EncryptedDocument> {
        let keys = self.keys.read().map_err(|e| {
            CepError::Crypto(format!("Failed to acquire key lock: {}", e))
        })?;
        let cipher = keys.get(&self.active_key_id).ok_or_else(|| {
            CepError::Crypto(format!("Active key '{}' not found", self.active_key_id))
        })?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| CepError::Crypto(format!("Encryption failed: {}", e)))?;

        Ok(EncryptedDocument {
            key_id: self.active_key_id.clone(),
            nonce: BASE64.encode(nonce),
            ciphertext: BASE64.encode(ciphertext),
            encrypted: true,
        })
    }

    fn open(&self, document: &EncryptedDocument) -> Result<Vec<u8>> {
        let keys = self.keys.read().map_err(|e| {
            CepError::Crypto(format!("Failed to acquire key lock: {}", e))
        })?;
        let cipher = keys.get(&document.key_id).ok_or_else(|| {
            CepError::Crypto(format!("Decryption key '{}' not registered", document.key_id))
        })?;

        let nonce_bytes = BASE64
            .decode(&document.nonce)
            .map_err(|e| CepError::Crypto(format!("Invalid nonce encoding: {}", e)))?;
        if nonce_bytes.len() != 12 {
            return Err(CepError::Crypto(format!(
                "Invalid nonce length: {}",
                nonce_bytes.len()
            )));
        }
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = BASE64
            .decode(&document.ciphertext)
            .map_err(|e| CepError::Crypto(format!("Invalid ciphertext encoding: {}", e)))?;

        cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|e| CepError::Crypto(format!("Decryption failed: {}", e)))
    }

    fn active_key_id(&self) -> &str {
        &self.active_key_id
    }
}
