//! Configuration persistence
//!
//! Provides pluggable persistence for the last accepted configuration so it
//! survives process restarts. The engine saves after every accepted swap and
//! loads once at startup through `ConfigurationEngine::restore`.

use crate::config::FileStoreConfig;
use crate::crypto::{ConfigurationEncryptor, EncryptedDocument};
use crate::error::PersistenceError;
use crate::types::Configuration;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Trait for durable configuration storage
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Persist a configuration, replacing any previously saved one
    async fn save(&self, configuration: &Configuration) -> Result<(), PersistenceError>;

    /// Load the last saved configuration, `None` if nothing was saved
    async fn load(&self) -> Result<Option<Configuration>, PersistenceError>;
}

/// JSON file-based configuration store
///
/// Atomic writes via temp file + rename to prevent corruption. When an
/// encryptor is configured the document is sealed before it touches disk.
pub struct FileConfigurationStore {
    path: PathBuf,
    pretty: bool,
    encryptor: Option<Arc<dyn ConfigurationEncryptor>>,
}

impl FileConfigurationStore {
    /// Create a new file store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: true,
            encryptor: None,
        }
    }

    /// Create a file store from settings
    pub fn from_config(config: &FileStoreConfig) -> Self {
        Self {
            path: config.path.clone(),
            pretty: config.pretty,
            encryptor: None,
        }
    }

    /// Seal persisted documents with the given encryptor
    pub fn with_encryptor(mut self, encryptor: Arc<dyn ConfigurationEncryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&self, configuration: &Configuration) -> Result<Vec<u8>, PersistenceError> {
        let encode_error =
            |e: serde_json::Error| PersistenceError::new(format!("Failed to encode configuration: {}", e));

        let value = match &self.encryptor {
            Some(encryptor) => {
                let plain = serde_json::to_vec(configuration).map_err(encode_error)?;
                let sealed = encryptor.seal(&plain).map_err(|e| {
                    PersistenceError::new(format!("Failed to seal configuration: {}", e))
                })?;
                serde_json::to_value(sealed).map_err(encode_error)?
            }
            None => serde_json::to_value(configuration).map_err(encode_error)?,
        };

        if self.pretty {
            serde_json::to_vec_pretty(&value).map_err(encode_error)
        } else {
            serde_json::to_vec(&value).map_err(encode_error)
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Configuration, PersistenceError> {
        let parse_error = |e: serde_json::Error| {
            PersistenceError::new(format!(
                "Failed to parse configuration file {}: {}",
                self.path.display(),
                e
            ))
        };

        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(parse_error)?;
        if !EncryptedDocument::is_encrypted(&value) {
            return serde_json::from_value(value).map_err(parse_error);
        }

        let encryptor = self.encryptor.as_ref().ok_or_else(|| {
            PersistenceError::new(format!(
                "Configuration file {} is encrypted but no encryptor is configured",
                self.path.display()
            ))
        })?;
        let sealed: EncryptedDocument = serde_json::from_value(value).map_err(parse_error)?;
        let plain = encryptor.open(&sealed).map_err(|e| {
            PersistenceError::new(format!("Failed to open configuration: {}", e))
        })?;
        serde_json::from_slice(&plain).map_err(parse_error)
    }
}

impl From<&FileStoreConfig> for FileConfigurationStore {
    fn from(config: &FileStoreConfig) -> Self {
        Self::from_config(config)
    }
}

#[async_trait]
impl ConfigurationStore for FileConfigurationStore {
    async fn save(&self, configuration: &Configuration) -> Result<(), PersistenceError> {
        let bytes = self.encode(configuration)?;

        // Atomic write: write to temp file, then rename
        let tmp_path = self.path.with_extension("tmp");

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    PersistenceError::new(format!(
                        "Failed to create configuration directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        tokio::fs::write(&tmp_path, bytes).await.map_err(|e| {
            PersistenceError::new(format!(
                "Failed to write configuration file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            PersistenceError::new(format!(
                "Failed to rename configuration file {} → {}: {}",
                tmp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(
            path = %self.path.display(),
            encrypted = self.encryptor.is_some(),
            "Configuration saved"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<Configuration>, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::new(format!(
                    "Failed to read configuration file {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let configuration = self.decode(&bytes)?;

        tracing::debug!(
            path = %self.path.display(),
            statements = configuration.statements.len(),
            "Configuration loaded"
        );
        Ok(Some(configuration))
    }
}

/// In-memory configuration store for testing
///
/// Stores the configuration in memory, lost on drop
#[derive(Default)]
pub struct MemoryConfigurationStore {
    state: RwLock<Option<Configuration>>,
    saves: std::sync::atomic::AtomicU64,
}

impl MemoryConfigurationStore {
    /// Create a store pre-populated with a configuration
    pub fn with_configuration(configuration: Configuration) -> Self {
        Self {
            state: RwLock::new(Some(configuration)),
            saves: Default::default(),
        }
    }

    /// Number of successful saves
    pub fn save_count(&self) -> u64 {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigurationStore for MemoryConfigurationStore {
    async fn save(&self, configuration: &Configuration) -> Result<(), PersistenceError> {
        let mut state = self.state.write().map_err(|e| {
            PersistenceError::new(format!("Failed to acquire state lock: {}", e))
        })?;
        *state = Some(configuration.clone());
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> Result<Option<Configuration>, PersistenceError> {
        let state = self.state.read().map_err(|e| {
            PersistenceError::new(format!("Failed to acquire state lock: {}", e))
        })?;
        Ok(state.clone())
    }
}
