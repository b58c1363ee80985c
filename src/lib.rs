//! # a3s-cep
//!
//! Hot reconfiguration, validation, and persistence of complex event
//! processing rules for the A3S ecosystem.
//!
//! ## Overview
//!
//! `a3s-cep` manages the live configuration of a CEP engine: declared input
//! event types, declared output event types, and the continuous query
//! statements that connect them. A submitted configuration is validated,
//! compiled, swapped in atomically, and persisted so it survives restarts.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_cep::{Configuration, ConfigurationEngine, EngineConfig, EventTypeIn, EventTypeOut};
//! use a3s_cep::{MemoryConfigurationStore, MemoryRuntime};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), a3s_cep::ApplyError> {
//! let engine = ConfigurationEngine::new(
//!     Arc::new(MemoryRuntime::default()),
//!     Arc::new(MemoryConfigurationStore::default()),
//!     EngineConfig::default(),
//! );
//!
//! let active = engine
//!     .set_configuration(
//!         Configuration::new()
//!             .with_input(EventTypeIn::new("Room"))
//!             .with_output(EventTypeOut::new("HotRoom"))
//!             .with_statement("insert into HotRoom select * from Room where temperature > 30"),
//!     )
//!     .await?;
//!
//! println!("Running revision {}", active.revision);
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure kinds
//!
//! - **ConfigurationError**: the document was rejected, the previous
//!   configuration is still running
//! - **PersistenceError**: the document is running but was not saved;
//!   retry with `ConfigurationEngine::persist_active`
//!
//! ## Architecture
//!
//! - **CepRuntime** trait: the processing engine that compiles and runs statements
//! - **ConfigurationStore** trait: durable storage of the accepted configuration
//! - **ConfigurationEngine**: validation, atomic swap, persistence
//! - **AdminGateway**: maps engine outcomes to admin API responses

pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod runtime;
pub mod slot;
pub mod state;
pub mod statement;
pub mod types;

// Re-export core types
pub use config::{EngineConfig, FileStoreConfig, IdCollisionPolicy};
pub use crypto::{Aes256GcmEncryptor, ConfigurationEncryptor, EncryptedDocument};
pub use engine::{ConfigurationEngine, EngineState, EngineStatus};
pub use error::{ApplyError, CepError, ConfigurationError, PersistenceError, Result};
pub use gateway::{AdminGateway, AdminResponse, ErrorBody, ADMIN_CONFIG_PATH};
pub use registry::EventTypeRegistry;
pub use runtime::{CepRuntime, DeploymentId, DeploymentSnapshot, RuntimeSnapshot};
pub use slot::{ActiveConfiguration, ActiveConfigurationSlot};
pub use state::{ConfigurationStore, FileConfigurationStore, MemoryConfigurationStore};
pub use statement::{CompiledStatement, StatementSet};
pub use types::{Attribute, Category, Configuration, Endpoint, EventType, EventTypeIn, EventTypeOut};

// Re-export the in-memory runtime for convenience
pub use runtime::memory::{MemoryConfig, MemoryRuntime};
