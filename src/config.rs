//! Engine and store configuration

use crate::error::{CepError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether an id may be declared both as an input and an output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdCollisionPolicy {
    /// Reject configurations that reuse an input id as an output id
    #[default]
    Reject,
    /// Allow the same id in both categories
    Allow,
}

/// Configuration engine settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Cross-category id policy applied when building the registry
    pub id_collision: IdCollisionPolicy,
}

impl EngineConfig {
    /// Parse engine settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CepError::Config(format!("Invalid engine config: {}", e)))
    }

    /// Set the cross-category id policy
    pub fn with_id_collision(mut self, policy: IdCollisionPolicy) -> Self {
        self.id_collision = policy;
        self
    }
}

/// File-backed configuration store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileStoreConfig {
    /// Location of the persisted configuration document
    pub path: PathBuf,

    /// Pretty-print the persisted JSON
    pub pretty: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/configuration.json"),
            pretty: true,
        }
    }
}
