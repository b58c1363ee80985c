//! Error types for a3s-cep

use crate::types::Category;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating, compiling, or storing configurations
#[derive(Debug, Error)]
pub enum CepError {
    /// An id repeats within one category
    #[error("Duplicate {category} event type id '{id}'")]
    DuplicateId { category: Category, id: String },

    /// A statement or lookup names an undeclared event type
    #[error("Unknown {category} event type '{id}'")]
    UnknownType { category: Category, id: String },

    /// An event type declaration is malformed
    #[error("Invalid {category} event type '{id}': {reason}")]
    InvalidEventType {
        category: Category,
        id: String,
        reason: String,
    },

    /// An id is declared both as input and as output
    #[error("Event type id '{id}' is declared both as input and output")]
    CrossCategoryCollision { id: String },

    /// The processing engine refused a statement
    #[error("{reason}: {detail}")]
    Compilation { reason: String, detail: String },

    /// A statement failed to compile, attributed to its position
    #[error("Statement #{index} failed to compile: {reason}: {detail}")]
    StatementCompilation {
        index: usize,
        reason: String,
        detail: String,
    },

    /// Processing engine failure unrelated to a specific statement
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid crate configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption/decryption failure
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl CepError {
    /// Short summary used as the rejection reason phrase
    pub fn reason_phrase(&self) -> String {
        match self {
            CepError::DuplicateId { .. } => "Duplicate event type id".to_string(),
            CepError::UnknownType { .. } => "Unknown event type".to_string(),
            CepError::InvalidEventType { .. } => "Invalid event type".to_string(),
            CepError::CrossCategoryCollision { .. } => "Conflicting event type id".to_string(),
            CepError::Compilation { reason, .. } => reason.clone(),
            CepError::StatementCompilation { reason, .. } => reason.clone(),
            CepError::Runtime(_) => "Processing engine error".to_string(),
            CepError::Serialization(_) => "Malformed configuration document".to_string(),
            CepError::Config(_) => "Invalid configuration".to_string(),
            CepError::Crypto(_) => "Encryption error".to_string(),
        }
    }
}

/// Result type alias for a3s-cep operations
pub type Result<T> = std::result::Result<T, CepError>;

/// The submitted configuration was rejected; nothing changed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{reason_phrase}: {detail}")]
pub struct ConfigurationError {
    /// Rejection summary
    pub reason_phrase: String,

    /// Underlying cause
    pub detail: String,

    /// Index of the failing statement, when a statement caused the rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<usize>,
}

impl ConfigurationError {
    /// Create a configuration error from a summary and a cause
    pub fn new(reason_phrase: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            reason_phrase: reason_phrase.into(),
            detail: detail.into(),
            statement: None,
        }
    }
}

impl From<CepError> for ConfigurationError {
    fn from(err: CepError) -> Self {
        match err {
            CepError::Compilation { reason, detail } => Self::new(reason, detail),
            CepError::StatementCompilation {
                index,
                reason,
                detail,
            } => Self {
                reason_phrase: reason,
                detail,
                statement: Some(index),
            },
            other => Self::new(other.reason_phrase(), other.to_string()),
        }
    }
}

/// The configuration is running but could not be durably saved
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("Persistence error: {reason_phrase}")]
pub struct PersistenceError {
    /// Failure summary
    pub reason_phrase: String,
}

impl PersistenceError {
    /// Create a persistence error
    pub fn new(reason_phrase: impl Into<String>) -> Self {
        Self {
            reason_phrase: reason_phrase.into(),
        }
    }
}

/// Outcome of a failed `set_configuration`
///
/// The two kinds are never merged: a `Configuration` error means the
/// previous configuration is still active, a `Persistence` error means the
/// new one is active but not durable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl ApplyError {
    /// Whether the submitted configuration is running despite the error
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyError::Persistence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compilation_maps_verbatim() {
        let err = ConfigurationError::from(CepError::Compilation {
            reason: "ERROR".to_string(),
            detail: "DETAIL ERROR".to_string(),
        });
        assert_eq!(err.reason_phrase, "ERROR");
        assert_eq!(err.detail, "DETAIL ERROR");
        assert_eq!(err.statement, None);
    }

    #[test]
    fn test_statement_compilation_keeps_index() {
        let err = ConfigurationError::from(CepError::StatementCompilation {
            index: 2,
            reason: "Unknown event type".to_string(),
            detail: "no such stream X".to_string(),
        });
        assert_eq!(err.statement, Some(2));
        assert_eq!(err.reason_phrase, "Unknown event type");
    }

    #[test]
    fn test_registry_error_detail_names_id() {
        let err = ConfigurationError::from(CepError::DuplicateId {
            category: Category::Output,
            id: "OUT1".to_string(),
        });
        assert_eq!(err.reason_phrase, "Duplicate event type id");
        assert!(err.detail.contains("OUT1"));
        assert!(err.detail.contains("output"));
    }

    #[test]
    fn test_apply_error_kinds() {
        let rejected = ApplyError::from(ConfigurationError::new("bad", "worse"));
        let unsaved = ApplyError::from(PersistenceError::new("disk full"));
        assert!(!rejected.is_applied());
        assert!(unsaved.is_applied());
        assert_eq!(unsaved.to_string(), "Persistence error: disk full");
    }
}
