//! Statement set: ordered compilation of continuous queries
//!
//! Compilation itself is delegated to a [`CepRuntime`]. This module
//! orchestrates it in submission order and attributes failures to the
//! statement that caused them.

use crate::error::{CepError, Result};
use crate::registry::EventTypeRegistry;
use crate::runtime::CepRuntime;
use serde::{Deserialize, Serialize};

/// A statement accepted by the processing runtime, ready to be activated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledStatement {
    /// Position in the submitted statement list
    pub index: usize,

    /// Original statement source
    pub source: String,

    /// Event type ids the statement consumes
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Event type ids the statement produces
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl CompiledStatement {
    /// Create a compiled statement with no resolved references
    pub fn new(index: usize, source: impl Into<String>) -> Self {
        Self {
            index,
            source: source.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

/// Compiled statements of one configuration, in submission order
#[derive(Debug, Clone, Default)]
pub struct StatementSet {
    statements: Vec<CompiledStatement>,
}

impl StatementSet {
    /// Compile every statement against the registry
    ///
    /// Stops at the first failure, which is reported as
    /// `CepError::StatementCompilation` carrying the statement index.
    pub async fn compile(
        statements: &[String],
        registry: &EventTypeRegistry,
        runtime: &dyn CepRuntime,
    ) -> Result<Self> {
        let mut compiled = Vec::with_capacity(statements.len());

        for (index, source) in statements.iter().enumerate() {
            if source.trim().is_empty() {
                return Err(CepError::StatementCompilation {
                    index,
                    reason: "Empty statement".to_string(),
                    detail: format!("Statement #{} has no source text", index),
                });
            }

            let statement = runtime
                .compile(index, source, registry)
                .await
                .map_err(|e| attribute(index, e))?;
            compiled.push(statement);
        }

        tracing::debug!(
            runtime = runtime.name(),
            statements = compiled.len(),
            "Statements compiled"
        );

        Ok(Self {
            statements: compiled,
        })
    }

    /// Number of compiled statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Iterate compiled statements in submission order
    pub fn iter(&self) -> impl Iterator<Item = &CompiledStatement> {
        self.statements.iter()
    }

    /// Take ownership of the compiled statements
    pub fn into_inner(self) -> Vec<CompiledStatement> {
        self.statements
    }
}

fn attribute(index: usize, err: CepError) -> CepError {
    match err {
        CepError::Compilation { reason, detail } => CepError::StatementCompilation {
            index,
            reason,
            detail,
        },
        already @ CepError::StatementCompilation { .. } => already,
        other => CepError::StatementCompilation {
            index,
            reason: "Statement compilation failed".to_string(),
            detail: other.to_string(),
        },
    }
}
