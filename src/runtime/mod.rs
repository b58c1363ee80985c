//! Processing runtime trait: the capability that compiles and runs statements
//!
//! The configuration engine never evaluates queries itself. Any event
//! processing backend (an embedded engine, a remote cluster, the in-memory
//! runtime used for tests) implements `CepRuntime`.

use crate::error::Result;
use crate::registry::EventTypeRegistry;
use crate::statement::CompiledStatement;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod memory;

/// Core trait for processing runtimes
///
/// `compile` must not change what is running. `activate` installs a whole
/// statement set as one deployment; the previous deployment keeps running
/// until `deactivate` is called for it.
#[async_trait]
pub trait CepRuntime: Send + Sync {
    /// Compile one statement against the declared event types
    ///
    /// Rejections should be reported as `CepError::Compilation` so the
    /// reason and detail reach the caller unchanged.
    async fn compile(
        &self,
        index: usize,
        source: &str,
        registry: &EventTypeRegistry,
    ) -> Result<CompiledStatement>;

    /// Install compiled statements, returning the new deployment id
    async fn activate(
        &self,
        statements: Vec<CompiledStatement>,
        registry: Arc<EventTypeRegistry>,
    ) -> Result<DeploymentId>;

    /// Stop and discard a deployment
    async fn deactivate(&self, deployment: &DeploymentId) -> Result<()>;

    /// Describe what is currently running
    async fn snapshot(&self) -> Result<RuntimeSnapshot>;

    /// Runtime name (e.g., "memory")
    fn name(&self) -> &str;
}

/// Identifier of a set of statements installed together
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(String);

impl DeploymentId {
    /// Generate a new unique deployment id (dep-<uuid>)
    pub fn generate() -> Self {
        Self(format!("dep-{}", uuid::Uuid::new_v4()))
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeploymentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DeploymentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One running deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSnapshot {
    /// Deployment id
    pub id: DeploymentId,

    /// Statement sources in submission order
    pub statements: Vec<String>,

    /// Input event type ids known to the deployment
    pub inputs: Vec<String>,

    /// Output event type ids known to the deployment
    pub outputs: Vec<String>,

    /// When the deployment was activated
    pub activated_at: DateTime<Utc>,
}

/// Runtime introspection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSnapshot {
    /// Runtime name
    pub runtime: String,

    /// Running deployments, oldest first
    pub deployments: Vec<DeploymentSnapshot>,
}

impl RuntimeSnapshot {
    /// Statement sources of the newest deployment
    pub fn current_statements(&self) -> &[String] {
        self.deployments
            .last()
            .map(|d| d.statements.as_slice())
            .unwrap_or(&[])
    }
}
