//! Configuration engine: validation and atomic swap of the running configuration
//!
//! `ConfigurationEngine` drives a `CepRuntime` and a `ConfigurationStore`:
//! a submitted configuration is validated and compiled first, swapped in
//! only when both succeed, and persisted after the swap.

use crate::config::EngineConfig;
use crate::error::{ApplyError, ConfigurationError, PersistenceError};
use crate::registry::EventTypeRegistry;
use crate::runtime::{CepRuntime, DeploymentId, RuntimeSnapshot};
use crate::slot::{ActiveConfiguration, ActiveConfigurationSlot};
use crate::state::ConfigurationStore;
use crate::statement::StatementSet;
use crate::types::Configuration;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineState {
    /// No configuration was ever accepted
    Unconfigured,
    /// A configuration is running
    Configured,
}

/// Point-in-time engine status
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub state: EngineState,

    /// Revision of the active configuration, 0 when unconfigured
    pub revision: u64,

    /// Whether the active configuration is known to be saved
    pub durable: bool,

    /// Runtime name
    pub runtime: String,
}

/// Writer-side state, guarded by the apply lock
#[derive(Default)]
struct Deployment {
    current: Option<DeploymentId>,
}

/// Owns the active configuration and serializes reconfiguration
///
/// Readers (`get_configuration`, `active`, `state`, `status`) never wait on a
/// reconfiguration in progress. Writers (`set_configuration`, `restore`,
/// `persist_active`) run one at a time.
pub struct ConfigurationEngine {
    runtime: Arc<dyn CepRuntime>,
    store: Arc<dyn ConfigurationStore>,
    config: EngineConfig,
    slot: ActiveConfigurationSlot,
    deployment: Mutex<Deployment>,
    /// Last revision known to be saved, written only under the apply lock
    durable_revision: AtomicU64,
}

impl ConfigurationEngine {
    /// Create an engine over a runtime and a store
    pub fn new(
        runtime: Arc<dyn CepRuntime>,
        store: Arc<dyn ConfigurationStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            runtime,
            store,
            config,
            slot: ActiveConfigurationSlot::new(),
            deployment: Mutex::new(Deployment::default()),
            durable_revision: AtomicU64::new(0),
        }
    }

    /// The active configuration document, `None` before the first accepted one
    pub fn get_configuration(&self) -> Option<Arc<Configuration>> {
        self.slot.get().map(|active| Arc::clone(&active.configuration))
    }

    /// The active configuration with its activation metadata
    pub fn active(&self) -> Option<Arc<ActiveConfiguration>> {
        self.slot.get()
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        if self.slot.is_empty() {
            EngineState::Unconfigured
        } else {
            EngineState::Configured
        }
    }

    /// Status including durability of the active configuration
    pub fn status(&self) -> EngineStatus {
        let revision = self.slot.revision();
        EngineStatus {
            state: self.state(),
            revision,
            durable: revision > 0 && self.durable_revision.load(Ordering::Acquire) == revision,
            runtime: self.runtime.name().to_string(),
        }
    }

    /// Watch configuration swaps
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ActiveConfiguration>>> {
        self.slot.subscribe()
    }

    /// Stream of configuration swaps, starting with the current value
    pub fn changes(&self) -> WatchStream<Option<Arc<ActiveConfiguration>>> {
        WatchStream::new(self.slot.subscribe())
    }

    /// What the runtime is currently running
    pub async fn runtime_snapshot(&self) -> crate::Result<RuntimeSnapshot> {
        self.runtime.snapshot().await
    }

    /// Engine settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate, activate, and persist a new configuration
    ///
    /// On `ApplyError::Configuration` nothing changed. On
    /// `ApplyError::Persistence` the configuration is active but not saved;
    /// `persist_active` retries the save.
    pub async fn set_configuration(
        &self,
        candidate: Configuration,
    ) -> Result<Arc<ActiveConfiguration>, ApplyError> {
        let mut deployment = self.deployment.lock().await;

        let active = self.install(&mut deployment, candidate).await?;

        match self.store.save(&active.configuration).await {
            Ok(()) => {
                self.durable_revision.store(active.revision, Ordering::Release);
                Ok(active)
            }
            Err(e) => {
                tracing::warn!(
                    revision = active.revision,
                    error = %e,
                    "Configuration active but not persisted"
                );
                Err(e.into())
            }
        }
    }

    /// Save the active configuration again without re-validating it
    pub async fn persist_active(&self) -> Result<(), PersistenceError> {
        let _apply = self.deployment.lock().await;
        let Some(active) = self.slot.get() else {
            return Ok(());
        };
        if self.durable_revision.load(Ordering::Acquire) == active.revision {
            return Ok(());
        }

        self.store.save(&active.configuration).await.map_err(|e| {
            tracing::warn!(revision = active.revision, error = %e, "Persistence retry failed");
            e
        })?;
        self.durable_revision.store(active.revision, Ordering::Release);

        tracing::info!(revision = active.revision, "Active configuration persisted");
        Ok(())
    }

    /// Reinstate the last saved configuration at startup
    ///
    /// The loaded document goes through the same validation as a submitted
    /// one but is not saved again.
    pub async fn restore(&self) -> Result<Option<Arc<ActiveConfiguration>>, ApplyError> {
        let mut deployment = self.deployment.lock().await;

        let Some(saved) = self.store.load().await? else {
            tracing::info!("No saved configuration to restore");
            return Ok(None);
        };

        let active = self.install(&mut deployment, saved).await?;
        self.durable_revision.store(active.revision, Ordering::Release);

        tracing::info!(revision = active.revision, "Saved configuration restored");
        Ok(Some(active))
    }

    /// Validate, compile, activate, and swap. Caller holds the apply lock.
    async fn install(
        &self,
        deployment: &mut Deployment,
        candidate: Configuration,
    ) -> Result<Arc<ActiveConfiguration>, ConfigurationError> {
        let registry = EventTypeRegistry::build(&candidate, self.config.id_collision)
            .map_err(|e| self.rejected(e))?;

        let statements = StatementSet::compile(&candidate.statements, &registry, self.runtime.as_ref())
            .await
            .map_err(|e| self.rejected(e))?;

        let deployment_id = self
            .runtime
            .activate(statements.into_inner(), Arc::new(registry))
            .await
            .map_err(|e| self.rejected(e))?;

        let active = Arc::new(ActiveConfiguration {
            revision: self.slot.revision() + 1,
            accepted_at: Utc::now(),
            deployment: deployment_id.clone(),
            configuration: Arc::new(candidate),
        });
        self.slot.swap(Arc::clone(&active));

        if let Some(previous) = deployment.current.replace(deployment_id) {
            if let Err(e) = self.runtime.deactivate(&previous).await {
                tracing::warn!(
                    deployment = %previous,
                    error = %e,
                    "Failed to tear down previous deployment"
                );
            }
        }

        tracing::info!(
            revision = active.revision,
            deployment = %active.deployment,
            inputs = active.configuration.event_type_ins.len(),
            outputs = active.configuration.event_type_outs.len(),
            statements = active.configuration.statements.len(),
            "Configuration activated"
        );

        Ok(active)
    }

    fn rejected(&self, err: crate::CepError) -> ConfigurationError {
        let err = ConfigurationError::from(err);
        tracing::warn!(
            reason = %err.reason_phrase,
            detail = %err.detail,
            statement = ?err.statement,
            "Configuration rejected"
        );
        err
    }
}
