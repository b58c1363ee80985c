//! Test doubles shared by the integration tests

#![allow(dead_code)]

use a3s_cep::{
    CepError, CepRuntime, CompiledStatement, Configuration, ConfigurationStore, DeploymentId,
    EventTypeIn, EventTypeOut, EventTypeRegistry, MemoryRuntime, PersistenceError,
    RuntimeSnapshot,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn basic_conf() -> Configuration {
    Configuration::new()
        .with_input(EventTypeIn::new("S.*"))
        .with_output(EventTypeOut::new("OUT1"))
        .with_statement("select * from S.*")
}

/// Runtime that delegates to `MemoryRuntime` unless told to reject
#[derive(Default)]
pub struct ScriptedRuntime {
    inner: MemoryRuntime,
    rejection: Mutex<Option<(String, String)>>,
    compiled: Mutex<Vec<String>>,
}

impl ScriptedRuntime {
    /// Reject every statement with the given reason and detail
    pub fn reject_with(&self, reason: &str, detail: &str) {
        *self.rejection.lock().unwrap() = Some((reason.to_string(), detail.to_string()));
    }

    pub fn accept_all(&self) {
        *self.rejection.lock().unwrap() = None;
    }

    /// Statement sources seen by `compile`
    pub fn compiled(&self) -> Vec<String> {
        self.compiled.lock().unwrap().clone()
    }
}

#[async_trait]
impl CepRuntime for ScriptedRuntime {
    async fn compile(
        &self,
        index: usize,
        source: &str,
        registry: &EventTypeRegistry,
    ) -> a3s_cep::Result<CompiledStatement> {
        self.compiled.lock().unwrap().push(source.to_string());
        let rejection = self.rejection.lock().unwrap().clone();
        if let Some((reason, detail)) = rejection {
            return Err(CepError::Compilation { reason, detail });
        }
        self.inner.compile(index, source, registry).await
    }

    async fn activate(
        &self,
        statements: Vec<CompiledStatement>,
        registry: Arc<EventTypeRegistry>,
    ) -> a3s_cep::Result<DeploymentId> {
        self.inner.activate(statements, registry).await
    }

    async fn deactivate(&self, deployment: &DeploymentId) -> a3s_cep::Result<()> {
        self.inner.deactivate(deployment).await
    }

    async fn snapshot(&self) -> a3s_cep::Result<RuntimeSnapshot> {
        self.inner.snapshot().await
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Store that records saves and fails the next `failures` of them
#[derive(Default)]
pub struct FlakyStore {
    saved: Mutex<Vec<Configuration>>,
    failures: AtomicUsize,
}

impl FlakyStore {
    pub fn fail_next(&self, failures: usize) {
        self.failures.store(failures, Ordering::SeqCst);
    }

    pub fn saved(&self) -> Vec<Configuration> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigurationStore for FlakyStore {
    async fn save(&self, configuration: &Configuration) -> Result<(), PersistenceError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PersistenceError::new("ERROR"));
        }
        self.saved.lock().unwrap().push(configuration.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<Configuration>, PersistenceError> {
        Ok(self.saved.lock().unwrap().last().cloned())
    }
}
