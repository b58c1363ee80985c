//! Active configuration slot
//!
//! Holds the single configuration currently installed in the runtime.
//! The value is an `Arc` swapped in one step, so readers see either the
//! previous configuration or the new one in full.

use crate::runtime::DeploymentId;
use crate::types::Configuration;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// An accepted configuration together with its activation metadata
#[derive(Debug, Clone)]
pub struct ActiveConfiguration {
    /// Monotonic revision, starting at 1
    pub revision: u64,

    /// When the configuration was swapped in
    pub accepted_at: DateTime<Utc>,

    /// Runtime deployment running the statements
    pub deployment: DeploymentId,

    /// The accepted document
    pub configuration: Arc<Configuration>,
}

/// Process-wide holder of the active configuration
///
/// Only the configuration engine writes to the slot; `swap` is therefore
/// crate-private while reads and subscriptions are public.
pub struct ActiveConfigurationSlot {
    tx: watch::Sender<Option<Arc<ActiveConfiguration>>>,
}

impl ActiveConfigurationSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Current active configuration, if any
    pub fn get(&self) -> Option<Arc<ActiveConfiguration>> {
        self.tx.borrow().clone()
    }

    /// Revision of the active configuration, 0 when empty
    pub fn revision(&self) -> u64 {
        self.tx.borrow().as_ref().map(|a| a.revision).unwrap_or(0)
    }

    /// Whether a configuration has ever been installed
    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_none()
    }

    /// Receive a notification on every swap
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ActiveConfiguration>>> {
        self.tx.subscribe()
    }

    /// Replace the active configuration, returning the previous one
    pub(crate) fn swap(&self, active: Arc<ActiveConfiguration>) -> Option<Arc<ActiveConfiguration>> {
        self.tx.send_replace(Some(active))
    }
}

impl Default for ActiveConfigurationSlot {
    fn default() -> Self {
        Self::new()
    }
}
