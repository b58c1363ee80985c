//! Admin gateway: maps engine outcomes to admin API responses
//!
//! Transport-agnostic: an HTTP server (or any other transport) forwards the
//! method, path, and body and writes back `AdminResponse::status` and
//! `AdminResponse::body`.

use crate::engine::ConfigurationEngine;
use crate::error::{ApplyError, ConfigurationError, PersistenceError};
use crate::types::Configuration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Path of the configuration resource
pub const ADMIN_CONFIG_PATH: &str = "/v1/admin/config";

/// The active configuration was returned
pub const STATUS_OK: u16 = 200;
/// The submitted configuration was accepted and saved
pub const STATUS_CREATED: u16 = 201;
/// The submitted configuration was rejected, nothing changed
pub const STATUS_BAD_REQUEST: u16 = 400;
/// Unknown path, or no configuration accepted yet
pub const STATUS_NOT_FOUND: u16 = 404;
/// Method other than GET or POST on the configuration resource
pub const STATUS_METHOD_NOT_ALLOWED: u16 = 405;
/// The configuration is running but could not be saved
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// Machine-readable error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// HTTP-style status code as a string (e.g., "400")
    pub code: String,

    /// Failure summary
    pub reason_phrase: String,

    /// Underlying cause
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    fn new(status: u16, reason_phrase: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            code: status.to_string(),
            reason_phrase: reason_phrase.into(),
            detail,
        }
    }
}

impl From<&ConfigurationError> for ErrorBody {
    fn from(err: &ConfigurationError) -> Self {
        Self::new(
            STATUS_BAD_REQUEST,
            err.reason_phrase.clone(),
            Some(err.detail.clone()),
        )
    }
}

impl From<&PersistenceError> for ErrorBody {
    fn from(err: &PersistenceError) -> Self {
        Self::new(STATUS_INTERNAL_SERVER_ERROR, err.reason_phrase.clone(), None)
    }
}

/// Response produced by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct AdminResponse {
    /// HTTP-style status code
    pub status: u16,

    /// JSON body, if any
    pub body: Option<serde_json::Value>,
}

impl AdminResponse {
    fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    fn json(status: u16, body: &impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => Self {
                status,
                body: Some(value),
            },
            Err(e) => Self::error(ErrorBody::new(
                STATUS_INTERNAL_SERVER_ERROR,
                "Failed to encode response",
                Some(e.to_string()),
            )),
        }
    }

    fn error(body: ErrorBody) -> Self {
        let status = body.code.parse().unwrap_or(STATUS_INTERNAL_SERVER_ERROR);
        Self::json(status, &body)
    }

    /// Decode the body as an error body
    pub fn error_body(&self) -> Option<ErrorBody> {
        self.body
            .as_ref()
            .and_then(|b| serde_json::from_value(b.clone()).ok())
    }
}

/// Admin API over a shared `ConfigurationEngine`
#[derive(Clone)]
pub struct AdminGateway {
    engine: Arc<ConfigurationEngine>,
}

impl AdminGateway {
    /// Create a gateway for an engine
    pub fn new(engine: Arc<ConfigurationEngine>) -> Self {
        Self { engine }
    }

    /// The engine behind this gateway
    pub fn engine(&self) -> &Arc<ConfigurationEngine> {
        &self.engine
    }

    /// Route a request by method and path
    pub async fn handle(&self, method: &str, path: &str, body: &[u8]) -> AdminResponse {
        if path.trim_end_matches('/') != ADMIN_CONFIG_PATH {
            return AdminResponse::empty(STATUS_NOT_FOUND);
        }

        match method.to_ascii_uppercase().as_str() {
            "GET" => self.get_configuration(),
            "POST" => self.post_configuration(body).await,
            _ => AdminResponse::empty(STATUS_METHOD_NOT_ALLOWED),
        }
    }

    /// Fetch the active configuration (200), or 404 when none was accepted
    pub fn get_configuration(&self) -> AdminResponse {
        match self.engine.get_configuration() {
            Some(configuration) => AdminResponse::json(STATUS_OK, configuration.as_ref()),
            None => AdminResponse::empty(STATUS_NOT_FOUND),
        }
    }

    /// Replace the configuration with a JSON document
    pub async fn post_configuration(&self, body: &[u8]) -> AdminResponse {
        let candidate: Configuration = match serde_json::from_slice(body) {
            Ok(candidate) => candidate,
            Err(e) => {
                return AdminResponse::error(ErrorBody::new(
                    STATUS_BAD_REQUEST,
                    "Malformed configuration document",
                    Some(e.to_string()),
                ))
            }
        };

        self.submit(candidate).await
    }

    /// Replace the configuration with an already-decoded document
    pub async fn submit(&self, candidate: Configuration) -> AdminResponse {
        match self.engine.set_configuration(candidate).await {
            Ok(_) => AdminResponse::empty(STATUS_CREATED),
            Err(ApplyError::Configuration(e)) => AdminResponse::error(ErrorBody::from(&e)),
            Err(ApplyError::Persistence(e)) => AdminResponse::error(ErrorBody::from(&e)),
        }
    }
}
