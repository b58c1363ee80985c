//! Configuration document types for the a3s-cep engine
//!
//! All types use camelCase JSON serialization for wire compatibility.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the engine an event type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Consumed by statements
    Input,
    /// Produced by statements
    Output,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Input => f.write_str("input"),
            Category::Output => f.write_str("output"),
        }
    }
}

/// A typed attribute of an event type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Attribute name, unique within its event type
    pub name: String,

    /// Attribute type (e.g., "string", "double", "geo:point")
    #[serde(rename = "type")]
    pub attr_type: String,
}

impl Attribute {
    /// Create a new attribute
    pub fn new(name: impl Into<String>, attr_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr_type: attr_type.into(),
        }
    }
}

/// Shape of an event stream, shared by input and output declarations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    /// Event type identifier (e.g., "Room", "S.*")
    pub id: String,

    /// Event type name
    #[serde(rename = "type", default)]
    pub type_name: String,

    /// Whether `id` is a pattern matching several concrete ids
    #[serde(default)]
    pub is_pattern: bool,

    /// Typed attributes carried by events of this type
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl EventType {
    /// Create an event type with no attributes
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the event type name
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Mark the id as a pattern
    pub fn pattern(mut self) -> Self {
        self.is_pattern = true;
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, attr_type: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, attr_type));
        self
    }
}

/// A remote endpoint events are received from or delivered to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Endpoint URL
    pub url: String,

    /// Optional tenant/service name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// Optional service path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_path: Option<String>,
}

impl Endpoint {
    /// Create an endpoint with only a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_name: None,
            service_path: None,
        }
    }
}

/// Declared input event type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeIn {
    #[serde(flatten)]
    pub event_type: EventType,

    /// Where events of this type come from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<Endpoint>,
}

impl EventTypeIn {
    /// Declare an input event type with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self::from(EventType::new(id))
    }

    /// Event type id
    pub fn id(&self) -> &str {
        &self.event_type.id
    }

    /// Add a provider endpoint
    pub fn with_provider(mut self, endpoint: Endpoint) -> Self {
        self.providers.push(endpoint);
        self
    }
}

impl From<EventType> for EventTypeIn {
    fn from(event_type: EventType) -> Self {
        Self {
            event_type,
            providers: Vec::new(),
        }
    }
}

/// Declared output event type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeOut {
    #[serde(flatten)]
    pub event_type: EventType,

    /// Where produced events are delivered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brokers: Vec<Endpoint>,
}

impl EventTypeOut {
    /// Declare an output event type with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self::from(EventType::new(id))
    }

    /// Event type id
    pub fn id(&self) -> &str {
        &self.event_type.id
    }

    /// Add a broker endpoint
    pub fn with_broker(mut self, endpoint: Endpoint) -> Self {
        self.brokers.push(endpoint);
        self
    }
}

impl From<EventType> for EventTypeOut {
    fn from(event_type: EventType) -> Self {
        Self {
            event_type,
            brokers: Vec::new(),
        }
    }
}

/// A complete engine configuration
///
/// Immutable once accepted. Replacing the running configuration always
/// means submitting a new `Configuration`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Public address of this engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Input event types, in declaration order
    #[serde(rename = "in", default)]
    pub event_type_ins: Vec<EventTypeIn>,

    /// Output event types, in declaration order
    #[serde(rename = "out", default)]
    pub event_type_outs: Vec<EventTypeOut>,

    /// Statement sources, in submission order
    #[serde(default)]
    pub statements: Vec<String>,
}

impl Configuration {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host address
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Add an input event type
    pub fn with_input(mut self, input: impl Into<EventTypeIn>) -> Self {
        self.event_type_ins.push(input.into());
        self
    }

    /// Add an output event type
    pub fn with_output(mut self, output: impl Into<EventTypeOut>) -> Self {
        self.event_type_outs.push(output.into());
        self
    }

    /// Add a statement
    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statements.push(statement.into());
        self
    }

    /// Parse a configuration document from JSON bytes
    pub fn from_slice(bytes: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(bytes).map_err(Into::into)
    }
}
