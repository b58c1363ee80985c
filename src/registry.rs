//! Event type registry: lookup and uniqueness checks for declared event types
//!
//! A fresh registry is built for every submitted configuration and is never
//! mutated once the configuration has been accepted. The processing runtime
//! resolves statement references against it.

use crate::config::IdCollisionPolicy;
use crate::error::{CepError, Result};
use crate::types::{Category, Configuration, Endpoint, EventType};
use std::collections::{HashMap, HashSet};

/// Attribute types understood by the processing runtime
pub const ATTRIBUTE_TYPES: &[&str] = &[
    "string",
    "int",
    "long",
    "float",
    "double",
    "boolean",
    "date",
    "geo:point",
];

/// Declared input and output event types of one configuration
#[derive(Debug, Clone, Default)]
pub struct EventTypeRegistry {
    policy: IdCollisionPolicy,
    inputs: HashMap<String, EventType>,
    outputs: HashMap<String, EventType>,
    /// Declaration order per category
    input_order: Vec<String>,
    output_order: Vec<String>,
}

impl EventTypeRegistry {
    /// Create an empty registry
    pub fn new(policy: IdCollisionPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Build a registry from a configuration's declarations
    pub fn build(configuration: &Configuration, policy: IdCollisionPolicy) -> Result<Self> {
        for input in &configuration.event_type_ins {
            validate_endpoints(Category::Input, input.id(), "Provider", &input.providers)?;
        }
        for output in &configuration.event_type_outs {
            validate_endpoints(Category::Output, output.id(), "Broker", &output.brokers)?;
        }

        let mut registry = Self::new(policy);
        registry.register(
            Category::Input,
            configuration.event_type_ins.iter().map(|e| &e.event_type),
        )?;
        registry.register(
            Category::Output,
            configuration.event_type_outs.iter().map(|e| &e.event_type),
        )?;
        Ok(registry)
    }

    /// Register declarations for a category
    ///
    /// Fails on the first empty, malformed, or duplicate id. Nothing is
    /// registered when validation fails.
    pub fn register<'a>(
        &mut self,
        category: Category,
        declarations: impl IntoIterator<Item = &'a EventType>,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();

        for declaration in declarations {
            validate_declaration(category, declaration)?;

            let id = declaration.id.as_str();
            if !seen.insert(id) || self.category(category).contains_key(id) {
                return Err(CepError::DuplicateId {
                    category,
                    id: id.to_string(),
                });
            }
            if self.policy == IdCollisionPolicy::Reject
                && self.category(other(category)).contains_key(id)
            {
                return Err(CepError::CrossCategoryCollision { id: id.to_string() });
            }
            accepted.push(declaration.clone());
        }

        for declaration in accepted {
            let id = declaration.id.clone();
            let (map, order) = match category {
                Category::Input => (&mut self.inputs, &mut self.input_order),
                Category::Output => (&mut self.outputs, &mut self.output_order),
            };
            order.push(id.clone());
            map.insert(id, declaration);
        }

        Ok(())
    }

    /// Resolve an id within a category
    pub fn resolve(&self, id: &str, category: Category) -> Result<&EventType> {
        self.category(category)
            .get(id)
            .ok_or_else(|| CepError::UnknownType {
                category,
                id: id.to_string(),
            })
    }

    /// Resolve an id as an input first, then as an output
    pub fn resolve_any(&self, id: &str) -> Result<(Category, &EventType)> {
        if let Some(declaration) = self.inputs.get(id) {
            return Ok((Category::Input, declaration));
        }
        self.resolve(id, Category::Output)
            .map(|declaration| (Category::Output, declaration))
            .map_err(|_| CepError::UnknownType {
                category: Category::Input,
                id: id.to_string(),
            })
    }

    /// Check whether an id is declared in a category
    pub fn contains(&self, id: &str, category: Category) -> bool {
        self.category(category).contains_key(id)
    }

    /// Ids of a category in declaration order
    pub fn ids(&self, category: Category) -> &[String] {
        match category {
            Category::Input => &self.input_order,
            Category::Output => &self.output_order,
        }
    }

    /// Total number of declared event types
    pub fn len(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    /// Whether no event type is declared
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cross-category policy this registry was built with
    pub fn policy(&self) -> IdCollisionPolicy {
        self.policy
    }

    fn category(&self, category: Category) -> &HashMap<String, EventType> {
        match category {
            Category::Input => &self.inputs,
            Category::Output => &self.outputs,
        }
    }
}

fn other(category: Category) -> Category {
    match category {
        Category::Input => Category::Output,
        Category::Output => Category::Input,
    }
}

fn validate_endpoints(
    category: Category,
    id: &str,
    role: &str,
    endpoints: &[Endpoint],
) -> Result<()> {
    match endpoints.iter().position(|e| e.url.trim().is_empty()) {
        Some(position) => Err(CepError::InvalidEventType {
            category,
            id: id.to_string(),
            reason: format!("{} #{} has an empty url", role, position),
        }),
        None => Ok(()),
    }
}

fn validate_declaration(category: Category, declaration: &EventType) -> Result<()> {
    let invalid = |reason: String| CepError::InvalidEventType {
        category,
        id: declaration.id.clone(),
        reason,
    };

    if declaration.id.trim().is_empty() {
        return Err(invalid("Event type id cannot be empty".to_string()));
    }

    let mut names = HashSet::new();
    for attribute in &declaration.attributes {
        if attribute.name.is_empty() {
            return Err(invalid("Attribute name cannot be empty".to_string()));
        }
        if !names.insert(attribute.name.as_str()) {
            return Err(invalid(format!("Duplicate attribute '{}'", attribute.name)));
        }
        if !ATTRIBUTE_TYPES.contains(&attribute.attr_type.as_str()) {
            return Err(invalid(format!(
                "Unsupported type '{}' for attribute '{}'",
                attribute.attr_type, attribute.name
            )));
        }
    }

    Ok(())
}
