// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-only library of node type schemas.
//!
//! The type library is supplied by an external collaborator (the node-type
//! packages shipped with the editor); the core consumes it to resolve port
//! sets and never mutates it after registration.

use crate::port::PortDirection;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Static declaration of a single port in a type schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name, unique within the schema
    pub name: String,
    /// Direction of data or signal flow
    pub direction: PortDirection,
    /// Data type name (opaque to the core)
    #[serde(rename = "type")]
    pub data_type: String,
}

impl PortSpec {
    /// Declare an input port
    pub fn input(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            data_type: data_type.into(),
        }
    }

    /// Declare an output port
    pub fn output(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            data_type: data_type.into(),
        }
    }

    /// Declare a signal port
    pub fn signal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Signal,
            data_type: "signal".to_string(),
        }
    }
}

/// Conditional port declarations keyed by a discriminant parameter.
///
/// The group whose key equals the node's current discriminant value is
/// appended after the base port list; an unmatched value selects no group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicPorts {
    /// Name of the parameter whose value selects the group
    pub discriminant: String,
    /// Port groups keyed by discriminant value, in schema order
    pub groups: IndexMap<String, Vec<PortSpec>>,
}

/// Type definition for a node: base ports plus optional dynamic groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeSchema {
    /// Type name, unique in the library
    pub name: String,
    /// Static base port list, in schema order
    #[serde(default)]
    pub ports: Vec<PortSpec>,
    /// Conditional port groups, if this type has any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<DynamicPorts>,
}

impl NodeTypeSchema {
    /// Create a schema with only static ports
    pub fn new(name: impl Into<String>, ports: Vec<PortSpec>) -> Self {
        Self {
            name: name.into(),
            ports,
            dynamic: None,
        }
    }

    /// Attach dynamic port groups, builder style
    pub fn with_dynamic(
        mut self,
        discriminant: impl Into<String>,
        groups: IndexMap<String, Vec<PortSpec>>,
    ) -> Self {
        self.dynamic = Some(DynamicPorts {
            discriminant: discriminant.into(),
            groups,
        });
        self
    }
}

/// Registry of node type schemas, keyed by type name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeLibrary {
    /// Registered schemas in registration order
    types: IndexMap<String, NodeTypeSchema>,
}

impl TypeLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any previous schema with the same name
    pub fn register(&mut self, schema: NodeTypeSchema) {
        self.types.insert(schema.name.clone(), schema);
    }

    /// Get a schema by type name
    pub fn get(&self, name: &str) -> Option<&NodeTypeSchema> {
        self.types.get(name)
    }

    /// All registered schemas in registration order
    pub fn schemas(&self) -> impl Iterator<Item = &NodeTypeSchema> {
        self.types.values()
    }

    /// Number of registered schemas
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the library has no schemas
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut library = TypeLibrary::new();
        library.register(NodeTypeSchema::new(
            "Text",
            vec![PortSpec::input("text", "string")],
        ));
        assert_eq!(library.len(), 1);
        assert!(library.get("Text").is_some());
        assert!(library.get("Image").is_none());
    }

    #[test]
    fn test_reregister_replaces() {
        let mut library = TypeLibrary::new();
        library.register(NodeTypeSchema::new("Text", Vec::new()));
        library.register(NodeTypeSchema::new(
            "Text",
            vec![PortSpec::input("text", "string")],
        ));
        assert_eq!(library.len(), 1);
        assert_eq!(library.get("Text").map(|s| s.ports.len()), Some(1));
    }
}
