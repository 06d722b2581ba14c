// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted project document: the JSON wire format and its containers.
//!
//! The document shape is the one piece of external interface this crate must
//! round-trip exactly. Documents missing `name` or `components` still parse,
//! so the validator can report them instead of the loader rejecting them.

use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised when reading or writing a project document
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document is not valid JSON or has the wrong shape
    #[error("Failed to parse project document: {0}")]
    Parse(#[source] serde_json::Error),

    /// The document could not be serialized
    #[error("Failed to serialize project document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// The whole persisted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project name; absent in corrupt documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Components in document order; absent in corrupt documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,
}

impl Project {
    /// Create a new, empty project
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            components: Some(Vec::new()),
        }
    }

    /// Parse a project document from JSON
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(json).map_err(DocumentError::Parse)
    }

    /// Serialize this project to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self).map_err(DocumentError::Serialize)
    }

    /// The components list, empty when the document has none
    pub fn components(&self) -> &[Component] {
        self.components.as_deref().unwrap_or_default()
    }

    /// Get a component by name (first match in document order)
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components().iter().find(|c| c.name == name)
    }

    /// Mutable variant of [`Project::component`]
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components
            .as_mut()?
            .iter_mut()
            .find(|c| c.name == name)
    }
}

/// A named, reusable sub-graph within a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Component name, unique within the project
    pub name: String,
    /// The nodes and connections of this component
    pub graph: ComponentGraph,
}

impl Component {
    /// Create a new empty component
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: ComponentGraph::default(),
        }
    }

    /// Find a node by id anywhere in the hierarchy
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.roots.iter().find_map(|n| n.find_descendant(id))
    }

    /// Mutable variant of [`Component::node`]
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.graph
            .roots
            .iter_mut()
            .find_map(|n| n.find_descendant_mut(id))
    }

    /// Whether a node with the given id exists anywhere in the hierarchy
    pub fn has_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Visit every node depth-first, parent before children, roots in order
    pub fn for_each_node(&self, f: &mut impl FnMut(&Node)) {
        for root in &self.graph.roots {
            root.visit(f);
        }
    }

    /// All node ids in visit order, duplicates included
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for root in &self.graph.roots {
            root.collect_ids(&mut ids);
        }
        ids
    }
}

/// The graph body of a component: root nodes plus connections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentGraph {
    /// Root nodes of the visual hierarchy, in document order
    #[serde(default)]
    pub roots: Vec<Node>,
    /// Connections between node ports, in document order
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// An edge between two node ports.
///
/// The four fields together form the connection's identity; there is no
/// separate id. Port references are by name and stay meaningful only while
/// the referenced node resolves a port with that name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Source node id
    pub from_id: String,
    /// Source port name
    pub from_property: String,
    /// Target node id
    pub to_id: String,
    /// Target port name
    pub to_property: String,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        from_id: impl Into<String>,
        from_property: impl Into<String>,
        to_id: impl Into<String>,
        to_property: impl Into<String>,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            from_property: from_property.into(),
            to_id: to_id.into(),
            to_property: to_property.into(),
        }
    }

    /// Check if this connection involves a specific node id
    pub fn involves_node(&self, id: &str) -> bool {
        self.from_id == id || self.to_id == id
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.from_id, self.from_property, self.to_id, self.to_property
        )
    }
}
