// SPDX-License-Identifier: MIT OR Apache-2.0
//! The in-memory project graph model.
//!
//! [`ProjectModel`] wraps a [`Project`] document together with the type
//! library context and exposes the mutation surface the editor and the merge
//! layer go through. Every mutation checks its preconditions before touching
//! any state, so a failed call leaves the model exactly as it was, and every
//! successful mutation emits a [`ModelEvent`] scoped to the affected
//! component.

use crate::document::{Component, Connection, Project};
use crate::events::{ModelChange, ModelEvent, Subscribers};
use crate::node::Node;
use crate::port::{has_port, resolve_ports, Port};
use crate::typelib::TypeLibrary;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use thiserror::Error;

/// Error raised by a rejected model mutation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// No component with the given name
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    /// A component with the given name already exists
    #[error("Component already exists: {0}")]
    DuplicateComponent(String),

    /// No node with the given id in the component
    #[error("Unknown node {id} in component {component}")]
    UnknownNode {
        /// Component searched
        component: String,
        /// Missing node id
        id: String,
    },

    /// A node id in the inserted subtree already exists in the component
    #[error("Node id {id} already exists in component {component}")]
    DuplicateNodeId {
        /// Target component
        component: String,
        /// Clashing id
        id: String,
    },

    /// The named parent node does not exist
    #[error("Unknown parent node {id} in component {component}")]
    UnknownParent {
        /// Component searched
        component: String,
        /// Missing parent id
        id: String,
    },

    /// The node has no parameter with the given name
    #[error("Node {node} has no parameter {name}")]
    UnknownParameter {
        /// Node id
        node: String,
        /// Parameter name
        name: String,
    },

    /// The node's resolved port set has no port with the given name
    #[error("Node {node} has no port {port}")]
    UnknownPort {
        /// Node id
        node: String,
        /// Port name
        port: String,
    },

    /// An identical connection already exists
    #[error("Connection already exists: {0}")]
    DuplicateConnection(Connection),

    /// The connection to remove is not present
    #[error("Unknown connection: {0}")]
    UnknownConnection(Connection),
}

/// The project graph model
#[derive(Debug)]
pub struct ProjectModel {
    project: Project,
    types: Arc<TypeLibrary>,
    subscribers: Subscribers<ModelEvent>,
}

impl ProjectModel {
    /// Create a model over a freshly constructed empty project
    pub fn new(name: impl Into<String>, types: Arc<TypeLibrary>) -> Self {
        Self::from_project(Project::new(name), types)
    }

    /// Create a model over a loaded document.
    ///
    /// Corrupt documents are accepted; the validator reports what is wrong.
    pub fn from_project(project: Project, types: Arc<TypeLibrary>) -> Self {
        Self {
            project,
            types,
            subscribers: Subscribers::new(),
        }
    }

    /// The underlying document
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Consume the model, yielding the document
    pub fn into_project(self) -> Project {
        self.project
    }

    /// The type library this model resolves ports against
    pub fn types(&self) -> &Arc<TypeLibrary> {
        &self.types
    }

    /// Subscribe to change events; drop the receiver to unsubscribe
    pub fn subscribe(&mut self) -> Receiver<ModelEvent> {
        self.subscribers.subscribe()
    }

    /// Get a component by name
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.project.component(name)
    }

    /// The root component: the first component in document order
    pub fn root_component(&self) -> Option<&Component> {
        self.project.components().first()
    }

    /// Search every component for a node with the given id.
    ///
    /// Returns the owning component's name alongside the node.
    pub fn find_node_with_id(&self, id: &str) -> Option<(&str, &Node)> {
        self.project
            .components()
            .iter()
            .find_map(|c| c.node(id).map(|n| (c.name.as_str(), n)))
    }

    /// Visit every node of a component depth-first, parent before children
    pub fn for_each_node(
        &self,
        component: &str,
        f: &mut impl FnMut(&Node),
    ) -> Result<(), ModelError> {
        let component = self
            .component(component)
            .ok_or_else(|| ModelError::UnknownComponent(component.to_string()))?;
        component.for_each_node(f);
        Ok(())
    }

    /// Resolve a node's current port set, or `None` when its type is not in
    /// the library
    pub fn ports_for(&self, node: &Node) -> Option<Vec<Port>> {
        self.types
            .get(&node.type_name)
            .map(|schema| resolve_ports(schema, &node.parameters))
    }

    /// Add a component. Fails when the name is already taken.
    pub fn add_component(&mut self, component: Component) -> Result<(), ModelError> {
        if self.project.component(&component.name).is_some() {
            return Err(ModelError::DuplicateComponent(component.name));
        }
        let name = component.name.clone();
        self.project
            .components
            .get_or_insert_with(Vec::new)
            .push(component);
        tracing::debug!(component = %name, "added component");
        self.subscribers.emit(ModelEvent {
            component: name,
            change: ModelChange::ComponentAdded,
        });
        Ok(())
    }

    /// Remove a component by name, returning it
    pub fn remove_component(&mut self, name: &str) -> Result<Component, ModelError> {
        let components = self
            .project
            .components
            .as_mut()
            .ok_or_else(|| ModelError::UnknownComponent(name.to_string()))?;
        let index = components
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ModelError::UnknownComponent(name.to_string()))?;
        let component = components.remove(index);
        tracing::debug!(component = %name, "removed component");
        self.subscribers.emit(ModelEvent {
            component: name.to_string(),
            change: ModelChange::ComponentRemoved,
        });
        Ok(component)
    }

    /// Add a node (and its subtree) to a component.
    ///
    /// With `parent` set, the node becomes the last child of that node;
    /// otherwise it becomes the last root. Every id in the inserted subtree
    /// must be new to the component.
    pub fn add_node(
        &mut self,
        component: &str,
        node: Node,
        parent: Option<&str>,
    ) -> Result<(), ModelError> {
        let target = self
            .project
            .component(component)
            .ok_or_else(|| ModelError::UnknownComponent(component.to_string()))?;

        let mut new_ids = Vec::new();
        node.collect_ids(&mut new_ids);
        for id in &new_ids {
            if target.has_node(id) {
                return Err(ModelError::DuplicateNodeId {
                    component: component.to_string(),
                    id: id.clone(),
                });
            }
        }
        if let Some(parent_id) = parent {
            if !target.has_node(parent_id) {
                return Err(ModelError::UnknownParent {
                    component: component.to_string(),
                    id: parent_id.to_string(),
                });
            }
        }

        let id = node.id.clone();
        let target = self
            .project
            .component_mut(component)
            .ok_or_else(|| ModelError::UnknownComponent(component.to_string()))?;
        match parent {
            Some(parent_id) => {
                // Existence was checked before any mutation
                if let Some(parent_node) = target.node_mut(parent_id) {
                    parent_node.children.push(node);
                }
            }
            None => target.graph.roots.push(node),
        }
        tracing::debug!(component, node = %id, "added node");
        self.subscribers.emit(ModelEvent {
            component: component.to_string(),
            change: ModelChange::NodeAdded { id },
        });
        Ok(())
    }

    /// Remove a node and its subtree, cascading over connections.
    ///
    /// Cascade policy: every connection touching the removed node or any of
    /// its descendants is removed in the same operation, so the model never
    /// holds a connection to a node that is gone.
    pub fn remove_node(&mut self, component: &str, id: &str) -> Result<Node, ModelError> {
        let target = self
            .project
            .component_mut(component)
            .ok_or_else(|| ModelError::UnknownComponent(component.to_string()))?;

        let node = remove_from_hierarchy(&mut target.graph.roots, id).ok_or_else(|| {
            ModelError::UnknownNode {
                component: component.to_string(),
                id: id.to_string(),
            }
        })?;

        let mut removed_ids = Vec::new();
        node.collect_ids(&mut removed_ids);
        target
            .graph
            .connections
            .retain(|c| !removed_ids.iter().any(|rid| c.involves_node(rid)));

        tracing::debug!(component, node = id, "removed node and its connections");
        self.subscribers.emit(ModelEvent {
            component: component.to_string(),
            change: ModelChange::NodeRemoved { id: id.to_string() },
        });
        Ok(node)
    }

    /// Set a parameter on a node.
    ///
    /// Always succeeds for an existing node. A discriminant change that
    /// leaves a connection dangling is deliberately not rejected here; the
    /// validator reports it.
    pub fn set_parameter(
        &mut self,
        component: &str,
        node: &str,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), ModelError> {
        let target = self
            .project
            .component_mut(component)
            .ok_or_else(|| ModelError::UnknownComponent(component.to_string()))?;
        let target_node = target.node_mut(node).ok_or_else(|| ModelError::UnknownNode {
            component: component.to_string(),
            id: node.to_string(),
        })?;
        target_node.set_parameter(name, value);
        self.subscribers.emit(ModelEvent {
            component: component.to_string(),
            change: ModelChange::ParameterSet {
                node: node.to_string(),
                name: name.to_string(),
            },
        });
        Ok(())
    }

    /// Remove a parameter from a node
    pub fn remove_parameter(
        &mut self,
        component: &str,
        node: &str,
        name: &str,
    ) -> Result<serde_json::Value, ModelError> {
        let target = self
            .project
            .component_mut(component)
            .ok_or_else(|| ModelError::UnknownComponent(component.to_string()))?;
        let target_node = target.node_mut(node).ok_or_else(|| ModelError::UnknownNode {
            component: component.to_string(),
            id: node.to_string(),
        })?;
        let value = target_node
            .remove_parameter(name)
            .ok_or_else(|| ModelError::UnknownParameter {
                node: node.to_string(),
                name: name.to_string(),
            })?;
        self.subscribers.emit(ModelEvent {
            component: component.to_string(),
            change: ModelChange::ParameterRemoved {
                node: node.to_string(),
                name: name.to_string(),
            },
        });
        Ok(value)
    }

    /// Add a connection between two resolved ports.
    ///
    /// Both endpoints must exist; when an endpoint's type schema is known,
    /// the named port must be present in its resolved port set. Exact
    /// duplicates are rejected.
    pub fn add_connection(
        &mut self,
        component: &str,
        connection: Connection,
    ) -> Result<(), ModelError> {
        let target = self
            .project
            .component(component)
            .ok_or_else(|| ModelError::UnknownComponent(component.to_string()))?;

        self.check_endpoint(target, component, &connection.from_id, &connection.from_property)?;
        self.check_endpoint(target, component, &connection.to_id, &connection.to_property)?;
        if target.graph.connections.contains(&connection) {
            return Err(ModelError::DuplicateConnection(connection));
        }

        let target = self
            .project
            .component_mut(component)
            .ok_or_else(|| ModelError::UnknownComponent(component.to_string()))?;
        target.graph.connections.push(connection.clone());
        tracing::debug!(component, %connection, "added connection");
        self.subscribers.emit(ModelEvent {
            component: component.to_string(),
            change: ModelChange::ConnectionAdded { connection },
        });
        Ok(())
    }

    /// Remove a connection
    pub fn remove_connection(
        &mut self,
        component: &str,
        connection: &Connection,
    ) -> Result<(), ModelError> {
        let target = self
            .project
            .component_mut(component)
            .ok_or_else(|| ModelError::UnknownComponent(component.to_string()))?;
        let index = target
            .graph
            .connections
            .iter()
            .position(|c| c == connection)
            .ok_or_else(|| ModelError::UnknownConnection(connection.clone()))?;
        target.graph.connections.remove(index);
        tracing::debug!(component, %connection, "removed connection");
        self.subscribers.emit(ModelEvent {
            component: component.to_string(),
            change: ModelChange::ConnectionRemoved {
                connection: connection.clone(),
            },
        });
        Ok(())
    }

    fn check_endpoint(
        &self,
        target: &Component,
        component: &str,
        id: &str,
        property: &str,
    ) -> Result<(), ModelError> {
        let node = target.node(id).ok_or_else(|| ModelError::UnknownNode {
            component: component.to_string(),
            id: id.to_string(),
        })?;
        if let Some(schema) = self.types.get(&node.type_name) {
            if !has_port(schema, &node.parameters, property) {
                return Err(ModelError::UnknownPort {
                    node: id.to_string(),
                    port: property.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Remove a node by id from a hierarchy, searching depth-first
fn remove_from_hierarchy(nodes: &mut Vec<Node>, id: &str) -> Option<Node> {
    if let Some(index) = nodes.iter().position(|n| n.id == id) {
        return Some(nodes.remove(index));
    }
    nodes
        .iter_mut()
        .find_map(|n| remove_from_hierarchy(&mut n.children, id))
}
