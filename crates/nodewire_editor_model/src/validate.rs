// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural validation and minimal repair of project documents.
//!
//! The validator never rejects malformed input; it reports violations as
//! data, in a fixed check order, so two runs over the same document always
//! produce the same error list. Only dangling connections are auto-repaired
//! by [`Validator::fix`]; everything else needs a user or merge decision.

use crate::document::{Component, Connection, Project};
use crate::port::has_port;
use crate::typelib::TypeLibrary;
use crate::warnings::{Warning, WarningLevel, WarningRef, WarningsModel};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// A structural violation found in a project document
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum ValidationError {
    /// The document has no project name
    #[error("Project is missing name")]
    MissingName,

    /// The document has no components list
    #[error("Project is missing components")]
    MissingComponents,

    /// A connection's source end does not resolve (node id or port name)
    #[error("Component {component} has a dangling connection (source missing): {connection}")]
    DanglingConnectionSource {
        /// Name of the component owning the connection
        component: String,
        /// The offending connection
        connection: Connection,
    },

    /// A connection's target end does not resolve (node id or port name)
    #[error("Component {component} has a dangling connection (target missing): {connection}")]
    DanglingConnectionTarget {
        /// Name of the component owning the connection
        component: String,
        /// The offending connection
        connection: Connection,
    },

    /// Two components share a name
    #[error("Duplicate component name {name} (components {first} and {second})")]
    DuplicateComponentName {
        /// The shared name
        name: String,
        /// Index of the first occurrence
        first: usize,
        /// Index of the duplicate occurrence
        second: usize,
    },

    /// Two nodes in one component share an id
    #[error("Component {component} has duplicate node id {id}")]
    DuplicateNodeId {
        /// Name of the component
        component: String,
        /// The duplicated id
        id: String,
    },
}

impl ValidationError {
    /// Whether [`Validator::fix`] repairs this error kind
    pub fn is_fixable(&self) -> bool {
        matches!(
            self,
            ValidationError::DanglingConnectionSource { .. }
                | ValidationError::DanglingConnectionTarget { .. }
        )
    }
}

/// Structural validator over project documents
#[derive(Debug)]
pub struct Validator {
    types: Arc<TypeLibrary>,
    errors: Vec<ValidationError>,
}

impl Validator {
    /// Create a validator resolving ports against the given type library
    pub fn new(types: Arc<TypeLibrary>) -> Self {
        Self {
            types,
            errors: Vec::new(),
        }
    }

    /// Run all checks in fixed order, retaining and returning the errors.
    ///
    /// Check order: missing name, missing components, dangling connections
    /// per component in document order, duplicate component names, duplicate
    /// node ids per component.
    pub fn validate(&mut self, project: &Project) -> &[ValidationError] {
        self.errors = collect_errors(project, &self.types);
        if !self.errors.is_empty() {
            tracing::debug!(errors = self.errors.len(), "project validation found errors");
        }
        &self.errors
    }

    /// Errors from the most recent [`Validator::validate`] or [`Validator::fix`]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Whether the last run found any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Forget the retained error list
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Remove every dangling connection found in the document.
    ///
    /// Exactly one repair per dangling-connection error: the removal of that
    /// connection. All other problems are left for the user or the merge
    /// layer. Returns the number of connections removed; running `fix` on an
    /// already-fixed document removes nothing. The retained error list is
    /// refreshed from the repaired document.
    pub fn fix(&mut self, project: &mut Project) -> usize {
        let mut removed = 0;
        if let Some(components) = project.components.as_mut() {
            for component in components.iter_mut() {
                let snapshot = component.clone();
                let before = component.graph.connections.len();
                component
                    .graph
                    .connections
                    .retain(|c| connection_ends(&snapshot, c, &self.types).is_none());
                removed += before - component.graph.connections.len();
            }
        }
        if removed > 0 {
            tracing::info!(removed, "removed dangling connections");
        }
        self.validate(project);
        removed
    }

    /// Mirror the retained error list into the warnings registry.
    ///
    /// Each error gets a structurally keyed ref so re-validation overwrites
    /// rather than accumulates.
    pub fn report_warnings(&self, warnings: &mut WarningsModel) {
        for error in &self.errors {
            let warning_ref = match error {
                ValidationError::MissingName => WarningRef::for_key("project-missing-name"),
                ValidationError::MissingComponents => {
                    WarningRef::for_key("project-missing-components")
                }
                ValidationError::DanglingConnectionSource {
                    component,
                    connection,
                }
                | ValidationError::DanglingConnectionTarget {
                    component,
                    connection,
                } => WarningRef::for_key(format!("dangling-connection:{connection}"))
                    .in_component(component.clone()),
                ValidationError::DuplicateComponentName { name, .. } => {
                    WarningRef::for_key(format!("duplicate-component:{name}"))
                }
                ValidationError::DuplicateNodeId { component, id } => {
                    WarningRef::for_key(format!("duplicate-node-id:{id}"))
                        .in_component(component.clone())
                        .on_node(id.clone())
                }
            };
            let level = if error.is_fixable() {
                WarningLevel::Warning
            } else {
                WarningLevel::Error
            };
            warnings.set_warning(warning_ref, Warning::with_level(error.to_string(), level));
        }
    }
}

/// Which end of a connection fails to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DanglingEnd {
    Source,
    Target,
}

/// Check one connection against a component.
///
/// Returns the first dangling end (source checked before target) or `None`
/// when both ends resolve. Port-name checks are skipped for nodes whose type
/// is not in the library; an unknown type is not this validator's finding.
fn connection_ends(
    component: &Component,
    connection: &Connection,
    types: &TypeLibrary,
) -> Option<DanglingEnd> {
    if !end_resolves(component, &connection.from_id, &connection.from_property, types) {
        return Some(DanglingEnd::Source);
    }
    if !end_resolves(component, &connection.to_id, &connection.to_property, types) {
        return Some(DanglingEnd::Target);
    }
    None
}

fn end_resolves(component: &Component, id: &str, property: &str, types: &TypeLibrary) -> bool {
    let Some(node) = component.node(id) else {
        return false;
    };
    match types.get(&node.type_name) {
        Some(schema) => has_port(schema, &node.parameters, property),
        None => true,
    }
}

fn collect_errors(project: &Project, types: &TypeLibrary) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Check 1: project name
    if project.name.as_deref().unwrap_or("").is_empty() {
        errors.push(ValidationError::MissingName);
    }

    // Check 2: components list
    let Some(components) = project.components.as_deref() else {
        errors.push(ValidationError::MissingComponents);
        return errors;
    };

    // Check 3: dangling connections, per component in document order
    for component in components {
        for connection in &component.graph.connections {
            match connection_ends(component, connection, types) {
                Some(DanglingEnd::Source) => {
                    errors.push(ValidationError::DanglingConnectionSource {
                        component: component.name.clone(),
                        connection: connection.clone(),
                    });
                }
                Some(DanglingEnd::Target) => {
                    errors.push(ValidationError::DanglingConnectionTarget {
                        component: component.name.clone(),
                        connection: connection.clone(),
                    });
                }
                None => {}
            }
        }
    }

    // Check 4: duplicate component names, one error per later occurrence
    for (second, component) in components.iter().enumerate() {
        if let Some(first) = components[..second]
            .iter()
            .position(|c| c.name == component.name)
        {
            errors.push(ValidationError::DuplicateComponentName {
                name: component.name.clone(),
                first,
                second,
            });
        }
    }

    // Check 5: duplicate node ids, per component
    for component in components {
        let mut seen = HashSet::new();
        for id in component.node_ids() {
            if !seen.insert(id.clone()) {
                errors.push(ValidationError::DuplicateNodeId {
                    component: component.name.clone(),
                    id,
                });
            }
        }
    }

    errors
}
