// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions and the conditional port resolver.
//!
//! Ports are derived state: a node's port set is always exactly the result
//! of [`resolve_ports`] over its type schema and current parameters, and is
//! never stored where it could drift from that function.

use crate::node::ParameterMap;
use crate::typelib::{NodeTypeSchema, PortSpec};
use serde::{Deserialize, Serialize};

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Data flowing into the node
    Input,
    /// Data flowing out of the node
    Output,
    /// Signal (event) flow
    Signal,
}

/// A resolved, typed connection point on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, unique within the node's resolved set
    pub name: String,
    /// Direction of data or signal flow
    pub direction: PortDirection,
    /// Data type name (opaque to the core)
    pub data_type: String,
    /// Position in the resolved port list.
    ///
    /// Stable only by position: two discriminant values that declare the
    /// same name and type at the same position keep connections bound to
    /// that position valid; anything else dangles and is the validator's
    /// job to report.
    pub index: usize,
}

/// Resolve the actual port set of a node from its type schema and current
/// parameter values.
///
/// Base ports come first in schema order; if the schema declares dynamic
/// groups, the group matching the discriminant parameter's current string
/// value is appended in schema order. An absent or unmatched discriminant
/// value selects the empty group, never an error. Pure: identical inputs
/// yield identical output and neither input is mutated.
pub fn resolve_ports(schema: &NodeTypeSchema, parameters: &ParameterMap) -> Vec<Port> {
    let mut ports: Vec<Port> = Vec::with_capacity(schema.ports.len());

    let push = |ports: &mut Vec<Port>, spec: &PortSpec| {
        let index = ports.len();
        ports.push(Port {
            name: spec.name.clone(),
            direction: spec.direction,
            data_type: spec.data_type.clone(),
            index,
        });
    };

    for spec in &schema.ports {
        push(&mut ports, spec);
    }

    if let Some(dynamic) = &schema.dynamic {
        let value = parameters
            .get(&dynamic.discriminant)
            .and_then(|v| v.as_str());
        if let Some(group) = value.and_then(|v| dynamic.groups.get(v)) {
            for spec in group {
                push(&mut ports, spec);
            }
        }
    }

    ports
}

/// Whether the resolved port set contains a port with the given name
pub fn has_port(schema: &NodeTypeSchema, parameters: &ParameterMap, name: &str) -> bool {
    resolve_ports(schema, parameters).iter().any(|p| p.name == name)
}
