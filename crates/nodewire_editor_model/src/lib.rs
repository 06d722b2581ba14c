// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project graph model for NodeWire Editor.
//!
//! This crate owns the in-memory representation of a project: components,
//! nodes, ports and connections, persisted as the JSON document the editor
//! and external version control exchange.
//!
//! ## Architecture
//!
//! - [`document`] is the wire format; corrupt documents parse and are
//!   reported by the validator rather than rejected at load time.
//! - [`typelib`] is the read-only node type library supplied by the editor's
//!   type packages.
//! - [`port`] derives a node's actual port set from its schema and current
//!   parameter values; ports are never stored state.
//! - [`project`] is the mutation surface with atomic operations and
//!   component-scoped change events.
//! - [`validate`] detects structural corruption and repairs dangling
//!   connections.
//! - [`warnings`] is the keyed diagnostics registry the UI subscribes to.

pub mod document;
pub mod events;
pub mod node;
pub mod port;
pub mod project;
pub mod typelib;
pub mod validate;
pub mod warnings;

pub use document::{Component, ComponentGraph, Connection, DocumentError, Project};
pub use events::{ModelChange, ModelEvent};
pub use node::{Node, ParameterMap};
pub use port::{resolve_ports, Port, PortDirection};
pub use project::{ModelError, ProjectModel};
pub use typelib::{DynamicPorts, NodeTypeSchema, PortSpec, TypeLibrary};
pub use validate::{ValidationError, Validator};
pub use warnings::{Warning, WarningLevel, WarningRef, WarningsModel};
