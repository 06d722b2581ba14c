// SPDX-License-Identifier: MIT OR Apache-2.0
//! Three-way reconciliation of two divergent document edits against their
//! common ancestor.
//!
//! Each entity collection (components, nodes, connections, per-node
//! parameter maps) is diffed independently against the ancestor for both
//! sides, then reconciled per identity. The engine never picks a silent
//! winner: anything it cannot merge cleanly is surfaced as a conflict, and
//! structural damage introduced by the merge itself is caught by a
//! validation pass over the result.

use crate::diff::{diff, Changed, DiffResult};
use nodewire_editor_model::{
    Component, Connection, Node, ParameterMap, Project, TypeLibrary, ValidationError, Validator,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Which side of the merge an action came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    /// The local edit
    Mine,
    /// The remote edit
    Theirs,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Mine => write!(f, "mine"),
            Side::Theirs => write!(f, "theirs"),
        }
    }
}

/// Identifies the entity a conflict is about
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EntityRef {
    /// The project name field
    ProjectName,
    /// A component
    Component {
        /// Component name
        name: String,
    },
    /// A node
    Node {
        /// Owning component
        component: String,
        /// Node id
        id: String,
    },
    /// A connection
    Connection {
        /// Owning component
        component: String,
        /// The connection
        connection: Connection,
    },
    /// A single parameter of a node
    Parameter {
        /// Owning component
        component: String,
        /// Node id
        node: String,
        /// Parameter name
        name: String,
    },
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::ProjectName => write!(f, "project name"),
            EntityRef::Component { name } => write!(f, "component {name}"),
            EntityRef::Node { component, id } => write!(f, "node {id} in component {component}"),
            EntityRef::Connection {
                component,
                connection,
            } => write!(f, "connection {connection} in component {component}"),
            EntityRef::Parameter {
                component,
                node,
                name,
            } => write!(f, "parameter {name} of node {node} in component {component}"),
        }
    }
}

/// A merge decision the engine refuses to make on its own
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MergeConflict {
    /// Both sides created the same identity with different values
    Addition {
        /// The contested entity
        entity: EntityRef,
        /// Value created by the local side
        mine: serde_json::Value,
        /// Value created by the remote side
        theirs: serde_json::Value,
    },
    /// One side deleted what the other side modified
    DeletionModification {
        /// The contested entity
        entity: EntityRef,
        /// Which side deleted it
        deleted_by: Side,
        /// The surviving, modified value
        modified: serde_json::Value,
    },
    /// Both sides changed the same entity to different values
    Modification {
        /// The contested entity
        entity: EntityRef,
        /// The local side's value
        mine: serde_json::Value,
        /// The remote side's value
        theirs: serde_json::Value,
    },
    /// A structural error introduced by the merge itself
    Validation {
        /// The validation error found in the merged result only
        error: ValidationError,
    },
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeConflict::Addition { entity, .. } => {
                write!(f, "Both sides added {entity} with different values")
            }
            MergeConflict::DeletionModification {
                entity, deleted_by, ..
            } => write!(
                f,
                "{entity} was deleted by {deleted_by} but modified by the other side"
            ),
            MergeConflict::Modification { entity, .. } => {
                write!(f, "Both sides modified {entity} differently")
            }
            MergeConflict::Validation { error } => {
                write!(f, "Merge introduced a structural error: {error}")
            }
        }
    }
}

/// Result of a three-way merge
#[derive(Debug)]
pub struct MergeOutcome {
    /// The merged document; on conflicts it holds the engine's best-effort
    /// resolution, which callers must not commit without resolving
    pub result: Project,
    /// Everything the engine could not decide
    pub conflicts: Vec<MergeConflict>,
}

impl MergeOutcome {
    /// Whether the merge requires manual resolution
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Three-way merge of two edits of a project document against their common
/// ancestor.
///
/// `merge(a, a, a)` returns `a` with no conflicts for any document `a`,
/// including structurally invalid ones.
pub fn merge(
    ancestor: &Project,
    mine: &Project,
    theirs: &Project,
    types: &TypeLibrary,
) -> MergeOutcome {
    let mut conflicts = Vec::new();

    let name = match merge_scalar(&ancestor.name, &mine.name, &theirs.name) {
        Ok(name) => name,
        Err((m, t)) => {
            conflicts.push(MergeConflict::Modification {
                entity: EntityRef::ProjectName,
                mine: json_value(&m),
                theirs: json_value(&t),
            });
            m
        }
    };

    let components = merge_components(ancestor, mine, theirs, &mut conflicts);

    let result = Project { name, components };

    // Structural damage introduced purely by the merge (for example a
    // connection left dangling because its node was deleted on one side)
    // becomes a conflict; it is never silently auto-fixed here.
    let mut validator = Validator::new(Arc::new(types.clone()));
    let mut known = Vec::new();
    for document in [ancestor, mine, theirs] {
        known.extend(validator.validate(document).to_vec());
    }
    for error in validator.validate(&result).to_vec() {
        if !known.contains(&error) {
            conflicts.push(MergeConflict::Validation { error });
        }
    }

    tracing::info!(conflicts = conflicts.len(), "merged project documents");
    MergeOutcome { result, conflicts }
}

/// Scalar three-way merge: unchanged sides yield to changed ones, equal
/// changes collapse, diverging changes are an error carrying both values.
fn merge_scalar<T: Clone + PartialEq>(anc: &T, mine: &T, theirs: &T) -> Result<T, (T, T)> {
    if mine == theirs {
        Ok(mine.clone())
    } else if mine == anc {
        Ok(theirs.clone())
    } else if theirs == anc {
        Ok(mine.clone())
    } else {
        Err((mine.clone(), theirs.clone()))
    }
}

fn json_value<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn merge_components(
    ancestor: &Project,
    mine: &Project,
    theirs: &Project,
    conflicts: &mut Vec<MergeConflict>,
) -> Option<Vec<Component>> {
    if ancestor.components.is_none() && mine.components.is_none() && theirs.components.is_none() {
        return None;
    }

    let anc = ancestor.components();
    let d_mine = diff(anc, mine.components(), |c| c.name.clone(), PartialEq::eq);
    let d_theirs = diff(anc, theirs.components(), |c| c.name.clone(), PartialEq::eq);

    let mut merged = Vec::new();

    // Survivors keep ancestor order; creations are appended below.
    for anc_component in anc {
        let name = anc_component.name.as_str();
        let mine_change = find_changed(&d_mine, |c| c.name == name);
        let theirs_change = find_changed(&d_theirs, |c| c.name == name);
        let mine_deleted = d_mine.deleted.iter().any(|c| c.name == name);
        let theirs_deleted = d_theirs.deleted.iter().any(|c| c.name == name);

        match (mine_deleted, theirs_deleted) {
            (true, true) => {}
            (true, false) => {
                if let Some(change) = theirs_change {
                    conflicts.push(MergeConflict::DeletionModification {
                        entity: EntityRef::Component {
                            name: name.to_string(),
                        },
                        deleted_by: Side::Mine,
                        modified: json_value(&change.new),
                    });
                    merged.push(change.new.clone());
                }
            }
            (false, true) => {
                if let Some(change) = mine_change {
                    conflicts.push(MergeConflict::DeletionModification {
                        entity: EntityRef::Component {
                            name: name.to_string(),
                        },
                        deleted_by: Side::Theirs,
                        modified: json_value(&change.new),
                    });
                    merged.push(change.new.clone());
                }
            }
            (false, false) => match (mine_change, theirs_change) {
                (Some(m), Some(t)) if m.new == t.new => merged.push(m.new.clone()),
                (Some(m), Some(t)) => {
                    merged.push(merge_component(anc_component, &m.new, &t.new, conflicts));
                }
                (Some(m), None) => merged.push(m.new.clone()),
                (None, Some(t)) => merged.push(t.new.clone()),
                (None, None) => merged.push(anc_component.clone()),
            },
        }
    }

    for created in &d_mine.created {
        match d_theirs.created.iter().find(|c| c.name == created.name) {
            Some(other) if other == created => merged.push(created.clone()),
            Some(other) => {
                conflicts.push(MergeConflict::Addition {
                    entity: EntityRef::Component {
                        name: created.name.clone(),
                    },
                    mine: json_value(created),
                    theirs: json_value(other),
                });
                merged.push(created.clone());
            }
            None => merged.push(created.clone()),
        }
    }
    for created in &d_theirs.created {
        if !d_mine.created.iter().any(|c| c.name == created.name) {
            merged.push(created.clone());
        }
    }

    Some(merged)
}

fn find_changed<'a, T>(
    result: &'a DiffResult<T>,
    matches: impl Fn(&T) -> bool,
) -> Option<&'a Changed<T>> {
    result.changed.iter().find(|c| matches(&c.new))
}

/// A node lifted out of the visual hierarchy for diffing.
///
/// The `node` field carries no children; the hierarchy is encoded in
/// `parent`, so a subtree move shows up as a change of the moved node only.
#[derive(Debug, Clone, PartialEq)]
struct FlatNode {
    node: Node,
    parent: Option<String>,
}

fn flatten(component: &Component) -> Vec<FlatNode> {
    fn walk(node: &Node, parent: Option<&str>, out: &mut Vec<FlatNode>) {
        let mut shallow = node.clone();
        shallow.children = Vec::new();
        out.push(FlatNode {
            node: shallow,
            parent: parent.map(ToString::to_string),
        });
        for child in &node.children {
            walk(child, Some(&node.id), out);
        }
    }
    let mut out = Vec::new();
    for root in &component.graph.roots {
        walk(root, None, &mut out);
    }
    out
}

/// Rebuild the visual hierarchy from merged flat nodes.
///
/// A node whose parent did not survive the merge is lifted to the roots;
/// parent cycles (possible when each side moved a different node under the
/// other) are broken deterministically by lifting the first unplaced node.
fn rebuild(flat: &[FlatNode]) -> Vec<Node> {
    fn build(flat: &[FlatNode], index: usize, placed: &mut [bool]) -> Node {
        placed[index] = true;
        let mut node = flat[index].node.clone();
        for j in 0..flat.len() {
            if !placed[j] && flat[j].parent.as_deref() == Some(node.id.as_str()) {
                node.children.push(build(flat, j, placed));
            }
        }
        node
    }

    let ids: HashSet<&str> = flat.iter().map(|f| f.node.id.as_str()).collect();
    let mut placed = vec![false; flat.len()];
    let mut roots = Vec::new();
    for (i, item) in flat.iter().enumerate() {
        let is_root = match &item.parent {
            None => true,
            Some(parent) => !ids.contains(parent.as_str()),
        };
        if is_root && !placed[i] {
            roots.push(build(flat, i, &mut placed));
        }
    }
    for i in 0..flat.len() {
        if !placed[i] {
            roots.push(build(flat, i, &mut placed));
        }
    }
    roots
}

fn merge_component(
    ancestor: &Component,
    mine: &Component,
    theirs: &Component,
    conflicts: &mut Vec<MergeConflict>,
) -> Component {
    let component = ancestor.name.as_str();

    // Nodes, flattened so identity is the node id alone
    let anc_nodes = flatten(ancestor);
    let d_mine = diff(&anc_nodes, &flatten(mine), |f| f.node.id.clone(), PartialEq::eq);
    let d_theirs = diff(
        &anc_nodes,
        &flatten(theirs),
        |f| f.node.id.clone(),
        PartialEq::eq,
    );

    let mut merged_nodes = Vec::new();
    for anc_node in &anc_nodes {
        let id = anc_node.node.id.as_str();
        let mine_change = find_changed(&d_mine, |f| f.node.id == id);
        let theirs_change = find_changed(&d_theirs, |f| f.node.id == id);
        let mine_deleted = d_mine.deleted.iter().any(|f| f.node.id == id);
        let theirs_deleted = d_theirs.deleted.iter().any(|f| f.node.id == id);

        match (mine_deleted, theirs_deleted) {
            (true, true) => {}
            (true, false) => {
                if let Some(change) = theirs_change {
                    conflicts.push(MergeConflict::DeletionModification {
                        entity: EntityRef::Node {
                            component: component.to_string(),
                            id: id.to_string(),
                        },
                        deleted_by: Side::Mine,
                        modified: json_value(&change.new.node),
                    });
                    merged_nodes.push(change.new.clone());
                }
            }
            (false, true) => {
                if let Some(change) = mine_change {
                    conflicts.push(MergeConflict::DeletionModification {
                        entity: EntityRef::Node {
                            component: component.to_string(),
                            id: id.to_string(),
                        },
                        deleted_by: Side::Theirs,
                        modified: json_value(&change.new.node),
                    });
                    merged_nodes.push(change.new.clone());
                }
            }
            (false, false) => match (mine_change, theirs_change) {
                (Some(m), Some(t)) if m.new == t.new => merged_nodes.push(m.new.clone()),
                (Some(m), Some(t)) => {
                    merged_nodes.push(merge_flat_node(
                        anc_node, &m.new, &t.new, component, conflicts,
                    ));
                }
                (Some(m), None) => merged_nodes.push(m.new.clone()),
                (None, Some(t)) => merged_nodes.push(t.new.clone()),
                (None, None) => merged_nodes.push(anc_node.clone()),
            },
        }
    }

    for created in &d_mine.created {
        match d_theirs
            .created
            .iter()
            .find(|f| f.node.id == created.node.id)
        {
            Some(other) if other == created => merged_nodes.push(created.clone()),
            Some(other) => {
                conflicts.push(MergeConflict::Addition {
                    entity: EntityRef::Node {
                        component: component.to_string(),
                        id: created.node.id.clone(),
                    },
                    mine: json_value(&created.node),
                    theirs: json_value(&other.node),
                });
                merged_nodes.push(created.clone());
            }
            None => merged_nodes.push(created.clone()),
        }
    }
    for created in &d_theirs.created {
        if !d_mine.created.iter().any(|f| f.node.id == created.node.id) {
            merged_nodes.push(created.clone());
        }
    }

    // Connections have no mutable fields, so the four-field identity makes
    // them pure create/delete entities.
    let anc_connections = &ancestor.graph.connections;
    let c_mine = diff(
        anc_connections,
        &mine.graph.connections,
        Clone::clone,
        PartialEq::eq,
    );
    let c_theirs = diff(
        anc_connections,
        &theirs.graph.connections,
        Clone::clone,
        PartialEq::eq,
    );

    let mut merged_connections: Vec<Connection> = anc_connections
        .iter()
        .filter(|c| !c_mine.deleted.contains(*c) && !c_theirs.deleted.contains(*c))
        .cloned()
        .collect();
    for created in &c_mine.created {
        if !merged_connections.contains(created) {
            merged_connections.push(created.clone());
        }
    }
    for created in &c_theirs.created {
        if !merged_connections.contains(created) {
            merged_connections.push(created.clone());
        }
    }

    let mut merged = Component::new(component);
    merged.graph.roots = rebuild(&merged_nodes);
    merged.graph.connections = merged_connections;
    merged
}

/// Merge one node both sides changed.
///
/// Parameter maps merge field-level; the remaining persisted fields (type,
/// version, hierarchy parent) merge as scalars. A scalar that diverged on
/// both sides is a whole-entity conflict and the local side wins in the
/// best-effort result.
fn merge_flat_node(
    ancestor: &FlatNode,
    mine: &FlatNode,
    theirs: &FlatNode,
    component: &str,
    conflicts: &mut Vec<MergeConflict>,
) -> FlatNode {
    let id = ancestor.node.id.clone();

    let scalars = (
        merge_scalar(
            &ancestor.node.type_name,
            &mine.node.type_name,
            &theirs.node.type_name,
        ),
        merge_scalar(&ancestor.node.version, &mine.node.version, &theirs.node.version),
        merge_scalar(&ancestor.parent, &mine.parent, &theirs.parent),
    );
    let (type_name, version, parent) = match scalars {
        (Ok(type_name), Ok(version), Ok(parent)) => (type_name, version, parent),
        _ => {
            conflicts.push(MergeConflict::Modification {
                entity: EntityRef::Node {
                    component: component.to_string(),
                    id: id.clone(),
                },
                mine: json_value(&mine.node),
                theirs: json_value(&theirs.node),
            });
            return mine.clone();
        }
    };

    let parameters = merge_parameters(
        &ancestor.node.parameters,
        &mine.node.parameters,
        &theirs.node.parameters,
        component,
        &id,
        conflicts,
    );

    FlatNode {
        node: Node {
            id,
            type_name,
            parameters,
            children: Vec::new(),
            version,
        },
        parent,
    }
}

/// Field-level merge of a parameter map.
///
/// Disjoint changes merge cleanly; overlapping changes conflict only on the
/// overlapping keys, with the local side's state kept in the best-effort
/// result except when it deleted a key the other side modified.
fn merge_parameters(
    ancestor: &ParameterMap,
    mine: &ParameterMap,
    theirs: &ParameterMap,
    component: &str,
    node: &str,
    conflicts: &mut Vec<MergeConflict>,
) -> ParameterMap {
    let mut keys: Vec<&String> = ancestor.keys().collect();
    for key in mine.keys() {
        if !ancestor.contains_key(key) {
            keys.push(key);
        }
    }
    for key in theirs.keys() {
        if !ancestor.contains_key(key) && !mine.contains_key(key) {
            keys.push(key);
        }
    }

    let mut merged = ParameterMap::new();
    for key in keys {
        let a = ancestor.get(key);
        let m = mine.get(key);
        let t = theirs.get(key);

        let winner = if m == t {
            m
        } else if m == a {
            t
        } else if t == a {
            m
        } else {
            let entity = EntityRef::Parameter {
                component: component.to_string(),
                node: node.to_string(),
                name: key.clone(),
            };
            match (m, t) {
                (None, Some(t_value)) => {
                    conflicts.push(MergeConflict::DeletionModification {
                        entity,
                        deleted_by: Side::Mine,
                        modified: t_value.clone(),
                    });
                    t
                }
                (Some(m_value), None) => {
                    conflicts.push(MergeConflict::DeletionModification {
                        entity,
                        deleted_by: Side::Theirs,
                        modified: m_value.clone(),
                    });
                    m
                }
                (m_value, t_value) => {
                    conflicts.push(MergeConflict::Modification {
                        entity,
                        mine: m_value.cloned().unwrap_or(serde_json::Value::Null),
                        theirs: t_value.cloned().unwrap_or(serde_json::Value::Null),
                    });
                    m
                }
            }
        };

        if let Some(value) = winner {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodewire_editor_model::{NodeTypeSchema, PortSpec};
    use serde_json::json;

    fn types() -> TypeLibrary {
        let mut library = TypeLibrary::new();
        library.register(NodeTypeSchema::new(
            "Text",
            vec![PortSpec::input("text", "string"), PortSpec::output("value", "string")],
        ));
        library
    }

    fn project_with(component: Component) -> Project {
        let mut project = Project::new("p");
        project.components.as_mut().unwrap().push(component);
        project
    }

    fn two_node_component() -> Component {
        let mut component = Component::new("Root");
        component.graph.roots.push(Node::new("a", "Text"));
        component.graph.roots.push(Node::new("b", "Text"));
        component
            .graph
            .connections
            .push(Connection::new("a", "value", "b", "text"));
        component
    }

    #[test]
    fn test_merge_identical_documents() {
        let project = project_with(two_node_component());
        let outcome = merge(&project, &project, &project, &types());
        assert!(!outcome.has_conflicts());
        assert_eq!(outcome.result, project);
    }

    #[test]
    fn test_merge_identical_invalid_documents() {
        let project = Project::from_json_str("{}").unwrap();
        let outcome = merge(&project, &project, &project, &types());
        assert!(!outcome.has_conflicts());
        assert_eq!(outcome.result, project);
    }

    #[test]
    fn test_component_created_on_one_side() {
        let ancestor = project_with(two_node_component());
        let mine = ancestor.clone();
        let mut theirs = ancestor.clone();
        theirs
            .components
            .as_mut()
            .unwrap()
            .push(Component::new("New"));

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert!(!outcome.has_conflicts());
        assert!(outcome.result.component("New").is_some());
    }

    #[test]
    fn test_equal_additions_collapse() {
        let ancestor = project_with(two_node_component());
        let mut mine = ancestor.clone();
        mine.components.as_mut().unwrap().push(Component::new("New"));
        let theirs = mine.clone();

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert!(!outcome.has_conflicts());
        assert_eq!(outcome.result.components().len(), 2);
    }

    #[test]
    fn test_diverging_additions_conflict() {
        let ancestor = project_with(two_node_component());
        let mut mine = ancestor.clone();
        let mut mine_new = Component::new("New");
        mine_new.graph.roots.push(Node::new("x", "Text"));
        mine.components.as_mut().unwrap().push(mine_new);
        let mut theirs = ancestor.clone();
        theirs
            .components
            .as_mut()
            .unwrap()
            .push(Component::new("New"));

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(matches!(
            &outcome.conflicts[0],
            MergeConflict::Addition {
                entity: EntityRef::Component { name },
                ..
            } if name.as_str() == "New"
        ));
    }

    #[test]
    fn test_delete_vs_unchanged_deletes() {
        let ancestor = project_with(two_node_component());
        let mut mine = ancestor.clone();
        mine.components.as_mut().unwrap().clear();
        let theirs = ancestor.clone();

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert!(!outcome.has_conflicts());
        assert!(outcome.result.components().is_empty());
    }

    #[test]
    fn test_delete_vs_modified_conflicts_and_keeps_modified() {
        let ancestor = project_with(two_node_component());
        let mut mine = ancestor.clone();
        mine.components.as_mut().unwrap().clear();
        let mut theirs = ancestor.clone();
        theirs
            .component_mut("Root")
            .unwrap()
            .node_mut("a")
            .unwrap()
            .set_parameter("text", json!("edited"));

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(matches!(
            &outcome.conflicts[0],
            MergeConflict::DeletionModification {
                entity: EntityRef::Component { name },
                deleted_by: Side::Mine,
                ..
            } if name.as_str() == "Root"
        ));
        assert_eq!(
            outcome
                .result
                .component("Root")
                .unwrap()
                .node("a")
                .unwrap()
                .parameter("text"),
            Some(&json!("edited"))
        );
    }

    #[test]
    fn test_disjoint_parameter_changes_merge() {
        let ancestor = project_with(two_node_component());
        let mut mine = ancestor.clone();
        mine.component_mut("Root")
            .unwrap()
            .node_mut("a")
            .unwrap()
            .set_parameter("text", json!("from mine"));
        let mut theirs = ancestor.clone();
        theirs
            .component_mut("Root")
            .unwrap()
            .node_mut("a")
            .unwrap()
            .set_parameter("other", json!("from theirs"));

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert!(!outcome.has_conflicts());
        let node = outcome.result.component("Root").unwrap().node("a").unwrap();
        assert_eq!(node.parameter("text"), Some(&json!("from mine")));
        assert_eq!(node.parameter("other"), Some(&json!("from theirs")));
    }

    #[test]
    fn test_overlapping_parameter_change_conflicts_on_field() {
        let ancestor = project_with(two_node_component());
        let mut mine = ancestor.clone();
        mine.component_mut("Root")
            .unwrap()
            .node_mut("a")
            .unwrap()
            .set_parameter("text", json!("mine"));
        let mut theirs = ancestor.clone();
        theirs
            .component_mut("Root")
            .unwrap()
            .node_mut("a")
            .unwrap()
            .set_parameter("text", json!("theirs"));

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(matches!(
            &outcome.conflicts[0],
            MergeConflict::Modification {
                entity: EntityRef::Parameter { node, name, .. },
                ..
            } if node.as_str() == "a" && name.as_str() == "text"
        ));
        // Best-effort result keeps the local value
        assert_eq!(
            outcome
                .result
                .component("Root")
                .unwrap()
                .node("a")
                .unwrap()
                .parameter("text"),
            Some(&json!("mine"))
        );
    }

    #[test]
    fn test_same_change_on_both_sides_applies_once() {
        let ancestor = project_with(two_node_component());
        let mut mine = ancestor.clone();
        mine.component_mut("Root")
            .unwrap()
            .node_mut("a")
            .unwrap()
            .set_parameter("text", json!("same"));
        let theirs = mine.clone();

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert!(!outcome.has_conflicts());
        assert_eq!(
            outcome
                .result
                .component("Root")
                .unwrap()
                .node("a")
                .unwrap()
                .parameter("text"),
            Some(&json!("same"))
        );
    }

    #[test]
    fn test_node_added_in_hierarchy_survives() {
        let ancestor = project_with(two_node_component());
        let mut mine = ancestor.clone();
        mine.component_mut("Root")
            .unwrap()
            .node_mut("a")
            .unwrap()
            .children
            .push(Node::new("child", "Text"));
        let theirs = ancestor.clone();

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert!(!outcome.has_conflicts());
        let root = outcome.result.component("Root").unwrap();
        assert_eq!(root.node("a").unwrap().children.len(), 1);
        assert!(root.has_node("child"));
    }

    #[test]
    fn test_connection_created_and_node_deleted_is_validation_conflict() {
        let ancestor = project_with(two_node_component());
        // Mine deletes node b and its connection
        let mut mine = ancestor.clone();
        {
            let root = mine.component_mut("Root").unwrap();
            root.graph.roots.retain(|n| n.id != "b");
            root.graph.connections.clear();
        }
        // Theirs wires b into a new connection
        let mut theirs = ancestor.clone();
        theirs
            .component_mut("Root")
            .unwrap()
            .graph
            .connections
            .push(Connection::new("b", "value", "a", "text"));

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert!(outcome.has_conflicts());
        assert!(outcome.conflicts.iter().any(|c| matches!(
            c,
            MergeConflict::Validation {
                error: ValidationError::DanglingConnectionSource { .. },
            }
        )));
        // The engine surfaced the damage instead of repairing it
        assert_eq!(
            outcome
                .result
                .component("Root")
                .unwrap()
                .graph
                .connections
                .len(),
            1
        );
    }

    #[test]
    fn test_validation_conflict_serializes_to_json() {
        let ancestor = project_with(two_node_component());
        let mut mine = ancestor.clone();
        {
            let root = mine.component_mut("Root").unwrap();
            root.graph.roots.retain(|n| n.id != "b");
            root.graph.connections.clear();
        }
        let mut theirs = ancestor.clone();
        theirs
            .component_mut("Root")
            .unwrap()
            .graph
            .connections
            .push(Connection::new("b", "value", "a", "text"));

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert!(outcome.has_conflicts());
        // Conflicts are data for callers; the whole list, validation errors
        // included, must come out as JSON.
        let value = serde_json::to_value(&outcome.conflicts).unwrap();
        let rendered = value.to_string();
        assert!(rendered.contains("DanglingConnectionSource"));
    }

    #[test]
    fn test_project_name_three_way() {
        let ancestor = Project::new("old");
        let mut mine = ancestor.clone();
        mine.name = Some("renamed".to_string());
        let theirs = ancestor.clone();

        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert!(!outcome.has_conflicts());
        assert_eq!(outcome.result.name.as_deref(), Some("renamed"));

        let mut theirs = ancestor.clone();
        theirs.name = Some("other".to_string());
        let outcome = merge(&ancestor, &mine, &theirs, &types());
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(matches!(
            outcome.conflicts[0],
            MergeConflict::Modification {
                entity: EntityRef::ProjectName,
                ..
            }
        ));
    }
}
