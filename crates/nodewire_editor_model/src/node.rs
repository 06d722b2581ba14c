// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the project graph.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Parameter map of a node, keyed by parameter name.
///
/// Insertion order is preserved so documents round-trip exactly.
pub type ParameterMap = IndexMap<String, serde_json::Value>;

/// A graph vertex.
///
/// Node ids are plain strings, unique within the component that contains
/// them. `children` is the visual hierarchy (groups and containers), not a
/// data-flow relationship; data flow lives in the component's connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique id, scoped to the owning component
    pub id: String,
    /// Node type name, resolved against the type library
    #[serde(rename = "type")]
    pub type_name: String,
    /// Current parameter values
    #[serde(default)]
    pub parameters: ParameterMap,
    /// Child nodes in the visual hierarchy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    /// Format version of this node instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl Node {
    /// Create a new node with no parameters or children
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            parameters: ParameterMap::new(),
            children: Vec::new(),
            version: None,
        }
    }

    /// Set a parameter, builder style
    pub fn with_parameter(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Add a child node, builder style
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Get a parameter value
    pub fn parameter(&self, name: &str) -> Option<&serde_json::Value> {
        self.parameters.get(name)
    }

    /// Set a parameter value, returning the previous value if any
    pub fn set_parameter(
        &mut self,
        name: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.parameters.insert(name.into(), value)
    }

    /// Remove a parameter, preserving the order of the remaining ones
    pub fn remove_parameter(&mut self, name: &str) -> Option<serde_json::Value> {
        self.parameters.shift_remove(name)
    }

    /// Visit this node and all descendants depth-first, parent before children
    pub fn visit(&self, f: &mut impl FnMut(&Node)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }

    /// Find a node by id in this subtree, including this node itself
    pub fn find_descendant(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_descendant(id))
    }

    /// Mutable variant of [`Node::find_descendant`]
    pub fn find_descendant_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_descendant_mut(id))
    }

    /// Collect the ids of this node and all descendants in visit order
    pub fn collect_ids(&self, out: &mut Vec<String>) {
        self.visit(&mut |n| out.push(n.id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tree() -> Node {
        Node::new("group", "Group")
            .with_child(Node::new("a", "Text").with_parameter("text", json!("hello")))
            .with_child(Node::new("b", "Image").with_child(Node::new("c", "Text")))
    }

    #[test]
    fn test_visit_is_parent_before_children() {
        let mut order = Vec::new();
        sample_tree().collect_ids(&mut order);
        assert_eq!(order, vec!["group", "a", "b", "c"]);
    }

    #[test]
    fn test_find_descendant() {
        let tree = sample_tree();
        assert_eq!(tree.find_descendant("c").map(|n| n.type_name.as_str()), Some("Text"));
        assert!(tree.find_descendant("missing").is_none());
    }

    #[test]
    fn test_parameter_roundtrip() {
        let mut node = Node::new("n", "Text");
        assert!(node.set_parameter("text", json!("hi")).is_none());
        assert_eq!(node.parameter("text"), Some(&json!("hi")));
        assert_eq!(node.remove_parameter("text"), Some(json!("hi")));
        assert!(node.parameter("text").is_none());
    }

    #[test]
    fn test_serialization_omits_empty_fields() {
        let node = Node::new("n", "Text");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value, json!({"id": "n", "type": "Text", "parameters": {}}));
    }
}
