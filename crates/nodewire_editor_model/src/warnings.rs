// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyed registry of non-fatal diagnostics attached to graph elements.
//!
//! Warnings are upserted by structural equality of their ref, so repeated
//! checks against the same element overwrite rather than accumulate. The UI
//! layer subscribes to a plain "warnings changed" signal and pulls whatever
//! it needs; no data is pushed.

use crate::events::Subscribers;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Receiver;

/// Identifying key of a warning.
///
/// Equality is structural: two refs with equal fields address the same
/// warning slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WarningRef {
    /// Arbitrary key distinguishing warnings on the same element
    pub key: String,
    /// Component the warning is attached to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Node the warning is attached to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

impl WarningRef {
    /// A ref with only a key
    pub fn for_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            component: None,
            node: None,
        }
    }

    /// Attach a component name, builder style
    pub fn in_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Attach a node id, builder style
    pub fn on_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }
}

/// Severity of a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningLevel {
    /// Informational notice
    Info,
    /// Something is off but the project still works
    Warning,
    /// Structural problem requiring user action
    Error,
}

/// A single diagnostic entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Human-readable message
    pub message: String,
    /// Severity
    pub level: WarningLevel,
}

impl Warning {
    /// Create a warning-level entry
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: WarningLevel::Warning,
        }
    }

    /// Create an entry with an explicit level
    pub fn with_level(message: impl Into<String>, level: WarningLevel) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }
}

/// Signal sent to subscribers whenever the registry mutates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningsChanged;

/// The warnings registry
#[derive(Debug, Default)]
pub struct WarningsModel {
    entries: IndexMap<WarningRef, Warning>,
    subscribers: Subscribers<WarningsChanged>,
}

impl WarningsModel {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a warning keyed by structural equality of `warning_ref`.
    ///
    /// A second call with an equal ref overwrites the prior entry without
    /// increasing the count.
    pub fn set_warning(&mut self, warning_ref: WarningRef, warning: Warning) {
        self.entries.insert(warning_ref, warning);
        self.subscribers.emit(WarningsChanged);
    }

    /// Get the warning stored for a ref, if any
    pub fn warning(&self, warning_ref: &WarningRef) -> Option<&Warning> {
        self.entries.get(warning_ref)
    }

    /// All entries in insertion order
    pub fn warnings(&self) -> impl Iterator<Item = (&WarningRef, &Warning)> {
        self.entries.iter()
    }

    /// Total number of warnings currently stored
    pub fn total_warnings(&self) -> usize {
        self.entries.len()
    }

    /// Remove every entry whose ref satisfies the predicate.
    ///
    /// Returns the number of entries removed. Subscribers are notified even
    /// when nothing matched, since the call itself is a mutation.
    pub fn clear_matching(&mut self, predicate: impl Fn(&WarningRef) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|warning_ref, _| !predicate(warning_ref));
        let removed = before - self.entries.len();
        self.subscribers.emit(WarningsChanged);
        removed
    }

    /// Remove every entry
    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.subscribers.emit(WarningsChanged);
    }

    /// Subscribe to change signals; drop the receiver to unsubscribe
    pub fn subscribe(&mut self) -> Receiver<WarningsChanged> {
        self.subscribers.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_dedups_by_ref() {
        let mut warnings = WarningsModel::new();
        warnings.set_warning(WarningRef::for_key("w1"), Warning::new("first"));
        warnings.set_warning(WarningRef::for_key("w1"), Warning::new("second"));
        assert_eq!(warnings.total_warnings(), 1);
        assert_eq!(
            warnings.warning(&WarningRef::for_key("w1")).map(|w| w.message.as_str()),
            Some("second")
        );
    }

    #[test]
    fn test_predicate_clear() {
        let mut warnings = WarningsModel::new();
        warnings.set_warning(WarningRef::for_key("w1"), Warning::new("m1"));
        warnings.set_warning(WarningRef::for_key("w2"), Warning::new("m2"));
        assert_eq!(warnings.total_warnings(), 2);

        let removed = warnings.clear_matching(|r| r.key == "w1");
        assert_eq!(removed, 1);
        assert_eq!(warnings.total_warnings(), 1);
        let remaining: Vec<_> = warnings.warnings().map(|(r, _)| r.key.as_str()).collect();
        assert_eq!(remaining, vec!["w2"]);
    }

    #[test]
    fn test_clear_by_component() {
        let mut warnings = WarningsModel::new();
        warnings.set_warning(
            WarningRef::for_key("dangling").in_component("Root"),
            Warning::new("dangling connection"),
        );
        warnings.set_warning(
            WarningRef::for_key("dangling").in_component("Other"),
            Warning::new("dangling connection"),
        );
        warnings.clear_matching(|r| r.component.as_deref() == Some("Root"));
        assert_eq!(warnings.total_warnings(), 1);
    }

    #[test]
    fn test_mutations_signal_subscribers() {
        let mut warnings = WarningsModel::new();
        let rx = warnings.subscribe();
        warnings.set_warning(WarningRef::for_key("w1"), Warning::new("m1"));
        assert_eq!(rx.try_recv(), Ok(WarningsChanged));
        warnings.clear_all();
        assert_eq!(rx.try_recv(), Ok(WarningsChanged));
        assert_eq!(warnings.total_warnings(), 0);
    }
}
