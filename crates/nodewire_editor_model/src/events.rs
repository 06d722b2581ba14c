// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notifications for model subscribers.
//!
//! Subscribers hold their own [`std::sync::mpsc::Receiver`]; unsubscribing
//! is dropping it. The emitter prunes disconnected senders on the next emit,
//! so there is no emitter-held subscriber registry to leak.

use crate::document::Connection;
use std::sync::mpsc::{channel, Receiver, Sender};

/// A change to the project graph, scoped to one component
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEvent {
    /// Name of the affected component
    pub component: String,
    /// What changed
    pub change: ModelChange,
}

/// The kind of change a [`ModelEvent`] describes
#[derive(Debug, Clone, PartialEq)]
pub enum ModelChange {
    /// A component was added to the project
    ComponentAdded,
    /// A component was removed from the project
    ComponentRemoved,
    /// A node was added
    NodeAdded {
        /// Id of the new node
        id: String,
    },
    /// A node (and its subtree and connections) was removed
    NodeRemoved {
        /// Id of the removed node
        id: String,
    },
    /// A parameter value was set
    ParameterSet {
        /// Id of the node
        node: String,
        /// Parameter name
        name: String,
    },
    /// A parameter was removed
    ParameterRemoved {
        /// Id of the node
        node: String,
        /// Parameter name
        name: String,
    },
    /// A connection was added
    ConnectionAdded {
        /// The new connection
        connection: Connection,
    },
    /// A connection was removed
    ConnectionRemoved {
        /// The removed connection
        connection: Connection,
    },
}

/// Channel fan-out to any number of subscribers
#[derive(Debug)]
pub struct Subscribers<T: Clone> {
    senders: Vec<Sender<T>>,
}

impl<T: Clone> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Subscribers<T> {
    /// Create a fan-out with no subscribers
    pub fn new() -> Self {
        Self {
            senders: Vec::new(),
        }
    }

    /// Subscribe; the returned receiver is the subscription handle
    pub fn subscribe(&mut self) -> Receiver<T> {
        let (tx, rx) = channel();
        self.senders.push(tx);
        rx
    }

    /// Send an event to every live subscriber, pruning dropped ones
    pub fn emit(&mut self, event: T) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers as of the last emit
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Whether no subscribers are registered
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
