// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural diff and three-way merge for NodeWire Editor documents.
//!
//! The diff engine classifies ordered, identity-keyed collections into
//! created/deleted/changed/unchanged buckets; the merge engine reconciles
//! two divergent edits of a project document against their common ancestor,
//! auto-merging what it safely can and surfacing everything else as
//! conflicts. Both are pure over their inputs, so the version-control layer
//! can call them speculatively.

pub mod diff;
pub mod merge;

pub use diff::{diff, Changed, DiffResult};
pub use merge::{merge, EntityRef, MergeConflict, MergeOutcome, Side};
