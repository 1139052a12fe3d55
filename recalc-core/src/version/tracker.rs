//! Version Tracker
//!
//! Each node in an equation tree owns a Tracker: a version stamp plus the
//! dependency edges needed to compute the node's effective version.
//!
//! # How Trackers Work
//!
//! 1. When a node is created or mutated, its tracker is advanced with a
//!    fresh version from the tree's clock.
//!
//! 2. When an argument is attached to an operator, the argument's node id
//!    is recorded as a *subject* of the operator's tracker.
//!
//! 3. The effective version of a node is the max over its own version and
//!    its subjects' effective versions, transitively. That walk needs
//!    access to the whole tree, so it lives on the arena
//!    (`Tree::effective_version`) rather than here.
//!
//! Trees are acyclic by construction, so no cycle check is performed.

use smallvec::SmallVec;

use super::Clock;
use crate::tree::NodeId;

/// A per-node version stamp with dependency edges.
#[derive(Debug, Clone)]
pub struct Tracker {
    /// The version at which this node itself last changed.
    local: u64,

    /// Ids of the nodes this node depends on.
    /// Most operators have few arguments, so the edges are stored inline.
    subjects: SmallVec<[NodeId; 4]>,
}

impl Tracker {
    /// Create a tracker that has never been advanced (version 0).
    pub fn new() -> Self {
        Self {
            local: 0,
            subjects: SmallVec::new(),
        }
    }

    /// Stamp this tracker with a fresh version from the clock.
    ///
    /// After this call the tracker's local version is greater than every
    /// version the clock issued before.
    pub fn advance(&mut self, clock: &Clock) {
        self.local = clock.tick();
    }

    /// Record a dependency edge. Idempotent.
    pub fn add_subject(&mut self, id: NodeId) {
        if !self.subjects.contains(&id) {
            self.subjects.push(id);
        }
    }

    /// The version at which this node itself last changed.
    pub fn local_version(&self) -> u64 {
        self.local
    }

    /// Ids of the nodes this tracker depends on.
    pub fn subjects(&self) -> &[NodeId] {
        &self.subjects
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}
