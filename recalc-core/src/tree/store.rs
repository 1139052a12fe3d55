//! Tree Arena
//!
//! All nodes of one equation live in a centralized arena indexed by
//! [`NodeId`]. The arena owns the version clock, wires dependency edges
//! when arguments are attached, and exposes the mutation API that advances
//! node versions.
//!
//! # Design Decisions
//!
//! 1. A centralized arena rather than a reference-counted object graph:
//!    operator proxies live in their arena slot, so "the proxy" is the
//!    slot's current contents, addressed by id. There is no aliased
//!    mutable object to race on across engines.
//!
//! 2. The tree is append-only in topology. Children are never reordered or
//!    removed; appending an argument after a traversal invalidates reuse of
//!    any engine that already visited the tree (use a fresh engine).
//!
//! 3. Every lookup returns a `Result` so a mismatched id surfaces as an
//!    error instead of a panic.

use std::sync::Arc;

use smallvec::SmallVec;

use super::node::{
    CombineFn, GeneratorNode, LeafNode, Node, NodeId, NodeKind, OperatorNode, PartitionNode,
    ProxyValue, RefreshFn, RegenFn, TagMap,
};
use super::value::Value;
use crate::error::EvalError;
use crate::ops::Op;
use crate::version::{Clock, Tracker};

/// An equation tree: an arena of nodes plus the clock that stamps them.
pub struct Tree {
    nodes: Vec<Node>,
    clock: Clock,
}

impl Tree {
    /// Create an empty tree with its own isolated clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::new())
    }

    /// Create an empty tree sharing an existing clock.
    ///
    /// Useful when several trees must agree on a single version space.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            nodes: Vec::new(),
            clock,
        }
    }

    /// The clock stamping this tree's nodes.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        let mut tracker = Tracker::new();
        // Stamp at creation so a fresh engine (horizon 0) sees the node as
        // changed.
        tracker.advance(&self.clock);
        self.nodes.push(Node { kind, tracker });
        id
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Add a leaf holding the given value.
    pub fn leaf(&mut self, value: impl Into<Value>) -> NodeId {
        self.insert(NodeKind::Leaf(LeafNode {
            value: value.into(),
        }))
    }

    /// Add an operator node parameterized by `op`.
    ///
    /// The node starts with no arguments, no tags, and the may-combine flag
    /// taken from the operation's default.
    pub fn operator(&mut self, op: Op) -> NodeId {
        let can_combine = op.combines();
        self.insert(NodeKind::Operator(OperatorNode {
            op,
            args: SmallVec::new(),
            tags: Default::default(),
            can_combine,
            proxy: None,
        }))
    }

    /// Add a partition with fixed parts, a tag map, and a reduction.
    ///
    /// Every index in `tagmap` must be a valid position into `parts`; the
    /// part count is fixed for the partition's lifetime.
    pub fn partition(
        &mut self,
        parts: Vec<Value>,
        tagmap: TagMap,
        combine: CombineFn,
    ) -> Result<NodeId, EvalError> {
        Self::check_tagmap(&tagmap, parts.len())?;
        Ok(self.insert(NodeKind::Partition(PartitionNode {
            parts,
            tagmap: Arc::new(tagmap),
            combine,
            refresh: None,
        })))
    }

    /// Add a partition whose parts are refreshed on demand.
    ///
    /// The callback runs when the engine finds the partition stale, before
    /// the parts are read. It may rewrite part values but must preserve the
    /// part count.
    pub fn partition_with_refresh(
        &mut self,
        parts: Vec<Value>,
        tagmap: TagMap,
        combine: CombineFn,
        refresh: RefreshFn,
    ) -> Result<NodeId, EvalError> {
        Self::check_tagmap(&tagmap, parts.len())?;
        Ok(self.insert(NodeKind::Partition(PartitionNode {
            parts,
            tagmap: Arc::new(tagmap),
            combine,
            refresh: Some(refresh),
        })))
    }

    /// Add a generator wrapping `child`.
    pub fn generator(&mut self, child: NodeId, regen: RegenFn) -> Result<NodeId, EvalError> {
        self.node(child)?;
        let id = self.insert(NodeKind::Generator(GeneratorNode { child, regen }));
        self.nodes[id.index()].tracker.add_subject(child);
        Ok(id)
    }

    fn check_tagmap(tagmap: &TagMap, len: usize) -> Result<(), EvalError> {
        for indices in tagmap.values() {
            for &index in indices {
                if index >= len {
                    return Err(EvalError::PartIndex { index, len });
                }
            }
        }
        Ok(())
    }

    /// Append an argument to an operator.
    ///
    /// Order matters: the first argument added binds the leftmost position
    /// of the operation. The argument's tracker becomes a subject of the
    /// operator's tracker, so the operator is never seen as older than any
    /// argument.
    pub fn add_argument(&mut self, operator: NodeId, child: NodeId) -> Result<(), EvalError> {
        self.node(child)?;
        {
            let node = self.operator_mut(operator)?;
            node.args.push(child);
        }
        self.nodes[operator.index()].tracker.add_subject(child);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Advance a node's version without changing its contents.
    ///
    /// Used when external state a generator's regenerate callback or a
    /// partition's refresh callback reads has changed behind the tree's
    /// back.
    pub fn touch(&mut self, id: NodeId) -> Result<(), EvalError> {
        self.node(id)?;
        self.nodes[id.index()].tracker.advance(&self.clock);
        Ok(())
    }

    /// Replace a leaf's value, advancing its version.
    pub fn set_value(&mut self, leaf: NodeId, value: impl Into<Value>) -> Result<(), EvalError> {
        let value = value.into();
        match &mut self.node_mut(leaf)?.kind {
            NodeKind::Leaf(node) => node.value = value,
            _ => {
                return Err(EvalError::WrongKind {
                    id: leaf,
                    expected: "leaf",
                });
            }
        }
        self.nodes[leaf.index()].tracker.advance(&self.clock);
        Ok(())
    }

    /// Replace one part of a partition, advancing its version.
    pub fn set_part(
        &mut self,
        partition: NodeId,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), EvalError> {
        let value = value.into();
        {
            let node = self.partition_mut(partition)?;
            let len = node.parts.len();
            let slot = node
                .parts
                .get_mut(index)
                .ok_or(EvalError::PartIndex { index, len })?;
            *slot = value;
        }
        self.nodes[partition.index()].tracker.advance(&self.clock);
        Ok(())
    }

    /// Add a selector tag to an operator.
    ///
    /// Invalidates the cached proxy and advances the operator's version.
    pub fn add_tag(&mut self, operator: NodeId, tag: &str) -> Result<(), EvalError> {
        {
            let node = self.operator_mut(operator)?;
            node.tags.insert(tag.to_owned());
            node.proxy = None;
        }
        self.nodes[operator.index()].tracker.advance(&self.clock);
        Ok(())
    }

    /// Remove all selector tags from an operator.
    ///
    /// Invalidates the cached proxy and advances the operator's version.
    pub fn clear_tags(&mut self, operator: NodeId) -> Result<(), EvalError> {
        {
            let node = self.operator_mut(operator)?;
            node.tags.clear();
            node.proxy = None;
        }
        self.nodes[operator.index()].tracker.advance(&self.clock);
        Ok(())
    }

    /// Set whether the operator may combine a partition-shaped result.
    ///
    /// Toggling the flag invalidates the cached proxy and advances the
    /// operator's version; setting it to its current value is a no-op.
    pub fn set_can_combine(&mut self, operator: NodeId, flag: bool) -> Result<(), EvalError> {
        {
            let node = self.operator_mut(operator)?;
            if node.can_combine == flag {
                return Ok(());
            }
            node.can_combine = flag;
            node.proxy = None;
        }
        self.nodes[operator.index()].tracker.advance(&self.clock);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Result<&Node, EvalError> {
        self.nodes.get(id.index()).ok_or(EvalError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, EvalError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(EvalError::UnknownNode(id))
    }

    fn operator_mut(&mut self, id: NodeId) -> Result<&mut OperatorNode, EvalError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Operator(node) => Ok(node),
            _ => Err(EvalError::WrongKind {
                id,
                expected: "operator",
            }),
        }
    }

    fn partition_mut(&mut self, id: NodeId) -> Result<&mut PartitionNode, EvalError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Partition(node) => Ok(node),
            _ => Err(EvalError::WrongKind {
                id,
                expected: "partition",
            }),
        }
    }

    /// A leaf's current value.
    pub fn value(&self, leaf: NodeId) -> Result<&Value, EvalError> {
        match &self.node(leaf)?.kind {
            NodeKind::Leaf(node) => Ok(&node.value),
            _ => Err(EvalError::WrongKind {
                id: leaf,
                expected: "leaf",
            }),
        }
    }

    /// A partition's current part values.
    pub fn parts(&self, partition: NodeId) -> Result<&[Value], EvalError> {
        match &self.node(partition)?.kind {
            NodeKind::Partition(node) => Ok(&node.parts),
            _ => Err(EvalError::WrongKind {
                id: partition,
                expected: "partition",
            }),
        }
    }

    /// An operator's cached result proxy, if any traversal has filled it.
    ///
    /// Callers that leave partition-shaped results uncombined re-inspect
    /// the proxy through this accessor.
    pub fn proxy(&self, operator: NodeId) -> Result<Option<&ProxyValue>, EvalError> {
        match &self.node(operator)?.kind {
            NodeKind::Operator(node) => Ok(node.proxy.as_ref()),
            _ => Err(EvalError::WrongKind {
                id: operator,
                expected: "operator",
            }),
        }
    }

    /// The effective version of a node: the max over its own version and
    /// all its subjects' effective versions, transitively.
    ///
    /// Computed on demand with no caching; the proxy scheme memoizes
    /// results, not versions.
    pub fn effective_version(&self, id: NodeId) -> Result<u64, EvalError> {
        let node = self.node(id)?;
        let mut version = node.tracker.local_version();
        for &subject in node.tracker.subjects() {
            version = version.max(self.effective_version(subject)?);
        }
        Ok(version)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;
    use crate::tree::node::combine_sum;

    #[test]
    fn leaf_roundtrip() {
        let mut tree = Tree::new();
        let x = tree.leaf(3.0);

        assert_eq!(tree.value(x).unwrap(), &Value::Scalar(3.0));

        tree.set_value(x, 7.0).unwrap();
        assert_eq!(tree.value(x).unwrap(), &Value::Scalar(7.0));
    }

    #[test]
    fn operator_effective_version_covers_arguments() {
        let mut tree = Tree::new();
        let x = tree.leaf(1.0);
        let y = tree.leaf(2.0);
        let add = tree.operator(ops::add());
        tree.add_argument(add, x).unwrap();
        tree.add_argument(add, y).unwrap();

        let before = tree.effective_version(add).unwrap();

        // Mutating a leaf must be visible through the operator.
        tree.set_value(x, 5.0).unwrap();
        let after = tree.effective_version(add).unwrap();
        assert!(after > before);
        assert_eq!(
            after,
            tree.effective_version(x).unwrap(),
            "operator inherits the newest argument version"
        );
    }

    #[test]
    fn tag_mutation_bumps_version_and_drops_proxy() {
        let mut tree = Tree::new();
        let op = tree.operator(ops::negate());

        let before = tree.effective_version(op).unwrap();
        tree.add_tag(op, "core").unwrap();
        assert!(tree.effective_version(op).unwrap() > before);
        assert!(tree.proxy(op).unwrap().is_none());

        let before = tree.effective_version(op).unwrap();
        tree.clear_tags(op).unwrap();
        assert!(tree.effective_version(op).unwrap() > before);
    }

    #[test]
    fn set_can_combine_is_noop_when_unchanged() {
        let mut tree = Tree::new();
        let op = tree.operator(ops::add());

        let before = tree.effective_version(op).unwrap();
        tree.set_can_combine(op, false).unwrap();
        assert_eq!(tree.effective_version(op).unwrap(), before);

        tree.set_can_combine(op, true).unwrap();
        assert!(tree.effective_version(op).unwrap() > before);
    }

    #[test]
    fn partition_rejects_out_of_range_tag_indices() {
        let mut tree = Tree::new();
        let mut tagmap = TagMap::new();
        tagmap.insert("a".to_owned(), vec![0, 3]);

        let err = tree
            .partition(
                vec![Value::Scalar(1.0), Value::Scalar(2.0)],
                tagmap,
                combine_sum(),
            )
            .unwrap_err();
        assert_eq!(err, EvalError::PartIndex { index: 3, len: 2 });
    }

    #[test]
    fn wrong_kind_lookups_fail() {
        let mut tree = Tree::new();
        let x = tree.leaf(1.0);

        assert!(matches!(
            tree.parts(x).unwrap_err(),
            EvalError::WrongKind { expected: "partition", .. }
        ));
        assert!(matches!(
            tree.proxy(x).unwrap_err(),
            EvalError::WrongKind { expected: "operator", .. }
        ));
        assert!(matches!(
            tree.add_argument(x, x).unwrap_err(),
            EvalError::WrongKind { expected: "operator", .. }
        ));
    }

    #[test]
    fn unknown_ids_fail() {
        let tree = Tree::new();
        let bogus = NodeId::new(9);
        assert_eq!(
            tree.effective_version(bogus).unwrap_err(),
            EvalError::UnknownNode(bogus)
        );
    }
}
