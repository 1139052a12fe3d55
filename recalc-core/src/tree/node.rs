//! Tree Nodes
//!
//! An equation tree is a closed tagged union of four node variants:
//!
//! - **Leaf**: holds one value; terminal in the dependency graph.
//! - **Operator**: holds an ordered argument list, an operation, selector
//!   tags, a may-combine flag, and a cached result proxy.
//! - **Partition**: a structured multi-part value with a tag-to-index map
//!   and a reduction function.
//! - **Generator**: wraps one child and may refresh or replace it in
//!   response to the engine's horizon.
//!
//! Every node owns a [`Tracker`]. The engine dispatches on the variant with
//! a plain `match`; new leaf-like variants extend the enum rather than an
//! open trait hierarchy.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use super::value::Value;
use crate::ops::Op;
use crate::version::Tracker;

/// Unique identifier for a node within one [`Tree`](super::Tree).
///
/// Ids are arena indices: stable for the lifetime of the tree, never
/// reused, and meaningless outside the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// Get the raw id value.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Mapping from tag name to the part indices that carry the tag.
///
/// An index may appear under multiple tags; a tag that is absent selects no
/// parts. All indices must be valid positions into the partition's parts.
pub type TagMap = IndexMap<String, Vec<usize>>;

/// Reduction function collapsing a partition's parts to one value.
pub type CombineFn = Arc<dyn Fn(&[Value]) -> Value>;

/// Callback refreshing a partition's part values in place.
///
/// Invoked by the engine when the partition's version exceeds the engine's
/// horizon, before the parts are read.
pub type RefreshFn = Box<dyn FnMut(&mut Vec<Value>)>;

/// Callback regenerating a generator's wrapped child.
///
/// Receives the engine's horizon version; returning `Some(id)` replaces the
/// wrapped child before traversal delegates to it.
pub type RegenFn = Box<dyn FnMut(u64) -> Option<NodeId>>;

/// The default reduction: sum every element of every part.
pub fn combine_sum() -> CombineFn {
    Arc::new(|parts| Value::Scalar(parts.iter().map(Value::sum).sum()))
}

/// A partition-shaped intermediate result.
///
/// Carries the source partition's tag map and reduction function alongside
/// the (possibly operated-upon) part values, so selector-tag operators
/// higher in the tree can keep acting on individual parts.
#[derive(Clone)]
pub struct PartsValue {
    /// Per-part values, positionally aligned with the tag map's indices.
    pub parts: Vec<Value>,

    /// Shared with the source partition; never rewritten by operators.
    pub tagmap: Arc<TagMap>,

    /// The source partition's reduction function.
    pub combine: CombineFn,
}

impl PartsValue {
    /// Reduce the parts to a single value via the partition's combine.
    pub fn combine_all(&self) -> Value {
        (self.combine)(&self.parts)
    }
}

impl fmt::Debug for PartsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartsValue")
            .field("parts", &self.parts)
            .field("tags", &self.tagmap.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The cached result of an operator, reused across traversals until the
/// operator's effective version passes the engine's horizon.
#[derive(Debug, Clone)]
pub enum ProxyValue {
    /// A plain scalar/array result.
    Plain(Value),

    /// A partition-shaped result awaiting combination further up the tree.
    Parts(PartsValue),
}

/// A terminal value holder.
#[derive(Debug)]
pub struct LeafNode {
    pub(crate) value: Value,
}

/// An internal operator node.
pub struct OperatorNode {
    pub(crate) op: Op,

    /// Ordered arguments; order fixes positional binding to the operation.
    pub(crate) args: SmallVec<[NodeId; 4]>,

    /// Selector tags. Empty means "apply to all parts of a partition".
    pub(crate) tags: IndexSet<String>,

    /// Whether a partition-shaped result may be combined here even when the
    /// operator is not at the traversal root.
    pub(crate) can_combine: bool,

    /// Cached result, overwritten in place on recomputation.
    pub(crate) proxy: Option<ProxyValue>,
}

/// A structured multi-part value container.
///
/// The number of parts is fixed for the container's lifetime; the refresh
/// callback may rewrite part values but not add or remove parts.
pub struct PartitionNode {
    pub(crate) parts: Vec<Value>,
    pub(crate) tagmap: Arc<TagMap>,
    pub(crate) combine: CombineFn,
    pub(crate) refresh: Option<RefreshFn>,
}

/// A dynamic node wrapping exactly one child.
pub struct GeneratorNode {
    pub(crate) child: NodeId,
    pub(crate) regen: RegenFn,
}

/// The node variants of an equation tree.
pub enum NodeKind {
    Leaf(LeafNode),
    Operator(OperatorNode),
    Partition(PartitionNode),
    Generator(GeneratorNode),
}

impl NodeKind {
    /// Variant name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Leaf(_) => "leaf",
            NodeKind::Operator(_) => "operator",
            NodeKind::Partition(_) => "partition",
            NodeKind::Generator(_) => "generator",
        }
    }
}

/// A node in the equation tree: a variant plus its version tracker.
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) tracker: Tracker,
}

impl Node {
    /// The node variant.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The node's version tracker.
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind.name())
            .field("version", &self.tracker.local_version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_sum_reduces_mixed_parts() {
        let combine = combine_sum();
        let parts = vec![
            Value::Scalar(1.0),
            Value::Array(vec![2.0, 3.0]),
            Value::Scalar(4.0),
        ];
        assert_eq!(combine(&parts), Value::Scalar(10.0));
    }

    #[test]
    fn parts_value_combines_through_its_own_function() {
        let pv = PartsValue {
            parts: vec![Value::Scalar(2.0), Value::Scalar(3.0)],
            tagmap: Arc::new(TagMap::new()),
            combine: Arc::new(|parts| {
                Value::Scalar(parts.iter().map(Value::sum).product())
            }),
        };
        assert_eq!(pv.combine_all(), Value::Scalar(6.0));
    }

    #[test]
    fn node_ids_compare_by_index() {
        assert_eq!(NodeId::new(3), NodeId::new(3));
        assert_ne!(NodeId::new(3), NodeId::new(4));
        assert_eq!(NodeId::new(5).raw(), 5);
    }
}
