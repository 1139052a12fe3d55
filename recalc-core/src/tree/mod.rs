//! Equation Trees
//!
//! This module defines the data model the engine evaluates: values, the
//! closed set of node variants, and the arena that owns them.
//!
//! # Overview
//!
//! An equation is a directed acyclic tree of nodes stored in a [`Tree`]
//! arena and addressed by [`NodeId`]. Leaves hold values, operators hold
//! ordered argument lists and an operation, partitions hold named
//! multi-part values, and generators wrap a child they may regenerate.
//!
//! Topology is append-only: arguments can be added but never reordered or
//! removed. Mutating a node's value, tags, or may-combine flag advances its
//! version tracker, which is what the engine compares against its horizon
//! to decide what to recompute.

mod node;
mod store;
mod value;

pub use node::{
    combine_sum, CombineFn, GeneratorNode, LeafNode, Node, NodeId, NodeKind, OperatorNode,
    PartitionNode, PartsValue, ProxyValue, RefreshFn, RegenFn, TagMap,
};
pub use store::Tree;
pub use value::Value;
