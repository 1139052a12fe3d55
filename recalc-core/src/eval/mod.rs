//! Incremental Evaluation
//!
//! This module implements the traversal that computes an equation tree's
//! value: the [`Evaluator`] engine with its horizon-based staleness test,
//! and the per-operator frame that applies the partition propagation
//! rules.
//!
//! # Why Propagate Partition Shape?
//!
//! A selector-tag operator high in the tree can act on a strict subset of
//! parts produced several levels below it only if intermediate operators
//! pass the parts through untouched instead of collapsing them. Reduction
//! happens at the traversal root, at operators whose may-combine flag is
//! set, and whenever two partitions meet (their index spaces cannot be
//! reconciled, so each collapses through its own combine).

mod engine;
mod frame;

pub use engine::Evaluator;
