//! Evaluation Engine
//!
//! The Evaluator walks an equation tree and computes its value, reusing
//! every operator's cached proxy whose effective version has not passed
//! the engine's horizon.
//!
//! # How Evaluation Works
//!
//! 1. The caller evaluates the root. Nodes are dispatched top-down; values
//!    are computed bottom-up.
//!
//! 2. Every operator the engine recomputes stores its result in its proxy
//!    slot. On the next traversal, a proxy whose operator has not changed
//!    (effective version <= horizon) is reused without visiting the
//!    operator's arguments.
//!
//! 3. After consuming the value, the caller advances the engine's horizon.
//!    Mutations made after that (and only those) are seen as changes by
//!    the next traversal.
//!
//! # Usage Discipline
//!
//! One engine performs one complete traversal at a time: evaluate, consume,
//! advance, repeat. A tree whose *topology* changed (arguments appended)
//! must be traversed with a fresh engine — a stale horizon cannot detect a
//! change that did not advance any version.
//!
//! # Partition-Free Fast Path
//!
//! [`Evaluator::flat`] builds an engine for trees statically known to
//! contain no partitions. It skips all partition bookkeeping and caches
//! plain values only. Selecting it is the caller's choice; the engine
//! never infers it. A partition reached in flat mode is reduced to a
//! scalar on the spot.

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::frame::{Frame, Outcome};
use crate::error::EvalError;
use crate::ops::Op;
use crate::tree::{Node, NodeId, NodeKind, PartsValue, Tree, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    Flat,
}

/// What a visit must do for one node, decided under a short immutable
/// borrow so each arm can take the borrow it needs.
enum Plan {
    Leaf(Value),
    Partition { stale: bool },
    Generator,
    Reuse(Outcome),
    Recompute {
        op: Op,
        args: SmallVec<[NodeId; 4]>,
        tags: IndexSet<String>,
        can_combine: bool,
    },
}

/// An incremental traversal context over one equation tree.
///
/// Engines are cheap and disposable; the durable cache lives in the tree's
/// operator proxies, which any number of (sequential) engines share.
pub struct Evaluator {
    /// Versions at or below this are considered unchanged.
    horizon: u64,

    /// True until the first node of a traversal has been visited.
    at_root: bool,

    mode: Mode,
}

impl Evaluator {
    /// Create an engine that handles partitions (the general case).
    ///
    /// The horizon starts at 0, so the first traversal computes everything.
    pub fn new() -> Self {
        Self {
            horizon: 0,
            at_root: true,
            mode: Mode::Full,
        }
    }

    /// Create an engine for a tree known to contain no partitions.
    pub fn flat() -> Self {
        Self {
            horizon: 0,
            at_root: true,
            mode: Mode::Flat,
        }
    }

    /// The engine's current horizon version.
    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    /// Advance the horizon past every version issued so far.
    ///
    /// Call after consuming a computed value; the next traversal then
    /// recomputes only what changed afterwards.
    pub fn advance(&mut self, tree: &Tree) {
        self.horizon = tree.clock().tick();
        self.at_root = true;
    }

    /// Compute the value of the tree rooted at `root`.
    ///
    /// A partition-shaped result at the root is always reduced to a plain
    /// value before returning.
    pub fn evaluate(&mut self, tree: &mut Tree, root: NodeId) -> Result<Value, EvalError> {
        self.at_root = true;
        match self.mode {
            Mode::Full => match self.visit(tree, root)? {
                Outcome::Plain(value) => Ok(value),
                Outcome::Parts(pv) => Ok(pv.combine_all()),
            },
            Mode::Flat => self.visit_flat(tree, root),
        }
    }

    fn plan(&self, tree: &Tree, id: NodeId) -> Result<Plan, EvalError> {
        let effective = tree.effective_version(id)?;
        let plan = match &tree.node(id)?.kind {
            NodeKind::Leaf(leaf) => Plan::Leaf(leaf.value.clone()),
            NodeKind::Partition(_) => Plan::Partition {
                stale: effective > self.horizon,
            },
            NodeKind::Generator(_) => Plan::Generator,
            NodeKind::Operator(node) => {
                if effective <= self.horizon {
                    if let Some(proxy) = &node.proxy {
                        return Ok(Plan::Reuse(Outcome::from_proxy(proxy)));
                    }
                }
                Plan::Recompute {
                    op: node.op.clone(),
                    args: node.args.clone(),
                    tags: node.tags.clone(),
                    can_combine: node.can_combine,
                }
            }
        };
        Ok(plan)
    }

    fn visit(&mut self, tree: &mut Tree, id: NodeId) -> Result<Outcome, EvalError> {
        match self.plan(tree, id)? {
            Plan::Leaf(value) => {
                self.at_root = false;
                Ok(Outcome::Plain(value))
            }

            Plan::Partition { stale } => {
                let at_root = self.at_root;
                let pv = Self::partition_value(tree, id, stale)?;
                if at_root {
                    // No enclosing operator will get the chance, so reduce
                    // here.
                    Ok(Outcome::Plain(pv.combine_all()))
                } else {
                    Ok(Outcome::Parts(pv))
                }
            }

            Plan::Generator => {
                let child = self.regenerate(tree, id)?;
                self.visit(tree, child)
            }

            Plan::Reuse(outcome) => {
                debug!(node = id.raw(), "reusing cached proxy");
                self.at_root = false;
                Ok(outcome)
            }

            Plan::Recompute {
                op,
                args,
                tags,
                can_combine,
            } => {
                let was_root = self.at_root;
                self.at_root = false;
                debug!(op = op.name(), node = id.raw(), "recomputing operator");

                let mut frame = Frame::with_capacity(args.len());
                for &arg in &args {
                    let outcome = self.visit(tree, arg)?;
                    frame.push(outcome);
                }

                let mut outcome = frame.evaluate(&op, &tags)?;

                // Combination is forced at the traversal root and wherever
                // the operator opts in; otherwise the partition shape
                // propagates upward.
                if was_root || can_combine {
                    if let Outcome::Parts(pv) = &outcome {
                        trace!(op = op.name(), "combining partition-shaped result");
                        outcome = Outcome::Plain(pv.combine_all());
                    }
                }

                self.store_proxy(tree, id, &outcome)?;
                Ok(outcome)
            }
        }
    }

    /// Refresh a stale partition in place and snapshot its contract.
    fn partition_value(tree: &mut Tree, id: NodeId, stale: bool) -> Result<PartsValue, EvalError> {
        let node = tree.node_mut(id)?;
        match &mut node.kind {
            NodeKind::Partition(part) => {
                if stale {
                    if let Some(refresh) = part.refresh.as_mut() {
                        trace!(node = id.raw(), "refreshing stale partition");
                        refresh(&mut part.parts);
                    }
                }
                Ok(PartsValue {
                    parts: part.parts.clone(),
                    tagmap: part.tagmap.clone(),
                    combine: part.combine.clone(),
                })
            }
            _ => Err(EvalError::WrongKind {
                id,
                expected: "partition",
            }),
        }
    }

    /// Run a generator's regenerate callback and return the wrapped child.
    ///
    /// The dependency edge to the child is re-registered on every visit,
    /// and an identity change bumps the generator's version, so ancestors
    /// cannot reuse a proxy computed against the old child.
    fn regenerate(&self, tree: &mut Tree, id: NodeId) -> Result<NodeId, EvalError> {
        let clock = tree.clock().clone();
        let node = tree.node_mut(id)?;
        let Node { kind, tracker } = node;
        match kind {
            NodeKind::Generator(gen) => {
                let replacement = (gen.regen)(self.horizon);
                if let Some(new_child) = replacement {
                    if new_child != gen.child {
                        trace!(
                            node = id.raw(),
                            child = new_child.raw(),
                            "generator replaced its child"
                        );
                        gen.child = new_child;
                        tracker.advance(&clock);
                    }
                }
                tracker.add_subject(gen.child);
                Ok(gen.child)
            }
            _ => Err(EvalError::WrongKind {
                id,
                expected: "generator",
            }),
        }
    }

    fn store_proxy(&self, tree: &mut Tree, id: NodeId, outcome: &Outcome) -> Result<(), EvalError> {
        match &mut tree.node_mut(id)?.kind {
            NodeKind::Operator(node) => {
                // Overwrite in place; the slot identity (the node id) is
                // stable across traversals.
                node.proxy = Some(outcome.to_proxy());
                Ok(())
            }
            _ => Err(EvalError::WrongKind {
                id,
                expected: "operator",
            }),
        }
    }

    /// Partition-free recursion: plain values only, no frame.
    fn visit_flat(&mut self, tree: &mut Tree, id: NodeId) -> Result<Value, EvalError> {
        match self.plan(tree, id)? {
            Plan::Leaf(value) => Ok(value),

            Plan::Partition { stale } => {
                let pv = Self::partition_value(tree, id, stale)?;
                Ok(pv.combine_all())
            }

            Plan::Generator => {
                let child = self.regenerate(tree, id)?;
                self.visit_flat(tree, child)
            }

            Plan::Reuse(Outcome::Plain(value)) => {
                debug!(node = id.raw(), "reusing cached proxy");
                Ok(value)
            }

            // A partition-shaped proxy can only come from a full-mode
            // engine; recompute rather than guess at its meaning here.
            Plan::Reuse(Outcome::Parts(_))
            | Plan::Recompute { .. } => {
                let (op, args) = match &tree.node(id)?.kind {
                    NodeKind::Operator(node) => (node.op.clone(), node.args.clone()),
                    _ => {
                        return Err(EvalError::WrongKind {
                            id,
                            expected: "operator",
                        })
                    }
                };
                debug!(op = op.name(), node = id.raw(), "recomputing operator");

                let mut vals = Vec::with_capacity(args.len());
                for &arg in &args {
                    vals.push(self.visit_flat(tree, arg)?);
                }
                let value = op.apply(&vals)?;
                self.store_proxy(tree, id, &Outcome::Plain(value.clone()))?;
                Ok(value)
            }
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::ops;

    /// An add operation that counts its invocations.
    fn counted_add(counter: &Arc<AtomicUsize>) -> Op {
        let counter = Arc::clone(counter);
        Op::new("add", "+", 2, move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            args[0].zip_with(&args[1], |a, b| a + b)
        })
    }

    #[test]
    fn evaluates_a_plain_tree() {
        let mut tree = Tree::new();
        let x = tree.leaf(2.0);
        let y = tree.leaf(3.0);
        let add = tree.operator(ops::add());
        tree.add_argument(add, x).unwrap();
        tree.add_argument(add, y).unwrap();

        let mut engine = Evaluator::new();
        assert_eq!(engine.evaluate(&mut tree, add).unwrap(), Value::Scalar(5.0));
    }

    #[test]
    fn clean_retraversal_reuses_the_proxy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut tree = Tree::new();
        let x = tree.leaf(2.0);
        let y = tree.leaf(3.0);
        let add = tree.operator(counted_add(&calls));
        tree.add_argument(add, x).unwrap();
        tree.add_argument(add, y).unwrap();

        let mut engine = Evaluator::new();
        assert_eq!(engine.evaluate(&mut tree, add).unwrap(), Value::Scalar(5.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        engine.advance(&tree);
        assert_eq!(engine.evaluate(&mut tree, add).unwrap(), Value::Scalar(5.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "operation must not rerun");
    }

    #[test]
    fn leaf_mutation_forces_recomputation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut tree = Tree::new();
        let x = tree.leaf(2.0);
        let y = tree.leaf(3.0);
        let add = tree.operator(counted_add(&calls));
        tree.add_argument(add, x).unwrap();
        tree.add_argument(add, y).unwrap();

        let mut engine = Evaluator::new();
        engine.evaluate(&mut tree, add).unwrap();
        engine.advance(&tree);

        tree.set_value(x, 10.0).unwrap();
        assert_eq!(
            engine.evaluate(&mut tree, add).unwrap(),
            Value::Scalar(13.0)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unadvanced_horizon_still_sees_all_mutations() {
        // The horizon only moves when the caller advances it; until then
        // every node version stays above it.
        let mut tree = Tree::new();
        let x = tree.leaf(2.0);
        let neg = tree.operator(ops::negate());
        tree.add_argument(neg, x).unwrap();

        let mut engine = Evaluator::new();
        assert_eq!(
            engine.evaluate(&mut tree, neg).unwrap(),
            Value::Scalar(-2.0)
        );

        // Horizon still 0, but the leaf's version already exceeded it
        // before the first traversal, so the change is still picked up.
        tree.set_value(x, 5.0).unwrap();
        assert_eq!(
            engine.evaluate(&mut tree, neg).unwrap(),
            Value::Scalar(-5.0)
        );
    }

    #[test]
    fn flat_mode_matches_full_mode_on_partition_free_trees() {
        let mut tree = Tree::new();
        let x = tree.leaf(vec![1.0, 2.0, 3.0]);
        let total = tree.operator(ops::sum());
        tree.add_argument(total, x).unwrap();
        let neg = tree.operator(ops::negate());
        tree.add_argument(neg, total).unwrap();

        let mut full = Evaluator::new();
        let expected = full.evaluate(&mut tree, neg).unwrap();

        let mut flat = Evaluator::flat();
        assert_eq!(flat.evaluate(&mut tree, neg).unwrap(), expected);
        assert_eq!(expected, Value::Scalar(-6.0));
    }

    #[test]
    fn flat_mode_caches_plain_proxies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut tree = Tree::new();
        let x = tree.leaf(1.0);
        let y = tree.leaf(2.0);
        let add = tree.operator(counted_add(&calls));
        tree.add_argument(add, x).unwrap();
        tree.add_argument(add, y).unwrap();

        let mut engine = Evaluator::flat();
        engine.evaluate(&mut tree, add).unwrap();
        engine.advance(&tree);
        engine.evaluate(&mut tree, add).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
