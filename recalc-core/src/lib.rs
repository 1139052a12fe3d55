//! Recalc Core
//!
//! This crate provides an incremental evaluation engine for symbolic
//! equations represented as trees of composable nodes. It implements:
//!
//! - Version tracking for dependency-aware staleness detection
//! - An arena-based equation tree with leaf, operator, partition, and
//!   generator nodes
//! - An evaluator that recomputes only the subtrees whose inputs changed,
//!   caching a result proxy on every operator it visits
//! - A catalog of concrete operators (arithmetic, reduction, convolution,
//!   packing, polynomial evaluation)
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `version`: monotonic clock and per-node version trackers
//! - `tree`: values, node variants, and the arena that owns them
//! - `eval`: the incremental traversal engine and partition propagation
//! - `ops`: the typed operation contract and the operator library
//!
//! # Example
//!
//! ```rust
//! use recalc_core::{ops, Evaluator, Tree, Value};
//!
//! let mut tree = Tree::new();
//! let x = tree.leaf(2.0);
//! let y = tree.leaf(3.0);
//! let add = tree.operator(ops::add());
//! tree.add_argument(add, x).unwrap();
//! tree.add_argument(add, y).unwrap();
//!
//! let mut engine = Evaluator::new();
//! assert_eq!(engine.evaluate(&mut tree, add).unwrap(), Value::Scalar(5.0));
//!
//! // Consume the value, then advance the horizon. The next traversal
//! // recomputes only what changed afterwards.
//! engine.advance(&tree);
//! tree.set_value(x, 10.0).unwrap();
//! assert_eq!(engine.evaluate(&mut tree, add).unwrap(), Value::Scalar(13.0));
//! ```

pub mod error;
pub mod eval;
pub mod ops;
pub mod tree;
pub mod version;

pub use error::EvalError;
pub use eval::Evaluator;
pub use tree::{NodeId, Tree, Value};
