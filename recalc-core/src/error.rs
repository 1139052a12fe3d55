//! Error Types
//!
//! The engine is a thin orchestration layer over user-supplied operation
//! functions, so it has few failure modes of its own. Operation failures
//! (arity, shape) surface to the caller of the traversal unmodified; the
//! engine never catches or wraps them. Correctness of the tree topology is
//! a precondition owned by the caller.

use thiserror::Error;

use crate::tree::NodeId;

/// Errors surfaced during tree construction or evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// An operation function received the wrong number of arguments.
    ///
    /// Raised at invocation time by [`crate::ops::Op::apply`] when the
    /// operator declares a non-negative input count. Variadic operators
    /// (negative `nin`) accept any argument count.
    #[error("operator `{name}` expected {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Two array values of different lengths were combined elementwise.
    #[error("array length mismatch: {left} vs {right}")]
    ShapeMismatch { left: usize, right: usize },

    /// An operation required an array argument but received a scalar.
    #[error("`{op}` expects an array argument")]
    ExpectedArray { op: &'static str },

    /// The convolution kernel sums to zero, so the result cannot be rescaled.
    #[error("convolution kernel sums to zero")]
    ZeroKernel,

    /// A node id does not refer to a node in this tree.
    #[error("no node with id {0:?} in this tree")]
    UnknownNode(NodeId),

    /// A node id referred to a node of the wrong variant.
    #[error("node {id:?} is not a {expected}")]
    WrongKind {
        id: NodeId,
        expected: &'static str,
    },

    /// A partition part index was out of range.
    #[error("part index {index} out of range for partition of {len} part(s)")]
    PartIndex { index: usize, len: usize },
}
