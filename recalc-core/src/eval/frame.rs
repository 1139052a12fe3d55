//! Operator Evaluation Frame
//!
//! A Frame is the transient per-operator context used while visiting one
//! operator's arguments. The engine walks the whole tree; the frame stays
//! at one level, collecting argument outcomes in positional order and then
//! applying the operation under the partition rules:
//!
//! - **no partition arguments**: apply the operation once to the plain
//!   values.
//! - **exactly one partition argument**: apply the operation per selected
//!   part, substituting each part into the partition's slot; unselected
//!   parts pass through unchanged and the result stays partition-shaped.
//! - **two or more partition arguments**: there is no single consistent
//!   index space across partitions, so each is reduced to a scalar via its
//!   own combine first, then the plain case applies.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::trace;

use crate::error::EvalError;
use crate::ops::Op;
use crate::tree::{PartsValue, ProxyValue, Value};

/// The result of visiting one node: either a plain value or a
/// partition-shaped value still awaiting combination.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Plain(Value),
    Parts(PartsValue),
}

impl Outcome {
    pub(crate) fn to_proxy(&self) -> ProxyValue {
        match self {
            Outcome::Plain(v) => ProxyValue::Plain(v.clone()),
            Outcome::Parts(pv) => ProxyValue::Parts(pv.clone()),
        }
    }

    pub(crate) fn from_proxy(proxy: &ProxyValue) -> Self {
        match proxy {
            ProxyValue::Plain(v) => Outcome::Plain(v.clone()),
            ProxyValue::Parts(pv) => Outcome::Parts(pv.clone()),
        }
    }
}

/// Transient context for evaluating one operator's argument list.
pub(crate) struct Frame {
    /// Positional argument values; partition slots hold a placeholder
    /// until substitution.
    argvals: Vec<Value>,

    /// Slot index and value of each partition-shaped argument.
    parts: Vec<(usize, PartsValue)>,
}

impl Frame {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            argvals: Vec::with_capacity(n),
            parts: Vec::new(),
        }
    }

    /// Record the next argument, in positional order.
    pub(crate) fn push(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Plain(v) => self.argvals.push(v),
            Outcome::Parts(pv) => {
                let slot = self.argvals.len();
                self.argvals.push(Value::Scalar(0.0));
                self.parts.push((slot, pv));
            }
        }
    }

    /// Apply the operation under the partition rules.
    pub(crate) fn evaluate(mut self, op: &Op, tags: &IndexSet<String>) -> Result<Outcome, EvalError> {
        match self.parts.len() {
            0 => Ok(Outcome::Plain(op.apply(&self.argvals)?)),
            1 => {
                let (slot, pv) = self.parts.remove(0);
                self.evaluate_partition(op, tags, slot, pv)
            }
            _ => {
                // No consistent index space across several partitions:
                // force each to a scalar through its own combine.
                let parts = std::mem::take(&mut self.parts);
                for (slot, pv) in parts {
                    self.argvals[slot] = pv.combine_all();
                }
                Ok(Outcome::Plain(op.apply(&self.argvals)?))
            }
        }
    }

    /// Apply the operation per part of a single partition argument.
    fn evaluate_partition(
        mut self,
        op: &Op,
        tags: &IndexSet<String>,
        slot: usize,
        pv: PartsValue,
    ) -> Result<Outcome, EvalError> {
        let mut parts = pv.parts.clone();

        // The selected index set: all parts for an untagged operator,
        // otherwise the union of the tag map entries for each tag. A tag
        // absent from the map selects nothing; no match at all makes the
        // operator a silent no-op.
        let selected: BTreeSet<usize> = if tags.is_empty() {
            (0..parts.len()).collect()
        } else {
            tags.iter()
                .filter_map(|tag| pv.tagmap.get(tag))
                .flatten()
                .copied()
                .collect()
        };
        trace!(op = op.name(), ?selected, "applying operator to partition parts");

        for index in selected {
            self.argvals[slot] = parts[index].clone();
            parts[index] = op.apply(&self.argvals)?;
        }

        Ok(Outcome::Parts(PartsValue {
            parts,
            tagmap: Arc::clone(&pv.tagmap),
            combine: Arc::clone(&pv.combine),
        }))
    }
}
