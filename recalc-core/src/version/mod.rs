//! Versioning Primitives
//!
//! This module implements the staleness-detection machinery that drives
//! incremental re-evaluation: a monotonic version clock and a per-node
//! version tracker.
//!
//! # Concepts
//!
//! ## Clock
//!
//! A Clock hands out version numbers that are strictly greater than every
//! number it has issued before. There is deliberately no module-level
//! counter: each tree owns its own clock, so tests (and independent trees)
//! get isolated version spaces.
//!
//! ## Tracker
//!
//! Every node in an equation tree owns a Tracker. A tracker records the
//! version at which its node last changed, plus the ids of the nodes it
//! depends on (its "subjects"). A tracker's *effective* version is the
//! maximum of its own version and the effective versions of all subjects,
//! transitively — so a parent is never considered older than any of its
//! descendants.
//!
//! The sole staleness test used throughout the engine is:
//!
//! ```text
//! effective_version(node) > horizon_version(engine)
//! ```
//!
//! Effective versions are computed on demand with no caching at this layer;
//! callers memoize through the operator proxy scheme instead.

mod clock;
mod tracker;

pub use clock::Clock;
pub use tracker::Tracker;
