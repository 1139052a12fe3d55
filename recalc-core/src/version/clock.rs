//! Version Clock
//!
//! A monotonic counter that allocates version numbers. Clones share the
//! underlying counter, so a clock can be handed to every tracker attached
//! to one tree while remaining a single version space.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonic allocator of version numbers.
///
/// Version 0 is reserved for "never issued": the first call to [`tick`]
/// returns 1.
///
/// [`tick`]: Clock::tick
#[derive(Debug, Clone)]
pub struct Clock {
    counter: Arc<AtomicU64>,
}

impl Clock {
    /// Create a new clock with its own isolated counter.
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Allocate a version number greater than every number this clock has
    /// issued so far.
    pub fn tick(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The most recently issued version number (0 if none).
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
