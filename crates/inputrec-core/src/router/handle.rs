//! Handle allocation for router registrations.
//!
//! Every registration receives a fresh [`ConsumerHandle`]. Handles are never
//! reused within a router, so a stale handle held by a caller can never alias
//! a newer registration; unregistering it fails loudly instead.

use std::fmt;

/// Opaque registration handle returned by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsumerHandle(u64);

impl ConsumerHandle {
    /// Raw numeric value, for logs.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConsumerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer#{}", self.0)
    }
}

/// A monotonically increasing handle source.
///
/// Starts at 1 so that a zeroed handle never names a live registration.
/// Owned by a single router, which only allocates through `&mut self`.
#[derive(Debug)]
pub struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next unused handle.
    pub fn allocate(&mut self) -> ConsumerHandle {
        let handle = ConsumerHandle(self.next);
        self.next += 1;
        handle
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}
