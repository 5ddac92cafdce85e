use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::{PkiError, Result};

/// Default starting value for a new hierarchy, somewhere between 2^10 and 2^30
pub const DEFAULT_SERIAL_START: u64 = 492113;

/// Monotonic serial counter shared by every certificate of one hierarchy.
///
/// Cloning the allocator clones the handle, not the counter: the root CA
/// creates it and every intermediate and server certificate below the root
/// draws from the same one. Separate hierarchies get separate counters.
#[derive(Clone, Debug)]
pub struct SerialAllocator {
    counter: Arc<AtomicU64>,
}

impl SerialAllocator {
    /// New counter; the first serial handed out is `start + 1`
    pub fn new(start: u64) -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Allocates the next serial number.
    ///
    /// Fails with [`PkiError::SerialExhausted`] once the counter sits at
    /// `u64::MAX`; the counter never wraps.
    pub fn next_serial(&self) -> Result<u64> {
        let serial = self
            .counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(1))
            .map_err(PkiError::SerialExhausted)?
            + 1;
        debug!(serial, "allocated serial number");
        Ok(serial)
    }

    /// Last serial handed out (or the start value if none was)
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// True when both handles point at the same counter
    pub fn same_hierarchy(&self, other: &SerialAllocator) -> bool {
        Arc::ptr_eq(&self.counter, &other.counter)
    }
}

impl Default for SerialAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_SERIAL_START)
    }
}
