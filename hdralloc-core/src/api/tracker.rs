//! Allocation Tracker.
//!
//! A Tracker records the aggregate usage of the allocators attached to it:
//!
//! -   The number of bytes currently live, headers included.
//! -   The maximum number of bytes ever live simultaneously.
//! -   The number of blocks currently live.
//!
//! All counters are updated with atomic operations, so that a single Tracker may be shared by any number of threads,
//! and any number of allocators.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Tracker
///
/// The counters describing the aggregate usage of one or several allocators.
///
/// #   Guarantees
///
/// -   The peak never decreases.
/// -   The peak observed is never less than the total observed before it.
#[derive(Debug, Default)]
pub struct Tracker {
    total: AtomicUsize,
    peak: AtomicUsize,
    count: AtomicUsize,
}

impl Tracker {
    /// Creates an instance, with all counters at 0.
    pub const fn new() -> Self {
        Self { total: AtomicUsize::new(0), peak: AtomicUsize::new(0), count: AtomicUsize::new(0) }
    }

    /// Returns the number of bytes currently live, headers included.
    pub fn total_allocated(&self) -> usize { self.total.load(Ordering::Acquire) }

    /// Returns the maximum number of bytes ever live simultaneously, headers included.
    ///
    /// The current total is folded in first, so that the result is never less than any total previously observed.
    pub fn peak_allocated(&self) -> usize { self.raise_peak(self.total_allocated()) }

    /// Returns the number of blocks currently live.
    pub fn allocation_count(&self) -> usize { self.count.load(Ordering::Acquire) }

    /// Returns a snapshot of all counters.
    ///
    /// Within the snapshot, `peak_allocated >= total_allocated`.
    pub fn statistics(&self) -> Statistics {
        let total_allocated = self.total_allocated();
        let peak_allocated = self.raise_peak(total_allocated);
        let allocation_count = self.allocation_count();

        Statistics { total_allocated, peak_allocated, allocation_count }
    }

    /// Records the allocation of a block of `bytes` bytes.
    pub(crate) fn record_allocation(&self, bytes: usize) {
        let total = self.total.fetch_add(bytes, Ordering::AcqRel) + bytes;
        self.raise_peak(total);

        self.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Records the deallocation of a block of `bytes` bytes.
    pub(crate) fn record_deallocation(&self, bytes: usize) {
        //  A corrupted size could otherwise wrap the total around.
        let _ = self.total.fetch_update(Ordering::AcqRel, Ordering::Acquire, |total| Some(total.saturating_sub(bytes)));
        let _ = self.count.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| Some(count.saturating_sub(1)));
    }

    //  Raises the peak to `candidate`, if greater, and returns the resulting peak.
    //
    //  A plain load-then-store could overwrite a higher peak stored concurrently by another thread.
    fn raise_peak(&self, candidate: usize) -> usize {
        let mut current = self.peak.load(Ordering::Acquire);

        while candidate > current {
            match self.peak.compare_exchange_weak(current, candidate, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }

        current
    }
}

/// Statistics
///
/// A snapshot of the counters of a Tracker.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Statistics {
    /// The number of bytes live, headers included.
    pub total_allocated: usize,
    /// The maximum number of bytes ever live simultaneously, headers included.
    pub peak_allocated: usize,
    /// The number of blocks live.
    pub allocation_count: usize,
}
