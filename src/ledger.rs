//! Size-accounting boundary for the embedding runtime's collector.
//!
//! A table reports the slot count of every array it allocates or frees so
//! the runtime can track approximate memory pressure. The engine only
//! pushes deltas; it never reads the ledger back.

use core::cell::Cell;

/// Bookkeeping hook invoked after every table create, rehash, and drop.
pub trait SizeLedger {
    /// Report a change in allocated slot count. Positive on growth,
    /// negative on shrink or release.
    fn report_delta(&self, slots: isize);
}

/// Ledger that discards all reports. Used by tables whose embedder does
/// no size accounting.
#[derive(Debug, Default)]
pub struct NoopLedger;

impl SizeLedger for NoopLedger {
    fn report_delta(&self, _slots: isize) {}
}

/// Shared slot counter. Clone the `Rc` holding it into every table that
/// should account against the same budget (see [`Heap`]).
///
/// [`Heap`]: crate::Heap
#[derive(Debug, Default)]
pub struct SlotCount {
    slots: Cell<isize>,
}

impl SlotCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Net allocated slots across everything reporting to this ledger.
    pub fn slots(&self) -> isize {
        self.slots.get()
    }
}

impl SizeLedger for SlotCount {
    fn report_delta(&self, slots: isize) {
        self.slots.set(self.slots.get() + slots);
    }
}
