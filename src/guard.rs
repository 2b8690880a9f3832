//! Debug-only exclusive-entry flag.
//!
//! The engine calls user code only through `key_hash`/`key_eq` while
//! probing. If such a callback re-enters the same table, internal state
//! may be transiently inconsistent. In debug builds, entering a guarded
//! section twice without dropping the guard panics. In release builds,
//! this compiles to a zero-cost no-op.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table entry flag. Public entry points open a guarded section with
/// `let _g = self.entry_flag.enter();`.
#[derive(Debug)]
pub(crate) struct EntryFlag {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // Keep !Send + !Sync in line with single-threaded-per-table design.
    _nosend: PhantomData<*mut ()>,
}

impl EntryFlag {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _nosend: PhantomData,
        }
    }

    /// Enter a guarded section. In debug builds, panics if already entered.
    #[inline]
    pub(crate) fn enter(&self) -> EntryGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.get(),
                "table re-entered from a key hash/equality callback"
            );
            self.busy.set(true);
            return EntryGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            return EntryGuard { _z: PhantomData };
        }
    }
}

/// RAII guard returned by `EntryFlag::enter`.
pub(crate) struct EntryGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a EntryFlag,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl<'a> Drop for EntryGuard<'a> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.busy.get());
            self.owner.busy.set(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EntryFlag;

    #[test]
    fn enter_and_exit_is_ok() {
        let f = EntryFlag::new();
        let _g = f.enter();
        drop(_g);
        let _g2 = f.enter();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_in_debug() {
        let f = EntryFlag::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g1 = f.enter();
            let _g2 = f.enter();
        }));
        assert!(res.is_err(), "expected nested entry to panic in debug builds");
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nested_entry_noop_in_release() {
        let f = EntryFlag::new();
        let _g1 = f.enter();
        let _g2 = f.enter();
    }
}
