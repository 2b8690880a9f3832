//! Identity registry for the reference value variants.
//!
//! The engine hashes reference values by a stable numeric identity, never
//! by address, so the design stays valid where the host environment
//! relocates objects. The `Heap` mints those identities as generational
//! slotmap keys: a freed identity is never resurrected, so a stale
//! reference cannot alias a newly minted object.
//!
//! Records own a [`ScatterTable`] apiece; every table created through the
//! heap reports into one shared [`SlotCount`], playing the role of the
//! runtime's size-accounting root. Procedure and native identities are
//! mint-only: the code objects behind them live with the embedder.

use crate::ledger::SlotCount;
use crate::scatter_table::{ScatterTable, TableError};
use crate::value::Value;
use slotmap::{new_key_type, SlotMap};
use std::rc::Rc;

new_key_type! {
    /// Identity of a record (composite object with an owned table).
    pub struct RecordId;
}
new_key_type! {
    /// Identity of a compiled procedure object.
    pub struct ProcId;
}
new_key_type! {
    /// Identity of a native procedure object.
    pub struct NativeId;
}

/// Object registry: mints identities, owns record tables, shares one
/// size ledger across everything it creates.
pub struct Heap {
    ledger: Rc<SlotCount>,
    records: SlotMap<RecordId, ScatterTable<Value>>,
    procs: SlotMap<ProcId, ()>,
    natives: SlotMap<NativeId, ()>,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            ledger: Rc::new(SlotCount::new()),
            records: SlotMap::with_key(),
            procs: SlotMap::with_key(),
            natives: SlotMap::with_key(),
        }
    }

    /// The shared ledger, for embedders creating tables outside the heap
    /// that should account against the same budget.
    pub fn ledger(&self) -> Rc<SlotCount> {
        self.ledger.clone()
    }

    /// Net slot count currently allocated by this heap's tables.
    pub fn slot_cost(&self) -> isize {
        self.ledger.slots()
    }

    /// Create a record with a table sized for `size_hint` entries.
    pub fn new_record(&mut self, size_hint: usize) -> Result<RecordId, TableError> {
        let table = ScatterTable::with_ledger(size_hint, self.ledger.clone())?;
        Ok(self.records.insert(table))
    }

    pub fn record(&self, id: RecordId) -> Option<&ScatterTable<Value>> {
        self.records.get(id)
    }

    pub fn record_mut(&mut self, id: RecordId) -> Option<&mut ScatterTable<Value>> {
        self.records.get_mut(id)
    }

    /// Release a record. Its table's drop reports the slot delta to the
    /// shared ledger. Returns false for an identity already freed.
    pub fn free_record(&mut self, id: RecordId) -> bool {
        self.records.remove(id).is_some()
    }

    pub fn new_proc(&mut self) -> ProcId {
        self.procs.insert(())
    }

    pub fn free_proc(&mut self, id: ProcId) -> bool {
        self.procs.remove(id).is_some()
    }

    pub fn new_native(&mut self) -> NativeId {
        self.natives.insert(())
    }

    pub fn free_native(&mut self, id: NativeId) -> bool {
        self.natives.remove(id).is_some()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn records_share_the_ledger() {
        let mut heap = Heap::new();
        let a = heap.new_record(4).unwrap();
        let b = heap.new_record(4).unwrap();
        assert_eq!(heap.slot_cost(), 10);
        assert!(heap.free_record(a));
        assert_eq!(heap.slot_cost(), 5);
        assert!(heap.free_record(b));
        assert_eq!(heap.slot_cost(), 0);
    }

    #[test]
    fn freed_identity_does_not_resolve() {
        let mut heap = Heap::new();
        let a = heap.new_record(0).unwrap();
        assert!(heap.record(a).is_some());
        assert!(heap.free_record(a));
        assert!(heap.record(a).is_none());
        assert!(!heap.free_record(a), "double free must be a no-op");
        // A fresh record may reuse the physical slot but never the identity.
        let b = heap.new_record(0).unwrap();
        assert_ne!(a, b);
        assert!(heap.record(a).is_none());
    }

    #[test]
    fn record_tables_are_usable_in_place() {
        let mut heap = Heap::new();
        let id = heap.new_record(4).unwrap();
        let t = heap.record_mut(id).unwrap();
        t.set(Value::Number(1.0), Value::Number(10.0)).unwrap();
        assert_eq!(
            heap.record(id).unwrap().get(&Value::Number(1.0)).unwrap(),
            Value::Number(10.0)
        );
    }

    #[test]
    fn proc_and_native_identities_are_distinct_streams() {
        let mut heap = Heap::new();
        let p = heap.new_proc();
        let n = heap.new_native();
        assert!(heap.free_proc(p));
        assert!(!heap.free_proc(p));
        assert!(heap.free_native(n));
    }
}
