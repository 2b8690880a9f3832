//! Chained scatter table with Brent's variation.
//!
//! A single slot array holds every entry; collisions are resolved by
//! chaining *within* the array through per-slot indices, so the load
//! factor reaches 100% with no overflow storage. The structure maintains
//! one global invariant: if an entry is not in its main position (the
//! slot its hash maps to), then the entry occupying that main position is
//! in its *own* main position. Collisions therefore only occur between
//! keys sharing a main position, and a chain's length is bounded by the
//! number of such keys, not by overall load.
//!
//! Deletion is `set(key, nil)`: the slot keeps its key so chains passing
//! through it stay intact, and the nil value marks it dead. Dead slots
//! are reclaimed by in-place overwrite or dropped by the next rehash.

use crate::guard::EntryFlag;
use crate::ledger::{NoopLedger, SizeLedger};
use crate::tagged::TaggedValue;
use core::fmt;
use std::collections::TryReserveError;
use std::rc::Rc;

/// Errors surfaced by table operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The key is nil or its variant has no defined hash.
    InvalidKey,
    /// The slot array could not be allocated. When raised by a rehash,
    /// the table is unchanged and still usable.
    Alloc(TryReserveError),
    /// The sizing ladder is exhausted; the table cannot grow further.
    Overflow,
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::InvalidKey => write!(f, "value is not usable as a table key"),
            TableError::Alloc(e) => write!(f, "table allocation failed: {e}"),
            TableError::Overflow => write!(f, "table overflow"),
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Alloc(e) => Some(e),
            _ => None,
        }
    }
}

/// Sizing ladder: roughly doubling primes, so `hash % capacity` stays
/// well distributed. Capped below 2^31 so chain links fit in `u32`.
const DIMENSIONS: [usize; 29] = [
    5,
    11,
    23,
    47,
    97,
    193,
    389,
    769,
    1543,
    3079,
    6151,
    12289,
    24593,
    49157,
    98317,
    196613,
    393241,
    786433,
    1572869,
    3145739,
    6291469,
    12582917,
    25165843,
    50331653,
    100663319,
    201326611,
    402653189,
    805306457,
    1610612741,
];

/// Smallest ladder rung that can hold `n` slots.
pub(crate) fn redimension(n: usize) -> Result<usize, TableError> {
    for &d in &DIMENSIONS {
        if d >= n {
            return Ok(d);
        }
    }
    Err(TableError::Overflow)
}

/// One slot: a key, a value, and an intra-array chain link.
///
/// A slot with a nil key is *vacant* (claimable by the free-cursor scan).
/// A slot with a non-nil key but nil value is *dead*: logically absent,
/// but its key stays in place to anchor chains running through it.
#[derive(Debug)]
struct Node<T> {
    key: T,
    value: T,
    next: Option<u32>,
}

impl<T: TaggedValue> Node<T> {
    fn vacant() -> Self {
        Self {
            key: T::nil(),
            value: T::nil(),
            next: None,
        }
    }
}

fn alloc_nodes<T: TaggedValue>(n: usize) -> Result<Box<[Node<T>]>, TableError> {
    let mut v: Vec<Node<T>> = Vec::new();
    v.try_reserve_exact(n).map_err(TableError::Alloc)?;
    v.resize_with(n, Node::vacant);
    Ok(v.into_boxed_slice())
}

/// Associative array over a tagged-value model `T`.
///
/// Single-threaded: the `Rc` ledger field makes the type `!Send`/`!Sync`
/// by construction. All operations are synchronous and bounded by table
/// size; a rehash triggered inside [`set`] runs to completion before the
/// call returns.
///
/// [`set`]: ScatterTable::set
pub struct ScatterTable<T: TaggedValue> {
    nodes: Box<[Node<T>]>,
    /// Highest-indexed candidate vacant slot. Decremented monotonically
    /// as slots fill; reset only by a rehash. At every public-call
    /// boundary the slot it points at has a nil key, with one exception:
    /// a failed rehash leaves it parked on an occupied slot, and the next
    /// new-key insertion retries the rehash before claiming it.
    free_cursor: usize,
    /// Count of slots with a non-nil value. Input to rehash sizing.
    live: usize,
    ledger: Rc<dyn SizeLedger>,
    entry_flag: EntryFlag,
}

impl<T: TaggedValue> ScatterTable<T> {
    /// Create a table able to hold `size_hint` entries without rehashing.
    pub fn new(size_hint: usize) -> Result<Self, TableError> {
        Self::with_ledger(size_hint, Rc::new(NoopLedger))
    }

    /// Like [`new`], reporting slot-count deltas to `ledger` on create,
    /// rehash, and drop.
    ///
    /// [`new`]: ScatterTable::new
    pub fn with_ledger(size_hint: usize, ledger: Rc<dyn SizeLedger>) -> Result<Self, TableError> {
        let want = size_hint.checked_add(1).ok_or(TableError::Overflow)?;
        let capacity = redimension(want)?;
        let nodes = alloc_nodes(capacity)?;
        ledger.report_delta(capacity as isize);
        Ok(Self {
            nodes,
            free_cursor: capacity - 1,
            live: 0,
            ledger,
            entry_flag: EntryFlag::new(),
        })
    }

    /// Number of live entries (non-nil values).
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Allocated slot count. Changes only across a rehash.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// The slot index `key` would occupy in an otherwise empty table.
    fn main_position(&self, key: &T) -> Result<usize, TableError> {
        let h = key.key_hash().ok_or(TableError::InvalidKey)?;
        Ok((h % self.nodes.len() as u64) as usize)
    }

    /// Main position of a key already stored in the table. Stored keys
    /// were validated on insert, so their hash is always defined.
    fn stored_position(&self, key: &T) -> usize {
        let h = key.key_hash().expect("stored keys were validated on insert");
        (h % self.nodes.len() as u64) as usize
    }

    /// Walk the chain rooted at `key`'s main position; return the index
    /// of the slot holding `key`, dead or live.
    fn find_slot(&self, key: &T) -> Result<Option<usize>, TableError> {
        let mut slot = self.main_position(key)?;
        loop {
            let node = &self.nodes[slot];
            if key.key_eq(&node.key) {
                return Ok(Some(slot));
            }
            match node.next {
                Some(n) => slot = n as usize,
                None => return Ok(None),
            }
        }
    }

    /// Look up `key`. Absent (or deleted) keys yield `T::nil()`. Never
    /// mutates, never rehashes.
    pub fn get(&self, key: &T) -> Result<T, TableError> {
        let _g = self.entry_flag.enter();
        match self.find_slot(key)? {
            Some(slot) => Ok(self.nodes[slot].value.clone()),
            None => Ok(T::nil()),
        }
    }

    /// Slot offset currently holding `key`, or `None` when absent.
    ///
    /// Narrow contract: the offset is only valid until the next rehash
    /// (any `set` may trigger one). Callers must not cache offsets across
    /// mutating calls. Dead entries still report their slot, since their
    /// keys anchor traversal until the next rehash.
    pub fn position_of(&self, key: &T) -> Result<Option<usize>, TableError> {
        let _g = self.entry_flag.enter();
        self.find_slot(key)
    }

    /// Upsert. A nil `value` is a logical delete: the key's slot keeps
    /// its key but reports nil until it is overwritten or a rehash drops
    /// it. Inserting a new key may trigger a rehash as a side effect.
    ///
    /// A rehash that fails to allocate leaves every entry intact and the
    /// table saturated: overwrites and deletes still succeed, and the
    /// next new-key insertion retries the growth before touching any
    /// slot.
    pub fn set(&mut self, key: T, value: T) -> Result<(), TableError> {
        {
            let _g = self.entry_flag.enter();
            let mut slot = self.main_position(&key)?;
            // Already present somewhere in the chain? Overwrite in place.
            loop {
                let node = &self.nodes[slot];
                if key.key_eq(&node.key) {
                    let node = &mut self.nodes[slot];
                    let was = !node.value.is_nil() as usize;
                    let now = !value.is_nil() as usize;
                    node.value = value;
                    self.live = self.live - was + now;
                    return Ok(());
                }
                match node.next {
                    Some(n) => slot = n as usize,
                    None => break,
                }
            }
        }

        // A new key needs a free slot. A rehash that failed earlier left
        // the cursor parked on an occupied slot; retry the growth before
        // claiming it. The main position is computed afterwards, against
        // whatever array the insertion will actually land in.
        if !self.nodes[self.free_cursor].key.is_nil() {
            self.rehash()?;
        }

        let saturated = self.insert_new(key, value)?;
        if saturated {
            self.rehash()?;
        }
        Ok(())
    }

    /// Place a key known to be absent. Returns true when the insertion
    /// consumed the last vacant slot, leaving the table saturated.
    fn insert_new(&mut self, key: T, value: T) -> Result<bool, TableError> {
        let _g = self.entry_flag.enter();
        let mp = self.main_position(&key)?;

        // Claim the main position, displacing per Brent's variation when
        // it is already taken.
        let target = if self.nodes[mp].key.is_nil() {
            mp
        } else {
            let free = self.free_cursor;
            let occupant_mp = self.stored_position(&self.nodes[mp].key);
            if occupant_mp != mp {
                // The occupant was itself displaced from `occupant_mp`.
                // Move it to the free slot (key, value, and chain link go
                // with it), relink its chain, and let the new key claim
                // its own main position as a fresh chain root.
                let mut prev = occupant_mp;
                while self.nodes[prev].next != Some(mp as u32) {
                    prev = self.nodes[prev]
                        .next
                        .expect("displaced slot is reachable from its chain root")
                        as usize;
                }
                self.nodes[prev].next = Some(free as u32);
                self.nodes[free] = core::mem::replace(&mut self.nodes[mp], Node::vacant());
                mp
            } else {
                // The occupant owns this main position; the new entry
                // goes to the free slot, spliced in right after the root.
                self.nodes[free].next = self.nodes[mp].next;
                self.nodes[mp].next = Some(free as u32);
                free
            }
        };

        self.live += !value.is_nil() as usize;
        self.nodes[target].key = key;
        self.nodes[target].value = value;

        // Settle the free cursor on a vacant slot; none left means the
        // table is saturated and must rehash before the next insertion.
        loop {
            if self.nodes[self.free_cursor].key.is_nil() {
                return Ok(false);
            }
            if self.free_cursor == 0 {
                return Ok(true);
            }
            self.free_cursor -= 1;
        }
    }

    /// Resumable traversal protocol: `None` starts at the first live
    /// entry; `Some(key)` resumes after that key's slot. Dead keys remain
    /// valid anchors until the next rehash, so deleting the current entry
    /// mid-walk does not break the walk. An anchor not present in the
    /// table at all is an error.
    ///
    /// Same narrow contract as [`position_of`]: a rehash invalidates
    /// anchors by reshuffling slots, after which a fresh walk must start.
    ///
    /// [`position_of`]: ScatterTable::position_of
    pub fn next_entry(&self, prev: Option<&T>) -> Result<Option<(&T, &T)>, TableError> {
        let _g = self.entry_flag.enter();
        let start = match prev {
            None => 0,
            Some(anchor) => match self.find_slot(anchor)? {
                Some(slot) => slot + 1,
                None => return Err(TableError::InvalidKey),
            },
        };
        for node in &self.nodes[start.min(self.nodes.len())..] {
            if !node.value.is_nil() {
                return Ok(Some((&node.key, &node.value)));
            }
        }
        Ok(None)
    }

    /// Iterator over `(key, value)` for live entries. Each live entry is
    /// yielded exactly once; order is unspecified.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: self.nodes.iter(),
        }
    }

    /// Grow (or shrink) to the ladder rung holding twice the live count,
    /// then reinsert every live entry in two phases: first every entry
    /// whose new main position is vacant, then the leftovers, chained
    /// after their (now resident) roots. Phase 1 guarantees phase 2 never
    /// needs the Brent relocation case, which is what keeps a rehash out
    /// of quadratic chaining.
    fn rehash(&mut self) -> Result<(), TableError> {
        let new_capacity = redimension(self.live * 2)?;
        // Allocate before touching the old array: a failed allocation
        // leaves the table saturated but fully usable.
        let new_nodes = alloc_nodes(new_capacity)?;
        let old_capacity = self.nodes.len();
        let mut old = core::mem::replace(&mut self.nodes, new_nodes);
        self.free_cursor = new_capacity - 1;

        // Phase 1: seat entries whose new main position is vacant. An old
        // node's `next` field doubles as the phase-2 work list: `None`
        // marks it handled (or dead), `Some(mp)` stashes the pending new
        // main position.
        for node in old.iter_mut() {
            if node.value.is_nil() {
                node.next = None; // dead entry: dropped by the rehash
                continue;
            }
            let mp = self.stored_position(&node.key);
            if self.nodes[mp].key.is_nil() {
                let seated = core::mem::replace(node, Node::vacant());
                self.nodes[mp] = Node {
                    key: seated.key,
                    value: seated.value,
                    next: None,
                };
            } else {
                node.next = Some(mp as u32);
            }
        }

        self.settle_free_cursor();

        // Phase 2: chain the leftovers. Each root is in its own main
        // position (phase 1 put it there), so a plain splice-after-root
        // suffices.
        for node in old.iter_mut() {
            if let Some(mp) = node.next {
                let mp = mp as usize;
                let free = self.free_cursor;
                let pending = core::mem::replace(node, Node::vacant());
                self.nodes[free] = Node {
                    key: pending.key,
                    value: pending.value,
                    next: self.nodes[mp].next,
                };
                self.nodes[mp].next = Some(free as u32);
                // The cursor slot just filled; at least one vacant slot
                // remains below it because live < capacity.
                self.free_cursor -= 1;
                self.settle_free_cursor();
            }
        }

        self.ledger
            .report_delta(new_capacity as isize - old_capacity as isize);
        Ok(())
    }

    fn settle_free_cursor(&mut self) {
        while !self.nodes[self.free_cursor].key.is_nil() {
            self.free_cursor -= 1;
        }
    }

    /// Test-only full-array audit of the table's invariants:
    /// - a vacant (nil-key) slot holds a nil value, no chain link, and
    ///   lies at or below the free cursor, which itself rests on a
    ///   vacant slot;
    /// - every slot strictly below the free cursor is vacant or in its
    ///   own main position;
    /// - a displaced slot's main position is occupied by a key resident
    ///   in its own main position, and the displaced slot is reachable
    ///   from that root's chain;
    /// - chain links point at occupied slots and form no cycles;
    /// - the live count matches a full recount.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let n = self.nodes.len();
        assert!(self.free_cursor < n);
        assert!(
            self.nodes[self.free_cursor].key.is_nil(),
            "free cursor must rest on a vacant slot"
        );
        let mut live = 0;
        for i in 0..n {
            let node = &self.nodes[i];
            if node.key.is_nil() {
                assert!(node.value.is_nil(), "vacant slot {i} holds a value");
                assert!(node.next.is_none(), "vacant slot {i} is chained");
                assert!(i <= self.free_cursor, "vacant slot {i} above the free cursor");
                continue;
            }
            if !node.value.is_nil() {
                live += 1;
            }
            if let Some(nx) = node.next {
                assert!(
                    !self.nodes[nx as usize].key.is_nil(),
                    "slot {i} chains to a vacant slot"
                );
            }
            let mp = self.stored_position(&node.key);
            if i < self.free_cursor {
                assert_eq!(mp, i, "slot {i} below the free cursor is displaced");
            }
            if mp != i {
                let root = &self.nodes[mp];
                assert!(!root.key.is_nil(), "displaced slot {i} has a vacant root");
                assert_eq!(
                    self.stored_position(&root.key),
                    mp,
                    "slot {i} collides with a root that is itself displaced"
                );
                let mut cur = mp;
                let mut hops = 0;
                while cur != i {
                    hops += 1;
                    assert!(hops <= n, "chain through slot {mp} cycles");
                    cur = match self.nodes[cur].next {
                        Some(nx) => nx as usize,
                        None => panic!("slot {i} unreachable from its main position {mp}"),
                    };
                }
            }
        }
        assert_eq!(live, self.live, "live count drifted");
    }
}

impl<T: TaggedValue> Drop for ScatterTable<T> {
    fn drop(&mut self) {
        self.ledger.report_delta(-(self.nodes.len() as isize));
    }
}

impl<T: TaggedValue + fmt::Debug> fmt::Debug for ScatterTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScatterTable")
            .field("capacity", &self.nodes.len())
            .field("live", &self.live)
            .field("free_cursor", &self.free_cursor)
            .finish()
    }
}

/// Borrowing iterator over live entries.
pub struct Iter<'a, T> {
    nodes: core::slice::Iter<'a, Node<T>>,
}

impl<'a, T: TaggedValue> Iterator for Iter<'a, T> {
    type Item = (&'a T, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        for node in self.nodes.by_ref() {
            if !node.value.is_nil() {
                return Some((&node.key, &node.value));
            }
        }
        None
    }
}

impl<'a, T: TaggedValue> IntoIterator for &'a ScatterTable<T> {
    type Item = (&'a T, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
