//! scatter-table: the associative-array engine of a dynamically-typed
//! language runtime: a chained scatter table with Brent's variation,
//! running at 100% load factor with no overflow storage.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one slot array per table; collisions chain *within* the array
//!   through per-slot indices, so the table never allocates per entry.
//! - Main-position invariant: if an entry is not in the slot its hash
//!   maps to, the entry occupying that slot is in its own main position.
//!   Collisions therefore only occur between keys sharing a main
//!   position, and chain length is bounded by the number of such keys,
//!   not by overall load.
//! - Layers:
//!   - ScatterTable<T>: the engine. get/set/position_of/next_entry,
//!     Brent's-variation insertion, two-phase rehash on saturation.
//!   - TaggedValue: the value-model boundary (nil, key hash, key
//!     equality); the engine never inspects a value's representation.
//!   - Value + Interner + Heap: the canonical value model. Numbers and
//!     interned text compared by value, records/procedures compared by
//!     generational identity, never by address.
//!   - SizeLedger: size-accounting hook reported on every create,
//!     rehash, and drop.
//!
//! Constraints
//! - Single-threaded per table: `!Send`/`!Sync` by construction (`Rc`
//!   ledger, debug entry flag).
//! - Deletion is `set(key, nil)`: the slot keeps its key to anchor
//!   chains through it; dead slots are reclaimed in place or dropped by
//!   the next rehash. No tombstone sweep exists or is needed.
//! - Rehash sizes from the *live* entry count, so mass deletion followed
//!   by saturation shrinks the array.
//! - A rehash allocates the new array before touching the old one; on
//!   allocation failure the table is left saturated but fully usable.
//!
//! Why this split?
//! - Localize invariants: the engine owns the main-position invariant
//!   and the free cursor; the value model owns hash/equality
//!   consistency; neither can break the other's contract.
//! - The engine calls user code only through `key_hash`/`key_eq` during
//!   probing; a debug-only entry flag panics if such a callback
//!   re-enters the table while its state is transiently inconsistent.
//!
//! Positional offsets and traversal
//! - `position_of` and the `next_entry` anchor protocol expose slot
//!   offsets that are only valid until the next rehash. They are
//!   iteration hooks, not persistent identifiers; callers must not cache
//!   them across mutating calls.
//!
//! Notes and non-goals
//! - No persistence, no internal locking, no iteration-order guarantee
//!   beyond "every live entry exactly once between rehashes."
//! - No hash-quality guarantee beyond "equal keys hash identically";
//!   the numeric key-hash policy is explicit and tested (`value`).
//! - Invariant checking lives in a test-only audit routine driven by the
//!   property suites, never in a production code path.

mod guard;
pub mod heap;
pub mod intern;
pub mod ledger;
pub mod scatter_table;
mod scatter_table_proptest;
pub mod tagged;
pub mod value;

// Public surface
pub use heap::{Heap, NativeId, ProcId, RecordId};
pub use intern::{Interner, Sym};
pub use ledger::{NoopLedger, SizeLedger, SlotCount};
pub use scatter_table::{Iter, ScatterTable, TableError};
pub use tagged::TaggedValue;
pub use value::Value;
