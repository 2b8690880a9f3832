//! The value-model boundary consumed by the table engine.
//!
//! The engine never inspects a value's representation; it only needs to
//! know whether a value is nil, how a key hashes, and when two keys are
//! equal. Embedding runtimes implement this trait for their tagged-value
//! type; this crate ships a canonical implementation in `value`.

/// Capability trait for the tagged values stored in a [`ScatterTable`].
///
/// Contract:
/// - `nil()` is the canonical absent value; `is_nil(&nil())` is true.
/// - `key_hash` returns `None` for values that may not be used as keys
///   (nil, or variants with no defined hash, e.g. a NaN number). A `Some`
///   hash must be stable for the value's lifetime.
/// - `key_eq` must be consistent with `key_hash`: two keys that compare
///   equal must hash identically.
///
/// [`ScatterTable`]: crate::ScatterTable
pub trait TaggedValue: Clone {
    /// The canonical nil value.
    fn nil() -> Self;

    /// True for the nil value.
    fn is_nil(&self) -> bool;

    /// Hash of this value when used as a table key, or `None` when the
    /// value is not key-eligible.
    fn key_hash(&self) -> Option<u64>;

    /// Key equality. Value variants compare by value, reference variants
    /// by identity.
    fn key_eq(&self, other: &Self) -> bool;
}
