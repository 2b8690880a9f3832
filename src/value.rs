//! Canonical tagged value model.
//!
//! Value variants (`Number`, `Text`) compare and hash by value; reference
//! variants (`Record`, `Proc`, `Native`) by identity. `Text` carries an
//! interned [`Sym`] whose hash was precomputed at intern time, so string
//! keys never re-hash their bytes.
//!
//! The numeric key-hash policy is explicit rather than a silent
//! truncation of the float: see [`number_key_hash`].

use crate::heap::{NativeId, ProcId, RecordId};
use crate::intern::Sym;
use crate::tagged::TaggedValue;
use slotmap::{Key, KeyData};

// Kind tags mixed into identity hashes so equal handle bits of different
// variants land in different buckets.
const KIND_RECORD: u64 = 3;
const KIND_PROC: u64 = 4;
const KIND_NATIVE: u64 = 5;

/// A tagged runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Number(f64),
    Text(Sym),
    Record(RecordId),
    Proc(ProcId),
    Native(NativeId),
}

/// Key hash for a number, or `None` when it is not key-eligible.
///
/// Policy (each branch deterministic; equal numbers hash identically):
/// - NaN has no key hash: it is unequal to every value including itself,
///   so a NaN key could never be retrieved.
/// - `-0.0` folds into `0.0`; they compare equal and must hash equal.
/// - A finite value with zero fraction inside `[i64::MIN, i64::MAX)`
///   hashes by its integer value, keeping small integer keys spread
///   across consecutive buckets.
/// - Everything else (huge, fractional, infinite) hashes by its IEEE-754
///   bit pattern.
pub fn number_key_hash(n: f64) -> Option<u64> {
    if n.is_nan() {
        return None;
    }
    let n = if n == 0.0 { 0.0 } else { n };
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64 as u64)
    } else {
        Some(n.to_bits())
    }
}

fn identity_hash(data: KeyData, kind: u64) -> u64 {
    data.as_ffi() ^ (kind << 32)
}

impl TaggedValue for Value {
    fn nil() -> Self {
        Value::Nil
    }

    fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    fn key_hash(&self) -> Option<u64> {
        match self {
            Value::Nil => None,
            Value::Number(n) => number_key_hash(*n),
            Value::Text(sym) => Some(sym.hash()),
            Value::Record(id) => Some(identity_hash(id.data(), KIND_RECORD)),
            Value::Proc(id) => Some(identity_hash(id.data(), KIND_PROC)),
            Value::Native(id) => Some(identity_hash(id.data(), KIND_NATIVE)),
        }
    }

    fn key_eq(&self, other: &Self) -> bool {
        // Derived equality already has the right per-variant semantics:
        // f64 `==` folds -0.0 into 0.0 and rejects NaN; Sym and the id
        // types compare by identity; variants never cross-compare equal.
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;

    #[test]
    fn nil_is_not_key_eligible() {
        assert_eq!(Value::Nil.key_hash(), None);
        assert!(Value::Nil.is_nil());
        assert!(!Value::Number(0.0).is_nil());
    }

    #[test]
    fn nan_has_no_key_hash() {
        assert_eq!(number_key_hash(f64::NAN), None);
        assert_eq!(Value::Number(f64::NAN).key_hash(), None);
    }

    #[test]
    fn negative_zero_folds_into_zero() {
        assert_eq!(number_key_hash(-0.0), number_key_hash(0.0));
        assert!(Value::Number(-0.0).key_eq(&Value::Number(0.0)));
    }

    #[test]
    fn integral_numbers_hash_by_integer_value() {
        assert_eq!(number_key_hash(7.0), Some(7));
        assert_eq!(number_key_hash(-1.0), Some(-1i64 as u64));
        assert_eq!(number_key_hash(i64::MIN as f64), Some(i64::MIN as u64));
    }

    #[test]
    fn non_integral_numbers_hash_by_bit_pattern() {
        assert_eq!(number_key_hash(0.5), Some(0.5f64.to_bits()));
        assert_eq!(
            number_key_hash(f64::INFINITY),
            Some(f64::INFINITY.to_bits())
        );
        assert_eq!(
            number_key_hash(f64::NEG_INFINITY),
            Some(f64::NEG_INFINITY.to_bits())
        );
        // 2^70 is integral but outside the i64 range: bit pattern.
        let huge = (2.0f64).powi(70);
        assert_eq!(number_key_hash(huge), Some(huge.to_bits()));
        // 2^63 sits exactly on the excluded upper bound.
        let edge = i64::MAX as f64;
        assert_eq!(number_key_hash(edge), Some(edge.to_bits()));
    }

    #[test]
    fn equal_numbers_hash_identically() {
        for n in [0.0, -0.0, 1.0, -17.0, 0.25, 1e300, (2.0f64).powi(70)] {
            assert_eq!(number_key_hash(n), number_key_hash(n));
        }
    }

    #[test]
    fn identity_variants_hash_by_handle_not_kind_alone() {
        let mut heap = Heap::new();
        let r = heap.new_record(0).unwrap();
        let p = heap.new_proc();
        // Same underlying slot index, different kinds: hashes differ.
        assert_ne!(
            Value::Record(r).key_hash(),
            Value::Proc(p).key_hash(),
            "kind tag must separate identity streams"
        );
        assert!(!Value::Record(r).key_eq(&Value::Proc(p)));
    }
}
