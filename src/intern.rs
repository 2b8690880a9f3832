//! String interner backing the `Text` value variant.
//!
//! Every distinct string is stored once; a [`Sym`] is a small copyable
//! token carrying the string's storage index and its precomputed hash.
//! Table keys therefore hash in O(1) and compare by token identity, never
//! by re-scanning string bytes.

use core::hash::BuildHasher;
use hashbrown::HashTable;
use std::collections::hash_map::RandomState;

/// Interned string token. Two `Sym`s from the same [`Interner`] are equal
/// iff they denote the same string.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Sym {
    index: u32,
    hash: u64,
}

impl Sym {
    /// The hash precomputed at intern time.
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// Deduplicating string storage: a `HashTable` index over a `Vec` of
/// owned strings.
pub struct Interner<S = RandomState> {
    hasher: S,
    index: HashTable<u32>,
    strings: Vec<Box<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Interner<S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::new(),
            strings: Vec::new(),
        }
    }

    /// Intern `s`, returning its token. Interning the same string twice
    /// yields equal tokens.
    pub fn intern(&mut self, s: &str) -> Sym {
        let hash = self.hasher.hash_one(s);
        match self.index.entry(
            hash,
            |&i| &*self.strings[i as usize] == s,
            |&i| self.hasher.hash_one(&*self.strings[i as usize]),
        ) {
            hashbrown::hash_table::Entry::Occupied(e) => Sym {
                index: *e.get(),
                hash,
            },
            hashbrown::hash_table::Entry::Vacant(v) => {
                let index = u32::try_from(self.strings.len())
                    .expect("interner capacity exceeded u32::MAX strings");
                self.strings.push(s.into());
                let _ = v.insert(index);
                Sym { index, hash }
            }
        }
    }

    /// The string a token denotes.
    pub fn resolve(&self, sym: Sym) -> &str {
        &self.strings[sym.index as usize]
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_deduplicates() {
        let mut i = Interner::new();
        let a1 = i.intern("alpha");
        let b = i.intern("beta");
        let a2 = i.intern("alpha");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(i.len(), 2);
    }

    #[test]
    fn resolve_round_trips() {
        let mut i = Interner::new();
        let s = i.intern("hello");
        assert_eq!(i.resolve(s), "hello");
        let e = i.intern("");
        assert_eq!(i.resolve(e), "");
    }

    #[test]
    fn equal_tokens_hash_identically() {
        let mut i = Interner::new();
        let a1 = i.intern("k");
        let a2 = i.intern("k");
        assert_eq!(a1.hash(), a2.hash());
    }
}
