//! A growable set of record keys with `[u64]` storage.

use std::fmt;
use std::ops::{BitAndAssign, BitOrAssign, SubAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeSeq};

use crate::Key;

/// A set of record keys stored as a bitmap.
///
/// Bit `k` of the bitmap is set when key `k` is a member. The bits are stored in
/// little-endian order within `u64` words: key 0 is the least significant bit of the
/// first word, key 64 the least significant bit of the second word, and so on.
///
/// Unlike a fixed-size bit array, a `KeySet` grows on demand: inserting a key beyond
/// the current universe extends the storage with zeroed words. Binary set operations
/// accept operands of different universes; missing words are treated as empty.
///
/// Any bits beyond [`KeySet::universe`] in the final word are guaranteed to be 0.
///
/// # Performance
///
/// - Membership test, insert, remove: O(1) (amortized for inserts that grow)
/// - Union, intersection, difference, count: O(n/64) where n is the universe size
#[derive(Clone, Default)]
pub struct KeySet {
    len: usize,
    bits: Vec<u64>,
}

impl KeySet {
    /// Creates an empty set with an empty universe.
    pub fn new() -> KeySet {
        KeySet::default()
    }

    /// Creates an empty set able to hold keys `0..len` without reallocating.
    pub fn with_universe(len: usize) -> KeySet {
        KeySet {
            len,
            bits: vec![0u64; len.div_ceil(64)],
        }
    }

    /// Creates a set containing every key in `0..len`.
    pub fn full(len: usize) -> KeySet {
        let mut bits = vec![u64::MAX; len.div_ceil(64)];
        Self::mask_tail(&mut bits, len);
        KeySet { len, bits }
    }

    /// Creates a set from the given keys.
    pub fn from_keys(keys: impl IntoIterator<Item = Key>) -> KeySet {
        let mut set = KeySet::new();
        set.extend(keys);
        set
    }

    /// Number of addressable keys (one past the largest key the storage can hold
    /// without growing).
    #[inline]
    pub fn universe(&self) -> usize {
        self.len
    }

    /// Number of keys in the set.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Returns `true` if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&word| word == 0)
    }

    /// Adds `key` to the set, growing the universe when needed.
    ///
    /// Returns `true` if the key was not previously a member.
    #[inline]
    pub fn insert(&mut self, key: Key) -> bool {
        let index = key as usize;
        if index >= self.len {
            self.grow(index + 1);
        }
        let (word_index, bit_position) = Self::bit_position(index);
        let mask = 1u64 << bit_position;
        let cell = &mut self.bits[word_index];
        let prev = *cell & mask;
        *cell |= mask;
        prev == 0
    }

    /// Removes `key` from the set. Returns `true` if it was a member.
    #[inline]
    pub fn remove(&mut self, key: Key) -> bool {
        let index = key as usize;
        if index >= self.len {
            return false;
        }
        let (word_index, bit_position) = Self::bit_position(index);
        let mask = 1u64 << bit_position;
        let cell = &mut self.bits[word_index];
        let prev = *cell & mask;
        *cell &= !mask;
        prev != 0
    }

    /// Checks whether `key` is a member.
    #[inline]
    pub fn contains(&self, key: Key) -> bool {
        let index = key as usize;
        if index >= self.len {
            return false;
        }
        let (word_index, bit_position) = Self::bit_position(index);
        (self.bits[word_index] & (1u64 << bit_position)) != 0
    }

    /// Removes every member, keeping the universe.
    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    /// Adds every member of `other` to this set.
    pub fn union_with(&mut self, other: &KeySet) {
        if other.len > self.len {
            self.grow(other.len);
        }
        for (l, r) in self.bits.iter_mut().zip(other.bits.iter()) {
            *l |= *r;
        }
    }

    /// Keeps only the members that are also in `other`.
    pub fn intersect_with(&mut self, other: &KeySet) {
        for (word_index, l) in self.bits.iter_mut().enumerate() {
            *l &= other.bits.get(word_index).copied().unwrap_or(0);
        }
    }

    /// Removes every member of `other` from this set.
    pub fn subtract(&mut self, other: &KeySet) {
        for (l, r) in self.bits.iter_mut().zip(other.bits.iter()) {
            *l &= !*r;
        }
    }

    /// Returns an iterator over the members in ascending order.
    pub fn iter(&self) -> KeySetIter<'_> {
        KeySetIter {
            words: self.bits.iter(),
            current_word: 0,
            next_word_index: 0,
            base_index: 0,
        }
    }

    /// Collects the members into a sorted vector.
    pub fn to_vec(&self) -> Vec<Key> {
        self.iter().collect()
    }

    fn grow(&mut self, len: usize) {
        debug_assert!(len >= self.len);
        self.len = len;
        self.bits.resize(len.div_ceil(64), 0);
    }

    #[inline]
    fn bit_position(index: usize) -> (usize, usize) {
        (index / 64, index % 64)
    }

    /// Masks out any bits beyond `len` in the final storage word.
    #[inline]
    fn mask_tail(bits: &mut [u64], len: usize) {
        let partial = len % 64;
        if partial == 0 {
            return;
        }
        if let Some(last) = bits.last_mut() {
            *last &= (1u64 << partial) - 1;
        }
    }
}

impl PartialEq for KeySet {
    fn eq(&self, other: &KeySet) -> bool {
        let (short, long) = if self.bits.len() <= other.bits.len() {
            (&self.bits, &other.bits)
        } else {
            (&other.bits, &self.bits)
        };
        short.iter().zip(long.iter()).all(|(l, r)| l == r)
            && long[short.len()..].iter().all(|&word| word == 0)
    }
}

impl Eq for KeySet {}

impl BitOrAssign<&KeySet> for KeySet {
    fn bitor_assign(&mut self, rhs: &KeySet) {
        self.union_with(rhs);
    }
}

impl BitAndAssign<&KeySet> for KeySet {
    fn bitand_assign(&mut self, rhs: &KeySet) {
        self.intersect_with(rhs);
    }
}

impl SubAssign<&KeySet> for KeySet {
    fn sub_assign(&mut self, rhs: &KeySet) {
        self.subtract(rhs);
    }
}

impl Extend<Key> for KeySet {
    fn extend<I: IntoIterator<Item = Key>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl FromIterator<Key> for KeySet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        KeySet::from_keys(iter)
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = Key;
    type IntoIter = KeySetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, key) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}")?;
        }
        write!(f, "}}")
    }
}

impl Serialize for KeySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.count()))?;
        for key in self.iter() {
            seq.serialize_element(&key)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for KeySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<Key>::deserialize(deserializer)?;
        Ok(KeySet::from_keys(keys))
    }
}

/// An iterator over the members of a [`KeySet`], in ascending order.
#[derive(Clone)]
pub struct KeySetIter<'a> {
    words: std::slice::Iter<'a, u64>,
    current_word: u64,
    next_word_index: usize,
    base_index: usize,
}

impl Iterator for KeySetIter<'_> {
    type Item = Key;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit_offset = self.current_word.trailing_zeros() as usize;
                // Clear the least significant set bit for the next iteration
                self.current_word &= self.current_word - 1;
                return Some((self.base_index + bit_offset) as Key);
            }

            let &word = self.words.next()?;
            self.current_word = word;
            self.base_index = self.next_word_index * 64;
            self.next_word_index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut set = KeySet::new();
        assert!(set.is_empty());
        assert!(!set.contains(5));

        assert!(set.insert(5));
        assert!(!set.insert(5));
        assert!(set.insert(130));
        assert_eq!(set.universe(), 131);
        assert!(set.contains(5));
        assert!(set.contains(130));
        assert!(!set.contains(64));
        assert_eq!(set.count(), 2);

        assert!(set.remove(5));
        assert!(!set.remove(5));
        assert!(!set.remove(1000));
        assert_eq!(set.to_vec(), vec![130]);
    }

    #[test]
    fn test_full_masks_tail() {
        let set = KeySet::full(70);
        assert_eq!(set.count(), 70);
        assert_eq!(set.iter().last(), Some(69));
        assert!(!set.contains(70));

        let empty = KeySet::full(0);
        assert!(empty.is_empty());
        assert_eq!(KeySet::full(128).count(), 128);
    }

    #[test]
    fn test_set_operations_across_universes() {
        let small = KeySet::from_keys([1, 3, 5]);
        let large = KeySet::from_keys([3, 5, 200]);

        let mut union = small.clone();
        union |= &large;
        assert_eq!(union.to_vec(), vec![1, 3, 5, 200]);

        let mut intersection = large.clone();
        intersection &= &small;
        assert_eq!(intersection.to_vec(), vec![3, 5]);

        let mut difference = large.clone();
        difference -= &small;
        assert_eq!(difference.to_vec(), vec![200]);

        let mut difference = small.clone();
        difference.subtract(&large);
        assert_eq!(difference.to_vec(), vec![1]);
    }

    #[test]
    fn test_equality_ignores_universe() {
        let mut a = KeySet::with_universe(500);
        a.insert(7);
        let b = KeySet::from_keys([7]);
        assert_eq!(a, b);
        assert_eq!(b, a);
        a.insert(499);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_and_serde() {
        let set = KeySet::from_keys([9, 2, 64]);
        assert_eq!(set.to_string(), "{2, 9, 64}");

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[2,9,64]");
        let back: KeySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_randomized_against_btree_set() {
        fastrand::seed(80_221_943);
        for _ in 0..50 {
            let universe = fastrand::u32(1..400);
            let a_keys = (0..fastrand::usize(0..100))
                .map(|_| fastrand::u32(0..universe))
                .collect::<BTreeSet<_>>();
            let b_keys = (0..fastrand::usize(0..100))
                .map(|_| fastrand::u32(0..universe))
                .collect::<BTreeSet<_>>();
            let a = KeySet::from_keys(a_keys.iter().copied());
            let b = KeySet::from_keys(b_keys.iter().copied());

            let mut union = a.clone();
            union.union_with(&b);
            assert_eq!(union.to_vec(), a_keys.union(&b_keys).copied().collect_vec());

            let mut intersection = a.clone();
            intersection.intersect_with(&b);
            assert_eq!(
                intersection.to_vec(),
                a_keys.intersection(&b_keys).copied().collect_vec()
            );

            let mut difference = a.clone();
            difference.subtract(&b);
            assert_eq!(
                difference.to_vec(),
                a_keys.difference(&b_keys).copied().collect_vec()
            );
            assert_eq!(a.count(), a_keys.len());
        }
    }
}
