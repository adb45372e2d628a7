//! Growable bitset used for component membership and system ownership.
//!
//! A [`BitMask`] is an array of `u64` words. Bits past the end of the array
//! read as zero, so masks of different lengths compare correctly and the
//! mask never needs to know how many component kinds exist up front.

use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// A growable set of bit indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BitMask {
    words: Vec<u64>,
}

impl BitMask {
    /// Create an empty mask.
    #[must_use]
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Build a mask with every index in `bits` set.
    #[must_use]
    pub fn from_bits(bits: impl IntoIterator<Item = usize>) -> Self {
        let mut mask = Self::new();
        for bit in bits {
            mask.set(bit);
        }
        mask
    }

    /// Sets `bit`, growing the word array if needed.
    #[inline]
    pub fn set(&mut self, bit: usize) {
        let word = bit / WORD_BITS;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (bit % WORD_BITS);
    }

    /// Clears `bit`. Clearing a bit beyond the current width is a no-op.
    #[inline]
    pub fn clear(&mut self, bit: usize) {
        if let Some(word) = self.words.get_mut(bit / WORD_BITS) {
            *word &= !(1u64 << (bit % WORD_BITS));
        }
    }

    /// Returns `true` if `bit` is set.
    #[inline]
    #[must_use]
    pub fn has(&self, bit: usize) -> bool {
        self.words
            .get(bit / WORD_BITS)
            .is_some_and(|word| (word >> (bit % WORD_BITS)) & 1 == 1)
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Number of set bits.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Returns `true` if every bit of `other` is also set in `self`
    /// (`self & other == other`).
    #[must_use]
    pub fn contains_all(&self, other: &BitMask) -> bool {
        other
            .words
            .iter()
            .enumerate()
            .all(|(i, &theirs)| self.word(i) & theirs == theirs)
    }

    /// Returns `true` if `self` and `other` share at least one bit.
    #[must_use]
    pub fn intersects(&self, other: &BitMask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Number of bits set in both `self` and `other`.
    #[must_use]
    pub fn intersection_count(&self, other: &BitMask) -> usize {
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    /// Returns the union of `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &BitMask) -> BitMask {
        let len = self.words.len().max(other.words.len());
        BitMask {
            words: (0..len).map(|i| self.word(i) | other.word(i)).collect(),
        }
    }

    /// Returns the lowest bit set in both masks, if any.
    #[must_use]
    pub fn first_common(&self, other: &BitMask) -> Option<usize> {
        self.words
            .iter()
            .zip(other.words.iter())
            .enumerate()
            .find_map(|(i, (a, b))| {
                let both = a & b;
                (both != 0).then(|| i * WORD_BITS + both.trailing_zeros() as usize)
            })
    }

    /// Iterates over all set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_index, &word)| {
                let base = word_index * WORD_BITS;
                let mut bits = word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let tz = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some(base + tz)
                })
            })
    }

    fn word(&self, index: usize) -> u64 {
        self.words.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for BitMask {
    fn eq(&self, other: &Self) -> bool {
        let len = self.words.len().max(other.words.len());
        (0..len).all(|i| self.word(i) == other.word(i))
    }
}

impl Eq for BitMask {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_clear_has() {
        let mut mask = BitMask::new();
        assert!(!mask.has(3));
        mask.set(3);
        mask.set(130);
        assert!(mask.has(3));
        assert!(mask.has(130));
        assert!(!mask.has(64));
        mask.clear(3);
        assert!(!mask.has(3));
        assert_eq!(mask.count(), 1);
    }

    #[test]
    fn test_clear_beyond_width_is_noop() {
        let mut mask = BitMask::from_bits([1]);
        mask.clear(500);
        assert_eq!(mask, BitMask::from_bits([1]));
    }

    #[test]
    fn test_equality_ignores_trailing_zero_words() {
        let mut grown = BitMask::from_bits([2, 200]);
        grown.clear(200);
        assert_eq!(grown, BitMask::from_bits([2]));
    }

    #[test]
    fn test_contains_all_across_widths() {
        let wide = BitMask::from_bits([0, 1, 70]);
        assert!(wide.contains_all(&BitMask::from_bits([0, 70])));
        assert!(!BitMask::from_bits([0]).contains_all(&BitMask::from_bits([0, 70])));
        assert!(BitMask::new().contains_all(&BitMask::new()));
    }

    #[test]
    fn test_intersection_count() {
        let a = BitMask::from_bits([1, 2, 65]);
        let b = BitMask::from_bits([2, 65, 66]);
        assert_eq!(a.intersection_count(&b), 2);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&BitMask::from_bits([3])));
        assert_eq!(a.first_common(&b), Some(2));
    }

    #[test]
    fn test_iter_ascending() {
        let mask = BitMask::from_bits([129, 0, 64, 5]);
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![0, 5, 64, 129]);
    }

    #[test]
    fn test_union() {
        let u = BitMask::from_bits([1]).union(&BitMask::from_bits([100]));
        assert_eq!(u.iter().collect::<Vec<_>>(), vec![1, 100]);
    }
}
