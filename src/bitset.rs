//! Simple BitSet implementation backed by a Vec<u64>.
//! Used as the entity liveness table: one bit per entity slot.

#[derive(Debug, Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// Create a new BitSet capable of holding at least `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(64);
        Self {
            words: vec![0; num_words],
        }
    }

    /// Set the bit at `index` to true.
    /// Resizes automatically if index is out of bounds.
    pub fn set(&mut self, index: usize) {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }
        self.words[word_idx] |= 1 << bit_idx;
    }

    /// Set the bit at `index` to false. Out of range indices are already clear.
    pub fn unset(&mut self, index: usize) {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if let Some(word) = self.words.get_mut(word_idx) {
            *word &= !(1 << bit_idx);
        }
    }

    /// Check if the bit at `index` is set.
    pub fn contains(&self, index: usize) -> bool {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if word_idx >= self.words.len() {
            return false;
        }
        (self.words[word_idx] & (1 << bit_idx)) != 0
    }

    /// Clear all bits, keeping the allocation
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Lowest index below `limit` that is clear in both `self` and `other`.
    ///
    /// Scans a word at a time, so a full table costs `limit / 64` iterations.
    pub fn first_clear_in_both(&self, other: &Self, limit: usize) -> Option<usize> {
        let word_count = limit.div_ceil(64);
        for word_idx in 0..word_count {
            let a = self.words.get(word_idx).copied().unwrap_or(0);
            let b = other.words.get(word_idx).copied().unwrap_or(0);
            let free = !(a | b);
            if free != 0 {
                let index = word_idx * 64 + free.trailing_zeros() as usize;
                return (index < limit).then_some(index);
            }
        }
        None
    }

    /// Returns iterator over indices of set bits
    pub fn ones(&self) -> OnesIter<'_> {
        OnesIter {
            bitset: self,
            word_idx: 0,
            current_word: if self.words.is_empty() {
                0
            } else {
                self.words[0]
            },
        }
    }
}

pub struct OnesIter<'a> {
    bitset: &'a BitSet,
    word_idx: usize,
    current_word: u64,
}

impl<'a> Iterator for OnesIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let trailing = self.current_word.trailing_zeros();
                self.current_word &= !(1 << trailing); // Clear the bit we just found
                return Some(self.word_idx * 64 + trailing as usize);
            }

            self.word_idx += 1;
            if self.word_idx >= self.bitset.words.len() {
                return None;
            }
            self.current_word = self.bitset.words[self.word_idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_unset_contains() {
        let mut bits = BitSet::with_capacity(10);
        bits.set(3);
        bits.set(130);
        assert!(bits.contains(3));
        assert!(bits.contains(130));
        assert_eq!(bits.ones().count(), 2);

        bits.unset(3);
        bits.unset(10_000);
        assert!(!bits.contains(3));
        assert_eq!(bits.ones().collect::<Vec<_>>(), vec![130]);

        bits.clear();
        assert!(!bits.contains(130));
        assert_eq!(bits.ones().count(), 0);
    }

    #[test]
    fn test_first_clear_in_both() {
        let mut live = BitSet::with_capacity(128);
        let mut retiring = BitSet::with_capacity(128);
        for i in 0..64 {
            live.set(i);
        }
        retiring.set(64);
        assert_eq!(live.first_clear_in_both(&retiring, 128), Some(65));
        assert_eq!(live.first_clear_in_both(&retiring, 65), None);
        assert_eq!(live.first_clear_in_both(&retiring, 0), None);
    }
}
