//! Sets of resource indices stored as coalesced ranges.

use std::ops::Range;

use rangemap::RangeSet;

/// A set of `u32` indices.
///
/// Adjacent indices merge into a single range, so a recording that touches
/// resources 1 through 1000 stores one entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexRangeSet {
    ranges: RangeSet<u32>,
}

impl IndexRangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single index.
    pub fn insert(&mut self, index: u32) {
        self.ranges.insert(single(index));
    }

    /// Add every index of `range`.
    pub fn insert_range(&mut self, range: Range<u32>) {
        if !range.is_empty() {
            self.ranges.insert(range);
        }
    }

    pub fn contains(&self, index: u32) -> bool {
        self.ranges.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.iter().next().is_none()
    }

    /// Number of indices in the set.
    pub fn len(&self) -> usize {
        self.ranges.iter().map(|range| range.len()).sum()
    }

    /// Coalesced ranges in ascending order.
    pub fn iter_ranges(&self) -> impl Iterator<Item = Range<u32>> + '_ {
        self.ranges.iter().cloned()
    }

    /// All indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().cloned().flatten()
    }

    pub fn clear(&mut self) {
        self.ranges = RangeSet::new();
    }
}

impl FromIterator<u32> for IndexRangeSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self {
            ranges: iter.into_iter().map(single).collect(),
        }
    }
}

impl Extend<u32> for IndexRangeSet {
    fn extend<T: IntoIterator<Item = u32>>(&mut self, iter: T) {
        for index in iter {
            self.insert(index);
        }
    }
}

fn single(index: u32) -> Range<u32> {
    assert!(index != u32::MAX, "index {} cannot be stored in a range", index);
    index..index + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDICES: [u32; 9] = [1, 2, 3, 4, 6, 7, 9, 42, 69];

    #[test]
    fn test_ranges_coalesce() {
        let set: IndexRangeSet = INDICES.into_iter().collect();

        let ranges: Vec<_> = set.iter_ranges().collect();
        assert_eq!(ranges, vec![1..5, 6..8, 9..10, 42..43, 69..70]);
        assert_eq!(set.iter().collect::<Vec<_>>(), INDICES.to_vec());
        assert_eq!(set.len(), INDICES.len());
    }

    #[test]
    fn test_insert_out_of_order_and_duplicates() {
        let mut set = IndexRangeSet::new();
        for index in [69, 3, 1, 4, 2, 3, 42, 9, 7, 6, 1] {
            set.insert(index);
        }

        assert_eq!(set.iter().collect::<Vec<_>>(), INDICES.to_vec());
        assert!(set.contains(42));
        assert!(!set.contains(5));
    }

    #[test]
    fn test_insert_range() {
        let mut set = IndexRangeSet::new();
        set.insert_range(10..20);
        set.insert_range(5..5);
        set.insert(20);

        assert_eq!(set.iter_ranges().collect::<Vec<_>>(), vec![10..21]);
    }

    #[test]
    fn test_empty_and_clear() {
        let mut set = IndexRangeSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);

        set.extend([1, 2]);
        assert!(!set.is_empty());

        set.clear();
        assert!(set.is_empty());
    }
}
