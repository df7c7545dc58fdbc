use std::fmt;
use std::marker::PhantomData;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Marks an [`IdSet`] as holding message sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeqKind;

/// Marks an [`IdSet`] as holding UIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UidKind;

/// A set of message sequence numbers.
pub type SequenceSet = IdSet<SeqKind>;

/// A set of message UIDs.
pub type UidSet = IdSet<UidKind>;

/// An ordered set of non-zero message identifiers, stored as merged inclusive ranges.
///
/// The ranges are always sorted, non-overlapping and non-adjacent, so two sets holding the same
/// identifiers render identically. The `K` marker keeps sequence numbers and UIDs from being
/// mixed up by accident.
pub struct IdSet<K> {
    ranges: Vec<RangeInclusive<u32>>,
    kind: PhantomData<K>,
}

impl<K> IdSet<K> {
    /// An empty set.
    pub fn new() -> Self {
        IdSet {
            ranges: Vec::new(),
            kind: PhantomData,
        }
    }

    /// A set holding every identifier in `range`. The bounds may be given in either order.
    pub fn from_range(range: RangeInclusive<u32>) -> Self {
        let mut set = Self::new();
        set.insert_range(range);
        set
    }

    /// Add one identifier. Zero is not a valid identifier and is ignored.
    pub fn insert(&mut self, id: u32) {
        self.insert_range(id..=id);
    }

    /// Add every identifier in `range`, merging with neighbouring ranges.
    pub fn insert_range(&mut self, range: RangeInclusive<u32>) {
        let (mut lo, mut hi) = (*range.start(), *range.end());
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        if hi == 0 {
            return;
        }
        lo = lo.max(1);

        let start = self
            .ranges
            .partition_point(|r| r.end().saturating_add(1) < lo);
        let mut end = start;
        while end < self.ranges.len() && *self.ranges[end].start() <= hi.saturating_add(1) {
            lo = lo.min(*self.ranges[end].start());
            hi = hi.max(*self.ranges[end].end());
            end += 1;
        }
        self.ranges.splice(start..end, std::iter::once(lo..=hi));
    }

    /// Whether `id` is in the set.
    pub fn contains(&self, id: u32) -> bool {
        let idx = self.ranges.partition_point(|r| *r.end() < id);
        self.ranges.get(idx).map_or(false, |r| r.contains(&id))
    }

    /// The number of identifiers in the set.
    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|r| (*r.end() - *r.start()) as usize + 1)
            .sum()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The smallest identifier.
    pub fn first(&self) -> Option<u32> {
        self.ranges.first().map(|r| *r.start())
    }

    /// The largest identifier.
    pub fn last(&self) -> Option<u32> {
        self.ranges.last().map(|r| *r.end())
    }

    /// The merged ranges, in ascending order.
    pub fn ranges(&self) -> &[RangeInclusive<u32>] {
        &self.ranges
    }

    /// Iterate over every identifier in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|r| r.clone())
    }

    /// The identifiers in `self` that are not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for r in &self.ranges {
            let (mut lo, hi) = (*r.start(), *r.end());
            let mut consumed = false;
            for o in &other.ranges {
                if *o.end() < lo {
                    continue;
                }
                if *o.start() > hi {
                    break;
                }
                if *o.start() > lo {
                    out.ranges.push(lo..=*o.start() - 1);
                }
                if *o.end() >= hi {
                    consumed = true;
                    break;
                }
                lo = *o.end() + 1;
            }
            if !consumed {
                out.ranges.push(lo..=hi);
            }
        }
        out
    }
}

impl<K> Default for IdSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for IdSet<K> {
    fn clone(&self) -> Self {
        IdSet {
            ranges: self.ranges.clone(),
            kind: PhantomData,
        }
    }
}

impl<K> PartialEq for IdSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.ranges == other.ranges
    }
}

impl<K> Eq for IdSet<K> {}

impl<K> fmt::Debug for IdSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdSet({})", self)
    }
}

impl<K> fmt::Display for IdSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if r.start() == r.end() {
                write!(f, "{}", r.start())?;
            } else {
                write!(f, "{}:{}", r.start(), r.end())?;
            }
        }
        Ok(())
    }
}

impl<K> FromIterator<u32> for IdSet<K> {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<K> Extend<u32> for IdSet<K> {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl<K> From<u32> for IdSet<K> {
    fn from(id: u32) -> Self {
        Self::from_range(id..=id)
    }
}

impl<K> FromStr for IdSet<K> {
    type Err = Error;

    /// Parses the wire form, e.g. `1:3,5,9:7`. The `*` wildcard is rejected because it has no
    /// fixed meaning outside a selected folder.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Argument(format!("invalid sequence set: {:?}", s));
        let mut set = Self::new();
        for part in s.split(',') {
            let (lo, hi) = match part.split_once(':') {
                Some((lo, hi)) => (lo, hi),
                None => (part, part),
            };
            let lo: u32 = lo.parse().map_err(|_| invalid())?;
            let hi: u32 = hi.parse().map_err(|_| invalid())?;
            if lo == 0 || hi == 0 {
                return Err(invalid());
            }
            set.insert_range(lo..=hi);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn merges_adjacent_and_overlapping() {
        let mut set = UidSet::new();
        set.insert(5);
        set.insert(3);
        set.insert(4);
        set.insert_range(10..=12);
        set.insert_range(11..=15);
        set.insert(7);
        assert_eq!(set.to_string(), "3:5,7,10:15");
        assert_eq!(set.len(), 10);
        assert!(set.contains(11));
        assert!(!set.contains(6));
    }

    #[test]
    fn reversed_range_is_accepted() {
        let set: SequenceSet = "9:7,1".parse().unwrap();
        assert_eq!(set.to_string(), "1,7:9");
    }

    #[test]
    fn zero_and_wildcard_rejected() {
        assert!("0".parse::<UidSet>().is_err());
        assert!("1:*".parse::<UidSet>().is_err());
        assert!("".parse::<UidSet>().is_err());
    }

    #[test]
    fn difference_splits_ranges() {
        let a: UidSet = "1:10,20".parse().unwrap();
        let b: UidSet = "3,5:6,10:25".parse().unwrap();
        assert_eq!(a.difference(&b).to_string(), "1:2,4,7:9");
        assert!(b.difference(&b).is_empty());
    }

    #[test]
    fn handles_top_of_range() {
        let mut set = UidSet::new();
        set.insert(u32::MAX);
        set.insert(u32::MAX - 1);
        assert_eq!(set.ranges(), &[u32::MAX - 1..=u32::MAX]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn wire_form_round_trips(ids in proptest::collection::vec(1u32..5000, 0..200)) {
            let set: UidSet = ids.iter().copied().collect();
            let mut expected = ids.clone();
            expected.sort_unstable();
            expected.dedup();
            prop_assert_eq!(set.iter().collect::<Vec<_>>(), expected.clone());
            prop_assert_eq!(set.len(), expected.len());
            if !set.is_empty() {
                let parsed: UidSet = set.to_string().parse().unwrap();
                prop_assert_eq!(parsed, set);
            }
        }

        #[test]
        fn difference_matches_naive(
            a in proptest::collection::vec(1u32..300, 0..60),
            b in proptest::collection::vec(1u32..300, 0..60),
        ) {
            let sa: UidSet = a.iter().copied().collect();
            let sb: UidSet = b.iter().copied().collect();
            let naive: UidSet = a.iter().copied().filter(|x| !b.contains(x)).collect();
            prop_assert_eq!(sa.difference(&sb), naive);
        }
    }
}
