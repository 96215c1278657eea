//! Half-open block number intervals.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A half-open interval of block numbers, `[start, stop)`.
///
/// An interval with `start >= stop` is empty. Ranges are ordered by `start`,
/// then `stop`.
#[derive(
    Debug,
    Display,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[display("[{start}, {stop})")]
pub struct BlockRange {
    /// The first block number in the range.
    pub start: u64,
    /// One past the last block number in the range.
    pub stop: u64,
}

impl BlockRange {
    /// Creates a new [`BlockRange`] covering `[start, stop)`.
    pub const fn new(start: u64, stop: u64) -> Self {
        Self { start, stop }
    }

    /// Returns the number of blocks in the range.
    pub const fn len(&self) -> u64 {
        self.stop.saturating_sub(self.start)
    }

    /// Returns `true` if the range contains no blocks.
    pub const fn is_empty(&self) -> bool {
        self.start >= self.stop
    }

    /// Returns `true` if `number` falls inside the range.
    pub const fn contains(&self, number: u64) -> bool {
        number >= self.start && number < self.stop
    }

    /// Returns the last block number in the range, if any.
    pub const fn last(&self) -> Option<u64> {
        if self.is_empty() { None } else { Some(self.stop - 1) }
    }

    /// Returns the overlap of two ranges, or `None` when they are disjoint.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let range = Self::new(self.start.max(other.start), self.stop.min(other.stop));
        (!range.is_empty()).then_some(range)
    }

    /// Splits the range at its midpoint.
    ///
    /// Returns `None` for ranges holding fewer than two blocks, which cannot be
    /// subdivided any further.
    pub const fn halve(&self) -> Option<(Self, Self)> {
        if self.len() < 2 {
            return None;
        }
        let mid = self.start + self.len() / 2;
        Some((Self::new(self.start, mid), Self::new(mid, self.stop)))
    }

    /// Returns consecutive windows of at most `size` blocks covering the range.
    ///
    /// A `size` of zero is treated as one.
    pub fn chunks(&self, size: u64) -> impl Iterator<Item = Self> + use<> {
        let size = size.max(1);
        let stop = self.stop;
        let mut cursor = self.start;
        std::iter::from_fn(move || {
            if cursor >= stop {
                return None;
            }
            let next = cursor.saturating_add(size).min(stop);
            let window = Self::new(cursor, next);
            cursor = next;
            Some(window)
        })
    }

    /// Returns the parts of this range not covered by any of `covered`.
    ///
    /// `covered` may be unsorted and overlapping. The result is sorted and
    /// contains no empty ranges.
    pub fn subtract(&self, covered: &[Self]) -> Vec<Self> {
        let mut covered: Vec<Self> =
            covered.iter().filter_map(|range| range.intersect(self)).collect();
        covered.sort();

        let mut gaps = Vec::new();
        let mut cursor = self.start;
        for range in covered {
            if range.start > cursor {
                gaps.push(Self::new(cursor, range.start));
            }
            cursor = cursor.max(range.stop);
        }
        if cursor < self.stop {
            gaps.push(Self::new(cursor, self.stop));
        }
        gaps
    }

    /// Merges overlapping or adjacent ranges into a sorted, disjoint list.
    pub fn merge(ranges: impl IntoIterator<Item = Self>) -> Vec<Self> {
        let mut ranges: Vec<Self> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
        ranges.sort();

        let mut merged: Vec<Self> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start <= last.stop => last.stop = last.stop.max(range.stop),
                _ => merged.push(range),
            }
        }
        merged
    }
}

impl From<std::ops::Range<u64>> for BlockRange {
    fn from(range: std::ops::Range<u64>) -> Self {
        Self::new(range.start, range.end)
    }
}
