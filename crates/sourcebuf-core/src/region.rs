//! Region tracking
//!
//! A [`Region`] is a sorted set of disjoint, non-adjacent half-open [`Interval`]s over character
//! offsets. It is used both for "pending work" bookkeeping (text that still needs highlighting)
//! and for the applied ranges of every tag in a [`TextModel`](crate::TextModel).
//!
//! Intervals are kept in a sorted vector and located with binary search, so adding or
//! subtracting an interval costs O(log n + k), where k is the number of intervals touched.

use std::ops::Range;

/// Half-open `[start, end)` character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
}

impl Interval {
    /// Create a new interval. `start` must not be greater than `end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "interval start {start} > end {end}");
        Self { start, end }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the interval covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if interval contains a specific position
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Check if two intervals overlap
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Convert into a `Range<usize>`.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for Interval {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Merged set of intervals.
///
/// Invariants (checked in debug builds after every mutation):
/// - intervals are sorted by `start`
/// - every stored interval is non-empty
/// - no two intervals overlap or touch (`a.end < b.start` for consecutive `a`, `b`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    intervals: Vec<Interval>,
}

impl Region {
    /// Create an empty region.
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// Number of stored (merged) intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Remove every interval.
    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    /// The `n`-th interval in offset order.
    pub fn nth(&self, n: usize) -> Option<Interval> {
        self.intervals.get(n).copied()
    }

    /// Iterate over the current intervals in offset order.
    ///
    /// The iterator borrows the region, so it always reflects the state at the time it is created.
    pub fn iter(&self) -> impl Iterator<Item = Interval> + '_ {
        self.intervals.iter().copied()
    }

    /// Smallest interval covering everything in the region.
    pub fn bounds(&self) -> Option<Interval> {
        let first = self.intervals.first()?;
        let last = self.intervals.last()?;
        Some(Interval::new(first.start, last.end))
    }

    /// Check whether `pos` is covered by the region.
    pub fn contains(&self, pos: usize) -> bool {
        let idx = self.intervals.partition_point(|i| i.end <= pos);
        self.intervals
            .get(idx)
            .is_some_and(|interval| interval.contains(pos))
    }

    /// Check whether every offset of `[start, end)` is covered.
    pub fn covers(&self, start: usize, end: usize) -> bool {
        if start >= end {
            return true;
        }
        let idx = self.intervals.partition_point(|i| i.end <= start);
        self.intervals
            .get(idx)
            .is_some_and(|interval| interval.start <= start && end <= interval.end)
    }

    /// Merge `[start, end)` into the region.
    pub fn add(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }

        // First interval that touches or follows `start`, first interval strictly after `end`.
        let first = self.intervals.partition_point(|i| i.end < start);
        let last = self.intervals.partition_point(|i| i.start <= end);

        if first == last {
            self.intervals.insert(first, Interval::new(start, end));
        } else {
            let merged = Interval::new(
                start.min(self.intervals[first].start),
                end.max(self.intervals[last - 1].end),
            );
            self.intervals.splice(first..last, std::iter::once(merged));
        }

        self.debug_check();
    }

    /// Remove `[start, end)` from the region, splitting partially covered intervals.
    pub fn subtract(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }

        let first = self.intervals.partition_point(|i| i.end <= start);
        let last = self.intervals.partition_point(|i| i.start < end);
        if first >= last {
            return;
        }

        let head = self.intervals[first];
        let tail = self.intervals[last - 1];

        let mut remnants = Vec::with_capacity(2);
        if head.start < start {
            remnants.push(Interval::new(head.start, start));
        }
        if tail.end > end {
            remnants.push(Interval::new(end, tail.end));
        }
        self.intervals.splice(first..last, remnants);

        self.debug_check();
    }

    /// Overlap of the region with `[start, end)`, as a new region. `self` is not modified.
    pub fn intersect(&self, start: usize, end: usize) -> Region {
        let mut result = Region::new();
        if start >= end {
            return result;
        }

        let first = self.intervals.partition_point(|i| i.end <= start);
        for interval in self.intervals[first..].iter() {
            if interval.start >= end {
                break;
            }
            let clipped = Interval::new(interval.start.max(start), interval.end.min(end));
            if !clipped.is_empty() {
                result.intervals.push(clipped);
            }
        }

        result
    }

    /// Update offsets when `len` characters are inserted at `pos`.
    ///
    /// Intervals starting at or after `pos` move right; an interval strictly containing `pos`
    /// grows to include the inserted text.
    pub fn shift_for_insertion(&mut self, pos: usize, len: usize) {
        if len == 0 {
            return;
        }

        let first = self.intervals.partition_point(|i| i.end <= pos);
        for interval in &mut self.intervals[first..] {
            if interval.start >= pos {
                interval.start += len;
                interval.end += len;
            } else {
                // Interval spans insertion point, extend end position
                interval.end += len;
            }
        }

        self.debug_check();
    }

    /// Update offsets when the text in range `[start, end)` is deleted.
    ///
    /// Offsets inside the deleted range collapse to `start`; intervals that become empty are
    /// dropped and intervals that become adjacent are merged.
    pub fn shift_for_deletion(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }

        let delta = end - start;
        let map = |offset: usize| {
            if offset <= start {
                offset
            } else if offset >= end {
                offset - delta
            } else {
                start
            }
        };

        let first = self.intervals.partition_point(|i| i.end < start);
        if first == self.intervals.len() {
            return;
        }

        let mut rebuilt: Vec<Interval> = Vec::with_capacity(self.intervals.len());
        rebuilt.extend_from_slice(&self.intervals[..first]);
        for interval in &self.intervals[first..] {
            let mapped = Interval::new(map(interval.start), map(interval.end));
            if mapped.is_empty() {
                continue;
            }
            match rebuilt.last_mut() {
                Some(prev) if prev.end >= mapped.start => prev.end = prev.end.max(mapped.end),
                _ => rebuilt.push(mapped),
            }
        }
        self.intervals = rebuilt;

        self.debug_check();
    }

    #[inline]
    fn debug_check(&self) {
        debug_assert!(
            self.intervals.iter().all(|i| i.start < i.end),
            "region holds an empty interval: {:?}",
            self.intervals
        );
        debug_assert!(
            self.intervals.windows(2).all(|w| w[0].end < w[1].start),
            "region intervals overlap or touch: {:?}",
            self.intervals
        );
    }
}

impl FromIterator<Interval> for Region {
    fn from_iter<T: IntoIterator<Item = Interval>>(iter: T) -> Self {
        let mut region = Region::new();
        for interval in iter {
            region.add(interval.start, interval.end);
        }
        region
    }
}
