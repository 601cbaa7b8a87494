//! Disjoint, start-sorted interval container
//!
//! Array-backed: lookups are `O(log n)` binary searches over interval starts,
//! while inserts and removals splice the backing `Vec` and cost `O(n)` in the
//! worst case. Track sizes seen in practice (thousands of words) keep this
//! well below a millisecond; a balanced tree would be needed for millions of
//! entries.

use std::ops::Range;

use crate::error::TrackError;
use crate::types::Interval;

use super::entry::Spanned;

/// Ordered sequence of non-overlapping intervals
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalSequence<T> {
    items: Vec<T>,
}

impl<T> Default for IntervalSequence<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Spanned> IntervalSequence<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence from arbitrary entries, dropping any that overlap an
    /// entry already accepted. Returns the sequence and the rejected entries.
    pub fn from_entries(entries: impl IntoIterator<Item = T>) -> (Self, Vec<T>) {
        let mut seq = Self::new();
        let mut rejected = Vec::new();
        for entry in entries {
            if let Err(entry) = seq.insert(entry) {
                rejected.push(entry);
            }
        }
        (seq, rejected)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Spans of every entry in order
    pub fn spans(&self) -> Vec<Interval> {
        self.items.iter().map(Spanned::span).collect()
    }

    /// Lower bound: smallest index `i` with `items[i].start >= offset`
    pub fn find(&self, offset: i64) -> usize {
        self.items.partition_point(|item| item.span().start < offset)
    }

    /// Index range of the entries overlapping the closed interval `[a, b]`
    ///
    /// Lookup keys only on starts, so the lower boundary walks back over an
    /// entry that begins before `a` but reaches into it, and the upper
    /// boundary walks down past entries that start at or before `b` without
    /// overlapping.
    pub fn intersect_range(&self, query: Interval) -> Range<usize> {
        let mut begin = self.find(query.start);
        while begin > 0 && self.items[begin - 1].span().overlaps(&query) {
            begin -= 1;
        }

        // Upper bound over starts: entries starting exactly at `b` overlap
        let mut end = self.items.partition_point(|item| item.span().start <= query.end);
        while end > begin && !self.items[end - 1].span().overlaps(&query) {
            end -= 1;
        }

        begin..end.max(begin)
    }

    /// Entries overlapping `[a, b]`, in start order
    pub fn intersect(&self, query: Interval) -> &[T] {
        &self.items[self.intersect_range(query)]
    }

    /// Insert an entry unless it overlaps an existing one
    ///
    /// On conflict the sequence is left untouched and the entry is handed back.
    pub fn insert(&mut self, entry: T) -> Result<(), T> {
        let span = entry.span();
        if !self.intersect_range(span).is_empty() {
            return Err(entry);
        }
        let index = self.find(span.start);
        self.items.insert(index, entry);
        Ok(())
    }

    /// Create a fresh entry covering `interval`
    pub fn create(&mut self, interval: Interval) -> Result<(), TrackError>
    where
        T: From<Interval>,
    {
        self.insert(T::from(interval)).map_err(|_| {
            log::warn!("Ignored overlapping interval {}", interval);
            TrackError::OverlapConflict { interval }
        })
    }

    /// Remove `[u, v]` from every overlapping entry
    ///
    /// Entries covered by the cut are removed, entries overlapping one edge are
    /// truncated to the remaining side, and entries that properly contain the
    /// cut are split in two (zero-length pieces are dropped). Returns the
    /// surviving remainder spans in order. A degenerate cut changes nothing.
    pub fn kill_intersection(&mut self, cut: Interval) -> Vec<Interval>
    where
        T: Clone,
    {
        if cut.is_degenerate() {
            return Vec::new();
        }

        let range = self.intersect_range(cut);
        if range.is_empty() {
            return Vec::new();
        }

        let (u, v) = (cut.start, cut.end);
        let mut survivors: Vec<T> = Vec::with_capacity(range.len() + 1);
        let mut remainders = Vec::new();

        for item in &self.items[range.clone()] {
            let Interval { start: a, end: b } = item.span();
            let mut keep = |span: Interval| {
                let mut piece = item.clone();
                piece.set_span(span);
                survivors.push(piece);
                remainders.push(span);
            };

            if u < a {
                if v < b {
                    // cut reaches in from the left
                    keep(Interval { start: v, end: b });
                }
            } else if v < b {
                // cut lies inside
                if a != u {
                    keep(Interval { start: a, end: u });
                }
                keep(Interval { start: v, end: b });
            } else if a != u {
                // cut reaches in from the right
                keep(Interval { start: a, end: u });
            }
        }

        self.items.splice(range, survivors);
        remainders
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T> IntoIterator for &'a IntervalSequence<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
