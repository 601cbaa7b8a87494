//! Common types for Segmark
//!
//! This module contains the interval primitives used throughout the timeline
//! model. All positions live on the *global sample axis*: the logical
//! concatenation of every source file's samples into one coordinate space.

use serde::{Deserialize, Serialize};

/// Default sample rate used when no decoded audio is available yet
pub const FALLBACK_SAMPLE_RATE: u32 = 16000;

/// Rendered min/max blocks per second of audio (display density)
pub const RENDER_BLOCKS_PER_SECOND: u32 = 1600;

/// Position on the global sample axis
pub type SamplePos = i64;

/// Closed interval `[start, end]` on the global sample axis
///
/// Both endpoints are inclusive, so `[0, 10]` and `[10, 20]` overlap at
/// sample 10. `start <= end` always holds for values built through
/// [`Interval::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[SamplePos; 2]", into = "[SamplePos; 2]")]
pub struct Interval {
    pub start: SamplePos,
    pub end: SamplePos,
}

impl Interval {
    /// Create an interval, returning `None` when `start > end`
    #[inline]
    pub fn new(start: SamplePos, end: SamplePos) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Create an interval from two unordered endpoints
    #[inline]
    pub fn spanning(a: SamplePos, b: SamplePos) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Create an interval from fractional endpoints, rounding each to the
    /// nearest sample. Returns `None` when the rounded start exceeds the end.
    pub fn from_f64(start: f64, end: f64) -> Option<Self> {
        Self::new(start.round() as SamplePos, end.round() as SamplePos)
    }

    /// Zero-length interval at a single position
    #[inline]
    pub fn point(pos: SamplePos) -> Self {
        Self { start: pos, end: pos }
    }

    #[inline]
    pub fn size(&self) -> SamplePos {
        self.end - self.start
    }

    /// True when the interval has zero length
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.size() == 0
    }

    /// Midpoint as a fractional sample position
    #[inline]
    pub fn center(&self) -> f64 {
        (self.start as f64 + self.end as f64) / 2.0
    }

    #[inline]
    pub fn contains(&self, pos: SamplePos) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// Overlap of two closed intervals (touching endpoints count)
    #[inline]
    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        Interval::new(self.start.max(other.start), self.end.min(other.end))
    }

    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.intersection(other).is_some()
    }

    /// Smallest interval covering both
    #[inline]
    pub fn union(&self, other: &Interval) -> Interval {
        Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<[SamplePos; 2]> for Interval {
    fn from([a, b]: [SamplePos; 2]) -> Self {
        Interval::spanning(a, b)
    }
}

impl From<Interval> for [SamplePos; 2] {
    fn from(interval: Interval) -> Self {
        [interval.start, interval.end]
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// True when a selection is absent or has zero length
pub fn is_null(selection: Option<Interval>) -> bool {
    selection.map_or(true, |s| s.is_degenerate())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_intersection_includes_touching_endpoints() {
        let a = Interval::new(0, 10).unwrap();
        let b = Interval::new(10, 20).unwrap();
        assert_eq!(a.intersection(&b), Some(Interval::point(10)));

        let c = Interval::new(11, 20).unwrap();
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_union_and_size() {
        let a = Interval::new(10, 20).unwrap();
        let b = Interval::new(15, 30).unwrap();
        let u = a.union(&b);
        assert_eq!(u, Interval::new(10, 30).unwrap());
        assert_eq!(u.size(), 20);
    }

    #[test]
    fn test_from_f64_rounds_and_validates() {
        assert_eq!(Interval::from_f64(1.4, 2.6), Interval::new(1, 3));
        assert_eq!(Interval::from_f64(5.0, 4.0), None);
    }

    #[test]
    fn test_serde_as_pair() {
        let iv = Interval::new(3, 7).unwrap();
        assert_eq!(serde_json::to_string(&iv).unwrap(), "[3,7]");
        let back: Interval = serde_json::from_str("[7,3]").unwrap();
        assert_eq!(back, iv);
    }

    #[test]
    fn test_is_null() {
        assert!(is_null(None));
        assert!(is_null(Some(Interval::point(4))));
        assert!(!is_null(Interval::new(4, 5)));
    }
}
