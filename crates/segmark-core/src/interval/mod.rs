//! Interval tracks
//!
//! An [`IntervalSequence`] keeps disjoint, start-sorted entries with
//! overlap-checked insert and split-aware removal. It backs both the labeled
//! tracks (words, marked segments) and the file-span layout of the timeline.

mod entry;
mod sequence;

pub use entry::{layout_files, FileSpan, NamedInterval, Spanned};
pub use sequence::IntervalSequence;

/// Sequence of source files covering the global sample axis
pub type FileSpans = IntervalSequence<FileSpan>;

/// Sequence of labeled intervals (one per track)
pub type LabeledTrack = IntervalSequence<NamedInterval>;
