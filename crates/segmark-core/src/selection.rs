//! Drag-derived selection
//!
//! The selection is a single optional interval resolved from an anchor sample
//! (where the drag started) and the current pointer sample. Shift-extending
//! combines the fresh drag with the previous selection: dragging outward grows
//! it to the union, dragging inward shrinks it to the overlap.

use serde::Serialize;

use crate::types::Interval;

/// What a pointer event landed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "track", rename_all = "snake_case")]
pub enum ClickTarget {
    /// Waveform canvas or empty background
    Waveform,
    /// A labeled interval track, by name
    Track(String),
    /// The pitch contour lane
    Pitch,
}

/// Combine a previous selection with a freshly dragged span
///
/// Returns the union when it is strictly larger than `previous`, otherwise the
/// intersection (which is `None` when the spans are disjoint). A union exactly
/// as large as `previous` resolves to the intersection.
pub fn combine(previous: Interval, fresh: Interval) -> Option<Interval> {
    let union = fresh.union(&previous);
    if union.size() > previous.size() {
        Some(union)
    } else {
        fresh.intersection(&previous)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    anchor: Option<f64>,
    current: Option<f64>,
    selection: Option<Interval>,
    dragging: bool,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<Interval> {
        self.selection
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn anchor(&self) -> Option<f64> {
        self.anchor
    }

    /// Span between anchor and current pointer, rounded to whole samples
    fn fresh_span(&self) -> Option<Interval> {
        match (self.anchor, self.current) {
            (Some(a), Some(b)) => Some(Interval::spanning(a.round() as i64, b.round() as i64)),
            _ => None,
        }
    }

    /// Resolve the selection from the drag state
    ///
    /// Without `extend` (or without a previous selection) the fresh span wins.
    /// With `extend` and no fresh span the previous selection is kept.
    pub fn resolve(&self, extend: bool) -> Option<Interval> {
        let fresh = self.fresh_span();
        match (self.selection, extend) {
            (Some(previous), true) => match fresh {
                Some(fresh) => combine(previous, fresh),
                None => Some(previous),
            },
            _ => fresh,
        }
    }

    /// Pointer pressed on the waveform: start a new drag
    pub fn begin_drag(&mut self, sample: f64) -> Option<Interval> {
        self.dragging = true;
        self.anchor = Some(sample);
        self.current = Some(sample);
        self.selection = self.resolve(false);
        self.selection
    }

    /// Pointer moved; only has an effect while dragging
    pub fn drag_to(&mut self, sample: f64) -> Option<Interval> {
        if self.dragging {
            self.current = Some(sample);
            self.selection = self.resolve(false);
        }
        self.selection
    }

    /// Pointer released at `sample`; ends any drag
    ///
    /// With `extend`, the span from the existing anchor to `sample` is
    /// combined with the previous selection.
    pub fn release(&mut self, sample: f64, extend: bool) -> Option<Interval> {
        self.dragging = false;
        self.current = Some(sample);
        if self.anchor.is_none() {
            self.anchor = Some(sample);
        }
        self.selection = self.resolve(extend);
        self.selection
    }

    /// Combine an explicit fresh span with the current selection
    pub fn extend_with(&mut self, fresh: Interval) -> Option<Interval> {
        self.anchor = Some(fresh.start as f64);
        self.current = Some(fresh.end as f64);
        self.selection = self.resolve(true);
        self.selection
    }

    /// Select an exact span, bypassing the combine rule
    pub fn select_span(&mut self, span: Interval) -> Interval {
        self.anchor = Some(span.start as f64);
        self.current = Some(span.end as f64);
        self.selection = Some(span);
        span
    }

    /// Select from the first to the last of a run of labeled spans
    pub fn select_range(&mut self, first: Interval, last: Interval) -> Interval {
        self.select_span(first.union(&last))
    }

    /// Drop the selection unconditionally
    pub fn clear(&mut self) {
        self.anchor = None;
        self.current = None;
        self.selection = None;
        self.dragging = false;
    }
}
