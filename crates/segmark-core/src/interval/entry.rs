//! Entries stored in an [`IntervalSequence`](super::IntervalSequence)

use serde::{Deserialize, Serialize};

use crate::types::{Interval, SamplePos};

/// Anything that occupies an interval on the global sample axis
pub trait Spanned {
    fn span(&self) -> Interval;
    fn set_span(&mut self, span: Interval);
}

/// Interval with an optional label and free-form metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedInterval {
    pub interval: Interval,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Extra fields carried through from track data
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NamedInterval {
    pub fn named(interval: Interval, name: impl Into<String>) -> Self {
        Self {
            interval,
            name: Some(name.into()),
            extra: serde_json::Map::new(),
        }
    }
}

impl From<Interval> for NamedInterval {
    fn from(interval: Interval) -> Self {
        Self {
            interval,
            name: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl Spanned for NamedInterval {
    fn span(&self) -> Interval {
        self.interval
    }

    fn set_span(&mut self, span: Interval) {
        self.interval = span;
    }
}

/// One source file placed on the global sample axis
///
/// A file of `len` samples starting at `global_offset` covers the closed
/// interval `[global_offset, global_offset + len - 1]`; consecutive files are
/// contiguous and gap-free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSpan {
    pub filename: String,
    pub global_offset: SamplePos,
    pub interval: Interval,
}

impl FileSpan {
    /// Number of samples in this file
    pub fn len(&self) -> usize {
        (self.interval.size() + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert a global position to a position local to this file
    pub fn to_local(&self, global: f64) -> f64 {
        global - self.global_offset as f64
    }
}

impl Spanned for FileSpan {
    fn span(&self) -> Interval {
        self.interval
    }

    fn set_span(&mut self, span: Interval) {
        self.interval = span;
    }
}

/// Lay out files back to back from sample 0 given their sample counts
///
/// Files with zero samples are skipped since they cannot occupy a closed
/// interval.
pub fn layout_files<I, S>(files: I) -> Vec<FileSpan>
where
    I: IntoIterator<Item = (S, usize)>,
    S: Into<String>,
{
    let mut offset: SamplePos = 0;
    let mut out = Vec::new();
    for (name, len) in files {
        if len == 0 {
            continue;
        }
        let end = offset + len as SamplePos - 1;
        out.push(FileSpan {
            filename: name.into(),
            global_offset: offset,
            interval: Interval { start: offset, end },
        });
        offset = end + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_contiguous() {
        let files = layout_files(vec![("a.wav", 100), ("b.wav", 50), ("c.wav", 25)]);
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].interval, Interval::new(0, 99).unwrap());
        assert_eq!(files[1].interval, Interval::new(100, 149).unwrap());
        assert_eq!(files[2].global_offset, 150);
        assert_eq!(files[2].len(), 25);
        for pair in files.windows(2) {
            assert_eq!(pair[0].interval.end + 1, pair[1].interval.start);
        }
    }

    #[test]
    fn test_named_interval_json_keeps_extra_fields() {
        let json = r#"{"interval":[1,2],"name":"hi","speaker":"a"}"#;
        let parsed: NamedInterval = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("hi"));
        assert_eq!(parsed.extra.get("speaker").and_then(|v| v.as_str()), Some("a"));
    }
}
