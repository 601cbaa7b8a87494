//! Error types for timeline commands
//!
//! Every failure is local to the command that triggered it. The session turns
//! these into [`crate::status::StatusEvent::Error`] so the last known state stays
//! renderable.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Interval;

/// Selection is missing or unusable for the requested command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No selection")]
    NoSelection,

    #[error("Selection {interval} has zero length")]
    Degenerate { interval: Interval },
}

impl SelectionError {
    /// Validate that a selection exists and is not degenerate
    pub fn check(selection: Option<Interval>) -> Result<Interval, SelectionError> {
        match selection {
            None => Err(SelectionError::NoSelection),
            Some(interval) if interval.is_degenerate() => {
                Err(SelectionError::Degenerate { interval })
            }
            Some(interval) => Ok(interval),
        }
    }
}

/// Errors from interval track mutation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// Insert target overlaps an existing interval (nothing was changed)
    #[error("Could not create {interval}: overlaps existing interval")]
    OverlapConflict { interval: Interval },

    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    #[error("Track {0} is read-only")]
    ReadOnlyTrack(String),
}

/// Decode service failures
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to open {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio: {0}")]
    Unsupported(String),

    #[error("Malformed audio: {0}")]
    Malformed(String),

    #[error("No samples decoded from {0}")]
    Empty(String),
}

/// Selection falls outside every known file span
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Selection {interval} is not covered by audio")]
pub struct CoverageError {
    pub interval: Interval,
}

/// Export failures
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Sample rate mismatch across files: expected {expected}Hz, found {found}Hz")]
    RateMismatch { expected: u32, found: u32 },

    #[error("No samples extracted for selection")]
    NothingExtracted,

    #[error("Export of {samples} sample(s) x{repeat} exceeds the WAV size limit")]
    TooLarge { samples: usize, repeat: u32 },

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Playback failures
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Nothing to play")]
    NothingToPlay,

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Audio output error: {0}")]
    Output(String),
}

/// Snap command failures
#[derive(Error, Debug)]
pub enum SnapError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Coverage(#[from] CoverageError),

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Umbrella error for the session command surface
#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Track(#[from] TrackError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Coverage(#[from] CoverageError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Snap(#[from] SnapError),
}

/// Result type for session commands
pub type EditorResult<T> = Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_check() {
        assert_eq!(SelectionError::check(None), Err(SelectionError::NoSelection));
        let point = Interval::point(5);
        assert_eq!(
            SelectionError::check(Some(point)),
            Err(SelectionError::Degenerate { interval: point })
        );
        let ok = Interval::new(1, 5).unwrap();
        assert_eq!(SelectionError::check(Some(ok)), Ok(ok));
    }

    #[test]
    fn test_messages() {
        let err = ExportError::RateMismatch { expected: 16000, found: 44100 };
        assert_eq!(
            err.to_string(),
            "Sample rate mismatch across files: expected 16000Hz, found 44100Hz"
        );
        let err: EditorError = TrackError::OverlapConflict {
            interval: Interval::new(5, 15).unwrap(),
        }
        .into();
        assert_eq!(err.to_string(), "Could not create [5, 15]: overlaps existing interval");
    }
}
