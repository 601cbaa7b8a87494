//! Structured status channel
//!
//! Every command reports its outcome here, successes and failures alike. The
//! bus keeps the most recent event so a host that attaches late can still
//! render the last known state.

use std::path::PathBuf;
use std::sync::Mutex;

use crossbeam::channel::{Receiver, SendError, Sender};
use serde::Serialize;

use crate::pitch::PitchFrame;
use crate::types::{Interval, SamplePos};

/// Outcome of a command or an asynchronous completion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEvent {
    /// Session files are being decoded
    Loading { files: usize },
    /// Session ready
    Loaded {
        files: usize,
        total_samples: SamplePos,
        sample_rate: u32,
        pages: usize,
    },
    /// Selection changed (`None` when cleared)
    Selection { interval: Option<Interval> },
    /// Buffers for playback are being fetched
    PlaybackLoading { interval: Interval },
    Playing { interval: Interval, looped: bool },
    /// Playback ended, by request or at the natural end
    Stopped { position: SamplePos, interval: Interval },
    /// A pending playback start was superseded before its audio arrived
    Cancelled { interval: Interval },
    Marked { interval: Interval },
    Unmarked { remaining: Vec<Interval> },
    /// Selection refined; `period` is set for glottal snaps
    Snapped {
        interval: Interval,
        period: Option<f64>,
    },
    Exported { path: PathBuf, interval: Interval },
    PageSize { samples: SamplePos, pages: usize },
    WaveformGain { gain: f32 },
    PitchFrame(PitchFrame),
    /// Selection made from a run of labeled intervals
    WordRange {
        track: String,
        interval: Interval,
        words: Vec<String>,
    },
    Saved { path: PathBuf, intervals: usize },
    Error { message: String },
}

impl StatusEvent {
    pub fn error(err: impl std::fmt::Display) -> Self {
        StatusEvent::Error {
            message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StatusEvent::Error { .. })
    }
}

/// Status broadcast over a crossbeam channel
pub struct StatusBus {
    sender: Sender<StatusEvent>,
    receiver: Receiver<StatusEvent>,
    last: Mutex<Option<StatusEvent>>,
}

impl StatusBus {
    /// Create a new bus with bounded capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam::channel::bounded(capacity);
        Self {
            sender,
            receiver,
            last: Mutex::new(None),
        }
    }

    pub fn sender(&self) -> Sender<StatusEvent> {
        self.sender.clone()
    }

    pub fn subscribe(&self) -> Receiver<StatusEvent> {
        self.receiver.clone()
    }

    /// Publish an event and remember it as the last known state
    ///
    /// When the channel is full the oldest pending event is dropped so
    /// commands never block on a slow consumer.
    pub fn publish(&self, event: StatusEvent) -> Result<(), SendError<StatusEvent>> {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(event.clone());
        }
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(crossbeam::channel::TrySendError::Full(event)) => {
                if let Ok(dropped) = self.receiver.try_recv() {
                    log::debug!("Status channel full, dropped {:?}", dropped);
                }
                self.sender.try_send(event).map_err(|e| SendError(e.into_inner()))
            }
            Err(crossbeam::channel::TrySendError::Disconnected(event)) => Err(SendError(event)),
        }
    }

    /// Most recently published event
    pub fn last(&self) -> Option<StatusEvent> {
        self.last.lock().ok().and_then(|last| last.clone())
    }

    /// Drain everything currently queued
    pub fn drain(&self) -> Vec<StatusEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
