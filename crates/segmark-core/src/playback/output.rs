//! Audio output seam

use std::sync::Arc;

use crate::error::PlaybackError;

/// Audio handed to the output device for one playback
#[derive(Debug, Clone)]
pub struct Voice {
    /// Stitched mono samples of every file the interval touches
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
    /// First sample to play, local to `samples`
    pub start: usize,
    /// One past the last sample (loop end when looping)
    pub end: usize,
    pub looped: bool,
}

impl Voice {
    pub fn duration_samples(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// Output device that plays at most one voice at a time
pub trait AudioOutput: Send {
    /// Start playing `voice`, replacing whatever was playing
    fn start(&mut self, voice: Voice) -> Result<(), PlaybackError>;

    fn stop(&mut self);
}

/// Output that discards audio, for headless hosts
#[derive(Debug, Default)]
pub struct NullOutput {
    active: Option<Voice>,
}

impl NullOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Voice> {
        self.active.as_ref()
    }
}

impl AudioOutput for NullOutput {
    fn start(&mut self, voice: Voice) -> Result<(), PlaybackError> {
        log::debug!(
            "NullOutput: start {} sample(s) at {}Hz (loop: {})",
            voice.duration_samples(),
            voice.sample_rate,
            voice.looped
        );
        self.active = Some(voice);
        Ok(())
    }

    fn stop(&mut self) {
        if self.active.take().is_some() {
            log::debug!("NullOutput: stop");
        }
    }
}
