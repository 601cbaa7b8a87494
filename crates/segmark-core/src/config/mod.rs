//! Editor configuration
//!
//! Stored as YAML. Default location: `<config dir>/segmark/config.yaml`.
//! Every section is `#[serde(default)]`, so partial files are fine.

mod io;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{SamplePos, FALLBACK_SAMPLE_RATE, RENDER_BLOCKS_PER_SECOND};

pub use io::{load_config, save_config};

/// Default config file path
///
/// Returns: `<config dir>/segmark/config.yaml`, or `./config.yaml` when the
/// platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("segmark"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.yaml")
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub display: DisplayConfig,
    pub audio: AudioConfig,
    pub snap: SnapConfig,
    pub tracks: TrackConfig,
}

/// Page layout and waveform drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Min/max blocks per second of audio in the render samples
    pub render_blocks_per_second: u32,
    /// Initial page duration
    pub page_seconds: f64,
    /// Smallest page duration (never below 10 samples)
    pub min_page_seconds: f64,
    /// Page duration change per grow/shrink command
    pub page_step_seconds: f64,
    /// Canvas width of one page in pixels
    pub canvas_width: u32,
    pub device_pixel_ratio: f64,
    pub waveform_gain: f32,
    pub gain_step: f32,
    pub min_gain: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            render_blocks_per_second: RENDER_BLOCKS_PER_SECOND,
            page_seconds: 1.0,
            min_page_seconds: 0.01,
            page_step_seconds: 0.1,
            canvas_width: 1600,
            device_pixel_ratio: 1.0,
            waveform_gain: 1.0,
            gain_step: 10.0,
            min_gain: 0.1,
        }
    }
}

impl DisplayConfig {
    /// Initial page size in samples
    pub fn page_size(&self, sample_rate: u32) -> SamplePos {
        ((self.page_seconds * sample_rate as f64).round() as SamplePos).max(self.min_page_size(sample_rate))
    }

    /// Smallest allowed page size in samples
    pub fn min_page_size(&self, sample_rate: u32) -> SamplePos {
        ((self.min_page_seconds * sample_rate as f64).round() as SamplePos).max(10)
    }

    /// Page size change per step in samples
    pub fn page_step(&self, sample_rate: u32) -> SamplePos {
        ((self.page_step_seconds * sample_rate as f64).round() as SamplePos).max(1)
    }
}

/// Audio defaults and playback timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate assumed before any audio is decoded
    pub fallback_sample_rate: u32,
    /// Cursor update period while playing
    pub cursor_period_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fallback_sample_rate: FALLBACK_SAMPLE_RATE,
            cursor_period_ms: 5,
        }
    }
}

/// Zero-crossing and glottal snapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Zero-crossing search radius
    pub search_seconds: f64,
    /// Lower bound on the search radius in samples
    pub min_search_samples: usize,
    /// f0 assumed when no voiced pitch frame is near
    pub glottal_fallback_hz: f64,
    /// Pitch frames searched on each side of the midpoint
    pub glottal_search_frames: usize,
    /// Periods in the glottal target window
    pub glottal_periods: u32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            search_seconds: 0.5,
            min_search_samples: 1000,
            glottal_fallback_hz: 120.0,
            glottal_search_frames: 50,
            glottal_periods: 32,
        }
    }
}

impl SnapConfig {
    /// Search radius in samples for a file of `len` samples
    pub fn search_radius(&self, sample_rate: u32, len: usize) -> usize {
        let wanted = ((sample_rate as f64 * self.search_seconds).floor() as usize).max(self.min_search_samples);
        wanted.min(len.saturating_sub(2))
    }
}

/// Track names and export defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Name of the only track mark/unmark may change
    pub mutable_track: String,
    /// Repeat count for the looped export
    pub export_loop_count: u32,
    /// Pitch hop assumed when the sidecar has none
    pub default_pitch_hop_seconds: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            mutable_track: String::from("conversations"),
            export_loop_count: 16,
            default_pitch_hop_seconds: 0.005,
        }
    }
}
