//! Labeled interval tracks and their on-disk formats
//!
//! Track data arrives in seconds (`{interval: [start, end], name, ...}`) and
//! is converted on load to closed sample-domain intervals
//! `[round(start * rate), round(end * rate) - 1]`. Only the mutable track
//! accepts mark/clear commands; word tracks are read-only.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::TrackError;
use crate::interval::{LabeledTrack, NamedInterval};
use crate::types::{Interval, SamplePos};

/// One entry of a track data file, in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct TrackEntry {
    pub interval: Option<[f64; 2]>,
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TrackEntry {
    /// Convert to samples; `None` when the interval is missing or inverted
    pub fn to_named(&self, sample_rate: u32) -> Option<NamedInterval> {
        let [start, end] = self.interval?;
        let rate = sample_rate as f64;
        let a = (start * rate).round() as SamplePos;
        let b = (end * rate).round() as SamplePos - 1;
        Some(NamedInterval {
            interval: Interval::new(a, b)?,
            name: self.name.clone(),
            extra: self.extra.clone(),
        })
    }
}

/// Build a track from entries in seconds
///
/// Invalid and overlapping entries are skipped with a warning.
pub fn track_from_entries(entries: &[TrackEntry], sample_rate: u32) -> LabeledTrack {
    let named = entries.iter().filter_map(|e| {
        let converted = e.to_named(sample_rate);
        if converted.is_none() {
            log::warn!("Skipping track entry without a valid interval: {:?}", e.name);
        }
        converted
    });
    let (track, rejected) = LabeledTrack::from_entries(named);
    for entry in rejected {
        log::warn!("Skipping overlapping track entry {} {:?}", entry.interval, entry.name);
    }
    track
}

/// Load a track data file (JSON array of entries in seconds)
pub fn load_track_entries(path: &Path) -> Result<Vec<TrackEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read track data: {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid track data: {:?}", path))
}

/// A named track and whether commands may mutate it
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub mutable: bool,
    pub intervals: LabeledTrack,
}

/// All tracks of a session, in display order
#[derive(Debug, Clone, Default)]
pub struct TrackSet {
    tracks: Vec<Track>,
}

impl TrackSet {
    /// Empty set holding only the mutable track
    pub fn with_mutable(name: impl Into<String>) -> Self {
        Self {
            tracks: vec![Track {
                name: name.into(),
                mutable: true,
                intervals: LabeledTrack::new(),
            }],
        }
    }

    /// Add a read-only track (replacing any track of the same name)
    pub fn add_read_only(&mut self, name: impl Into<String>, intervals: LabeledTrack) {
        let name = name.into();
        self.tracks.retain(|t| t.name != name);
        self.tracks.push(Track {
            name,
            mutable: false,
            intervals,
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    /// Mutable access to a writable track
    pub fn writable(&mut self, name: &str) -> Result<&mut LabeledTrack, TrackError> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| TrackError::UnknownTrack(name.to_string()))?;
        if !track.mutable {
            return Err(TrackError::ReadOnlyTrack(name.to_string()));
        }
        Ok(&mut track.intervals)
    }

    /// Write a track's intervals as JSON spans
    pub fn save_track(&self, name: &str, path: &Path) -> Result<()> {
        let track = self
            .get(name)
            .ok_or_else(|| TrackError::UnknownTrack(name.to_string()))?;
        let json = serde_json::to_string_pretty(track.intervals.items())
            .context("Failed to serialize track")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        std::fs::write(path, json).with_context(|| format!("Failed to write spans: {:?}", path))?;
        log::info!("Saved {} interval(s) of {} to {:?}", track.intervals.len(), name, path);
        Ok(())
    }

    /// Replace a writable track's contents with saved JSON spans
    ///
    /// A missing file loads as an empty track.
    pub fn load_track(&mut self, name: &str, path: &Path) -> Result<usize> {
        let entries: Vec<NamedInterval> = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read spans: {:?}", path))?;
            serde_json::from_str(&text).with_context(|| format!("Invalid spans: {:?}", path))?
        } else {
            Vec::new()
        };
        let (loaded, rejected) = LabeledTrack::from_entries(entries);
        if !rejected.is_empty() {
            log::warn!("Dropped {} overlapping span(s) from {:?}", rejected.len(), path);
        }
        let count = loaded.len();
        *self.writable(name)? = loaded;
        Ok(count)
    }
}

/// Session manifest: sources, word tracks and optional pitch sidecar
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Source files, temporally contiguous when concatenated
    pub filelist: Vec<String>,
    #[serde(default, alias = "tracksAndWords")]
    pub tracks: Vec<ManifestTrack>,
    #[serde(default)]
    pub pitch: Option<ManifestPitch>,
    /// Saved spans for the mutable track
    #[serde(default)]
    pub spans: Option<String>,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestTrack {
    pub speaker: String,
    pub words: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestPitch {
    pub url: String,
}

impl Manifest {
    /// Load a manifest; relative paths resolve against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {:?}", path))?;
        let mut manifest: Manifest =
            serde_json::from_str(&text).with_context(|| format!("Invalid manifest: {:?}", path))?;
        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(manifest)
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }
}

/// Track name used for a speaker's words
pub fn word_track_name(speaker: &str) -> String {
    format!("words_{}", speaker)
}
