//! Pitch sidecar loading and period estimation

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{Interval, SamplePos};

/// Raw pitch sidecar as stored next to the audio
///
/// Values may be numbers or numeric strings; anything unparseable counts as
/// unvoiced (0).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PitchSidecar {
    /// Frame hop in seconds
    pub hop: Option<f64>,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
    pub periodicity: Option<Vec<serde_json::Value>>,
}

impl PitchSidecar {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pitch sidecar: {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid pitch sidecar: {:?}", path))
    }
}

fn as_f32(value: &serde_json::Value) -> f32 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0) as f32,
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Pitch contour with its hop converted to samples
#[derive(Debug, Clone, PartialEq)]
pub struct PitchTrack {
    pub values: Vec<f32>,
    /// Frame hop in samples
    pub hop: f64,
    pub periodicity: Option<Vec<f32>>,
    /// Largest value, 1 when nothing is voiced
    pub max: f32,
}

/// Pitch frame under a clicked sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchFrame {
    pub index: usize,
    pub interval: Interval,
    pub pitch: Option<f32>,
    pub periodicity: Option<f32>,
}

impl PitchTrack {
    /// Convert a sidecar using the live sample rate; `None` without values
    pub fn from_sidecar(sidecar: &PitchSidecar, sample_rate: u32, default_hop_seconds: f64) -> Option<Self> {
        if sidecar.values.is_empty() {
            return None;
        }

        let hop_seconds = sidecar.hop.filter(|h| *h > 0.0).unwrap_or(default_hop_seconds);
        let values: Vec<f32> = sidecar.values.iter().map(as_f32).collect();
        let periodicity = sidecar
            .periodicity
            .as_ref()
            .map(|p| p.iter().map(as_f32).collect());
        let max = values.iter().copied().fold(0.0f32, f32::max);

        Some(Self {
            values,
            // frame lookups divide by the hop
            hop: (hop_seconds * sample_rate as f64).max(1.0),
            periodicity,
            max: if max > 0.0 { max } else { 1.0 },
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Frame containing a global sample position
    pub fn frame_at(&self, sample: f64) -> PitchFrame {
        let index = (sample / self.hop).floor().max(0.0) as usize;
        let start = index as f64 * self.hop;
        let end = (index + 1) as f64 * self.hop - 1.0;
        PitchFrame {
            index,
            interval: Interval::spanning(start.round() as SamplePos, end.round() as SamplePos),
            pitch: self.values.get(index).copied(),
            periodicity: self
                .periodicity
                .as_ref()
                .and_then(|p| p.get(index))
                .map(|v| (v * 1000.0).round() / 1000.0),
        }
    }

    /// Frames overlapping `[start, end)` as an index range
    pub fn frames_between(&self, start: f64, end: f64) -> std::ops::Range<usize> {
        let first = (start / self.hop).floor().max(0.0) as usize;
        let last = ((end / self.hop).ceil().max(0.0) as usize).min(self.values.len());
        first.min(last)..last
    }

    /// Nearest voiced f0 to a position, searching outward up to `radius` frames
    pub fn nearest_voiced(&self, sample: f64, radius: usize) -> Option<f32> {
        let center = (sample / self.hop).round() as i64;
        for r in 0..=radius as i64 {
            for idx in [center - r, center + r] {
                if idx < 0 {
                    continue;
                }
                match self.values.get(idx as usize) {
                    Some(&f0) if f0 > 0.0 => return Some(f0),
                    _ => {}
                }
            }
        }
        None
    }
}

/// Local glottal period in samples around a position
///
/// Uses the nearest voiced pitch frame within `radius` frames, or
/// `fallback_hz` when there is no pitch track or nothing voiced nearby.
pub fn estimate_period(
    pitch: Option<&PitchTrack>,
    sample: f64,
    sample_rate: u32,
    radius: usize,
    fallback_hz: f64,
) -> f64 {
    let f0 = pitch
        .and_then(|p| p.nearest_voiced(sample, radius))
        .map(f64::from)
        .unwrap_or(fallback_hz);
    sample_rate as f64 / f0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sidecar(json: &str) -> PitchSidecar {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_from_sidecar_converts_hop() {
        let track = PitchTrack::from_sidecar(
            &sidecar(r#"{"hop":0.01,"values":[0,"200",100.5,"x"],"periodicity":[0.1,0.9,0.5,0]}"#),
            16000,
            0.005,
        )
        .unwrap();
        assert_eq!(track.hop, 160.0);
        assert_eq!(track.values, vec![0.0, 200.0, 100.5, 0.0]);
        assert_eq!(track.max, 200.0);
    }

    #[test]
    fn test_empty_sidecar_is_none() {
        assert!(PitchTrack::from_sidecar(&sidecar(r#"{"values":[]}"#), 16000, 0.005).is_none());
    }

    #[test]
    fn test_default_hop_and_unvoiced_max() {
        let track = PitchTrack::from_sidecar(&sidecar(r#"{"values":[0,0]}"#), 16000, 0.005).unwrap();
        assert_eq!(track.hop, 80.0);
        assert_eq!(track.max, 1.0);
    }

    #[test]
    fn test_zero_hop_is_clamped() {
        let track = PitchTrack::from_sidecar(&sidecar(r#"{"values":[0,0]}"#), 16000, 0.0).unwrap();
        assert_eq!(track.hop, 1.0);
        let frame = track.frame_at(10.0);
        assert_eq!(frame.index, 10);
        assert_eq!(frame.pitch, None);
        assert_eq!(track.frames_between(0.0, 100.0), 0..2);
    }

    #[test]
    fn test_frame_at() {
        let track = PitchTrack::from_sidecar(
            &sidecar(r#"{"hop":0.01,"values":[0,200],"periodicity":[0.1234,0.98765]}"#),
            16000,
            0.005,
        )
        .unwrap();
        let frame = track.frame_at(170.0);
        assert_eq!(frame.index, 1);
        assert_eq!(frame.interval, Interval::new(160, 319).unwrap());
        assert_eq!(frame.pitch, Some(200.0));
        assert_eq!(frame.periodicity, Some(0.988));
    }

    #[test]
    fn test_estimate_period_searches_outward() {
        let track = PitchTrack::from_sidecar(
            &sidecar(r#"{"hop":0.01,"values":[0,0,0,0,0,0,0,0,0,250]}"#),
            16000,
            0.005,
        )
        .unwrap();
        // frame 9 is four frames away from frame 5
        let period = estimate_period(Some(&track), 5.0 * 160.0, 16000, 50, 120.0);
        assert!((period - 64.0).abs() < 1e-9);

        let too_far = estimate_period(Some(&track), 0.0, 16000, 3, 120.0);
        assert!((too_far - 16000.0 / 120.0).abs() < 1e-9);

        let none = estimate_period(None, 0.0, 16000, 50, 120.0);
        assert!((none - 16000.0 / 120.0).abs() < 1e-9);
    }
}
