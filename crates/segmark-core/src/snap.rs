//! Selection refinement to acoustic boundaries
//!
//! Zero-crossing snap moves each endpoint to the nearest point where the
//! waveform crosses zero, interpolated between adjacent samples. Glottal snap
//! builds a window of whole pitch periods around the selection midpoint and
//! zero-snaps its endpoints, which gives seamless loops on voiced speech.

use std::sync::Arc;

use crate::config::SnapConfig;
use crate::decode::DecodedBuffer;
use crate::error::{CoverageError, SelectionError, SnapError};
use crate::interval::{FileSpan, FileSpans};
use crate::pitch::{estimate_period, PitchTrack};
use crate::types::{Interval, SamplePos};

/// Index of the file containing `time`, or the closest file when none does
pub fn choose_file_index(time: f64, files: &[FileSpan]) -> Option<usize> {
    if files.is_empty() {
        return None;
    }
    let containing = files.partition_point(|f| (f.interval.start as f64) <= time);
    if containing > 0 && time <= files[containing - 1].interval.end as f64 {
        return Some(containing - 1);
    }

    let distance = |f: &FileSpan| {
        if time < f.interval.start as f64 {
            f.interval.start as f64 - time
        } else {
            time - f.interval.end as f64
        }
    };
    let mut best = 0;
    for (i, file) in files.iter().enumerate().skip(1) {
        if distance(file) < distance(&files[best]) {
            best = i;
        }
    }
    Some(best)
}

/// Nearest zero crossing to a local position in `pcm`
///
/// A crossing is an exact zero sample or a sign change between neighbours,
/// placed by linear interpolation. Without any crossing within `max_search`
/// samples, falls back to the smallest-magnitude sample in that range (the
/// nearest one on ties).
pub fn nearest_zero_local(pcm: &[f32], local: f64, max_search: usize) -> f64 {
    if pcm.len() < 2 {
        return local;
    }
    let idx = (local.round().max(0.0) as usize).min(pcm.len() - 1);
    let start = idx.saturating_sub(max_search);
    let end = (idx + max_search).min(pcm.len() - 2);
    let target = idx as f64;

    let mut best: Option<(f64, f64)> = None;
    for i in start..=end {
        let (a, b) = (pcm[i], pcm[i + 1]);
        let crosses = a == 0.0 || b == 0.0 || (a > 0.0 && b < 0.0) || (a < 0.0 && b > 0.0);
        if !crosses {
            continue;
        }
        let frac = if a == b { 0.0 } else { (a / (a - b)) as f64 };
        let pos = i as f64 + frac.clamp(0.0, 1.0);
        let dist = (pos - target).abs();
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((pos, dist));
            if dist == 0.0 {
                break;
            }
        }
    }
    if let Some((pos, _)) = best {
        return pos;
    }

    let last = (idx + max_search).min(pcm.len() - 1);
    (start..=last)
        .min_by(|&x, &y| {
            pcm[x]
                .abs()
                .total_cmp(&pcm[y].abs())
                .then(x.abs_diff(idx).cmp(&y.abs_diff(idx)))
        })
        .map_or(target, |i| i as f64)
}

/// Validate a selection for snapping and find the files it touches
pub fn covered_files(selection: Option<Interval>, files: &FileSpans) -> Result<(Interval, Vec<FileSpan>), SnapError> {
    let interval = SelectionError::check(selection)?;
    let touched = files.intersect(interval);
    if touched.is_empty() {
        return Err(CoverageError { interval }.into());
    }
    Ok((interval, touched.to_vec()))
}

/// Zero-crossing and glottal-period refinement
#[derive(Debug, Clone, Default)]
pub struct SnapEngine {
    config: SnapConfig,
}

impl SnapEngine {
    pub fn new(config: SnapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// Nearest zero crossing to a global position
    ///
    /// `buffers[i]` is the decoded audio of `files[i]`. Returns `time`
    /// unchanged when there is no usable audio.
    pub fn nearest_zero(&self, time: f64, files: &[FileSpan], buffers: &[Arc<DecodedBuffer>]) -> f64 {
        let Some(fi) = choose_file_index(time, files) else {
            return time;
        };
        let (Some(file), Some(buffer)) = (files.get(fi), buffers.get(fi)) else {
            return time;
        };
        let pcm = buffer.channel(0);
        if pcm.is_empty() {
            return time;
        }
        let max_search = self.config.search_radius(buffer.sample_rate, pcm.len());
        file.global_offset as f64 + nearest_zero_local(pcm, file.to_local(time), max_search)
    }

    fn snap_pair(&self, a: f64, b: f64, files: &[FileSpan], buffers: &[Arc<DecodedBuffer>]) -> Interval {
        let a = self.nearest_zero(a, files, buffers);
        let b = self.nearest_zero(b, files, buffers);
        Interval::spanning(a.round() as SamplePos, b.round() as SamplePos)
    }

    /// Snap both endpoints of `interval` to their nearest zero crossings
    pub fn zero_crossing(
        &self,
        interval: Interval,
        files: &[FileSpan],
        buffers: &[Arc<DecodedBuffer>],
    ) -> Result<Interval, SnapError> {
        let snapped = self.snap_pair(interval.start as f64, interval.end as f64, files, buffers);
        Ok(SelectionError::check(Some(snapped))?)
    }

    /// Target window of whole periods centered on the selection midpoint
    ///
    /// Returns `(start, end, period)` with fractional endpoints.
    pub fn glottal_target(&self, interval: Interval, pitch: Option<&PitchTrack>, sample_rate: u32) -> (f64, f64, f64) {
        let center = interval.center();
        let period = estimate_period(
            pitch,
            center,
            sample_rate,
            self.config.glottal_search_frames,
            self.config.glottal_fallback_hz,
        );
        let half = self.config.glottal_periods as f64 * period / 2.0;
        (center - half, center + half, period)
    }

    /// Zero-snap the endpoints of a glottal target window
    ///
    /// `files` and `buffers` must cover the target window (see
    /// [`glottal_target`](Self::glottal_target)).
    pub fn glottal(
        &self,
        target: (f64, f64),
        files: &[FileSpan],
        buffers: &[Arc<DecodedBuffer>],
    ) -> Result<Interval, SnapError> {
        let snapped = self.snap_pair(target.0, target.1, files, buffers);
        Ok(SelectionError::check(Some(snapped))?)
    }
}

/// Interval touched by a fractional window, for looking up its files
pub fn window_interval(start: f64, end: f64) -> Interval {
    Interval::spanning(start.floor() as SamplePos, end.ceil() as SamplePos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::layout_files;
    use crate::pitch::PitchSidecar;

    fn sine(len: usize, period: f64) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * (i as f64 + 0.25) / period).sin() as f32)
            .collect()
    }

    #[test]
    fn test_choose_file_index() {
        let files = layout_files(vec![("a", 100), ("b", 100)]);
        assert_eq!(choose_file_index(50.0, &files), Some(0));
        assert_eq!(choose_file_index(99.0, &files), Some(0));
        assert_eq!(choose_file_index(100.0, &files), Some(1));
        assert_eq!(choose_file_index(99.5, &files), Some(0));
        assert_eq!(choose_file_index(-20.0, &files), Some(0));
        assert_eq!(choose_file_index(500.0, &files), Some(1));
        assert_eq!(choose_file_index(0.0, &[]), None);
    }

    #[test]
    fn test_interpolated_crossing() {
        let pcm = [0.5, 0.25, -0.75, -1.0];
        // crossing between 1 and 2 at 1 + 0.25 / 1.0
        assert_eq!(nearest_zero_local(&pcm, 0.0, 10), 1.25);
    }

    #[test]
    fn test_exact_zero_sample() {
        let pcm = [0.3, 0.2, 0.0, 0.4, 0.5];
        assert_eq!(nearest_zero_local(&pcm, 4.0, 10), 2.0);
    }

    #[test]
    fn test_fallback_smallest_magnitude() {
        let pcm = [0.9, 0.5, 0.05, 0.4, 0.05, 0.8];
        // no crossing: index 2 and 4 tie on magnitude, 4 is nearer to 5
        assert_eq!(nearest_zero_local(&pcm, 5.0, 10), 4.0);
        // search range too small to reach any 0.05
        assert_eq!(nearest_zero_local(&pcm, 0.0, 1), 1.0);
    }

    #[test]
    fn test_zero_snap_is_idempotent_on_sine() {
        let pcm = sine(4000, 100.0);
        let files = layout_files(vec![("a", pcm.len())]);
        let buffers = vec![Arc::new(DecodedBuffer::mono(8000, pcm))];
        let engine = SnapEngine::default();

        let first = engine
            .zero_crossing(Interval::new(410, 1630).unwrap(), &files, &buffers)
            .unwrap();
        let second = engine.zero_crossing(first, &files, &buffers).unwrap();
        assert_eq!(first, second);
        // crossings of this sine sit half a period apart, shifted by 0.25 samples
        assert_eq!(first.start % 50, 0);
        assert_eq!(first.end % 50, 0);
    }

    #[test]
    fn test_snap_across_files() {
        let files = layout_files(vec![("a", 100), ("b", 100)]);
        let mut left = vec![1.0f32; 100];
        left[10] = 0.0;
        let mut right = vec![1.0f32; 100];
        right[90] = 0.0;
        let buffers = vec![
            Arc::new(DecodedBuffer::mono(100, left)),
            Arc::new(DecodedBuffer::mono(100, right)),
        ];
        let engine = SnapEngine::new(SnapConfig {
            min_search_samples: 20,
            search_seconds: 0.0,
            ..SnapConfig::default()
        });
        let snapped = engine
            .zero_crossing(Interval::new(5, 185).unwrap(), &files, &buffers)
            .unwrap();
        assert_eq!(snapped, Interval::new(10, 190).unwrap());
    }

    #[test]
    fn test_covered_files_errors() {
        let (files, _) = FileSpans::from_entries(layout_files(vec![("a", 100)]));
        assert!(matches!(covered_files(None, &files), Err(SnapError::Selection(_))));
        assert!(matches!(
            covered_files(Some(Interval::point(5)), &files),
            Err(SnapError::Selection(SelectionError::Degenerate { .. }))
        ));
        assert!(matches!(
            covered_files(Interval::new(200, 300), &files),
            Err(SnapError::Coverage(_))
        ));
        let (iv, touched) = covered_files(Interval::new(50, 300), &files).unwrap();
        assert_eq!(iv, Interval::new(50, 300).unwrap());
        assert_eq!(touched.len(), 1);
    }

    #[test]
    fn test_glottal_target_uses_pitch() {
        let sidecar: PitchSidecar = serde_json::from_str(r#"{"hop":0.01,"values":[200,200,200]}"#).unwrap();
        let pitch = PitchTrack::from_sidecar(&sidecar, 16000, 0.005).unwrap();
        let engine = SnapEngine::default();
        let (start, end, period) = engine.glottal_target(Interval::new(100, 300).unwrap(), Some(&pitch), 16000);
        assert_eq!(period, 80.0);
        assert_eq!(end - start, 32.0 * 80.0);
        assert_eq!((start + end) / 2.0, 200.0);

        let (_, _, fallback) = engine.glottal_target(Interval::new(100, 300).unwrap(), None, 12000);
        assert_eq!(fallback, 100.0);
    }

    #[test]
    fn test_glottal_snap_lands_on_crossings() {
        let pcm = sine(16000, 80.0);
        let files = layout_files(vec![("a", pcm.len())]);
        let buffers = vec![Arc::new(DecodedBuffer::mono(16000, pcm))];
        let engine = SnapEngine::default();
        let (start, end, _) = engine.glottal_target(Interval::new(4000, 6000).unwrap(), None, 16000);
        let snapped = engine.glottal((start, end), &files, &buffers).unwrap();
        assert_eq!(snapped.start % 40, 0);
        assert_eq!(snapped.end % 40, 0);
        assert!((snapped.size() as f64 - (end - start)).abs() <= 40.0);
    }
}
