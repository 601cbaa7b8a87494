//! Derived drawing state of one page

use serde::Serialize;

use crate::coords::{CoordinateMapper, PixelSpan};
use crate::peaks::RenderSamples;
use crate::pitch::PitchTrack;
use crate::tracks::TrackSet;
use crate::types::{Interval, SamplePos};

/// One min/max column of the waveform, amplitudes in `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveColumn {
    pub x: f32,
    pub width: f32,
    /// Extent below the axis
    pub low: f32,
    /// Extent above the axis
    pub high: f32,
}

/// A labeled or unlabeled interval drawn on a track lane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneSpan {
    pub interval: Interval,
    pub pixels: PixelSpan,
    pub label: Option<String>,
    /// Intersects the current selection
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackLane {
    pub track: String,
    pub spans: Vec<LaneSpan>,
}

/// Voiced pitch frame bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchBar {
    pub pixels: PixelSpan,
    /// `value / max`, in `[0, 1]`
    pub height: f32,
    pub opacity: f32,
}

/// Everything needed to draw page `page`
///
/// Two equal frames draw identically, which is how the page cache skips
/// redundant redraws.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFrame {
    pub page: usize,
    pub interval: Interval,
    pub width: u32,
    pub columns: Vec<WaveColumn>,
    pub selection: Option<PixelSpan>,
    pub cursor: Option<u32>,
    pub lanes: Vec<TrackLane>,
    pub pitch: Vec<PitchBar>,
}

/// Session state a page frame is derived from
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub mapper: CoordinateMapper,
    pub width: u32,
    pub gain: f32,
    pub total_samples: SamplePos,
    pub samples: &'a RenderSamples,
    pub selection: Option<Interval>,
    pub cursor: Option<f64>,
    pub tracks: &'a TrackSet,
    pub pitch: Option<&'a PitchTrack>,
}

impl RenderContext<'_> {
    /// Pages needed for the whole timeline
    pub fn page_count(&self) -> usize {
        self.mapper.page_count(self.total_samples)
    }

    pub fn frame(&self, page: usize) -> PageFrame {
        let interval = self.mapper.page_interval(page);
        PageFrame {
            page,
            interval,
            width: self.width,
            columns: self.columns(interval),
            selection: self
                .selection
                .and_then(|sel| self.mapper.interval_to_pixels(sel, page, self.width)),
            cursor: self
                .cursor
                .and_then(|pos| self.mapper.sample_to_pixel(pos, page, self.width)),
            lanes: self.lanes(page, interval),
            pitch: self.pitch_bars(page, interval),
        }
    }

    fn columns(&self, interval: Interval) -> Vec<WaveColumn> {
        let pairs = (self.mapper.render_per_page() / 2).max(1);
        let width = self.width as f32 / pairs as f32;
        let gain = self.gain;
        self.samples
            .slice(self.mapper.render_slice(interval))
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| WaveColumn {
                x: i as f32 * width,
                width,
                low: (pair[0].abs() * gain).min(1.0),
                high: pair.get(1).map_or(0.0, |s| (s.abs() * gain).min(1.0)),
            })
            .collect()
    }

    fn lanes(&self, page: usize, interval: Interval) -> Vec<TrackLane> {
        self.tracks
            .iter()
            .map(|track| TrackLane {
                track: track.name.clone(),
                spans: track
                    .intervals
                    .intersect(interval)
                    .iter()
                    .filter_map(|entry| {
                        let pixels = self.mapper.interval_to_pixels(entry.interval, page, self.width)?;
                        Some(LaneSpan {
                            interval: entry.interval,
                            pixels,
                            label: entry.name.clone(),
                            highlighted: self.selection.map_or(false, |sel| sel.overlaps(&entry.interval)),
                        })
                    })
                    .collect(),
            })
            .collect()
    }

    fn pitch_bars(&self, page: usize, interval: Interval) -> Vec<PitchBar> {
        let Some(pitch) = self.pitch else {
            return Vec::new();
        };
        let frames = pitch.frames_between(interval.start as f64, interval.end as f64);
        frames
            .filter_map(|i| {
                let v = pitch.values[i];
                if v <= 0.0 {
                    return None;
                }
                let start = i as f64 * pitch.hop;
                let span = Interval::spanning(start.floor() as SamplePos, (start + pitch.hop).ceil() as SamplePos);
                let mut pixels = self.mapper.interval_to_pixels(span, page, self.width)?;
                if pixels.x1 == pixels.x0 {
                    pixels.x1 += 1;
                }
                let opacity = pitch
                    .periodicity
                    .as_ref()
                    .and_then(|p| p.get(i))
                    .map_or(1.0, |p| (p + 0.1).clamp(0.0, 1.0));
                Some(PitchBar {
                    pixels,
                    height: (v / pitch.max).min(1.0),
                    opacity,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::LabeledTrack;
    use crate::interval::NamedInterval;
    use crate::pitch::PitchSidecar;

    fn iv(a: i64, b: i64) -> Interval {
        Interval::new(a, b).unwrap()
    }

    #[test]
    fn test_frame_contents() {
        // 100Hz audio, 10 blocks per second: 20 render samples per page of 100
        let mapper = CoordinateMapper::new(100, 10, 100);
        let samples = RenderSamples::from_buffers(
            [&crate::decode::DecodedBuffer::mono(100, (0..200).map(|i| if i < 100 { 0.25 } else { -0.75 }).collect())],
            10,
        );
        let mut tracks = TrackSet::with_mutable("conversations");
        let (words, _) = LabeledTrack::from_entries(vec![
            NamedInterval::named(iv(0, 49), "hello"),
            NamedInterval::named(iv(50, 149), "world"),
        ]);
        tracks.add_read_only("words_a", words);
        let sidecar: PitchSidecar = serde_json::from_str(r#"{"hop":0.5,"values":[100,0,200,50],"periodicity":[0.95,0,0.2,0.5]}"#).unwrap();
        let pitch = PitchTrack::from_sidecar(&sidecar, 100, 0.005).unwrap();

        let ctx = RenderContext {
            mapper,
            width: 100,
            gain: 2.0,
            total_samples: 200,
            samples: &samples,
            selection: Some(iv(60, 80)),
            cursor: Some(25.0),
            tracks: &tracks,
            pitch: Some(&pitch),
        };
        assert_eq!(ctx.page_count(), 2);

        let frame = ctx.frame(0);
        assert_eq!(frame.columns.len(), 10);
        assert_eq!(frame.columns[1].x, 10.0);
        assert_eq!(frame.columns[0].high, 0.5);
        assert_eq!(frame.selection, Some(PixelSpan { x0: 60, x1: 80 }));
        assert_eq!(frame.cursor, Some(25));

        let words = &frame.lanes[1];
        assert_eq!(words.track, "words_a");
        assert_eq!(words.spans.len(), 2);
        assert!(!words.spans[0].highlighted);
        assert!(words.spans[1].highlighted);
        assert_eq!(words.spans[1].pixels, PixelSpan { x0: 50, x1: 100 });

        // frame 0 is voiced, frame 1 is not
        assert_eq!(frame.pitch.len(), 1);
        assert_eq!(frame.pitch[0].height, 0.5);
        assert_eq!(frame.pitch[0].opacity, 1.0);

        let second = ctx.frame(1);
        assert_eq!(second.columns[0].high, 1.0);
        assert_eq!(second.cursor, None);
        assert_eq!(second.pitch.len(), 2);
    }
}
