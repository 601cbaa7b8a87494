//! Render-sample generation for waveform display
//!
//! Audio is downsampled into min/max pairs at a fixed number of blocks per
//! second, independent of the source sample rate. The flattened result holds
//! two render samples per block, min first.

use crate::decode::DecodedBuffer;

/// Downsample channel 0 of a buffer into interleaved `[min, max]` pairs
pub fn render_peaks(buffer: &DecodedBuffer, blocks_per_second: u32) -> Vec<f32> {
    let pcm = buffer.channel(0);
    if pcm.is_empty() || buffer.sample_rate == 0 || blocks_per_second == 0 {
        return Vec::new();
    }

    let block_size = buffer.sample_rate as f64 / blocks_per_second as f64;
    let blocks = (pcm.len() as f64 / block_size).ceil() as usize;
    let mut out = Vec::with_capacity(2 * blocks);

    for i in 0..blocks {
        let start = (i as f64 * block_size).floor() as usize;
        let end = (((i + 1) as f64 * block_size).floor() as usize).min(pcm.len());

        let (min, max) = pcm[start.min(end)..end]
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));

        if min == f32::INFINITY {
            out.extend_from_slice(&[0.0, 0.0]);
        } else {
            out.extend_from_slice(&[min, max]);
        }
    }

    out
}

/// Concatenated render samples for the whole timeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderSamples {
    samples: Vec<f32>,
}

impl RenderSamples {
    /// Concatenate per-file peaks in file order
    pub fn from_buffers<'a>(buffers: impl IntoIterator<Item = &'a DecodedBuffer>, blocks_per_second: u32) -> Self {
        let mut samples = Vec::new();
        for buffer in buffers {
            samples.extend(render_peaks(buffer, blocks_per_second));
        }
        log::debug!("Generated {} render samples", samples.len());
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Sub-slice clamped to the available data
    pub fn slice(&self, range: std::ops::Range<usize>) -> &[f32] {
        let end = range.end.min(self.samples.len());
        let start = range.start.min(end);
        &self.samples[start..end]
    }
}
