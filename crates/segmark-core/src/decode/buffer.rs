//! Decoded audio buffers

/// Fully decoded audio, one `Vec<f32>` per channel
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedBuffer {
    /// Single-channel buffer
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    /// Split interleaved samples into per-channel vectors
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, interleaved: &[f32]) -> Self {
        let channel_count = channel_count.max(1);
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (ch, &sample) in frame.iter().enumerate() {
                channels[ch].push(sample);
            }
        }
        Self {
            sample_rate,
            channels,
        }
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples of one channel (empty slice when out of range)
    pub fn channel(&self, index: usize) -> &[f32] {
        self.channels.get(index).map_or(&[], Vec::as_slice)
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interleaved() {
        let buf = DecodedBuffer::from_interleaved(8000, 2, &[0.1, -0.1, 0.2, -0.2, 0.3, -0.3]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.channel(0), &[0.1, 0.2, 0.3]);
        assert_eq!(buf.channel(1), &[-0.1, -0.2, -0.3]);
        assert!(buf.channel(2).is_empty());
    }

    #[test]
    fn test_duration() {
        let buf = DecodedBuffer::mono(16000, vec![0.0; 8000]);
        assert!((buf.duration_seconds() - 0.5).abs() < 1e-9);
    }
}
