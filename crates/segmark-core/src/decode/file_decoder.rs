//! Symphonia-backed decoder for source files on disk

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{DecodeService, DecodedBuffer};
use crate::error::DecodeError;

/// Decodes source names resolved against a base directory
#[derive(Debug, Clone)]
pub struct FileDecoder {
    base_dir: PathBuf,
}

impl FileDecoder {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn resolve(&self, source: &str) -> PathBuf {
        self.base_dir.join(source)
    }
}

impl DecodeService for FileDecoder {
    fn decode(&self, source: &str) -> Result<DecodedBuffer, DecodeError> {
        let path = self.resolve(source);
        let buffer = decode_path(&path)?;
        log::debug!(
            "Decoded {:?}: {} samples @ {}Hz, {} channel(s)",
            path,
            buffer.len(),
            buffer.sample_rate,
            buffer.channel_count()
        );
        Ok(buffer)
    }
}

/// Decode an audio file to per-channel f32 samples
pub fn decode_path(path: &Path) -> Result<DecodedBuffer, DecodeError> {
    let file = File::open(path).map_err(|e| DecodeError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::Unsupported("No audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::Malformed("Unknown sample rate".to_string()))?;
    let mut channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet in {:?}: {}", path, e);
                continue;
            }
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            channel_count = spec.channels.count();
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }
    }

    if interleaved.is_empty() {
        return Err(DecodeError::Empty(path.display().to_string()));
    }

    Ok(DecodedBuffer::from_interleaved(sample_rate, channel_count, &interleaved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_wav() {
        let dir = tempfile::tempdir().unwrap();
        let samples: Vec<i16> = (0..800).map(|i| ((i % 100) as i16 - 50) * 200).collect();
        write_wav(&dir.path().join("a.wav"), 8000, &samples);

        let decoder = FileDecoder::new(dir.path());
        let buf = decoder.decode("a.wav").unwrap();
        assert_eq!(buf.sample_rate, 8000);
        assert_eq!(buf.len(), 800);
        let expected = samples[10] as f32 / 32768.0;
        assert!((buf.channel(0)[10] - expected).abs() < 1e-4);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = FileDecoder::new(dir.path());
        assert!(matches!(decoder.decode("nope.wav"), Err(DecodeError::Io { .. })));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("junk.wav"), b"definitely not audio").unwrap();
        let decoder = FileDecoder::new(dir.path());
        assert!(decoder.decode("junk.wav").is_err());
    }
}
