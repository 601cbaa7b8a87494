//! Selection extraction and WAV encoding
//!
//! Exports are mono 16-bit PCM built from channel 0 of each source, written
//! with hound as the canonical 44-byte header plus data.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::decode::DecodedBuffer;
use crate::error::ExportError;
use crate::interval::FileSpan;
use crate::types::Interval;

/// Size of the RIFF/WAVE header written by [`encode_wav`]
pub const WAV_HEADER_LEN: usize = 44;

/// Samples extracted for an interval
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Concatenate, in file order, the part of each buffer overlapping `interval`
///
/// `buffers[i]` is the decoded audio of `files[i]`. The per-file slice is
/// `[floor(start - offset), ceil(end - offset))`. Every overlapping buffer
/// must share the first buffer's sample rate.
pub fn extract(
    interval: Interval,
    files: &[FileSpan],
    buffers: &[Arc<DecodedBuffer>],
) -> Result<ExtractedAudio, ExportError> {
    let sample_rate = buffers.first().ok_or(ExportError::NothingExtracted)?.sample_rate;
    let mut samples = Vec::new();

    for (file, buffer) in files.iter().zip(buffers) {
        let overlap = match file.interval.intersection(&interval) {
            Some(overlap) if !overlap.is_degenerate() => overlap,
            _ => continue,
        };
        if buffer.sample_rate != sample_rate {
            return Err(ExportError::RateMismatch {
                expected: sample_rate,
                found: buffer.sample_rate,
            });
        }
        let pcm = buffer.channel(0);
        let start = (overlap.start - file.global_offset).max(0) as usize;
        let end = ((overlap.end - file.global_offset).max(0) as usize).min(pcm.len());
        if end <= start {
            continue;
        }
        samples.extend_from_slice(&pcm[start..end]);
    }

    if samples.is_empty() {
        return Err(ExportError::NothingExtracted);
    }
    Ok(ExtractedAudio { samples, sample_rate })
}

/// Encode mono 16-bit PCM WAV, writing the sample data `repeat` times
///
/// Input is clamped to `[-1, 1]`; negative values scale by 32768 and
/// positive ones by 32767. Fails with [`ExportError::TooLarge`] when the
/// RIFF size fields cannot hold the result.
pub fn encode_wav(samples: &[f32], sample_rate: u32, repeat: u32) -> Result<Vec<u8>, ExportError> {
    let repeat = repeat.max(1);
    let data_len = riff_data_len(samples.len(), repeat).ok_or(ExportError::TooLarge {
        samples: samples.len(),
        repeat,
    })?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut out = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + data_len as usize));
    let mut writer = hound::WavWriter::new(&mut out, spec)?;
    let pcm: Vec<i16> = samples.iter().map(|&s| pcm16(s)).collect();
    for _ in 0..repeat {
        for &value in &pcm {
            writer.write_sample(value)?;
        }
    }
    writer.finalize()?;
    Ok(out.into_inner())
}

/// Data chunk size in bytes, `None` when the RIFF size would overflow `u32`
fn riff_data_len(samples: usize, repeat: u32) -> Option<u32> {
    let bytes = samples.checked_mul(repeat as usize)?.checked_mul(2)?;
    let data_len = u32::try_from(bytes).ok()?;
    data_len.checked_add((WAV_HEADER_LEN - 8) as u32)?;
    Some(data_len)
}

fn pcm16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// File name for an exported selection: `selection_<a>-<b>[_x<n>].wav`
pub fn export_file_name(interval: Interval, repeat: u32) -> String {
    if repeat > 1 {
        format!("selection_{}-{}_x{}.wav", interval.start, interval.end, repeat)
    } else {
        format!("selection_{}-{}.wav", interval.start, interval.end)
    }
}

/// Extract, encode and write a selection into `dir`
///
/// Returns the written path.
pub fn write_selection(
    interval: Interval,
    files: &[FileSpan],
    buffers: &[Arc<DecodedBuffer>],
    repeat: u32,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let extracted = extract(interval, files, buffers)?;
    let bytes = encode_wav(&extracted.samples, extracted.sample_rate, repeat)?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(interval, repeat));
    std::fs::write(&path, bytes)?;

    log::info!(
        "Exported {} sample(s) x{} at {}Hz to {:?}",
        extracted.samples.len(),
        repeat.max(1),
        extracted.sample_rate,
        path
    );
    Ok(path)
}
