//! Decode service boundary
//!
//! Audio decoding is an external collaborator: the timeline only needs a
//! buffer exposing a sample rate, a sample count and per-channel samples.
//! [`FileDecoder`] is the in-crate implementation backed by Symphonia.
//!
//! # Architecture
//!
//! ```text
//! source name ──► DecodeService::decode() ──► DecodedBuffer
//!                        │
//!                  BufferCache (by source name, shared Arc buffers)
//! ```

mod buffer;
mod cache;
mod file_decoder;

pub use buffer::DecodedBuffer;
pub use cache::BufferCache;
pub use file_decoder::FileDecoder;

use crate::error::DecodeError;

/// Turns a source reference into decoded audio
pub trait DecodeService: Send + Sync {
    /// Decode a whole source; may reject malformed input
    fn decode(&self, source: &str) -> Result<DecodedBuffer, DecodeError>;
}
