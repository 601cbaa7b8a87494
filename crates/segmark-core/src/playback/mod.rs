//! Playback of selections spanning one or more source files
//!
//! [`PlaybackEngine`] owns the state machine and the cursor math,
//! [`PlaybackDriver`] runs fetches and the cursor ticker on tokio, and
//! [`AudioOutput`] is the seam to the actual output device.

mod driver;
mod engine;
mod output;

pub use driver::{gather_buffers, EngineEvent, PlaybackDriver};
pub use engine::{PlaybackEngine, PlaybackRequest, Ticket, Transition};
pub use output::{AudioOutput, NullOutput, Voice};
