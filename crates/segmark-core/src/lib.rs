//! Segmark Core - Timeline model for audio segmentation

pub mod types;
pub mod error;
pub mod interval;
pub mod coords;
pub mod selection;
pub mod decode;
pub mod peaks;
pub mod pitch;
pub mod tracks;
pub mod status;
pub mod config;
pub mod snap;
pub mod export;
pub mod pages;
pub mod playback;
pub mod session;

pub use types::*;
pub use error::{EditorError, EditorResult};
pub use session::Session;
pub use status::{StatusBus, StatusEvent};
