//! Async side of playback: buffer fetches and the cursor ticker
//!
//! The engine itself is synchronous. The driver runs decodes on the blocking
//! pool and reports completions, along with periodic cursor ticks, as
//! [`EngineEvent`]s on one channel so the host handles them in order with
//! its other input.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::engine::PlaybackRequest;
use crate::decode::{DecodeService, DecodedBuffer};
use crate::error::DecodeError;
use crate::interval::FileSpan;

/// Completion or timer event for the host loop
#[derive(Debug)]
pub enum EngineEvent {
    Loaded {
        request: PlaybackRequest,
        result: Result<Vec<Arc<DecodedBuffer>>, DecodeError>,
    },
    /// Cursor update period elapsed
    Tick,
}

/// Buffers for `files`, decoding those without a cached entry
pub fn gather_buffers(
    service: &dyn DecodeService,
    files: &[FileSpan],
    cached: Vec<Option<Arc<DecodedBuffer>>>,
) -> Result<Vec<Arc<DecodedBuffer>>, DecodeError> {
    files
        .iter()
        .zip(cached.into_iter().chain(std::iter::repeat(None)))
        .map(|(file, cached)| match cached {
            Some(buffer) => Ok(buffer),
            None => service.decode(&file.filename).map(Arc::new),
        })
        .collect()
}

pub struct PlaybackDriver {
    events: mpsc::UnboundedSender<EngineEvent>,
    service: Arc<dyn DecodeService>,
    cursor_period: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl PlaybackDriver {
    /// Create a driver and the receiver its events arrive on
    pub fn new(
        service: Arc<dyn DecodeService>,
        cursor_period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let driver = Self {
            events,
            service,
            cursor_period: cursor_period.max(Duration::from_millis(1)),
            ticker: None,
        };
        (driver, rx)
    }

    /// Fetch the buffers for `request` in the background
    ///
    /// The fetch always runs to completion; whether its result is still
    /// wanted is decided when the engine sees it.
    pub fn fetch(&self, request: PlaybackRequest, cached: Vec<Option<Arc<DecodedBuffer>>>) -> JoinHandle<()> {
        let events = self.events.clone();
        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            let files = request.files.clone();
            let decoded =
                tokio::task::spawn_blocking(move || gather_buffers(service.as_ref(), &files, cached)).await;
            let result = decoded.unwrap_or_else(|e| Err(DecodeError::Malformed(format!("decode task failed: {}", e))));
            if events.send(EngineEvent::Loaded { request, result }).is_err() {
                log::debug!("Playback event receiver dropped");
            }
        })
    }

    /// Start emitting [`EngineEvent::Tick`] every cursor period
    pub fn start_ticker(&mut self) {
        if self.is_ticking() {
            return;
        }
        let events = self.events.clone();
        let period = self.cursor_period;
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if events.send(EngineEvent::Tick).is_err() {
                    break;
                }
            }
        }));
        log::trace!("Cursor ticker started ({:?})", period);
    }

    pub fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            log::trace!("Cursor ticker stopped");
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::layout_files;
    use crate::types::Interval;

    struct ToneDecoder;

    impl DecodeService for ToneDecoder {
        fn decode(&self, source: &str) -> Result<DecodedBuffer, DecodeError> {
            match source {
                "missing" => Err(DecodeError::Empty(source.to_string())),
                _ => Ok(DecodedBuffer::mono(1000, vec![0.1; 100])),
            }
        }
    }

    fn request(names: &[&str]) -> PlaybackRequest {
        let files = layout_files(names.iter().map(|n| (n.to_string(), 100)));
        PlaybackRequest {
            ticket: 7,
            interval: Interval::new(0, 50).unwrap(),
            files,
            looped: false,
        }
    }

    #[test]
    fn test_gather_prefers_cached() {
        let req = request(&["a", "missing"]);
        let cached = vec![None, Some(Arc::new(DecodedBuffer::mono(1000, vec![0.0; 3])))];
        let buffers = gather_buffers(&ToneDecoder, &req.files, cached).unwrap();
        assert_eq!(buffers[0].len(), 100);
        assert_eq!(buffers[1].len(), 3);

        assert!(gather_buffers(&ToneDecoder, &req.files, Vec::new()).is_err());
    }

    #[tokio::test]
    async fn test_fetch_reports_loaded() {
        let (driver, mut rx) = PlaybackDriver::new(Arc::new(ToneDecoder), Duration::from_millis(5));
        driver.fetch(request(&["a", "b"]), Vec::new()).await.unwrap();
        match rx.recv().await {
            Some(EngineEvent::Loaded { request, result }) => {
                assert_eq!(request.ticket, 7);
                assert_eq!(result.unwrap().len(), 2);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_reports_decode_error() {
        let (driver, mut rx) = PlaybackDriver::new(Arc::new(ToneDecoder), Duration::from_millis(5));
        driver.fetch(request(&["missing"]), Vec::new());
        match rx.recv().await {
            Some(EngineEvent::Loaded { result, .. }) => assert!(result.is_err()),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ticker_start_stop() {
        let (mut driver, mut rx) = PlaybackDriver::new(Arc::new(ToneDecoder), Duration::from_millis(2));
        driver.start_ticker();
        assert!(driver.is_ticking());
        for _ in 0..3 {
            assert!(matches!(rx.recv().await, Some(EngineEvent::Tick)));
        }
        driver.stop_ticker();
        assert!(!driver.is_ticking());
    }
}
