//! Playback state machine
//!
//! `Idle -> Loading -> Playing -> Idle`. Loading is resolved by the host
//! handing decoded buffers back through [`PlaybackEngine::finish_loading`]
//! with the ticket it was given. Results carrying an old ticket, or arriving
//! after the load was cancelled, are dropped.

use std::sync::Arc;
use std::time::Instant;

use super::output::{AudioOutput, Voice};
use crate::decode::DecodedBuffer;
use crate::error::{DecodeError, PlaybackError};
use crate::interval::FileSpan;
use crate::types::{Interval, SamplePos};

/// Identifies one buffer fetch
pub type Ticket = u64;

/// Buffers the host must fetch before playback can start
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub ticket: Ticket,
    pub interval: Interval,
    pub files: Vec<FileSpan>,
    pub looped: bool,
}

/// Outcome of a playback command
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Fetch these buffers and call `finish_loading`
    Fetch(PlaybackRequest),
    Started { interval: Interval, looped: bool },
    Stopped { position: SamplePos, interval: Interval },
    /// A pending start was superseded
    Cancelled { interval: Interval },
    /// Nothing changed
    Ignored,
}

/// Mono concatenation of consecutive files
struct Stitched {
    filenames: Vec<String>,
    first_offset: SamplePos,
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl Stitched {
    fn new(files: &[FileSpan], buffers: &[Arc<DecodedBuffer>]) -> Result<Self, PlaybackError> {
        let first = buffers.first().ok_or(PlaybackError::NothingToPlay)?;
        let mut samples = Vec::with_capacity(buffers.iter().map(|b| b.len()).sum());
        for buffer in buffers {
            samples.extend_from_slice(buffer.channel(0));
        }
        Ok(Self {
            filenames: files.iter().map(|f| f.filename.clone()).collect(),
            first_offset: files.first().map_or(0, |f| f.global_offset),
            samples: Arc::new(samples),
            sample_rate: first.sample_rate,
        })
    }

    fn covers(&self, files: &[FileSpan]) -> bool {
        self.filenames.len() == files.len() && self.filenames.iter().zip(files).all(|(name, f)| *name == f.filename)
    }
}

struct LastPlayed {
    interval: Interval,
    stitched: Arc<Stitched>,
}

/// The single live playback
struct Active {
    interval: Interval,
    looped: bool,
    started: Instant,
    sample_rate: u32,
}

impl Active {
    fn cursor(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64() * self.sample_rate as f64;
        let a = self.interval.start as f64;
        if self.looped {
            a + elapsed % (self.interval.size().max(1) as f64)
        } else {
            (a + elapsed).min(self.interval.end as f64)
        }
    }

    fn finished(&self, now: Instant) -> bool {
        !self.looped && self.cursor(now) >= self.interval.end as f64
    }
}

enum State {
    Idle,
    Loading {
        ticket: Ticket,
        interval: Interval,
        superseded: bool,
    },
    Playing(Active),
}

pub struct PlaybackEngine {
    state: State,
    last: Option<LastPlayed>,
    next_ticket: Ticket,
    output: Box<dyn AudioOutput>,
}

impl PlaybackEngine {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            state: State::Idle,
            last: None,
            next_ticket: 1,
            output,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// True while a fetch is pending and has not been cancelled
    pub fn is_loading(&self) -> bool {
        matches!(self.state, State::Loading { superseded: false, .. })
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, State::Playing(_))
    }

    /// Interval of the live or pending playback
    pub fn interval(&self) -> Option<Interval> {
        match &self.state {
            State::Idle => None,
            State::Loading { interval, .. } => Some(*interval),
            State::Playing(active) => Some(active.interval),
        }
    }

    /// Play/pause toggle
    ///
    /// Stops a live playback, cancels a pending one, and otherwise starts
    /// playing `interval` over `files`.
    pub fn toggle(
        &mut self,
        interval: Interval,
        files: &[FileSpan],
        looped: bool,
        now: Instant,
    ) -> Result<Transition, PlaybackError> {
        match self.state {
            State::Playing(_) | State::Loading { superseded: false, .. } => Ok(self.stop(now)),
            State::Idle | State::Loading { superseded: true, .. } => self.play(interval, files, looped, now),
        }
    }

    /// Start playing `interval`, superseding anything live or pending
    ///
    /// Reuses the last stitched buffer when the interval or the file set is
    /// unchanged; otherwise asks the host to fetch buffers.
    pub fn play(
        &mut self,
        interval: Interval,
        files: &[FileSpan],
        looped: bool,
        now: Instant,
    ) -> Result<Transition, PlaybackError> {
        if files.is_empty() {
            return Err(PlaybackError::NothingToPlay);
        }
        if let State::Playing(_) = self.state {
            self.output.stop();
        }
        self.state = State::Idle;

        if let Some(last) = &mut self.last {
            if last.interval == interval || last.stitched.covers(files) {
                log::debug!("Reusing stitched buffer for {}", interval);
                last.interval = interval;
                let stitched = Arc::clone(&last.stitched);
                return self.start(&stitched, interval, looped, now);
            }
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.state = State::Loading {
            ticket,
            interval,
            superseded: false,
        };
        log::debug!("Loading {} file(s) for {} (ticket {})", files.len(), interval, ticket);
        Ok(Transition::Fetch(PlaybackRequest {
            ticket,
            interval,
            files: files.to_vec(),
            looped,
        }))
    }

    /// Deliver the buffers fetched for `request`
    pub fn finish_loading(
        &mut self,
        request: &PlaybackRequest,
        result: Result<Vec<Arc<DecodedBuffer>>, DecodeError>,
        now: Instant,
    ) -> Result<Transition, PlaybackError> {
        match self.state {
            State::Loading { ticket, superseded, .. } if ticket == request.ticket => {
                self.state = State::Idle;
                if superseded {
                    log::debug!("Dropping buffers for cancelled ticket {}", ticket);
                    return Ok(Transition::Ignored);
                }
            }
            _ => {
                log::debug!("Dropping buffers for stale ticket {}", request.ticket);
                return Ok(Transition::Ignored);
            }
        }

        let buffers = result.map_err(|e| {
            log::warn!("Playback decode failed: {}", e);
            PlaybackError::Decode(e)
        })?;
        let stitched = Arc::new(Stitched::new(&request.files, &buffers)?);
        self.last = Some(LastPlayed {
            interval: request.interval,
            stitched: Arc::clone(&stitched),
        });
        self.start(&stitched, request.interval, request.looped, now)
    }

    fn start(
        &mut self,
        stitched: &Stitched,
        interval: Interval,
        looped: bool,
        now: Instant,
    ) -> Result<Transition, PlaybackError> {
        let len = stitched.samples.len();
        let start = ((interval.start - stitched.first_offset).max(0) as usize).min(len);
        let end = ((interval.end - stitched.first_offset).max(0) as usize).clamp(start, len);
        self.output.start(Voice {
            samples: Arc::clone(&stitched.samples),
            sample_rate: stitched.sample_rate,
            start,
            end,
            looped,
        })?;

        self.state = State::Playing(Active {
            interval,
            looped,
            started: now,
            sample_rate: stitched.sample_rate,
        });
        log::info!("Playing {} (loop: {})", interval, looped);
        Ok(Transition::Started { interval, looped })
    }

    /// Stop a live playback or cancel a pending one
    pub fn stop(&mut self, now: Instant) -> Transition {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Playing(active) => {
                self.output.stop();
                let position = active.cursor(now).round() as SamplePos;
                log::info!("Stopped at {} in {}", position, active.interval);
                Transition::Stopped {
                    position,
                    interval: active.interval,
                }
            }
            State::Loading {
                ticket,
                interval,
                superseded: false,
            } => {
                self.state = State::Loading {
                    ticket,
                    interval,
                    superseded: true,
                };
                log::debug!("Cancelled pending playback of {}", interval);
                Transition::Cancelled { interval }
            }
            other => {
                self.state = other;
                Transition::Ignored
            }
        }
    }

    /// Playback cursor on the global sample axis
    pub fn cursor(&self, now: Instant) -> Option<f64> {
        match &self.state {
            State::Playing(active) => Some(active.cursor(now)),
            _ => None,
        }
    }

    /// Stop at the natural end of a non-looped playback
    pub fn poll(&mut self, now: Instant) -> Transition {
        let finished = matches!(&self.state, State::Playing(active) if active.finished(now));
        if finished {
            self.stop(now)
        } else {
            Transition::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::layout_files;
    use crate::playback::NullOutput;
    use std::time::Duration;

    fn iv(a: i64, b: i64) -> Interval {
        Interval::new(a, b).unwrap()
    }

    fn buffers(files: &[FileSpan]) -> Vec<Arc<DecodedBuffer>> {
        files
            .iter()
            .map(|f| Arc::new(DecodedBuffer::mono(1000, vec![0.5; f.len()])))
            .collect()
    }

    fn fetch(t: Transition) -> PlaybackRequest {
        match t {
            Transition::Fetch(request) => request,
            other => panic!("Expected fetch, got {:?}", other),
        }
    }

    #[test]
    fn test_load_play_stop() {
        let files = layout_files(vec![("a", 1000), ("b", 1000)]);
        let mut engine = PlaybackEngine::new(Box::new(NullOutput::new()));
        let t0 = Instant::now();

        let request = fetch(engine.toggle(iv(500, 1500), &files, false, t0).unwrap());
        assert!(engine.is_loading());
        assert_eq!(request.files.len(), 2);

        let started = engine.finish_loading(&request, Ok(buffers(&files)), t0).unwrap();
        assert_eq!(started, Transition::Started { interval: iv(500, 1500), looped: false });

        let cursor = engine.cursor(t0 + Duration::from_millis(250)).unwrap();
        assert!((cursor - 750.0).abs() < 1e-6);

        let stopped = engine.toggle(iv(500, 1500), &files, false, t0 + Duration::from_millis(300)).unwrap();
        assert_eq!(stopped, Transition::Stopped { position: 800, interval: iv(500, 1500) });
        assert!(engine.is_idle());
    }

    #[test]
    fn test_loop_cursor_wraps() {
        let files = layout_files(vec![("a", 1000)]);
        let mut engine = PlaybackEngine::new(Box::new(NullOutput::new()));
        let t0 = Instant::now();
        let request = fetch(engine.play(iv(100, 300), &files, true, t0).unwrap());
        engine.finish_loading(&request, Ok(buffers(&files)), t0).unwrap();

        // 0.5s at 1kHz is 500 samples, 500 mod 200 = 100
        let cursor = engine.cursor(t0 + Duration::from_millis(500)).unwrap();
        assert!((cursor - 200.0).abs() < 1e-6);
        assert_eq!(engine.poll(t0 + Duration::from_secs(10)), Transition::Ignored);
        assert!(engine.is_playing());
    }

    #[test]
    fn test_natural_end_stops() {
        let files = layout_files(vec![("a", 1000)]);
        let mut engine = PlaybackEngine::new(Box::new(NullOutput::new()));
        let t0 = Instant::now();
        let request = fetch(engine.play(iv(100, 300), &files, false, t0).unwrap());
        engine.finish_loading(&request, Ok(buffers(&files)), t0).unwrap();

        assert_eq!(engine.poll(t0 + Duration::from_millis(100)), Transition::Ignored);
        assert_eq!(
            engine.poll(t0 + Duration::from_millis(250)),
            Transition::Stopped { position: 300, interval: iv(100, 300) }
        );
        assert!(engine.is_idle());
    }

    #[test]
    fn test_cancel_while_loading() {
        let files = layout_files(vec![("a", 1000)]);
        let mut engine = PlaybackEngine::new(Box::new(NullOutput::new()));
        let t0 = Instant::now();
        let request = fetch(engine.toggle(iv(0, 999), &files, false, t0).unwrap());

        assert_eq!(
            engine.toggle(iv(0, 999), &files, false, t0).unwrap(),
            Transition::Cancelled { interval: iv(0, 999) }
        );
        // the decode still resolves, but nothing starts
        assert_eq!(
            engine.finish_loading(&request, Ok(buffers(&files)), t0).unwrap(),
            Transition::Ignored
        );
        assert!(engine.is_idle());
    }

    #[test]
    fn test_new_request_supersedes_pending() {
        let files = layout_files(vec![("a", 1000), ("b", 1000)]);
        let mut engine = PlaybackEngine::new(Box::new(NullOutput::new()));
        let t0 = Instant::now();
        let first = fetch(engine.play(iv(0, 500), &files[..1], false, t0).unwrap());
        let second = fetch(engine.play(iv(1200, 1500), &files[1..], false, t0).unwrap());
        assert_ne!(first.ticket, second.ticket);

        assert_eq!(
            engine.finish_loading(&first, Ok(buffers(&files[..1])), t0).unwrap(),
            Transition::Ignored
        );
        assert!(engine.is_loading());
        assert_eq!(
            engine.finish_loading(&second, Ok(buffers(&files[1..])), t0).unwrap(),
            Transition::Started { interval: iv(1200, 1500), looped: false }
        );
    }

    #[test]
    fn test_replay_reuses_buffers() {
        let files = layout_files(vec![("a", 1000)]);
        let mut engine = PlaybackEngine::new(Box::new(NullOutput::new()));
        let t0 = Instant::now();
        let request = fetch(engine.play(iv(0, 100), &files, false, t0).unwrap());
        engine.finish_loading(&request, Ok(buffers(&files)), t0).unwrap();
        engine.stop(t0);

        // same interval, now looped: starts straight away
        assert_eq!(
            engine.play(iv(0, 100), &files, true, t0).unwrap(),
            Transition::Started { interval: iv(0, 100), looped: true }
        );
        // same file set, different interval: also no fetch
        assert_eq!(
            engine.play(iv(200, 400), &files, false, t0).unwrap(),
            Transition::Started { interval: iv(200, 400), looped: false }
        );
    }

    #[test]
    fn test_decode_failure_returns_to_idle() {
        let files = layout_files(vec![("a", 1000)]);
        let mut engine = PlaybackEngine::new(Box::new(NullOutput::new()));
        let t0 = Instant::now();
        let request = fetch(engine.play(iv(0, 100), &files, false, t0).unwrap());
        let err = engine
            .finish_loading(&request, Err(DecodeError::Malformed("a".into())), t0)
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(_)));
        assert!(engine.is_idle());
    }

    #[test]
    fn test_nothing_to_play() {
        let mut engine = PlaybackEngine::new(Box::new(NullOutput::new()));
        assert!(matches!(
            engine.toggle(iv(0, 10), &[], false, Instant::now()),
            Err(PlaybackError::NothingToPlay)
        ));
    }
}
