//! Editing session: all mutable state behind the command surface
//!
//! A session owns the file layout, decoded buffers, tracks, selection, page
//! cache and playback engine. Commands run synchronously; the only pending
//! work is a playback fetch, which the host completes by feeding the
//! resulting [`EngineEvent`] back in. Every outcome, including failures, is
//! published on the session's [`StatusBus`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::config::{DisplayConfig, EditorConfig};
use crate::coords::{merge_unique, CoordinateMapper};
use crate::decode::{BufferCache, DecodeService, DecodedBuffer, FileDecoder};
use crate::error::{CoverageError, EditorError, EditorResult, SelectionError, SnapError, TrackError};
use crate::export;
use crate::interval::{layout_files, FileSpan, FileSpans};
use crate::pages::{PageCache, RenderContext, SurfaceFactory};
use crate::peaks::RenderSamples;
use crate::pitch::{PitchSidecar, PitchTrack};
use crate::playback::{gather_buffers, AudioOutput, EngineEvent, PlaybackEngine, PlaybackRequest, Transition};
use crate::selection::{ClickTarget, SelectionModel};
use crate::snap::{covered_files, window_interval, SnapEngine};
use crate::status::{StatusBus, StatusEvent};
use crate::tracks::{load_track_entries, track_from_entries, word_track_name, Manifest, TrackEntry, TrackSet};
use crate::types::{Interval, SamplePos};

/// Everything a page frame is derived from
struct Timeline {
    display: DisplayConfig,
    files: FileSpans,
    samples: RenderSamples,
    tracks: TrackSet,
    pitch: Option<PitchTrack>,
    sample_rate: u32,
    page_size: SamplePos,
    gain: f32,
    cursor: Option<f64>,
}

impl Timeline {
    fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.sample_rate, self.display.render_blocks_per_second, self.page_size)
    }

    fn total_samples(&self) -> SamplePos {
        self.files.items().last().map_or(0, |f| f.interval.end + 1)
    }

    fn context(&self, selection: Option<Interval>) -> RenderContext<'_> {
        RenderContext {
            mapper: self.mapper(),
            width: self.display.canvas_width,
            gain: self.gain,
            total_samples: self.total_samples(),
            samples: &self.samples,
            selection,
            cursor: self.cursor,
            tracks: &self.tracks,
            pitch: self.pitch.as_ref(),
        }
    }

    fn cursor_pages(&self, cursor: Option<f64>) -> Vec<usize> {
        self.mapper()
            .pages_for(cursor.map(|c| Interval::point(c.round() as SamplePos)))
    }
}

pub struct Session {
    config: EditorConfig,
    timeline: Timeline,
    buffers: BufferCache,
    selection: SelectionModel,
    pages: PageCache,
    playback: PlaybackEngine,
    snap: SnapEngine,
    status: StatusBus,
    spans_path: Option<PathBuf>,
}

impl Session {
    /// Decode `sources` in parallel and lay them out back to back
    pub fn new(
        config: EditorConfig,
        service: Arc<dyn DecodeService>,
        sources: &[String],
        surfaces: Box<dyn SurfaceFactory>,
        output: Box<dyn AudioOutput>,
    ) -> EditorResult<Self> {
        let status = StatusBus::default();
        publish_or_warn(&status, StatusEvent::Loading { files: sources.len() });

        let mut buffers = BufferCache::new(service);
        let decoded = buffers.preload(sources).map_err(|e| {
            log::warn!("Session load failed: {}", e);
            publish_or_warn(&status, StatusEvent::error(&e));
            e
        })?;

        let sample_rate = decoded
            .first()
            .map_or(config.audio.fallback_sample_rate, |b| b.sample_rate);
        let (files, _) = FileSpans::from_entries(layout_files(
            sources.iter().cloned().zip(decoded.iter().map(|b| b.len())),
        ));
        let samples = RenderSamples::from_buffers(
            decoded.iter().map(|b| b.as_ref()),
            config.display.render_blocks_per_second,
        );

        let timeline = Timeline {
            display: config.display.clone(),
            files,
            samples,
            tracks: TrackSet::with_mutable(config.tracks.mutable_track.clone()),
            pitch: None,
            sample_rate,
            page_size: config.display.page_size(sample_rate),
            gain: config.display.waveform_gain,
            cursor: None,
        };

        let mut session = Self {
            snap: SnapEngine::new(config.snap.clone()),
            config,
            timeline,
            buffers,
            selection: SelectionModel::new(),
            pages: PageCache::new(surfaces),
            playback: PlaybackEngine::new(output),
            status,
            spans_path: None,
        };
        let pages = session.render_all();
        log::info!(
            "Session loaded: {} file(s), {} samples @ {}Hz, {} page(s)",
            session.timeline.files.len(),
            session.total_samples(),
            sample_rate,
            pages
        );
        session.publish(StatusEvent::Loaded {
            files: session.timeline.files.len(),
            total_samples: session.total_samples(),
            sample_rate,
            pages,
        });
        Ok(session)
    }

    /// Open a session from a manifest file
    ///
    /// Sources, word tracks, the pitch sidecar and saved spans resolve
    /// relative to the manifest. Unreadable word tracks and pitch data are
    /// skipped with a warning.
    pub fn open(
        manifest_path: &Path,
        config: EditorConfig,
        surfaces: Box<dyn SurfaceFactory>,
        output: Box<dyn AudioOutput>,
    ) -> Result<Self> {
        let manifest = Manifest::load(manifest_path)?;
        let service = Arc::new(FileDecoder::new(manifest.base_dir.clone()));
        let mut session = Session::new(config, service, &manifest.filelist, surfaces, output)
            .with_context(|| format!("Failed to load audio listed in {:?}", manifest_path))?;

        for entry in &manifest.tracks {
            match load_track_entries(&manifest.resolve(&entry.words)) {
                Ok(words) => session.add_words(&entry.speaker, &words),
                Err(e) => log::warn!("Skipping words for {}: {:#}", entry.speaker, e),
            }
        }

        if let Some(pitch) = &manifest.pitch {
            match PitchSidecar::load(&manifest.resolve(&pitch.url)) {
                Ok(sidecar) => session.set_pitch(&sidecar),
                Err(e) => log::warn!("Skipping pitch sidecar: {:#}", e),
            }
        }

        if let Some(spans) = &manifest.spans {
            session.load_spans(&manifest.resolve(spans))?;
        }

        session.render_all();
        Ok(session)
    }

    // ────────────────────────────────────────────────────────────────────
    // Setup
    // ────────────────────────────────────────────────────────────────────

    /// Add a speaker's read-only word track from entries in seconds
    pub fn add_words(&mut self, speaker: &str, entries: &[TrackEntry]) {
        let track = track_from_entries(entries, self.timeline.sample_rate);
        log::info!("Loaded {} word(s) for {}", track.len(), speaker);
        self.timeline.tracks.add_read_only(word_track_name(speaker), track);
    }

    pub fn set_pitch(&mut self, sidecar: &PitchSidecar) {
        self.timeline.pitch = PitchTrack::from_sidecar(
            sidecar,
            self.timeline.sample_rate,
            self.config.tracks.default_pitch_hop_seconds,
        );
        if self.timeline.pitch.is_none() {
            log::warn!("Pitch sidecar has no values");
        }
    }

    /// Load the mutable track from saved spans and keep saving there
    pub fn load_spans(&mut self, path: &Path) -> Result<usize> {
        let mutable = self.config.tracks.mutable_track.clone();
        let count = self.timeline.tracks.load_track(&mutable, path)?;
        self.spans_path = Some(path.to_path_buf());
        log::info!("Loaded {} span(s) from {:?}", count, path);
        Ok(count)
    }

    /// Save the mutable track
    pub fn save_spans(&mut self, path: &Path) -> Result<()> {
        self.timeline
            .tracks
            .save_track(&self.config.tracks.mutable_track, path)?;
        let intervals = self
            .timeline
            .tracks
            .get(&self.config.tracks.mutable_track)
            .map_or(0, |t| t.intervals.len());
        self.publish(StatusEvent::Saved {
            path: path.to_path_buf(),
            intervals,
        });
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Accessors
    // ────────────────────────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn status(&self) -> &StatusBus {
        &self.status
    }

    pub fn selection(&self) -> Option<Interval> {
        self.selection.selection()
    }

    pub fn files(&self) -> &FileSpans {
        &self.timeline.files
    }

    pub fn tracks(&self) -> &TrackSet {
        &self.timeline.tracks
    }

    pub fn pitch(&self) -> Option<&PitchTrack> {
        self.timeline.pitch.as_ref()
    }

    pub fn pages(&self) -> &PageCache {
        &self.pages
    }

    pub fn sample_rate(&self) -> u32 {
        self.timeline.sample_rate
    }

    pub fn total_samples(&self) -> SamplePos {
        self.timeline.total_samples()
    }

    pub fn page_size(&self) -> SamplePos {
        self.timeline.page_size
    }

    pub fn page_count(&self) -> usize {
        self.timeline.mapper().page_count(self.total_samples())
    }

    pub fn gain(&self) -> f32 {
        self.timeline.gain
    }

    pub fn cursor(&self) -> Option<f64> {
        self.timeline.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn is_loading(&self) -> bool {
        self.playback.is_loading()
    }

    // ────────────────────────────────────────────────────────────────────
    // Plumbing
    // ────────────────────────────────────────────────────────────────────

    fn publish(&self, event: StatusEvent) {
        publish_or_warn(&self.status, event);
    }

    /// Publish a failed command on the status channel
    fn report<T>(&self, result: EditorResult<T>) -> EditorResult<T> {
        if let Err(e) = &result {
            log::warn!("Command failed: {}", e);
            self.publish(StatusEvent::error(e));
        }
        result
    }

    fn render_all(&mut self) -> usize {
        let ctx = self.timeline.context(self.selection.selection());
        self.pages.render_all(&ctx)
    }

    fn refresh(&mut self, old: Option<Interval>, new: Option<Interval>) {
        let ctx = self.timeline.context(self.selection.selection());
        self.pages.refresh_affected(old, new, &ctx);
    }

    fn refresh_pages(&mut self, pages: &[usize]) {
        let ctx = self.timeline.context(self.selection.selection());
        self.pages.refresh_pages(pages, &ctx);
    }

    fn move_cursor(&mut self, cursor: Option<f64>) {
        let old = self.timeline.cursor;
        self.timeline.cursor = cursor;
        let pages = merge_unique(&self.timeline.cursor_pages(old), &self.timeline.cursor_pages(cursor));
        self.refresh_pages(&pages);
    }

    fn pointer_sample(&self, page: usize, offset_x: f64) -> f64 {
        let display = &self.config.display;
        self.timeline
            .mapper()
            .pixel_to_sample(page, offset_x, display.canvas_width, display.device_pixel_ratio)
    }

    fn covering(&self, interval: Interval) -> Vec<FileSpan> {
        self.timeline.files.intersect(interval).to_vec()
    }

    // ────────────────────────────────────────────────────────────────────
    // Playback
    // ────────────────────────────────────────────────────────────────────

    /// Play/pause toggle over the selection, or the whole timeline
    ///
    /// Returns a fetch the host must complete when buffers are needed.
    pub fn toggle_play(&mut self, looped: bool, now: Instant) -> EditorResult<Option<PlaybackRequest>> {
        let interval = self
            .selection
            .selection()
            .unwrap_or(Interval {
                start: 0,
                end: self.total_samples(),
            });
        let files = self.covering(interval);
        let result = self
            .playback
            .toggle(interval, &files, looped, now)
            .map_err(EditorError::from);
        let transition = self.report(result)?;
        Ok(self.apply(transition))
    }

    /// Cached buffers for a fetch, `None` where a decode is needed
    pub fn cached_buffers(&self, request: &PlaybackRequest) -> Vec<Option<Arc<DecodedBuffer>>> {
        request.files.iter().map(|f| self.buffers.get(&f.filename)).collect()
    }

    /// Decode service used for cache misses
    pub fn decode_service(&self) -> Arc<dyn DecodeService> {
        self.buffers.service()
    }

    /// Complete a fetch on the calling thread
    pub fn load_blocking(&mut self, request: PlaybackRequest, now: Instant) -> EditorResult<Option<PlaybackRequest>> {
        let service = self.buffers.service();
        let result = gather_buffers(service.as_ref(), &request.files, self.cached_buffers(&request));
        self.on_engine_event(EngineEvent::Loaded { request, result }, now)
    }

    /// Feed a driver event back into the session
    pub fn on_engine_event(&mut self, event: EngineEvent, now: Instant) -> EditorResult<Option<PlaybackRequest>> {
        match event {
            EngineEvent::Loaded { request, result } => {
                if let Ok(buffers) = &result {
                    for (file, buffer) in request.files.iter().zip(buffers) {
                        if self.buffers.get(&file.filename).is_none() {
                            self.buffers.insert(file.filename.clone(), Arc::clone(buffer));
                        }
                    }
                }
                let result = self
                    .playback
                    .finish_loading(&request, result, now)
                    .map_err(EditorError::from);
                let transition = self.report(result)?;
                Ok(self.apply(transition))
            }
            EngineEvent::Tick => {
                self.tick(now);
                Ok(None)
            }
        }
    }

    /// Advance the playback cursor, stopping at the natural end
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        let transition = self.playback.poll(now);
        self.apply(transition);
        let cursor = self.playback.cursor(now);
        if cursor.is_some() {
            log::trace!("Cursor at {:?}", cursor);
            self.move_cursor(cursor);
        }
        cursor
    }

    /// Stop a live playback or cancel a pending one
    pub fn stop(&mut self, now: Instant) {
        let transition = self.playback.stop(now);
        self.apply(transition);
    }

    fn apply(&mut self, transition: Transition) -> Option<PlaybackRequest> {
        match transition {
            Transition::Fetch(request) => {
                self.publish(StatusEvent::PlaybackLoading {
                    interval: request.interval,
                });
                return Some(request);
            }
            Transition::Started { interval, looped } => {
                self.publish(StatusEvent::Playing { interval, looped });
                self.move_cursor(Some(interval.start as f64));
            }
            Transition::Stopped { position, interval } => {
                self.publish(StatusEvent::Stopped { position, interval });
                self.move_cursor(None);
            }
            Transition::Cancelled { interval } => {
                self.publish(StatusEvent::Cancelled { interval });
            }
            Transition::Ignored => {}
        }
        None
    }

    // ────────────────────────────────────────────────────────────────────
    // Mutable track
    // ────────────────────────────────────────────────────────────────────

    /// Add the selection to the mutable track
    pub fn mark_selection(&mut self) -> EditorResult<Interval> {
        let result = self.try_mark();
        self.report(result)
    }

    fn try_mark(&mut self) -> EditorResult<Interval> {
        let interval = SelectionError::check(self.selection.selection())?;
        let mutable = self.config.tracks.mutable_track.clone();
        self.timeline.tracks.writable(&mutable)?.create(interval)?;
        let pages = self.timeline.mapper().pages_for(Some(interval));
        self.refresh_pages(&pages);
        self.publish(StatusEvent::Marked { interval });
        self.autosave();
        Ok(interval)
    }

    /// Remove the selection from the mutable track, splitting as needed
    ///
    /// Returns the surviving pieces of the intervals it touched.
    pub fn unmark_selection(&mut self) -> EditorResult<Vec<Interval>> {
        let result = self.try_unmark();
        self.report(result)
    }

    fn try_unmark(&mut self) -> EditorResult<Vec<Interval>> {
        let interval = SelectionError::check(self.selection.selection())?;
        let mutable = self.config.tracks.mutable_track.clone();
        let remaining = self.timeline.tracks.writable(&mutable)?.kill_intersection(interval);
        let pages = self.timeline.mapper().pages_for(Some(interval));
        self.refresh_pages(&pages);
        self.publish(StatusEvent::Unmarked {
            remaining: remaining.clone(),
        });
        self.autosave();
        Ok(remaining)
    }

    fn autosave(&mut self) {
        if let Some(path) = self.spans_path.clone() {
            if let Err(e) = self.save_spans(&path) {
                log::warn!("Failed to save spans: {:#}", e);
                self.publish(StatusEvent::error(format!("{:#}", e)));
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Selection
    // ────────────────────────────────────────────────────────────────────

    fn update_selection(&mut self, f: impl FnOnce(&mut SelectionModel)) -> Option<Interval> {
        let old = self.selection.selection();
        f(&mut self.selection);
        let new = self.selection.selection();
        self.refresh(old, new);
        new
    }

    /// Pointer pressed on page `page` at canvas offset `offset_x`
    ///
    /// Starts a new drag; with `extend` the previous selection is kept for
    /// the release to combine with.
    pub fn pointer_down(&mut self, page: usize, offset_x: f64, extend: bool) -> Option<Interval> {
        if extend {
            return self.selection.selection();
        }
        let sample = self.pointer_sample(page, offset_x);
        self.update_selection(|sel| {
            sel.clear();
            sel.begin_drag(sample);
        })
    }

    /// Pointer moved; updates the selection while dragging
    pub fn pointer_move(&mut self, page: usize, offset_x: f64) -> Option<Interval> {
        if !self.selection.is_dragging() {
            return self.selection.selection();
        }
        let sample = self.pointer_sample(page, offset_x);
        let selection = self.update_selection(|sel| {
            sel.drag_to(sample);
        });
        self.publish(StatusEvent::Selection { interval: selection });
        selection
    }

    /// Pointer released over `target`
    pub fn pointer_up(&mut self, target: &ClickTarget, page: usize, offset_x: f64, extend: bool) -> Option<Interval> {
        let sample = self.pointer_sample(page, offset_x);
        let released = self.update_selection(|sel| {
            sel.release(sample, extend);
        });
        let query = released.unwrap_or(Interval::point(sample.round() as SamplePos));
        self.resolve_click(target, query, sample)
    }

    /// Double click over `target`: selects what lies under the pointer
    pub fn double_click(&mut self, target: &ClickTarget, page: usize, offset_x: f64) -> Option<Interval> {
        let sample = self.pointer_sample(page, offset_x);
        self.resolve_click(target, Interval::point(sample.round() as SamplePos), sample)
    }

    fn resolve_click(&mut self, target: &ClickTarget, query: Interval, sample: f64) -> Option<Interval> {
        match target {
            ClickTarget::Waveform => {}
            ClickTarget::Pitch => {
                if let Some(frame) = self.timeline.pitch.as_ref().map(|p| p.frame_at(sample)) {
                    let span = frame.interval;
                    self.update_selection(|sel| {
                        sel.select_span(span);
                    });
                    self.publish(StatusEvent::PitchFrame(frame));
                    return Some(span);
                }
            }
            ClickTarget::Track(name) => {
                let hit = self.timeline.tracks.get(name).and_then(|track| {
                    let ix = track.intervals.intersect(query);
                    Some((ix.first()?.interval, ix.last()?.interval))
                });
                if let Some((first, last)) = hit {
                    self.update_selection(|sel| {
                        sel.select_range(first, last);
                    });
                }
            }
        }
        let selection = self.selection.selection();
        self.publish(StatusEvent::Selection { interval: selection });
        selection
    }

    /// Select from word `first` to word `last` of a track (either order)
    pub fn select_words(&mut self, track: &str, first: usize, last: usize) -> EditorResult<Interval> {
        let result = self.try_select_words(track, first, last);
        self.report(result)
    }

    fn try_select_words(&mut self, track: &str, first: usize, last: usize) -> EditorResult<Interval> {
        let items = self
            .timeline
            .tracks
            .get(track)
            .ok_or_else(|| TrackError::UnknownTrack(track.to_string()))?
            .intervals
            .items();
        let (a, b) = match (items.get(first), items.get(last)) {
            (Some(a), Some(b)) => (a.interval, b.interval),
            _ => return Err(SelectionError::NoSelection.into()),
        };
        let interval = a.union(&b);
        let words = self
            .timeline
            .tracks
            .get(track)
            .map(|t| {
                t.intervals
                    .intersect(interval)
                    .iter()
                    .filter_map(|w| w.name.clone())
                    .collect()
            })
            .unwrap_or_default();

        self.update_selection(|sel| {
            sel.select_range(a, b);
        });
        self.publish(StatusEvent::WordRange {
            track: track.to_string(),
            interval,
            words,
        });
        Ok(interval)
    }

    /// Combine a span with the selection as a shift-drag would
    pub fn extend_selection(&mut self, fresh: Interval) -> Option<Interval> {
        let selection = self.update_selection(|sel| {
            sel.extend_with(fresh);
        });
        self.publish(StatusEvent::Selection { interval: selection });
        selection
    }

    /// Select an exact span
    pub fn select(&mut self, span: Interval) -> Interval {
        self.update_selection(|sel| {
            sel.select_span(span);
        });
        self.publish(StatusEvent::Selection { interval: Some(span) });
        span
    }

    pub fn clear_selection(&mut self) {
        self.update_selection(SelectionModel::clear);
        self.publish(StatusEvent::Selection { interval: None });
    }

    // ────────────────────────────────────────────────────────────────────
    // Snapping
    // ────────────────────────────────────────────────────────────────────

    fn buffers_for(&mut self, files: &[FileSpan]) -> Result<Vec<Arc<DecodedBuffer>>, SnapError> {
        Ok(self.buffers.buffers_for(files)?)
    }

    fn apply_snap(&mut self, snapped: Interval, period: Option<f64>) -> Interval {
        self.update_selection(|sel| {
            sel.select_span(snapped);
        });
        log::debug!("Snapped selection to {}", snapped);
        self.publish(StatusEvent::Snapped {
            interval: snapped,
            period,
        });
        snapped
    }

    /// Move both selection endpoints to their nearest zero crossings
    pub fn snap_zero_crossing(&mut self) -> EditorResult<Interval> {
        let result = self.try_snap_zero_crossing().map_err(EditorError::from);
        self.report(result)
    }

    fn try_snap_zero_crossing(&mut self) -> Result<Interval, SnapError> {
        let (interval, files) = covered_files(self.selection.selection(), &self.timeline.files)?;
        let buffers = self.buffers_for(&files)?;
        let snapped = self.snap.zero_crossing(interval, &files, &buffers)?;
        Ok(self.apply_snap(snapped, None))
    }

    /// Replace the selection with a zero-snapped window of whole pitch
    /// periods around its midpoint
    pub fn snap_glottal(&mut self) -> EditorResult<Interval> {
        let result = self.try_snap_glottal().map_err(EditorError::from);
        self.report(result)
    }

    fn try_snap_glottal(&mut self) -> Result<Interval, SnapError> {
        let (interval, covering) = covered_files(self.selection.selection(), &self.timeline.files)?;
        let (start, end, period) =
            self.snap
                .glottal_target(interval, self.timeline.pitch.as_ref(), self.timeline.sample_rate);
        let mut files = self.covering(window_interval(start, end));
        if files.is_empty() {
            files = covering;
        }
        let buffers = self.buffers_for(&files)?;
        let snapped = self.snap.glottal((start, end), &files, &buffers)?;
        Ok(self.apply_snap(snapped, Some(period)))
    }

    // ────────────────────────────────────────────────────────────────────
    // Export
    // ────────────────────────────────────────────────────────────────────

    /// Write the selection as WAV into `dir`, repeated `repeat` times
    pub fn export_selection(&mut self, repeat: u32, dir: &Path) -> EditorResult<PathBuf> {
        let result = self.try_export(repeat, dir);
        self.report(result)
    }

    /// Export with the configured loop count
    pub fn export_loop(&mut self, dir: &Path) -> EditorResult<PathBuf> {
        self.export_selection(self.config.tracks.export_loop_count, dir)
    }

    fn try_export(&mut self, repeat: u32, dir: &Path) -> EditorResult<PathBuf> {
        let interval = SelectionError::check(self.selection.selection())?;
        let files = self.covering(interval);
        if files.is_empty() {
            return Err(CoverageError { interval }.into());
        }
        let buffers = self.buffers.buffers_for(&files)?;
        let path = export::write_selection(interval, &files, &buffers, repeat, dir)?;
        self.publish(StatusEvent::Exported {
            path: path.clone(),
            interval,
        });
        Ok(path)
    }

    // ────────────────────────────────────────────────────────────────────
    // Display
    // ────────────────────────────────────────────────────────────────────

    /// Change the page size by `delta` samples, never below the minimum
    pub fn change_page_size(&mut self, delta: SamplePos) -> SamplePos {
        let min = self.config.display.min_page_size(self.timeline.sample_rate);
        self.timeline.page_size = (self.timeline.page_size + delta).max(min);
        let pages = self.render_all();
        log::debug!("Page size {} samples, {} page(s)", self.timeline.page_size, pages);
        self.publish(StatusEvent::PageSize {
            samples: self.timeline.page_size,
            pages,
        });
        self.timeline.page_size
    }

    /// Shorter pages: fewer samples per page
    pub fn shrink_page(&mut self) -> SamplePos {
        let step = self.config.display.page_step(self.timeline.sample_rate);
        self.change_page_size(-step)
    }

    /// Longer pages: more samples per page
    pub fn grow_page(&mut self) -> SamplePos {
        let step = self.config.display.page_step(self.timeline.sample_rate);
        self.change_page_size(step)
    }

    /// Raise or lower the waveform gain by one step
    pub fn adjust_gain(&mut self, up: bool) -> f32 {
        let step = if up {
            self.config.display.gain_step
        } else {
            -self.config.display.gain_step
        };
        self.timeline.gain = (self.timeline.gain + step).max(self.config.display.min_gain);
        self.render_all();
        self.publish(StatusEvent::WaveformGain {
            gain: self.timeline.gain,
        });
        self.timeline.gain
    }
}

fn publish_or_warn(bus: &StatusBus, event: StatusEvent) {
    if let Err(e) = bus.publish(event) {
        log::warn!("Failed to publish status: {}", e);
    }
}
