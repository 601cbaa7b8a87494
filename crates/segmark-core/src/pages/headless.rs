//! In-memory surfaces for hosts without a display

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{PageFrame, PageSurface, SurfaceFactory};

/// What has been drawn so far, shared by every headless surface
#[derive(Debug, Default)]
pub struct HeadlessLog {
    /// Total draw calls
    pub draws: usize,
    /// Draw calls per page
    pub draws_per_page: BTreeMap<usize, usize>,
    /// Last frame drawn on each attached page
    pub frames: BTreeMap<usize, PageFrame>,
    /// Pages whose surfaces were detached, in order
    pub detached: Vec<usize>,
}

/// Surface factory recording frames instead of drawing them
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurfaces {
    log: Arc<Mutex<HeadlessLog>>,
}

impl HeadlessSurfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the shared draw log
    pub fn inspect<R>(&self, f: impl FnOnce(&HeadlessLog) -> R) -> Option<R> {
        self.log.lock().ok().map(|log| f(&log))
    }

    /// Last frame drawn on `page`
    pub fn frame(&self, page: usize) -> Option<PageFrame> {
        self.inspect(|log| log.frames.get(&page).cloned()).flatten()
    }

    pub fn draws(&self) -> usize {
        self.inspect(|log| log.draws).unwrap_or(0)
    }
}

impl SurfaceFactory for HeadlessSurfaces {
    fn create(&mut self, page: usize) -> Box<dyn PageSurface> {
        log::trace!("Creating headless surface for page {}", page);
        Box::new(HeadlessSurface {
            page,
            log: Arc::clone(&self.log),
        })
    }
}

struct HeadlessSurface {
    page: usize,
    log: Arc<Mutex<HeadlessLog>>,
}

impl PageSurface for HeadlessSurface {
    fn draw(&mut self, frame: &PageFrame) {
        if let Ok(mut log) = self.log.lock() {
            log.draws += 1;
            *log.draws_per_page.entry(self.page).or_default() += 1;
            log.frames.insert(self.page, frame.clone());
        }
    }

    fn detach(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.frames.remove(&self.page);
            log.detached.push(self.page);
        }
    }
}
