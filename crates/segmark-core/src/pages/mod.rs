//! Page virtualization of the timeline
//!
//! The timeline is cut into fixed-size pages, each owning its drawing
//! surfaces. Pages exist contiguously from index 0: asking for page `n`
//! creates every missing page below it first. Pages at or beyond the
//! required count are detached by [`PageCache::render_all`].

mod frame;
mod headless;

use crate::coords::merge_unique;
use crate::types::Interval;

pub use frame::{LaneSpan, PageFrame, PitchBar, RenderContext, TrackLane, WaveColumn};
pub use headless::{HeadlessLog, HeadlessSurfaces};

/// Drawing target of one page
pub trait PageSurface: Send {
    fn draw(&mut self, frame: &PageFrame);

    /// Remove the surface from the display; it is dropped afterwards
    fn detach(&mut self);
}

/// Creates the surfaces of a newly materialized page
pub trait SurfaceFactory: Send {
    fn create(&mut self, page: usize) -> Box<dyn PageSurface>;
}

struct Page {
    surface: Box<dyn PageSurface>,
    last: Option<PageFrame>,
}

pub struct PageCache {
    factory: Box<dyn SurfaceFactory>,
    pages: Vec<Page>,
}

impl PageCache {
    pub fn new(factory: Box<dyn SurfaceFactory>) -> Self {
        Self {
            factory,
            pages: Vec::new(),
        }
    }

    /// Number of materialized pages (always `0..len`)
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Last frame drawn on page `n`
    pub fn frame(&self, n: usize) -> Option<&PageFrame> {
        self.pages.get(n).and_then(|p| p.last.as_ref())
    }

    /// Materialize pages `0..=n`
    fn ensure(&mut self, n: usize) -> &mut Page {
        while self.pages.len() <= n {
            let index = self.pages.len();
            self.pages.push(Page {
                surface: self.factory.create(index),
                last: None,
            });
        }
        &mut self.pages[n]
    }

    /// Draw page `n`, creating it and every page below it if needed
    ///
    /// Returns false when the derived frame is unchanged and nothing was
    /// drawn.
    pub fn render(&mut self, n: usize, ctx: &RenderContext<'_>) -> bool {
        let frame = ctx.frame(n);
        let page = self.ensure(n);
        if page.last.as_ref() == Some(&frame) {
            return false;
        }
        page.surface.draw(&frame);
        page.last = Some(frame);
        true
    }

    /// Render every required page and detach the rest
    ///
    /// Returns the required page count.
    pub fn render_all(&mut self, ctx: &RenderContext<'_>) -> usize {
        let count = ctx.page_count();
        for n in 0..count {
            self.render(n, ctx);
        }
        for mut page in self.pages.drain(count.min(self.pages.len())..) {
            page.surface.detach();
        }
        log::debug!("Rendered {} page(s)", count);
        count
    }

    /// Re-render only the pages touched by the old or new selection
    ///
    /// Returns the pages that were considered, ascending.
    pub fn refresh_affected(
        &mut self,
        old: Option<Interval>,
        new: Option<Interval>,
        ctx: &RenderContext<'_>,
    ) -> Vec<usize> {
        let pages = merge_unique(&ctx.mapper.pages_for(old), &ctx.mapper.pages_for(new));
        self.refresh_pages(&pages, ctx);
        pages
    }

    /// Re-render the listed pages that lie within the timeline
    pub fn refresh_pages(&mut self, pages: &[usize], ctx: &RenderContext<'_>) {
        let count = ctx.page_count();
        for &n in pages.iter().filter(|&&n| n < count) {
            self.render(n, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CoordinateMapper;
    use crate::peaks::RenderSamples;
    use crate::tracks::TrackSet;

    struct Fixture {
        samples: RenderSamples,
        tracks: TrackSet,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                samples: RenderSamples::default(),
                tracks: TrackSet::with_mutable("conversations"),
            }
        }

        fn ctx(&self, total: i64, selection: Option<Interval>) -> RenderContext<'_> {
            RenderContext {
                mapper: CoordinateMapper::new(100, 10, 100),
                width: 100,
                gain: 1.0,
                total_samples: total,
                samples: &self.samples,
                selection,
                cursor: None,
                tracks: &self.tracks,
                pitch: None,
            }
        }
    }

    #[test]
    fn test_render_creates_lower_pages() {
        let surfaces = HeadlessSurfaces::new();
        let mut cache = PageCache::new(Box::new(surfaces.clone()));
        let fixture = Fixture::new();
        assert!(cache.render(3, &fixture.ctx(1000, None)));
        assert_eq!(cache.len(), 4);
        // only page 3 was drawn
        assert_eq!(surfaces.draws(), 1);
    }

    #[test]
    fn test_render_is_idempotent() {
        let surfaces = HeadlessSurfaces::new();
        let mut cache = PageCache::new(Box::new(surfaces.clone()));
        let fixture = Fixture::new();
        let ctx = fixture.ctx(1000, Interval::new(10, 20));
        assert!(cache.render(0, &ctx));
        assert!(!cache.render(0, &ctx));
        assert_eq!(surfaces.draws(), 1);

        assert!(cache.render(0, &fixture.ctx(1000, Interval::new(10, 30))));
        assert_eq!(surfaces.draws(), 2);
    }

    #[test]
    fn test_render_all_shrinks() {
        let surfaces = HeadlessSurfaces::new();
        let mut cache = PageCache::new(Box::new(surfaces.clone()));
        let fixture = Fixture::new();
        assert_eq!(cache.render_all(&fixture.ctx(1000, None)), 10);
        assert_eq!(cache.len(), 10);

        assert_eq!(cache.render_all(&fixture.ctx(350, None)), 4);
        assert_eq!(cache.len(), 4);
        assert!(cache.frame(4).is_none());
        let detached = surfaces.inspect(|log| log.detached.clone()).unwrap();
        assert_eq!(detached, vec![4, 5, 6, 7, 8, 9]);
        assert!(surfaces.frame(9).is_none());
    }

    #[test]
    fn test_refresh_affected_redraws_delta_only() {
        let surfaces = HeadlessSurfaces::new();
        let mut cache = PageCache::new(Box::new(surfaces.clone()));
        let fixture = Fixture::new();
        cache.render_all(&fixture.ctx(1000, Interval::new(150, 250)));
        let before = surfaces.draws();

        let old = Interval::new(150, 250);
        let new = Interval::new(150, 420);
        let pages = cache.refresh_affected(old, new, &fixture.ctx(1000, new));
        assert_eq!(pages, vec![1, 2, 3, 4]);
        // page 1 keeps the same local highlight, pages 2..=4 change
        assert_eq!(surfaces.draws() - before, 3);
        let counts = surfaces.inspect(|log| log.draws_per_page.clone()).unwrap();
        assert_eq!(counts[&0], 1);
        assert_eq!(counts[&5], 1);
    }

    #[test]
    fn test_refresh_skips_pages_past_end() {
        let surfaces = HeadlessSurfaces::new();
        let mut cache = PageCache::new(Box::new(surfaces.clone()));
        let fixture = Fixture::new();
        cache.refresh_affected(None, Interval::new(150, 900), &fixture.ctx(300, Interval::new(150, 900)));
        assert_eq!(cache.len(), 3);
    }
}
