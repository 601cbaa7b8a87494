//! Coordinate conversions between the timeline's four spaces
//!
//! - **raw sample**: index on the global sample axis at the native rate
//! - **render sample**: index into the min/max downsampled peaks, a fixed
//!   number of blocks per second regardless of the source rate
//! - **page**: `floor(sample / page_size)`
//! - **pixel**: page-local offset, linear in the canvas width
//!
//! Everything here is pure. Page indices always floor, so converting a pixel
//! to a sample and back lands on the same page and the same pixel.

use std::ops::Range;

use serde::Serialize;

use crate::types::{Interval, SamplePos};

/// Page-local pixel span `[x0, x1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelSpan {
    pub x0: u32,
    pub x1: u32,
}

impl PixelSpan {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }
}

/// Stateless mapping parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    sample_rate: u32,
    blocks_per_second: u32,
    page_size: SamplePos,
}

impl CoordinateMapper {
    pub fn new(sample_rate: u32, blocks_per_second: u32, page_size: SamplePos) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            blocks_per_second: blocks_per_second.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn page_size(&self) -> SamplePos {
        self.page_size
    }

    /// Render samples per raw sample (two per block: min then max)
    pub fn render_per_sample(&self) -> f64 {
        (2 * self.blocks_per_second) as f64 / self.sample_rate as f64
    }

    pub fn sample_to_render(&self, sample: SamplePos) -> usize {
        (sample.max(0) * 2 * self.blocks_per_second as SamplePos / self.sample_rate as SamplePos) as usize
    }

    pub fn render_to_sample(&self, render: usize) -> SamplePos {
        render as SamplePos * self.sample_rate as SamplePos / (2 * self.blocks_per_second as SamplePos)
    }

    /// Render-sample slice covering an interval
    pub fn render_slice(&self, interval: Interval) -> Range<usize> {
        self.sample_to_render(interval.start)..self.sample_to_render(interval.end)
    }

    /// Render samples making up one full page
    pub fn render_per_page(&self) -> usize {
        self.sample_to_render(self.page_size).max(1)
    }

    pub fn page_of(&self, sample: SamplePos) -> usize {
        sample.max(0).div_euclid(self.page_size) as usize
    }

    /// Interval `[p * page_size, (p + 1) * page_size]` of page `p`
    pub fn page_interval(&self, page: usize) -> Interval {
        let start = page as SamplePos * self.page_size;
        Interval {
            start,
            end: start + self.page_size,
        }
    }

    /// Pages needed to show `total_samples`
    pub fn page_count(&self, total_samples: SamplePos) -> usize {
        if total_samples <= 0 {
            return 0;
        }
        ((total_samples + self.page_size - 1) / self.page_size) as usize
    }

    /// Every page touched by an interval, ascending
    pub fn pages_for(&self, interval: Option<Interval>) -> Vec<usize> {
        match interval {
            Some(iv) => (self.page_of(iv.start)..=self.page_of(iv.end)).collect(),
            None => Vec::new(),
        }
    }

    /// Part of `interval` falling on page `p`, as page-local pixels
    pub fn interval_to_pixels(&self, interval: Interval, page: usize, width: u32) -> Option<PixelSpan> {
        let page_iv = self.page_interval(page);
        let clipped = page_iv.intersection(&interval)?;
        let width = width as SamplePos;
        let x0 = ((clipped.start - page_iv.start) * width / self.page_size) as u32;
        let w = (clipped.size() * width / self.page_size) as u32;
        Some(PixelSpan { x0, x1: x0 + w })
    }

    /// Pixel column of a single position on page `p`
    pub fn sample_to_pixel(&self, sample: f64, page: usize, width: u32) -> Option<u32> {
        let pos = sample.round() as SamplePos;
        self.interval_to_pixels(Interval::point(pos), page, width)
            .map(|span| span.x0)
    }

    /// First sample whose pixel column on page `p` is `x`
    ///
    /// Exact inverse of [`sample_to_pixel`](Self::sample_to_pixel) as long as
    /// a page holds at least as many samples as the canvas has pixels.
    pub fn pixel_to_sample_start(&self, page: usize, x: u32, width: u32) -> SamplePos {
        let width = width.max(1) as SamplePos;
        let local = (x as SamplePos * self.page_size + width - 1) / width;
        page as SamplePos * self.page_size + local
    }

    /// Pointer offset on page `p` to a fractional global sample
    pub fn pixel_to_sample(&self, page: usize, offset_x: f64, width: u32, device_pixel_ratio: f64) -> f64 {
        let width = width.max(1) as f64;
        self.page_size as f64 * (page as f64 + (offset_x / width) * device_pixel_ratio)
    }
}

/// Merge two ascending page lists, dropping duplicates
pub fn merge_unique(xs: &[usize], ys: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(xs.len() + ys.len());
    let (mut x, mut y) = (0, 0);
    loop {
        let next = match (xs.get(x), ys.get(y)) {
            (Some(&a), Some(&b)) if a < b => {
                x += 1;
                a
            }
            (_, Some(&b)) => {
                y += 1;
                b
            }
            (Some(&a), None) => {
                x += 1;
                a
            }
            (None, None) => break,
        };
        if out.last() != Some(&next) {
            out.push(next);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> CoordinateMapper {
        CoordinateMapper::new(16000, 1600, 16000)
    }

    #[test]
    fn test_pages_for_interval() {
        let m = mapper();
        assert_eq!(m.pages_for(Interval::new(0, 32000)), vec![0, 1, 2]);
        assert_eq!(m.pages_for(Interval::new(100, 200)), vec![0]);
        assert!(m.pages_for(None).is_empty());
    }

    #[test]
    fn test_page_count() {
        let m = mapper();
        assert_eq!(m.page_count(0), 0);
        assert_eq!(m.page_count(1), 1);
        assert_eq!(m.page_count(16000), 1);
        assert_eq!(m.page_count(16001), 2);
    }

    #[test]
    fn test_render_density() {
        let m = mapper();
        // 1600 blocks per second at 16kHz: one render sample per 5 raw samples
        assert!((m.render_per_sample() - 0.2).abs() < 1e-12);
        assert_eq!(m.sample_to_render(16000), 3200);
        assert_eq!(m.render_to_sample(3200), 16000);
        assert_eq!(m.render_per_page(), 3200);

        let m44 = CoordinateMapper::new(44100, 1600, 44100);
        assert_eq!(m44.render_per_page(), 3200);
    }

    #[test]
    fn test_interval_to_pixels() {
        let m = mapper();
        let sel = Interval::new(8000, 24000).unwrap();
        assert_eq!(m.interval_to_pixels(sel, 0, 1600), Some(PixelSpan { x0: 800, x1: 1600 }));
        assert_eq!(m.interval_to_pixels(sel, 1, 1600), Some(PixelSpan { x0: 0, x1: 800 }));
        assert_eq!(m.interval_to_pixels(sel, 2, 1600), None);
    }

    #[test]
    fn test_pixel_round_trip_is_stable() {
        let m = CoordinateMapper::new(16000, 1600, 12345);
        let width = 1000;
        for page in 0..3 {
            for x in 0..width {
                let sample = m.pixel_to_sample_start(page, x, width);
                assert_eq!(m.page_of(sample), page);
                assert_eq!(m.sample_to_pixel(sample as f64, page, width), Some(x));
            }
        }

        let base = m.page_interval(1).start;
        for local in (0..12345).step_by(7) {
            let sample = base + local;
            let px = m.sample_to_pixel(sample as f64, 1, width).unwrap();
            let back = m.pixel_to_sample_start(1, px, width);
            assert!(back <= sample);
            assert_eq!(m.sample_to_pixel(back as f64, 1, width), Some(px));
        }
    }

    #[test]
    fn test_pointer_to_sample() {
        let m = mapper();
        assert_eq!(m.pixel_to_sample(1, 800.0, 1600, 1.0), 24000.0);
        assert_eq!(m.pixel_to_sample(0, 400.0, 1600, 2.0), 8000.0);
    }

    #[test]
    fn test_merge_unique() {
        assert_eq!(merge_unique(&[0, 1, 2], &[2, 3]), vec![0, 1, 2, 3]);
        assert_eq!(merge_unique(&[], &[4, 5]), vec![4, 5]);
        assert_eq!(merge_unique(&[1, 1, 3], &[]), vec![1, 3]);
        assert!(merge_unique(&[], &[]).is_empty());
    }
}
