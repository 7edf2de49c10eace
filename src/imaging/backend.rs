//! Text backend trait and the glyph coverage mask it produces.
//!
//! The [`TextBackend`] trait covers the two things the engine needs from a
//! font stack: how wide a caption is (for hit testing) and which pixels its
//! glyphs cover (for drawing). Stroking and color compositing happen in
//! [`operations`](super::operations) on top of the mask, so every backend gets
//! identical stroke/fill behaviour.
//!
//! The production implementation is
//! [`GlyphBackend`](super::rust_backend::GlyphBackend), built on `ab_glyph`.

use crate::stamp::{FontStyle, MAX_STROKE_WIDTH};
use crate::types::Point;
use std::collections::VecDeque;

/// Per-pixel glyph coverage (0.0..=1.0) positioned in surface pixels.
///
/// `left`/`top` may be negative or past the surface edge; drawing clips.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphMask {
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
    coverage: Vec<f32>,
}

impl GlyphMask {
    /// An empty (all zero) mask.
    pub fn new(left: i64, top: i64, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
            coverage: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.coverage[y as usize * self.width as usize + x as usize]
    }

    /// Raise coverage at `(x, y)` to at least `value`. Out of range is ignored.
    pub fn accumulate(&mut self, x: u32, y: u32, value: f32) {
        if x < self.width && y < self.height {
            let cell = &mut self.coverage[y as usize * self.width as usize + x as usize];
            *cell = cell.max(value.clamp(0.0, 1.0));
        }
    }

    pub fn is_blank(&self) -> bool {
        self.coverage.iter().all(|&c| c <= 0.0)
    }

    /// Grow the covered area by a disk of `radius` pixels.
    ///
    /// A stroke of line width `2 * radius` centered on the glyph outline
    /// reaches `radius` pixels outside it; the inside half is covered by the
    /// fill drawn afterwards. `radius` is capped at [`MAX_STROKE_WIDTH`].
    pub fn dilate(&self, radius: u32) -> GlyphMask {
        let radius = radius.min(MAX_STROKE_WIDTH);
        if radius == 0 || self.width == 0 || self.height == 0 {
            return self.clone();
        }
        let r = radius as usize;
        let width = self.width as usize;
        let mut out = GlyphMask::new(
            self.left - r as i64,
            self.top - r as i64,
            self.width + 2 * radius,
            self.height + 2 * radius,
        );
        let out_width = out.width as usize;

        // Each disk row is a horizontal span; `reach[d]` is its half width
        // `d` rows away from the center.
        let reach: Vec<usize> = (0..=r).map(|d| (r * r - d * d).isqrt()).collect();
        for (y, row) in self.coverage.chunks_exact(width).enumerate() {
            if row.iter().all(|&c| c <= 0.0) {
                continue;
            }
            let mut spans: Vec<Option<Vec<f32>>> = vec![None; r + 1];
            for dy in 0..=2 * r {
                let half = reach[dy.abs_diff(r)];
                let span = spans[half].get_or_insert_with(|| spread_row(row, r, half));
                let target = &mut out.coverage[(y + dy) * out_width..][..out_width];
                for (cell, &value) in target.iter_mut().zip(span.iter()) {
                    *cell = cell.max(value);
                }
            }
        }
        out
    }
}

/// Sliding maximum along one row. Output cell `i` is the maximum of
/// `row[i - pad - half ..= i - pad + half]`, and the output is `pad` cells
/// wider than `row` on each side. Requires `half <= pad`.
fn spread_row(row: &[f32], pad: usize, half: usize) -> Vec<f32> {
    let len = row.len() + 2 * pad;
    let mut out = vec![0.0; len];
    // Indices into `row` with decreasing values.
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut next = 0;
    for (i, cell) in out.iter_mut().enumerate() {
        let center = i as isize - pad as isize;
        while next < row.len() && next as isize <= center + half as isize {
            while window.back().is_some_and(|&b| row[b] <= row[next]) {
                window.pop_back();
            }
            window.push_back(next);
            next += 1;
        }
        while window
            .front()
            .is_some_and(|&f| (f as isize) < center - half as isize)
        {
            window.pop_front();
        }
        *cell = window.front().map_or(0.0, |&f| row[f]);
    }
    out
}

/// Font measurement and glyph rasterization.
///
/// `Sync` so exports can render items in parallel.
pub trait TextBackend: Sync {
    /// Advance width of `text` in pixels, or `None` if no face is available
    /// for `font.family`.
    fn measure(&self, text: &str, font: &FontStyle) -> Option<f32>;

    /// Coverage of `text` laid out on one line, centered on `center` on both
    /// axes. `None` when nothing can be drawn.
    fn rasterize(&self, text: &str, font: &FontStyle, center: Point) -> Option<GlyphMask>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fixed-advance backend: every char is `size / 2` wide and covers a full
    /// `size`-tall box. Records calls so tests can assert what was drawn.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockTextBackend {
        pub calls: Mutex<Vec<RecordedCall>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedCall {
        Measure(String),
        Rasterize { text: String, center: Point },
    }

    impl MockTextBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn width_of(text: &str, font: &FontStyle) -> f32 {
            text.chars().count() as f32 * font.size as f32 / 2.0
        }
    }

    impl TextBackend for MockTextBackend {
        fn measure(&self, text: &str, font: &FontStyle) -> Option<f32> {
            self.calls
                .lock()
                .unwrap()
                .push(RecordedCall::Measure(text.to_string()));
            Some(Self::width_of(text, font))
        }

        fn rasterize(&self, text: &str, font: &FontStyle, center: Point) -> Option<GlyphMask> {
            self.calls.lock().unwrap().push(RecordedCall::Rasterize {
                text: text.to_string(),
                center,
            });
            let width = Self::width_of(text, font).round() as u32;
            let height = font.size;
            if width == 0 || height == 0 {
                return None;
            }
            let left = (center.x - width as f64 / 2.0).round() as i64;
            let top = (center.y - height as f64 / 2.0).round() as i64;
            let mut mask = GlyphMask::new(left, top, width, height);
            for y in 0..height {
                for x in 0..width {
                    mask.accumulate(x, y, 1.0);
                }
            }
            Some(mask)
        }
    }

    #[test]
    fn mock_measures_half_em_per_char() {
        let backend = MockTextBackend::new();
        let width = backend.measure("Hi", &FontStyle::default()).unwrap();
        assert_eq!(width, 40.0);
        assert_eq!(backend.get_calls(), vec![RecordedCall::Measure("Hi".into())]);
    }

    #[test]
    fn mock_rasterizes_centered_box() {
        let backend = MockTextBackend::new();
        let mask = backend
            .rasterize("Hi", &FontStyle::default(), Point::new(100.0, 100.0))
            .unwrap();
        assert_eq!((mask.left, mask.top), (80, 80));
        assert_eq!((mask.width, mask.height), (40, 40));
        assert!(!mask.is_blank());
    }

    #[test]
    fn accumulate_keeps_maximum_and_clamps() {
        let mut mask = GlyphMask::new(0, 0, 2, 2);
        mask.accumulate(0, 0, 0.5);
        mask.accumulate(0, 0, 0.25);
        mask.accumulate(1, 1, 3.0);
        mask.accumulate(5, 5, 1.0);
        assert_eq!(mask.get(0, 0), 0.5);
        assert_eq!(mask.get(1, 1), 1.0);
    }

    #[test]
    fn dilate_grows_by_radius() {
        let mut mask = GlyphMask::new(10, 20, 1, 1);
        mask.accumulate(0, 0, 1.0);
        let grown = mask.dilate(2);
        assert_eq!((grown.left, grown.top), (8, 18));
        assert_eq!((grown.width, grown.height), (5, 5));
        // Disk, not square: center row is full, corners stay empty.
        assert_eq!(grown.get(0, 2), 1.0);
        assert_eq!(grown.get(4, 2), 1.0);
        assert_eq!(grown.get(2, 0), 1.0);
        assert_eq!(grown.get(0, 0), 0.0);
        assert_eq!(grown.get(4, 4), 0.0);
    }

    #[test]
    fn dilate_matches_disk_at_larger_radius() {
        let mut mask = GlyphMask::new(0, 0, 3, 2);
        mask.accumulate(0, 0, 0.4);
        mask.accumulate(2, 1, 0.9);
        let grown = mask.dilate(5);
        for y in 0..grown.height {
            for x in 0..grown.width {
                let mut expected = 0.0f32;
                for sy in 0..mask.height {
                    for sx in 0..mask.width {
                        let dx = x as i64 - 5 - sx as i64;
                        let dy = y as i64 - 5 - sy as i64;
                        if dx * dx + dy * dy <= 25 {
                            expected = expected.max(mask.get(sx, sy));
                        }
                    }
                }
                assert_eq!(grown.get(x, y), expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn dilate_caps_huge_radius() {
        let mut mask = GlyphMask::new(0, 0, 2, 1);
        mask.accumulate(0, 0, 1.0);
        let grown = mask.dilate(u32::MAX / 2);
        let cap = MAX_STROKE_WIDTH;
        assert_eq!((grown.left, grown.top), (-(cap as i64), -(cap as i64)));
        assert_eq!((grown.width, grown.height), (2 + 2 * cap, 1 + 2 * cap));
    }

    #[test]
    fn dilate_zero_is_identity() {
        let mut mask = GlyphMask::new(0, 0, 3, 1);
        mask.accumulate(1, 0, 0.7);
        assert_eq!(mask.dilate(0), mask);
    }
}
