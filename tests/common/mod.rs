//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use image::{ImageFormat, Rgba, RgbaImage};
use stamp_studio::imaging::{GlyphMask, TextBackend};
use stamp_studio::stamp::FontStyle;
use stamp_studio::types::Point;
use std::path::{Path, PathBuf};

/// Every char advances half an em and fills a full em-tall box, so caption
/// geometry is predictable without font files.
pub struct FixedAdvance;

impl FixedAdvance {
    pub fn width_of(text: &str, font: &FontStyle) -> f32 {
        text.chars().count() as f32 * font.size as f32 / 2.0
    }
}

impl TextBackend for FixedAdvance {
    fn measure(&self, text: &str, font: &FontStyle) -> Option<f32> {
        Some(Self::width_of(text, font))
    }

    fn rasterize(&self, text: &str, font: &FontStyle, center: Point) -> Option<GlyphMask> {
        let width = Self::width_of(text, font).round() as u32;
        if width == 0 || font.size == 0 {
            return None;
        }
        let left = (center.x - width as f64 / 2.0).round() as i64;
        let top = (center.y - font.size as f64 / 2.0).round() as i64;
        let mut mask = GlyphMask::new(left, top, width, font.size);
        for y in 0..font.size {
            for x in 0..width {
                mask.accumulate(x, y, 1.0);
            }
        }
        Some(mask)
    }
}

/// Write a solid-color PNG and return its path.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32, color: Rgba<u8>) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(width, height, color)
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}
