//! Shared test utilities for the stamp-studio test suite.
//!
//! Provides fixture bitmaps, ready-made items and workspaces, and encoded
//! image bytes for intake tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let ws = loaded_workspace(3);
//! let item = stamp_item(solid_bitmap(10, 10, RED), Transform::default());
//! ```

use std::sync::Arc;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::stamp::{FontStyle, StampItem, Transform};
use crate::types::{Bitmap, Point};
use crate::workspace::Workspace;

// =========================================================================
// Bitmaps
// =========================================================================

/// A bitmap filled with one color.
pub fn solid_bitmap(width: u32, height: u32, color: Rgba<u8>) -> Bitmap {
    Arc::new(RgbaImage::from_pixel(width, height, color))
}

/// A bitmap whose pixels all differ, so crops and offsets are visible.
pub fn gradient_bitmap(width: u32, height: u32) -> Bitmap {
    Arc::new(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    }))
}

/// Encode a bitmap in the given container format.
pub fn encoded(bitmap: &RgbaImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(bitmap.clone())
        .to_rgb8()
        .write_to(&mut bytes, format)
        .unwrap();
    bytes.into_inner()
}

// =========================================================================
// Items and workspaces
// =========================================================================

/// An item with no caption, default font and the given transform.
pub fn stamp_item(image: Bitmap, transform: Transform) -> StampItem {
    StampItem {
        image,
        text: String::new(),
        font: FontStyle::default(),
        text_position: Point::new(185.0, 270.0),
        transform,
    }
}

/// A default workspace loaded with `count` distinct 200x100 images.
pub fn loaded_workspace(count: usize) -> Workspace {
    let mut ws = Workspace::default();
    ws.load_batch(
        (0..count)
            .map(|i| solid_bitmap(200, 100, Rgba([(i * 40 % 256) as u8, 0, 0, 255])))
            .collect(),
    );
    ws
}
