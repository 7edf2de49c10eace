//! Pure placement math: how a bitmap lands on a surface.
//!
//! All functions here are pure and testable without any I/O or images. Both
//! the editing surface and every export surface go through
//! [`place_with_transform`], so identical inputs always land identically.

use crate::stamp::Transform;
use crate::types::{Rect, SurfaceSize, Vec2};

/// Result of fitting an image inside a box ("contain" fit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    /// Uniform scale from source pixels to box pixels.
    pub scale: f64,
    /// Top-left corner of the fitted image inside the box.
    pub x: f64,
    pub y: f64,
    /// Fitted image size.
    pub width: f64,
    pub height: f64,
}

impl Fit {
    pub fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Fit an image inside a box, preserving aspect ratio, then center it.
///
/// The scale is the largest one that keeps the image fully contained, so the
/// result touches the box on at least one axis (both when the aspect ratios
/// are equal). Upscales small images as well as downscaling large ones.
///
/// # Panics
/// On any zero dimension. Decoded bitmaps and the fixed surfaces never have one.
///
/// # Examples
/// ```
/// # use stamp_studio::imaging::fit_to_box;
/// // 800x400 onto the 370x320 editing surface
/// let fit = fit_to_box(800, 400, 370, 320);
/// assert_eq!(fit.scale, 0.4625);
/// assert_eq!(fit.height, 185.0);
/// assert_eq!(fit.y, 67.5);
/// ```
pub fn fit_to_box(image_w: u32, image_h: u32, box_w: u32, box_h: u32) -> Fit {
    assert!(
        image_w > 0 && image_h > 0 && box_w > 0 && box_h > 0,
        "fit_to_box needs non-zero dimensions (image {image_w}x{image_h}, box {box_w}x{box_h})"
    );

    let (iw, ih) = (image_w as f64, image_h as f64);
    let (bw, bh) = (box_w as f64, box_h as f64);

    let scale = (bw / iw).min(bh / ih);
    let width = iw * scale;
    let height = ih * scale;

    Fit {
        scale,
        x: (bw - width) / 2.0,
        y: (bh - height) / 2.0,
        width,
        height,
    }
}

/// Where a scaled and panned image is drawn on a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    pub fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Place an image with an explicit scale and pan.
///
/// The image is centered on the surface at `offset == (0, 0)`; the offset pans
/// relative to that center, not to the image's own origin.
///
/// ```
/// # use stamp_studio::imaging::place_with_transform;
/// # use stamp_studio::types::Vec2;
/// let p = place_with_transform(100, 100, 300, 300, 1.0, Vec2::new(10.0, -5.0));
/// assert_eq!((p.x, p.y), (110.0, 95.0));
/// ```
pub fn place_with_transform(
    image_w: u32,
    image_h: u32,
    surface_w: u32,
    surface_h: u32,
    scale: f64,
    offset: Vec2,
) -> Placement {
    let width = image_w as f64 * scale;
    let height = image_h as f64 * scale;
    Placement {
        x: (surface_w as f64 - width) / 2.0 + offset.dx,
        y: (surface_h as f64 - height) / 2.0 + offset.dy,
        width,
        height,
    }
}

/// [`place_with_transform`] for a stored [`Transform`] on a sized surface.
pub fn place(image: (u32, u32), surface: SurfaceSize, transform: &Transform) -> Placement {
    place_with_transform(
        image.0,
        image.1,
        surface.width,
        surface.height,
        transform.scale,
        transform.offset,
    )
}

/// The transform an image starts with (and returns to on reset): fitted and
/// centered on the surface, no pan.
pub fn initial_transform(image: (u32, u32), surface: SurfaceSize) -> Transform {
    let fit = fit_to_box(image.0, image.1, surface.width, surface.height);
    Transform::new(fit.scale, Vec2::ZERO)
}
