//! The per-image editing unit and its styling/transform state.

use crate::types::{Bitmap, Color, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Widest caption outline, in pixels.
pub const MAX_STROKE_WIDTH: u32 = 64;

/// Text styling for a stamp caption.
///
/// `size` is the em size in pixels, as in a CSS `"{size}px {family}"` font
/// shorthand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontStyle {
    pub family: String,
    pub size: u32,
    pub color: Color,
    pub stroke_width: u32,
    pub stroke_color: Color,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            family: "Arial".to_string(),
            size: 40,
            color: Color::WHITE,
            stroke_width: 2,
            stroke_color: Color::BLACK,
        }
    }
}

impl FontStyle {
    /// CSS font shorthand, e.g. `40px Arial`.
    pub fn css(&self) -> String {
        format!("{}px {}", self.size, self.family)
    }

    /// Merge a partial update in place. A zero size is ignored and stroke
    /// widths are capped at [`MAX_STROKE_WIDTH`].
    pub fn apply(&mut self, patch: FontPatch) {
        if let Some(family) = patch.family {
            self.family = family;
        }
        if let Some(size) = patch.size.filter(|&s| s > 0) {
            self.size = size;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(width) = patch.stroke_width {
            self.stroke_width = width.min(MAX_STROKE_WIDTH);
        }
        if let Some(color) = patch.stroke_color {
            self.stroke_color = color;
        }
    }
}

/// A partial [`FontStyle`] as reported by a single control edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontPatch {
    pub family: Option<String>,
    pub size: Option<u32>,
    pub color: Option<Color>,
    pub stroke_width: Option<u32>,
    pub stroke_color: Option<Color>,
}

impl FontPatch {
    pub fn family(family: impl Into<String>) -> Self {
        Self {
            family: Some(family.into()),
            ..Self::default()
        }
    }

    pub fn size(size: u32) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn color(color: Color) -> Self {
        Self {
            color: Some(color),
            ..Self::default()
        }
    }

    pub fn stroke_width(width: u32) -> Self {
        Self {
            stroke_width: Some(width),
            ..Self::default()
        }
    }

    pub fn stroke_color(color: Color) -> Self {
        Self {
            stroke_color: Some(color),
            ..Self::default()
        }
    }
}

/// Scale + pan applied on top of automatic centering.
///
/// `scale` maps source pixels to editing-surface pixels. `offset` is a pan in
/// editing-surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: f64,
    pub offset: Vec2,
}

impl Transform {
    pub fn new(scale: f64, offset: Vec2) -> Self {
        Self { scale, offset }
    }

    /// Change the scale, moving the offset proportionally so zoom stays
    /// anchored at the image's own center.
    pub fn zoomed(self, scale: f64) -> Self {
        Self {
            scale,
            offset: self.offset * (scale / self.scale),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

/// One uploaded image with its caption and placement.
#[derive(Debug, Clone)]
pub struct StampItem {
    pub image: Bitmap,
    pub text: String,
    pub font: FontStyle,
    /// Center of the caption's bounding box, in editing-surface coordinates.
    pub text_position: Point,
    pub transform: Transform,
}

impl StampItem {
    pub fn image_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}
