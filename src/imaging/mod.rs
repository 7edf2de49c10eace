//! Stamp rendering in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Placement** | [`fit_to_box`], [`place_with_transform`] (pure math) |
//! | **Image layer** | `image::imageops::crop_imm` + `resize` + `overlay` |
//! | **Text layer** | [`TextBackend`] coverage mask, disk-dilated stroke, source-over fill |
//! | **Encode** | `image` PNG encoder |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for placement math (unit testable)
//! - **Parameters**: Data structures describing render settings
//! - **Backend**: [`TextBackend`] trait + [`GlyphBackend`]
//! - **Operations**: High-level functions drawing a stamp onto a surface

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{GlyphMask, TextBackend};
pub use calculations::{
    Fit, Placement, fit_to_box, initial_transform, place, place_with_transform,
};
pub use operations::{
    EncodeError, encode_png, render_fitted, render_new, render_stamp, render_thumbnail,
};
pub use params::{ImageMode, RenderParams, Resample};
pub use rust_backend::{FontBook, FontError, GlyphBackend};
