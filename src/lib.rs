//! # Stamp Studio
//!
//! Composes a batch of images into sticker stamps. Each image gets a
//! pan/zoom transform and an optional styled caption on a fixed 370×320
//! editing surface; the batch is then exported as PNGs at the fixed stamp
//! sizes together with a main icon and a tab icon.
//!
//! # Architecture
//!
//! ```text
//! pointer events ──► interaction ──► workspace ──► imaging ──► editing canvas
//!                                       │
//!                                       └── snapshot ──► export ──► zip archive
//! ```
//!
//! The [`workspace`] owns every piece of editing state. [`interaction`] and the
//! slider/text controls of [`editor`] are the only things that mutate it;
//! [`imaging`] only reads items and draws them, and [`export`] works on a copy
//! taken when the export starts.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Geometry primitives, surface sizes, colors |
//! | [`stamp`] | `StampItem`, its font style and transform |
//! | [`workspace`] | The item store plus active / main-icon / tab-icon selections |
//! | [`imaging`] | Fit/placement math, the render pipeline, glyph rasterization |
//! | [`interaction`] | Drag state machine and hit testing on the editing surface |
//! | [`editor`] | Editing session redrawing the canvas and icon previews |
//! | [`export`] | Batch render, PNG encode, ordered archive output |
//! | [`intake`] | Decoding input files, skipping the ones that fail |
//! | [`config`] | `config.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Replay vs. Refit
//!
//! Per-item files replay the stored transform on a surface of the editing
//! size, so they look exactly like the editing canvas. The main and tab
//! icons ignore the transform and re-fit the raw image to their own sizes,
//! without a caption. The two paths are deliberately different entry points
//! ([`imaging::render_stamp`] and [`imaging::render_fitted`]).
//!
//! ## Pure-Rust Text
//!
//! Captions are rasterized with `ab_glyph` from font files named in the
//! config. There is no system font lookup: an unknown family falls back to
//! the configured default, and with no fonts at all captions are skipped
//! with a warning.

pub mod config;
pub mod editor;
pub mod export;
pub mod imaging;
pub mod intake;
pub mod interaction;
pub mod output;
pub mod stamp;
pub mod types;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_helpers;
