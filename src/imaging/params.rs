//! Parameter types for render operations.
//!
//! These structs describe *what* to draw, not *how*. They sit between the
//! high-level [`operations`](super::operations) (which decide what each
//! surface shows) and the pixel work, so the same item renders identically
//! wherever the same parameters are used.
//!
//! ## Types
//!
//! - [`Resample`]: Filter used when scaling the image layer (default Lanczos3).
//! - [`RenderParams`]: Everything a render call needs besides the item and surface.
//! - [`ImageMode`]: Replay the stored transform, or re-fit to the surface.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Resampling filter for the image layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resample {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl Resample {
    pub fn filter(self) -> FilterType {
        match self {
            Resample::Nearest => FilterType::Nearest,
            Resample::Triangle => FilterType::Triangle,
            Resample::CatmullRom => FilterType::CatmullRom,
            Resample::Gaussian => FilterType::Gaussian,
            Resample::Lanczos3 => FilterType::Lanczos3,
        }
    }

    /// Kernel radius in source pixels when magnifying. Zero for nearest.
    pub(crate) fn support(self) -> f32 {
        match self {
            Resample::Nearest => 0.0,
            Resample::Triangle => 1.0,
            Resample::CatmullRom => 2.0,
            Resample::Gaussian | Resample::Lanczos3 => 3.0,
        }
    }

    /// Unnormalized kernel weight `x` source pixels from the sample point.
    ///
    /// Same kernels as the `image` crate's [`FilterType`]s.
    pub(crate) fn weight(self, x: f32) -> f32 {
        let a = x.abs();
        match self {
            Resample::Nearest => {
                if a < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Resample::Triangle => (1.0 - a).max(0.0),
            Resample::CatmullRom => {
                if a < 1.0 {
                    (1.5 * a - 2.5) * a * a + 1.0
                } else if a < 2.0 {
                    ((-0.5 * a + 2.5) * a - 4.0) * a + 2.0
                } else {
                    0.0
                }
            }
            Resample::Gaussian => {
                if a < 3.0 {
                    (-2.0 * a * a).exp()
                } else {
                    0.0
                }
            }
            Resample::Lanczos3 => {
                if a < 3.0 {
                    sinc(a) * sinc(a / 3.0)
                } else {
                    0.0
                }
            }
        }
    }
}

fn sinc(x: f32) -> f32 {
    if x == 0.0 {
        1.0
    } else {
        let px = std::f32::consts::PI * x;
        px.sin() / px
    }
}

/// How the image layer is placed on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    /// Use the item's stored scale and pan as-is (editing, per-item export,
    /// thumbnails).
    Replay,
    /// Ignore the stored transform and fit the image to this surface
    /// (main/tab icons and their previews).
    Refit,
}

/// Shared render settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderParams {
    pub resample: Resample,
}
