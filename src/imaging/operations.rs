//! High-level render operations.
//!
//! These functions combine the placement math in
//! [`calculations`](super::calculations) with pixel work on an
//! [`RgbaImage`] surface. A render always clears first, then draws the image
//! layer, then (for replayed renders) the text layer, so the result depends
//! only on the item, the surface size and the [`RenderParams`].

use super::backend::{GlyphMask, TextBackend};
use super::calculations::{Placement, fit_to_box, place};
use super::params::{ImageMode, RenderParams, Resample};
use crate::stamp::StampItem;
use crate::types::{Color, SurfaceSize};
use image::{ImageFormat, Pixel, Rgba, RgbaImage, imageops};
use std::io::Cursor;
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("PNG encoding failed: {0}")]
    Png(#[from] image::ImageError),
    #[error("encoder produced no data")]
    Empty,
}

/// Reset every pixel to fully transparent.
pub fn clear(surface: &mut RgbaImage) {
    surface.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
}

/// Draw a stamp onto `surface`, replaying its stored transform.
///
/// The surface's own size is used for centering, so smaller export surfaces
/// show a re-centered crop of the same pan/zoom rather than a re-fit.
pub fn render_stamp(
    surface: &mut RgbaImage,
    item: &StampItem,
    text: &impl TextBackend,
    params: &RenderParams,
) {
    clear(surface);
    let placement = place(item.image_size(), SurfaceSize::of(surface), &item.transform);
    draw_bitmap(surface, &item.image, placement, params);
    draw_text(surface, item, text);
}

/// Draw only the image, freshly fitted to `surface` and ignoring any stored
/// transform. Used for the main/tab icons and their previews.
///
/// The caption is never drawn here: icons carry the bare image, whatever
/// text the item has.
pub fn render_fitted(surface: &mut RgbaImage, image: &RgbaImage, params: &RenderParams) {
    clear(surface);
    let (w, h) = image.dimensions();
    let (sw, sh) = surface.dimensions();
    let fit = fit_to_box(w, h, sw, sh);
    let placement = Placement {
        x: fit.x,
        y: fit.y,
        width: fit.width,
        height: fit.height,
    };
    draw_bitmap(surface, image, placement, params);
}

/// Render onto a fresh surface of `size`.
pub fn render_new(
    size: SurfaceSize,
    item: &StampItem,
    mode: ImageMode,
    text: &impl TextBackend,
    params: &RenderParams,
) -> RgbaImage {
    let mut surface = size.blank();
    match mode {
        ImageMode::Replay => render_stamp(&mut surface, item, text, params),
        ImageMode::Refit => render_fitted(&mut surface, &item.image, params),
    }
    surface
}

/// Thumbnail-strip render: the stored transform replayed at thumbnail size.
pub fn render_thumbnail(
    item: &StampItem,
    text: &impl TextBackend,
    params: &RenderParams,
) -> RgbaImage {
    render_new(SurfaceSize::THUMBNAIL, item, ImageMode::Replay, text, params)
}

/// Encode a surface as PNG bytes.
pub fn encode_png(surface: &RgbaImage) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Cursor::new(Vec::new());
    surface.write_to(&mut bytes, ImageFormat::Png)?;
    let bytes = bytes.into_inner();
    if bytes.is_empty() {
        return Err(EncodeError::Empty);
    }
    Ok(bytes)
}

/// Draw `bitmap` scaled into `placement`, clipped to the surface.
///
/// Shrinking resizes only the source region that can reach the surface.
/// Magnifying samples each visible surface pixel instead, so neither path
/// allocates more than the visible area at any zoom.
fn draw_bitmap(
    surface: &mut RgbaImage,
    bitmap: &RgbaImage,
    placement: Placement,
    params: &RenderParams,
) {
    let (bw, bh) = bitmap.dimensions();
    let (sw, sh) = surface.dimensions();
    if bw == 0 || bh == 0 || placement.width <= 0.0 || placement.height <= 0.0 {
        return;
    }
    let scale_x = placement.width / bw as f64;
    let scale_y = placement.height / bh as f64;
    if scale_x > 1.0 || scale_y > 1.0 {
        draw_magnified(surface, bitmap, placement, params.resample);
        return;
    }

    // Visible part of the drawn box, in surface pixels.
    let vx0 = placement.x.max(0.0);
    let vy0 = placement.y.max(0.0);
    let vx1 = (placement.x + placement.width).min(sw as f64);
    let vy1 = (placement.y + placement.height).min(sh as f64);
    if vx1 <= vx0 || vy1 <= vy0 {
        return;
    }

    // Back to source pixels, widened to whole pixels.
    let sx0 = ((vx0 - placement.x) / scale_x).floor().max(0.0) as u32;
    let sy0 = ((vy0 - placement.y) / scale_y).floor().max(0.0) as u32;
    if sx0 >= bw || sy0 >= bh {
        return;
    }
    let sx1 = (((vx1 - placement.x) / scale_x).ceil() as u32).clamp(sx0 + 1, bw);
    let sy1 = (((vy1 - placement.y) / scale_y).ceil() as u32).clamp(sy0 + 1, bh);

    let dest_x = placement.x + sx0 as f64 * scale_x;
    let dest_y = placement.y + sy0 as f64 * scale_y;
    let dest_w = ((sx1 - sx0) as f64 * scale_x).round().max(1.0) as u32;
    let dest_h = ((sy1 - sy0) as f64 * scale_y).round().max(1.0) as u32;

    let crop = imageops::crop_imm(bitmap, sx0, sy0, sx1 - sx0, sy1 - sy0).to_image();
    let scaled = if crop.dimensions() == (dest_w, dest_h) {
        crop
    } else {
        imageops::resize(&crop, dest_w, dest_h, params.resample.filter())
    };
    imageops::overlay(
        surface,
        &scaled,
        dest_x.round() as i64,
        dest_y.round() as i64,
    );
}

/// Source pixels contributing to one surface pixel along one axis.
struct Taps {
    start: u32,
    weights: Vec<f32>,
}

impl Taps {
    /// Taps for surface pixel `dest`, where source pixel 0 starts at `origin`
    /// and each source pixel spans `scale` surface pixels.
    fn at(dest: u32, origin: f64, scale: f64, len: u32, resample: Resample) -> Taps {
        let last = len - 1;
        let center = (dest as f64 + 0.5 - origin) / scale - 0.5;
        let nearest = || Taps {
            start: (center + 0.5).floor().clamp(0.0, last as f64) as u32,
            weights: vec![1.0],
        };
        let support = resample.support() as f64;
        if support == 0.0 {
            return nearest();
        }
        let lo = (center - support).ceil().clamp(0.0, last as f64) as u32;
        let hi = (center + support).floor().clamp(0.0, last as f64) as u32;
        let mut weights: Vec<f32> = (lo..=hi)
            .map(|i| resample.weight((i as f64 - center) as f32))
            .collect();
        let sum: f32 = weights.iter().sum();
        if sum.abs() < 1e-6 {
            return nearest();
        }
        weights.iter_mut().for_each(|w| *w /= sum);
        Taps { start: lo, weights }
    }

    fn end(&self) -> u32 {
        self.start + self.weights.len() as u32
    }
}

/// Surface pixels whose centers fall inside `[origin, origin + extent)`,
/// clipped to `0..limit`.
fn pixel_span(origin: f64, extent: f64, limit: u32) -> Range<u32> {
    let start = origin.round().clamp(0.0, limit as f64) as u32;
    let end = (origin + extent).round().clamp(0.0, limit as f64) as u32;
    start..end.max(start)
}

/// Magnified image layer: every visible surface pixel is mapped back into the
/// source and filtered there, first down the columns, then along the rows.
fn draw_magnified(
    surface: &mut RgbaImage,
    bitmap: &RgbaImage,
    placement: Placement,
    resample: Resample,
) {
    let (bw, bh) = bitmap.dimensions();
    let (sw, sh) = surface.dimensions();
    let scale_x = placement.width / bw as f64;
    let scale_y = placement.height / bh as f64;
    let xs = pixel_span(placement.x, placement.width, sw);
    let ys = pixel_span(placement.y, placement.height, sh);
    if xs.is_empty() || ys.is_empty() {
        return;
    }

    let col_taps: Vec<Taps> = xs
        .clone()
        .map(|x| Taps::at(x, placement.x, scale_x, bw, resample))
        .collect();
    let row_taps: Vec<Taps> = ys
        .clone()
        .map(|y| Taps::at(y, placement.y, scale_y, bh, resample))
        .collect();
    let (Some(c0), Some(c1)) = (
        col_taps.iter().map(|t| t.start).min(),
        col_taps.iter().map(Taps::end).max(),
    ) else {
        return;
    };
    let cols = (c1 - c0) as usize;

    // Vertical pass, restricted to the source columns the row pass reads.
    let mut filtered = vec![[0.0f32; 4]; cols * row_taps.len()];
    for (taps, out) in row_taps.iter().zip(filtered.chunks_exact_mut(cols)) {
        for (k, &weight) in taps.weights.iter().enumerate() {
            let sy = taps.start + k as u32;
            for (ci, acc) in out.iter_mut().enumerate() {
                let px = bitmap.get_pixel(c0 + ci as u32, sy).0;
                for (a, p) in acc.iter_mut().zip(px) {
                    *a += p as f32 * weight;
                }
            }
        }
    }

    for (y, row) in ys.zip(filtered.chunks_exact(cols)) {
        for (x, taps) in xs.clone().zip(&col_taps) {
            let mut acc = [0.0f32; 4];
            let first = (taps.start - c0) as usize;
            for (&weight, px) in taps.weights.iter().zip(&row[first..]) {
                for (a, p) in acc.iter_mut().zip(px) {
                    *a += p * weight;
                }
            }
            let src = Rgba(acc.map(|v| v.round().clamp(0.0, 255.0) as u8));
            surface.get_pixel_mut(x, y).blend(&src);
        }
    }
}

/// Caption layer: stroke (if any) first, fill on top.
fn draw_text(surface: &mut RgbaImage, item: &StampItem, text: &impl TextBackend) {
    if !item.has_text() {
        return;
    }
    let Some(mask) = text.rasterize(&item.text, &item.font, item.text_position) else {
        log::warn!(
            "no glyphs drawn for {:?} in {}; is the font family loaded?",
            item.text,
            item.font.css()
        );
        return;
    };
    if item.font.stroke_width > 0 {
        let stroke = mask.dilate(item.font.stroke_width);
        composite_mask(surface, &stroke, item.font.stroke_color);
    }
    composite_mask(surface, &mask, item.font.color);
}

/// Source-over blend of `color`, weighted by mask coverage.
fn composite_mask(surface: &mut RgbaImage, mask: &GlyphMask, color: Color) {
    let (sw, sh) = surface.dimensions();
    for my in 0..mask.height {
        let y = mask.top + my as i64;
        if y < 0 || y >= sh as i64 {
            continue;
        }
        for mx in 0..mask.width {
            let x = mask.left + mx as i64;
            if x < 0 || x >= sw as i64 {
                continue;
            }
            let coverage = mask.get(mx, my);
            if coverage <= 0.0 {
                continue;
            }
            let dst = surface.get_pixel_mut(x as u32, y as u32);
            blend_over(dst, color, coverage);
        }
    }
}

fn blend_over(dst: &mut Rgba<u8>, color: Color, coverage: f32) {
    let [r, g, b, a] = color.0;
    let src_a = a as f32 / 255.0 * coverage.clamp(0.0, 1.0);
    let dst_a = dst.0[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    let mix = |s: u8, d: u8| {
        let v = (s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    *dst = Rgba([
        mix(r, dst.0[0]),
        mix(g, dst.0[1]),
        mix(b, dst.0[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]);
}
