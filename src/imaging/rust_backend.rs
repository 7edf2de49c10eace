//! Pure Rust text backend built on `ab_glyph`.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Load TTF/OTF faces | `ab_glyph::FontArc::try_from_vec` |
//! | Font directory scan | `walkdir` (`.ttf`, `.otf`; family = file stem) |
//! | Measure | `h_advance` + `kern` on a `PxScaleFont` |
//! | Rasterize | `Font::outline_glyph` + `OutlinedGlyph::draw` |

use super::backend::{GlyphMask, TextBackend};
use crate::stamp::FontStyle;
use crate::types::Point;
use ab_glyph::{Font, FontArc, Glyph, PxScale, ScaleFont, point};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a usable TrueType/OpenType font: {0}")]
    InvalidFont(PathBuf),
    #[error("failed to scan font directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Font faces by family name.
///
/// Lookups are case-insensitive. A family that is not present resolves to
/// the default family, if one is set and loaded.
#[derive(Clone, Default)]
pub struct FontBook {
    faces: BTreeMap<String, (String, FontArc)>,
    default_family: Option<String>,
}

impl fmt::Debug for FontBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families())
            .field("default_family", &self.default_family)
            .finish()
    }
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default_family(&mut self, family: impl Into<String>) {
        self.default_family = Some(family.into());
    }

    pub fn insert(&mut self, family: &str, face: FontArc) {
        self.faces
            .insert(family.to_lowercase(), (family.to_string(), face));
    }

    /// Load one font file under the given family name.
    pub fn load_file(&mut self, family: &str, path: &Path) -> Result<(), FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let face =
            FontArc::try_from_vec(bytes).map_err(|_| FontError::InvalidFont(path.to_path_buf()))?;
        self.insert(family, face);
        log::debug!("loaded font family {family:?} from {}", path.display());
        Ok(())
    }

    /// Load every `.ttf`/`.otf` below `dir`, named by file stem.
    ///
    /// Unreadable or invalid files are skipped with a warning. Returns the
    /// number of faces loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, FontError> {
        let mut loaded = 0;
        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            let is_font = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| FONT_EXTENSIONS.iter().any(|f| e.eq_ignore_ascii_case(f)));
            if !entry.file_type().is_file() || !is_font {
                continue;
            }
            let Some(family) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load_file(family, path) {
                Ok(()) => loaded += 1,
                Err(e) => log::warn!("skipping font: {e}"),
            }
        }
        Ok(loaded)
    }

    /// Family names in sorted order, as originally spelled.
    pub fn families(&self) -> Vec<&str> {
        self.faces.values().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn resolve(&self, family: &str) -> Option<&FontArc> {
        self.faces
            .get(&family.to_lowercase())
            .or_else(|| {
                self.default_family
                    .as_ref()
                    .and_then(|d| self.faces.get(&d.to_lowercase()))
            })
            .map(|(_, face)| face)
    }
}

/// Text backend over a [`FontBook`].
#[derive(Debug, Clone, Default)]
pub struct GlyphBackend {
    book: FontBook,
}

impl GlyphBackend {
    pub fn new(book: FontBook) -> Self {
        Self { book }
    }

    pub fn book(&self) -> &FontBook {
        &self.book
    }
}

/// `ab_glyph` scales by the ascent-to-descent height; a CSS pixel size is the
/// em size, so convert through units-per-em.
fn px_scale(face: &FontArc, size: u32) -> PxScale {
    let em = size as f32;
    match face.units_per_em() {
        Some(upm) if upm > 0.0 => PxScale::from(em * face.height_unscaled() / upm),
        _ => PxScale::from(em),
    }
}

struct LineLayout {
    glyphs: Vec<Glyph>,
    width: f32,
    ascent: f32,
    descent: f32,
}

/// Lay out one line starting at x = 0 on a baseline at y = 0.
fn layout_line(face: &FontArc, text: &str, scale: PxScale) -> LineLayout {
    let scaled = face.as_scaled(scale);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut caret = 0.0f32;
    let mut last = None;

    for ch in text.chars() {
        let id = face.glyph_id(ch);
        if let Some(prev) = last {
            caret += scaled.kern(prev, id);
        }
        glyphs.push(id.with_scale_and_position(scale, point(caret, 0.0)));
        caret += scaled.h_advance(id);
        last = Some(id);
    }

    LineLayout {
        glyphs,
        width: caret,
        ascent: scaled.ascent(),
        descent: scaled.descent(),
    }
}

impl TextBackend for GlyphBackend {
    fn measure(&self, text: &str, font: &FontStyle) -> Option<f32> {
        let face = self.book.resolve(&font.family)?;
        Some(layout_line(face, text, px_scale(face, font.size)).width)
    }

    fn rasterize(&self, text: &str, font: &FontStyle, center: Point) -> Option<GlyphMask> {
        let face = self.book.resolve(&font.family)?;
        let line = layout_line(face, text, px_scale(face, font.size));

        // Horizontal center on the advance box, vertical center on the
        // ascent/descent box (descent is negative).
        let origin_x = center.x as f32 - line.width / 2.0;
        let baseline = center.y as f32 + (line.ascent + line.descent) / 2.0;

        let outlined: Vec<_> = line
            .glyphs
            .into_iter()
            .filter_map(|mut g| {
                g.position = point(g.position.x + origin_x, g.position.y + baseline);
                face.outline_glyph(g)
            })
            .collect();

        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for g in &outlined {
            let b = g.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
        if outlined.is_empty() || min_x >= max_x || min_y >= max_y {
            return None;
        }

        let left = min_x.floor() as i64;
        let top = min_y.floor() as i64;
        let width = (max_x.ceil() as i64 - left) as u32;
        let height = (max_y.ceil() as i64 - top) as u32;
        let mut mask = GlyphMask::new(left, top, width, height);

        for g in &outlined {
            let b = g.px_bounds();
            let dx = (b.min.x as i64 - left) as u32;
            let dy = (b.min.y as i64 - top) as u32;
            g.draw(|x, y, c| mask.accumulate(dx + x, dy + y, c));
        }
        Some(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A font commonly present on Linux CI images; tests that need real
    /// glyphs skip themselves when it is missing.
    fn system_font() -> Option<PathBuf> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }

    #[test]
    fn empty_book_measures_and_draws_nothing() {
        let backend = GlyphBackend::default();
        let font = FontStyle::default();
        assert_eq!(backend.measure("Hello", &font), None);
        assert!(backend.rasterize("Hello", &font, Point::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn invalid_font_file_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("Broken.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();

        let mut book = FontBook::new();
        let err = book.load_file("Broken", &path).unwrap_err();
        assert!(matches!(err, FontError::InvalidFont(p) if p == path));
        assert!(book.is_empty());
    }

    #[test]
    fn missing_font_file_is_io_error() {
        let mut book = FontBook::new();
        let err = book
            .load_file("Nope", Path::new("/nonexistent/Nope.ttf"))
            .unwrap_err();
        assert!(matches!(err, FontError::Io { .. }));
    }

    #[test]
    fn load_dir_skips_invalid_and_non_font_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Broken.ttf"), b"nope").unwrap();
        std::fs::write(tmp.path().join("readme.txt"), b"hello").unwrap();

        let mut book = FontBook::new();
        assert_eq!(book.load_dir(tmp.path()).unwrap(), 0);
        assert!(book.families().is_empty());
    }

    #[test]
    fn real_font_resolves_case_insensitively_with_default_fallback() {
        let Some(path) = system_font() else { return };
        let mut book = FontBook::new();
        book.load_file("DejaVu Sans", &path).unwrap();
        book.set_default_family("DejaVu Sans");

        assert!(book.resolve("dejavu sans").is_some());
        assert!(book.resolve("Arial").is_some(), "falls back to default");
        assert_eq!(book.families(), vec!["DejaVu Sans"]);
    }

    #[test]
    fn real_font_mask_is_centered_on_point() {
        let Some(path) = system_font() else { return };
        let mut book = FontBook::new();
        book.load_file("DejaVu Sans", &path).unwrap();
        let backend = GlyphBackend::new(book);
        let font = FontStyle {
            family: "DejaVu Sans".into(),
            ..FontStyle::default()
        };

        let width = backend.measure("HHHH", &font).unwrap();
        assert!(width > 40.0 && width < 160.0, "width {width}");
        assert!(backend.measure("HHHHHHHH", &font).unwrap() > width);

        let mask = backend
            .rasterize("HHHH", &font, Point::new(185.0, 160.0))
            .unwrap();
        assert!(!mask.is_blank());
        let mid_x = mask.left as f64 + mask.width as f64 / 2.0;
        let mid_y = mask.top as f64 + mask.height as f64 / 2.0;
        assert!((mid_x - 185.0).abs() < 6.0, "mask center x {mid_x}");
        assert!((mid_y - 160.0).abs() < 12.0, "mask center y {mid_y}");
        assert!(mask.height <= font.size + 2);
    }
}
