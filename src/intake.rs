//! Turning user-supplied files into decoded bitmaps.
//!
//! A batch never aborts on a bad file: undecodable inputs are logged, skipped
//! and listed in the [`IntakeReport`], and the remaining images load in their
//! original order. Directories expand to the supported image files below them,
//! sorted by file name.

use crate::types::Bitmap;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has zero width or height")]
    EmptyImage,
}

/// Container formats a stamp can be made from, when their decoder is built in.
const STAMP_FORMATS: [ImageFormat; 6] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Tiff,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
];

fn is_stamp_format(format: ImageFormat) -> bool {
    STAMP_FORMATS.contains(&format) && format.reading_enabled()
}

/// File extensions picked up when a directory is expanded into a batch.
pub fn supported_input_extensions() -> Vec<&'static str> {
    STAMP_FORMATS
        .into_iter()
        .filter(|&format| is_stamp_format(format))
        .flat_map(ImageFormat::extensions_str)
        .copied()
        .collect()
}

fn has_supported_extension(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(is_stamp_format)
}

/// Decode an encoded image (format sniffed from the bytes) into RGBA.
pub fn decode_bitmap(bytes: &[u8]) -> Result<Bitmap, IntakeError> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .decode()?;
    if image.width() == 0 || image.height() == 0 {
        return Err(IntakeError::EmptyImage);
    }
    Ok(Arc::new(image.into_rgba8()))
}

/// Read and decode one file.
pub fn load_file(path: &Path) -> Result<Bitmap, IntakeError> {
    let bytes = std::fs::read(path).map_err(|source| IntakeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_bitmap(&bytes)
}

/// A file that was left out of the batch, and why.
#[derive(Debug)]
pub struct SkippedInput {
    pub path: PathBuf,
    pub error: IntakeError,
}

/// Outcome of loading a batch of paths.
#[derive(Debug, Default)]
pub struct IntakeReport {
    /// Decoded bitmaps paired with their source, in input order.
    pub loaded: Vec<(PathBuf, Bitmap)>,
    pub skipped: Vec<SkippedInput>,
}

impl IntakeReport {
    /// The decoded bitmaps, ready for [`Workspace::load_batch`](crate::workspace::Workspace::load_batch).
    pub fn bitmaps(&self) -> Vec<Bitmap> {
        self.loaded.iter().map(|(_, b)| Arc::clone(b)).collect()
    }
}

/// Expand directories into the supported image files below them.
///
/// Plain file paths pass through unchanged, whatever their extension, so a
/// wrongly named file still gets a decode attempt and a report entry.
pub fn expand_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut expanded = Vec::new();
    for path in paths {
        if !path.is_dir() {
            expanded.push(path.clone());
            continue;
        }
        expanded.extend(
            WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        log::warn!("skipping unreadable entry under {}: {e}", path.display());
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| has_supported_extension(p)),
        );
    }
    expanded
}

/// Load every path (directories expanded), skipping the ones that fail.
pub fn load_paths(paths: &[PathBuf]) -> IntakeReport {
    let mut report = IntakeReport::default();
    for path in expand_inputs(paths) {
        match load_file(&path) {
            Ok(bitmap) => report.loaded.push((path, bitmap)),
            Err(error) => {
                log::warn!("skipping {}: {error}", path.display());
                report.skipped.push(SkippedInput { path, error });
            }
        }
    }
    log::info!(
        "decoded {} image(s), skipped {}",
        report.loaded.len(),
        report.skipped.len()
    );
    report
}
