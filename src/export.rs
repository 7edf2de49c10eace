//! Export orchestration: snapshot the workspace, render every asset, encode
//! PNG and hand the ordered `(filename, bytes)` list to an archive writer.
//!
//! ## Assets
//!
//! | File | Surface | Image mode |
//! |---|---|---|
//! | `01.png`, `02.png`, … | 370×320 editing size | stored transform replayed, with caption |
//! | `main.png` | 240×240 | image re-fitted, no caption |
//! | `tab.png` | 96×74 | image re-fitted, no caption |
//!
//! Per-item files come first in store order, then the main icon, then the tab
//! icon. The per-item renders run in parallel with [rayon](https://docs.rs/rayon);
//! the output order does not depend on scheduling.
//!
//! ## Failure
//!
//! Missing preconditions fail before anything is rendered and the archive
//! writer is never called. Encode and archive failures propagate. Neither
//! kind touches the workspace: rendering only reads the snapshot taken by
//! [`ExportPlan::from_workspace`].

use crate::config::StudioConfig;
use crate::imaging::{EncodeError, ImageMode, RenderParams, TextBackend, encode_png, render_new};
use crate::stamp::StampItem;
use crate::types::SurfaceSize;
use crate::workspace::Workspace;
use rayon::prelude::*;
use std::io::{Seek, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("nothing to export: no images loaded")]
    NoItems,
    #[error("main icon not set")]
    MainIconNotSet,
    #[error("tab icon not set")]
    TabIconNotSet,
    #[error("an export is already running")]
    InProgress,
    #[error("failed to encode {filename}: {source}")]
    Encode {
        filename: String,
        #[source]
        source: EncodeError,
    },
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What an exported file depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Per-item stamp; 0-based store index.
    Item(usize),
    MainIcon,
    TabIcon,
}

/// One encoded file of the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedAsset {
    pub kind: AssetKind,
    pub filename: String,
    pub size: SurfaceSize,
    pub bytes: Vec<u8>,
}

/// Progress events emitted while an export runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Started { items: usize },
    /// Per-item events arrive in completion order, not store order.
    AssetRendered {
        kind: AssetKind,
        filename: String,
        size: SurfaceSize,
        bytes: usize,
    },
    Written { files: usize, bytes: usize },
}

/// File naming and render settings for an export.
///
/// Per-item files replay each stamp with its caption. The main and tab icons
/// are re-fitted images only and never carry a caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub main_icon_name: String,
    pub tab_icon_name: String,
    pub render: RenderParams,
}

impl ExportSettings {
    pub fn from_config(config: &StudioConfig) -> Self {
        Self {
            main_icon_name: config.export.main_icon_name.clone(),
            tab_icon_name: config.export.tab_icon_name.clone(),
            render: RenderParams {
                resample: config.export.resample,
            },
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from_config(&StudioConfig::default())
    }
}

/// Name of the per-item file for 0-based `index`: `01.png`, `02.png`, …
pub fn item_filename(index: usize) -> String {
    format!("{:02}.png", index + 1)
}

/// Receives the finished, ordered asset list.
pub trait ArchiveWriter {
    fn write_archive(&mut self, assets: &[ExportedAsset]) -> Result<(), ExportError>;
}

/// Writes assets as a flat zip archive.
pub struct ZipArchiveWriter<W: Write + Seek> {
    sink: W,
}

impl<W: Write + Seek> ZipArchiveWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write + Seek> ArchiveWriter for ZipArchiveWriter<W> {
    fn write_archive(&mut self, assets: &[ExportedAsset]) -> Result<(), ExportError> {
        let mut zip = ZipWriter::new(&mut self.sink);
        // PNG data is already deflated.
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for asset in assets {
            zip.start_file(asset.filename.as_str(), options)?;
            zip.write_all(&asset.bytes)?;
        }
        zip.finish()?;
        Ok(())
    }
}

/// Everything an export needs, copied out of the workspace up front.
///
/// Only [`from_workspace`](Self::from_workspace) builds a plan, so both icon
/// indices always point into `items`.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    items: Vec<StampItem>,
    main_icon: usize,
    tab_icon: usize,
    surface: SurfaceSize,
}

impl ExportPlan {
    /// Check preconditions and snapshot the items. Bitmaps are shared, not copied.
    pub fn from_workspace(ws: &Workspace) -> Result<Self, ExportError> {
        if ws.is_empty() {
            return Err(ExportError::NoItems);
        }
        let main_icon = ws.main_icon_index().ok_or(ExportError::MainIconNotSet)?;
        let tab_icon = ws.tab_icon_index().ok_or(ExportError::TabIconNotSet)?;
        Ok(Self {
            items: ws.items().to_vec(),
            main_icon,
            tab_icon,
            surface: ws.surface(),
        })
    }

    pub fn items(&self) -> &[StampItem] {
        &self.items
    }

    /// Total number of files the export will produce.
    pub fn asset_count(&self) -> usize {
        self.items.len() + 2
    }

    /// Render and encode every asset, in archive order.
    pub fn render(
        &self,
        text: &impl TextBackend,
        settings: &ExportSettings,
        events: Option<&Sender<ExportEvent>>,
    ) -> Result<Vec<ExportedAsset>, ExportError> {
        let emit = |event: ExportEvent| {
            if let Some(tx) = events {
                tx.send(event).ok();
            }
        };
        emit(ExportEvent::Started {
            items: self.items.len(),
        });

        let mut assets: Vec<ExportedAsset> = self
            .items
            .par_iter()
            .enumerate()
            .map(|(index, item)| {
                let asset = self.render_asset(
                    AssetKind::Item(index),
                    item_filename(index),
                    self.surface,
                    item,
                    ImageMode::Replay,
                    text,
                    &settings.render,
                )?;
                emit(rendered_event(&asset));
                Ok(asset)
            })
            .collect::<Result<_, ExportError>>()?;

        for (kind, filename, size, item) in [
            (
                AssetKind::MainIcon,
                &settings.main_icon_name,
                SurfaceSize::MAIN_ICON,
                &self.items[self.main_icon],
            ),
            (
                AssetKind::TabIcon,
                &settings.tab_icon_name,
                SurfaceSize::TAB_ICON,
                &self.items[self.tab_icon],
            ),
        ] {
            let asset = self.render_asset(
                kind,
                filename.clone(),
                size,
                item,
                ImageMode::Refit,
                text,
                &settings.render,
            )?;
            emit(rendered_event(&asset));
            assets.push(asset);
        }
        Ok(assets)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_asset(
        &self,
        kind: AssetKind,
        filename: String,
        size: SurfaceSize,
        item: &StampItem,
        mode: ImageMode,
        text: &impl TextBackend,
        params: &RenderParams,
    ) -> Result<ExportedAsset, ExportError> {
        let surface = render_new(size, item, mode, text, params);
        let bytes = encode_png(&surface).map_err(|source| ExportError::Encode {
            filename: filename.clone(),
            source,
        })?;
        Ok(ExportedAsset {
            kind,
            filename,
            size,
            bytes,
        })
    }
}

fn rendered_event(asset: &ExportedAsset) -> ExportEvent {
    ExportEvent::AssetRendered {
        kind: asset.kind,
        filename: asset.filename.clone(),
        size: asset.size,
        bytes: asset.bytes.len(),
    }
}

/// Names and sizes of the files handed to the writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub files: Vec<(String, usize)>,
}

impl ExportSummary {
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|(_, n)| n).sum()
    }
}

/// Runs exports one at a time.
///
/// Holding an `Exporter` across the session gives the "export button is
/// disabled while exporting" rule: a second call while one is running fails
/// with [`ExportError::InProgress`].
#[derive(Debug, Default)]
pub struct Exporter {
    settings: ExportSettings,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Exporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<InFlight<'_>, ExportError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(&self.in_flight))
            .map_err(|_| ExportError::InProgress)
    }

    /// Snapshot `ws`, render everything and write it out.
    pub fn export(
        &self,
        ws: &Workspace,
        text: &impl TextBackend,
        writer: &mut impl ArchiveWriter,
        events: Option<Sender<ExportEvent>>,
    ) -> Result<ExportSummary, ExportError> {
        let _guard = self.begin()?;
        let plan = ExportPlan::from_workspace(ws)?;
        log::info!("exporting {} stamp(s)", plan.items().len());

        let assets = plan.render(text, &self.settings, events.as_ref())?;
        writer.write_archive(&assets)?;

        let summary = ExportSummary {
            files: assets
                .iter()
                .map(|a| (a.filename.clone(), a.bytes.len()))
                .collect(),
        };
        if let Some(tx) = &events {
            tx.send(ExportEvent::Written {
                files: summary.files.len(),
                bytes: summary.total_bytes(),
            })
            .ok();
        }
        log::info!(
            "export finished: {} file(s), {} bytes",
            summary.files.len(),
            summary.total_bytes()
        );
        Ok(summary)
    }
}

/// One-shot export with the given settings.
pub fn export(
    ws: &Workspace,
    text: &impl TextBackend,
    settings: ExportSettings,
    writer: &mut impl ArchiveWriter,
    events: Option<Sender<ExportEvent>>,
) -> Result<ExportSummary, ExportError> {
    Exporter::new(settings).export(ws, text, writer, events)
}
