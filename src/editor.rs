//! The editing session: one [`Workspace`], its drag controller, the editing
//! canvas and the two icon previews, owned together.
//!
//! Every control method mutates the workspace and then redraws synchronously,
//! so after any call [`StampEditor::canvas`] shows the active item as it is
//! now. Controls that change nothing skip the redraw.

use crate::config::StudioConfig;
use crate::export::{ArchiveWriter, ExportError, ExportEvent, ExportSummary, Exporter};
use crate::imaging::{RenderParams, TextBackend, render_fitted, render_stamp, render_thumbnail};
use crate::imaging::operations::clear;
use crate::interaction::{Affordance, InteractionController, PointerEvent};
use crate::stamp::FontPatch;
use crate::types::{Bitmap, Color, SurfaceSize, Vec2};
use crate::workspace::Workspace;
use image::RgbaImage;
use std::sync::mpsc::Sender;

pub struct StampEditor<B: TextBackend> {
    workspace: Workspace,
    controller: InteractionController,
    text: B,
    params: RenderParams,
    canvas: RgbaImage,
    main_preview: RgbaImage,
    tab_preview: RgbaImage,
}

impl<B: TextBackend> StampEditor<B> {
    pub fn new(workspace: Workspace, text: B, params: RenderParams) -> Self {
        let mut editor = Self {
            canvas: workspace.surface().blank(),
            workspace,
            controller: InteractionController::new(),
            text,
            params,
            main_preview: SurfaceSize::MAIN_ICON.blank(),
            tab_preview: SurfaceSize::TAB_ICON.blank(),
        };
        editor.redraw();
        editor
    }

    /// Empty session with the configured caption defaults and resampling.
    pub fn from_config(config: &StudioConfig, text: B) -> Self {
        let workspace = Workspace::new(SurfaceSize::EDITING, config.text.font_style())
            .with_text_bottom_margin(config.text.bottom_margin);
        let params = RenderParams {
            resample: config.export.resample,
        };
        Self::new(workspace, text, params)
    }

    // =========================================================================
    // Batch and selection
    // =========================================================================

    /// Replace the batch. Any drag is abandoned and both previews cleared.
    pub fn load_batch(&mut self, images: Vec<Bitmap>) {
        self.controller.cancel();
        self.workspace.load_batch(images);
        clear(&mut self.main_preview);
        clear(&mut self.tab_preview);
        self.redraw();
    }

    pub fn select(&mut self, index: usize) -> bool {
        let changed = self.workspace.set_active(index);
        if changed {
            self.controller.cancel();
            self.redraw();
        }
        changed
    }

    pub fn designate_main(&mut self, index: usize) -> bool {
        if !self.workspace.set_main_icon(index) {
            return false;
        }
        if let Some(item) = self.workspace.item(index) {
            render_fitted(&mut self.main_preview, &item.image, &self.params);
        }
        true
    }

    pub fn designate_tab(&mut self, index: usize) -> bool {
        if !self.workspace.set_tab_icon(index) {
            return false;
        }
        if let Some(item) = self.workspace.item(index) {
            render_fitted(&mut self.tab_preview, &item.image, &self.params);
        }
        true
    }

    // =========================================================================
    // Caption controls
    // =========================================================================

    pub fn set_text(&mut self, text: &str) -> bool {
        let changed = self.workspace.update_active_text(text);
        self.redraw_if(changed)
    }

    pub fn set_font_family(&mut self, family: &str) -> bool {
        self.patch_font(FontPatch::family(family))
    }

    pub fn set_font_size(&mut self, size: u32) -> bool {
        self.patch_font(FontPatch::size(size))
    }

    pub fn set_font_color(&mut self, color: Color) -> bool {
        self.patch_font(FontPatch::color(color))
    }

    pub fn set_stroke_width(&mut self, width: u32) -> bool {
        self.patch_font(FontPatch::stroke_width(width))
    }

    pub fn set_stroke_color(&mut self, color: Color) -> bool {
        self.patch_font(FontPatch::stroke_color(color))
    }

    fn patch_font(&mut self, patch: FontPatch) -> bool {
        let changed = self.workspace.update_active_font(patch);
        self.redraw_if(changed)
    }

    // =========================================================================
    // Transform controls and pointer input
    // =========================================================================

    pub fn zoom(&mut self, scale: f64) -> bool {
        let changed = self.controller.zoom(&mut self.workspace, scale);
        self.redraw_if(changed)
    }

    /// Absolute scale and/or pan, as typed into numeric fields.
    pub fn set_transform(&mut self, scale: Option<f64>, offset: Option<Vec2>) -> bool {
        self.controller.cancel();
        let changed = self.workspace.update_active_transform(scale, offset);
        self.redraw_if(changed)
    }

    pub fn reset_transform(&mut self) -> bool {
        let changed = self.controller.reset(&mut self.workspace);
        self.redraw_if(changed)
    }

    /// Feed one pointer event; returns the cursor hint to show.
    pub fn pointer(&mut self, event: PointerEvent) -> Affordance {
        let response = self
            .controller
            .handle(&mut self.workspace, &self.text, event);
        self.redraw_if(response.changed);
        response.affordance
    }

    // =========================================================================
    // Outputs
    // =========================================================================

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn main_preview(&self) -> &RgbaImage {
        &self.main_preview
    }

    pub fn tab_preview(&self) -> &RgbaImage {
        &self.tab_preview
    }

    /// Thumbnail strip, one per item in store order.
    pub fn thumbnails(&self) -> Vec<RgbaImage> {
        self.workspace
            .items()
            .iter()
            .map(|item| render_thumbnail(item, &self.text, &self.params))
            .collect()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn text_backend(&self) -> &B {
        &self.text
    }

    /// Export the current batch through `exporter`.
    pub fn export(
        &self,
        exporter: &Exporter,
        writer: &mut impl ArchiveWriter,
        events: Option<Sender<ExportEvent>>,
    ) -> Result<ExportSummary, ExportError> {
        exporter.export(&self.workspace, &self.text, writer, events)
    }

    fn redraw_if(&mut self, changed: bool) -> bool {
        if changed {
            self.redraw();
        }
        changed
    }

    fn redraw(&mut self) {
        match self.workspace.active_item() {
            Some(item) => render_stamp(&mut self.canvas, item, &self.text, &self.params),
            None => clear(&mut self.canvas),
        }
    }
}
