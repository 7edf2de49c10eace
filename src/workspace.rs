//! The stamp entity store: every item of the current batch plus the active,
//! main-icon and tab-icon selections.
//!
//! All mutation goes through the methods below. Edits that target the active
//! item are silently dropped when nothing is active; index setters ignore
//! out-of-range indices. Either way the store's invariant holds: every
//! selected index points at an existing item.

use crate::imaging::initial_transform;
use crate::stamp::{FontPatch, FontStyle, StampItem};
use crate::types::{Bitmap, Point, SurfaceSize, Vec2};

/// Distance of the default caption center from the bottom edge.
pub const DEFAULT_TEXT_BOTTOM_MARGIN: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Workspace {
    items: Vec<StampItem>,
    active: Option<usize>,
    main_icon: Option<usize>,
    tab_icon: Option<usize>,
    surface: SurfaceSize,
    default_font: FontStyle,
    text_bottom_margin: f64,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(SurfaceSize::EDITING, FontStyle::default())
    }
}

impl Workspace {
    /// An empty workspace editing on a surface of `surface` size.
    pub fn new(surface: SurfaceSize, default_font: FontStyle) -> Self {
        Self {
            items: Vec::new(),
            active: None,
            main_icon: None,
            tab_icon: None,
            surface,
            default_font,
            text_bottom_margin: DEFAULT_TEXT_BOTTOM_MARGIN,
        }
    }

    pub fn with_text_bottom_margin(mut self, margin: f64) -> Self {
        self.text_bottom_margin = margin;
        self
    }

    // =========================================================================
    // Batch
    // =========================================================================

    /// Replace the whole batch. Selections reset; the first item (if any)
    /// becomes active.
    pub fn load_batch(&mut self, images: Vec<Bitmap>) {
        let text_position = Point::new(
            self.surface.width as f64 / 2.0,
            self.surface.height as f64 - self.text_bottom_margin,
        );
        self.items = images
            .into_iter()
            .map(|image| StampItem {
                transform: initial_transform(image.dimensions(), self.surface),
                image,
                text: String::new(),
                font: self.default_font.clone(),
                text_position,
            })
            .collect();
        self.active = if self.items.is_empty() { None } else { Some(0) };
        self.main_icon = None;
        self.tab_icon = None;
        log::info!("loaded batch of {} stamp(s)", self.items.len());
    }

    // =========================================================================
    // Selections
    // =========================================================================

    /// Returns whether the active item changed.
    pub fn set_active(&mut self, index: usize) -> bool {
        Self::select(&self.items, &mut self.active, index, "active")
    }

    pub fn set_main_icon(&mut self, index: usize) -> bool {
        Self::select(&self.items, &mut self.main_icon, index, "main icon")
    }

    pub fn set_tab_icon(&mut self, index: usize) -> bool {
        Self::select(&self.items, &mut self.tab_icon, index, "tab icon")
    }

    fn select(items: &[StampItem], slot: &mut Option<usize>, index: usize, what: &str) -> bool {
        if index >= items.len() {
            log::debug!("ignoring {what} selection {index}: only {} item(s)", items.len());
            return false;
        }
        let changed = *slot != Some(index);
        *slot = Some(index);
        changed
    }

    // =========================================================================
    // Active-item edits
    // =========================================================================

    pub fn update_active_text(&mut self, text: &str) -> bool {
        self.with_active("text", |item| item.text = text.to_string())
    }

    pub fn update_active_font(&mut self, patch: FontPatch) -> bool {
        self.with_active("font", |item| item.font.apply(patch))
    }

    /// Set scale and/or offset. A non-positive or non-finite scale is ignored.
    pub fn update_active_transform(&mut self, scale: Option<f64>, offset: Option<Vec2>) -> bool {
        let scale = scale.filter(|s| s.is_finite() && *s > 0.0);
        self.with_active("transform", |item| {
            if let Some(scale) = scale {
                item.transform.scale = scale;
            }
            if let Some(offset) = offset {
                item.transform.offset = offset;
            }
        })
    }

    pub fn move_active_text(&mut self, position: Point) -> bool {
        self.with_active("text position", |item| item.text_position = position)
    }

    /// Drop manual pan/zoom: back to the load-time fit.
    pub fn reset_active_transform(&mut self) -> bool {
        let surface = self.surface;
        self.with_active("transform reset", |item| {
            item.transform = initial_transform(item.image_size(), surface);
        })
    }

    fn with_active(&mut self, what: &str, edit: impl FnOnce(&mut StampItem)) -> bool {
        match self.active.and_then(|i| self.items.get_mut(i)) {
            Some(item) => {
                edit(item);
                true
            }
            None => {
                log::debug!("dropping {what} edit: no active stamp");
                false
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn items(&self) -> &[StampItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&StampItem> {
        self.items.get(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_item(&self) -> Option<&StampItem> {
        self.active.and_then(|i| self.items.get(i))
    }

    pub fn main_icon_index(&self) -> Option<usize> {
        self.main_icon
    }

    pub fn tab_icon_index(&self) -> Option<usize> {
        self.tab_icon
    }

    /// Size of the editing surface all transforms are expressed in.
    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::Transform;
    use crate::test_helpers::{loaded_workspace, solid_bitmap};
    use crate::types::Color;
    use image::Rgba;

    fn red(w: u32, h: u32) -> Bitmap {
        solid_bitmap(w, h, Rgba([255, 0, 0, 255]))
    }

    #[test]
    fn load_batch_initializes_items() {
        let mut ws = Workspace::default();
        ws.load_batch(vec![red(800, 400)]);

        let item = ws.active_item().unwrap();
        assert_eq!(item.transform, Transform::new(0.4625, Vec2::ZERO));
        assert_eq!(item.text_position, Point::new(185.0, 270.0));
        assert_eq!(item.text, "");
        assert_eq!(item.font, FontStyle::default());
        assert_eq!(ws.active_index(), Some(0));
    }

    #[test]
    fn load_batch_shares_bitmaps() {
        let bitmap = red(10, 10);
        let mut ws = Workspace::default();
        ws.load_batch(vec![bitmap.clone()]);
        assert!(std::sync::Arc::ptr_eq(&ws.items()[0].image, &bitmap));
    }

    #[test]
    fn load_empty_batch_has_no_active() {
        let mut ws = loaded_workspace(2);
        ws.load_batch(Vec::new());
        assert!(ws.is_empty());
        assert_eq!(ws.active_index(), None);
    }

    #[test]
    fn reupload_resets_all_selections() {
        let mut ws = loaded_workspace(3);
        ws.set_active(2);
        ws.set_main_icon(1);
        ws.set_tab_icon(2);

        ws.load_batch(vec![red(5, 5)]);
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.active_index(), Some(0));
        assert_eq!(ws.main_icon_index(), None);
        assert_eq!(ws.tab_icon_index(), None);
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let mut ws = loaded_workspace(2);
        assert!(!ws.set_active(2));
        assert!(!ws.set_main_icon(5));
        assert!(!ws.set_tab_icon(2));
        assert_eq!(ws.active_index(), Some(0));
        assert_eq!(ws.main_icon_index(), None);
        assert_eq!(ws.tab_icon_index(), None);
    }

    #[test]
    fn selection_reports_change() {
        let mut ws = loaded_workspace(2);
        assert!(!ws.set_active(0));
        assert!(ws.set_active(1));
        assert!(ws.set_main_icon(1));
        assert!(!ws.set_main_icon(1));
    }

    #[test]
    fn edits_without_active_item_are_noops() {
        let mut ws = Workspace::default();
        assert!(!ws.update_active_text("hello"));
        assert!(!ws.update_active_font(FontPatch::size(10)));
        assert!(!ws.update_active_transform(Some(2.0), None));
        assert!(!ws.move_active_text(Point::new(1.0, 1.0)));
        assert!(!ws.reset_active_transform());
        assert!(ws.is_empty());
    }

    #[test]
    fn edits_only_touch_active_item() {
        let mut ws = loaded_workspace(2);
        ws.set_active(1);
        ws.update_active_text("second");
        ws.update_active_font(FontPatch::color(Color::rgb(1, 2, 3)));

        assert_eq!(ws.item(0).unwrap().text, "");
        assert_eq!(ws.item(1).unwrap().text, "second");
        assert_eq!(ws.item(1).unwrap().font.color, Color::rgb(1, 2, 3));
        assert_eq!(ws.item(0).unwrap().font.color, Color::WHITE);
    }

    #[test]
    fn update_transform_ignores_invalid_scale() {
        let mut ws = loaded_workspace(1);
        let before = ws.active_item().unwrap().transform;
        ws.update_active_transform(Some(0.0), None);
        ws.update_active_transform(Some(-1.0), None);
        ws.update_active_transform(Some(f64::NAN), None);
        assert_eq!(ws.active_item().unwrap().transform, before);

        ws.update_active_transform(None, Some(Vec2::new(3.0, 4.0)));
        assert_eq!(ws.active_item().unwrap().transform.offset, Vec2::new(3.0, 4.0));
        assert_eq!(ws.active_item().unwrap().transform.scale, before.scale);
    }

    #[test]
    fn reset_restores_load_time_transform() {
        let mut ws = Workspace::default();
        ws.load_batch(vec![red(1234, 567)]);
        let initial = ws.active_item().unwrap().transform;

        ws.update_active_transform(Some(3.3), Some(Vec2::new(-40.0, 12.5)));
        assert_ne!(ws.active_item().unwrap().transform, initial);

        assert!(ws.reset_active_transform());
        assert_eq!(ws.active_item().unwrap().transform, initial);
    }

    #[test]
    fn custom_bottom_margin_moves_default_caption() {
        let mut ws = Workspace::default().with_text_bottom_margin(20.0);
        ws.load_batch(vec![red(10, 10)]);
        assert_eq!(ws.active_item().unwrap().text_position, Point::new(185.0, 300.0));
    }
}
