// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Views: scrollable, transformable windows onto a scene.
//!
//! A [`View`] is plain state owned by its [`Scene`]: the view transform, the
//! scroll model, coalesced repaint requests and the device rects items were
//! last painted at. Operations that also touch the scene (input translation,
//! painting, anything that replays the last mouse move) live on [`ViewMut`],
//! a short-lived pairing of the scene with one of its views.
//!
//! Coordinates: *view* (or device) coordinates are viewport pixels with the
//! origin at the viewport's top-left corner. [`View::viewport_transform`]
//! maps scene coordinates to view coordinates.

mod input;
mod mapping;
mod paint;
mod scroll;
mod update;

use hashbrown::HashMap;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use peniko::Brush;

use crate::painter::RenderHints;
use crate::region::Region;
use crate::scene::Scene;
use crate::types::{CursorShape, ItemId, MouseButton, SelectionMode, ViewId};

pub use update::PendingUpdate;

/// How a view turns item repaint requests into viewport updates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpdateMode {
    /// Any change repaints the whole viewport.
    Full,
    /// Repaint the exact region of non-overlapping rects.
    Minimal,
    /// Like [`UpdateMode::Minimal`], falling back to the bounding rect of the
    /// region when it grows past [`SMART_UPDATE_RECT_LIMIT`] rects.
    #[default]
    Smart,
    /// Repaint the bounding rect of all changes.
    BoundingRect,
    /// Never repaint on item changes; the host repaints on its own.
    None,
}

/// Number of rects above which [`UpdateMode::Smart`] collapses a region into its bounding rect.
pub const SMART_UPDATE_RECT_LIMIT: usize = 50;

bitflags::bitflags! {
    /// Rendering shortcuts trading accuracy for speed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct OptimizationFlags: u8 {
        /// Expand painted and updated rects by 1 px instead of 2 px.
        const DONT_ADJUST_FOR_ANTIALIASING = 1 << 0;
        /// Leave painter state alone around background painting.
        const DONT_SAVE_PAINTER_STATE = 1 << 1;
    }
}

bitflags::bitflags! {
    /// What the view caches between paints.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct CacheMode: u8 {
        /// The host may keep the painted background and only repaint it when
        /// [`View::background_exposed`] says so.
        const BACKGROUND = 1 << 0;
    }
}

/// What a left-button drag on the background does.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DragMode {
    /// Nothing.
    #[default]
    NoDrag,
    /// Pan the view.
    ScrollHand,
    /// Select items with a rubber band.
    RubberBand,
}

/// Horizontal placement of a scene narrower than the viewport.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    /// Flush left.
    Left,
    /// Centred.
    #[default]
    Center,
    /// Flush right.
    Right,
}

/// Vertical placement of a scene shorter than the viewport.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum VerticalAlignment {
    /// Flush top.
    Top,
    /// Centred.
    #[default]
    Center,
    /// Flush bottom.
    Bottom,
}

/// Placement of a scene smaller than the viewport.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Alignment {
    /// Horizontal placement.
    pub horizontal: HorizontalAlignment,
    /// Vertical placement.
    pub vertical: VerticalAlignment,
}

/// The scene point a view keeps in place while it is transformed or resized.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewportAnchor {
    /// Keep the scroll values.
    NoAnchor,
    /// Keep the scene point at the viewport centre.
    #[default]
    ViewCenter,
    /// Keep the scene point under the mouse, falling back to the centre.
    UnderMouse,
}

/// How [`ViewMut::fit_in_view`] scales each axis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AspectRatioMode {
    /// Scale both axes independently.
    IgnoreAspectRatio,
    /// Use the smaller of the two ratios.
    #[default]
    KeepAspectRatio,
    /// Use the larger of the two ratios.
    KeepAspectRatioByExpanding,
}

/// View configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewOptions {
    /// How repaint requests are coalesced.
    pub update_mode: UpdateMode,
    /// Rendering shortcuts.
    pub optimization_flags: OptimizationFlags,
    /// Caching hints for the host.
    pub cache_mode: CacheMode,
    /// What a background drag does.
    pub drag_mode: DragMode,
    /// How the rubber band selects items.
    pub rubber_band_selection_mode: SelectionMode,
    /// Placement of a scene smaller than the viewport.
    pub alignment: Alignment,
    /// Anchor used by transform changes.
    pub transformation_anchor: ViewportAnchor,
    /// Anchor used by viewport resizes.
    pub resize_anchor: ViewportAnchor,
    /// Forward input to the scene. Non-interactive views only scroll.
    pub interactive: bool,
    /// Manhattan distance in pixels a press must travel before a rubber band starts.
    pub start_drag_distance: f64,
    /// Hints handed to the painter.
    pub render_hints: RenderHints,
    /// Background drawn instead of the scene's when set.
    pub background: Option<Brush>,
    /// Foreground drawn instead of the scene's when set.
    pub foreground: Option<Brush>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            update_mode: UpdateMode::default(),
            optimization_flags: OptimizationFlags::empty(),
            cache_mode: CacheMode::empty(),
            drag_mode: DragMode::default(),
            rubber_band_selection_mode: SelectionMode::IntersectsShape,
            alignment: Alignment::default(),
            transformation_anchor: ViewportAnchor::ViewCenter,
            resize_anchor: ViewportAnchor::NoAnchor,
            interactive: true,
            start_drag_distance: 10.0,
            render_hints: RenderHints::default(),
            background: None,
            foreground: None,
        }
    }
}

/// Where an item was last painted in a view.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PaintedRect {
    /// Device rect (aligned and expanded) from the last paint.
    At(Rect),
    /// The item was not painted, or its last rect has already been repainted.
    Outside,
}

/// One horizontal or vertical scroll bar: an integer range and a value in it.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) struct ScrollBar {
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) value: f64,
}

impl ScrollBar {
    /// Clamp `value` into the range, rounded towards zero like integer scroll bars.
    fn clamp(&self, value: f64) -> f64 {
        let v = if value.is_finite() { trunc_to_int(value) } else { 0.0 };
        v.clamp(self.min, self.max.max(self.min))
    }
}

/// Truncate towards zero, the way integer scroll values are formed.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Scroll values are pixel counts well inside the i64 range."
)]
#[allow(clippy::cast_precision_loss, reason = "The value came from an f64.")]
pub(crate) fn trunc_to_int(v: f64) -> f64 {
    v as i64 as f64
}

/// Mouse state remembered between view events.
#[derive(Clone, Debug, Default)]
pub(crate) struct MouseState {
    /// The last press, move or release, replayed as a move after scrolling.
    pub(crate) last: Option<LastMouse>,
    pub(crate) press_view_point: Point,
    pub(crate) press_scene_point: Point,
    pub(crate) press_screen_point: Point,
    pub(crate) press_button: Option<MouseButton>,
    pub(crate) last_move_scene_point: Point,
    pub(crate) last_move_screen_point: Point,
    pub(crate) rubber_banding: bool,
    pub(crate) rubber_band_rect: Option<Rect>,
    pub(crate) hand_scrolling: bool,
    pub(crate) hand_scroll_motions: u32,
    pub(crate) under_mouse: bool,
}

/// The last mouse event seen by the view.
#[derive(Clone, Debug)]
pub(crate) struct LastMouse {
    pub(crate) event: crate::events::ViewMouseEvent,
    pub(crate) accepted: bool,
}

/// A view onto a scene.
#[derive(Debug)]
pub struct View {
    pub(crate) id: ViewId,
    pub(crate) activated: bool,
    pub(crate) options: ViewOptions,

    viewport: Size,
    transform: Affine,
    scene_rect: Rect,
    explicit_scene_rect: Option<Rect>,
    pub(crate) hbar: ScrollBar,
    pub(crate) vbar: ScrollBar,
    indent: Vec2,
    last_center_point: Point,

    pub(crate) full_update_pending: bool,
    dirty_region: Region,
    dirty_bounding_rect: Option<Rect>,
    update_clip: Option<Rect>,
    pending: Option<PendingUpdate>,
    background_exposed: bool,
    pub(crate) painted: HashMap<ItemId, PaintedRect>,
    pub(crate) dirty_scroll_offset: Vec2,

    pub(crate) mouse: MouseState,
    pub(crate) last_drag: Option<crate::events::ViewDragEvent>,
    pub(crate) cursor: Option<CursorShape>,
}

impl View {
    pub(crate) fn new(id: ViewId, options: ViewOptions, viewport: Size, scene_rect: Rect) -> Self {
        let mut view = Self {
            id,
            activated: false,
            options,
            viewport,
            transform: Affine::IDENTITY,
            scene_rect,
            explicit_scene_rect: None,
            hbar: ScrollBar::default(),
            vbar: ScrollBar::default(),
            indent: Vec2::ZERO,
            last_center_point: Point::ZERO,
            full_update_pending: false,
            dirty_region: Region::new(),
            dirty_bounding_rect: None,
            update_clip: None,
            pending: None,
            background_exposed: true,
            painted: HashMap::new(),
            dirty_scroll_offset: Vec2::ZERO,
            mouse: MouseState::default(),
            last_drag: None,
            cursor: None,
        };
        view.recalculate_content_size();
        view.last_center_point = crate::geometry::rect_center(scene_rect);
        view.center_on(view.last_center_point);
        // The host paints a new view anyway.
        view.full_update_pending = false;
        view.pending = None;
        view.dirty_region = Region::new();
        view.dirty_scroll_offset = Vec2::ZERO;
        view
    }

    /// The view's handle.
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Current options.
    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Viewport size in pixels.
    pub fn viewport_size(&self) -> Size {
        self.viewport
    }

    /// The viewport as a rect in view coordinates.
    pub fn viewport_rect(&self) -> Rect {
        self.viewport.to_rect()
    }

    /// The view transform (scene to view, without scrolling).
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Whether the view is activated (it holds one of the scene's activation counts).
    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// The area of the scene the view can scroll over.
    pub fn scene_rect(&self) -> Rect {
        self.scene_rect
    }

    /// The rubber band rect in view coordinates while a rubber band drag is active.
    pub fn rubber_band_rect(&self) -> Option<Rect> {
        self.mouse.rubber_band_rect
    }

    /// Cursor of the topmost item under the mouse that has one.
    pub fn cursor(&self) -> Option<CursorShape> {
        self.cursor
    }

    /// Whether the background needs repainting when [`CacheMode::BACKGROUND`] is set.
    pub fn background_exposed(&self) -> bool {
        self.background_exposed
    }

    /// Forget cached state about an item that is leaving the scene.
    pub(crate) fn forget_item(&mut self, id: ItemId) {
        self.painted.remove(&id);
    }

    /// Follow the scene rect unless the view has its own.
    pub(crate) fn scene_rect_changed(&mut self, rect: Rect) {
        if self.explicit_scene_rect.is_none() {
            self.scene_rect = rect;
            self.recalculate_content_size();
        }
    }
}

/// A scene paired with one of its views, for operations that need both.
///
/// Obtained from [`Scene::view_mut`].
pub struct ViewMut<'a> {
    scene: &'a mut Scene,
    id: ViewId,
}

impl core::fmt::Debug for ViewMut<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ViewMut").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<'a> ViewMut<'a> {
    pub(crate) fn new(scene: &'a mut Scene, id: ViewId) -> Self {
        Self { scene, id }
    }

    /// The view's handle.
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// The scene.
    pub fn scene(&mut self) -> &mut Scene {
        self.scene
    }

    /// The view state. `None` if an event handler removed the view meanwhile.
    pub fn view(&self) -> Option<&View> {
        self.scene.view(self.id)
    }

    fn state(&mut self) -> Option<&mut View> {
        self.scene.view_state_mut(self.id)
    }

    /// Replace the view options. Everything is repainted.
    pub fn set_options(&mut self, options: ViewOptions) {
        let Some(v) = self.state() else {
            return;
        };
        if v.options.alignment != options.alignment {
            v.options = options;
            v.recalculate_content_size();
        } else {
            v.options = options;
        }
        v.update_all();
    }

    /// Change how repaint requests are coalesced.
    pub fn set_update_mode(&mut self, mode: UpdateMode) {
        if let Some(v) = self.state() {
            v.options.update_mode = mode;
        }
    }

    /// Change what a background drag does. Leaving scroll-hand mode ends a hand drag.
    pub fn set_drag_mode(&mut self, mode: DragMode) {
        let Some(v) = self.state() else {
            return;
        };
        if v.options.drag_mode == mode {
            return;
        }
        v.options.drag_mode = mode;
        v.mouse.hand_scrolling = false;
        v.mouse.rubber_banding = false;
        v.mouse.rubber_band_rect = None;
        v.cursor = match mode {
            DragMode::ScrollHand => Some(CursorShape::OpenHand),
            _ => None,
        };
    }

    /// Allow or forbid forwarding input to the scene.
    pub fn set_interactive(&mut self, interactive: bool) {
        if let Some(v) = self.state() {
            v.options.interactive = interactive;
        }
    }

    /// Override the scene's background in this view.
    pub fn set_background(&mut self, brush: Option<Brush>) {
        if let Some(v) = self.state() {
            v.options.background = brush;
            v.background_exposed = true;
            v.update_all();
        }
    }

    /// Override the scene's foreground in this view.
    pub fn set_foreground(&mut self, brush: Option<Brush>) {
        if let Some(v) = self.state() {
            v.options.foreground = brush;
            v.update_all();
        }
    }

    /// Ask the host to drop any cached background.
    pub fn reset_cached_content(&mut self) {
        if let Some(v) = self.state() {
            v.background_exposed = true;
            v.update_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_bar_clamps_and_truncates() {
        let bar = ScrollBar {
            min: -10.0,
            max: 40.0,
            value: 0.0,
        };
        assert_eq!(bar.clamp(12.7), 12.0, "truncated");
        assert_eq!(bar.clamp(-12.7), -10.0, "clamped to min");
        assert_eq!(bar.clamp(100.0), 40.0, "clamped to max");
        assert_eq!(bar.clamp(f64::NAN), 0.0, "non-finite becomes zero");
    }

    #[test]
    fn default_options() {
        let o = ViewOptions::default();
        assert_eq!(o.start_drag_distance, 10.0, "start drag distance");
        assert!(o.interactive, "interactive by default");
        assert_eq!(o.update_mode, UpdateMode::Smart, "smart updates by default");
    }
}
