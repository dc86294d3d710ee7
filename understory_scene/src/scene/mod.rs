// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene: item arena, attached views, and the engines that keep them consistent.
//!
//! Items live in a slot arena addressed by generational [`ItemId`]s. The scene
//! owns everything that refers to items (selection, focus, grabs, hover,
//! filters, custom data), so destroying an item only has to scrub the scene;
//! handles held elsewhere simply go stale.

mod dirty;
mod dispatch;
mod focus;
mod geometry;
mod grab;
mod render;
mod selection;
mod state;
mod touch;
mod tree;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt::Debug;

use hashbrown::{HashMap, HashSet};
use kurbo::{BezPath, Point, Rect, Size};
use peniko::Brush;
use smallvec::SmallVec;
use understory_scene_index::{IndexChange, IndexMethod, SpatialIndex};

use crate::content::Content;
use crate::events::{GestureKind, SceneNotification, TouchPoint};
use crate::item::{Item, Node, Siblings};
use crate::tasks::{FrameStats, TaskQueue};
use crate::types::{DropAction, ItemFlags, ItemId, PanelModality, ViewId};
use crate::view::{View, ViewMut, ViewOptions};

use dirty::MarkDirty;

/// Stack of grabbing items, the current grabber last.
pub(crate) type GrabStack = SmallVec<[ItemId; 4]>;

pub use geometry::QueryOptions;
pub use grab::ButtonDown;
pub use render::RenderOptions;

/// Scene configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneOptions {
    /// Spatial index strategy, including the grid cell size for grid indexing.
    pub index_method: IndexMethod,
    /// Keep focus when clicking on the background or on a non-focusable item.
    pub sticky_focus: bool,
    /// Items whose device bounds are smaller than this many pixels in both
    /// dimensions are not painted. Zero disables the check.
    pub minimum_render_size: f64,
    /// An explicit scene rect. `None` means "grow with the items".
    pub scene_rect: Option<Rect>,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            index_method: IndexMethod::default(),
            sticky_focus: false,
            minimum_render_size: 0.0,
            scene_rect: None,
        }
    }
}

/// A retained-mode 2D scene.
pub struct Scene {
    nodes: Vec<Option<Node>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    pub(crate) top_level: Siblings,
    pub(crate) index: Box<dyn SpatialIndex<ItemId>>,
    pub(crate) options: SceneOptions,

    pub(crate) views: Vec<Option<View>>,
    view_generations: Vec<u32>,
    view_free: Vec<usize>,

    pub(crate) selected: Vec<ItemId>,
    pub(crate) selection_changing: u32,
    pub(crate) selection_change_pending: bool,
    pub(crate) selection_area: BezPath,

    pub(crate) mouse_grabbers: GrabStack,
    pub(crate) keyboard_grabbers: GrabStack,
    pub(crate) last_grab_implicit: bool,
    pub(crate) last_mouse_grabber: Option<ItemId>,
    pub(crate) button_down: [Option<ButtonDown>; 5],
    pub(crate) moving_initial: HashMap<ItemId, Point>,

    pub(crate) focus_item: Option<ItemId>,
    pub(crate) last_focus_item: Option<ItemId>,
    pub(crate) passive_focus_item: Option<ItemId>,
    pub(crate) scene_has_focus: bool,
    pub(crate) active_panel: Option<ItemId>,
    pub(crate) last_active_panel: Option<ItemId>,
    pub(crate) activation_ref_count: u32,
    pub(crate) modal_panels: Vec<ItemId>,

    pub(crate) hover_items: Vec<ItemId>,
    pub(crate) cached_items_under_mouse: Vec<ItemId>,
    pub(crate) last_scene_mouse_pos: Point,
    pub(crate) drag_drop_item: Option<ItemId>,
    pub(crate) last_drop_action: DropAction,
    pub(crate) touch_items: HashMap<u32, ItemId>,
    pub(crate) touch_points: HashMap<u32, TouchPoint>,
    pub(crate) touch_begin_accepted: HashSet<ItemId>,
    pub(crate) gesture_targets: HashMap<GestureKind, ItemId>,

    pub(crate) event_filters: HashMap<ItemId, Vec<ItemId>>,
    pub(crate) scene_pos_items: HashSet<ItemId>,
    item_data: HashMap<(ItemId, u32), Box<dyn Any>>,

    pub(crate) tasks: TaskQueue,
    pub(crate) stats: FrameStats,
    pub(crate) index_pending: Vec<ItemId>,
    pub(crate) unpolished: Vec<ItemId>,
    pub(crate) updated_rects: Vec<Rect>,
    pub(crate) update_all: bool,
    pub(crate) changed_tracking: bool,
    pub(crate) growing_rect: Rect,
    pub(crate) dirty_growing_rect: bool,
    pub(crate) notifications: Vec<SceneNotification>,
    pub(crate) background: Option<Brush>,
    pub(crate) foreground: Option<Brush>,
}

impl Debug for Scene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Scene")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("views", &self.views.iter().flatten().count())
            .field("index", &self.index)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// An empty scene with default options.
    pub fn new() -> Self {
        Self::with_options(SceneOptions::default())
    }

    /// An empty scene.
    pub fn with_options(options: SceneOptions) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            top_level: Siblings::new(),
            index: options.index_method.build(),
            options,
            views: Vec::new(),
            view_generations: Vec::new(),
            view_free: Vec::new(),
            selected: Vec::new(),
            selection_changing: 0,
            selection_change_pending: false,
            selection_area: BezPath::new(),
            mouse_grabbers: GrabStack::new(),
            keyboard_grabbers: GrabStack::new(),
            last_grab_implicit: false,
            last_mouse_grabber: None,
            button_down: [None; 5],
            moving_initial: HashMap::new(),
            focus_item: None,
            last_focus_item: None,
            passive_focus_item: None,
            scene_has_focus: false,
            active_panel: None,
            last_active_panel: None,
            activation_ref_count: 0,
            modal_panels: Vec::new(),
            hover_items: Vec::new(),
            cached_items_under_mouse: Vec::new(),
            last_scene_mouse_pos: Point::ZERO,
            drag_drop_item: None,
            last_drop_action: DropAction::Ignore,
            touch_items: HashMap::new(),
            touch_points: HashMap::new(),
            touch_begin_accepted: HashSet::new(),
            gesture_targets: HashMap::new(),
            event_filters: HashMap::new(),
            scene_pos_items: HashSet::new(),
            item_data: HashMap::new(),
            tasks: TaskQueue::empty(),
            stats: FrameStats::default(),
            index_pending: Vec::new(),
            unpolished: Vec::new(),
            updated_rects: Vec::new(),
            update_all: false,
            changed_tracking: false,
            growing_rect: Rect::ZERO,
            dirty_growing_rect: false,
            notifications: Vec::new(),
            background: None,
            foreground: None,
        }
    }

    /// The options the scene was created with (the scene rect reflects later changes).
    pub fn options(&self) -> &SceneOptions {
        &self.options
    }

    // --- arena -------------------------------------------------------------

    #[inline]
    pub(crate) fn node(&self, id: ItemId) -> Option<&Node> {
        self.nodes
            .get(id.idx())?
            .as_ref()
            .filter(|n| n.generation == id.generation())
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: ItemId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.idx())?
            .as_mut()
            .filter(|n| n.generation == id.generation())
    }

    /// Filter out stale handles.
    #[inline]
    pub(crate) fn live(&self, id: Option<ItemId>) -> Option<ItemId> {
        id.filter(|id| self.is_alive(*id))
    }

    /// Returns `true` if `id` refers to a live item.
    pub fn is_alive(&self, id: ItemId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live items.
    pub fn item_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    fn alloc_slot(&mut self) -> (usize, u32) {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            (idx, generation)
        } else {
            self.nodes.push(None);
            self.generations.push(1);
            (self.nodes.len() - 1, 1)
        }
    }

    // --- adding and removing items ----------------------------------------

    /// Add a detached item (and its detached children) as a top-level item.
    pub fn add_item(&mut self, item: Item) -> ItemId {
        self.begin_selection_change();
        let id = self.attach(None, item);
        self.end_selection_change();
        id
    }

    /// Add a detached item as the last child of `parent`.
    ///
    /// Returns `None` (and drops the item) if `parent` is stale.
    pub fn add_child(&mut self, parent: ItemId, item: Item) -> Option<ItemId> {
        if !self.is_alive(parent) {
            log::warn!("Scene::add_child: stale parent {parent:?}");
            return None;
        }
        self.begin_selection_change();
        let id = self.attach(Some(parent), item);
        self.end_selection_change();
        Some(id)
    }

    fn attach(&mut self, parent: Option<ItemId>, item: Item) -> ItemId {
        let (idx, generation) = self.alloc_slot();
        let (node, children) = Node::from_item(generation, item);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ItemId slots are 32-bit."
        )]
        let id = ItemId::new(idx as u32, generation);
        self.nodes[idx] = Some(node);

        self.link_child(id, parent);
        self.refresh_inherited_state(id);

        let bounds = self.scene_bounding_rect(id).unwrap_or(Rect::ZERO);
        self.index.add_item(id, bounds);
        if self.node(id).is_some_and(Node::is_untransformable) {
            self.index
                .item_change(id, IndexChange::IgnoresTransformations(true));
        }
        self.tasks |= TaskQueue::UPDATE_INDEX;

        self.unpolished.push(id);
        self.tasks |= TaskQueue::POLISH;

        self.mark_dirty(id, MarkDirty::full());
        self.dirty_growing_rect = true;
        self.tasks |= TaskQueue::UPDATE_SCENE_RECT;

        let Some(node) = self.node(id) else {
            return id;
        };
        let selected = node.selected;
        let is_panel = node.is_panel();
        let modal = node.visible && node.modality != PanelModality::NonModal;
        let sends_scene_pos = node.flags.contains(ItemFlags::SENDS_SCENE_POSITION_CHANGES);
        if selected {
            self.selected.push(id);
            self.selection_change_pending = true;
        }
        if is_panel && modal {
            self.enter_modal(id, None);
        }

        for child in children {
            self.attach(Some(id), child);
        }

        if is_panel && self.last_active_panel.is_none() && self.active_panel.is_none() {
            if self.is_active() {
                self.set_active_panel(Some(id));
            } else {
                self.last_active_panel = Some(id);
            }
        }
        if sends_scene_pos {
            self.scene_pos_items.insert(id);
        }
        if let Some(p) = parent {
            self.item_changed(p, &crate::handler::ItemChange::ChildAdded(id));
        }
        id
    }

    /// Remove an item and its subtree from the scene and return it detached.
    ///
    /// Focus, selection, grabs, hover, filters and custom data referring to the
    /// subtree are cleared; the repaint of the area it covered is scheduled.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        if !self.is_alive(id) {
            log::warn!("Scene::remove_item: stale item {id:?}");
            return None;
        }
        self.begin_selection_change();
        self.forget_subtree(id, false);
        self.unlink_child(id);
        let item = self.take_subtree(id);
        self.end_selection_change();
        self.dirty_growing_rect = true;
        self.tasks |= TaskQueue::UPDATE_SCENE_RECT;
        Some(item)
    }

    /// Destroy an item and its subtree.
    ///
    /// Children are destroyed before their parent. Geometry preparation and
    /// change hooks are suppressed, and grabbers being destroyed receive no
    /// ungrab events.
    pub fn destroy_item(&mut self, id: ItemId) {
        if !self.is_alive(id) {
            log::warn!("Scene::destroy_item: stale item {id:?}");
            return;
        }
        self.set_in_destructor(id);
        self.begin_selection_change();
        self.forget_subtree(id, true);
        self.unlink_child(id);
        drop(self.take_subtree(id));
        self.end_selection_change();
    }

    /// Destroy every item.
    pub fn clear(&mut self) {
        for id in self.top_level_items() {
            self.destroy_item(id);
        }
        self.index.clear();
        self.growing_rect = Rect::ZERO;
    }

    fn set_in_destructor(&mut self, id: ItemId) {
        let children = match self.node_mut(id) {
            Some(n) => {
                n.in_destructor = true;
                n.children.ids.clone()
            }
            None => return,
        };
        for c in children {
            self.set_in_destructor(c);
        }
    }

    /// Scrub every scene-owned reference to the subtree rooted at `id`.
    fn forget_subtree(&mut self, id: ItemId, dying: bool) {
        let children = self.node(id).map(|n| n.children.ids.clone()).unwrap_or_default();
        if dying {
            for &c in &children {
                self.forget_subtree(c, dying);
            }
            self.forget_item(id, dying);
        } else {
            self.forget_item(id, dying);
            for &c in &children {
                self.forget_subtree(c, dying);
            }
        }
    }

    fn forget_item(&mut self, id: ItemId, dying: bool) {
        self.clear_focus(id);
        self.mark_removed_dirty(id);
        self.index.remove_item(id);
        self.clear_sub_focus(id);
        self.scene_pos_items.remove(&id);

        if self.focus_item == Some(id) {
            self.focus_item = None;
        }
        for slot in [
            &mut self.last_focus_item,
            &mut self.passive_focus_item,
            &mut self.active_panel,
            &mut self.last_active_panel,
            &mut self.last_mouse_grabber,
            &mut self.drag_drop_item,
        ] {
            if *slot == Some(id) {
                *slot = None;
            }
        }

        let before = self.selected.len();
        self.selected.retain(|s| *s != id);
        if self.selected.len() != before {
            self.selection_change_pending = true;
        }
        self.hover_items.retain(|h| *h != id);
        self.cached_items_under_mouse.retain(|h| *h != id);
        self.touch_items.retain(|_, item| *item != id);
        self.touch_points.retain(|p, _| self.touch_items.contains_key(p));
        self.touch_begin_accepted.remove(&id);
        self.gesture_targets.retain(|_, item| *item != id);
        self.unpolished.retain(|h| *h != id);
        self.index_pending.retain(|h| *h != id);
        self.moving_initial.remove(&id);

        self.event_filters.remove(&id);
        for filters in self.event_filters.values_mut() {
            filters.retain(|f| *f != id);
        }
        self.item_data.retain(|(item, _), _| *item != id);

        if self.modal_panels.contains(&id) {
            self.leave_modal(id);
        }
        if self.mouse_grabbers.contains(&id) {
            self.ungrab_mouse_helper(id, dying);
        }
        if self.keyboard_grabbers.contains(&id) {
            self.ungrab_keyboard_helper(id, dying);
        }
        for view in self.views.iter_mut().flatten() {
            view.forget_item(id);
        }
        if let Some(n) = self.node_mut(id) {
            n.dirty.reset();
        }
    }

    /// Free the slots of a subtree that is already unlinked, rebuilding the detached item.
    fn take_subtree(&mut self, id: ItemId) -> Item {
        let Some(node) = self.nodes.get_mut(id.idx()).and_then(Option::take) else {
            return Item::default();
        };
        self.free_list.push(id.idx());
        let child_ids = node.children.ids.clone();
        let mut item = node.into_item();
        item.children = child_ids
            .into_iter()
            .map(|c| self.take_subtree(c))
            .collect();
        item
    }

    // --- simple property access -------------------------------------------

    /// The item's content.
    pub fn content(&self, id: ItemId) -> Option<&Content> {
        self.node(id).map(|n| &n.content)
    }

    /// Replace the item's content. Bounds change, so the old area is repainted too.
    pub fn set_content(&mut self, id: ItemId, content: Content) {
        if !self.is_alive(id) {
            return;
        }
        self.prepare_geometry_change(id);
        if let Some(n) = self.node_mut(id) {
            n.content = content;
        }
        self.update_item(id);
    }

    /// Modify the item's content in place. Bounds may change, so this
    /// announces a geometry change first.
    pub fn with_content_mut<R>(&mut self, id: ItemId, f: impl FnOnce(&mut Content) -> R) -> Option<R> {
        if !self.is_alive(id) {
            return None;
        }
        self.prepare_geometry_change(id);
        let r = self.node_mut(id).map(|n| f(&mut n.content));
        self.update_item(id);
        r
    }

    /// Position in parent coordinates.
    pub fn pos(&self, id: ItemId) -> Option<Point> {
        self.node(id).map(|n| n.pos)
    }

    /// Flags.
    pub fn flags(&self, id: ItemId) -> Option<ItemFlags> {
        self.node(id).map(|n| n.flags)
    }

    /// Stacking value.
    pub fn z_value(&self, id: ItemId) -> Option<f64> {
        self.node(id).map(|n| n.z)
    }

    /// Local opacity.
    pub fn opacity(&self, id: ItemId) -> Option<f64> {
        self.node(id).map(|n| n.opacity)
    }

    /// Effective visibility (hidden ancestors hide their descendants).
    pub fn is_visible(&self, id: ItemId) -> bool {
        self.node(id).is_some_and(|n| n.visible)
    }

    /// Effective enabled state.
    pub fn is_enabled(&self, id: ItemId) -> bool {
        self.node(id).is_some_and(|n| n.enabled)
    }

    /// Selection state.
    pub fn is_selected(&self, id: ItemId) -> bool {
        self.node(id).is_some_and(|n| n.selected)
    }

    /// Whether the item receives hover events.
    pub fn accepts_hover(&self, id: ItemId) -> bool {
        self.node(id).is_some_and(|n| n.accepts_hover)
    }

    /// Whether the item receives drag-and-drop events.
    pub fn accepts_drops(&self, id: ItemId) -> bool {
        self.node(id).is_some_and(|n| n.accepts_drops)
    }

    /// Whether the item receives touch events.
    pub fn accepts_touch(&self, id: ItemId) -> bool {
        self.node(id).is_some_and(|n| n.accepts_touch)
    }

    /// Gesture types the item grabbed.
    pub fn grabbed_gestures(&self, id: ItemId) -> &[GestureKind] {
        self.node(id).map_or(&[], |n| n.gestures.as_slice())
    }

    /// Panel modality.
    pub fn panel_modality(&self, id: ItemId) -> Option<PanelModality> {
        self.node(id).map(|n| n.modality)
    }

    /// Cursor shape shown over the item.
    pub fn cursor(&self, id: ItemId) -> Option<crate::types::CursorShape> {
        self.node(id).and_then(|n| n.cursor)
    }

    /// Tooltip text.
    pub fn tooltip(&self, id: ItemId) -> Option<&str> {
        self.node(id).and_then(|n| n.tooltip.as_deref())
    }

    /// Background brush painted behind all items.
    pub fn background(&self) -> Option<&Brush> {
        self.background.as_ref()
    }

    /// Set the background brush and repaint everything.
    pub fn set_background(&mut self, brush: Option<Brush>) {
        self.background = brush;
        self.update(None);
    }

    /// Foreground brush painted over all items.
    pub fn foreground(&self) -> Option<&Brush> {
        self.foreground.as_ref()
    }

    /// Set the foreground brush and repaint everything.
    pub fn set_foreground(&mut self, brush: Option<Brush>) {
        self.foreground = brush;
        self.update(None);
    }

    // --- custom data ---------------------------------------------------------

    /// Attach a value to an item under `key`. It is dropped with the item.
    pub fn set_item_data<T: Any>(&mut self, id: ItemId, key: u32, value: T) {
        if !self.is_alive(id) {
            log::warn!("Scene::set_item_data: stale item {id:?}");
            return;
        }
        self.item_data.insert((id, key), Box::new(value));
    }

    /// Read a value attached with [`Scene::set_item_data`].
    pub fn item_data<T: Any>(&self, id: ItemId, key: u32) -> Option<&T> {
        self.item_data.get(&(id, key))?.downcast_ref::<T>()
    }

    /// Remove and return a value attached with [`Scene::set_item_data`].
    pub fn take_item_data<T: Any>(&mut self, id: ItemId, key: u32) -> Option<T> {
        let boxed = self.item_data.remove(&(id, key))?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    // --- notifications -------------------------------------------------------

    /// Drain queued observer notifications.
    pub fn take_notifications(&mut self) -> Vec<SceneNotification> {
        core::mem::take(&mut self.notifications)
    }

    /// Turn changed-region tracking on or off.
    ///
    /// While on, repaint requests are accumulated as scene rects and reported
    /// through [`SceneNotification::Changed`] in addition to reaching views.
    pub fn set_changed_tracking(&mut self, on: bool) {
        self.changed_tracking = on;
    }

    /// Whether changed-region tracking is on.
    pub fn changed_tracking(&self) -> bool {
        self.changed_tracking
    }

    /// Per-task run counters.
    pub fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    /// Tasks scheduled for the next frame.
    pub fn pending_tasks(&self) -> TaskQueue {
        self.tasks
    }

    // --- scene rect ----------------------------------------------------------

    /// The explicit scene rect, or the union of every item bounding rect seen so far.
    pub fn scene_rect(&mut self) -> Rect {
        if let Some(r) = self.options.scene_rect {
            return r;
        }
        if self.dirty_growing_rect {
            self.grow_scene_rect();
        }
        self.growing_rect
    }

    /// Set an explicit scene rect, or `None` to grow with the items again.
    pub fn set_scene_rect(&mut self, rect: Option<Rect>) {
        self.options.scene_rect = rect;
        if rect.is_none() {
            self.growing_rect = Rect::ZERO;
            self.dirty_growing_rect = true;
        }
        let r = self.scene_rect();
        self.notifications.push(SceneNotification::SceneRectChanged(r));
        for view in self.views.iter_mut().flatten() {
            view.scene_rect_changed(r);
        }
    }

    pub(crate) fn grow_scene_rect(&mut self) {
        self.dirty_growing_rect = false;
        if self.options.scene_rect.is_some() {
            return;
        }
        let old = self.growing_rect;
        self.growing_rect = crate::geometry::unite(old, self.items_bounding_rect());
        if old != self.growing_rect {
            let r = self.growing_rect;
            self.notifications.push(SceneNotification::SceneRectChanged(r));
            for view in self.views.iter_mut().flatten() {
                view.scene_rect_changed(r);
            }
        }
    }

    // --- views ---------------------------------------------------------------

    /// Attach a new view of `viewport` size.
    pub fn add_view(&mut self, options: ViewOptions, viewport: Size) -> ViewId {
        let (idx, generation) = if let Some(idx) = self.view_free.pop() {
            let generation = self.view_generations[idx].saturating_add(1);
            self.view_generations[idx] = generation;
            (idx, generation)
        } else {
            self.views.push(None);
            self.view_generations.push(1);
            (self.views.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ViewId slots are 32-bit."
        )]
        let id = ViewId(idx as u32, generation);
        let scene_rect = self.scene_rect();
        self.views[idx] = Some(View::new(id, options, viewport, scene_rect));
        id
    }

    /// Detach a view.
    pub fn remove_view(&mut self, id: ViewId) {
        if self.view(id).is_none() {
            return;
        }
        if self.view(id).is_some_and(|v| v.activated) {
            self.deactivate();
        }
        self.views[id.idx()] = None;
        self.view_free.push(id.idx());
    }

    /// Shared access to a view.
    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(id.idx())?.as_ref().filter(|v| v.id == id)
    }

    pub(crate) fn view_state_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(id.idx())?.as_mut().filter(|v| v.id == id)
    }

    /// Mutable access to a view together with its scene.
    pub fn view_mut(&mut self, id: ViewId) -> Option<ViewMut<'_>> {
        self.view(id)?;
        Some(ViewMut::new(self, id))
    }

    /// Handles of every attached view.
    pub fn views(&self) -> Vec<ViewId> {
        self.views.iter().flatten().map(|v| v.id).collect()
    }

    pub(crate) fn has_views(&self) -> bool {
        self.views.iter().any(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ShapeStyle;
    use peniko::Color;

    pub(crate) fn rect_item(w: f64, h: f64) -> Item {
        Item::new(Content::rect(
            Rect::new(0.0, 0.0, w, h),
            ShapeStyle::filled(Color::WHITE),
        ))
    }

    #[test]
    fn stale_handles_after_removal_and_reuse() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0));
        assert!(scene.destroy_item_returns_stale(a), "destroyed handle is stale");
        let b = scene.add_item(rect_item(5.0, 5.0));
        assert_eq!(a.idx(), b.idx(), "slot is reused");
        assert_ne!(a, b, "generation differs");
        assert!(scene.pos(a).is_none(), "stale handle reads nothing");
    }

    impl Scene {
        fn destroy_item_returns_stale(&mut self, id: ItemId) -> bool {
            self.destroy_item(id);
            !self.is_alive(id)
        }
    }

    #[test]
    fn remove_returns_detached_subtree() {
        let mut scene = Scene::new();
        let a = scene.add_item(
            rect_item(10.0, 10.0).with_child(rect_item(2.0, 2.0).with_pos((20.0, 20.0))),
        );
        let child = scene.children(a)[0];
        assert_eq!(scene.item_count(), 2, "parent and child");
        let item = scene.remove_item(a).expect("item was alive");
        assert_eq!(item.children().len(), 1, "child comes back");
        assert_eq!(item.children()[0].pos(), Point::new(20.0, 20.0), "child state kept");
        assert!(!scene.is_alive(child), "child handle is stale");
        assert_eq!(scene.item_count(), 0, "scene is empty");
    }

    #[test]
    fn custom_data_is_dropped_with_item() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(1.0, 1.0));
        scene.set_item_data(a, 7, 42_u32);
        assert_eq!(scene.item_data::<u32>(a, 7), Some(&42), "stored");
        assert_eq!(scene.item_data::<i64>(a, 7), None, "typed access");
        scene.destroy_item(a);
        let b = scene.add_item(rect_item(1.0, 1.0));
        assert_eq!(scene.item_data::<u32>(b, 7), None, "no leakage into reused slot");
    }
}
