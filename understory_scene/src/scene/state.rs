// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item properties that go through the change-hook protocol.

use alloc::string::String;
use alloc::vec::Vec;
use core::mem::discriminant;

use understory_scene_index::IndexChange;

use super::Scene;
use super::dirty::MarkDirty;
use super::geometry::TRANSPARENT_OPACITY;
use crate::events::GestureKind;
use crate::handler::ItemChange;
use crate::types::{CursorShape, FocusReason, ItemFlags, ItemId, MouseButtons, PanelModality};

impl Scene {
    /// Offer a proposed change to the item's hook and return the value to apply.
    ///
    /// Returns `None` for stale items. Items being destroyed skip their hooks.
    pub(crate) fn item_changing(&mut self, id: ItemId, proposed: ItemChange) -> Option<ItemChange> {
        let node = self.node_mut(id)?;
        if node.in_destructor {
            return Some(proposed);
        }
        let Some(mut hook) = node.hook.take() else {
            return Some(proposed);
        };
        let adjusted = hook.item_changing(self, id, proposed.clone());
        if let Some(n) = self.node_mut(id) {
            if n.hook.is_none() {
                n.hook = Some(hook);
            }
        }
        if discriminant(&adjusted) == discriminant(&proposed) {
            Some(adjusted)
        } else {
            log::warn!("item_changing for {id:?} returned {adjusted:?} for {proposed:?}");
            Some(proposed)
        }
    }

    /// Report an applied change to the item's hook.
    pub(crate) fn item_changed(&mut self, id: ItemId, change: &ItemChange) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if node.in_destructor {
            return;
        }
        let Some(mut hook) = node.hook.take() else {
            return;
        };
        hook.item_changed(self, id, change);
        if let Some(n) = self.node_mut(id) {
            if n.hook.is_none() {
                n.hook = Some(hook);
            }
        }
    }

    /// Report the new scene position to subscribed items at or below `id`.
    pub(crate) fn send_scene_pos_changes(&mut self, id: ItemId) {
        if self.scene_pos_items.is_empty() {
            return;
        }
        let affected: Vec<ItemId> = self
            .scene_pos_items
            .iter()
            .copied()
            .filter(|p| *p == id || self.is_ancestor_of(id, *p))
            .collect();
        for p in affected {
            if let Some(pos) = self.scene_pos(p) {
                self.item_changed(p, &ItemChange::ScenePosition(pos));
            }
        }
    }

    // --- flags ----------------------------------------------------------------

    /// Replace the item's flags.
    pub fn set_flags(&mut self, id: ItemId, flags: ItemFlags) {
        let Some(old) = self.flags(id) else {
            log::warn!("Scene::set_flags: stale item {id:?}");
            return;
        };
        let Some(ItemChange::Flags(mut flags)) = self.item_changing(id, ItemChange::Flags(flags))
        else {
            return;
        };
        if flags.contains(ItemFlags::NEGATIVE_Z_STACKS_BEHIND_PARENT)
            && self.z_value(id).is_some_and(|z| z < 0.0)
        {
            flags |= ItemFlags::STACKS_BEHIND_PARENT;
        }
        if old == flags {
            return;
        }
        let changed = old ^ flags;
        let has_focus = self.has_focus(id);
        if let Some(n) = self.node_mut(id) {
            n.flags = flags;
        }
        if changed.contains(ItemFlags::FOCUSABLE) && !flags.contains(ItemFlags::FOCUSABLE) && has_focus {
            self.clear_focus(id);
        }
        if changed.contains(ItemFlags::SELECTABLE)
            && !flags.contains(ItemFlags::SELECTABLE)
            && self.is_selected(id)
        {
            self.set_selected(id, false);
        }
        if changed.intersects(ItemFlags::CLIPS_CHILDREN_TO_SHAPE | ItemFlags::IGNORES_TRANSFORMATIONS) {
            self.refresh_inherited_state(id);
            if changed.contains(ItemFlags::IGNORES_TRANSFORMATIONS) {
                self.index.item_change(
                    id,
                    IndexChange::IgnoresTransformations(
                        self.node(id).is_some_and(|n| n.is_untransformable()),
                    ),
                );
            }
            self.mark_dirty(id, MarkDirty::full().invalidate_children());
        }
        if changed.contains(ItemFlags::CLIPS_TO_SHAPE) {
            self.mark_dirty(id, MarkDirty::full());
        }
        if changed.contains(ItemFlags::STACKS_BEHIND_PARENT) {
            self.needs_resort(id);
            if let Some(p) = self.parent(id) {
                self.update_item(p);
            }
        }
        if changed.contains(ItemFlags::SENDS_SCENE_POSITION_CHANGES) {
            if flags.contains(ItemFlags::SENDS_SCENE_POSITION_CHANGES) {
                self.scene_pos_items.insert(id);
            } else {
                self.scene_pos_items.remove(&id);
            }
        }
        self.item_changed(id, &ItemChange::Flags(flags));
    }

    /// Turn one flag (or several) on or off.
    pub fn set_flag(&mut self, id: ItemId, flag: ItemFlags, on: bool) {
        if let Some(mut flags) = self.flags(id) {
            flags.set(flag, on);
            self.set_flags(id, flags);
        }
    }

    fn needs_resort(&mut self, id: ItemId) {
        match self.parent(id) {
            Some(p) => {
                if let Some(n) = self.node_mut(p) {
                    n.children.needs_sort = true;
                }
            }
            None => self.top_level.needs_sort = true,
        }
    }

    // --- stacking ---------------------------------------------------------------

    /// Set the stacking value.
    pub fn set_z_value(&mut self, id: ItemId, z: f64) {
        let Some(old) = self.z_value(id) else {
            return;
        };
        let Some(ItemChange::ZValue(z)) = self.item_changing(id, ItemChange::ZValue(z)) else {
            return;
        };
        if z == old {
            return;
        }
        if let Some(n) = self.node_mut(id) {
            n.z = z;
            if n.flags.contains(ItemFlags::NEGATIVE_Z_STACKS_BEHIND_PARENT) {
                n.flags.set(ItemFlags::STACKS_BEHIND_PARENT, z < 0.0);
            }
        }
        self.needs_resort(id);
        self.index.item_change(id, IndexChange::ZValue(z));
        self.mark_dirty(id, MarkDirty::full().invalidate_children());
        self.item_changed(id, &ItemChange::ZValue(z));
    }

    // --- opacity ------------------------------------------------------------------

    /// Set the local opacity, clamped to `0..=1`.
    pub fn set_opacity(&mut self, id: ItemId, opacity: f64) {
        let Some(old) = self.opacity(id) else {
            return;
        };
        let Some(ItemChange::Opacity(o)) =
            self.item_changing(id, ItemChange::Opacity(opacity.clamp(0.0, 1.0)))
        else {
            return;
        };
        let o = o.clamp(0.0, 1.0);
        if o == old {
            return;
        }
        if let Some(n) = self.node_mut(id) {
            n.opacity = o;
        }
        let mut request = MarkDirty::full().invalidate_children();
        if o < TRANSPARENT_OPACITY || old < TRANSPARENT_OPACITY {
            request = request.ignore_opacity();
        }
        self.mark_dirty(id, request);
        self.item_changed(id, &ItemChange::Opacity(o));
    }

    /// Opacity after combining with ancestors that propagate theirs.
    pub fn effective_opacity(&self, id: ItemId) -> f64 {
        let Some(n) = self.node(id) else {
            return 0.0;
        };
        let mut o = n.opacity;
        let mut my_flags = n.flags;
        let mut cur = n.parent;
        while let Some(p) = cur.and_then(|p| self.node(p)) {
            if my_flags.contains(ItemFlags::IGNORES_PARENT_OPACITY)
                || p.flags.contains(ItemFlags::DOESNT_PROPAGATE_OPACITY_TO_CHILDREN)
            {
                break;
            }
            o *= p.opacity;
            my_flags = p.flags;
            cur = p.parent;
        }
        o
    }

    /// Whether every child of `id` inherits its opacity.
    ///
    /// False when the item doesn't propagate opacity or when any child
    /// ignores its parent's opacity.
    pub(crate) fn children_combine_opacity(&self, id: ItemId) -> bool {
        let Some(n) = self.node(id) else {
            return true;
        };
        if !n.propagates_opacity() {
            return false;
        }
        !n.children.ids.iter().any(|c| {
            self.flags(*c)
                .is_some_and(|f| f.contains(ItemFlags::IGNORES_PARENT_OPACITY))
        })
    }

    /// Whether nothing of the item itself would be visible.
    pub fn is_fully_transparent(&self, id: ItemId) -> bool {
        let Some(n) = self.node(id) else {
            return true;
        };
        if n.opacity < TRANSPARENT_OPACITY {
            return true;
        }
        n.parent.is_some() && self.effective_opacity(id) < TRANSPARENT_OPACITY
    }

    // --- visibility -----------------------------------------------------------------

    /// Show or hide the item. Hidden parents hide their children without
    /// changing the children's explicit state.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) {
        if !self.is_alive(id) {
            log::warn!("Scene::set_visible: stale item {id:?}");
            return;
        }
        self.set_visible_helper(id, visible, true);
    }

    /// Shorthand for `set_visible(id, true)`.
    pub fn show(&mut self, id: ItemId) {
        self.set_visible(id, true);
    }

    /// Shorthand for `set_visible(id, false)`.
    pub fn hide(&mut self, id: ItemId) {
        self.set_visible(id, false);
    }

    /// Whether the item was hidden explicitly (rather than through an ancestor).
    pub fn is_explicitly_hidden(&self, id: ItemId) -> bool {
        self.node(id).is_some_and(|n| n.explicitly_hidden)
    }

    fn set_visible_helper(&mut self, id: ItemId, new_visible: bool, explicitly: bool) {
        let Some(n) = self.node_mut(id) else { return };
        if explicitly {
            n.explicitly_hidden = !new_visible;
        }
        if n.visible == new_visible {
            return;
        }
        let parent = n.parent;
        if new_visible && parent.is_some_and(|p| !self.is_visible(p)) {
            return;
        }
        let Some(ItemChange::Visible(new_visible)) =
            self.item_changing(id, ItemChange::Visible(new_visible))
        else {
            return;
        };
        if self.is_visible(id) == new_visible {
            return;
        }
        if let Some(n) = self.node_mut(id) {
            n.visible = new_visible;
        }
        self.mark_dirty(id, MarkDirty::full().force());

        let has_focus = self.has_focus(id);
        let is_modal_panel = self
            .node(id)
            .is_some_and(|n| n.is_panel() && n.modality != PanelModality::NonModal);
        if new_visible {
            if let Some(n) = self.node_mut(id) {
                n.dirty.geometry_changed = true;
                n.dirty.painted_view_rects_need_repaint = true;
            }
            if is_modal_panel {
                self.enter_modal(id, None);
            }
        } else {
            if self.mouse_grabbers.contains(&id) {
                self.ungrab_mouse(id);
            }
            if self.keyboard_grabbers.contains(&id) {
                self.ungrab_keyboard(id);
            }
            if is_modal_panel {
                self.leave_modal(id);
            }
            if has_focus {
                self.clear_focus_helper(id, false);
            }
            if self.is_selected(id) {
                self.set_selected(id, false);
            }
            self.hover_items.retain(|h| *h != id);
        }

        let children = self.node(id).map(|n| n.children.ids.clone()).unwrap_or_default();
        for c in children {
            if !new_visible || !self.is_explicitly_hidden(c) {
                self.set_visible_helper(c, new_visible, false);
            }
        }

        if self.is_panel(id) {
            if new_visible {
                if parent.is_some_and(|p| self.is_active_item(p)) {
                    self.set_active_panel(Some(id));
                }
            } else if self.is_active_item(id) {
                self.set_active_panel(parent);
            }
        }

        if new_visible {
            self.restore_focus_after_show(id, parent);
        } else if has_focus {
            let mut cur = parent;
            while let Some(p) = cur {
                if self.flags(p).is_some_and(|f| f.contains(ItemFlags::IS_FOCUS_SCOPE)) {
                    if self.is_visible(p) {
                        self.set_focus_helper(p, FocusReason::Other, false, true);
                    }
                    break;
                }
                cur = self.parent(p);
            }
        }
        self.item_changed(id, &ItemChange::Visible(new_visible));
    }

    fn restore_focus_after_show(&mut self, id: ItemId, parent: Option<ItemId>) {
        let mut cur = parent;
        while let Some(p) = cur {
            if self.flags(p).is_some_and(|f| f.contains(ItemFlags::IS_FOCUS_SCOPE)) {
                let fsi = self.live(self.node(p).and_then(|n| n.focus_scope_item));
                if let Some(mut fsi) = fsi.filter(|f| *f == id || self.is_ancestor_of(id, *f)) {
                    while let Some(next) = self
                        .live(self.node(fsi).and_then(|n| n.focus_scope_item))
                        .filter(|n| self.is_visible(*n))
                    {
                        fsi = next;
                    }
                    self.set_focus_helper(fsi, FocusReason::Other, true, false);
                    return;
                }
                break;
            }
            cur = self.parent(p);
        }
        let sub = self.live(self.node(id).and_then(|n| n.sub_focus_item));
        if let Some(fi) = sub {
            if Some(fi) != self.focus_item {
                self.set_focus_item(Some(fi), FocusReason::Other);
            }
        }
    }

    // --- enabled ----------------------------------------------------------------------

    /// Enable or disable the item. Disabled parents disable their children
    /// without changing the children's explicit state.
    pub fn set_enabled(&mut self, id: ItemId, enabled: bool) {
        if !self.is_alive(id) {
            log::warn!("Scene::set_enabled: stale item {id:?}");
            return;
        }
        self.set_enabled_helper(id, enabled, true);
    }

    fn set_enabled_helper(&mut self, id: ItemId, new_enabled: bool, explicitly: bool) {
        let Some(n) = self.node_mut(id) else { return };
        if explicitly {
            n.explicitly_disabled = !new_enabled;
        }
        if n.enabled == new_enabled {
            return;
        }
        let parent = n.parent;
        if new_enabled && parent.is_some_and(|p| !self.is_enabled(p)) {
            return;
        }
        let Some(ItemChange::Enabled(new_enabled)) =
            self.item_changing(id, ItemChange::Enabled(new_enabled))
        else {
            return;
        };
        if self.is_enabled(id) == new_enabled {
            return;
        }
        if !new_enabled {
            if self.mouse_grabbers.contains(&id) {
                self.ungrab_mouse(id);
            }
            if self.keyboard_grabbers.contains(&id) {
                self.ungrab_keyboard(id);
            }
            if self.has_focus(id) {
                self.clear_focus_helper(id, true);
            }
            if self.is_selected(id) {
                self.set_selected(id, false);
            }
            self.hover_items.retain(|h| *h != id);
        }
        if let Some(n) = self.node_mut(id) {
            n.enabled = new_enabled;
        }
        self.update_item(id);
        let children = self.node(id).map(|n| n.children.ids.clone()).unwrap_or_default();
        for c in children {
            let explicitly_disabled = self.node(c).is_some_and(|n| n.explicitly_disabled);
            if !new_enabled || !explicitly_disabled {
                self.set_enabled_helper(c, new_enabled, false);
            }
        }
        self.item_changed(id, &ItemChange::Enabled(new_enabled));
    }

    // --- input acceptance -------------------------------------------------------------

    /// Receive hover events.
    pub fn set_accepts_hover(&mut self, id: ItemId, accepts: bool) {
        if let Some(n) = self.node_mut(id) {
            n.accepts_hover = accepts;
        }
        if !accepts {
            self.hover_items.retain(|h| *h != id);
        }
    }

    /// Mouse buttons the item accepts presses for.
    pub fn set_accepted_buttons(&mut self, id: ItemId, buttons: MouseButtons) {
        if let Some(n) = self.node_mut(id) {
            n.accepted_buttons = buttons;
        }
    }

    /// Mouse buttons the item accepts presses for.
    pub fn accepted_buttons(&self, id: ItemId) -> MouseButtons {
        self.node(id)
            .map_or(MouseButtons::empty(), |n| n.accepted_buttons)
    }

    /// Receive drag-and-drop events.
    pub fn set_accepts_drops(&mut self, id: ItemId, accepts: bool) {
        if let Some(n) = self.node_mut(id) {
            n.accepts_drops = accepts;
        }
    }

    /// Receive touch events. Items that stop accepting keep the points they
    /// already own until those are lifted.
    pub fn set_accepts_touch(&mut self, id: ItemId, accepts: bool) {
        if let Some(n) = self.node_mut(id) {
            n.accepts_touch = accepts;
        }
    }

    /// Receive gestures of `kind` that start over the item.
    pub fn grab_gesture(&mut self, id: ItemId, kind: GestureKind) {
        if let Some(n) = self.node_mut(id) {
            if !n.gestures.contains(&kind) {
                n.gestures.push(kind);
            }
        }
    }

    /// Stop receiving gestures of `kind`. A gesture in progress is dropped.
    pub fn ungrab_gesture(&mut self, id: ItemId, kind: GestureKind) {
        if let Some(n) = self.node_mut(id) {
            n.gestures.retain(|g| *g != kind);
        }
        if self.gesture_targets.get(&kind) == Some(&id) {
            self.gesture_targets.remove(&kind);
        }
    }

    /// Receive the events of all descendants instead of them.
    pub fn set_handles_child_events(&mut self, id: ItemId, handles: bool) {
        let Some(n) = self.node_mut(id) else { return };
        if n.handles_child_events == handles {
            return;
        }
        n.handles_child_events = handles;
        self.refresh_inherited_state(id);
    }

    /// Filter the events of all descendants through this item's handler.
    pub fn set_filters_child_events(&mut self, id: ItemId, filters: bool) {
        let Some(n) = self.node_mut(id) else { return };
        if n.filters_child_events == filters {
            return;
        }
        n.filters_child_events = filters;
        self.refresh_inherited_state(id);
    }

    // --- cursor, tooltip ------------------------------------------------------------------

    /// Set or unset the cursor shown over the item.
    pub fn set_cursor(&mut self, id: ItemId, cursor: Option<CursorShape>) {
        let Some(ItemChange::Cursor(cursor)) = self.item_changing(id, ItemChange::Cursor(cursor))
        else {
            return;
        };
        if let Some(n) = self.node_mut(id) {
            n.cursor = cursor;
        }
        self.item_changed(id, &ItemChange::Cursor(cursor));
    }

    /// Set or unset the tooltip.
    pub fn set_tooltip(&mut self, id: ItemId, tooltip: Option<String>) {
        let Some(ItemChange::ToolTip(tooltip)) =
            self.item_changing(id, ItemChange::ToolTip(tooltip))
        else {
            return;
        };
        if let Some(n) = self.node_mut(id) {
            n.tooltip = tooltip.clone();
        }
        self.item_changed(id, &ItemChange::ToolTip(tooltip));
    }

    // --- focus proxy, modality --------------------------------------------------------------

    /// Forward focus requests for `id` to `proxy`.
    pub fn set_focus_proxy(&mut self, id: ItemId, proxy: Option<ItemId>) {
        if !self.is_alive(id) {
            return;
        }
        if proxy == Some(id) {
            log::warn!("Scene::set_focus_proxy: {id:?} cannot be its own focus proxy");
            return;
        }
        if proxy == self.focus_proxy(id) {
            return;
        }
        if let Some(p) = proxy {
            if !self.is_alive(p) {
                log::warn!("Scene::set_focus_proxy: stale proxy {p:?}");
                return;
            }
            let mut f = self.focus_proxy(p);
            while let Some(next) = f {
                if next == id {
                    log::warn!("Scene::set_focus_proxy: {id:?} is already in the focus proxy chain");
                    return;
                }
                f = self.focus_proxy(next);
            }
        }
        let Some(ItemChange::FocusProxy(proxy)) =
            self.item_changing(id, ItemChange::FocusProxy(proxy))
        else {
            return;
        };
        if let Some(n) = self.node_mut(id) {
            n.focus_proxy = proxy;
        }
        self.item_changed(id, &ItemChange::FocusProxy(proxy));
    }

    /// The focus proxy.
    pub fn focus_proxy(&self, id: ItemId) -> Option<ItemId> {
        self.live(self.node(id)?.focus_proxy)
    }

    /// Change the panel modality, entering or leaving modality for visible panels.
    pub fn set_panel_modality(&mut self, id: ItemId, modality: PanelModality) {
        let Some(previous) = self.panel_modality(id) else {
            return;
        };
        let Some(ItemChange::PanelModality(modality)) =
            self.item_changing(id, ItemChange::PanelModality(modality))
        else {
            return;
        };
        if previous == modality {
            return;
        }
        let enter_leave = self.is_panel(id) && self.is_visible(id);
        if enter_leave && modality == PanelModality::NonModal {
            self.leave_modal(id);
        }
        if let Some(n) = self.node_mut(id) {
            n.modality = modality;
        }
        if enter_leave && modality != PanelModality::NonModal {
            let previous = (previous != PanelModality::NonModal).then_some(previous);
            self.enter_modal(id, previous);
        }
        self.item_changed(id, &ItemChange::PanelModality(modality));
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::rect_item;
    use super::*;
    use crate::handler::ItemChangeHook;
    use kurbo::Point;

    #[test]
    fn hook_adjusts_position() {
        let mut scene = Scene::new();
        let a = scene.add_item(
            rect_item(10.0, 10.0)
                .with_flags(ItemFlags::SENDS_GEOMETRY_CHANGES)
                .with_hook(|_: &Scene, _: ItemId, change: ItemChange| match change {
                    ItemChange::Position(p) => ItemChange::Position(Point::new(p.x.max(0.0), p.y)),
                    other => other,
                }),
        );
        scene.set_pos(a, (-5.0, 3.0));
        assert_eq!(scene.pos(a), Some(Point::new(0.0, 3.0)), "clamped by hook");
    }

    #[test]
    fn geometry_hook_needs_flag() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0).with_hook(
            |_: &Scene, _: ItemId, change: ItemChange| match change {
                ItemChange::Position(_) => ItemChange::Position(Point::ZERO),
                other => other,
            },
        ));
        scene.set_pos(a, (5.0, 5.0));
        assert_eq!(scene.pos(a), Some(Point::new(5.0, 5.0)), "hook not consulted");
    }

    struct Recorder(alloc::rc::Rc<core::cell::RefCell<Vec<ItemChange>>>);

    impl ItemChangeHook for Recorder {
        fn item_changed(&mut self, _: &Scene, _: ItemId, change: &ItemChange) {
            self.0.borrow_mut().push(change.clone());
        }
    }

    #[test]
    fn changed_hook_sees_final_values_and_children() {
        let log = alloc::rc::Rc::new(core::cell::RefCell::new(Vec::new()));
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0).with_hook(Recorder(log.clone())));
        scene.set_z_value(a, 3.0);
        let b = scene.add_child(a, rect_item(1.0, 1.0)).expect("alive");
        scene.set_opacity(a, 0.5);
        let seen = log.borrow().clone();
        assert_eq!(
            seen,
            [
                ItemChange::ZValue(3.0),
                ItemChange::ChildAdded(b),
                ItemChange::Opacity(0.5)
            ],
            "changes in order"
        );
    }

    #[test]
    fn transform_ops_go_through_geometry_hooks() {
        use crate::transform::TransformOp;
        use kurbo::Vec2;

        let mut scene = Scene::new();
        let a = scene.add_item(
            rect_item(10.0, 10.0)
                .with_flags(ItemFlags::SENDS_GEOMETRY_CHANGES)
                .with_hook(|_: &Scene, _: ItemId, change: ItemChange| match change {
                    ItemChange::TransformOps(mut ops) => {
                        ops.retain(|op| !matches!(op, TransformOp::Rotate { .. }));
                        ItemChange::TransformOps(ops)
                    }
                    other => other,
                }),
        );
        let before = scene.scene_bounding_rect(a);
        scene.set_transform_ops(
            a,
            alloc::vec![
                TransformOp::Rotate {
                    degrees: 45.0,
                    origin: Point::ZERO,
                },
                TransformOp::Translate(Vec2::new(7.0, 0.0)),
            ],
        );
        assert_eq!(
            scene.transform_ops(a),
            [TransformOp::Translate(Vec2::new(7.0, 0.0))],
            "hook dropped the rotation"
        );
        assert_ne!(scene.scene_bounding_rect(a), before, "geometry followed");

        let log = alloc::rc::Rc::new(core::cell::RefCell::new(Vec::new()));
        let b = scene.add_item(
            rect_item(1.0, 1.0)
                .with_flags(ItemFlags::SENDS_GEOMETRY_CHANGES)
                .with_hook(Recorder(log.clone())),
        );
        log.borrow_mut().clear();
        let ops = alloc::vec![TransformOp::Scale {
            sx: 2.0,
            sy: 3.0,
            origin: Point::ZERO,
        }];
        scene.set_transform_ops(b, ops.clone());
        scene.set_transform_ops(b, ops.clone());
        assert_eq!(
            *log.borrow(),
            [ItemChange::TransformOps(ops)],
            "reported once; the repeat is a no-op"
        );
    }

    #[test]
    fn mismatched_hook_variant_is_ignored() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(1.0, 1.0).with_hook(
            |_: &Scene, _: ItemId, _: ItemChange| ItemChange::Opacity(0.0),
        ));
        scene.set_z_value(a, 2.0);
        assert_eq!(scene.z_value(a), Some(2.0), "proposal used");
    }

    #[test]
    fn effective_opacity_and_flags() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(1.0, 1.0).with_opacity(0.5));
        let b = scene
            .add_child(a, rect_item(1.0, 1.0).with_opacity(0.5))
            .expect("alive");
        assert_eq!(scene.effective_opacity(b), 0.25, "combined");
        scene.set_flag(a, ItemFlags::DOESNT_PROPAGATE_OPACITY_TO_CHILDREN, true);
        assert_eq!(scene.effective_opacity(b), 0.5, "not propagated");
        scene.set_opacity(a, 0.0);
        assert!(scene.is_fully_transparent(a), "transparent parent");
        assert!(!scene.is_fully_transparent(b), "child unaffected");
    }

    #[test]
    fn a_child_ignoring_parent_opacity_breaks_combining() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(1.0, 1.0));
        let b = scene.add_child(a, rect_item(1.0, 1.0)).expect("alive");
        assert!(scene.children_combine_opacity(a), "plain children combine");
        scene.set_flag(b, ItemFlags::IGNORES_PARENT_OPACITY, true);
        assert!(!scene.children_combine_opacity(a), "one opted-out child is enough");
        scene.set_flag(b, ItemFlags::IGNORES_PARENT_OPACITY, false);
        scene.set_flag(a, ItemFlags::DOESNT_PROPAGATE_OPACITY_TO_CHILDREN, true);
        assert!(!scene.children_combine_opacity(a), "parent stops propagating");
    }

    #[test]
    fn explicit_visibility_survives_parent_toggle() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(1.0, 1.0));
        let b = scene.add_child(a, rect_item(1.0, 1.0)).expect("alive");
        let c = scene
            .add_child(a, rect_item(1.0, 1.0).with_visible(false))
            .expect("alive");
        scene.hide(a);
        assert!(!scene.is_visible(b), "hidden with parent");
        scene.show(a);
        assert!(scene.is_visible(b), "shown with parent");
        assert!(!scene.is_visible(c), "explicitly hidden child stays hidden");
    }

    #[test]
    fn focus_proxy_cycles_are_refused() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(1.0, 1.0));
        let b = scene.add_item(rect_item(1.0, 1.0));
        scene.set_focus_proxy(a, Some(b));
        scene.set_focus_proxy(b, Some(a));
        assert_eq!(scene.focus_proxy(a), Some(b), "first proxy set");
        assert_eq!(scene.focus_proxy(b), None, "cycle refused");
        scene.set_focus_proxy(a, Some(a));
        assert_eq!(scene.focus_proxy(a), Some(b), "self proxy refused");
    }
}
