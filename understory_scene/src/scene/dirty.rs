// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty marking and the per-frame task runner.
//!
//! Marking only flips bits on nodes and schedules [`TaskQueue`] kinds. The
//! work happens in [`Scene::run_pending_tasks`]: polish, index update, dirty
//! processing (which routes repaint rects to every view), changed-region
//! emission and the growing scene rect, each at most once per frame.

use alloc::vec::Vec;
use core::mem;

use kurbo::{Affine, Rect};

use super::Scene;
use super::geometry::TRANSPARENT_OPACITY;
use crate::events::{SceneEvent, SceneNotification};
use crate::geometry::{adjust_rect, unite};
use crate::tasks::TaskQueue;
use crate::types::{ItemFlags, ItemId};
use crate::view::{PaintedRect, UpdateMode};

/// A repaint request for one item.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct MarkDirty {
    /// Local rect to repaint; `None` repaints the whole item.
    rect: Option<Rect>,
    invalidate_children: bool,
    force: bool,
    ignore_opacity: bool,
    removing: bool,
    update_bounding_rect: bool,
}

impl MarkDirty {
    /// Repaint the whole item.
    pub(crate) fn full() -> Self {
        Self::default()
    }

    /// Repaint part of the item, in local coordinates.
    pub(crate) fn rect(rect: Rect) -> Self {
        Self {
            rect: Some(rect),
            ..Self::default()
        }
    }

    /// Repaint every descendant too.
    pub(crate) fn invalidate_children(mut self) -> Self {
        self.invalidate_children = true;
        self
    }

    /// Process the item even if it is currently hidden.
    pub(crate) fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Process the item even if it is currently fully transparent.
    pub(crate) fn ignore_opacity(mut self) -> Self {
        self.ignore_opacity = true;
        self
    }

    fn removing(mut self) -> Self {
        self.removing = true;
        self
    }

    fn update_bounding_rect(mut self) -> Self {
        self.update_bounding_rect = true;
        self
    }
}

impl Scene {
    /// Record that an item needs repainting.
    pub(crate) fn mark_dirty(&mut self, id: ItemId, request: MarkDirty) {
        if self.update_all {
            return;
        }
        let MarkDirty {
            rect,
            invalidate_children,
            force,
            ignore_opacity,
            removing,
            update_bounding_rect,
        } = request;

        if removing && !ignore_opacity && self.node(id).is_some_and(|n| !n.dirty.ignore_opacity) {
            // A transparent ancestor may still have its repaint queued.
            let mut cur = self.node(id).and_then(|n| n.parent);
            while let Some(p) = cur.and_then(|p| self.node(p)) {
                if p.dirty.ignore_opacity {
                    if let Some(n) = self.node_mut(id) {
                        n.dirty.ignore_opacity = true;
                    }
                    break;
                }
                cur = p.parent;
            }
        }

        let transparent = self.is_fully_transparent(id);
        let combine = self.children_combine_opacity(id);
        let Some(n) = self.node_mut(id) else {
            return;
        };
        let discard = (!n.visible && !force && !n.dirty.ignore_visible)
            || (!(removing || invalidate_children) && n.dirty.full_update_pending)
            || (!ignore_opacity
                && !n.dirty.ignore_opacity
                && combine
                && transparent);
        if discard {
            if n.dirty.dirty {
                if force {
                    n.dirty.ignore_visible = true;
                }
                if ignore_opacity {
                    n.dirty.ignore_opacity = true;
                }
            }
            return;
        }
        if rect.is_some_and(|r| r.width() <= 0.0 || r.height() <= 0.0) {
            return;
        }
        self.tasks |= TaskQueue::PROCESS_DIRTY;

        if removing {
            self.mark_removed_views(id);
            return;
        }

        let Some(n) = self.node_mut(id) else {
            return;
        };
        if !n.flags.contains(ItemFlags::HAS_NO_CONTENTS) {
            n.dirty.dirty = true;
            match rect {
                None => n.dirty.full_update_pending = true,
                Some(r) if !n.dirty.full_update_pending => {
                    n.dirty.needs_repaint = Some(unite(n.dirty.needs_repaint.unwrap_or(Rect::ZERO), r));
                }
                Some(_) => {}
            }
        }
        if invalidate_children {
            n.dirty.all_children_dirty = true;
            n.dirty.dirty_children = true;
        }
        if force {
            n.dirty.ignore_visible = true;
        }
        if ignore_opacity {
            n.dirty.ignore_opacity = true;
        }
        if !update_bounding_rect {
            self.mark_parent_dirty(id, false);
        }
    }

    /// Ask views to repaint where a leaving item was last drawn.
    fn mark_removed_views(&mut self, id: ItemId) {
        if !self.has_views() || self.changed_tracking {
            // Without a view to consult, repaint the area the item covers now.
            if let Some(r) = self.scene_bounding_rect(id) {
                self.update(Some(adjust_rect(r)));
            }
            return;
        }
        for view in self.views.iter_mut().flatten() {
            if let Some(PaintedRect::At(r)) = view.painted.get(&id).copied() {
                let r = r + view.dirty_scroll_offset;
                view.update_rect(r);
            }
        }
    }

    fn mark_parent_dirty(&mut self, id: ItemId, update_bounding_rect: bool) {
        let mut cur = self.node(id).and_then(|n| n.parent);
        while let Some(p) = cur {
            let Some(pn) = self.node_mut(p) else {
                break;
            };
            pn.dirty.dirty_children = true;
            cur = pn.parent;
            if update_bounding_rect {
                self.mark_children_bounds_dirty(p);
            }
        }
    }

    /// Repaint where an item that is leaving the scene was drawn.
    pub(crate) fn mark_removed_dirty(&mut self, id: ItemId) {
        self.mark_dirty(id, MarkDirty::full().removing());
    }

    /// Announce that the item's bounding rect is about to change.
    ///
    /// Calling this repeatedly before the next frame has the same effect as
    /// calling it once.
    pub(crate) fn prepare_geometry_change(&mut self, id: ItemId) {
        let Some(n) = self.node_mut(id) else {
            return;
        };
        if n.in_destructor {
            return;
        }
        n.dirty.geometry_changed = true;
        n.dirty.painted_view_rects_need_repaint = true;
        self.dirty_growing_rect = true;
        self.tasks |= TaskQueue::UPDATE_SCENE_RECT;
        self.prepare_index_change(id);
        self.mark_dirty(
            id,
            MarkDirty::full().invalidate_children().update_bounding_rect(),
        );
        if !self.has_views() || self.changed_tracking {
            if let (Some(b), Some(t)) = (self.bounding_rect(id), self.scene_transform(id)) {
                let old = t.transform_rect_bbox(b);
                if !self.updated_rects.contains(&old) {
                    self.update(Some(old));
                }
            }
        }
        self.mark_parent_dirty(id, true);
    }

    /// Move the item and its descendants to the index's pending set.
    fn prepare_index_change(&mut self, id: ItemId) {
        let Some(n) = self.node_mut(id) else {
            return;
        };
        if !n.index_pending {
            n.index_pending = true;
            self.index_pending.push(id);
        }
        self.index.prepare_bounding_rect_change(id);
        self.tasks |= TaskQueue::UPDATE_INDEX;
        let children = self.node(id).map(|n| n.children.ids.clone()).unwrap_or_default();
        for c in children {
            self.prepare_index_change(c);
        }
    }

    /// Schedule a repaint of the whole item.
    pub fn update_item(&mut self, id: ItemId) {
        self.mark_dirty(id, MarkDirty::full());
    }

    /// Schedule a repaint of part of the item, in local coordinates.
    pub fn update_item_rect(&mut self, id: ItemId, rect: Rect) {
        self.mark_dirty(id, MarkDirty::rect(rect));
    }

    /// Schedule a repaint of a scene rect, or of everything with `None`.
    pub fn update(&mut self, rect: Option<Rect>) {
        if self.update_all {
            return;
        }
        if rect.is_some_and(|r| r.width() <= 0.0 || r.height() <= 0.0) {
            return;
        }
        let direct = !self.changed_tracking && self.has_views();
        match rect {
            None => {
                self.update_all = true;
                self.updated_rects.clear();
                if direct {
                    for view in self.views.iter_mut().flatten() {
                        view.full_update_pending = true;
                    }
                }
            }
            Some(r) if direct => {
                for view in self.views.iter_mut().flatten() {
                    let device = view.viewport_transform().transform_rect_bbox(r);
                    view.update_rect_f(device);
                }
            }
            Some(r) => self.updated_rects.push(r),
        }
        self.tasks |= TaskQueue::EMIT_CHANGED;
    }

    // --- frame ---------------------------------------------------------------

    /// Run one frame of deferred work and return the kinds that ran.
    ///
    /// Kinds run in [`TaskQueue`] order, each at most once. Work that a step
    /// schedules for a kind that already had its turn waits for the next call.
    pub fn run_pending_tasks(&mut self) -> TaskQueue {
        let mut ran = TaskQueue::empty();
        for kind in [
            TaskQueue::POLISH,
            TaskQueue::UPDATE_INDEX,
            TaskQueue::PROCESS_DIRTY,
            TaskQueue::EMIT_CHANGED,
            TaskQueue::UPDATE_SCENE_RECT,
        ] {
            if !self.tasks.contains(kind) {
                continue;
            }
            self.tasks.remove(kind);
            ran |= kind;
            match kind {
                TaskQueue::POLISH => self.polish_items(),
                TaskQueue::UPDATE_INDEX => self.update_index(),
                TaskQueue::PROCESS_DIRTY => self.process_dirty_items(),
                TaskQueue::EMIT_CHANGED => self.emit_changed(),
                _ => self.update_scene_rect(),
            }
        }
        if !ran.is_empty() {
            self.stats.frames += 1;
            self.stats.record(ran);
            log::trace!("frame ran {ran:?}, still pending {:?}", self.tasks);
        }
        ran
    }

    pub(super) fn polish_items(&mut self) {
        let batch = mem::take(&mut self.unpolished);
        for id in batch {
            let Some(n) = self.node_mut(id) else {
                continue;
            };
            if !n.unpolished {
                continue;
            }
            n.unpolished = false;
            self.send_event(id, &mut SceneEvent::Polish);
        }
    }

    fn update_index(&mut self) {
        let pending = mem::take(&mut self.index_pending);
        for id in pending {
            let Some(n) = self.node_mut(id) else {
                continue;
            };
            n.index_pending = false;
            if let Some(bounds) = self.scene_bounding_rect(id) {
                self.index.update_item(id, bounds);
            }
        }
        self.index.commit();
    }

    fn update_scene_rect(&mut self) {
        if self.dirty_growing_rect {
            self.grow_scene_rect();
        }
    }

    fn process_dirty_items(&mut self) {
        if self.update_all {
            for id in self.top_level.ids.clone() {
                self.reset_dirty(id, true);
            }
            return;
        }
        let old_growing = self.growing_rect;
        for id in self.top_level.ids.clone() {
            self.process_dirty_recursive(id, false, 1.0);
        }
        if self.options.scene_rect.is_none() && old_growing != self.growing_rect {
            let r = self.growing_rect;
            self.notifications.push(SceneNotification::SceneRectChanged(r));
            for view in self.views.iter_mut().flatten() {
                view.scene_rect_changed(r);
            }
        }
        if !self.tasks.contains(TaskQueue::EMIT_CHANGED) {
            for view in self.views.iter_mut().flatten() {
                view.process_pending_updates();
            }
        }
    }

    fn reset_dirty(&mut self, id: ItemId, recursive: bool) {
        let Some(n) = self.node_mut(id) else {
            return;
        };
        let recurse = recursive && n.dirty.dirty_children;
        n.dirty.reset();
        if recurse {
            for c in n.children.ids.clone() {
                self.reset_dirty(c, true);
            }
        }
    }

    fn process_dirty_recursive(
        &mut self,
        id: ItemId,
        dirty_ancestor_contains_children: bool,
        parent_opacity: f64,
    ) {
        let Some(n) = self.node(id) else {
            return;
        };
        if !n.dirty.dirty && !n.dirty.dirty_children {
            self.reset_dirty(id, false);
            return;
        }
        if !n.dirty.ignore_visible && !n.visible {
            self.reset_dirty(id, true);
            return;
        }
        let has_contents = !n.flags.contains(ItemFlags::HAS_NO_CONTENTS);
        let has_children = !n.children.ids.is_empty();
        if !has_contents && !has_children {
            self.reset_dirty(id, false);
            return;
        }
        let opacity = n.combine_opacity(parent_opacity);
        let transparent = !n.dirty.ignore_opacity && opacity < TRANSPARENT_OPACITY;
        if transparent && (!has_children || self.children_combine_opacity(id)) {
            self.reset_dirty(id, has_children);
            return;
        }
        let untransformable = n.is_untransformable();
        let clips_children = n.flags.contains(ItemFlags::CLIPS_CHILDREN_TO_SHAPE);
        let had_painted_repaint = n.dirty.painted_view_rects_need_repaint;
        let geometry_changed = n.dirty.geometry_changed;
        let visible = n.visible;
        let scene_transform = self.scene_transform_or_identity(id);

        if let Some(n) = self.node_mut(id) {
            if transparent || !has_contents || dirty_ancestor_contains_children {
                n.dirty.dirty = false;
                n.dirty.full_update_pending = false;
                if transparent || !has_contents {
                    n.dirty.painted_view_rects_need_repaint = false;
                }
            }
        }

        if self.options.scene_rect.is_none() && geometry_changed && visible {
            if let Some(b) = self.bounding_rect(id) {
                self.growing_rect = unite(self.growing_rect, scene_transform.transform_rect_bbox(b));
            }
        }

        let Some(n) = self.node(id) else {
            return;
        };
        if n.dirty.dirty || n.dirty.painted_view_rects_need_repaint {
            let compat = !self.has_views() || self.changed_tracking;
            if compat && !untransformable {
                if let Some(b) = self.bounding_rect(id) {
                    let r = scene_transform.transform_rect_bbox(adjust_rect(b));
                    if r.width() > 0.0 && r.height() > 0.0 {
                        self.update(Some(r));
                    }
                }
            } else {
                self.route_dirty_to_views(id);
            }
        }

        let Some(n) = self.node(id) else {
            return;
        };
        if has_children && n.dirty.dirty_children {
            let contains_children =
                dirty_ancestor_contains_children || (n.dirty.full_update_pending && clips_children);
            let all_children_dirty = n.dirty.all_children_dirty;
            let ignore_visible = n.dirty.ignore_visible;
            let ignore_opacity = n.dirty.ignore_opacity;
            let children = n.children.ids.clone();
            let bypass_clip = !has_contents && had_painted_repaint;
            let clip = clips_children && !bypass_clip;
            if clip {
                self.set_views_update_clip(Some(id));
            }
            for c in children {
                if let Some(cn) = self.node_mut(c) {
                    if had_painted_repaint {
                        cn.dirty.painted_view_rects_need_repaint = true;
                    }
                    if ignore_visible {
                        cn.dirty.ignore_visible = true;
                    }
                    if ignore_opacity {
                        cn.dirty.ignore_opacity = true;
                    }
                    if all_children_dirty {
                        cn.dirty.dirty = true;
                        cn.dirty.full_update_pending = true;
                        cn.dirty.dirty_children = true;
                        cn.dirty.all_children_dirty = true;
                    }
                }
                self.process_dirty_recursive(c, contains_children, opacity);
            }
            if clip {
                self.set_views_update_clip(None);
            }
        }
        self.reset_dirty(id, false);
    }

    /// Turn one dirty item into device-space update rects on every view.
    fn route_dirty_to_views(&mut self, id: ItemId) {
        let Some(n) = self.node(id) else {
            return;
        };
        let dirty = n.dirty.dirty;
        let needs_painted_repaint = n.dirty.painted_view_rects_need_repaint;
        let Some(bounds) = self.bounding_rect(id).map(adjust_rect) else {
            return;
        };
        let dirty_rect = if n.dirty.full_update_pending {
            Some(bounds)
        } else {
            n.dirty
                .needs_repaint
                .map(|r| bounds.intersect(adjust_rect(r)))
        }
        .filter(|r| r.width() > 0.0 && r.height() > 0.0);

        let transforms: Vec<(usize, Affine)> = self
            .views
            .iter()
            .enumerate()
            .filter_map(|(i, v)| {
                let v = v.as_ref()?;
                Some((i, self.device_transform(id, v.viewport_transform())?))
            })
            .collect();

        for (i, device) in transforms {
            let Some(view) = self.views[i].as_mut() else {
                continue;
            };
            if view.full_update_pending || view.options.update_mode == UpdateMode::None {
                view.painted.insert(id, PaintedRect::Outside);
                continue;
            }
            if needs_painted_repaint {
                let repainted = match view.painted.get(&id).copied() {
                    Some(PaintedRect::At(r)) => {
                        let r = r + view.dirty_scroll_offset;
                        view.update_rect(r)
                    }
                    _ => false,
                };
                if !repainted {
                    view.painted.insert(id, PaintedRect::Outside);
                }
            }
            if !dirty {
                continue;
            }
            if !needs_painted_repaint && view.painted.get(&id) == Some(&PaintedRect::Outside) {
                continue;
            }
            let Some(r) = dirty_rect else {
                continue;
            };
            if !view.update_rect_f(device.transform_rect_bbox(r)) && needs_painted_repaint {
                view.painted.insert(id, PaintedRect::Outside);
            }
        }
    }

    /// Narrow or reset the update clip of every view to an item's device bounds.
    fn set_views_update_clip(&mut self, id: Option<ItemId>) {
        let Some(id) = id else {
            for view in self.views.iter_mut().flatten() {
                view.set_update_clip(None);
            }
            return;
        };
        let Some(bounds) = self.bounding_rect(id) else {
            return;
        };
        let clips: Vec<(usize, Rect)> = self
            .views
            .iter()
            .enumerate()
            .filter_map(|(i, v)| {
                let v = v.as_ref()?;
                let device = self.device_transform(id, v.viewport_transform())?;
                Some((i, device.transform_rect_bbox(bounds).expand()))
            })
            .collect();
        for (i, clip) in clips {
            if let Some(view) = self.views[i].as_mut() {
                view.set_update_clip(Some(clip));
            }
        }
    }

    fn emit_changed(&mut self) {
        if self.dirty_growing_rect {
            self.grow_scene_rect();
        }
        if !self.changed_tracking {
            self.update_all = false;
            self.updated_rects.clear();
            for view in self.views.iter_mut().flatten() {
                view.process_pending_updates();
            }
            return;
        }
        let rects = if self.update_all {
            alloc::vec![self.scene_rect()]
        } else {
            mem::take(&mut self.updated_rects)
        };
        self.update_all = false;
        self.updated_rects.clear();
        for view in self.views.iter_mut().flatten() {
            view.update_scene(&rects);
            view.process_pending_updates();
        }
        self.notifications.push(SceneNotification::Changed(rects));
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::rect_item;
    use super::*;
    use crate::item::Item;
    use kurbo::Point;

    #[test]
    fn repeated_updates_coalesce_into_one_frame() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0));
        scene.run_pending_tasks();
        let before = scene.frame_stats();
        for i in 0..20 {
            scene.set_pos(a, Point::new(f64::from(i), 0.0));
            scene.update_item(a);
        }
        let ran = scene.run_pending_tasks();
        assert!(ran.contains(TaskQueue::PROCESS_DIRTY), "dirty processing ran");
        let after = scene.frame_stats();
        assert_eq!(after.dirty_runs - before.dirty_runs, 1, "one dirty pass per frame");
        assert_eq!(after.index_runs - before.index_runs, 1, "one index pass per frame");
        assert!(scene.pending_tasks().is_empty(), "nothing left over");
    }

    #[test]
    fn hidden_items_do_not_schedule_repaints() {
        let mut scene = Scene::new();
        let a = scene.add_item(Item::new(crate::content::Content::Empty).with_visible(false));
        scene.run_pending_tasks();
        scene.update_item(a);
        assert!(
            !scene.pending_tasks().contains(TaskQueue::PROCESS_DIRTY),
            "a hidden item's update is discarded"
        );
    }

    #[test]
    fn prepare_geometry_change_is_idempotent() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0));
        scene.run_pending_tasks();
        scene.prepare_geometry_change(a);
        let rects = scene.updated_rects.clone();
        let pending = scene.index_pending.clone();
        scene.prepare_geometry_change(a);
        assert_eq!(scene.updated_rects, rects, "no duplicate compat rects");
        assert_eq!(scene.index_pending, pending, "no duplicate index entries");
    }

    #[test]
    fn scene_update_without_views_reaches_tracking() {
        let mut scene = Scene::new();
        scene.set_changed_tracking(true);
        scene.update(Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
        scene.run_pending_tasks();
        let changed = scene
            .take_notifications()
            .into_iter()
            .find_map(|n| match n {
                SceneNotification::Changed(r) => Some(r),
                _ => None,
            });
        assert_eq!(
            changed,
            Some(alloc::vec![Rect::new(0.0, 0.0, 5.0, 5.0)]),
            "the rect is reported once"
        );
    }
}
