// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selection bookkeeping and rubber-band selection.
//!
//! `selected` may hold items that were deselected since; it is pruned when
//! read. `selection_changing` nests logical operations so that
//! [`SceneNotification::SelectionChanged`] is queued at most once per
//! operation.

use alloc::vec::Vec;

use kurbo::{Affine, BezPath, Point};
use understory_scene_index::SortOrder;

use super::{QueryOptions, Scene};
use crate::events::{MouseEvent, SceneNotification};
use crate::handler::ItemChange;
use crate::types::{ItemFlags, ItemId, MouseButton, SelectionMode};

impl Scene {
    /// Open a logical selection operation. Selection changes inside it are
    /// reported once, when the outermost operation ends.
    pub fn begin_selection_change(&mut self) {
        self.selection_changing += 1;
    }

    /// Close a logical selection operation.
    pub fn end_selection_change(&mut self) {
        self.selection_changing = self.selection_changing.saturating_sub(1);
        if self.selection_changing == 0 && self.selection_change_pending {
            self.selection_change_pending = false;
            self.notifications.push(SceneNotification::SelectionChanged);
        }
    }

    fn selection_changed(&mut self) {
        if self.selection_changing == 0 {
            self.selection_change_pending = false;
            self.notifications.push(SceneNotification::SelectionChanged);
        } else {
            self.selection_change_pending = true;
        }
    }

    /// Select or deselect the item. Items in a group select the whole group.
    ///
    /// Items that are not selectable, enabled and visible can only be deselected.
    pub fn set_selected(&mut self, id: ItemId, selected: bool) {
        if let Some(g) = self.group(id) {
            self.set_selected(g, selected);
            return;
        }
        let Some(n) = self.node(id) else {
            return;
        };
        let selected =
            selected && n.flags.contains(ItemFlags::SELECTABLE) && n.enabled && n.visible;
        if n.selected == selected {
            return;
        }
        let Some(ItemChange::Selected(selected)) =
            self.item_changing(id, ItemChange::Selected(selected))
        else {
            return;
        };
        let Some(n) = self.node_mut(id) else {
            return;
        };
        if n.selected == selected {
            return;
        }
        n.selected = selected;
        self.update_item(id);
        if selected && !self.selected.contains(&id) {
            self.selected.push(id);
        }
        self.selection_changed();
        self.item_changed(id, &ItemChange::Selected(selected));
    }

    /// Deselect everything except `id`, then select `id`.
    pub fn select_only(&mut self, id: ItemId) {
        self.begin_selection_change();
        let others: Vec<ItemId> = self
            .selected
            .iter()
            .copied()
            .filter(|s| *s != id && self.is_selected(*s))
            .collect();
        for other in others {
            self.set_selected(other, false);
        }
        self.end_selection_change();
        self.set_selected(id, true);
    }

    /// Deselect every item.
    pub fn clear_selection(&mut self) {
        self.begin_selection_change();
        let selected = core::mem::take(&mut self.selected);
        for id in selected {
            self.set_selected(id, false);
        }
        let remaining = core::mem::take(&mut self.selected);
        self.selected = remaining
            .into_iter()
            .filter(|id| self.is_selected(*id))
            .collect();
        self.end_selection_change();
    }

    /// Currently selected items.
    pub fn selected_items(&mut self) -> Vec<ItemId> {
        let selected = core::mem::take(&mut self.selected);
        self.selected = selected
            .into_iter()
            .filter(|id| self.is_selected(*id))
            .collect();
        self.selected.clone()
    }

    /// Select exactly the selectable items that `path` selects under `mode`.
    ///
    /// `device_transform` is the viewport transform of the view the area was
    /// drawn in, needed for items that ignore transformations.
    pub fn set_selection_area(
        &mut self,
        path: BezPath,
        mode: SelectionMode,
        device_transform: Option<Affine>,
    ) {
        let hits = self.items_in_path(
            &path,
            &QueryOptions {
                mode,
                order: SortOrder::Descending,
                device_transform,
            },
        );
        self.selection_area = path;
        let mut unselect = self.selected_items();
        self.begin_selection_change();
        for id in hits {
            if self
                .flags(id)
                .is_some_and(|f| f.contains(ItemFlags::SELECTABLE))
            {
                unselect.retain(|u| *u != id);
                self.set_selected(id, true);
            }
        }
        for id in unselect {
            self.set_selected(id, false);
        }
        self.end_selection_change();
    }

    /// The path last passed to [`Scene::set_selection_area`].
    pub fn selection_area(&self) -> &BezPath {
        &self.selection_area
    }

    /// Drag `id` and every selected movable item by the distance the left
    /// button travelled since it went down.
    pub(crate) fn move_selected_items(&mut self, id: ItemId, event: &MouseEvent) {
        let selected = self.selected_items();
        if self.moving_initial.is_empty() {
            for &s in &selected {
                if let Some(p) = self.pos(s) {
                    self.moving_initial.insert(s, p);
                }
            }
            if let Some(p) = self.pos(id) {
                self.moving_initial.insert(id, p);
            }
        }
        let viewport = event
            .view
            .and_then(|v| self.view(v))
            .map(|v| v.viewport_transform());

        let mut targets = selected;
        if !targets.contains(&id) {
            targets.push(id);
        }
        for item in targets {
            let movable = self
                .flags(item)
                .is_some_and(|f| f.contains(ItemFlags::MOVABLE));
            if !movable || self.movable_ancestor_is_selected(item) {
                continue;
            }
            let Some((current, down)) = self.drag_points_in_parent(item, event, viewport) else {
                continue;
            };
            let initial = self.moving_initial.get(&item).copied().unwrap_or(Point::ZERO);
            self.set_pos(item, initial + (current - down));
            if self
                .flags(item)
                .is_some_and(|f| f.contains(ItemFlags::SELECTABLE))
            {
                self.set_selected(item, true);
            }
        }
    }

    /// The current and button-down mouse positions in the parent coordinates of `item`.
    fn drag_points_in_parent(
        &self,
        item: ItemId,
        event: &MouseEvent,
        viewport: Option<Affine>,
    ) -> Option<(Point, Point)> {
        let down_scene = event.button_down_scene_pos(MouseButton::Left);
        let untransformable = self.node(item)?.is_untransformable();
        match viewport {
            Some(vt) if untransformable => {
                let to_parent = self.node(item)?.local_to_parent();
                let view_to_parent = to_parent * self.device_transform(item, vt)?.inverse();
                Some((
                    view_to_parent * (vt * event.scene_pos),
                    view_to_parent * (vt * down_scene),
                ))
            }
            _ => {
                let scene_to_parent = match self.parent(item) {
                    Some(p) => self.scene_transform(p)?.inverse(),
                    None => Affine::IDENTITY,
                };
                Some((scene_to_parent * event.scene_pos, scene_to_parent * down_scene))
            }
        }
    }

    fn movable_ancestor_is_selected(&self, id: ItemId) -> bool {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if self.is_selected(p)
                && self
                    .flags(p)
                    .is_some_and(|f| f.contains(ItemFlags::MOVABLE))
            {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// Forget the start positions of an item drag.
    pub(crate) fn clear_moving_items(&mut self) {
        self.moving_initial.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::rect_item;
    use super::*;
    use kurbo::{Rect, Shape};

    fn selectable(x: f64) -> crate::item::Item {
        rect_item(10.0, 10.0)
            .with_pos((x, 0.0))
            .with_flags(ItemFlags::SELECTABLE | ItemFlags::MOVABLE)
    }

    fn selection_changes(scene: &mut Scene) -> usize {
        scene
            .take_notifications()
            .iter()
            .filter(|n| **n == SceneNotification::SelectionChanged)
            .count()
    }

    #[test]
    fn clear_selection_reports_once() {
        let mut scene = Scene::new();
        let a = scene.add_item(selectable(0.0));
        let b = scene.add_item(selectable(20.0));
        scene.set_selected(a, true);
        scene.set_selected(b, true);
        assert_eq!(selection_changes(&mut scene), 2, "one report per single change");
        scene.clear_selection();
        assert_eq!(selection_changes(&mut scene), 1, "one report for the whole clear");
        assert!(scene.selected_items().is_empty(), "nothing left selected");
    }

    #[test]
    fn unselectable_items_stay_unselected() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0));
        scene.set_selected(a, true);
        assert!(!scene.is_selected(a), "no SELECTABLE flag");
    }

    #[test]
    fn selection_area_replaces_selection() {
        let mut scene = Scene::new();
        let a = scene.add_item(selectable(0.0));
        let b = scene.add_item(selectable(50.0));
        scene.set_selected(b, true);
        scene.take_notifications();
        let area = Rect::new(-5.0, -5.0, 15.0, 15.0).to_path(0.1);
        scene.set_selection_area(area, SelectionMode::IntersectsShape, None);
        assert!(scene.is_selected(a), "inside the area");
        assert!(!scene.is_selected(b), "outside the area");
        assert_eq!(selection_changes(&mut scene), 1, "one report");
    }

    #[test]
    fn dragging_moves_every_selected_item() {
        let mut scene = Scene::new();
        let a = scene.add_item(selectable(0.0));
        let b = scene.add_item(selectable(50.0));
        scene.set_selected(a, true);
        scene.set_selected(b, true);
        let mut e = MouseEvent::new(
            crate::events::MouseEventKind::Move,
            Point::new(15.0, 5.0),
        );
        e.button_down_scene_pos[MouseButton::Left.index()] = Point::new(5.0, 5.0);
        scene.move_selected_items(a, &e);
        assert_eq!(scene.pos(a), Some(Point::new(10.0, 0.0)), "dragged item moved");
        assert_eq!(scene.pos(b), Some(Point::new(60.0, 0.0)), "selected peer moved too");
        scene.clear_moving_items();
    }
}
