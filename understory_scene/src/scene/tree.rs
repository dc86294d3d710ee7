// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parent/child links, stacking order and inherited state.

use alloc::vec::Vec;
use core::cmp::Ordering;

use understory_scene_index::IndexChange;

use super::Scene;
use super::dirty::MarkDirty;
use crate::handler::ItemChange;
use crate::item::Siblings;
use crate::types::{AncestorFlags, ItemFlags, ItemId};

impl Scene {
    fn siblings_mut(&mut self, parent: Option<ItemId>) -> Option<&mut Siblings> {
        match parent {
            Some(p) => self.node_mut(p).map(|n| &mut n.children),
            None => Some(&mut self.top_level),
        }
    }

    fn siblings(&self, parent: Option<ItemId>) -> Option<&Siblings> {
        match parent {
            Some(p) => self.node(p).map(|n| &n.children),
            None => Some(&self.top_level),
        }
    }

    /// Append `id` to `parent`'s children with the next sibling index.
    pub(super) fn link_child(&mut self, id: ItemId, parent: Option<ItemId>) {
        let index = match self.siblings(parent) {
            Some(s) if !s.holes => s.ids.len(),
            Some(s) => s
                .ids
                .iter()
                .filter_map(|c| self.node(*c))
                .map(|n| n.sibling_index + 1)
                .max()
                .unwrap_or(0),
            None => return,
        };
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.ids.push(id);
            siblings.needs_sort = true;
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = parent;
            n.sibling_index = index;
        }
    }

    /// Detach `id` from its parent's child list.
    pub(super) fn unlink_child(&mut self, id: ItemId) {
        let Some(parent) = self.node(id).map(|n| n.parent) else {
            return;
        };
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.ids.retain(|c| *c != id);
            siblings.holes = true;
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
        if let Some(p) = parent {
            self.mark_children_bounds_dirty(p);
            self.item_changed(p, &ItemChange::ChildRemoved(id));
        }
    }

    /// Sort a child list by stacking order and make sibling indices dense again.
    pub(crate) fn ensure_sorted(&mut self, parent: Option<ItemId>) {
        let Some(siblings) = self.siblings_mut(parent) else {
            return;
        };
        if !siblings.needs_sort && !siblings.holes {
            return;
        }
        let mut ids = core::mem::take(&mut siblings.ids);
        ids.sort_by(|a, b| self.sibling_order(*a, *b));
        if self.siblings(parent).is_some_and(|s| s.holes) {
            let mut by_index = ids.clone();
            by_index.sort_by_key(|c| self.node(*c).map_or(0, |n| n.sibling_index));
            for (i, c) in by_index.into_iter().enumerate() {
                if let Some(n) = self.node_mut(c) {
                    n.sibling_index = i;
                }
            }
        }
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.ids = ids;
            siblings.needs_sort = false;
            siblings.holes = false;
        }
    }

    /// Ascending paint order among siblings: behind-parent items first, then z, then insertion.
    fn sibling_order(&self, a: ItemId, b: ItemId) -> Ordering {
        let (Some(na), Some(nb)) = (self.node(a), self.node(b)) else {
            return Ordering::Equal;
        };
        let behind_a = na.flags.contains(ItemFlags::STACKS_BEHIND_PARENT);
        let behind_b = nb.flags.contains(ItemFlags::STACKS_BEHIND_PARENT);
        behind_b
            .cmp(&behind_a)
            .then(na.z.total_cmp(&nb.z))
            .then(na.sibling_index.cmp(&nb.sibling_index))
    }

    /// Children of `id` in ascending stacking order (painted first comes first).
    pub fn children(&self, id: ItemId) -> Vec<ItemId> {
        self.node(id)
            .map(|n| self.ordered(&n.children))
            .unwrap_or_default()
    }

    /// Top-level items in ascending stacking order.
    pub fn top_level_items(&self) -> Vec<ItemId> {
        self.ordered(&self.top_level)
    }

    fn ordered(&self, siblings: &Siblings) -> Vec<ItemId> {
        let mut ids = siblings.ids.clone();
        if siblings.needs_sort || siblings.holes {
            ids.sort_by(|a, b| self.sibling_order(*a, *b));
        }
        ids
    }

    /// The parent item.
    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.node(id)?.parent
    }

    fn depth(&self, id: ItemId) -> usize {
        let mut depth = 0;
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            depth += 1;
            cur = self.parent(p);
        }
        depth
    }

    /// Total stacking order across the whole scene, ascending (back to front).
    ///
    /// Ancestors paint before their descendants unless the descendant stacks
    /// behind its parent; siblings compare by z and then insertion order.
    pub fn stacking_order(&self, a: ItemId, b: ItemId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let (mut t1, mut t2) = (a, b);
        let (mut d1, mut d2) = (self.depth(a), self.depth(b));
        while d1 > d2 {
            let Some(p) = self.parent(t1) else { break };
            if p == t2 {
                return if self.stacks_behind(t1) {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
            t1 = p;
            d1 -= 1;
        }
        while d2 > d1 {
            let Some(p) = self.parent(t2) else { break };
            if p == t1 {
                return if self.stacks_behind(t2) {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
            }
            t2 = p;
            d2 -= 1;
        }
        loop {
            let (p1, p2) = (self.parent(t1), self.parent(t2));
            if p1 == p2 {
                return self.sibling_order(t1, t2);
            }
            match (p1, p2) {
                (Some(p1), Some(p2)) => {
                    t1 = p1;
                    t2 = p2;
                }
                _ => return Ordering::Equal,
            }
        }
    }

    fn stacks_behind(&self, id: ItemId) -> bool {
        self.node(id)
            .is_some_and(|n| n.flags.contains(ItemFlags::STACKS_BEHIND_PARENT))
    }

    /// Reparent `id` under `new_parent` (or make it top-level with `None`).
    ///
    /// The item keeps its local position, so its scene position generally
    /// changes. Reparenting an item under itself or one of its descendants is
    /// refused with a warning.
    pub fn set_parent(&mut self, id: ItemId, new_parent: Option<ItemId>) {
        if !self.is_alive(id) {
            log::warn!("Scene::set_parent: stale item {id:?}");
            return;
        }
        if let Some(p) = new_parent {
            if !self.is_alive(p) {
                log::warn!("Scene::set_parent: stale parent {p:?}");
                return;
            }
            if p == id || self.is_ancestor_of(id, p) {
                log::warn!("Scene::set_parent: {p:?} is {id:?} or one of its descendants");
                return;
            }
        }
        let new_parent = match self.item_changing(id, ItemChange::Parent(new_parent)) {
            Some(ItemChange::Parent(p)) => p,
            _ => return,
        };
        if let Some(p) = new_parent {
            if !self.is_alive(p) || p == id || self.is_ancestor_of(id, p) {
                log::warn!("Scene::set_parent: hook proposed an invalid parent for {id:?}");
                return;
            }
        }
        if self.parent(id) == new_parent {
            return;
        }
        self.prepare_geometry_change(id);
        self.unlink_child(id);
        self.link_child(id, new_parent);
        self.refresh_inherited_state(id);
        self.index.item_change(id, IndexChange::Parent);
        self.invalidate_scene_transform(id);
        self.mark_dirty(id, MarkDirty::full().invalidate_children());
        if let Some(p) = new_parent {
            self.mark_children_bounds_dirty(p);
            self.item_changed(p, &ItemChange::ChildAdded(id));
        }
        self.item_changed(id, &ItemChange::Parent(new_parent));
    }

    /// Recompute ancestor flags, effective visibility/enabled and untransformable
    /// index state for `id` and its subtree from its parent's state.
    pub(crate) fn refresh_inherited_state(&mut self, id: ItemId) {
        let (parent_flags, parent_visible, parent_enabled) = match self.parent(id).and_then(|p| self.node(p)) {
            Some(p) => {
                let mut f = p.ancestor_flags;
                if p.handles_child_events {
                    f |= AncestorFlags::HANDLES_CHILD_EVENTS;
                }
                if p.filters_child_events {
                    f |= AncestorFlags::FILTERS_CHILD_EVENTS;
                }
                if p.flags.contains(ItemFlags::CLIPS_CHILDREN_TO_SHAPE) {
                    f |= AncestorFlags::CLIPS_CHILDREN;
                }
                if p.flags.contains(ItemFlags::IGNORES_TRANSFORMATIONS) {
                    f |= AncestorFlags::IGNORES_TRANSFORMATIONS;
                }
                (f, p.visible, p.enabled)
            }
            None => (AncestorFlags::empty(), true, true),
        };
        let (was_untransformable, children) = {
            let Some(n) = self.node_mut(id) else {
                return;
            };
            let was = n.is_untransformable();
            n.ancestor_flags = parent_flags;
            n.visible = parent_visible && !n.explicitly_hidden;
            n.enabled = parent_enabled && !n.explicitly_disabled;
            (was, n.children.ids.clone())
        };
        let now_untransformable = self.node(id).is_some_and(|n| n.is_untransformable());
        if was_untransformable != now_untransformable && self.index.contains(id) {
            self.index
                .item_change(id, IndexChange::IgnoresTransformations(now_untransformable));
        }
        for c in children {
            self.refresh_inherited_state(c);
        }
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor_of(&self, ancestor: ItemId, id: ItemId) -> bool {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// The closest item that is `a`, `b`, or an ancestor of both.
    pub fn common_ancestor_item(&self, a: ItemId, b: ItemId) -> Option<ItemId> {
        if !self.is_alive(a) || !self.is_alive(b) {
            return None;
        }
        if a == b {
            return Some(a);
        }
        let mut chain = Vec::new();
        let mut cur = Some(a);
        while let Some(c) = cur {
            chain.push(c);
            cur = self.parent(c);
        }
        let mut cur = Some(b);
        while let Some(c) = cur {
            if chain.contains(&c) {
                return Some(c);
            }
            cur = self.parent(c);
        }
        None
    }

    /// The root of the tree `id` belongs to.
    pub fn top_level_item(&self, id: ItemId) -> Option<ItemId> {
        let mut cur = self.live(Some(id))?;
        while let Some(p) = self.parent(cur) {
            cur = p;
        }
        Some(cur)
    }

    /// The closest panel that is `id` or one of its ancestors.
    pub fn panel(&self, id: ItemId) -> Option<ItemId> {
        let mut cur = self.live(Some(id));
        while let Some(c) = cur {
            if self.node(c).is_some_and(|n| n.is_panel()) {
                return Some(c);
            }
            cur = self.parent(c);
        }
        None
    }

    /// Whether `id` is a panel.
    pub fn is_panel(&self, id: ItemId) -> bool {
        self.node(id).is_some_and(|n| n.is_panel())
    }

    /// Move `id` directly below `sibling` in the stacking order.
    ///
    /// Only the relative order against equal-z siblings is observable. Both
    /// items must share a parent.
    pub fn stack_before(&mut self, id: ItemId, sibling: ItemId) {
        if id == sibling {
            return;
        }
        let parent = self.parent(id);
        if !self.is_alive(id) || !self.is_alive(sibling) || self.parent(sibling) != parent {
            log::warn!("Scene::stack_before: {id:?} and {sibling:?} are not siblings");
            return;
        }
        self.ensure_sorted(parent);
        let Some(ids) = self.siblings(parent).map(|s| s.ids.clone()) else {
            return;
        };
        let mut by_index = ids;
        by_index.sort_by_key(|c| self.node(*c).map_or(0, |n| n.sibling_index));
        by_index.retain(|c| *c != id);
        let at = by_index.iter().position(|c| *c == sibling).unwrap_or(0);
        by_index.insert(at, id);
        for (i, c) in by_index.into_iter().enumerate() {
            if let Some(n) = self.node_mut(c) {
                n.sibling_index = i;
            }
        }
        if let Some(s) = self.siblings_mut(parent) {
            s.needs_sort = true;
        }
        self.update_item(id);
        self.update_item(sibling);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::rect_item;
    use super::*;

    #[test]
    fn z_then_insertion_order() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(1.0, 1.0));
        let b = scene.add_item(rect_item(1.0, 1.0).with_z(-1.0));
        let c = scene.add_item(rect_item(1.0, 1.0));
        assert_eq!(scene.top_level_items(), [b, a, c], "z first, then insertion");
        scene.stack_before(c, a);
        assert_eq!(scene.top_level_items(), [b, c, a], "c now below a");
    }

    #[test]
    fn parents_paint_before_children_unless_behind() {
        let mut scene = Scene::new();
        let p = scene.add_item(rect_item(1.0, 1.0));
        let front = scene.add_child(p, rect_item(1.0, 1.0)).expect("alive");
        let back = scene
            .add_child(
                p,
                rect_item(1.0, 1.0).with_flags(ItemFlags::STACKS_BEHIND_PARENT),
            )
            .expect("alive");
        assert_eq!(scene.stacking_order(p, front), Ordering::Less, "parent first");
        assert_eq!(scene.stacking_order(back, p), Ordering::Less, "behind parent");
        assert_eq!(scene.children(p), [back, front], "behind-parent child first");
    }

    #[test]
    fn reparent_refuses_cycles() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(1.0, 1.0));
        let b = scene.add_child(a, rect_item(1.0, 1.0)).expect("alive");
        scene.set_parent(a, Some(b));
        assert_eq!(scene.parent(a), None, "cycle refused");
        assert_eq!(scene.common_ancestor_item(a, b), Some(a), "a is b's ancestor");
        assert_eq!(scene.top_level_item(b), Some(a), "a is the root");
    }

    #[test]
    fn hidden_parent_hides_children_without_losing_state() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(1.0, 1.0).with_visible(false));
        let b = scene.add_child(a, rect_item(1.0, 1.0)).expect("alive");
        assert!(!scene.is_visible(b), "hidden through parent");
        scene.set_parent(b, None);
        assert!(scene.is_visible(b), "explicit state was visible");
    }
}
