// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transforms, bounds, shapes, hit testing, spatial queries and item groups.

use alloc::vec::Vec;

use kurbo::{Affine, BezPath, Point, Rect, Shape, Vec2};
use understory_scene_index::{SortOrder, sort_keys};

use super::Scene;
use crate::content::{Content, Shaped};
use crate::geometry::{
    TOLERANCE, adjust_rect, map_path, path_contains_path, path_is_empty, paths_intersect,
    polygon_path, rect_contains_rect, rects_intersect, unite,
};
use crate::handler::ItemChange;
use crate::item::Item;
use crate::transform::TransformOp;
use crate::types::{AncestorFlags, ItemFlags, ItemId, SelectionMode};

/// Effective opacity below which an item counts as fully transparent.
pub(crate) const TRANSPARENT_OPACITY: f64 = 0.001;

/// How spatial queries test and order items.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QueryOptions {
    /// How the query area is compared against each item.
    pub mode: SelectionMode,
    /// Result order.
    pub order: SortOrder,
    /// Viewport transform of the view the query comes from. Needed to place
    /// items that ignore transformations; without it they are tested at their
    /// plain scene position.
    pub device_transform: Option<Affine>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            mode: SelectionMode::IntersectsShape,
            order: SortOrder::Descending,
            device_transform: None,
        }
    }
}

impl QueryOptions {
    /// Default options with a different selection mode.
    pub fn with_mode(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

impl Scene {
    // --- transforms ---------------------------------------------------------

    /// Mark the cached scene transform of `id` and every descendant stale.
    pub(crate) fn invalidate_scene_transform(&mut self, id: ItemId) {
        let children = match self.node(id) {
            Some(n) => {
                n.scene_transform_dirty.set(true);
                n.children.ids.clone()
            }
            None => return,
        };
        for c in children {
            self.invalidate_scene_transform(c);
        }
    }

    /// Local-to-scene transform, recomputed lazily from the topmost stale ancestor down.
    pub fn scene_transform(&self, id: ItemId) -> Option<Affine> {
        let node = self.node(id)?;
        if !node.scene_transform_dirty.get() {
            return Some(node.scene_transform.get());
        }
        let parent = match node.parent {
            Some(p) => self.scene_transform(p)?,
            None => Affine::IDENTITY,
        };
        let t = parent * node.local_to_parent();
        node.scene_transform.set(t);
        node.scene_transform_dirty.set(false);
        Some(t)
    }

    pub(crate) fn scene_transform_or_identity(&self, id: ItemId) -> Affine {
        self.scene_transform(id).unwrap_or(Affine::IDENTITY)
    }

    /// Local-to-device transform for a view whose viewport transform is `viewport`.
    ///
    /// Items that ignore transformations keep their local scale and rotation on
    /// screen; only the position of their outermost ignoring ancestor follows
    /// the view.
    pub fn device_transform(&self, id: ItemId, viewport: Affine) -> Option<Affine> {
        let node = self.node(id)?;
        if !node.is_untransformable() {
            return Some(viewport * self.scene_transform(id)?);
        }
        let mut chain = Vec::new();
        let mut cur = id;
        loop {
            chain.push(cur);
            let n = self.node(cur)?;
            if !n.ancestor_flags.contains(AncestorFlags::IGNORES_TRANSFORMATIONS) {
                break;
            }
            cur = n.parent?;
        }
        let Some(&root) = chain.last() else {
            return Some(viewport);
        };
        let root_node = self.node(root)?;
        let anchor = (viewport * self.scene_transform(root)?) * Point::ZERO;
        let mut m = Affine::translate(anchor.to_vec2()) * root_node.transform.matrix();
        for &c in chain.iter().rev().skip(1) {
            m *= self.node(c)?.local_to_parent();
        }
        Some(m)
    }

    /// Transform mapping `from`'s local coordinates into `to`'s.
    pub fn item_transform(&self, from: ItemId, to: ItemId) -> Option<Affine> {
        Some(self.scene_transform(to)?.inverse() * self.scene_transform(from)?)
    }

    /// Scene position of the item's origin.
    pub fn scene_pos(&self, id: ItemId) -> Option<Point> {
        Some(self.scene_transform(id)? * Point::ZERO)
    }

    /// Map a local point to scene coordinates.
    pub fn map_to_scene(&self, id: ItemId, pt: Point) -> Option<Point> {
        Some(self.scene_transform(id)? * pt)
    }

    /// Map a scene point to local coordinates.
    pub fn map_from_scene(&self, id: ItemId, pt: Point) -> Option<Point> {
        Some(self.scene_transform(id)?.inverse() * pt)
    }

    /// Map a local point to parent coordinates (scene coordinates for top-level items).
    pub fn map_to_parent(&self, id: ItemId, pt: Point) -> Option<Point> {
        Some(self.node(id)?.local_to_parent() * pt)
    }

    /// Map a point in `id`'s coordinates into `other`'s.
    pub fn map_to_item(&self, id: ItemId, other: ItemId, pt: Point) -> Option<Point> {
        Some(self.item_transform(id, other)? * pt)
    }

    /// Map a point in `other`'s coordinates into `id`'s.
    pub fn map_from_item(&self, id: ItemId, other: ItemId, pt: Point) -> Option<Point> {
        Some(self.item_transform(other, id)? * pt)
    }

    /// Bounding box of a local rect mapped to the scene.
    pub fn map_rect_to_scene(&self, id: ItemId, rect: Rect) -> Option<Rect> {
        Some(self.scene_transform(id)?.transform_rect_bbox(rect))
    }

    /// Bounding box of a scene rect mapped into local coordinates.
    pub fn map_rect_from_scene(&self, id: ItemId, rect: Rect) -> Option<Rect> {
        Some(self.scene_transform(id)?.inverse().transform_rect_bbox(rect))
    }

    // --- bounds and shape ---------------------------------------------------

    /// Local bounding rect of the item's own content.
    pub fn bounding_rect(&self, id: ItemId) -> Option<Rect> {
        let n = self.node(id)?;
        Some(match &n.content {
            Content::Group => n.group_bounds,
            c => c.bounding_rect(),
        })
    }

    /// Union of every descendant's bounding rect, in local coordinates.
    pub fn children_bounding_rect(&self, id: ItemId) -> Option<Rect> {
        let n = self.node(id)?;
        if !n.children_bounds_dirty.get() {
            return Some(n.children_bounds.get());
        }
        let mut r = Rect::ZERO;
        for &c in &n.children.ids {
            let Some(child) = self.node(c) else { continue };
            let local = child.local_to_parent();
            let own = self.bounding_rect(c).unwrap_or(Rect::ZERO);
            let sub = self.children_bounding_rect(c).unwrap_or(Rect::ZERO);
            r = unite(r, local.transform_rect_bbox(unite(own, sub)));
        }
        n.children_bounds.set(r);
        n.children_bounds_dirty.set(false);
        Some(r)
    }

    /// Invalidate the cached children bounding rect of `id` and its ancestors.
    pub(crate) fn mark_children_bounds_dirty(&self, id: ItemId) {
        let mut cur = Some(id);
        while let Some(c) = cur {
            let Some(n) = self.node(c) else { return };
            n.children_bounds_dirty.set(true);
            cur = n.parent;
        }
    }

    /// Bounding rect mapped to the scene.
    pub fn scene_bounding_rect(&self, id: ItemId) -> Option<Rect> {
        let local = self.bounding_rect(id)?;
        self.map_rect_to_scene(id, local)
    }

    /// Exact union of all item scene bounding rects.
    pub fn items_bounding_rect(&self) -> Rect {
        self.nodes_iter()
            .filter_map(|id| self.scene_bounding_rect(id))
            .fold(Rect::ZERO, unite)
    }

    /// Item shape in local coordinates.
    pub fn shape(&self, id: ItemId) -> Option<BezPath> {
        let n = self.node(id)?;
        Some(match &n.content {
            Content::Group => n.group_bounds.to_path(TOLERANCE),
            c => c.shape(),
        })
    }

    /// Area the item paints fully opaque, in local coordinates.
    pub fn opaque_area(&self, id: ItemId) -> Option<BezPath> {
        Some(self.node(id)?.content.opaque_area())
    }

    /// Whether the item is clipped by itself or by an ancestor.
    pub fn is_clipped(&self, id: ItemId) -> bool {
        self.node(id).is_some_and(|n| {
            n.flags.contains(ItemFlags::CLIPS_TO_SHAPE)
                || n.ancestor_flags.contains(AncestorFlags::CLIPS_CHILDREN)
        })
    }

    /// Clip path in local coordinates; empty for unclipped items.
    pub fn clip_path(&self, id: ItemId) -> Option<BezPath> {
        let n = self.node(id)?;
        if !self.is_clipped(id) {
            return Some(BezPath::new());
        }
        let mut clip = self.bounding_rect(id)?.to_path(TOLERANCE);
        if n.ancestor_flags.contains(AncestorFlags::CLIPS_CHILDREN) {
            let mut last = id;
            let mut cur = n.parent;
            while let Some(p) = cur {
                let pn = self.node(p)?;
                if pn.flags.contains(ItemFlags::CLIPS_CHILDREN_TO_SHAPE) {
                    clip = map_path(self.item_transform(last, p)?, &clip);
                    clip = crate::geometry::intersect_paths(&clip, &self.shape(p)?);
                    if path_is_empty(&clip) {
                        return Some(clip);
                    }
                    last = p;
                }
                if !pn.ancestor_flags.contains(AncestorFlags::CLIPS_CHILDREN) {
                    break;
                }
                cur = pn.parent;
            }
            if last != id {
                clip = map_path(self.item_transform(last, id)?, &clip);
            }
        }
        if n.flags.contains(ItemFlags::CLIPS_TO_SHAPE) {
            clip = crate::geometry::intersect_paths(&clip, &self.shape(id)?);
        }
        Some(clip)
    }

    /// Whether the local point `pt` lies inside the item (its clip path when clipped).
    pub fn contains(&self, id: ItemId, pt: Point) -> bool {
        let Some(n) = self.node(id) else {
            return false;
        };
        if self.is_clipped(id) {
            return self.clip_path(id).is_some_and(|c| c.contains(pt));
        }
        match &n.content {
            Content::Group => false,
            c => c.contains(pt),
        }
    }

    /// Whether the item collides with `path`, given in the item's local coordinates.
    pub fn collides_with_path(&self, id: ItemId, path: &BezPath, mode: SelectionMode) -> bool {
        if path_is_empty(path) {
            return false;
        }
        let Some(rect) = self.bounding_rect(id) else {
            return false;
        };
        let rect_a = adjust_rect(rect);
        let rect_b = adjust_rect(path.bounding_box());
        if !rects_intersect(rect_a, rect_b) {
            return false;
        }
        if !mode.uses_shape() {
            let own = rect_a.to_path(TOLERANCE);
            return if mode.is_contains() {
                path_contains_path(path, &own)
            } else {
                paths_intersect(path, &own)
            };
        }
        let own = if self.is_clipped(id) {
            self.clip_path(id)
        } else {
            self.shape(id)
        };
        let Some(own) = own else {
            return false;
        };
        if mode.is_contains() {
            path_contains_path(path, &own)
        } else {
            paths_intersect(path, &own)
        }
    }

    /// Whether `id` collides with `other` under `mode`.
    pub fn collides_with_item(&self, id: ItemId, other: ItemId, mode: SelectionMode) -> bool {
        if id == other || !self.is_alive(other) {
            return false;
        }
        let Some(to_local) = self.item_transform(other, id) else {
            return false;
        };
        let other_path = if mode.uses_shape() {
            if self.is_clipped(other) {
                self.clip_path(other)
            } else {
                self.shape(other)
            }
        } else {
            self.bounding_rect(other).map(|r| r.to_path(TOLERANCE))
        };
        let Some(other_path) = other_path else {
            return false;
        };
        self.collides_with_path(id, &map_path(to_local, &other_path), mode)
    }

    /// Whether `other` is in front of `id` and its opaque area covers `id`'s bounding rect.
    pub fn is_obscured_by(&self, id: ItemId, other: ItemId) -> bool {
        if id == other || self.stacking_order(other, id) != core::cmp::Ordering::Greater {
            return false;
        }
        let (Some(opaque), Some(to_local), Some(rect)) = (
            self.opaque_area(other),
            self.item_transform(other, id),
            self.bounding_rect(id),
        ) else {
            return false;
        };
        path_contains_path(&map_path(to_local, &opaque), &rect.to_path(TOLERANCE))
    }

    /// Whether some item in front of `id` completely covers it.
    pub fn is_obscured(&self, id: ItemId) -> bool {
        let Some(r) = self.scene_bounding_rect(id) else {
            return false;
        };
        self.items_in_rect(r, &QueryOptions::default())
            .into_iter()
            .any(|other| self.is_obscured_by(id, other))
    }

    // --- queries ------------------------------------------------------------

    pub(crate) fn nodes_iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| {
            n.as_ref().map(|n| {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "ItemId slots are 32-bit."
                )]
                ItemId::new(i as u32, n.generation)
            })
        })
    }

    /// Whether the item takes part in hit testing and painting at all.
    pub(crate) fn is_hit_candidate(&self, id: ItemId) -> bool {
        self.node(id).is_some_and(|n| n.visible) && !self.is_fully_transparent(id)
    }

    /// Transform used to compare an item against a scene-space query area.
    fn query_transform(&self, id: ItemId, device: Option<Affine>) -> Option<Affine> {
        match device {
            Some(dt) if self.node(id)?.is_untransformable() => {
                Some(dt.inverse() * self.device_transform(id, dt)?)
            }
            _ => self.scene_transform(id),
        }
    }

    fn sort(&self, items: &mut [ItemId], order: SortOrder) {
        sort_keys(items, order, &|a: &ItemId, b: &ItemId| {
            self.stacking_order(*a, *b)
        });
    }

    /// Every item, sorted.
    pub fn items(&self, order: SortOrder) -> Vec<ItemId> {
        let mut out: Vec<ItemId> = self.nodes_iter().collect();
        self.sort(&mut out, order);
        out
    }

    /// Items under the scene point `pt`, topmost first.
    pub fn items_at(&self, pt: Point) -> Vec<ItemId> {
        self.items_at_with(pt, &QueryOptions::default())
    }

    /// Items under the scene point `pt`.
    pub fn items_at_with(&self, pt: Point, options: &QueryOptions) -> Vec<ItemId> {
        let mut candidates = Vec::new();
        self.index.estimate_items_at(pt, &mut candidates);
        let mut out: Vec<ItemId> = candidates
            .into_iter()
            .filter(|id| self.is_hit_candidate(*id))
            .filter(|id| {
                let Some(t) = self.query_transform(*id, options.device_transform) else {
                    return false;
                };
                let local = t.inverse() * pt;
                if options.mode.uses_shape() {
                    self.contains(*id, local)
                } else {
                    self.bounding_rect(*id)
                        .is_some_and(|r| rect_contains_rect(adjust_rect(r), Rect::from_points(local, local)))
                }
            })
            .collect();
        self.sort(&mut out, options.order);
        out
    }

    /// The topmost item under `pt`.
    pub fn item_at(&self, pt: Point, device_transform: Option<Affine>) -> Option<ItemId> {
        self.items_at_with(
            pt,
            &QueryOptions {
                device_transform,
                ..QueryOptions::default()
            },
        )
        .into_iter()
        .next()
    }

    /// Items colliding with a scene rect.
    pub fn items_in_rect(&self, rect: Rect, options: &QueryOptions) -> Vec<ItemId> {
        self.items_in_path(&rect.to_path(TOLERANCE), options)
    }

    /// Items colliding with a scene polygon.
    pub fn items_in_polygon(&self, polygon: &[Point], options: &QueryOptions) -> Vec<ItemId> {
        self.items_in_path(&polygon_path(polygon), options)
    }

    /// Items colliding with a scene path.
    pub fn items_in_path(&self, path: &BezPath, options: &QueryOptions) -> Vec<ItemId> {
        if path_is_empty(path) {
            return Vec::new();
        }
        let mut candidates = Vec::new();
        self.index
            .estimate_items(adjust_rect(path.bounding_box()), &mut candidates);
        let mut out: Vec<ItemId> = candidates
            .into_iter()
            .filter(|id| self.is_hit_candidate(*id))
            .filter(|id| {
                self.query_transform(*id, options.device_transform)
                    .is_some_and(|t| {
                        self.collides_with_path(*id, &map_path(t.inverse(), path), options.mode)
                    })
            })
            .collect();
        self.sort(&mut out, options.order);
        out
    }

    /// Items colliding with `id`, topmost first. The item itself is excluded.
    pub fn colliding_items(&self, id: ItemId, mode: SelectionMode) -> Vec<ItemId> {
        let Some(r) = self.scene_bounding_rect(id) else {
            return Vec::new();
        };
        let mut candidates = Vec::new();
        self.index.estimate_items(adjust_rect(r), &mut candidates);
        let mut out: Vec<ItemId> = candidates
            .into_iter()
            .filter(|other| *other != id && self.is_hit_candidate(*other))
            .filter(|other| self.collides_with_item(id, *other, mode))
            .collect();
        self.sort(&mut out, SortOrder::Descending);
        out
    }

    // --- geometry setters -----------------------------------------------------

    fn change_geometry(&mut self, id: ItemId, proposed: ItemChange) {
        let Some(sends) = self
            .node(id)
            .map(|n| n.flags.contains(ItemFlags::SENDS_GEOMETRY_CHANGES))
        else {
            log::warn!("Scene: geometry change on stale item {id:?}");
            return;
        };
        let change = if sends {
            match self.item_changing(id, proposed) {
                Some(c) => c,
                None => return,
            }
        } else {
            proposed
        };
        let Some(n) = self.node(id) else { return };
        let unchanged = match &change {
            ItemChange::Position(p) => n.pos == *p,
            ItemChange::Transform(t) => n.transform.base == *t,
            ItemChange::Rotation(r) => n.transform.rotation == *r,
            ItemChange::Scale(s) => n.transform.scale == *s,
            ItemChange::TransformOrigin(o) => n.transform.origin == *o,
            ItemChange::TransformOps(ops) => n.transform.ops == *ops,
            _ => true,
        };
        if unchanged {
            return;
        }
        self.prepare_geometry_change(id);
        if let Some(n) = self.node_mut(id) {
            match &change {
                ItemChange::Position(p) => n.pos = *p,
                ItemChange::Transform(t) => n.transform.base = *t,
                ItemChange::Rotation(r) => n.transform.rotation = *r,
                ItemChange::Scale(s) => n.transform.scale = *s,
                ItemChange::TransformOrigin(o) => n.transform.origin = *o,
                ItemChange::TransformOps(ops) => n.transform.ops.clone_from(ops),
                _ => {}
            }
        }
        self.invalidate_scene_transform(id);
        if let Some(p) = self.parent(id) {
            self.mark_children_bounds_dirty(p);
        }
        if sends {
            self.item_changed(id, &change);
        }
        self.send_scene_pos_changes(id);
    }

    /// Set the position in parent coordinates.
    pub fn set_pos(&mut self, id: ItemId, pos: impl Into<Point>) {
        self.change_geometry(id, ItemChange::Position(pos.into()));
    }

    /// Move by `delta` in parent coordinates.
    pub fn move_by(&mut self, id: ItemId, delta: Vec2) {
        if let Some(p) = self.pos(id) {
            self.set_pos(id, p + delta);
        }
    }

    /// Set the base transform.
    pub fn set_transform(&mut self, id: ItemId, transform: Affine) {
        self.change_geometry(id, ItemChange::Transform(transform));
    }

    /// The base transform.
    pub fn transform(&self, id: ItemId) -> Option<Affine> {
        Some(self.node(id)?.transform.base)
    }

    /// Full local-to-parent transform, including the position.
    pub fn local_transform(&self, id: ItemId) -> Option<Affine> {
        Some(self.node(id)?.local_to_parent())
    }

    /// Set the rotation in degrees, clockwise-positive.
    pub fn set_rotation(&mut self, id: ItemId, degrees: f64) {
        self.change_geometry(id, ItemChange::Rotation(degrees));
    }

    /// Rotation in degrees.
    pub fn rotation(&self, id: ItemId) -> Option<f64> {
        Some(self.node(id)?.transform.rotation)
    }

    /// Set the uniform scale.
    pub fn set_scale(&mut self, id: ItemId, scale: f64) {
        self.change_geometry(id, ItemChange::Scale(scale));
    }

    /// Uniform scale.
    pub fn scale(&self, id: ItemId) -> Option<f64> {
        Some(self.node(id)?.transform.scale)
    }

    /// Set the origin of rotation and scale, in local coordinates.
    pub fn set_transform_origin(&mut self, id: ItemId, origin: impl Into<Point>) {
        self.change_geometry(id, ItemChange::TransformOrigin(origin.into()));
    }

    /// Origin of rotation and scale.
    pub fn transform_origin(&self, id: ItemId) -> Option<Point> {
        Some(self.node(id)?.transform.origin)
    }

    /// Replace the additional transform operations.
    pub fn set_transform_ops(&mut self, id: ItemId, ops: Vec<TransformOp>) {
        self.change_geometry(id, ItemChange::TransformOps(ops));
    }

    /// The additional transform operations.
    pub fn transform_ops(&self, id: ItemId) -> &[TransformOp] {
        self.node(id).map_or(&[], |n| n.transform.ops.as_slice())
    }

    // --- groups ---------------------------------------------------------------

    /// Group `items` under a new group item placed at their deepest common ancestor.
    pub fn create_item_group(&mut self, items: &[ItemId]) -> ItemId {
        let mut common: Option<ItemId> = None;
        if let Some((&first, rest)) = items.split_first() {
            let mut ancestors = Vec::new();
            let mut cur = self.parent(first);
            while let Some(p) = cur {
                ancestors.push(p);
                cur = self.parent(p);
            }
            let mut at = 0;
            for &item in rest {
                let mut found = None;
                let mut cur = Some(item);
                while let Some(c) = cur {
                    if let Some(i) = ancestors.iter().skip(at).position(|a| *a == c) {
                        found = Some(at + i);
                        break;
                    }
                    cur = self.parent(c);
                }
                match found {
                    Some(i) => at = i,
                    None => {
                        ancestors.clear();
                        break;
                    }
                }
            }
            if !rest.is_empty() {
                common = ancestors.get(at).copied();
            }
        }
        let group = match common {
            Some(p) => self
                .add_child(p, Item::new(Content::Group))
                .unwrap_or_else(|| self.add_item(Item::new(Content::Group))),
            None => self.add_item(Item::new(Content::Group)),
        };
        for &item in items {
            self.add_to_group(group, item);
        }
        group
    }

    /// Move `item` into `group`, keeping its scene transform.
    pub fn add_to_group(&mut self, group: ItemId, item: ItemId) {
        if group == item || !self.is_alive(group) || !self.is_alive(item) {
            log::warn!("Scene::add_to_group: invalid group {group:?} or item {item:?}");
            return;
        }
        let Some(item_to_group) = self.item_transform(item, group) else {
            return;
        };
        self.reparent_keeping_scene_transform(item, Some(group), item_to_group);
        if let Some(n) = self.node_mut(item) {
            n.group = Some(group);
        }
        let own = self.bounding_rect(item).unwrap_or(Rect::ZERO);
        let sub = self.children_bounding_rect(item).unwrap_or(Rect::ZERO);
        let added = item_to_group.transform_rect_bbox(unite(own, sub));
        self.prepare_geometry_change(group);
        if let Some(n) = self.node_mut(group) {
            n.group_bounds = unite(n.group_bounds, added);
        }
        self.update_item(group);
    }

    /// Move `item` out of `group` to the group's parent, keeping its scene transform.
    pub fn remove_from_group(&mut self, group: ItemId, item: ItemId) {
        if self.parent(item) != Some(group) {
            log::warn!("Scene::remove_from_group: {item:?} is not a member of {group:?}");
            return;
        }
        let new_parent = self.parent(group);
        let to_new = match new_parent {
            Some(p) => self.item_transform(item, p),
            None => self.scene_transform(item),
        };
        let Some(to_new) = to_new else { return };
        self.reparent_keeping_scene_transform(item, new_parent, to_new);
        let still_grouped = new_parent.filter(|p| self.node(*p).is_some_and(|n| n.content.is_group()));
        if let Some(n) = self.node_mut(item) {
            n.group = still_grouped;
        }
        self.prepare_geometry_change(group);
        let bounds = self.children_bounding_rect(group).unwrap_or(Rect::ZERO);
        if let Some(n) = self.node_mut(group) {
            n.group_bounds = bounds;
        }
    }

    /// Ungroup every member of `group` and destroy it.
    pub fn destroy_item_group(&mut self, group: ItemId) {
        for child in self.children(group) {
            self.remove_from_group(group, child);
        }
        self.destroy_item(group);
    }

    /// The group `id` is a member of.
    pub fn group(&self, id: ItemId) -> Option<ItemId> {
        self.live(self.node(id)?.group)
    }

    fn reparent_keeping_scene_transform(
        &mut self,
        item: ItemId,
        new_parent: Option<ItemId>,
        to_new_parent: Affine,
    ) {
        let Some(tail) = self.node(item).map(|n| {
            let mut t = n.transform.clone();
            t.base = Affine::IDENTITY;
            t.matrix()
        }) else {
            return;
        };
        let pos = to_new_parent * Point::ZERO;
        let base = if tail.determinant().abs() > f64::EPSILON {
            Affine::translate(-pos.to_vec2()) * to_new_parent * tail.inverse()
        } else {
            log::warn!("Scene: cannot preserve the transform of {item:?}, it is singular");
            Affine::translate(-pos.to_vec2()) * to_new_parent
        };
        self.set_parent(item, new_parent);
        self.set_pos(item, pos);
        self.set_transform(item, base);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::rect_item;
    use super::*;
    use crate::content::ShapeStyle;
    use peniko::Color;

    fn assert_near(a: Point, b: Point, what: &str) {
        assert!((a - b).hypot() < 1e-9, "{what}: {a:?} vs {b:?}");
    }

    #[test]
    fn scene_pos_chains_translations() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0));
        let b = scene
            .add_child(a, rect_item(5.0, 5.0).with_pos((20.0, 20.0)))
            .expect("alive");
        assert_eq!(scene.scene_pos(b), Some(Point::new(20.0, 20.0)), "pure translation");
        scene.set_pos(a, (5.0, 0.0));
        assert_eq!(scene.scene_pos(b), Some(Point::new(25.0, 20.0)), "follows parent");
    }

    #[test]
    fn rotation_is_clockwise_positive() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0));
        let b = scene
            .add_child(a, rect_item(5.0, 5.0).with_pos((20.0, 20.0)))
            .expect("alive");
        scene.set_rotation(a, 90.0);
        let p = scene.map_to_scene(b, Point::ZERO).expect("alive");
        assert_near(p, Point::new(-20.0, 20.0), "rotated child origin");
    }

    #[test]
    fn round_trip_mapping() {
        let mut scene = Scene::new();
        let a = scene.add_item(
            rect_item(10.0, 10.0)
                .with_pos((3.0, 4.0))
                .with_rotation(30.0)
                .with_scale(2.0),
        );
        let pt = Point::new(7.0, -2.0);
        let back = scene
            .map_from_scene(a, scene.map_to_scene(a, pt).expect("alive"))
            .expect("alive");
        assert_near(back, pt, "point round trip");
    }

    #[test]
    fn items_at_respects_shape_and_stacking() {
        let mut scene = Scene::new();
        let low = scene.add_item(rect_item(10.0, 10.0));
        let high = scene.add_item(
            Item::new(Content::ellipse(
                Rect::new(0.0, 0.0, 10.0, 10.0),
                ShapeStyle::filled(Color::BLACK),
            ))
            .with_z(1.0),
        );
        assert_eq!(scene.items_at(Point::new(5.0, 5.0)), [high, low], "topmost first");
        assert_eq!(
            scene.items_at(Point::new(0.5, 0.5)),
            [low],
            "ellipse corner is outside its shape"
        );
    }

    #[test]
    fn clips_children_limits_hits() {
        let mut scene = Scene::new();
        let parent = scene.add_item(
            rect_item(10.0, 10.0).with_flags(ItemFlags::CLIPS_CHILDREN_TO_SHAPE),
        );
        let child = scene
            .add_child(parent, rect_item(20.0, 20.0))
            .expect("alive");
        assert!(scene.is_clipped(child), "clipped by parent");
        assert!(scene.contains(child, Point::new(5.0, 5.0)), "inside the clip");
        assert!(!scene.contains(child, Point::new(15.0, 15.0)), "outside the clip");
    }

    #[test]
    fn group_keeps_scene_positions() {
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0).with_pos((10.0, 10.0)).with_rotation(45.0));
        let b = scene.add_item(rect_item(10.0, 10.0).with_pos((50.0, 0.0)));
        let before_a = scene.scene_transform(a).expect("alive");
        let group = scene.create_item_group(&[a, b]);
        assert_eq!(scene.group(a), Some(group), "membership recorded");
        let after_a = scene.scene_transform(a).expect("alive");
        for (x, y) in before_a.as_coeffs().iter().zip(after_a.as_coeffs()) {
            assert!((x - y).abs() < 1e-9, "scene transform preserved");
        }
        let bounds = scene.bounding_rect(group).expect("alive");
        assert!(bounds.contains(Point::new(55.0, 5.0)), "group bounds cover members");
        scene.destroy_item_group(group);
        assert!(scene.is_alive(b), "members survive");
        assert_eq!(scene.scene_pos(b), Some(Point::new(50.0, 0.0)), "position kept");
    }

    #[test]
    fn obscured_by_opaque_item_in_front() {
        let mut scene = Scene::new();
        let back = scene.add_item(rect_item(10.0, 10.0));
        let front = scene.add_item(rect_item(20.0, 20.0).with_pos((-5.0, -5.0)).with_z(1.0));
        assert!(scene.is_obscured_by(back, front), "covered completely");
        assert!(!scene.is_obscured_by(front, back), "back is behind");
    }

    fn polygon_item(pts: &[(f64, f64)]) -> Item {
        let pts = pts.iter().map(|&(x, y)| Point::new(x, y)).collect();
        Item::new(Content::Polygon(pts, ShapeStyle::filled(Color::WHITE)))
    }

    #[test]
    fn concave_clip_chain_is_exact() {
        let mut scene = Scene::new();
        let parent = scene.add_item(
            // An L without its top right square.
            polygon_item(&[(0., 0.), (50., 0.), (50., 50.), (100., 50.), (100., 100.), (0., 100.)])
                .with_flags(ItemFlags::CLIPS_CHILDREN_TO_SHAPE),
        );
        let child = scene
            .add_child(
                parent,
                // An L without its bottom left square.
                polygon_item(&[(0., 0.), (100., 0.), (100., 100.), (50., 100.), (50., 50.), (0., 50.)])
                    .with_flags(ItemFlags::CLIPS_TO_SHAPE),
            )
            .expect("alive");
        assert!(scene.contains(child, Point::new(25.0, 25.0)), "in both");
        assert!(scene.contains(child, Point::new(75.0, 75.0)), "in both, other square");
        assert!(!scene.contains(child, Point::new(25.0, 75.0)), "outside the child");
        assert!(!scene.contains(child, Point::new(75.0, 25.0)), "outside the parent");
        assert_eq!(
            scene.items_at(Point::new(25.0, 75.0)),
            [parent],
            "hit testing sees the same clip"
        );
    }
}
