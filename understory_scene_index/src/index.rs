// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`SpatialIndex`] contract and its generic implementation over a pluggable backend.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashMap;
use kurbo::{Point, Rect};

use crate::backend::Backend;
use crate::backends::{Grid, Linear};
use crate::types::{IndexChange, SortOrder, rect_contains_inclusive, rects_touch, sort_keys};

/// Object-safe spatial index contract used by a scene.
///
/// Keys are small copyable handles (for example generational item ids). The
/// index never owns items; the scene feeds it scene-space bounds.
///
/// Estimates are conservative: every key whose bounds touch the query is
/// reported, and keys without stable bounds (pending a bounds change, or
/// flagged as ignoring transformations) are always reported. Callers refine
/// the candidates with precise shape tests.
pub trait SpatialIndex<K: Copy + Eq + Hash + Debug>: Debug {
    /// Start tracking `key` with scene-space `bounds`.
    fn add_item(&mut self, key: K, bounds: Rect);

    /// Stop tracking `key`. Unknown keys are ignored.
    fn remove_item(&mut self, key: K);

    /// Forget the current bounds of `key` until [`SpatialIndex::update_item`] supplies new ones.
    ///
    /// Calling this repeatedly before the next update is equivalent to calling it once.
    fn prepare_bounding_rect_change(&mut self, key: K);

    /// Supply fresh scene-space bounds for `key`.
    fn update_item(&mut self, key: K, bounds: Rect);

    /// Notify the index about a change that affects how `key` is indexed.
    fn item_change(&mut self, key: K, change: IndexChange);

    /// Whether `key` is tracked.
    fn contains(&self, key: K) -> bool;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    /// True if no keys are tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether there are changes waiting for [`SpatialIndex::commit`].
    fn needs_commit(&self) -> bool;

    /// Move pending bounds into the spatial backend. Returns the number of keys synchronized.
    fn commit(&mut self) -> usize;

    /// Forget every key.
    fn clear(&mut self);

    /// Append candidate keys whose bounds may intersect `rect`.
    fn estimate_items(&self, rect: Rect, out: &mut Vec<K>);

    /// Append candidate keys whose bounds may contain `pt`.
    fn estimate_items_at(&self, pt: Point, out: &mut Vec<K>);

    /// Append every tracked key.
    fn items(&self, out: &mut Vec<K>);

    /// Candidates intersecting `rect`, sorted with `stacking`.
    fn items_in_rect(
        &self,
        rect: Rect,
        order: SortOrder,
        stacking: &dyn Fn(&K, &K) -> Ordering,
    ) -> Vec<K> {
        let mut out = Vec::new();
        self.estimate_items(rect, &mut out);
        sort_keys(&mut out, order, stacking);
        out
    }

    /// Candidates containing `pt`, sorted with `stacking`.
    fn items_at(&self, pt: Point, order: SortOrder, stacking: &dyn Fn(&K, &K) -> Ordering) -> Vec<K> {
        let mut out = Vec::new();
        self.estimate_items_at(pt, &mut out);
        sort_keys(&mut out, order, stacking);
        out
    }

    /// Every tracked key, sorted with `stacking`.
    fn all_items(&self, order: SortOrder, stacking: &dyn Fn(&K, &K) -> Ordering) -> Vec<K> {
        let mut out = Vec::new();
        self.items(&mut out);
        sort_keys(&mut out, order, stacking);
        out
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mark {
    Added,
    Updated,
    Pending,
}

#[derive(Clone, Debug)]
struct Entry {
    slot: usize,
    bounds: Option<Rect>,
    mark: Option<Mark>,
    unindexed: bool,
    in_backend: bool,
}

impl Entry {
    fn is_loose(&self) -> bool {
        self.mark.is_some() || self.unindexed
    }
}

/// A generic scene index parameterized by a spatial backend.
///
/// Changes are recorded lazily and folded into the backend on
/// [`SpatialIndex::commit`]. Until then the affected keys live in a small
/// "loose" list that queries scan directly, so queries are always correct.
#[derive(Debug)]
pub struct SceneIndex<K: Copy + Eq + Hash + Debug, B: Backend> {
    entries: HashMap<K, Entry>,
    slots: Vec<Option<K>>,
    free_list: Vec<usize>,
    loose: Vec<K>,
    backend: B,
}

impl<K: Copy + Eq + Hash + Debug, B: Backend + Default> Default for SceneIndex<K, B> {
    fn default() -> Self {
        Self::with_backend(B::default())
    }
}

impl<K: Copy + Eq + Hash + Debug, B: Backend> SceneIndex<K, B> {
    /// Create an empty index over `backend`.
    pub fn with_backend(backend: B) -> Self {
        Self {
            entries: HashMap::new(),
            slots: Vec::new(),
            free_list: Vec::new(),
            loose: Vec::new(),
            backend,
        }
    }

    /// Scene-space bounds currently recorded for `key`, if known.
    pub fn bounds(&self, key: K) -> Option<Rect> {
        self.entries.get(&key).and_then(|e| e.bounds)
    }

    fn alloc_slot(&mut self, key: K) -> usize {
        if let Some(slot) = self.free_list.pop() {
            self.slots[slot] = Some(key);
            slot
        } else {
            self.slots.push(Some(key));
            self.slots.len() - 1
        }
    }

    fn make_loose(&mut self, key: K) {
        if let Some(e) = self.entries.get_mut(&key) {
            let was_loose = e.is_loose();
            if e.in_backend {
                self.backend.remove(e.slot);
                e.in_backend = false;
            }
            if !was_loose {
                self.loose.push(key);
            }
        }
    }

    fn push_loose_matches(&self, out: &mut Vec<K>, keep: impl Fn(&Rect) -> bool) {
        for key in &self.loose {
            let Some(e) = self.entries.get(key) else {
                continue;
            };
            let hit = match e.bounds {
                Some(b) if !e.unindexed && e.mark != Some(Mark::Pending) => keep(&b),
                _ => true,
            };
            if hit {
                out.push(*key);
            }
        }
    }

    fn push_backend_slots(&self, slots: Vec<usize>, out: &mut Vec<K>) {
        for s in slots {
            if let Some(Some(key)) = self.slots.get(s)
                && self.entries.get(key).is_some_and(|e| e.in_backend)
            {
                out.push(*key);
            }
        }
    }
}

impl<K: Copy + Eq + Hash + Debug, B: Backend> SpatialIndex<K> for SceneIndex<K, B> {
    fn add_item(&mut self, key: K, bounds: Rect) {
        if self.entries.contains_key(&key) {
            self.update_item(key, bounds);
            return;
        }
        let slot = self.alloc_slot(key);
        self.entries.insert(
            key,
            Entry {
                slot,
                bounds: Some(bounds),
                mark: Some(Mark::Added),
                unindexed: false,
                in_backend: false,
            },
        );
        self.loose.push(key);
    }

    fn remove_item(&mut self, key: K) {
        let Some(e) = self.entries.remove(&key) else {
            return;
        };
        if e.in_backend {
            self.backend.remove(e.slot);
        }
        if e.is_loose() {
            self.loose.retain(|k| *k != key);
        }
        self.slots[e.slot] = None;
        self.free_list.push(e.slot);
    }

    fn prepare_bounding_rect_change(&mut self, key: K) {
        self.make_loose(key);
        if let Some(e) = self.entries.get_mut(&key)
            && e.mark != Some(Mark::Added)
        {
            e.mark = Some(Mark::Pending);
        }
    }

    fn update_item(&mut self, key: K, bounds: Rect) {
        self.make_loose(key);
        if let Some(e) = self.entries.get_mut(&key) {
            e.bounds = Some(bounds);
            e.mark = Some(match e.mark {
                Some(Mark::Added) => Mark::Added,
                _ => Mark::Updated,
            });
        }
    }

    fn item_change(&mut self, key: K, change: IndexChange) {
        match change {
            IndexChange::IgnoresTransformations(ignores) => {
                self.make_loose(key);
                if let Some(e) = self.entries.get_mut(&key) {
                    e.unindexed = ignores;
                    if e.mark.is_none() {
                        e.mark = Some(Mark::Updated);
                    }
                }
            }
            // Stacking is resolved by the caller's comparator; nothing is cached here.
            IndexChange::ZValue(_) | IndexChange::Parent => {}
        }
    }

    fn contains(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn needs_commit(&self) -> bool {
        self.loose
            .iter()
            .any(|k| self.entries.get(k).is_some_and(|e| e.mark.is_some()))
    }

    fn commit(&mut self) -> usize {
        let mut synced = 0;
        let loose = core::mem::take(&mut self.loose);
        for key in loose {
            let Some(e) = self.entries.get_mut(&key) else {
                continue;
            };
            match (e.mark, e.bounds) {
                (Some(Mark::Added | Mark::Updated), Some(bounds)) if !e.unindexed => {
                    self.backend.insert(e.slot, bounds);
                    e.in_backend = true;
                    e.mark = None;
                    synced += 1;
                }
                (Some(Mark::Added | Mark::Updated), _) => {
                    e.mark = None;
                    synced += 1;
                    self.loose.push(key);
                }
                _ => self.loose.push(key),
            }
        }
        synced
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.slots.clear();
        self.free_list.clear();
        self.loose.clear();
        self.backend.clear();
    }

    fn estimate_items(&self, rect: Rect, out: &mut Vec<K>) {
        let mut slots = Vec::new();
        self.backend.query_rect(rect, &mut slots);
        self.push_backend_slots(slots, out);
        self.push_loose_matches(out, |b| rects_touch(b, &rect));
    }

    fn estimate_items_at(&self, pt: Point, out: &mut Vec<K>) {
        let mut slots = Vec::new();
        self.backend.query_point(pt, &mut slots);
        self.push_backend_slots(slots, out);
        self.push_loose_matches(out, |b| rect_contains_inclusive(b, pt));
    }

    fn items(&self, out: &mut Vec<K>) {
        out.extend(self.entries.keys().copied());
    }
}

/// Index backed by a flat vector with linear scans.
pub type LinearIndex<K> = SceneIndex<K, Linear>;

/// Index backed by a uniform grid.
pub type GridIndex<K> = SceneIndex<K, Grid>;

impl<K: Copy + Eq + Hash + Debug> SceneIndex<K, Grid> {
    /// Create a grid-backed index with square cells of `cell_size` scene units.
    pub fn with_uniform_grid(cell_size: f64) -> Self {
        Self::with_backend(Grid::new(cell_size, cell_size, Point::ZERO))
    }
}

/// Strategy used to build a scene's spatial index.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum IndexMethod {
    /// Linear scans; no spatial acceleration. Best for small or highly dynamic scenes.
    Linear,
    /// Uniform grid with the given cell size in scene units.
    Grid {
        /// Width and height of one cell.
        cell_size: f64,
    },
}

impl Default for IndexMethod {
    fn default() -> Self {
        Self::Grid { cell_size: 128.0 }
    }
}

impl IndexMethod {
    /// Build a boxed index for this strategy.
    pub fn build<K: Copy + Eq + Hash + Debug + 'static>(self) -> Box<dyn SpatialIndex<K>> {
        match self {
            Self::Linear => Box::new(LinearIndex::<K>::default()),
            Self::Grid { cell_size } if cell_size > 0.0 => {
                Box::new(GridIndex::<K>::with_uniform_grid(cell_size))
            }
            Self::Grid { .. } => Box::new(LinearIndex::<K>::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn by_value(a: &u32, b: &u32) -> Ordering {
        a.cmp(b)
    }

    #[test]
    fn queries_are_correct_before_commit() {
        let mut idx = LinearIndex::<u32>::default();
        idx.add_item(1, Rect::new(0.0, 0.0, 10.0, 10.0));
        idx.add_item(2, Rect::new(20.0, 0.0, 30.0, 10.0));
        assert!(idx.needs_commit(), "fresh items wait for commit");
        let hits = idx.items_at(Point::new(5.0, 5.0), SortOrder::Descending, &by_value);
        assert_eq!(hits, vec![1], "loose items are tested against their bounds");
        assert_eq!(idx.commit(), 2, "both items are synchronized");
        let hits = idx.items_at(Point::new(25.0, 5.0), SortOrder::Descending, &by_value);
        assert_eq!(hits, vec![2], "committed items come from the backend");
    }

    #[test]
    fn pending_bounds_are_always_candidates() {
        let mut idx = GridIndex::<u32>::with_uniform_grid(16.0);
        idx.add_item(7, Rect::new(0.0, 0.0, 4.0, 4.0));
        idx.commit();
        idx.prepare_bounding_rect_change(7);
        let hits = idx.items_in_rect(
            Rect::new(500.0, 500.0, 501.0, 501.0),
            SortOrder::Unsorted,
            &by_value,
        );
        assert_eq!(hits, vec![7], "pending key is reported everywhere");
        idx.update_item(7, Rect::new(100.0, 100.0, 110.0, 110.0));
        idx.commit();
        assert!(
            idx.items_at(Point::new(2.0, 2.0), SortOrder::Unsorted, &by_value)
                .is_empty(),
            "old area is vacated"
        );
        assert_eq!(
            idx.items_at(Point::new(105.0, 105.0), SortOrder::Unsorted, &by_value),
            vec![7],
            "new area is indexed"
        );
    }

    #[test]
    fn prepare_is_idempotent() {
        let mut idx = LinearIndex::<u32>::default();
        idx.add_item(1, Rect::new(0.0, 0.0, 1.0, 1.0));
        idx.commit();
        idx.prepare_bounding_rect_change(1);
        idx.prepare_bounding_rect_change(1);
        assert_eq!(idx.loose, vec![1], "a key is listed once however often it is prepared");
    }

    #[test]
    fn unindexed_items_survive_commit() {
        let mut idx = GridIndex::<u32>::with_uniform_grid(8.0);
        idx.add_item(3, Rect::new(0.0, 0.0, 1.0, 1.0));
        idx.item_change(3, IndexChange::IgnoresTransformations(true));
        idx.commit();
        let hits = idx.items_in_rect(Rect::new(90.0, 90.0, 91.0, 91.0), SortOrder::Unsorted, &by_value);
        assert_eq!(hits, vec![3], "unindexed keys are always candidates");
        idx.item_change(3, IndexChange::IgnoresTransformations(false));
        idx.commit();
        let hits = idx.items_in_rect(Rect::new(90.0, 90.0, 91.0, 91.0), SortOrder::Unsorted, &by_value);
        assert!(hits.is_empty(), "re-indexed key is filtered spatially again");
    }

    #[test]
    fn remove_frees_slot_for_reuse() {
        let mut idx = LinearIndex::<u32>::default();
        idx.add_item(1, Rect::new(0.0, 0.0, 1.0, 1.0));
        idx.commit();
        idx.remove_item(1);
        idx.add_item(2, Rect::new(0.0, 0.0, 1.0, 1.0));
        idx.commit();
        let hits = idx.all_items(SortOrder::Ascending, &by_value);
        assert_eq!(hits, vec![2], "only the new key is tracked");
        assert_eq!(idx.slots.len(), 1, "slot was recycled");
    }
}
