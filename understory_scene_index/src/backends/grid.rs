// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid backend over scene coordinates.

use alloc::vec::Vec;
use core::fmt::Debug;

use hashbrown::HashMap;
use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::backend::Backend;
use crate::types::{rect_contains_inclusive, rects_touch};

/// Bounds covering more cells than this go to the overflow list instead.
const MAX_CELLS_PER_ENTRY: i64 = 1024;

type Cell = (i64, i64);

/// Uniform grid backend.
///
/// Bounds are bucketed into square-ish cells of `cell_w` by `cell_h` scene
/// units relative to an origin. Negative coordinates are fine. Bounds that are
/// huge or non-finite are kept in an overflow list that every query scans.
pub struct Grid {
    cell_w: f64,
    cell_h: f64,
    origin: Point,
    entries: Vec<Option<Rect>>,
    cells: HashMap<Cell, SmallVec<[usize; 4]>>,
    overflow: Vec<usize>,
}

impl Grid {
    /// Create a grid backend with the given cell size and origin offset.
    pub fn new(cell_w: f64, cell_h: f64, origin: Point) -> Self {
        debug_assert!(cell_w > 0.0 && cell_h > 0.0, "cell sizes must be positive");
        Self {
            cell_w,
            cell_h,
            origin,
            entries: Vec::new(),
            cells: HashMap::new(),
            overflow: Vec::new(),
        }
    }

    #[inline]
    fn floor_to_i64(v: f64) -> i64 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Cell coordinates saturate; oversized bounds are routed to the overflow list."
        )]
        let i = v as i64;
        if (i as f64) > v { i - 1 } else { i }
    }

    fn key_for(&self, pt: Point) -> Cell {
        let cx = Self::floor_to_i64((pt.x - self.origin.x) / self.cell_w);
        let cy = Self::floor_to_i64((pt.y - self.origin.y) / self.cell_h);
        (cx, cy)
    }

    /// Cell span of `r`, or `None` when it is too large to bucket.
    fn span(&self, r: &Rect) -> Option<(Cell, Cell)> {
        if !(r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite()) {
            return None;
        }
        let min = self.key_for(Point::new(r.x0.min(r.x1), r.y0.min(r.y1)));
        let max = self.key_for(Point::new(r.x0.max(r.x1), r.y0.max(r.y1)));
        let w = max.0.saturating_sub(min.0).saturating_add(1);
        let h = max.1.saturating_sub(min.1).saturating_add(1);
        if w.saturating_mul(h) > MAX_CELLS_PER_ENTRY {
            None
        } else {
            Some((min, max))
        }
    }

    fn bucket(&mut self, slot: usize, bounds: &Rect) {
        match self.span(bounds) {
            Some((min, max)) => {
                for y in min.1..=max.1 {
                    for x in min.0..=max.0 {
                        self.cells.entry((x, y)).or_default().push(slot);
                    }
                }
            }
            None => self.overflow.push(slot),
        }
    }

    fn unbucket(&mut self, slot: usize) {
        let Some(Some(bounds)) = self.entries.get(slot).copied() else {
            return;
        };
        match self.span(&bounds) {
            Some((min, max)) => {
                for y in min.1..=max.1 {
                    for x in min.0..=max.0 {
                        if let Some(slots) = self.cells.get_mut(&(x, y)) {
                            slots.retain(|s| *s != slot);
                            if slots.is_empty() {
                                self.cells.remove(&(x, y));
                            }
                        }
                    }
                }
            }
            None => self.overflow.retain(|s| *s != slot),
        }
    }

    fn push_overflow_matches(&self, out: &mut Vec<usize>, keep: impl Fn(&Rect) -> bool) {
        for &s in &self.overflow {
            if let Some(Some(r)) = self.entries.get(s)
                && keep(r)
            {
                out.push(s);
            }
        }
    }
}

impl Backend for Grid {
    fn insert(&mut self, slot: usize, bounds: Rect) {
        if self.entries.len() <= slot {
            self.entries.resize_with(slot + 1, || None);
        }
        self.unbucket(slot);
        self.entries[slot] = Some(bounds);
        self.bucket(slot, &bounds);
    }

    fn update(&mut self, slot: usize, bounds: Rect) {
        self.insert(slot, bounds);
    }

    fn remove(&mut self, slot: usize) {
        self.unbucket(slot);
        if let Some(e) = self.entries.get_mut(slot) {
            *e = None;
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.cells.clear();
        self.overflow.clear();
    }

    fn query_point(&self, pt: Point, out: &mut Vec<usize>) {
        let start = out.len();
        if let Some(slots) = self.cells.get(&self.key_for(pt)) {
            for &s in slots {
                if let Some(Some(r)) = self.entries.get(s)
                    && rect_contains_inclusive(r, pt)
                {
                    out.push(s);
                }
            }
        }
        self.push_overflow_matches(out, |r| rect_contains_inclusive(r, pt));
        dedup_tail(out, start);
    }

    fn query_rect(&self, rect: Rect, out: &mut Vec<usize>) {
        let start = out.len();
        match self.span(&rect) {
            Some((min, max)) => {
                for y in min.1..=max.1 {
                    for x in min.0..=max.0 {
                        if let Some(slots) = self.cells.get(&(x, y)) {
                            out.extend(slots.iter().copied());
                        }
                    }
                }
            }
            None => {
                for slots in self.cells.values() {
                    out.extend(slots.iter().copied());
                }
            }
        }
        let mut tail = out.split_off(start);
        tail.retain(|s| matches!(self.entries.get(*s), Some(Some(r)) if rects_touch(r, &rect)));
        out.extend(tail);
        self.push_overflow_matches(out, |r| rects_touch(r, &rect));
        dedup_tail(out, start);
    }
}

fn dedup_tail(out: &mut Vec<usize>, start: usize) {
    out[start..].sort_unstable();
    let mut tail = out.split_off(start);
    tail.dedup();
    out.extend(tail);
}

impl Debug for Grid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.entries.len();
        let alive = self.entries.iter().filter(|e| e.is_some()).count();
        f.debug_struct("Grid")
            .field("cell_w", &self.cell_w)
            .field("cell_h", &self.cell_h)
            .field("origin", &self.origin)
            .field("total_slots", &total)
            .field("alive", &alive)
            .field("cells", &self.cells.len())
            .field("overflow", &self.overflow.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn negative_coordinates_and_edges() {
        let mut g = Grid::new(10.0, 10.0, Point::ZERO);
        g.insert(0, Rect::new(-15.0, -15.0, -5.0, -5.0));
        g.insert(1, Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut out = Vec::new();
        g.query_point(Point::new(-10.0, -10.0), &mut out);
        assert_eq!(out, vec![0], "negative cells are addressable");
        out.clear();
        g.query_point(Point::new(10.0, 10.0), &mut out);
        assert_eq!(out, vec![1], "bounds are bucketed with inclusive max edges");
    }

    #[test]
    fn oversized_bounds_use_overflow() {
        let mut g = Grid::new(1.0, 1.0, Point::ZERO);
        g.insert(2, Rect::new(0.0, 0.0, 1.0e6, 1.0e6));
        g.insert(5, Rect::new(0.0, 0.0, 1.0, 1.0));
        let mut out = Vec::new();
        g.query_rect(Rect::new(0.5, 0.5, 0.6, 0.6), &mut out);
        assert_eq!(out, vec![2, 5], "overflow entries are always considered");
        g.remove(2);
        out.clear();
        g.query_rect(Rect::new(500.0, 500.0, 600.0, 600.0), &mut out);
        assert!(out.is_empty(), "removed overflow entry is gone");
    }

    #[test]
    fn update_moves_between_cells() {
        let mut g = Grid::new(10.0, 10.0, Point::ZERO);
        g.insert(0, Rect::new(0.0, 0.0, 5.0, 5.0));
        g.update(0, Rect::new(50.0, 50.0, 55.0, 55.0));
        let mut out = Vec::new();
        g.query_rect(Rect::new(0.0, 0.0, 6.0, 6.0), &mut out);
        assert!(out.is_empty(), "old cells were cleared");
        g.query_rect(Rect::new(49.0, 49.0, 60.0, 60.0), &mut out);
        assert_eq!(out, vec![0], "new cells hold the slot");
    }
}
