// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat vector backend with linear scans. Small and simple; good for tiny scenes.

use alloc::vec::Vec;
use core::fmt::Debug;

use kurbo::{Point, Rect};

use crate::backend::Backend;
use crate::types::{rect_contains_inclusive, rects_touch};

/// Flat vector backend with linear scans.
#[derive(Default)]
pub struct Linear {
    entries: Vec<Option<Rect>>,
}

impl Debug for Linear {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.entries.len();
        let alive = self.entries.iter().filter(|e| e.is_some()).count();
        f.debug_struct("Linear")
            .field("total_slots", &total)
            .field("alive", &alive)
            .finish_non_exhaustive()
    }
}

impl Backend for Linear {
    fn insert(&mut self, slot: usize, bounds: Rect) {
        if self.entries.len() <= slot {
            self.entries.resize_with(slot + 1, || None);
        }
        self.entries[slot] = Some(bounds);
    }

    fn update(&mut self, slot: usize, bounds: Rect) {
        self.insert(slot, bounds);
    }

    fn remove(&mut self, slot: usize) {
        if let Some(e) = self.entries.get_mut(slot) {
            *e = None;
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn query_point(&self, pt: Point, out: &mut Vec<usize>) {
        for (i, slot) in self.entries.iter().enumerate() {
            if let Some(r) = slot.as_ref()
                && rect_contains_inclusive(r, pt)
            {
                out.push(i);
            }
        }
    }

    fn query_rect(&self, rect: Rect, out: &mut Vec<usize>) {
        for (i, slot) in self.entries.iter().enumerate() {
            if let Some(r) = slot.as_ref()
                && rects_touch(r, &rect)
            {
                out.push(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn insert_query_remove() {
        let mut b = Linear::default();
        b.insert(0, Rect::new(0.0, 0.0, 10.0, 10.0));
        b.insert(3, Rect::new(20.0, 20.0, 30.0, 30.0));
        let mut out = Vec::new();
        b.query_rect(Rect::new(5.0, 5.0, 25.0, 25.0), &mut out);
        assert_eq!(out, vec![0, 3], "both slots overlap the query");
        b.remove(0);
        out.clear();
        b.query_point(Point::new(1.0, 1.0), &mut out);
        assert!(out.is_empty(), "removed slot is no longer reported");
    }
}
