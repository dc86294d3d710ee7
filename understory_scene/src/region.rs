// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A set of non-overlapping rectangles, used for exact repaint regions.

use alloc::vec::Vec;
use kurbo::{Rect, Vec2};

/// A region made of non-overlapping axis-aligned rectangles.
///
/// Adding a rect only stores the parts not already covered, so the total
/// stored area always equals the covered area.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Region {
    rects: Vec<Rect>,
}

fn is_empty_rect(r: &Rect) -> bool {
    r.x1 <= r.x0 || r.y1 <= r.y0
}

/// Pieces of `a` not covered by `b`.
fn subtract(a: Rect, b: Rect, out: &mut Vec<Rect>) {
    let i = a.intersect(b);
    if is_empty_rect(&i) {
        out.push(a);
        return;
    }
    if a.y0 < i.y0 {
        out.push(Rect::new(a.x0, a.y0, a.x1, i.y0));
    }
    if i.y1 < a.y1 {
        out.push(Rect::new(a.x0, i.y1, a.x1, a.y1));
    }
    if a.x0 < i.x0 {
        out.push(Rect::new(a.x0, i.y0, i.x0, i.y1));
    }
    if i.x1 < a.x1 {
        out.push(Rect::new(i.x1, i.y0, a.x1, i.y1));
    }
}

impl Region {
    /// An empty region.
    pub fn new() -> Self {
        Self::default()
    }

    /// A region covering `rect`.
    pub fn from_rect(rect: Rect) -> Self {
        let mut r = Self::new();
        r.add_rect(rect);
        r
    }

    /// True when nothing is covered.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of stored rectangles.
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// The stored rectangles, in insertion order.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Add the area of `rect`.
    pub fn add_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        if is_empty_rect(&rect) {
            return;
        }
        let mut pieces = Vec::from([rect]);
        for existing in &self.rects {
            if pieces.is_empty() {
                return;
            }
            let mut next = Vec::with_capacity(pieces.len());
            for p in pieces {
                subtract(p, *existing, &mut next);
            }
            pieces = next;
        }
        self.rects.extend(pieces);
    }

    /// Add every rect of another region.
    pub fn add_region(&mut self, other: &Self) {
        for r in &other.rects {
            self.add_rect(*r);
        }
    }

    /// Union of all stored rects, or `None` when empty.
    pub fn bounding_rect(&self) -> Option<Rect> {
        let mut it = self.rects.iter();
        let first = *it.next()?;
        Some(it.fold(first, |acc, r| acc.union(*r)))
    }

    /// Total covered area.
    pub fn area(&self) -> f64 {
        self.rects.iter().map(Rect::area).sum()
    }

    /// True when `rect` overlaps the region.
    pub fn intersects(&self, rect: Rect) -> bool {
        self.rects
            .iter()
            .any(|r| !is_empty_rect(&r.intersect(rect)))
    }

    /// True when the whole of `rect` is covered.
    pub fn contains_rect(&self, rect: Rect) -> bool {
        let mut remaining = Vec::from([rect]);
        for r in &self.rects {
            let mut next = Vec::new();
            for p in remaining {
                subtract(p, *r, &mut next);
            }
            remaining = next;
            if remaining.is_empty() {
                return true;
            }
        }
        remaining.is_empty()
    }

    /// Restrict the region to `clip`.
    pub fn intersect_rect(&mut self, clip: Rect) {
        self.rects = self
            .rects
            .iter()
            .map(|r| r.intersect(clip))
            .filter(|r| !is_empty_rect(r))
            .collect();
    }

    /// Shift every rect by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        for r in &mut self.rects {
            *r = *r + delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_adds_do_not_double_count() {
        let mut r = Region::new();
        r.add_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        r.add_rect(Rect::new(5.0, 5.0, 15.0, 15.0));
        assert_eq!(r.area(), 175.0, "100 + 100 - 25 overlap");
        assert_eq!(
            r.bounding_rect(),
            Some(Rect::new(0.0, 0.0, 15.0, 15.0)),
            "bounds cover both"
        );
        for (i, a) in r.rects().iter().enumerate() {
            for b in &r.rects()[i + 1..] {
                assert!(is_empty_rect(&a.intersect(*b)), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn covered_rect_adds_nothing() {
        let mut r = Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        r.add_rect(Rect::new(2.0, 2.0, 4.0, 4.0));
        assert_eq!(r.len(), 1, "already covered");
        assert!(r.contains_rect(Rect::new(1.0, 1.0, 9.0, 9.0)), "contained");
        assert!(!r.contains_rect(Rect::new(5.0, 5.0, 11.0, 6.0)), "sticks out");
    }

    #[test]
    fn clip_and_translate() {
        let mut r = Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        r.add_rect(Rect::new(20.0, 0.0, 30.0, 10.0));
        r.intersect_rect(Rect::new(5.0, 0.0, 25.0, 5.0));
        assert_eq!(r.area(), 50.0, "two 5x5 pieces remain");
        r.translate(Vec2::new(1.0, 1.0));
        assert!(r.intersects(Rect::new(6.0, 1.0, 7.0, 2.0)), "moved");
        assert!(!r.intersects(Rect::new(0.0, 0.0, 5.0, 1.0)), "old place empty");
    }
}
