// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Query ordering and change notifications shared by all index flavors.

use core::cmp::Ordering;
use kurbo::{Point, Rect};

/// Order in which sorted queries return keys.
///
/// Ordering is defined by a caller-supplied stacking comparator where
/// `Ordering::Less` means "painted earlier" (further back).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Back-to-front: the first key is painted first.
    Ascending,
    /// Front-to-back: the first key is the topmost one.
    #[default]
    Descending,
    /// No particular order; cheapest to produce.
    Unsorted,
}

/// Item changes that influence how a key is indexed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum IndexChange {
    /// The key's item started or stopped ignoring ancestor transformations.
    ///
    /// Such items have no stable scene-space bounds and are kept unindexed,
    /// which means every query reports them as candidates.
    IgnoresTransformations(bool),
    /// The stacking value of the key changed.
    ZValue(f64),
    /// The key was moved under a different parent.
    Parent,
}

/// Sort `keys` in place with a stacking comparator.
pub fn sort_keys<K>(keys: &mut [K], order: SortOrder, stacking: &dyn Fn(&K, &K) -> Ordering) {
    match order {
        SortOrder::Ascending => keys.sort_by(|a, b| stacking(a, b)),
        SortOrder::Descending => keys.sort_by(|a, b| stacking(b, a)),
        SortOrder::Unsorted => {}
    }
}

/// True when `rect` contains `pt`, edges inclusive.
///
/// `kurbo::Rect::contains` excludes the max edges; index candidates must be
/// conservative, so both edges are inclusive here.
#[inline]
pub fn rect_contains_inclusive(rect: &Rect, pt: Point) -> bool {
    pt.x >= rect.x0 && pt.x <= rect.x1 && pt.y >= rect.y0 && pt.y <= rect.y1
}

/// True when two rects overlap or touch.
#[inline]
pub fn rects_touch(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn inclusive_edges() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect_contains_inclusive(&r, Point::new(10.0, 10.0)), "max edge is inside");
        assert!(!rect_contains_inclusive(&r, Point::new(10.5, 3.0)), "outside stays outside");
        assert!(rects_touch(&r, &Rect::new(10.0, 0.0, 20.0, 5.0)), "touching rects overlap");
    }

    #[test]
    fn sort_orders() {
        let mut keys = vec![3, 1, 2];
        sort_keys(&mut keys, SortOrder::Ascending, &|a: &i32, b: &i32| a.cmp(b));
        assert_eq!(keys, vec![1, 2, 3], "ascending is back-to-front");
        sort_keys(&mut keys, SortOrder::Descending, &|a: &i32, b: &i32| a.cmp(b));
        assert_eq!(keys, vec![3, 2, 1], "descending is front-to-back");
    }
}
