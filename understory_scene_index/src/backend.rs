// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend trait for spatial strategies behind [`SceneIndex`](crate::SceneIndex).

use alloc::vec::Vec;
use core::fmt::Debug;

use kurbo::{Point, Rect};

/// Spatial backend abstraction used by [`SceneIndex`](crate::SceneIndex).
///
/// Backends only ever see committed, scene-space bounds addressed by slot.
/// They report conservative candidates: a slot whose bounds touch the query
/// must be reported, extra slots are allowed.
pub trait Backend: Debug {
    /// Insert a new slot into the spatial structure.
    fn insert(&mut self, slot: usize, bounds: Rect);

    /// Update an existing slot's bounds.
    fn update(&mut self, slot: usize, bounds: Rect);

    /// Remove a slot from the spatial structure.
    fn remove(&mut self, slot: usize);

    /// Clear all spatial structures.
    fn clear(&mut self);

    /// Append slots whose bounds contain the point.
    fn query_point(&self, pt: Point, out: &mut Vec<usize>);

    /// Append slots whose bounds intersect the rectangle.
    fn query_rect(&self, rect: Rect, out: &mut Vec<usize>);
}
