// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_scene_index --heading-base-level=0

//! Understory Scene Index: the spatial index behind a scene graph.
//!
//! A scene asks this crate one question over and over: "which items could be
//! under this point, or inside this rectangle?" The answer is a conservative
//! candidate list that the scene then refines with exact shape tests.
//!
//! - Track items by a small copyable key together with their scene-space bounds.
//! - Announce bounds changes in two steps: [`SpatialIndex::prepare_bounding_rect_change`]
//!   before the change and [`SpatialIndex::update_item`] once new bounds are known.
//! - Batch structural work with [`SpatialIndex::commit`]; queries stay correct in between.
//! - Sort results back-to-front or front-to-back with a stacking comparator
//!   supplied by the caller, because only the scene knows its tree order.
//!
//! The [`SpatialIndex`] trait is object safe so a scene can switch strategies at runtime.
//!
//! # Example
//!
//! ```rust
//! use core::cmp::Ordering;
//! use kurbo::{Point, Rect};
//! use understory_scene_index::{LinearIndex, SortOrder, SpatialIndex};
//!
//! let mut idx = LinearIndex::<u32>::default();
//! idx.add_item(1, Rect::new(0.0, 0.0, 10.0, 10.0));
//! idx.add_item(2, Rect::new(5.0, 5.0, 15.0, 15.0));
//! idx.commit();
//!
//! // Higher keys stack on top in this toy comparator.
//! let stacking = |a: &u32, b: &u32| -> Ordering { a.cmp(b) };
//! let hits = idx.items_at(Point::new(6.0, 6.0), SortOrder::Descending, &stacking);
//! assert_eq!(hits, vec![2, 1]);
//!
//! // Move the first item: prepare, then supply the new bounds.
//! idx.prepare_bounding_rect_change(1);
//! idx.update_item(1, Rect::new(40.0, 0.0, 50.0, 10.0));
//! let hits = idx.items_at(Point::new(6.0, 6.0), SortOrder::Descending, &stacking);
//! assert_eq!(hits, vec![2]);
//! ```
//!
//! ## Choosing a backend
//!
//! - [`LinearIndex`]: linear scans. Good for small scenes or when bounds change
//!   far more often than they are queried.
//! - [`GridIndex`]: uniform grid. Choose a cell size so most items cover a
//!   handful of cells; huge or infinite bounds fall back to an overflow list.
//!
//! [`IndexMethod`] builds either one behind a `Box<dyn SpatialIndex<K>>`.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod backend;
pub mod backends;
pub mod index;
pub mod types;

pub use backend::Backend;
pub use backends::{Grid, Linear};
pub use index::{GridIndex, IndexMethod, LinearIndex, SceneIndex, SpatialIndex};
pub use types::{IndexChange, SortOrder, sort_keys};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use core::cmp::Ordering;
    use kurbo::{Point, Rect};

    fn stacking(a: &u32, b: &u32) -> Ordering {
        a.cmp(b)
    }

    #[test]
    fn boxed_backends_agree() {
        for method in [IndexMethod::Linear, IndexMethod::Grid { cell_size: 7.0 }] {
            let mut idx = method.build::<u32>();
            for i in 0..20_u32 {
                let x = f64::from(i) * 6.0;
                idx.add_item(i, Rect::new(x, 0.0, x + 8.0, 8.0));
            }
            idx.commit();
            let hits = idx.items_at(Point::new(13.0, 4.0), SortOrder::Ascending, &stacking);
            assert_eq!(hits, [1, 2], "{method:?} finds overlapping neighbours");
            let all: Vec<_> = idx.all_items(SortOrder::Descending, &stacking);
            assert_eq!(all.len(), 20, "{method:?} tracks every key");
            assert_eq!(all[0], 19, "{method:?} sorts front-to-back");
        }
    }
}
