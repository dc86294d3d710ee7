// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `linear`: flat vector with linear scans (small, simple, no tuning).
//! - `grid`: uniform grid over scene coordinates with an overflow list for
//!   bounds that span too many cells.

pub mod grid;
pub mod linear;

pub use grid::Grid;
pub use linear::Linear;
