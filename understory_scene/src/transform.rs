// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item-local transforms.
//!
//! An item maps its local coordinates into its parent's with
//!
//! ```text
//! translate(pos) * base * ops[0] * ops[1] * .. * rotate_about(origin) * scale_about(origin)
//! ```
//!
//! read as a product of `kurbo::Affine` values (the rightmost factor applies to
//! points first). A local point is scaled and rotated about the origin, then
//! passes through the ops from last to first, then through `base`, and finally
//! moves by the position. Swapping `base` and the ops changes the result
//! whenever they don't commute, so this order is fixed.
//!
//! Rotation is in degrees, positive values turn clockwise on a y-down screen,
//! which matches [`Affine::rotate`].

use alloc::vec::Vec;
use kurbo::{Affine, Point, Vec2};

const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;

/// One additional transform operation applied after the base transform.
#[derive(Clone, Debug, PartialEq)]
pub enum TransformOp {
    /// Translate by a vector.
    Translate(Vec2),
    /// Rotate by `degrees` around `origin`.
    Rotate {
        /// Angle in degrees, clockwise on screen.
        degrees: f64,
        /// Fixed point of the rotation.
        origin: Point,
    },
    /// Scale around `origin`.
    Scale {
        /// Horizontal factor.
        sx: f64,
        /// Vertical factor.
        sy: f64,
        /// Fixed point of the scale.
        origin: Point,
    },
    /// Shear by the given factors.
    Shear {
        /// Horizontal shear factor.
        sh: f64,
        /// Vertical shear factor.
        sv: f64,
    },
    /// An arbitrary matrix.
    Matrix(Affine),
}

impl TransformOp {
    /// The matrix for this operation.
    pub fn to_affine(&self) -> Affine {
        match *self {
            Self::Translate(v) => Affine::translate(v),
            Self::Rotate { degrees, origin } => about(origin, Affine::rotate(degrees * DEG_TO_RAD)),
            Self::Scale { sx, sy, origin } => about(origin, Affine::scale_non_uniform(sx, sy)),
            Self::Shear { sh, sv } => Affine::skew(sh, sv),
            Self::Matrix(m) => m,
        }
    }
}

/// Conjugate `m` so that `origin` is its fixed point.
fn about(origin: Point, m: Affine) -> Affine {
    let o = origin.to_vec2();
    Affine::translate(o) * m * Affine::translate(-o)
}

/// The local transform state of an item (everything except its position).
#[derive(Clone, Debug, PartialEq)]
pub struct ItemTransform {
    /// Base matrix.
    pub base: Affine,
    /// Additional operations, multiplied onto `base` in list order.
    pub ops: Vec<TransformOp>,
    /// Rotation in degrees about `origin`.
    pub rotation: f64,
    /// Uniform scale about `origin`.
    pub scale: f64,
    /// Transform origin for rotation and scale.
    pub origin: Point,
}

impl Default for ItemTransform {
    fn default() -> Self {
        Self {
            base: Affine::IDENTITY,
            ops: Vec::new(),
            rotation: 0.0,
            scale: 1.0,
            origin: Point::ZERO,
        }
    }
}

impl ItemTransform {
    /// True when nothing but the position would affect the mapping.
    pub fn is_identity(&self) -> bool {
        self.base == Affine::IDENTITY
            && self.ops.is_empty()
            && self.rotation == 0.0
            && self.scale == 1.0
    }

    /// The combined local matrix, without the position.
    pub fn matrix(&self) -> Affine {
        if self.is_identity() {
            return Affine::IDENTITY;
        }
        let mut m = self.base;
        for op in &self.ops {
            m *= op.to_affine();
        }
        if self.rotation != 0.0 || self.scale != 1.0 {
            let rs = Affine::rotate(self.rotation * DEG_TO_RAD) * Affine::scale(self.scale);
            m *= about(self.origin, rs);
        }
        m
    }

    /// Map from item-local coordinates into the parent's, given the item position.
    pub fn to_parent(&self, pos: Point) -> Affine {
        let m = self.matrix();
        if pos == Point::ZERO {
            m
        } else {
            Affine::translate(pos.to_vec2()) * m
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn rotation_is_clockwise_on_screen() {
        let t = ItemTransform {
            rotation: 90.0,
            ..Default::default()
        };
        let p = t.matrix() * Point::new(20.0, 20.0);
        assert!(close(p, Point::new(-20.0, 20.0)), "got {p:?}");
    }

    #[test]
    fn fixed_order_base_ops_rotation_scale() {
        let t = ItemTransform {
            base: Affine::translate((5.0, 0.0)),
            ops: vec![
                TransformOp::Scale {
                    sx: 2.0,
                    sy: 1.0,
                    origin: Point::ZERO,
                },
                TransformOp::Translate(Vec2::new(0.0, 3.0)),
            ],
            rotation: 90.0,
            scale: 2.0,
            origin: Point::new(1.0, 0.0),
        };
        // Apply by hand, rightmost first.
        let p = Point::new(2.0, 0.0);
        // Scale 2 about (1,0): (3,0). Rotate 90 about (1,0): (1,2).
        let p1 = Point::new(1.0, 2.0);
        // ops[1] then ops[0]: (1,5) then (2,5). Base: (7,5).
        let expected = Point::new(7.0, 5.0);
        assert!(close(about(t.origin, Affine::rotate(core::f64::consts::FRAC_PI_2) * Affine::scale(2.0)) * p, p1), "rotation/scale about origin");
        assert!(close(t.matrix() * p, expected), "got {:?}", t.matrix() * p);
        assert!(
            close(t.to_parent(Point::new(10.0, 10.0)) * p, expected + Vec2::new(10.0, 10.0)),
            "position applies last"
        );
    }

    #[test]
    fn base_wraps_the_ops() {
        let t = ItemTransform {
            base: Affine::rotate(core::f64::consts::FRAC_PI_2),
            ops: vec![TransformOp::Shear { sh: 1.0, sv: 0.0 }],
            ..Default::default()
        };
        let p = Point::new(0.0, 1.0);
        // Shear first: (1,1). Then a quarter turn: (-1,1).
        assert!(close(t.matrix() * p, Point::new(-1.0, 1.0)), "got {:?}", t.matrix() * p);
        let swapped = Affine::skew(1.0, 0.0) * Affine::rotate(core::f64::consts::FRAC_PI_2);
        assert!(
            !close(t.matrix() * p, swapped * p),
            "the other order lands elsewhere: {:?}",
            swapped * p
        );
    }

    #[test]
    fn identity_detection() {
        let mut t = ItemTransform::default();
        assert!(t.is_identity(), "default is identity");
        t.origin = Point::new(3.0, 3.0);
        assert!(t.is_identity(), "origin alone does not transform");
        t.scale = 0.5;
        assert!(!t.is_identity(), "scale does");
    }
}
