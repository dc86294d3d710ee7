// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View and scene coordinate mapping.

use alloc::vec::Vec;
use kurbo::{Affine, BezPath, Point, Rect, Vec2};

use super::View;
use crate::geometry::{is_translate_only, map_path, map_rect_to_polygon};

impl View {
    /// Scroll offset: the view coordinate of the scene-space origin after the
    /// view transform, negated.
    pub fn scroll(&self) -> Vec2 {
        Vec2::new(self.hbar.value - self.indent.x, self.vbar.value - self.indent.y)
    }

    /// Scene-to-view transform: the view transform followed by the scroll offset.
    pub fn viewport_transform(&self) -> Affine {
        Affine::translate(-self.scroll()) * self.transform
    }

    /// Whether the view transform does more than translate.
    pub fn is_transformed(&self) -> bool {
        !is_translate_only(&self.transform)
    }

    /// Map a view point to the scene.
    pub fn map_to_scene(&self, pt: Point) -> Point {
        let scrolled = pt + self.scroll();
        if self.transform == Affine::IDENTITY {
            return scrolled;
        }
        self.transform.inverse() * scrolled
    }

    /// Map a scene point to the view.
    pub fn map_from_scene(&self, pt: Point) -> Point {
        if self.transform == Affine::IDENTITY {
            return pt - self.scroll();
        }
        self.viewport_transform() * pt
    }

    /// Map a view rect to a scene polygon, clockwise from the top-left corner.
    pub fn map_rect_to_scene(&self, rect: Rect) -> [Point; 4] {
        if is_translate_only(&self.transform) {
            let r = rect + self.scroll() - self.transform.translation();
            return map_rect_to_polygon(Affine::IDENTITY, r);
        }
        map_rect_to_polygon(self.viewport_transform().inverse(), rect)
    }

    /// Map a scene rect to a view polygon, clockwise from the top-left corner.
    pub fn map_rect_from_scene(&self, rect: Rect) -> [Point; 4] {
        if is_translate_only(&self.transform) {
            let r = rect + self.transform.translation() - self.scroll();
            return map_rect_to_polygon(Affine::IDENTITY, r);
        }
        map_rect_to_polygon(self.viewport_transform(), rect)
    }

    /// Map a view polygon to the scene.
    pub fn map_polygon_to_scene(&self, polygon: &[Point]) -> Vec<Point> {
        polygon.iter().map(|p| self.map_to_scene(*p)).collect()
    }

    /// Map a scene polygon to the view.
    pub fn map_polygon_from_scene(&self, polygon: &[Point]) -> Vec<Point> {
        polygon.iter().map(|p| self.map_from_scene(*p)).collect()
    }

    /// Map a view path to the scene.
    pub fn map_path_to_scene(&self, path: &BezPath) -> BezPath {
        map_path(self.viewport_transform().inverse(), path)
    }

    /// Map a scene path to the view.
    pub fn map_path_from_scene(&self, path: &BezPath) -> BezPath {
        map_path(self.viewport_transform(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViewId;
    use crate::view::ViewOptions;
    use kurbo::{Shape, Size};

    fn view(scene_rect: Rect) -> View {
        View::new(
            ViewId(0, 1),
            ViewOptions::default(),
            Size::new(100.0, 100.0),
            scene_rect,
        )
    }

    #[test]
    fn fitting_scene_is_centred_by_the_indent() {
        let v = view(Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(v.scroll(), Vec2::new(-25.0, -25.0), "centred in the viewport");
        assert_eq!(
            v.map_from_scene(Point::new(0.0, 0.0)),
            Point::new(25.0, 25.0),
            "scene origin lands at the indent"
        );
        assert_eq!(
            v.map_to_scene(Point::new(25.0, 25.0)),
            Point::ZERO,
            "and maps back"
        );
    }

    #[test]
    fn rect_maps_to_polygon_both_ways() {
        let v = view(Rect::new(0.0, 0.0, 100.0, 100.0));
        let poly = v.map_rect_from_scene(Rect::new(10.0, 10.0, 20.0, 30.0));
        assert_eq!(poly[0], Point::new(10.0, 10.0), "top-left");
        assert_eq!(poly[2], Point::new(20.0, 30.0), "bottom-right");
        let back = v.map_rect_to_scene(Rect::new(10.0, 10.0, 20.0, 30.0));
        assert_eq!(back, poly, "identity view is symmetric");
    }

    #[test]
    fn paths_follow_the_viewport_transform() {
        let v = view(Rect::new(0.0, 0.0, 50.0, 50.0));
        let path = Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1);
        let mapped = v.map_path_from_scene(&path);
        assert_eq!(
            mapped.bounding_box(),
            Rect::new(25.0, 25.0, 35.0, 35.0),
            "path moved by the indent"
        );
        let back = v.map_path_to_scene(&mapped);
        assert_eq!(back.bounding_box(), path.bounding_box(), "round trip");
    }

    #[test]
    fn polygons_map_point_by_point() {
        let v = view(Rect::new(0.0, 0.0, 50.0, 50.0));
        let poly = [Point::new(25.0, 25.0), Point::new(35.0, 25.0)];
        assert_eq!(
            v.map_polygon_to_scene(&poly),
            [Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            "each vertex mapped"
        );
    }
}
