// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry helpers: rect adjustment, path flattening, and polygon-based path
//! intersection, containment and clipping.
//!
//! Paths are flattened into polygons with [`TOLERANCE`] before any boolean
//! test. Intersection of two paths uses Sutherland-Hodgman clipping against a
//! convex operand, which is exact whenever at least one side of every pair of
//! sub-polygons is convex. When both sides are concave, the clipper is replaced
//! by its convex hull, which over-approximates the result.

use alloc::vec::Vec;
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape, Vec2};

/// Flattening tolerance used for shapes, clip paths and collision tests.
pub const TOLERANCE: f64 = 0.1;

/// Amount added around degenerate rects before intersection tests.
pub const EPSILON: f64 = 1e-5;

/// Widen zero-width or zero-height rects by [`EPSILON`] on each side so
/// intersection tests against them still succeed.
pub fn adjust_rect(r: Rect) -> Rect {
    let mut r = r.abs();
    if r.width() == 0.0 {
        r.x0 -= EPSILON;
        r.x1 += EPSILON;
    }
    if r.height() == 0.0 {
        r.y0 -= EPSILON;
        r.y1 += EPSILON;
    }
    r
}

/// Strict rect overlap (touching edges do not count).
#[inline]
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// True when `outer` contains `inner`, edges inclusive.
#[inline]
pub fn rect_contains_rect(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.x1 <= outer.x1 && inner.y0 >= outer.y0 && inner.y1 <= outer.y1
}

/// Union that treats zero-area rects as absent.
pub fn unite(a: Rect, b: Rect) -> Rect {
    if b.width() == 0.0 && b.height() == 0.0 {
        return a;
    }
    if a.width() == 0.0 && a.height() == 0.0 {
        return b;
    }
    a.union(b)
}

/// True when the affine only translates.
#[inline]
pub fn is_translate_only(a: &Affine) -> bool {
    let c = a.as_coeffs();
    c[0] == 1.0 && c[1] == 0.0 && c[2] == 0.0 && c[3] == 1.0
}

/// Closed path through `pts`.
pub fn polygon_path(pts: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let mut it = pts.iter();
    if let Some(first) = it.next() {
        path.move_to(*first);
        for p in it {
            path.line_to(*p);
        }
        path.close_path();
    }
    path
}

/// The four corners of `rect` mapped through `a`, clockwise from the top-left.
pub fn map_rect_to_polygon(a: Affine, rect: Rect) -> [Point; 4] {
    [
        a * Point::new(rect.x0, rect.y0),
        a * Point::new(rect.x1, rect.y0),
        a * Point::new(rect.x1, rect.y1),
        a * Point::new(rect.x0, rect.y1),
    ]
}

/// Map a path through an affine.
pub fn map_path(a: Affine, path: &BezPath) -> BezPath {
    let mut out = path.clone();
    out.apply_affine(a);
    out
}

/// A path is empty when it has no drawing segment.
pub fn path_is_empty(path: &BezPath) -> bool {
    !path
        .elements()
        .iter()
        .any(|el| !matches!(el, PathEl::MoveTo(_) | PathEl::ClosePath))
}

/// If `path` is a single closed axis-aligned rectangle, return it.
pub fn path_as_rect(path: &BezPath) -> Option<Rect> {
    let els = path.elements();
    let mut pts: Vec<Point> = Vec::with_capacity(5);
    for (i, el) in els.iter().enumerate() {
        match *el {
            PathEl::MoveTo(p) if i == 0 => pts.push(p),
            PathEl::LineTo(p) if i > 0 => pts.push(p),
            PathEl::ClosePath if i == els.len() - 1 => {}
            _ => return None,
        }
    }
    if pts.len() == 5 && pts[4] == pts[0] {
        pts.pop();
    }
    if pts.len() != 4 {
        return None;
    }
    for i in 0..4 {
        let a = pts[i];
        let b = pts[(i + 1) % 4];
        if a.x != b.x && a.y != b.y {
            return None;
        }
    }
    let bbox = path.bounding_box();
    let corners_on_bbox = pts
        .iter()
        .all(|p| (p.x == bbox.x0 || p.x == bbox.x1) && (p.y == bbox.y0 || p.y == bbox.y1));
    corners_on_bbox.then_some(bbox)
}

/// Flatten a path into closed polygons (one per sub-path).
pub fn flatten_polygons(path: &BezPath) -> Vec<Vec<Point>> {
    let mut polys: Vec<Vec<Point>> = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    kurbo::flatten(path.iter(), TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => {
            if current.len() >= 2 {
                polys.push(core::mem::take(&mut current));
            }
            current.clear();
            current.push(p);
        }
        PathEl::LineTo(p) => {
            if current.last() != Some(&p) {
                current.push(p);
            }
        }
        PathEl::ClosePath => {
            if current.len() >= 2 {
                let start = current[0];
                polys.push(core::mem::take(&mut current));
                current.push(start);
            }
        }
        // Flattening only emits lines.
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });
    if current.len() >= 2 {
        polys.push(current);
    }
    for poly in &mut polys {
        if poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
    }
    polys
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a - o).cross(b - o)
}

fn signed_area(poly: &[Point]) -> f64 {
    let n = poly.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = poly[i].to_vec2();
        let b = poly[(i + 1) % n].to_vec2();
        sum += a.cross(b);
    }
    sum * 0.5
}

/// True when the polygon is convex (collinear runs allowed).
pub fn is_convex(poly: &[Point]) -> bool {
    let n = poly.len();
    if n < 4 {
        return n == 3;
    }
    let mut sign = 0.0_f64;
    for i in 0..n {
        let c = cross(poly[i], poly[(i + 1) % n], poly[(i + 2) % n]);
        if c != 0.0 {
            if sign == 0.0 {
                sign = c;
            } else if (sign > 0.0) != (c > 0.0) {
                return false;
            }
        }
    }
    true
}

/// Winding number of `poly` around `pt`.
fn winding(poly: &[Point], pt: Point) -> i32 {
    let n = poly.len();
    let mut w = 0;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        if a.y <= pt.y {
            if b.y > pt.y && cross(a, b, pt) > 0.0 {
                w += 1;
            }
        } else if b.y <= pt.y && cross(a, b, pt) < 0.0 {
            w -= 1;
        }
    }
    w
}

fn polygons_contain(polys: &[Vec<Point>], pt: Point) -> bool {
    polys.iter().map(|p| winding(p, pt)).sum::<i32>() != 0
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_cross(a0: Point, a1: Point, b0: Point, b1: Point) -> bool {
    let d1 = cross(b0, b1, a0);
    let d2 = cross(b0, b1, a1);
    let d3 = cross(a0, a1, b0);
    let d4 = cross(a0, a1, b1);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(b0, b1, a0))
        || (d2 == 0.0 && on_segment(b0, b1, a1))
        || (d3 == 0.0 && on_segment(a0, a1, b0))
        || (d4 == 0.0 && on_segment(a0, a1, b1))
}

fn edges_cross(a: &[Vec<Point>], b: &[Vec<Point>]) -> bool {
    for pa in a {
        for i in 0..pa.len() {
            let (a0, a1) = (pa[i], pa[(i + 1) % pa.len()]);
            for pb in b {
                for j in 0..pb.len() {
                    if segments_cross(a0, a1, pb[j], pb[(j + 1) % pb.len()]) {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// True when the filled areas of `a` and `b` overlap.
pub fn paths_intersect(a: &BezPath, b: &BezPath) -> bool {
    if path_is_empty(a) || path_is_empty(b) {
        return false;
    }
    if let (Some(ra), Some(rb)) = (path_as_rect(a), path_as_rect(b)) {
        return rects_intersect(adjust_rect(ra), adjust_rect(rb));
    }
    if !rects_intersect(adjust_rect(a.bounding_box()), adjust_rect(b.bounding_box())) {
        return false;
    }
    let pa = flatten_polygons(a);
    let pb = flatten_polygons(b);
    if edges_cross(&pa, &pb) {
        return true;
    }
    pa.iter()
        .filter_map(|p| p.first())
        .any(|pt| polygons_contain(&pb, *pt))
        || pb
            .iter()
            .filter_map(|p| p.first())
            .any(|pt| polygons_contain(&pa, *pt))
}

/// True when the filled area of `outer` contains all of `inner`.
pub fn path_contains_path(outer: &BezPath, inner: &BezPath) -> bool {
    if path_is_empty(outer) || path_is_empty(inner) {
        return false;
    }
    if let (Some(ro), Some(ri)) = (path_as_rect(outer), path_as_rect(inner)) {
        return rect_contains_rect(ro, ri);
    }
    if !rect_contains_rect(outer.bounding_box(), inner.bounding_box()) {
        return false;
    }
    let po = flatten_polygons(outer);
    let pi = flatten_polygons(inner);
    let all_inside = pi.iter().flatten().all(|pt| {
        polygons_contain(&po, *pt) || po.iter().any(|poly| point_on_boundary(poly, *pt))
    });
    if !all_inside {
        return false;
    }
    // A concave outer can still be exited between two inside vertices; test
    // edge midpoints as well.
    pi.iter().all(|poly| {
        (0..poly.len()).all(|i| {
            let mid = poly[i].midpoint(poly[(i + 1) % poly.len()]);
            polygons_contain(&po, mid) || po.iter().any(|p| point_on_boundary(p, mid))
        })
    })
}

fn point_on_boundary(poly: &[Point], pt: Point) -> bool {
    (0..poly.len()).any(|i| {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        cross(a, b, pt).abs() <= EPSILON && on_segment(a, b, pt)
    })
}

/// Convex hull of a point set (monotone chain), counter-clockwise in y-down space.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }
    let mut hull: Vec<Point> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

fn line_intersection(p0: Point, p1: Point, c0: Point, c1: Point) -> Point {
    let d = p1 - p0;
    let e = c1 - c0;
    let denom = d.cross(e);
    if denom == 0.0 {
        return p1;
    }
    let t = (c0 - p0).cross(e) / denom;
    p0 + d * t
}

/// Clip `subject` against the convex polygon `clipper` (Sutherland-Hodgman).
pub fn clip_polygon(subject: &[Point], clipper: &[Point]) -> Vec<Point> {
    let orientation = if signed_area(clipper) >= 0.0 { 1.0 } else { -1.0 };
    let mut output: Vec<Point> = subject.to_vec();
    let n = clipper.len();
    for i in 0..n {
        if output.is_empty() {
            break;
        }
        let c0 = clipper[i];
        let c1 = clipper[(i + 1) % n];
        let inside = |p: Point| orientation * cross(c0, c1, p) >= 0.0;
        let input = core::mem::take(&mut output);
        let mut prev = input[input.len() - 1];
        for &cur in &input {
            match (inside(cur), inside(prev)) {
                (true, true) => output.push(cur),
                (true, false) => {
                    output.push(line_intersection(prev, cur, c0, c1));
                    output.push(cur);
                }
                (false, true) => output.push(line_intersection(prev, cur, c0, c1)),
                (false, false) => {}
            }
            prev = cur;
        }
    }
    output
}

/// Split a simple polygon into triangles by ear clipping.
///
/// Collinear vertices are dropped. A self-intersecting remainder has no ears
/// and is replaced by its convex hull.
pub fn triangulate(poly: &[Point]) -> Vec<[Point; 3]> {
    let orientation = if signed_area(poly) >= 0.0 { 1.0 } else { -1.0 };
    let mut pts: Vec<Point> = poly.to_vec();
    let mut out = Vec::new();
    while pts.len() > 3 {
        let n = pts.len();
        let mut ear = None;
        for i in 0..n {
            let (prev, next) = ((i + n - 1) % n, (i + 1) % n);
            let (a, b, c) = (pts[prev], pts[i], pts[next]);
            let turn = orientation * cross(a, b, c);
            if turn == 0.0 {
                ear = Some((i, None));
                break;
            }
            if turn < 0.0 {
                continue;
            }
            let blocked = pts.iter().enumerate().any(|(j, &p)| {
                j != prev
                    && j != i
                    && j != next
                    && orientation * cross(a, b, p) >= 0.0
                    && orientation * cross(b, c, p) >= 0.0
                    && orientation * cross(c, a, p) >= 0.0
            });
            if !blocked {
                ear = Some((i, Some([a, b, c])));
                break;
            }
        }
        match ear {
            Some((i, tri)) => {
                out.extend(tri);
                pts.remove(i);
            }
            None => {
                let hull = convex_hull(&pts);
                for k in 1..hull.len().saturating_sub(1) {
                    out.push([hull[0], hull[k], hull[k + 1]]);
                }
                return out;
            }
        }
    }
    if pts.len() == 3 && cross(pts[0], pts[1], pts[2]) != 0.0 {
        out.push([pts[0], pts[1], pts[2]]);
    }
    out
}

fn push_polygon(out: &mut BezPath, poly: &[Point]) {
    if poly.len() >= 3 && signed_area(poly).abs() > 0.0 {
        out.extend(polygon_path(poly).elements().iter().copied());
    }
}

/// Intersection of the filled areas of two paths.
///
/// When neither side is convex the second one is triangulated and the first
/// is clipped against each triangle, so the result may be several disjoint
/// sub-paths.
pub fn intersect_paths(a: &BezPath, b: &BezPath) -> BezPath {
    if path_is_empty(a) || path_is_empty(b) {
        return BezPath::new();
    }
    if let (Some(ra), Some(rb)) = (path_as_rect(a), path_as_rect(b)) {
        let r = ra.intersect(rb);
        if r.width() <= 0.0 || r.height() <= 0.0 {
            return BezPath::new();
        }
        return r.to_path(TOLERANCE);
    }
    let pa = flatten_polygons(a);
    let pb = flatten_polygons(b);
    let mut out = BezPath::new();
    for sa in &pa {
        for sb in &pb {
            if is_convex(sb) {
                push_polygon(&mut out, &clip_polygon(sa, sb));
            } else if is_convex(sa) {
                push_polygon(&mut out, &clip_polygon(sb, sa));
            } else {
                for tri in triangulate(sb) {
                    push_polygon(&mut out, &clip_polygon(sa, &tri));
                }
            }
        }
    }
    out
}

/// Mid-point helper for rect centers, avoiding `Rect::center` on degenerate input.
#[inline]
pub fn rect_center(r: Rect) -> Point {
    Point::new((r.x0 + r.x1) * 0.5, (r.y0 + r.y1) * 0.5)
}

/// Manhattan length of a vector, used for drag-distance thresholds.
#[inline]
pub fn manhattan_length(v: Vec2) -> f64 {
    v.x.abs() + v.y.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Circle;

    #[test]
    fn adjust_rect_widens_degenerate_axes() {
        let r = adjust_rect(Rect::new(5.0, 1.0, 5.0, 3.0));
        assert!(r.width() > 0.0, "zero width is widened");
        assert_eq!(r.height(), 2.0, "non-degenerate axis untouched");
    }

    #[test]
    fn rect_paths_are_recognized() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(path_as_rect(&r.to_path(TOLERANCE)), Some(r), "rect path");
        let tri = polygon_path(&[
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ]);
        assert_eq!(path_as_rect(&tri), None, "triangle is not a rect");
    }

    #[test]
    fn circle_against_rects() {
        let circle = Circle::new((0.0, 0.0), 10.0).to_path(TOLERANCE);
        let near = Rect::new(5.0, 5.0, 20.0, 20.0).to_path(TOLERANCE);
        let corner = Rect::new(8.0, 8.0, 20.0, 20.0).to_path(TOLERANCE);
        assert!(paths_intersect(&circle, &near), "overlaps the circle");
        assert!(
            !paths_intersect(&circle, &corner),
            "corner region lies outside the circle even though the bboxes overlap"
        );
        let inner = Rect::new(-2.0, -2.0, 2.0, 2.0).to_path(TOLERANCE);
        assert!(path_contains_path(&circle, &inner), "small square inside");
        assert!(!path_contains_path(&inner, &circle), "not the other way");
    }

    #[test]
    fn clipping_with_concave_subject_is_exact() {
        // An L shape clipped by a square that covers its corner.
        let l = polygon_path(&[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 2.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        let square = Rect::new(0.0, 0.0, 4.0, 4.0).to_path(TOLERANCE);
        let clipped = intersect_paths(&l, &square);
        assert!(clipped.contains(Point::new(1.0, 1.0)), "corner kept");
        assert!(clipped.contains(Point::new(3.0, 1.0)), "arm kept");
        assert!(!clipped.contains(Point::new(3.0, 3.0)), "notch stays empty");
        assert!(!clipped.contains(Point::new(6.0, 1.0)), "outside the square");
    }

    #[test]
    fn clipping_two_concave_shapes_is_exact() {
        // Two L shapes missing opposite corners overlap in two separate squares.
        let a = polygon_path(&[
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(10.0, 5.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        let b = polygon_path(&[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(5.0, 10.0),
            Point::new(5.0, 5.0),
            Point::new(0.0, 5.0),
        ]);
        let clipped = intersect_paths(&a, &b);
        assert!(clipped.contains(Point::new(2.5, 2.5)), "top left kept");
        assert!(clipped.contains(Point::new(7.5, 7.5)), "bottom right kept");
        assert!(!clipped.contains(Point::new(2.5, 7.5)), "only in the first");
        assert!(!clipped.contains(Point::new(7.5, 2.5)), "only in the second");
        assert!((clipped.area().abs() - 50.0).abs() < 1e-9, "two 5x5 squares");
    }

    #[test]
    fn triangles_cover_a_concave_polygon() {
        let l = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 2.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let tris = triangulate(&l);
        assert_eq!(tris.len(), 4, "n - 2 triangles");
        let area: f64 = tris.iter().map(|t| signed_area(t).abs()).sum();
        assert!((area - 36.0).abs() < 1e-9, "same area as the L: {area}");
    }

    #[test]
    fn empty_paths_never_collide() {
        let empty = BezPath::new();
        let r = Rect::new(0.0, 0.0, 1.0, 1.0).to_path(TOLERANCE);
        assert!(!paths_intersect(&empty, &r), "empty vs rect");
        assert!(!path_contains_path(&r, &empty), "rect contains empty");
        assert!(path_is_empty(&intersect_paths(&empty, &r)), "intersection");
    }

    #[test]
    fn hull_of_square_with_interior_point() {
        let hull = convex_hull(&[
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ]);
        assert_eq!(hull.len(), 4, "interior point dropped: {hull:?}");
        assert!(is_convex(&hull), "hull is convex");
    }
}
