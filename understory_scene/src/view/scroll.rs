// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scroll model and view transform changes.
//!
//! Scroll values behave like integer scroll bars whose ranges cover the scene
//! rect mapped through the view transform. A mapped scene that fits inside
//! the viewport gets an empty range and is placed with an indent according to
//! the view's [`Alignment`](super::Alignment).

use kurbo::{Affine, Point, Rect, Size, Vec2};

use super::{
    AspectRatioMode, CacheMode, HorizontalAlignment, UpdateMode, VerticalAlignment, View,
    ViewMut, ViewportAnchor, trunc_to_int,
};
use crate::geometry::rect_center;
use crate::scene::Scene;
use crate::types::ItemId;

/// Margin in pixels [`ViewMut::fit_in_view`] leaves around the fitted rect.
const FIT_MARGIN: f64 = 2.0;

/// Round half away from zero, as integer scroll ranges are formed.
fn round_bound(v: f64) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    if v >= 0.0 {
        trunc_to_int(v + 0.5)
    } else {
        trunc_to_int(v - 0.5)
    }
}

impl View {
    /// Scroll ranges as a rect: `x0..x1` horizontal, `y0..y1` vertical.
    pub fn scroll_range(&self) -> Rect {
        Rect::new(self.hbar.min, self.vbar.min, self.hbar.max, self.vbar.max)
    }

    /// Current scroll bar values.
    pub fn scroll_value(&self) -> Point {
        Point::new(self.hbar.value, self.vbar.value)
    }

    /// Recompute scroll ranges and indents from the scene rect, transform and viewport.
    pub(crate) fn recalculate_content_size(&mut self) {
        let (width, height) = (self.viewport.width, self.viewport.height);
        let view_rect = self.transform.transform_rect_bbox(self.scene_rect);
        let old_indent = self.indent;
        let saved_center = self.last_center_point;
        let old_scroll = self.scroll();

        let left = round_bound(view_rect.x0);
        let right = round_bound(view_rect.x1 - width);
        if left >= right {
            self.hbar.min = 0.0;
            self.hbar.max = 0.0;
            self.indent.x = match self.options.alignment.horizontal {
                HorizontalAlignment::Left => -view_rect.x0,
                HorizontalAlignment::Right => width - view_rect.width() - view_rect.x0 - 1.0,
                HorizontalAlignment::Center => width / 2.0 - (view_rect.x0 + view_rect.x1) / 2.0,
            };
        } else {
            self.hbar.min = left;
            self.hbar.max = right;
            if old_indent.x != 0.0 {
                self.hbar.value = -old_indent.x;
            }
            self.indent.x = 0.0;
        }

        let top = round_bound(view_rect.y0);
        let bottom = round_bound(view_rect.y1 - height);
        if top >= bottom {
            self.vbar.min = 0.0;
            self.vbar.max = 0.0;
            self.indent.y = match self.options.alignment.vertical {
                VerticalAlignment::Top => -view_rect.y0,
                VerticalAlignment::Bottom => height - view_rect.height() - view_rect.y0 - 1.0,
                VerticalAlignment::Center => height / 2.0 - (view_rect.y0 + view_rect.y1) / 2.0,
            };
        } else {
            self.vbar.min = top;
            self.vbar.max = bottom;
            if old_indent.y != 0.0 {
                self.vbar.value = -old_indent.y;
            }
            self.indent.y = 0.0;
        }

        self.hbar.value = self.hbar.clamp(self.hbar.value);
        self.vbar.value = self.vbar.clamp(self.vbar.value);
        let new_scroll = self.scroll();
        if new_scroll != old_scroll {
            self.scroll_contents_by(old_scroll - new_scroll);
        }
        self.last_center_point = saved_center;

        if old_indent != self.indent {
            log::trace!("view {:?}: indent now {:?}", self.id, self.indent);
            self.update_all();
        }
        if self.options.cache_mode.contains(CacheMode::BACKGROUND) {
            self.background_exposed = true;
        }
    }

    /// Set both scroll bar values, clamped to their ranges.
    pub(crate) fn set_scroll_values(&mut self, x: f64, y: f64) {
        let old = self.scroll();
        self.hbar.value = self.hbar.clamp(x);
        self.vbar.value = self.vbar.clamp(y);
        let new = self.scroll();
        if old != new {
            self.scroll_contents_by(old - new);
        }
    }

    /// The contents moved by `delta` view pixels.
    fn scroll_contents_by(&mut self, delta: Vec2) {
        if self.options.update_mode != UpdateMode::None {
            self.dirty_scroll_offset += delta;
            self.dirty_region.translate(delta);
            self.update_all();
        }
        self.update_last_center_point();
        if self.options.cache_mode.contains(CacheMode::BACKGROUND) {
            self.background_exposed = true;
        }
    }

    /// Remember the scene point at the viewport centre.
    pub(crate) fn update_last_center_point(&mut self) {
        self.last_center_point = self.map_to_scene(rect_center(self.viewport_rect()));
    }

    /// Scroll so that the scene point `pos` sits at the viewport centre, as
    /// far as the scroll ranges allow. Axes placed by an indent do not move.
    pub(crate) fn center_on(&mut self, pos: Point) {
        let view_point = self.transform * pos;
        let x = if self.indent.x == 0.0 {
            view_point.x - self.viewport.width / 2.0
        } else {
            self.hbar.value
        };
        let y = if self.indent.y == 0.0 {
            view_point.y - self.viewport.height / 2.0
        } else {
            self.vbar.value
        };
        self.set_scroll_values(x, y);
        self.last_center_point = pos;
    }

    /// Restore the anchored scene point after a transform change or resize.
    pub(crate) fn center_view(&mut self, anchor: ViewportAnchor) {
        match anchor {
            ViewportAnchor::UnderMouse if self.mouse.under_mouse => {
                let Some(mouse) = self.mouse.last.as_ref().map(|l| l.event.pos) else {
                    self.center_on(self.last_center_point);
                    return;
                };
                let center = rect_center(self.viewport_rect());
                let diff = self.map_to_scene(center) - self.map_to_scene(mouse);
                self.center_on(self.mouse.last_move_scene_point + diff);
            }
            ViewportAnchor::UnderMouse | ViewportAnchor::ViewCenter => {
                self.center_on(self.last_center_point);
            }
            ViewportAnchor::NoAnchor => {}
        }
    }

    /// Scroll the least amount that brings the scene rect `rect`, plus margins, into view.
    pub(crate) fn ensure_visible(&mut self, rect: Rect, x_margin: f64, y_margin: f64) {
        let (width, height) = (self.viewport.width, self.viewport.height);
        let view_rect = self.transform.transform_rect_bbox(rect);
        let scroll = self.scroll();
        let (left, top) = (scroll.x, scroll.y);
        let (right, bottom) = (left + width, top + height);
        let (mut x, mut y) = (self.hbar.value, self.vbar.value);

        if self.indent.x == 0.0 {
            if view_rect.x0 <= left + x_margin {
                x = view_rect.x0 - x_margin - 0.5;
            }
            if view_rect.x1 >= right - x_margin {
                x = view_rect.x1 - width + x_margin + 0.5;
            }
        }
        if self.indent.y == 0.0 {
            if view_rect.y0 <= top + y_margin {
                y = view_rect.y0 - y_margin - 0.5;
            }
            if view_rect.y1 >= bottom - y_margin {
                y = view_rect.y1 - height + y_margin + 0.5;
            }
        }
        self.set_scroll_values(x, y);
    }

    /// Replace the view transform. Returns `false` if it did not change.
    fn apply_transform(&mut self, transform: Affine) -> bool {
        if transform == self.transform {
            return false;
        }
        self.transform = transform;
        self.recalculate_content_size();
        self.center_view(self.options.transformation_anchor);
        self.update_all();
        true
    }
}

impl ViewMut<'_> {
    /// Replace the view transform, or with `combine` apply `transform` before
    /// the current one. The transformation anchor is kept in place and the
    /// last mouse move is replayed.
    pub fn set_transform(&mut self, transform: Affine, combine: bool) {
        let Some(v) = self.state() else {
            return;
        };
        let t = if combine { v.transform * transform } else { transform };
        if v.apply_transform(t) {
            self.replay_last_mouse_event();
        }
    }

    /// Reset the view transform to identity.
    pub fn reset_transform(&mut self) {
        self.set_transform(Affine::IDENTITY, false);
    }

    /// Rotate the view by `degrees`, clockwise on screen.
    pub fn rotate(&mut self, degrees: f64) {
        self.set_transform(
            Affine::rotate(degrees * (core::f64::consts::PI / 180.0)),
            true,
        );
    }

    /// Scale the view.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.set_transform(Affine::scale_non_uniform(sx, sy), true);
    }

    /// Shear the view.
    pub fn shear(&mut self, sh: f64, sv: f64) {
        self.set_transform(Affine::skew(sh, sv), true);
    }

    /// Translate the view transform. With a view-centre anchor the scroll model
    /// re-centres afterwards, cancelling the visible effect.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.set_transform(Affine::translate((dx, dy)), true);
    }

    /// Scroll so that `pos` (scene coordinates) is centred.
    pub fn center_on(&mut self, pos: Point) {
        let Some(v) = self.state() else {
            return;
        };
        let old = v.scroll();
        v.center_on(pos);
        if v.scroll() != old {
            self.replay_last_mouse_event();
        }
    }

    /// Centre on an item's scene bounding rect.
    pub fn center_on_item(&mut self, id: ItemId) {
        if let Some(r) = self.scene.scene_bounding_rect(id) {
            self.center_on(rect_center(r));
        }
    }

    /// Scroll so that the scene rect `rect` is visible with the given margins.
    pub fn ensure_visible(&mut self, rect: Rect, x_margin: f64, y_margin: f64) {
        let Some(v) = self.state() else {
            return;
        };
        let old = v.scroll();
        v.ensure_visible(rect, x_margin, y_margin);
        if v.scroll() != old {
            self.replay_last_mouse_event();
        }
    }

    /// Scroll so that an item's scene bounding rect is visible.
    pub fn ensure_item_visible(&mut self, id: ItemId, x_margin: f64, y_margin: f64) {
        if let Some(r) = self.scene.scene_bounding_rect(id) {
            self.ensure_visible(r, x_margin, y_margin);
        }
    }

    /// Scale and scroll so that the scene rect `rect` fills the viewport.
    pub fn fit_in_view(&mut self, rect: Rect, mode: AspectRatioMode) {
        let Some(v) = self.view() else {
            return;
        };
        if rect.width() == 0.0 && rect.height() == 0.0 {
            return;
        }
        let unity = v
            .transform
            .transform_rect_bbox(Rect::new(0.0, 0.0, 1.0, 1.0));
        if unity.width() <= 0.0 || unity.height() <= 0.0 {
            return;
        }
        self.scale(1.0 / unity.width(), 1.0 / unity.height());

        let Some(v) = self.view() else {
            return;
        };
        let view_rect = v.viewport_rect().inset(-FIT_MARGIN);
        if view_rect.width() <= 0.0 || view_rect.height() <= 0.0 {
            return;
        }
        let scene_rect = v.transform.transform_rect_bbox(rect);
        if scene_rect.width() <= 0.0 || scene_rect.height() <= 0.0 {
            return;
        }
        let mut xratio = view_rect.width() / scene_rect.width();
        let mut yratio = view_rect.height() / scene_rect.height();
        match mode {
            AspectRatioMode::KeepAspectRatio => {
                xratio = xratio.min(yratio);
                yratio = xratio;
            }
            AspectRatioMode::KeepAspectRatioByExpanding => {
                xratio = xratio.max(yratio);
                yratio = xratio;
            }
            AspectRatioMode::IgnoreAspectRatio => {}
        }
        self.scale(xratio, yratio);
        self.center_on(rect_center(rect));
    }

    /// Fit an item's scene bounding rect into the viewport.
    pub fn fit_item_in_view(&mut self, id: ItemId, mode: AspectRatioMode) {
        if let Some(r) = self.scene.scene_bounding_rect(id) {
            self.fit_in_view(r, mode);
        }
    }

    /// Give the view its own scene rect, or follow the scene's again with `None`.
    pub fn set_scene_rect(&mut self, rect: Option<Rect>) {
        let scene_rect = match rect {
            Some(r) => r,
            None => self.scene.scene_rect(),
        };
        let Some(v) = self.state() else {
            return;
        };
        v.explicit_scene_rect = rect;
        v.scene_rect = scene_rect;
        v.recalculate_content_size();
    }

    /// Set the scroll bar values directly.
    pub fn set_scroll_value(&mut self, value: Point) {
        let Some(v) = self.state() else {
            return;
        };
        let old = v.scroll();
        v.set_scroll_values(value.x, value.y);
        if v.scroll() != old {
            self.replay_last_mouse_event();
        }
    }

    /// Scroll by `delta` view pixels.
    pub fn scroll_by(&mut self, delta: Vec2) {
        if let Some(v) = self.view() {
            let target = v.scroll_value() + delta;
            self.set_scroll_value(target);
        }
    }

    /// The host resized the viewport. The resize anchor is kept in place.
    pub fn resize(&mut self, size: Size) {
        let Some(v) = self.state() else {
            return;
        };
        if v.viewport == size {
            return;
        }
        log::debug!("view {:?}: resized to {size:?}", v.id);
        let old_center = v.last_center_point;
        v.viewport = size;
        v.recalculate_content_size();
        if v.options.resize_anchor == ViewportAnchor::NoAnchor {
            v.update_last_center_point();
        } else {
            v.last_center_point = old_center;
        }
        v.center_view(v.options.resize_anchor);
        v.background_exposed = true;
        v.update_all();
    }
}

impl Scene {
    /// Scroll every view so that `rect` in `id`'s local coordinates (its
    /// bounding rect with `None`) is visible with the given margins.
    pub fn ensure_visible(&mut self, id: ItemId, rect: Option<Rect>, x_margin: f64, y_margin: f64) {
        let Some(local) = rect.or_else(|| self.bounding_rect(id)) else {
            return;
        };
        let Some(scene_rect) = self.map_rect_to_scene(id, local) else {
            return;
        };
        for view in self.views() {
            if let Some(mut v) = self.view_mut(view) {
                v.ensure_visible(scene_rect, x_margin, y_margin);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViewId;
    use crate::view::{Alignment, ViewOptions};

    fn view(scene_rect: Rect, options: ViewOptions) -> View {
        View::new(ViewId(0, 1), options, Size::new(100.0, 100.0), scene_rect)
    }

    #[test]
    fn large_scene_gets_scroll_ranges() {
        let v = view(Rect::new(0.0, 0.0, 400.0, 300.0), ViewOptions::default());
        assert_eq!(
            v.scroll_range(),
            Rect::new(0.0, 0.0, 300.0, 200.0),
            "range is the mapped scene minus the viewport"
        );
        assert_eq!(
            v.scroll_value(),
            Point::new(150.0, 100.0),
            "new views centre the scene rect"
        );
    }

    #[test]
    fn small_scene_follows_alignment() {
        let options = ViewOptions {
            alignment: Alignment {
                horizontal: HorizontalAlignment::Left,
                vertical: VerticalAlignment::Bottom,
            },
            ..ViewOptions::default()
        };
        let v = view(Rect::new(0.0, 0.0, 40.0, 40.0), options);
        assert_eq!(v.scroll_range(), Rect::ZERO, "no scrolling");
        assert_eq!(
            v.map_from_scene(Point::ZERO),
            Point::new(0.0, 59.0),
            "flush left, flush bottom"
        );
    }

    #[test]
    fn center_on_clamps_to_the_range() {
        let mut v = view(Rect::new(0.0, 0.0, 400.0, 400.0), ViewOptions::default());
        v.center_on(Point::new(0.0, 0.0));
        assert_eq!(v.scroll_value(), Point::ZERO, "clamped at the start");
        v.center_on(Point::new(1000.0, 1000.0));
        assert_eq!(v.scroll_value(), Point::new(300.0, 300.0), "clamped at the end");
    }

    #[test]
    fn scrolling_requests_a_full_update() {
        let mut v = view(Rect::new(0.0, 0.0, 400.0, 400.0), ViewOptions::default());
        assert_eq!(v.pending_update(), None, "new views start clean");
        assert_eq!(
            v.dirty_scroll_offset,
            Vec2::ZERO,
            "centering a new view leaves no scroll offset behind"
        );
        v.set_scroll_values(10.0, 10.0);
        assert_eq!(
            v.pending_update(),
            Some(&super::super::PendingUpdate::Full),
            "scrolling repaints everything"
        );
        assert_eq!(
            v.dirty_scroll_offset,
            Vec2::new(140.0, 140.0),
            "painted rects shift with the contents"
        );
    }

    #[test]
    fn ensure_visible_scrolls_minimally() {
        let mut v = view(Rect::new(0.0, 0.0, 400.0, 400.0), ViewOptions::default());
        v.set_scroll_values(0.0, 0.0);
        v.ensure_visible(Rect::new(150.0, 10.0, 160.0, 20.0), 10.0, 10.0);
        assert_eq!(
            v.scroll_value(),
            Point::new(70.0, 0.0),
            "right edge plus margin reaches the viewport edge"
        );
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_bound(2.5), 3.0, "positive half");
        assert_eq!(round_bound(-2.5), -3.0, "negative half");
        assert_eq!(round_bound(2.4), 2.0, "below half");
    }
}
