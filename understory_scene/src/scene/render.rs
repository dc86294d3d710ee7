// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Painting the item tree into a [`Painter`].
//!
//! The walk starts at the top-level items in ascending stacking order and
//! recurses into children, painting children that stack behind their parent
//! before the parent itself. Every painted item's device bounding rect is
//! recorded in the view the render is for, so later repaints of a moved or
//! removed item can cover the area it was last drawn at.

use alloc::vec::Vec;

use kurbo::{Affine, Rect, Shape, Size};
use peniko::Fill;

use super::Scene;
use super::geometry::TRANSPARENT_OPACITY;
use crate::content::Paintable;
use crate::geometry::{rects_intersect, unite};
use crate::painter::{Painter, RenderHints, StyleOption, StyleState};
use crate::tasks::TaskQueue;
use crate::types::{ItemFlags, ItemId, ViewId};
use crate::view::{OptimizationFlags, PaintedRect};

/// Parameters of one render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    /// Scene-to-device transform.
    pub device_transform: Affine,
    /// Device-space area that needs painting. `None` paints everything.
    pub exposed: Option<Rect>,
    /// View whose painted-rect cache this pass refreshes.
    pub view: Option<ViewId>,
    /// Hints set on the painter before anything is drawn.
    pub render_hints: RenderHints,
    /// Skip the 2 px anti-aliasing margin around painted rects.
    pub dont_adjust_for_antialiasing: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            device_transform: Affine::IDENTITY,
            exposed: None,
            view: None,
            render_hints: RenderHints::default(),
            dont_adjust_for_antialiasing: false,
        }
    }
}

impl RenderOptions {
    /// Options for painting `view` through `viewport_transform`.
    pub(crate) fn for_view(
        view: ViewId,
        viewport_transform: Affine,
        flags: OptimizationFlags,
        render_hints: RenderHints,
        exposed: Option<Rect>,
    ) -> Self {
        Self {
            device_transform: viewport_transform,
            exposed,
            view: Some(view),
            render_hints,
            dont_adjust_for_antialiasing: flags
                .contains(OptimizationFlags::DONT_ADJUST_FOR_ANTIALIASING),
        }
    }
}

/// Everything the recursive walk needs besides the scene.
struct Pass<'a> {
    painter: &'a mut dyn Painter,
    options: &'a RenderOptions,
    painted: Vec<(ItemId, PaintedRect)>,
}

impl Scene {
    /// Paint every item intersecting `options.exposed`.
    ///
    /// Pending polish requests are delivered first. The painter's state is
    /// saved before and restored after the pass.
    pub fn render(&mut self, painter: &mut dyn Painter, options: &RenderOptions) {
        if self.tasks.contains(TaskQueue::POLISH) {
            self.tasks.remove(TaskQueue::POLISH);
            self.polish_items();
        }
        self.update_all = false;
        self.ensure_sorted(None);

        painter.save();
        painter.set_render_hints(options.render_hints);
        let mut pass = Pass {
            painter,
            options,
            painted: Vec::new(),
        };
        for id in self.top_level.ids.clone() {
            self.draw_subtree(&mut pass, id, 1.0);
        }
        pass.painter.restore();

        let painted = pass.painted;
        if let Some(view) = options.view.and_then(|v| self.view_state_mut(v)) {
            for (id, r) in painted {
                view.painted.insert(id, r);
            }
        }
    }

    /// Paint `source` (the whole scene rect by default) scaled into `target`,
    /// keeping the aspect ratio and centring the result.
    pub fn render_to_target(&mut self, painter: &mut dyn Painter, target: Rect, source: Option<Rect>) {
        let source = source.unwrap_or_else(|| self.scene_rect());
        if source.width() <= 0.0 || source.height() <= 0.0 {
            return;
        }
        let sx = target.width() / source.width();
        let sy = target.height() / source.height();
        let s = sx.min(sy);
        let fitted = Size::new(source.width() * s, source.height() * s);
        let offset = kurbo::Vec2::new(
            target.x0 + (target.width() - fitted.width) * 0.5,
            target.y0 + (target.height() - fitted.height) * 0.5,
        );
        let transform =
            Affine::translate(offset) * Affine::scale(s) * Affine::translate(-source.origin().to_vec2());

        painter.save();
        painter.clip_path(&target.to_path(crate::geometry::TOLERANCE));
        painter.set_transform(transform);
        self.draw_background(painter, source);
        let options = RenderOptions {
            device_transform: transform,
            exposed: Some(target),
            ..RenderOptions::default()
        };
        self.render(painter, &options);
        self.draw_foreground(painter, source);
        painter.restore();
    }

    /// Fill `rect` (scene coordinates, painter already in scene space) with the
    /// background brush, if any.
    pub fn draw_background(&self, painter: &mut dyn Painter, rect: Rect) {
        if let Some(brush) = &self.background {
            painter.fill_path(&rect.to_path(crate::geometry::TOLERANCE), brush, Fill::NonZero);
        }
    }

    /// Fill `rect` over the items with the foreground brush, if any.
    pub fn draw_foreground(&self, painter: &mut dyn Painter, rect: Rect) {
        if let Some(brush) = &self.foreground {
            painter.fill_path(&rect.to_path(crate::geometry::TOLERANCE), brush, Fill::NonZero);
        }
    }

    fn draw_subtree(&mut self, pass: &mut Pass<'_>, id: ItemId, parent_opacity: f64) {
        let Some(n) = self.node(id) else {
            return;
        };
        if !n.visible {
            return;
        }
        let has_contents = !n.flags.contains(ItemFlags::HAS_NO_CONTENTS);
        let has_children = !n.children.ids.is_empty();
        if !has_contents && !has_children {
            return;
        }
        let opacity = n.combine_opacity(parent_opacity);
        let transparent = opacity < TRANSPARENT_OPACITY;
        if transparent && (!has_children || self.children_combine_opacity(id)) {
            return;
        }
        let clips_children = has_children && n.flags.contains(ItemFlags::CLIPS_CHILDREN_TO_SHAPE);
        let clips_self = n.flags.contains(ItemFlags::CLIPS_TO_SHAPE);
        let propagated = if n.propagates_opacity() {
            opacity
        } else {
            parent_opacity
        };

        let device = match self.device_transform(id, pass.options.device_transform) {
            Some(t) => t,
            None => return,
        };

        let mut draw_item = has_contents && !transparent;
        if has_contents {
            let brect = self.bounding_rect(id).unwrap_or(Rect::ZERO);
            let adjust = if pass.options.dont_adjust_for_antialiasing {
                1.0
            } else {
                2.0
            };
            let view_rect = device.transform_rect_bbox(brect).expand().inflate(adjust, adjust);
            pass.painted.push((id, PaintedRect::At(view_rect)));
            if draw_item {
                draw_item = pass
                    .options
                    .exposed
                    .is_none_or(|e| rects_intersect(e, view_rect));
            }
            let min = self.options.minimum_render_size;
            if draw_item && min > 0.0 {
                let r = device.transform_rect_bbox(brect);
                if r.width() < min && r.height() < min {
                    draw_item = false;
                }
            }
            if !draw_item && (!has_children || clips_children) {
                return;
            }
        }

        let (behind, front) = if has_children {
            self.ensure_sorted(Some(id));
            let children = self.node(id).map(|n| n.children.ids.clone()).unwrap_or_default();
            let split = children
                .iter()
                .position(|c| {
                    !self
                        .flags(*c)
                        .is_some_and(|f| f.contains(ItemFlags::STACKS_BEHIND_PARENT))
                })
                .unwrap_or(children.len());
            let (b, f) = children.split_at(split);
            (b.to_vec(), f.to_vec())
        } else {
            (Vec::new(), Vec::new())
        };

        self.draw_children(pass, id, &behind, clips_children, device, transparent, propagated);
        if draw_item {
            self.draw_item(pass, id, device, clips_self, opacity);
        }
        self.draw_children(pass, id, &front, clips_children, device, transparent, propagated);
    }

    fn draw_children(
        &mut self,
        pass: &mut Pass<'_>,
        id: ItemId,
        children: &[ItemId],
        clip: bool,
        device: Affine,
        parent_transparent: bool,
        opacity: f64,
    ) {
        if children.is_empty() {
            return;
        }
        if clip {
            let shape = self.shape(id).unwrap_or_default();
            pass.painter.save();
            pass.painter.set_transform(device);
            pass.painter.clip_path(&shape);
        }
        for &c in children {
            let ignores_parent = self
                .flags(c)
                .is_some_and(|f| f.contains(ItemFlags::IGNORES_PARENT_OPACITY));
            if parent_transparent && !ignores_parent {
                continue;
            }
            self.draw_subtree(pass, c, opacity);
        }
        if clip {
            pass.painter.restore();
        }
    }

    fn draw_item(&self, pass: &mut Pass<'_>, id: ItemId, device: Affine, clip: bool, opacity: f64) {
        let Some(n) = self.node(id) else {
            return;
        };
        let rect = self.bounding_rect(id).unwrap_or(Rect::ZERO);
        let exposed_rect = match pass.options.exposed {
            Some(e) => device.inverse().transform_rect_bbox(e).intersect(rect),
            None => rect,
        };
        let mut state = StyleState::empty();
        if n.selected {
            state |= StyleState::SELECTED;
        }
        if n.enabled {
            state |= StyleState::ENABLED;
        }
        if self.has_focus(id) {
            state |= StyleState::HAS_FOCUS;
        }
        if self.hover_items.contains(&id) {
            state |= StyleState::MOUSE_OVER;
        }
        let x = device * kurbo::Point::new(1.0, 0.0) - device * kurbo::Point::ZERO;
        let y = device * kurbo::Point::new(0.0, 1.0) - device * kurbo::Point::ZERO;
        let option = StyleOption {
            state,
            rect,
            exposed_rect,
            level_of_detail: (x.length() + y.length()) * 0.5,
        };

        pass.painter.save();
        pass.painter.set_transform(device);
        if clip {
            pass.painter.clip_path(&self.shape(id).unwrap_or_default());
        }
        pass.painter.set_opacity(opacity);
        n.content.paint(pass.painter, &option);
        pass.painter.restore();
        log::trace!("painted {id:?}");
    }

    /// Union of the device rects `view` last painted, for tests and diagnostics.
    pub fn painted_area(&self, view: ViewId) -> Option<Rect> {
        let v = self.view(view)?;
        v.painted
            .values()
            .filter_map(|p| match p {
                PaintedRect::At(r) => Some(*r),
                PaintedRect::Outside => None,
            })
            .reduce(unite)
    }
}
