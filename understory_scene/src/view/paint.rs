// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Painting a view.

use kurbo::{Affine, Rect, Shape};
use peniko::{Brush, Color, Fill};

use super::{OptimizationFlags, ViewMut};
use crate::geometry::TOLERANCE;
use crate::painter::{Painter, Pen};
use crate::scene::RenderOptions;

/// Rubber band fill.
const RUBBER_BAND_FILL: Color = Color::from_rgba8(0x30, 0x8c, 0xc6, 0x40);
/// Rubber band outline.
const RUBBER_BAND_STROKE: Color = Color::from_rgba8(0x30, 0x8c, 0xc6, 0xff);

impl ViewMut<'_> {
    /// Paint the view: background, then every item intersecting `exposed`
    /// (view coordinates, the whole viewport with `None`), then the foreground
    /// and the rubber band.
    ///
    /// The view's own brushes take the place of the scene's when set.
    ///
    /// Pending scene work runs first. Afterwards the view records where each
    /// item was painted and forgets the scroll offset it accumulated.
    pub fn paint(&mut self, painter: &mut dyn Painter, exposed: Option<Rect>) {
        self.scene.run_pending_tasks();
        let Some(v) = self.view() else {
            return;
        };
        let id = v.id;
        let viewport_transform = v.viewport_transform();
        let exposed = exposed.unwrap_or_else(|| v.viewport_rect());
        let exposed_scene = viewport_transform
            .inverse()
            .transform_rect_bbox(exposed);
        let flags = v.options.optimization_flags;
        let save_state = !flags.contains(OptimizationFlags::DONT_SAVE_PAINTER_STATE);
        let options = RenderOptions::for_view(
            id,
            viewport_transform,
            flags,
            v.options.render_hints,
            Some(exposed.inflate(1.0, 1.0)),
        );
        let background = v.options.background.clone();
        let foreground = v.options.foreground.clone();
        let rubber_band = v
            .rubber_band_rect()
            .filter(|r| v.mouse.rubber_banding && r.width() > 0.0 && r.height() > 0.0);
        log::trace!("view {id:?}: paint {exposed:?}");

        painter.save();
        painter.set_render_hints(options.render_hints);
        painter.set_transform(viewport_transform);
        if save_state {
            painter.save();
        }
        match &background {
            Some(brush) => fill_rect(painter, exposed_scene, brush),
            None => self.scene.draw_background(painter, exposed_scene),
        }
        if save_state {
            painter.restore();
        }
        self.scene.render(painter, &options);
        if save_state {
            painter.save();
        }
        match &foreground {
            Some(brush) => fill_rect(painter, exposed_scene, brush),
            None => self.scene.draw_foreground(painter, exposed_scene),
        }
        if save_state {
            painter.restore();
        }

        if let Some(rect) = rubber_band {
            painter.set_transform(Affine::IDENTITY);
            let path = rect.to_path(TOLERANCE);
            painter.fill_path(&path, &Brush::Solid(RUBBER_BAND_FILL), Fill::NonZero);
            painter.stroke_path(&path, &Pen::new(1.0, RUBBER_BAND_STROKE));
        }
        painter.restore();

        if let Some(v) = self.state() {
            v.reset_after_paint();
        }
    }
}

fn fill_rect(painter: &mut dyn Painter, rect: Rect, brush: &Brush) {
    painter.fill_path(&rect.to_path(TOLERANCE), brush, Fill::NonZero);
}
