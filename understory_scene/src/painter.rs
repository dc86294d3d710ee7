// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Painter abstraction and style options.
//!
//! The scene never rasterizes. Rendering walks the item tree and issues
//! calls on a [`Painter`]; a backend turns them into pixels. Paint data
//! (brushes and fill rules) comes from `peniko`, strokes are [`kurbo::Stroke`].
//!
//! [`RecordingPainter`] records every call, which is what tests and demos use.

use alloc::string::String;
use alloc::vec::Vec;
use kurbo::{Affine, BezPath, Point, Rect, Stroke};
use peniko::{Brush, Fill};

/// Handle to an image owned by the painter backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub u32);

bitflags::bitflags! {
    /// Render quality hints.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RenderHints: u8 {
        /// Anti-alias geometry edges.
        const ANTIALIASING = 1 << 0;
        /// Anti-alias text.
        const TEXT_ANTIALIASING = 1 << 1;
        /// Use smooth filtering when transforming images.
        const SMOOTH_PIXMAP_TRANSFORM = 1 << 2;
    }
}

impl Default for RenderHints {
    fn default() -> Self {
        Self::TEXT_ANTIALIASING
    }
}

/// A stroke and the brush used to paint it.
#[derive(Clone, Debug, PartialEq)]
pub struct Pen {
    /// Stroke geometry (width, joins, caps, dashes).
    pub stroke: Stroke,
    /// Paint for the stroke.
    pub brush: Brush,
}

impl Pen {
    /// A solid pen of the given width.
    pub fn new(width: f64, brush: impl Into<Brush>) -> Self {
        Self {
            stroke: Stroke::new(width),
            brush: brush.into(),
        }
    }

    /// Half the stroke width, the amount a stroke extends past its path.
    pub fn half_width(&self) -> f64 {
        self.stroke.width * 0.5
    }
}

bitflags::bitflags! {
    /// Item state visible to paint code.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct StyleState: u8 {
        /// The item is selected.
        const SELECTED = 1 << 0;
        /// The item has keyboard focus.
        const HAS_FOCUS = 1 << 1;
        /// The cursor hovers the item.
        const MOUSE_OVER = 1 << 2;
        /// The item is enabled.
        const ENABLED = 1 << 3;
    }
}

/// Per-item options passed to paint code.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleOption {
    /// State flags.
    pub state: StyleState,
    /// The item's bounding rect in local coordinates.
    pub rect: Rect,
    /// The part of the item that needs painting, in local coordinates.
    pub exposed_rect: Rect,
    /// Level of detail: how many device pixels one local unit covers.
    pub level_of_detail: f64,
}

impl Default for StyleOption {
    fn default() -> Self {
        Self {
            state: StyleState::ENABLED,
            rect: Rect::ZERO,
            exposed_rect: Rect::ZERO,
            level_of_detail: 1.0,
        }
    }
}

/// Drawing surface used by rendering.
///
/// State calls nest: every `save` is matched by a `restore`, which brings back
/// the transform, clip, opacity and render hints of the matching `save`.
pub trait Painter {
    /// Push the current state.
    fn save(&mut self);
    /// Pop to the most recently saved state.
    fn restore(&mut self);
    /// Replace the world transform.
    fn set_transform(&mut self, transform: Affine);
    /// The current world transform.
    fn transform(&self) -> Affine;
    /// Intersect the clip with `path`, given in current local coordinates.
    fn clip_path(&mut self, path: &BezPath);
    /// Set the opacity applied to subsequent drawing.
    fn set_opacity(&mut self, opacity: f64);
    /// Set render quality hints.
    fn set_render_hints(&mut self, hints: RenderHints);
    /// Fill a path.
    fn fill_path(&mut self, path: &BezPath, brush: &Brush, rule: Fill);
    /// Stroke a path.
    fn stroke_path(&mut self, path: &BezPath, pen: &Pen);
    /// Draw a run of text with its baseline starting at `origin`.
    fn draw_text(&mut self, origin: Point, text: &str, size: f64, brush: &Brush);
    /// Draw an image into a local destination rect.
    fn draw_image(&mut self, image: ImageId, dst: Rect);
}

/// One recorded painter call, with the state that was current when it was made.
#[derive(Clone, Debug, PartialEq)]
pub enum PaintCommand {
    /// A path fill.
    Fill {
        /// The path, in local coordinates.
        path: BezPath,
        /// The brush.
        brush: Brush,
        /// World transform at the time of the call.
        transform: Affine,
        /// Opacity at the time of the call.
        opacity: f64,
    },
    /// A path stroke.
    Stroke {
        /// The path, in local coordinates.
        path: BezPath,
        /// The pen.
        pen: Pen,
        /// World transform at the time of the call.
        transform: Affine,
        /// Opacity at the time of the call.
        opacity: f64,
    },
    /// A text run.
    Text {
        /// Baseline origin.
        origin: Point,
        /// The text.
        text: String,
        /// World transform at the time of the call.
        transform: Affine,
    },
    /// An image.
    Image {
        /// Image handle.
        image: ImageId,
        /// Destination rect.
        dst: Rect,
        /// World transform at the time of the call.
        transform: Affine,
    },
    /// A clip intersection.
    Clip {
        /// The clip path, in local coordinates.
        path: BezPath,
        /// World transform at the time of the call.
        transform: Affine,
    },
}

#[derive(Clone, Copy, Debug)]
struct RecordState {
    transform: Affine,
    opacity: f64,
    hints: RenderHints,
}

impl Default for RecordState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            opacity: 1.0,
            hints: RenderHints::default(),
        }
    }
}

/// A [`Painter`] that records draw calls instead of rasterizing.
#[derive(Clone, Debug, Default)]
pub struct RecordingPainter {
    state: RecordState,
    stack: Vec<RecordState>,
    /// Recorded calls in order.
    pub commands: Vec<PaintCommand>,
}

impl RecordingPainter {
    /// Create an empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current save depth. Zero after a balanced render.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Current render hints.
    pub fn render_hints(&self) -> RenderHints {
        self.state.hints
    }

    /// Number of fill commands, handy for asserting how many items painted.
    pub fn fill_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, PaintCommand::Fill { .. }))
            .count()
    }
}

impl Painter for RecordingPainter {
    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(s) = self.stack.pop() {
            self.state = s;
        } else {
            log::warn!("RecordingPainter::restore: unbalanced restore");
        }
    }

    fn set_transform(&mut self, transform: Affine) {
        self.state.transform = transform;
    }

    fn transform(&self) -> Affine {
        self.state.transform
    }

    fn clip_path(&mut self, path: &BezPath) {
        self.commands.push(PaintCommand::Clip {
            path: path.clone(),
            transform: self.state.transform,
        });
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.state.opacity = opacity;
    }

    fn set_render_hints(&mut self, hints: RenderHints) {
        self.state.hints = hints;
    }

    fn fill_path(&mut self, path: &BezPath, brush: &Brush, _rule: Fill) {
        self.commands.push(PaintCommand::Fill {
            path: path.clone(),
            brush: brush.clone(),
            transform: self.state.transform,
            opacity: self.state.opacity,
        });
    }

    fn stroke_path(&mut self, path: &BezPath, pen: &Pen) {
        self.commands.push(PaintCommand::Stroke {
            path: path.clone(),
            pen: pen.clone(),
            transform: self.state.transform,
            opacity: self.state.opacity,
        });
    }

    fn draw_text(&mut self, origin: Point, text: &str, _size: f64, _brush: &Brush) {
        self.commands.push(PaintCommand::Text {
            origin,
            text: String::from(text),
            transform: self.state.transform,
        });
    }

    fn draw_image(&mut self, image: ImageId, dst: Rect) {
        self.commands.push(PaintCommand::Image {
            image,
            dst,
            transform: self.state.transform,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;
    use peniko::Color;

    #[test]
    fn save_restore_round_trips_state() {
        let mut p = RecordingPainter::new();
        p.save();
        p.set_transform(Affine::translate((3.0, 4.0)));
        p.set_opacity(0.5);
        let path = Rect::new(0.0, 0.0, 1.0, 1.0).to_path(0.1);
        p.fill_path(&path, &Brush::Solid(Color::WHITE), Fill::NonZero);
        p.restore();
        assert_eq!(p.transform(), Affine::IDENTITY, "transform restored");
        assert_eq!(p.depth(), 0, "balanced");
        match &p.commands[0] {
            PaintCommand::Fill {
                transform, opacity, ..
            } => {
                assert_eq!(*transform, Affine::translate((3.0, 4.0)), "recorded transform");
                assert_eq!(*opacity, 0.5, "recorded opacity");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn pen_half_width() {
        let pen = Pen::new(3.0, Color::BLACK);
        assert_eq!(pen.half_width(), 1.5, "half of the stroke width");
    }
}
