// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item content: the shape and paint capabilities of an item.
//!
//! [`Shaped`] answers geometric questions and [`Paintable`] draws. Default
//! methods chain through [`Shaped::shape`], which itself defaults to the
//! bounding rect, so a custom content type only has to supply a bounding rect
//! and a paint routine to be correct; it overrides `shape` or `contains` only
//! to be precise or fast.
//!
//! [`Content`] is the closed set of built-in variants plus
//! [`Content::Custom`] for anything else.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Debug;
use kurbo::{Arc, BezPath, Ellipse, Line, Point, Rect, Shape, Size, Vec2};
use peniko::{Brush, Fill};

use crate::geometry::{TOLERANCE, polygon_path};
use crate::painter::{ImageId, Painter, Pen, StyleOption, StyleState};

/// Geometric capability of item content. All coordinates are item-local.
pub trait Shaped {
    /// Axis-aligned bounds of everything the content paints.
    fn bounding_rect(&self) -> Rect;

    /// Precise outline used for hit testing and collision.
    fn shape(&self) -> BezPath {
        self.bounding_rect().to_path(TOLERANCE)
    }

    /// Whether `pt` lies inside the content.
    fn contains(&self, pt: Point) -> bool {
        self.shape().contains(pt)
    }

    /// The area painted fully opaque, used for occlusion tests. Empty by default.
    fn opaque_area(&self) -> BezPath {
        BezPath::new()
    }
}

/// Paint capability of item content.
pub trait Paintable {
    /// Paint in item-local coordinates. The painter's transform is already set.
    fn paint(&self, painter: &mut dyn Painter, option: &StyleOption);
}

/// Object-safe union of both capabilities, used by [`Content::Custom`].
pub trait ItemContent: Shaped + Paintable + Debug {}

impl<T: Shaped + Paintable + Debug> ItemContent for T {}

/// Fill and outline of a built-in shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeStyle {
    /// Optional outline.
    pub pen: Option<Pen>,
    /// Optional fill.
    pub brush: Option<Brush>,
}

impl ShapeStyle {
    /// Fill only.
    pub fn filled(brush: impl Into<Brush>) -> Self {
        Self {
            pen: None,
            brush: Some(brush.into()),
        }
    }

    /// Outline only.
    pub fn stroked(pen: Pen) -> Self {
        Self {
            pen: Some(pen),
            brush: None,
        }
    }

    fn half_pen(&self) -> f64 {
        self.pen.as_ref().map_or(0.0, Pen::half_width)
    }

    fn is_opaque(&self) -> bool {
        match &self.brush {
            Some(Brush::Solid(c)) => c.components[3] >= 1.0,
            _ => false,
        }
    }

    fn draw(&self, painter: &mut dyn Painter, path: &BezPath) {
        if let Some(brush) = &self.brush {
            painter.fill_path(path, brush, Fill::NonZero);
        }
        if let Some(pen) = &self.pen {
            painter.stroke_path(path, pen);
        }
    }
}

/// An ellipse, optionally restricted to a pie segment.
#[derive(Clone, Debug, PartialEq)]
pub struct EllipseContent {
    /// Bounding rect of the full ellipse.
    pub rect: Rect,
    /// Start angle in degrees, counter-clockwise from three o'clock.
    pub start_angle: f64,
    /// Span in degrees; `360` draws the full ellipse.
    pub span_angle: f64,
    /// Fill and outline.
    pub style: ShapeStyle,
}

impl EllipseContent {
    fn path(&self) -> BezPath {
        let ellipse = Ellipse::from_rect(self.rect);
        if self.span_angle.abs() >= 360.0 {
            return ellipse.to_path(TOLERANCE);
        }
        let deg = core::f64::consts::PI / 180.0;
        let center = self.rect.center();
        let radii = Vec2::new(self.rect.width() * 0.5, self.rect.height() * 0.5);
        // Angles run counter-clockwise on screen, which is negative in y-down space.
        let arc = Arc::new(
            center,
            radii,
            -self.start_angle * deg,
            -self.span_angle * deg,
            0.0,
        );
        let mut path = BezPath::new();
        path.move_to(center);
        let mut first = true;
        for el in arc.path_elements(TOLERANCE) {
            match el {
                kurbo::PathEl::MoveTo(p) => {
                    if first {
                        path.line_to(p);
                    }
                }
                other => path.push(other),
            }
            first = false;
        }
        path.close_path();
        path
    }
}

/// A line segment.
#[derive(Clone, Debug, PartialEq)]
pub struct LineContent {
    /// The segment.
    pub line: Line,
    /// Outline; a line without a pen paints nothing.
    pub pen: Option<Pen>,
}

impl LineContent {
    fn outline(&self) -> BezPath {
        let half = self.pen.as_ref().map_or(0.0, Pen::half_width);
        let d = self.line.p1 - self.line.p0;
        let len = d.hypot();
        if len == 0.0 || half == 0.0 {
            let r = Rect::from_points(self.line.p0, self.line.p1).inflate(half, half);
            return r.to_path(TOLERANCE);
        }
        let n = Vec2::new(-d.y, d.x) * (half / len);
        polygon_path(&[
            self.line.p0 + n,
            self.line.p1 + n,
            self.line.p1 - n,
            self.line.p0 - n,
        ])
    }
}

/// An image drawn into a rect.
#[derive(Clone, Debug, PartialEq)]
pub struct PixmapContent {
    /// Backend image handle.
    pub image: ImageId,
    /// Top-left corner in local coordinates.
    pub offset: Point,
    /// Size in local units.
    pub size: Size,
}

/// A single line of text.
#[derive(Clone, Debug, PartialEq)]
pub struct TextContent {
    /// The text.
    pub text: String,
    /// Font size in local units.
    pub font_size: f64,
    /// Text color.
    pub brush: Brush,
}

impl TextContent {
    /// Approximate advance width of one character relative to the font size.
    ///
    /// Without a shaping backend the layout is estimated; hosts needing exact
    /// bounds use [`Content::Custom`] with their own shaper.
    pub const AVERAGE_ADVANCE: f64 = 0.6;
    /// Line height relative to the font size.
    pub const LINE_HEIGHT: f64 = 1.2;

    fn bounds(&self) -> Rect {
        #[allow(
            clippy::cast_precision_loss,
            reason = "character counts of a single text item are far below 2^52."
        )]
        let chars = self.text.chars().count() as f64;
        Rect::new(
            0.0,
            0.0,
            chars * self.font_size * Self::AVERAGE_ADVANCE,
            self.font_size * Self::LINE_HEIGHT,
        )
    }
}

/// Built-in item content variants.
#[derive(Debug, Default)]
pub enum Content {
    /// Nothing to paint; the item is a pure container.
    #[default]
    Empty,
    /// A rectangle.
    Rect(Rect, ShapeStyle),
    /// An ellipse or pie segment.
    Ellipse(EllipseContent),
    /// An arbitrary path.
    Path(BezPath, ShapeStyle),
    /// A line segment.
    Line(LineContent),
    /// A closed polygon.
    Polygon(Vec<Point>, ShapeStyle),
    /// An image.
    Pixmap(PixmapContent),
    /// Text.
    Text(TextContent),
    /// An item group. Its bounds are maintained by the scene from its members.
    Group,
    /// User-supplied content.
    Custom(Box<dyn ItemContent>),
}

impl Content {
    /// Rectangle content.
    pub fn rect(rect: Rect, style: ShapeStyle) -> Self {
        Self::Rect(rect, style)
    }

    /// Full ellipse content.
    pub fn ellipse(rect: Rect, style: ShapeStyle) -> Self {
        Self::Ellipse(EllipseContent {
            rect,
            start_angle: 0.0,
            span_angle: 360.0,
            style,
        })
    }

    /// Text content.
    pub fn text(text: impl Into<String>, font_size: f64, brush: impl Into<Brush>) -> Self {
        Self::Text(TextContent {
            text: text.into(),
            font_size,
            brush: brush.into(),
        })
    }

    /// Wrap custom content.
    pub fn custom(content: impl ItemContent + 'static) -> Self {
        Self::Custom(Box::new(content))
    }

    /// True for [`Content::Group`].
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group)
    }
}

impl Shaped for Content {
    fn bounding_rect(&self) -> Rect {
        match self {
            Self::Empty | Self::Group => Rect::ZERO,
            Self::Rect(r, style) => {
                let h = style.half_pen();
                r.abs().inflate(h, h)
            }
            Self::Ellipse(e) => {
                let h = e.style.half_pen();
                if e.span_angle.abs() >= 360.0 {
                    e.rect.abs().inflate(h, h)
                } else {
                    e.path().bounding_box().inflate(h, h)
                }
            }
            Self::Path(p, style) => {
                let h = style.half_pen();
                p.bounding_box().inflate(h, h)
            }
            Self::Line(l) => l.outline().bounding_box(),
            Self::Polygon(pts, style) => {
                let h = style.half_pen();
                polygon_path(pts).bounding_box().inflate(h, h)
            }
            Self::Pixmap(p) => Rect::from_origin_size(p.offset, p.size),
            Self::Text(t) => t.bounds(),
            Self::Custom(c) => c.bounding_rect(),
        }
    }

    fn shape(&self) -> BezPath {
        match self {
            Self::Empty | Self::Group => BezPath::new(),
            Self::Ellipse(e) => e.path(),
            Self::Path(p, _) => p.clone(),
            Self::Line(l) => l.outline(),
            Self::Polygon(pts, _) => polygon_path(pts),
            Self::Custom(c) => c.shape(),
            Self::Rect(..) | Self::Pixmap(_) | Self::Text(_) => {
                self.bounding_rect().to_path(TOLERANCE)
            }
        }
    }

    fn contains(&self, pt: Point) -> bool {
        match self {
            Self::Empty | Self::Group => false,
            Self::Rect(..) | Self::Pixmap(_) | Self::Text(_) => {
                let r = self.bounding_rect();
                pt.x >= r.x0 && pt.x <= r.x1 && pt.y >= r.y0 && pt.y <= r.y1
            }
            Self::Custom(c) => c.contains(pt),
            _ => self.shape().contains(pt),
        }
    }

    fn opaque_area(&self) -> BezPath {
        match self {
            Self::Rect(_, s) | Self::Path(_, s) | Self::Polygon(_, s) if s.is_opaque() => {
                self.shape()
            }
            Self::Ellipse(e) if e.style.is_opaque() => e.path(),
            Self::Custom(c) => c.opaque_area(),
            _ => BezPath::new(),
        }
    }
}

impl Paintable for Content {
    fn paint(&self, painter: &mut dyn Painter, option: &StyleOption) {
        match self {
            Self::Empty | Self::Group => {}
            Self::Rect(r, style) => style.draw(painter, &r.to_path(TOLERANCE)),
            Self::Ellipse(e) => e.style.draw(painter, &e.path()),
            Self::Path(p, style) => style.draw(painter, p),
            Self::Line(l) => {
                if let Some(pen) = &l.pen {
                    let mut path = BezPath::new();
                    path.move_to(l.line.p0);
                    path.line_to(l.line.p1);
                    painter.stroke_path(&path, pen);
                }
            }
            Self::Polygon(pts, style) => style.draw(painter, &polygon_path(pts)),
            Self::Pixmap(p) => {
                painter.draw_image(p.image, Rect::from_origin_size(p.offset, p.size));
            }
            Self::Text(t) => {
                let baseline = Point::new(0.0, t.font_size);
                painter.draw_text(baseline, &t.text, t.font_size, &t.brush);
            }
            Self::Custom(c) => c.paint(painter, option),
        }
        if option.state.contains(StyleState::SELECTED) && !matches!(self, Self::Custom(_)) {
            highlight_selected(painter, option.rect);
        }
    }
}

/// Draw the dashed selection outline around `rect`.
pub fn highlight_selected(painter: &mut dyn Painter, rect: Rect) {
    if rect.width() <= 0.0 && rect.height() <= 0.0 {
        return;
    }
    let mut pen = Pen::new(0.0, peniko::Color::BLACK);
    pen.stroke = pen.stroke.with_dashes(0.0, [3.0, 3.0]);
    painter.stroke_path(&rect.to_path(TOLERANCE), &pen);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::painter::RecordingPainter;
    use peniko::Color;

    #[derive(Debug)]
    struct Dot;

    impl Shaped for Dot {
        fn bounding_rect(&self) -> Rect {
            Rect::new(-1.0, -1.0, 1.0, 1.0)
        }
    }

    impl Paintable for Dot {
        fn paint(&self, _painter: &mut dyn Painter, _option: &StyleOption) {}
    }

    #[test]
    fn pen_inflates_bounds() {
        let c = Content::rect(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            ShapeStyle::stroked(Pen::new(2.0, Color::BLACK)),
        );
        assert_eq!(
            c.bounding_rect(),
            Rect::new(-1.0, -1.0, 11.0, 11.0),
            "half the pen on each side"
        );
    }

    #[test]
    fn custom_defaults_chain_through_shape() {
        let c = Content::custom(Dot);
        assert!(c.contains(Point::new(0.5, 0.5)), "inside the bounding rect");
        assert!(!c.contains(Point::new(2.0, 0.0)), "outside");
        assert!(c.opaque_area().is_empty(), "no opaque area by default");
    }

    #[test]
    fn ellipse_contains_uses_shape() {
        let c = Content::ellipse(Rect::new(0.0, 0.0, 10.0, 10.0), ShapeStyle::default());
        assert!(c.contains(Point::new(5.0, 5.0)), "center");
        assert!(!c.contains(Point::new(0.5, 0.5)), "corner of the bounding rect");
    }

    #[test]
    fn pie_segment_covers_only_its_quadrant() {
        let c = Content::Ellipse(EllipseContent {
            rect: Rect::new(-10.0, -10.0, 10.0, 10.0),
            start_angle: 0.0,
            span_angle: 90.0,
            style: ShapeStyle::default(),
        });
        // Counter-clockwise from three o'clock sweeps the upper right on screen.
        assert!(c.contains(Point::new(3.0, -3.0)), "upper right");
        assert!(!c.contains(Point::new(3.0, 3.0)), "lower right");
    }

    #[test]
    fn opaque_brush_reports_opaque_area() {
        let c = Content::rect(Rect::new(0.0, 0.0, 4.0, 4.0), ShapeStyle::filled(Color::WHITE));
        assert!(!c.opaque_area().is_empty(), "solid white is opaque");
        let t = Content::rect(
            Rect::new(0.0, 0.0, 4.0, 4.0),
            ShapeStyle::filled(Color::from_rgba8(0, 0, 0, 128)),
        );
        assert!(t.opaque_area().is_empty(), "half transparent is not");
    }

    #[test]
    fn selected_items_get_a_highlight() {
        let c = Content::rect(Rect::new(0.0, 0.0, 4.0, 4.0), ShapeStyle::filled(Color::WHITE));
        let mut p = RecordingPainter::new();
        let option = StyleOption {
            state: StyleState::SELECTED | StyleState::ENABLED,
            rect: c.bounding_rect(),
            ..Default::default()
        };
        c.paint(&mut p, &option);
        assert_eq!(p.commands.len(), 2, "fill plus highlight");
    }
}
