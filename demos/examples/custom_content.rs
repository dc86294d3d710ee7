// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Custom content and change hooks.
//!
//! Implement `Shaped` and `Paintable` for a star, and keep an item on a grid
//! by adjusting proposed positions in a change hook.
//!
//! Run:
//! - `cargo run -p understory_examples --example custom_content`

use kurbo::{BezPath, Point, Rect, Size};
use peniko::{Color, Fill};
use understory_scene::{
    Content, Item, ItemChange, ItemFlags, ItemId, Paintable, Painter, RecordingPainter, Scene,
    Shaped, StyleOption, ViewOptions,
};

#[derive(Debug)]
struct Star {
    radius: f64,
}

impl Shaped for Star {
    fn bounding_rect(&self) -> Rect {
        Rect::new(-self.radius, -self.radius, self.radius, self.radius)
    }

    fn shape(&self) -> BezPath {
        let mut path = BezPath::new();
        for i in 0..10 {
            let r = if i % 2 == 0 { self.radius } else { self.radius * 0.4 };
            let angle = f64::from(i) * core::f64::consts::PI / 5.0 - core::f64::consts::FRAC_PI_2;
            let p = Point::new(r * angle.cos(), r * angle.sin());
            if i == 0 {
                path.move_to(p);
            } else {
                path.line_to(p);
            }
        }
        path.close_path();
        path
    }
}

impl Paintable for Star {
    fn paint(&self, painter: &mut dyn Painter, _option: &StyleOption) {
        painter.fill_path(
            &self.shape(),
            &Color::from_rgb8(0xe0, 0xb0, 0x20).into(),
            Fill::NonZero,
        );
    }
}

fn snap(_: &Scene, _: ItemId, change: ItemChange) -> ItemChange {
    match change {
        ItemChange::Position(p) => {
            ItemChange::Position(Point::new((p.x / 10.0).round() * 10.0, (p.y / 10.0).round() * 10.0))
        }
        other => other,
    }
}

fn main() {
    let mut scene = Scene::new();
    scene.set_scene_rect(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
    let star = scene.add_item(
        Item::new(Content::custom(Star { radius: 20.0 }))
            .with_pos((50.0, 50.0))
            .with_flags(ItemFlags::SENDS_GEOMETRY_CHANGES)
            .with_hook(snap),
    );

    scene.set_pos(star, (63.0, 47.0));
    println!("snapped position: {:?}", scene.pos(star));

    // The star's points are hit, the gaps between them are not.
    println!("tip hit: {}", !scene.items_at(Point::new(60.0, 33.0)).is_empty());
    println!("gap hit: {}", !scene.items_at(Point::new(69.0, 38.0)).is_empty());

    let view = scene.add_view(ViewOptions::default(), Size::new(200.0, 200.0));
    let mut painter = RecordingPainter::new();
    scene.view_mut(view).unwrap().paint(&mut painter, None);
    println!("fills painted: {}", painter.fill_count());
}
