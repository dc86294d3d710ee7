// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene basics.
//!
//! Build a small item tree, rotate a parent, hit-test, and paint through a
//! recording painter.
//!
//! Run:
//! - `cargo run -p understory_examples --example scene_basics`

use kurbo::{Point, Rect, Size};
use peniko::Color;
use understory_scene::{
    Content, Item, PaintCommand, RecordingPainter, Scene, ShapeStyle, ViewOptions,
};

fn main() {
    let mut scene = Scene::new();
    scene.set_scene_rect(Some(Rect::new(-100.0, -100.0, 100.0, 100.0)));
    scene.set_background(Some(Color::WHITE.into()));

    // A parent with a child 20 units down and to the right.
    let parent = scene.add_item(Item::new(Content::rect(
        Rect::new(0.0, 0.0, 10.0, 10.0),
        ShapeStyle::filled(Color::from_rgb8(0x20, 0x60, 0xa0)),
    )));
    let child = scene
        .add_child(
            parent,
            Item::new(Content::ellipse(
                Rect::new(0.0, 0.0, 5.0, 5.0),
                ShapeStyle::filled(Color::from_rgb8(0xc0, 0x40, 0x20)),
            ))
            .with_pos((20.0, 20.0)),
        )
        .unwrap();
    println!("child scene pos: {:?}", scene.scene_pos(child));

    // Rotation is clockwise on screen because y points down.
    scene.set_rotation(parent, 90.0);
    println!("after rotating the parent: {:?}", scene.scene_pos(child));

    // Topmost first; the child paints above its parent.
    let hits = scene.items_at(Point::new(-22.5, 22.5));
    println!("items at (-22.5, 22.5): {hits:?}");
    assert_eq!(hits.first(), Some(&child), "the rotated child is hit");

    let view = scene.add_view(ViewOptions::default(), Size::new(200.0, 200.0));
    let mut painter = RecordingPainter::new();
    scene.view_mut(view).unwrap().paint(&mut painter, None);
    for cmd in &painter.commands {
        if let PaintCommand::Fill { transform, .. } = cmd {
            println!("fill at {:?}", transform.translation());
        }
    }
}
