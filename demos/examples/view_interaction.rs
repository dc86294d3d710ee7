// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View interaction.
//!
//! Click to select, drag to move, rubber-band select, and watch the view's
//! pending updates and the scene's notifications.
//!
//! Run:
//! - `cargo run -p understory_examples --example view_interaction`

use kurbo::{Point, Rect, Size};
use peniko::Color;
use understory_scene::{
    Content, DragMode, Item, ItemFlags, MouseButton, MouseButtons, RecordingPainter, Scene,
    ShapeStyle, UpdateMode, ViewMouseEvent, ViewOptions,
};

fn main() {
    let mut scene = Scene::new();
    scene.set_scene_rect(Some(Rect::new(0.0, 0.0, 400.0, 300.0)));
    let flags = ItemFlags::SELECTABLE | ItemFlags::MOVABLE;
    let squares: Vec<_> = (0..4)
        .map(|i| {
            scene.add_item(
                Item::new(Content::rect(
                    Rect::new(0.0, 0.0, 30.0, 30.0),
                    ShapeStyle::filled(Color::from_rgb8(0x40, 0x40, 0x40)),
                ))
                .with_pos((20.0 + f64::from(i) * 60.0, 40.0))
                .with_flags(flags),
            )
        })
        .collect();

    let view = scene.add_view(
        ViewOptions {
            update_mode: UpdateMode::Minimal,
            drag_mode: DragMode::RubberBand,
            ..ViewOptions::default()
        },
        Size::new(400.0, 300.0),
    );
    let mut painter = RecordingPainter::new();
    let mut v = scene.view_mut(view).unwrap();
    v.paint(&mut painter, None);

    // Click the first square.
    let at = Point::new(25.0, 45.0);
    v.mouse_event(&ViewMouseEvent::press(at, MouseButton::Left));
    v.mouse_event(&ViewMouseEvent::release(at, MouseButton::Left));
    println!("selected: {:?}", scene.selected_items());

    // Drag it 50 units down.
    let mut v = scene.view_mut(view).unwrap();
    v.mouse_event(&ViewMouseEvent::press(at, MouseButton::Left));
    v.mouse_event(&ViewMouseEvent::moved(
        at + (0.0, 50.0),
        MouseButtons::LEFT,
    ));
    v.mouse_event(&ViewMouseEvent::release(at + (0.0, 50.0), MouseButton::Left));
    println!("moved to: {:?}", scene.pos(squares[0]));
    let update = scene.view_mut(view).unwrap().take_pending_update();
    println!("pending update after the drag: {update:?}");

    // Rubber-band over the other three.
    let mut v = scene.view_mut(view).unwrap();
    v.mouse_event(&ViewMouseEvent::press(Point::new(70.0, 20.0), MouseButton::Left));
    v.mouse_event(&ViewMouseEvent::moved(
        Point::new(300.0, 90.0),
        MouseButtons::LEFT,
    ));
    v.mouse_event(&ViewMouseEvent::release(Point::new(300.0, 90.0), MouseButton::Left));
    println!("selected after rubber band: {:?}", scene.selected_items());

    for n in scene.take_notifications() {
        println!("notification: {n:?}");
    }
}
