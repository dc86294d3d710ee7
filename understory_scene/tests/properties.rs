// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Laws that hold across sequences of operations.

use std::cell::Cell;
use std::rc::Rc;

use kurbo::{Affine, Point, Rect, Size, Vec2};
use peniko::Color;
use understory_scene::{
    Content, EventContext, Item, ItemFlags, ItemHandler, ItemId, MouseButton, MouseButtons,
    MouseEvent, Scene, ShapeStyle, SortOrder, ViewMouseEvent, ViewOptions,
};

fn rect_item(w: f64, h: f64) -> Item {
    Item::new(Content::rect(
        Rect::new(0.0, 0.0, w, h),
        ShapeStyle::filled(Color::BLACK),
    ))
}

fn near(a: Point, b: Point) -> bool {
    (a - b).hypot() < 1e-6
}

#[test]
fn cached_scene_transforms_match_recomputation() {
    let mut scene = Scene::new();
    let root = scene.add_item(rect_item(10.0, 10.0));
    let mid = scene
        .add_child(root, rect_item(10.0, 10.0).with_pos((5.0, 0.0)))
        .expect("alive");
    let leaf = scene
        .add_child(mid, rect_item(10.0, 10.0).with_pos((0.0, 7.0)))
        .expect("alive");

    // Query the leaf first, then mutate in an order that touches the
    // ancestors after the descendant.
    scene.scene_transform(leaf);
    scene.set_pos(leaf, (1.0, 2.0));
    scene.set_rotation(root, 30.0);
    scene.set_scale(mid, 3.0);
    scene.set_transform(root, Affine::translate((4.0, -4.0)));
    scene.move_by(mid, Vec2::new(-2.0, 1.0));

    let fresh = |scene: &Scene, id: ItemId| {
        let mut chain = vec![id];
        while let Some(p) = scene.parent(*chain.last().expect("not empty")) {
            chain.push(p);
        }
        chain.iter().rev().fold(Affine::IDENTITY, |acc, id| {
            acc * scene.local_transform(*id).expect("alive")
        })
    };
    for id in [leaf, mid, root] {
        let cached = scene.scene_transform(id).expect("alive");
        let p = Point::new(3.0, 4.0);
        assert!(
            near(cached * p, fresh(&scene, id) * p),
            "{id:?} matches a from-scratch composition"
        );
    }
}

#[test]
fn equal_z_keeps_insertion_order_and_stack_before_swaps_one_pair() {
    let mut scene = Scene::new();
    let zs = [0.0, 1.0, 1.0, 1.0, 2.0];
    let ids: Vec<ItemId> = zs
        .iter()
        .map(|z| scene.add_item(rect_item(10.0, 10.0).with_z(*z)))
        .collect();
    assert_eq!(
        scene.items(SortOrder::Ascending),
        ids,
        "back to front by z, then insertion order"
    );

    scene.stack_before(ids[3], ids[1]);
    assert_eq!(
        scene.items(SortOrder::Ascending),
        [ids[0], ids[3], ids[1], ids[2], ids[4]],
        "only the moved item changed place"
    );
    assert_eq!(
        scene.items_at(Point::new(5.0, 5.0)),
        [ids[4], ids[2], ids[1], ids[3], ids[0]],
        "hit testing uses the same order, topmost first"
    );
}

#[derive(Clone, Default)]
struct Counter(Rc<Cell<u32>>);

impl Counter {
    fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }
}

impl ItemHandler for Counter {
    fn mouse_press(&mut self, cx: &mut EventContext<'_>, event: &mut MouseEvent) {
        self.bump();
        cx.default_mouse_press(event);
    }

    fn mouse_move(&mut self, cx: &mut EventContext<'_>, event: &mut MouseEvent) {
        self.bump();
        cx.default_mouse_move(event);
    }

    fn mouse_release(&mut self, cx: &mut EventContext<'_>, event: &mut MouseEvent) {
        self.bump();
        cx.default_mouse_release(event);
    }
}

#[test]
fn the_press_target_gets_every_event_until_release() {
    let mut scene = Scene::new();
    scene.set_scene_rect(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
    let view = scene.add_view(ViewOptions::default(), Size::new(200.0, 200.0));
    let grabbed_events = Counter::default();
    let other_events = Counter::default();
    let grabbed = scene.add_item(
        rect_item(20.0, 20.0)
            .with_flags(ItemFlags::SELECTABLE)
            .with_handler(grabbed_events.clone()),
    );
    scene.add_item(
        rect_item(20.0, 20.0)
            .with_pos((100.0, 100.0))
            .with_flags(ItemFlags::SELECTABLE)
            .with_handler(other_events.clone()),
    );

    let mut v = scene.view_mut(view).expect("view exists");
    v.mouse_event(&ViewMouseEvent::press(Point::new(5.0, 5.0), MouseButton::Left));
    for step in 1..=4 {
        let pos = Point::new(5.0 + 25.0 * f64::from(step), 5.0 + 25.0 * f64::from(step));
        v.mouse_event(&ViewMouseEvent::moved(pos, MouseButtons::LEFT));
    }
    assert_eq!(scene.mouse_grabber_item(), Some(grabbed), "grab held over the other item");
    let mut v = scene.view_mut(view).expect("view exists");
    v.mouse_event(&ViewMouseEvent::release(Point::new(110.0, 110.0), MouseButton::Left));

    assert_eq!(grabbed_events.0.get(), 6, "press, four moves and the release");
    assert_eq!(other_events.0.get(), 0, "nothing reaches the item under the cursor");
    assert_eq!(scene.mouse_grabber_item(), None, "released");
}

#[test]
fn hiding_the_grabber_releases_the_grab() {
    let mut scene = Scene::new();
    scene.set_scene_rect(Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
    let view = scene.add_view(ViewOptions::default(), Size::new(100.0, 100.0));
    let a = scene.add_item(rect_item(20.0, 20.0).with_flags(ItemFlags::SELECTABLE));
    scene
        .view_mut(view)
        .expect("view exists")
        .mouse_event(&ViewMouseEvent::press(Point::new(5.0, 5.0), MouseButton::Left));
    assert_eq!(scene.mouse_grabber_item(), Some(a), "press grabs");
    scene.hide(a);
    assert_eq!(scene.mouse_grabber_item(), None, "hidden items lose the grab");
}

#[test]
fn view_mapping_round_trips_under_rotation_and_scale() {
    let mut scene = Scene::new();
    scene.set_scene_rect(Some(Rect::new(-500.0, -500.0, 500.0, 500.0)));
    let view = scene.add_view(ViewOptions::default(), Size::new(300.0, 200.0));
    let mut v = scene.view_mut(view).expect("view exists");
    v.rotate(33.0);
    v.scale(1.5, 0.75);
    v.translate(12.0, -3.0);
    let v = scene.view(view).expect("view exists");

    for p in [Point::ZERO, Point::new(17.5, 120.25), Point::new(299.0, 1.0)] {
        assert!(near(v.map_from_scene(v.map_to_scene(p)), p), "point {p:?}");
    }
    let rect = Rect::new(10.0, 20.0, 60.0, 45.0);
    let poly = v.map_rect_to_scene(rect);
    let back = v.map_polygon_from_scene(&poly);
    let corners = [
        Point::new(10.0, 20.0),
        Point::new(60.0, 20.0),
        Point::new(60.0, 45.0),
        Point::new(10.0, 45.0),
    ];
    for (b, c) in back.iter().zip(corners) {
        assert!(near(*b, c), "rect corner {c:?} came back as {b:?}");
    }
    let polygon = [Point::new(1.0, 2.0), Point::new(80.0, 9.0), Point::new(40.0, 70.0)];
    let there = v.map_polygon_to_scene(&polygon);
    for (b, c) in v.map_polygon_from_scene(&there).iter().zip(polygon) {
        assert!(near(*b, c), "polygon vertex {c:?}");
    }
}
