// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end behaviour of items, scenes and views working together.

use std::cell::Cell;
use std::rc::Rc;

use kurbo::{Point, Rect, Size, Vec2};
use peniko::Color;
use understory_scene::{
    Content, EventContext, Item, ItemFlags, ItemHandler, ItemId, MouseButton, MouseButtons,
    MouseEvent, PanelModality, PendingUpdate, RecordingPainter, Scene, SceneNotification,
    ShapeStyle, UpdateMode, ViewId, ViewMouseEvent, ViewOptions,
};

fn rect_item(w: f64, h: f64) -> Item {
    Item::new(Content::rect(
        Rect::new(0.0, 0.0, w, h),
        ShapeStyle::filled(Color::BLACK),
    ))
}

fn close(a: Point, b: Point) -> bool {
    (a - b).hypot() < 1e-9
}

fn scene_with_view(options: ViewOptions) -> (Scene, ViewId) {
    let mut scene = Scene::new();
    scene.set_scene_rect(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
    let view = scene.add_view(options, Size::new(200.0, 200.0));
    (scene, view)
}

fn click(scene: &mut Scene, view: ViewId, at: Point) {
    let mut v = scene.view_mut(view).expect("view exists");
    v.mouse_event(&ViewMouseEvent::press(at, MouseButton::Left));
    v.mouse_event(&ViewMouseEvent::release(at, MouseButton::Left));
}

fn selection_changes(scene: &mut Scene) -> usize {
    scene
        .take_notifications()
        .iter()
        .filter(|n| **n == SceneNotification::SelectionChanged)
        .count()
}

#[test]
fn child_position_chains_through_parent() {
    let mut scene = Scene::new();
    let a = scene.add_item(rect_item(10.0, 10.0));
    let b = scene
        .add_child(a, rect_item(5.0, 5.0).with_pos((20.0, 20.0)))
        .expect("parent is alive");
    assert_eq!(scene.scene_pos(b), Some(Point::new(20.0, 20.0)), "pure translation");
}

#[test]
fn parent_rotation_is_clockwise_on_screen() {
    let mut scene = Scene::new();
    let a = scene.add_item(rect_item(10.0, 10.0));
    let b = scene
        .add_child(a, rect_item(5.0, 5.0).with_pos((20.0, 20.0)))
        .expect("parent is alive");
    assert_eq!(scene.scene_pos(b), Some(Point::new(20.0, 20.0)), "cached before rotating");
    scene.set_rotation(a, 90.0);
    let mapped = scene.scene_transform(b).expect("alive") * Point::ZERO;
    assert!(
        close(mapped, Point::new(-20.0, 20.0)),
        "rotated by a quarter turn with y pointing down: {mapped:?}"
    );
    assert!(
        (mapped.to_vec2().hypot() - 20.0 * core::f64::consts::SQRT_2).abs() < 1e-9,
        "distance from the origin is kept"
    );
}

#[test]
fn click_selects_exactly_one_item_once() {
    let (mut scene, view) = scene_with_view(ViewOptions::default());
    let flags = ItemFlags::SELECTABLE | ItemFlags::MOVABLE;
    let x = scene.add_item(rect_item(20.0, 20.0).with_pos((10.0, 10.0)).with_flags(flags));
    let other = scene.add_item(rect_item(20.0, 20.0).with_pos((100.0, 10.0)).with_flags(flags));
    scene.take_notifications();

    click(&mut scene, view, Point::new(15.0, 15.0));

    assert!(scene.is_selected(x), "clicked item selected");
    assert!(!scene.is_selected(other), "other item untouched");
    assert_eq!(scene.selected_items(), [x], "selection is exactly the clicked item");
    assert_eq!(selection_changes(&mut scene), 1, "one selection change for one click");
}

#[test]
fn dragging_moves_every_selected_movable_item() {
    let (mut scene, view) = scene_with_view(ViewOptions::default());
    let flags = ItemFlags::SELECTABLE | ItemFlags::MOVABLE;
    let x = scene.add_item(rect_item(20.0, 20.0).with_pos((10.0, 10.0)).with_flags(flags));
    // A second selected item under a scaled parent moves by the same scene
    // distance, which is half as far in its parent's coordinates.
    let holder = scene.add_item(Item::new(Content::Empty).with_pos((100.0, 100.0)).with_scale(2.0));
    let y = scene
        .add_child(holder, rect_item(10.0, 10.0).with_flags(flags))
        .expect("parent is alive");
    scene.set_selected(x, true);
    scene.set_selected(y, true);

    let (from, delta) = (Point::new(20.0, 20.0), Vec2::new(30.0, 16.0));
    let mut v = scene.view_mut(view).expect("view exists");
    v.mouse_event(&ViewMouseEvent::press(from, MouseButton::Left));
    v.mouse_event(&ViewMouseEvent::moved(from + delta * 0.5, MouseButtons::LEFT));
    v.mouse_event(&ViewMouseEvent::moved(from + delta, MouseButtons::LEFT));
    v.mouse_event(&ViewMouseEvent::release(from + delta, MouseButton::Left));

    assert_eq!(scene.pos(x), Some(Point::new(40.0, 26.0)), "grabbed item follows the mouse");
    assert_eq!(scene.pos(y), Some(Point::new(15.0, 8.0)), "delta mapped into the parent");
    assert!(scene.is_selected(x) && scene.is_selected(y), "selection survives the drag");
    assert_eq!(scene.mouse_grabber_item(), None, "release ends the grab");
}

#[test]
fn minimal_update_is_a_region_of_old_and_new_rects() {
    let (mut scene, view) = scene_with_view(ViewOptions {
        update_mode: UpdateMode::Minimal,
        ..ViewOptions::default()
    });
    let items: Vec<ItemId> = [10.0, 60.0, 110.0]
        .into_iter()
        .map(|x| scene.add_item(rect_item(10.0, 10.0).with_pos((x, 10.0))))
        .collect();
    let mut painter = RecordingPainter::new();
    let mut v = scene.view_mut(view).expect("view exists");
    v.paint(&mut painter, None);
    v.take_pending_update();

    for &id in &items {
        scene.move_by(id, Vec2::new(0.0, 40.0));
    }
    let update = scene
        .view_mut(view)
        .expect("view exists")
        .take_pending_update();
    let Some(PendingUpdate::Region(region)) = update else {
        panic!("expected a region, got {update:?}");
    };

    let mut expected = Vec::new();
    for x in [10.0, 60.0, 110.0] {
        // Device rects grow by the 2 px antialiasing margin.
        expected.push(Rect::new(x - 2.0, 8.0, x + 12.0, 22.0));
        expected.push(Rect::new(x - 2.0, 48.0, x + 12.0, 62.0));
    }
    for r in &expected {
        assert!(region.contains_rect(*r), "{r:?} is covered by {region:?}");
    }
    let area: f64 = expected.iter().map(|r| r.area()).sum();
    assert_eq!(region.area(), area, "nothing but the six rects");
    let bounds = region.bounding_rect().expect("not empty");
    assert!(region.area() < bounds.area(), "not a bounding superset");
}

#[derive(Clone, Default)]
struct PressCounter(Rc<Cell<u32>>);

impl ItemHandler for PressCounter {
    fn mouse_press(&mut self, cx: &mut EventContext<'_>, event: &mut MouseEvent) {
        self.0.set(self.0.get() + 1);
        cx.default_mouse_press(event);
    }
}

#[test]
fn scene_modal_panel_blocks_presses_elsewhere() {
    let (mut scene, view) = scene_with_view(ViewOptions::default());
    scene
        .view_mut(view)
        .expect("view exists")
        .activate();

    let host = scene.add_item(rect_item(50.0, 50.0).with_pos((120.0, 120.0)));
    let p1_presses = PressCounter::default();
    let p1 = scene
        .add_child(
            host,
            rect_item(40.0, 40.0)
                .with_flags(ItemFlags::IS_PANEL)
                .with_panel_modality(PanelModality::SceneModal)
                .with_handler(p1_presses.clone()),
        )
        .expect("parent is alive");
    let p2 = scene.add_item(rect_item(80.0, 80.0).with_flags(ItemFlags::IS_PANEL));
    let inside_presses = PressCounter::default();
    let inside = scene
        .add_child(
            p2,
            rect_item(20.0, 20.0)
                .with_pos((10.0, 10.0))
                .with_flags(ItemFlags::SELECTABLE)
                .with_handler(inside_presses.clone()),
        )
        .expect("parent is alive");
    scene.set_active_panel(Some(p1));
    assert_eq!(scene.active_panel(), Some(p1), "modal panel is active");
    assert_eq!(scene.is_blocked_by_modal_panel(inside), Some(p1), "p2 is unreachable");

    click(&mut scene, view, Point::new(15.0, 15.0));

    assert_eq!(inside_presses.0.get(), 0, "blocked item never sees the press");
    assert!(!scene.is_selected(inside), "so it is not selected either");
    assert_eq!(p1_presses.0.get(), 1, "the blocking panel receives it instead");
    assert_eq!(scene.active_panel(), Some(p1), "activation stays with the modal panel");
}

#[test]
fn many_mutations_flush_once_per_frame() {
    let (mut scene, view) = scene_with_view(ViewOptions::default());
    let items: Vec<ItemId> = (0..10)
        .map(|i| scene.add_item(rect_item(5.0, 5.0).with_pos((f64::from(i) * 10.0, 0.0))))
        .collect();
    let mut painter = RecordingPainter::new();
    scene
        .view_mut(view)
        .expect("view exists")
        .paint(&mut painter, None);
    let before = scene.frame_stats();

    for round in 0..5 {
        for &id in &items {
            scene.move_by(id, Vec2::new(0.0, 1.0));
            scene.set_z_value(id, f64::from(round));
            scene.update_item(id);
        }
    }
    let update = scene
        .view_mut(view)
        .expect("view exists")
        .take_pending_update();
    assert!(update.is_some(), "the view owes a repaint");
    let after = scene.frame_stats();
    assert_eq!(after.frames - before.frames, 1, "one frame");
    assert_eq!(after.dirty_runs - before.dirty_runs, 1, "one dirty pass");
    assert_eq!(after.index_runs - before.index_runs, 1, "one index pass");

    scene
        .view_mut(view)
        .expect("view exists")
        .paint(&mut painter, None);
    assert_eq!(
        scene.frame_stats().frames,
        after.frames,
        "painting right after the flush has nothing left to run"
    );
}
