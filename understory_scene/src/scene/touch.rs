// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Touch, gesture and input method routing.
//!
//! A touch point belongs to the item that accepted the begin event it arrived
//! in, until the finger is lifted. Gestures go to the first item under the hot
//! spot that grabbed their type and accepted the start. Input method events
//! only ever reach the focus item.

use alloc::vec;
use alloc::vec::Vec;

use super::Scene;
use crate::events::{
    GestureEvent, GestureState, InputMethodEvent, SceneEvent, TouchDevice, TouchEvent,
    TouchEventKind, TouchPoint, TouchPointState,
};
use crate::types::{FocusReason, ItemFlags, ItemId, ViewId};

/// The phase an item sees for its share of the points, or `None` when
/// nothing changed for it.
fn touch_kind(points: &[TouchPoint]) -> Option<TouchEventKind> {
    let all = |state| points.iter().all(|p| p.state == state);
    if all(TouchPointState::Pressed) {
        Some(TouchEventKind::Begin)
    } else if all(TouchPointState::Released) {
        Some(TouchEventKind::End)
    } else if all(TouchPointState::Stationary) {
        None
    } else {
        Some(TouchEventKind::Update)
    }
}

impl Scene {
    /// Route a touch event.
    ///
    /// Each pressed point picks a target: on a pad every point joins the item
    /// the first one went to; on a screen a point joins the item of the nearest
    /// point already down when that item is also under it, and otherwise goes
    /// to the topmost item under it. The points are then grouped per item and
    /// each item receives a begin, update or end event carrying only its own
    /// points, mapped to its coordinates. Moved and lifted points follow the
    /// item that accepted their begin. `event.accepted` is set when some item
    /// took its points.
    pub fn touch_event(&mut self, event: &mut TouchEvent, view: Option<ViewId>) {
        let mut groups: Vec<(ItemId, Vec<TouchPoint>)> = Vec::new();
        for point in &event.points {
            let mut point = point.clone();
            let item = match point.state {
                TouchPointState::Pressed => {
                    let Some(item) = self.touch_target(&point, event.device, view) else {
                        continue;
                    };
                    point.start_scene_pos = point.scene_pos;
                    point.last_scene_pos = point.scene_pos;
                    self.touch_items.insert(point.id, item);
                    self.touch_points.insert(point.id, point.clone());
                    item
                }
                TouchPointState::Released => {
                    let Some(item) = self.touch_items.remove(&point.id) else {
                        continue;
                    };
                    if let Some(previous) = self.touch_points.remove(&point.id) {
                        point.start_scene_pos = previous.start_scene_pos;
                        point.last_scene_pos = previous.scene_pos;
                    }
                    item
                }
                TouchPointState::Moved | TouchPointState::Stationary => {
                    let Some(&item) = self.touch_items.get(&point.id) else {
                        continue;
                    };
                    if let Some(previous) = self.touch_points.get_mut(&point.id) {
                        point.start_scene_pos = previous.start_scene_pos;
                        point.last_scene_pos = previous.scene_pos;
                        *previous = point.clone();
                    }
                    item
                }
            };
            match groups.iter_mut().find(|(i, _)| *i == item) {
                Some((_, points)) => points.push(point),
                None => groups.push((item, vec![point])),
            }
        }

        let mut accepted = false;
        for (item, points) in groups {
            let item = self.is_blocked_by_modal_panel(item).unwrap_or(item);
            let Some(kind) = touch_kind(&points) else {
                continue;
            };
            let mut e = TouchEvent {
                kind,
                device: event.device,
                points,
                modifiers: event.modifiers,
                accepted: true,
            };
            if kind == TouchEventKind::Begin {
                if self.send_touch_begin(item, &mut e, view) {
                    accepted = true;
                } else {
                    log::trace!("Scene: touch begin at {item:?} was not accepted");
                    for p in &e.points {
                        self.touch_items.remove(&p.id);
                        self.touch_points.remove(&p.id);
                    }
                }
            } else if self.touch_begin_accepted.contains(&item) {
                let mut se = SceneEvent::Touch(e);
                se.map_positions(self.event_scene_to_local(item, view));
                self.send_event(item, &mut se);
                accepted = true;
            }
        }
        event.accepted = accepted;
    }

    /// The item a newly pressed point belongs to.
    fn touch_target(
        &mut self,
        point: &TouchPoint,
        device: TouchDevice,
        view: Option<ViewId>,
    ) -> Option<ItemId> {
        let mut item = None;
        if device == TouchDevice::Pad {
            item = self.touch_items.values().next().copied();
        }
        if item.is_none() {
            self.cached_items_under_mouse = self.items_at_position(point.scene_pos, view);
            item = self.cached_items_under_mouse.first().copied();
        }
        if device == TouchDevice::Screen {
            let closest = self
                .touch_points
                .values()
                .min_by(|a, b| {
                    let da = (a.scene_pos - point.scene_pos).hypot();
                    let db = (b.scene_pos - point.scene_pos).hypot();
                    da.total_cmp(&db)
                })
                .and_then(|p| self.touch_items.get(&p.id).copied());
            if item.is_none()
                || closest.is_some_and(|c| self.cached_items_under_mouse.contains(&c))
            {
                item = closest;
            }
        }
        item
    }

    /// Offer a begin event to `origin` and the items below it until one
    /// accepts. The acceptor owns the event's points from then on.
    fn send_touch_begin(&mut self, origin: ItemId, event: &mut TouchEvent, view: Option<ViewId>) -> bool {
        if self.cached_items_under_mouse.first() != Some(&origin) {
            if let Some(first) = event.points.first() {
                self.cached_items_under_mouse = self.items_at_position(first.scene_pos, view);
            }
        }
        let mut candidates = self.cached_items_under_mouse.clone();
        if candidates.first() != Some(&origin) {
            candidates.retain(|c| *c != origin);
            candidates.insert(0, origin);
        }

        let mut focus_handled = false;
        for &item in &candidates {
            let Some(flags) = self.flags(item) else {
                continue;
            };
            if self.is_enabled(item) && flags.contains(ItemFlags::FOCUSABLE) {
                focus_handled = true;
                if self.focus_item() != Some(item) {
                    self.set_focus_item(Some(item), FocusReason::Mouse);
                }
                break;
            }
            if flags.contains(ItemFlags::IS_PANEL)
                || flags.contains(ItemFlags::STOPS_CLICK_FOCUS_PROPAGATION)
            {
                break;
            }
            if flags.contains(ItemFlags::STOPS_FOCUS_HANDLING) {
                focus_handled = true;
                break;
            }
        }
        if !self.options.sticky_focus && !focus_handled {
            self.set_focus_item(None, FocusReason::Mouse);
        }

        let mut delivered = false;
        let mut accepted = event.accepted;
        for item in candidates {
            let accepts = self.accepts_touch(item);
            let mut se = SceneEvent::Touch(TouchEvent {
                accepted: accepts,
                ..event.clone()
            });
            se.map_positions(self.event_scene_to_local(item, view));
            delivered = accepts && self.send_event(item, &mut se);
            accepted = se.is_accepted();
            if delivered && accepted {
                self.touch_begin_accepted.insert(item);
                for p in &event.points {
                    self.touch_items.insert(p.id, item);
                }
                break;
            }
            self.touch_begin_accepted.remove(&item);
            if self.is_panel(item) {
                break;
            }
        }
        event.accepted = accepted;
        delivered && accepted
    }

    /// Route a gesture.
    ///
    /// A started gesture is offered to the items under the hot spot, topmost
    /// first, that grabbed its type; blocked items are skipped and a panel
    /// ends the walk. The acceptor receives the rest of the gesture until it
    /// finishes or is canceled.
    pub fn gesture_event(&mut self, event: &mut GestureEvent, view: Option<ViewId>) {
        event.accepted = false;
        if event.state == GestureState::Started {
            self.gesture_targets.remove(&event.kind);
            for item in self.items_at_position(event.scene_pos, view) {
                if self.grabbed_gestures(item).contains(&event.kind)
                    && self.is_blocked_by_modal_panel(item).is_none()
                    && self.send_gesture(item, event, view)
                {
                    self.gesture_targets.insert(event.kind, item);
                    return;
                }
                if self.is_panel(item) {
                    return;
                }
            }
            return;
        }
        let Some(&target) = self.gesture_targets.get(&event.kind) else {
            log::trace!("Scene: {:?} gesture without a target", event.kind);
            return;
        };
        if matches!(event.state, GestureState::Finished | GestureState::Canceled) {
            self.gesture_targets.remove(&event.kind);
        }
        self.send_gesture(target, event, view);
    }

    fn send_gesture(&mut self, item: ItemId, event: &mut GestureEvent, view: Option<ViewId>) -> bool {
        let mut e = SceneEvent::Gesture(GestureEvent {
            accepted: true,
            ..event.clone()
        });
        e.map_positions(self.event_scene_to_local(item, view));
        let delivered = self.send_event(item, &mut e);
        event.accepted = delivered && e.is_accepted();
        event.accepted
    }

    /// Deliver input method composition to the focus item, if it accepts
    /// input methods.
    pub fn input_method_event(&mut self, event: &mut InputMethodEvent) {
        event.accepted = false;
        let Some(item) = self.focus_item() else {
            return;
        };
        if !self
            .flags(item)
            .is_some_and(|f| f.contains(ItemFlags::ACCEPTS_INPUT_METHOD))
        {
            return;
        }
        let mut e = SceneEvent::InputMethod(InputMethodEvent {
            accepted: true,
            ..event.clone()
        });
        self.send_event(item, &mut e);
        if let SceneEvent::InputMethod(delivered) = e {
            *event = delivered;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::rect_item;
    use super::*;
    use crate::events::GestureKind;
    use crate::handler::{EventContext, ItemHandler};
    use crate::types::Modifiers;
    use alloc::rc::Rc;
    use alloc::string::String;
    use core::cell::RefCell;
    use kurbo::{Point, Vec2};

    #[derive(Clone, Default)]
    struct Touches(Rc<RefCell<Vec<(TouchEventKind, Vec<(u32, Point)>)>>>);

    impl ItemHandler for Touches {
        fn touch(&mut self, _: &mut EventContext<'_>, event: &mut TouchEvent) {
            let points = event.points.iter().map(|p| (p.id, p.pos)).collect();
            self.0.borrow_mut().push((event.kind, points));
        }
    }

    fn touch(points: &[(u32, TouchPointState, (f64, f64))]) -> TouchEvent {
        TouchEvent {
            kind: TouchEventKind::Update,
            device: TouchDevice::Screen,
            points: points
                .iter()
                .map(|(id, state, pos)| TouchPoint::new(*id, *state, Point::new(pos.0, pos.1)))
                .collect(),
            modifiers: Modifiers::empty(),
            accepted: false,
        }
    }

    #[test]
    fn touch_points_stay_with_the_item_that_accepted_the_begin() {
        let mut scene = Scene::new();
        let log = Touches::default();
        let a = scene.add_item(
            rect_item(20.0, 20.0)
                .with_pos((10.0, 10.0))
                .with_accepts_touch(true)
                .with_handler(log.clone()),
        );

        let mut e = touch(&[(1, TouchPointState::Pressed, (15.0, 15.0))]);
        scene.touch_event(&mut e, None);
        assert!(e.accepted, "the item took the point");
        assert_eq!(scene.touch_items.get(&1), Some(&a), "point owned by the item");

        // The finger leaves the item's shape; the point still belongs to it.
        let mut e = touch(&[(1, TouchPointState::Moved, (100.0, 100.0))]);
        scene.touch_event(&mut e, None);
        let mut e = touch(&[(1, TouchPointState::Released, (100.0, 100.0))]);
        scene.touch_event(&mut e, None);

        assert_eq!(
            *log.0.borrow(),
            [
                (TouchEventKind::Begin, vec![(1, Point::new(5.0, 5.0))]),
                (TouchEventKind::Update, vec![(1, Point::new(90.0, 90.0))]),
                (TouchEventKind::End, vec![(1, Point::new(90.0, 90.0))]),
            ],
            "begin, update and end in item coordinates"
        );
        assert!(scene.touch_items.is_empty(), "lifted points are forgotten");
    }

    #[test]
    fn unaccepted_begin_falls_through_and_drops_the_point() {
        let mut scene = Scene::new();
        let below = Touches::default();
        let b = scene.add_item(
            rect_item(20.0, 20.0)
                .with_accepts_touch(true)
                .with_handler(below.clone()),
        );
        // On top, but not interested in touch.
        scene.add_item(rect_item(20.0, 20.0).with_z(1.0));

        let mut e = touch(&[(7, TouchPointState::Pressed, (5.0, 5.0))]);
        scene.touch_event(&mut e, None);
        assert_eq!(scene.touch_items.get(&7), Some(&b), "the item below took it");
        assert_eq!(below.0.borrow().len(), 1, "one begin");

        let mut scene = Scene::new();
        scene.add_item(rect_item(20.0, 20.0).with_handler(Touches::default()));
        let mut e = touch(&[(7, TouchPointState::Pressed, (5.0, 5.0))]);
        scene.touch_event(&mut e, None);
        assert!(!e.accepted, "nobody accepts touch");
        assert!(
            scene.touch_items.is_empty() && scene.touch_points.is_empty(),
            "the point is forgotten"
        );
        let mut e = touch(&[(7, TouchPointState::Moved, (6.0, 6.0))]);
        scene.touch_event(&mut e, None);
        assert!(!e.accepted, "later updates for it go nowhere");
    }

    #[test]
    fn a_second_finger_joins_the_nearest_point_on_the_same_item() {
        let mut scene = Scene::new();
        let log = Touches::default();
        let a = scene.add_item(
            rect_item(100.0, 100.0)
                .with_accepts_touch(true)
                .with_handler(log.clone()),
        );
        let mut e = touch(&[(1, TouchPointState::Pressed, (10.0, 10.0))]);
        scene.touch_event(&mut e, None);
        let mut e = touch(&[
            (1, TouchPointState::Stationary, (10.0, 10.0)),
            (2, TouchPointState::Pressed, (50.0, 50.0)),
        ]);
        scene.touch_event(&mut e, None);
        assert_eq!(scene.touch_items.get(&2), Some(&a), "second finger joins");
        let last = log.0.borrow().last().cloned().expect("events delivered");
        assert_eq!(last.0, TouchEventKind::Update, "mixed states make an update");
        assert_eq!(last.1.len(), 2, "both points reach the item");
    }

    #[test]
    fn pad_points_all_go_to_the_first_target() {
        let mut scene = Scene::new();
        let a = scene.add_item(
            rect_item(20.0, 20.0)
                .with_accepts_touch(true)
                .with_handler(Touches::default()),
        );
        let far = scene.add_item(
            rect_item(20.0, 20.0)
                .with_pos((100.0, 0.0))
                .with_accepts_touch(true)
                .with_handler(Touches::default()),
        );
        let mut e = touch(&[(1, TouchPointState::Pressed, (5.0, 5.0))]);
        e.device = TouchDevice::Pad;
        scene.touch_event(&mut e, None);
        let mut e = touch(&[(2, TouchPointState::Pressed, (105.0, 5.0))]);
        e.device = TouchDevice::Pad;
        scene.touch_event(&mut e, None);
        assert_eq!(scene.touch_items.get(&2), Some(&a), "not {far:?}");
    }

    #[derive(Clone, Default)]
    struct Gestures(Rc<RefCell<Vec<(GestureState, Point)>>>);

    impl ItemHandler for Gestures {
        fn gesture(&mut self, _: &mut EventContext<'_>, event: &mut GestureEvent) {
            self.0.borrow_mut().push((event.state, event.pos));
        }
    }

    fn pan(state: GestureState, at: (f64, f64)) -> GestureEvent {
        GestureEvent {
            kind: GestureKind::Pan,
            state,
            pos: Point::new(at.0, at.1),
            scene_pos: Point::new(at.0, at.1),
            delta: Vec2::new(1.0, 0.0),
            scale_factor: 1.0,
            rotation: 0.0,
            accepted: false,
        }
    }

    #[test]
    fn gestures_go_to_the_item_that_grabbed_them() {
        let mut scene = Scene::new();
        let log = Gestures::default();
        let grabber = scene.add_item(
            rect_item(50.0, 50.0)
                .with_gesture(GestureKind::Pan)
                .with_handler(log.clone()),
        );
        // Topmost, but grabbed a different gesture.
        let other = Gestures::default();
        scene.add_item(
            rect_item(50.0, 50.0)
                .with_z(1.0)
                .with_gesture(GestureKind::Pinch)
                .with_handler(other.clone()),
        );

        let mut e = pan(GestureState::Started, (10.0, 10.0));
        scene.gesture_event(&mut e, None);
        assert!(e.accepted, "started gesture accepted");
        assert_eq!(scene.gesture_targets.get(&GestureKind::Pan), Some(&grabber), "target kept");

        let mut e = pan(GestureState::Updated, (200.0, 200.0));
        scene.gesture_event(&mut e, None);
        let mut e = pan(GestureState::Finished, (200.0, 200.0));
        scene.gesture_event(&mut e, None);
        assert_eq!(
            log.0.borrow().iter().map(|(s, _)| *s).collect::<Vec<_>>(),
            [GestureState::Started, GestureState::Updated, GestureState::Finished],
            "the whole gesture, even away from the item"
        );
        assert!(other.0.borrow().is_empty(), "the pinch grabber saw nothing");
        assert!(scene.gesture_targets.is_empty(), "finished gestures are forgotten");

        let mut e = pan(GestureState::Updated, (10.0, 10.0));
        scene.gesture_event(&mut e, None);
        assert!(!e.accepted, "an update without a start goes nowhere");
    }

    #[derive(Clone, Default)]
    struct Composer(Rc<RefCell<String>>);

    impl ItemHandler for Composer {
        fn input_method(&mut self, _: &mut EventContext<'_>, event: &mut InputMethodEvent) {
            self.0.borrow_mut().push_str(&event.commit);
        }
    }

    #[test]
    fn input_method_reaches_only_accepting_focus_items() {
        let mut scene = Scene::new();
        scene.activate();
        let text = Composer::default();
        let editor = scene.add_item(
            rect_item(10.0, 10.0)
                .with_flags(ItemFlags::FOCUSABLE | ItemFlags::ACCEPTS_INPUT_METHOD)
                .with_handler(text.clone()),
        );
        let plain_text = Composer::default();
        let plain = scene.add_item(
            rect_item(10.0, 10.0)
                .with_flags(ItemFlags::FOCUSABLE)
                .with_handler(plain_text.clone()),
        );

        let mut e = InputMethodEvent::commit("é");
        scene.input_method_event(&mut e);
        assert!(!e.accepted, "no focus item");

        scene.set_focus(editor, FocusReason::Other);
        let mut e = InputMethodEvent::commit("é");
        scene.input_method_event(&mut e);
        assert!(e.accepted, "the editor took it");
        assert_eq!(*text.0.borrow(), "é", "committed text delivered");

        scene.set_focus(plain, FocusReason::Other);
        let mut e = InputMethodEvent::commit("x");
        scene.input_method_event(&mut e);
        assert!(!e.accepted, "focus item without the flag");
        assert!(plain_text.0.borrow().is_empty(), "and it never sees the event");
    }
}
