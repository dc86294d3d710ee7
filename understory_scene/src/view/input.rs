// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Translating host input into scene events.
//!
//! Each method maps view coordinates to the scene, fills in the press and
//! last-move positions the view remembers, and hands the event to the scene.
//! What the scene leaves unaccepted falls back to view behaviour: rubber band
//! selection, hand scrolling, wheel and key scrolling.

use alloc::string::String;
use alloc::vec::Vec;
use kurbo::{Point, Rect, Vec2};

use super::{DragMode, LastMouse, UpdateMode, View, ViewMut, trunc_to_int};
use crate::events::{
    ContextMenuEvent, DragDropEvent, DragEventKind, GestureEvent, InputMethodEvent, Key,
    KeyEvent, KeyEventKind, MouseEvent, MouseEventKind, Orientation, TouchEvent,
    TouchEventKind, TouchPoint, ViewContextMenuEvent, ViewDragEvent, ViewGestureEvent,
    ViewMouseEvent, ViewTouchEvent, ViewWheelEvent, WheelEvent,
};
use crate::geometry::{manhattan_length, polygon_path};
use crate::scene::QueryOptions;
use crate::types::{CursorShape, DropAction, FocusReason, ItemId, MouseButton, SelectionMode};
use understory_scene_index::SortOrder;

/// Wheel notches are reported in eighths of a degree.
const WHEEL_NOTCH: f64 = 120.0;
/// Single steps scrolled per wheel notch.
const WHEEL_SCROLL_LINES: f64 = 3.0;
/// Hand-scroll moves up to which a release still counts as a click.
const HAND_SCROLL_CLICK_MOTIONS: u32 = 6;

/// The cursor a view shows when no item under the mouse sets one.
fn view_cursor(mode: DragMode) -> Option<CursorShape> {
    (mode == DragMode::ScrollHand).then_some(CursorShape::OpenHand)
}

impl View {
    /// Remember `event` as a move for replaying.
    fn store_mouse_event(&mut self, event: &ViewMouseEvent) {
        self.mouse.last = Some(LastMouse {
            event: ViewMouseEvent {
                kind: MouseEventKind::Move,
                ..event.clone()
            },
            accepted: false,
        });
    }

    fn set_last_mouse_accepted(&mut self, accepted: bool) {
        if let Some(last) = self.mouse.last.as_mut() {
            last.accepted = accepted;
        }
    }

    /// Record `pos` as the press point of `button`.
    fn store_press(&mut self, pos: Point, screen_pos: Point, button: Option<MouseButton>) {
        let scene_pos = self.map_to_scene(pos);
        self.mouse.press_view_point = pos;
        self.mouse.press_scene_point = scene_pos;
        self.mouse.press_screen_point = screen_pos;
        self.mouse.last_move_scene_point = scene_pos;
        self.mouse.last_move_screen_point = screen_pos;
        if button.is_some() {
            self.mouse.press_button = button;
        }
    }

    /// A scene mouse event for `event`, carrying the remembered press and last-move points.
    fn scene_mouse_event(&self, kind: MouseEventKind, event: &ViewMouseEvent) -> MouseEvent {
        let scene_pos = self.map_to_scene(event.pos);
        let mut m = MouseEvent::new(kind, scene_pos);
        m.screen_pos = event.screen_pos;
        m.last_scene_pos = self.mouse.last_move_scene_point;
        m.last_screen_pos = self.mouse.last_move_screen_point;
        m.last_pos = m.last_scene_pos;
        if let Some(button) = self.mouse.press_button {
            m.button_down_scene_pos[button.index()] = self.mouse.press_scene_point;
            m.button_down_screen_pos[button.index()] = self.mouse.press_screen_point;
        }
        m.button = event.button;
        m.buttons = event.buttons;
        m.modifiers = event.modifiers;
        m.view = Some(self.id);
        m
    }

    /// Repaint the area covered by a rubber band rect.
    fn update_rubber_band(&mut self, rect: Rect) {
        match self.options.update_mode {
            UpdateMode::None => {}
            UpdateMode::Full => self.update_all(),
            _ => {
                self.update_rect(rect.expand());
            }
        }
    }

    fn scene_drag_event(&self, kind: DragEventKind, event: &ViewDragEvent) -> DragDropEvent {
        let mut d = DragDropEvent::new(kind, self.map_to_scene(event.pos), event.proposed_action);
        d.screen_pos = event.screen_pos;
        d.buttons = event.buttons;
        d.modifiers = event.modifiers;
        d.formats = event.formats.clone();
        d
    }
}

impl ViewMut<'_> {
    /// Feed a mouse event in view coordinates. Returns whether the scene or
    /// the view handled it.
    pub fn mouse_event(&mut self, event: &ViewMouseEvent) -> bool {
        match event.kind {
            MouseEventKind::Press => self.mouse_press(event),
            MouseEventKind::DoubleClick => self.mouse_double_click(event),
            MouseEventKind::Move => self.mouse_move(event),
            MouseEventKind::Release => self.mouse_release(event),
        }
    }

    fn mouse_press(&mut self, event: &ViewMouseEvent) -> bool {
        let Some(v) = self.state() else {
            return false;
        };
        v.mouse.under_mouse = true;
        v.store_mouse_event(event);
        let interactive = v.options.interactive;
        if interactive {
            v.store_press(event.pos, event.screen_pos, event.button);
            let mut m = v.scene_mouse_event(MouseEventKind::Press, event);
            self.scene.mouse_event(&mut m);
            let Some(v) = self.state() else {
                return m.accepted;
            };
            v.set_last_mouse_accepted(m.accepted);
            if m.accepted {
                return true;
            }
        }

        let Some(v) = self.state() else {
            return false;
        };
        match v.options.drag_mode {
            DragMode::RubberBand if !v.mouse.rubber_banding => {
                if !interactive {
                    return false;
                }
                v.mouse.rubber_banding = true;
                v.mouse.rubber_band_rect = None;
                log::trace!("view {:?}: rubber band started", v.id);
                self.scene.clear_selection();
                true
            }
            DragMode::ScrollHand if event.button == Some(MouseButton::Left) => {
                v.mouse.hand_scrolling = true;
                v.mouse.hand_scroll_motions = 0;
                v.cursor = Some(CursorShape::ClosedHand);
                true
            }
            _ => false,
        }
    }

    fn mouse_double_click(&mut self, event: &ViewMouseEvent) -> bool {
        let Some(v) = self.state() else {
            return false;
        };
        v.store_mouse_event(event);
        if !v.options.interactive {
            return false;
        }
        v.store_press(event.pos, event.screen_pos, event.button);
        let mut m = v.scene_mouse_event(MouseEventKind::DoubleClick, event);
        self.scene.mouse_event(&mut m);
        if let Some(v) = self.state() {
            v.set_last_mouse_accepted(m.accepted);
        }
        m.accepted
    }

    fn mouse_move(&mut self, event: &ViewMouseEvent) -> bool {
        let Some(v) = self.state() else {
            return false;
        };
        v.mouse.under_mouse = true;
        let interactive = v.options.interactive;
        match v.options.drag_mode {
            DragMode::RubberBand if interactive => {
                v.store_mouse_event(event);
                if v.mouse.rubber_banding {
                    self.rubber_band_move(event);
                    return true;
                }
            }
            DragMode::ScrollHand if v.mouse.hand_scrolling => {
                let last = v.mouse.last.as_ref().map_or(event.pos, |l| l.event.pos);
                let delta = event.pos - last;
                let (x, y) = (v.hbar.value - delta.x, v.vbar.value - delta.y);
                v.set_scroll_values(x, y);
                v.mouse.hand_scroll_motions += 1;
            }
            _ => {}
        }
        self.mouse_move_handler(event)
    }

    fn rubber_band_move(&mut self, event: &ViewMouseEvent) {
        let Some(v) = self.state() else {
            return;
        };
        let press = v.mouse.press_view_point;
        if manhattan_length(press - event.pos) < v.options.start_drag_distance {
            return;
        }
        if let Some(old) = v.mouse.rubber_band_rect {
            if old.width() > 0.0 && old.height() > 0.0 {
                v.update_rubber_band(old);
            }
        }
        // All buttons went up without a release reaching us.
        if event.buttons.is_empty() {
            v.mouse.rubber_banding = false;
            v.mouse.rubber_band_rect = None;
            return;
        }
        let (x0, y0) = (press.x.min(event.pos.x), press.y.min(event.pos.y));
        let rect = Rect::new(
            x0,
            y0,
            x0 + (press.x - event.pos.x).abs() + 1.0,
            y0 + (press.y - event.pos.y).abs() + 1.0,
        );
        v.mouse.rubber_band_rect = Some(rect);
        v.update_rubber_band(rect);

        let area = polygon_path(&v.map_rect_to_scene(rect));
        let mode = v.options.rubber_band_selection_mode;
        let device = v.viewport_transform();
        self.scene.set_selection_area(area, mode, Some(device));
    }

    /// Deliver a move to the scene and pick the cursor from the items under it.
    fn mouse_move_handler(&mut self, event: &ViewMouseEvent) -> bool {
        let id = self.id;
        let Some(v) = self.state() else {
            return false;
        };
        v.store_mouse_event(event);
        if !v.options.interactive || v.mouse.hand_scrolling {
            return false;
        }
        let mut m = v.scene_mouse_event(MouseEventKind::Move, event);
        v.mouse.last_move_scene_point = m.scene_pos;
        v.mouse.last_move_screen_point = m.screen_pos;
        self.scene.mouse_event(&mut m);

        let accepted = m.accepted;
        let Some(v) = self.state() else {
            return accepted;
        };
        v.set_last_mouse_accepted(accepted);
        // A grabber is dragging; its press may have set a cursor.
        if accepted && !m.buttons.is_empty() {
            return accepted;
        }

        if self.scene.cached_items_under_mouse.is_empty() {
            self.scene.cached_items_under_mouse = self.scene.items_at_position(m.scene_pos, Some(id));
        }
        let cursor = self
            .scene
            .cached_items_under_mouse
            .iter()
            .find_map(|item| self.scene.cursor(*item));
        if let Some(v) = self.state() {
            v.cursor = cursor.or_else(|| view_cursor(v.options.drag_mode));
        }
        accepted
    }

    fn mouse_release(&mut self, event: &ViewMouseEvent) -> bool {
        let Some(v) = self.state() else {
            return false;
        };
        let interactive = v.options.interactive;
        match v.options.drag_mode {
            DragMode::RubberBand if interactive && event.buttons.is_empty() => {
                if v.mouse.rubber_banding {
                    if let Some(rect) = v.mouse.rubber_band_rect.take() {
                        v.update_rubber_band(rect);
                    }
                    v.mouse.rubber_banding = false;
                }
            }
            DragMode::ScrollHand if event.button == Some(MouseButton::Left) => {
                v.cursor = Some(CursorShape::OpenHand);
                v.mouse.hand_scrolling = false;
                let last_accepted = v.mouse.last.as_ref().is_some_and(|l| l.accepted);
                if interactive
                    && !last_accepted
                    && v.mouse.hand_scroll_motions <= HAND_SCROLL_CLICK_MOTIONS
                {
                    // Barely moved: a click on the background.
                    self.scene.clear_selection();
                }
            }
            _ => {}
        }

        let Some(v) = self.state() else {
            return false;
        };
        v.store_mouse_event(event);
        if !interactive {
            return false;
        }
        let mut m = v.scene_mouse_event(MouseEventKind::Release, event);
        self.scene.mouse_event(&mut m);
        let Some(v) = self.state() else {
            return m.accepted;
        };
        v.set_last_mouse_accepted(m.accepted);
        if m.accepted && m.buttons.is_empty() {
            v.cursor = view_cursor(v.options.drag_mode);
        }
        m.accepted
    }

    /// Re-send the last mouse position as a move, after the mapping changed.
    pub(crate) fn replay_last_mouse_event(&mut self) {
        let Some(last) = self
            .view()
            .and_then(|v| v.mouse.last.as_ref())
            .map(|l| l.event.clone())
        else {
            return;
        };
        log::trace!("view {:?}: replaying mouse move at {:?}", self.id, last.pos);
        self.mouse_move_handler(&last);
    }

    /// Feed a wheel event. Unaccepted wheel events scroll the view. Returns
    /// whether the scene accepted the event or the view scrolled.
    pub fn wheel_event(&mut self, event: &ViewWheelEvent) -> bool {
        let Some(v) = self.view() else {
            return false;
        };
        if v.options.interactive {
            let scene_pos = v.map_to_scene(event.pos);
            let (delta, orientation) = if event.delta.y != 0.0 {
                (event.delta.y, Orientation::Vertical)
            } else {
                (event.delta.x, Orientation::Horizontal)
            };
            let mut w = WheelEvent {
                pos: scene_pos,
                scene_pos,
                screen_pos: event.screen_pos,
                buttons: event.buttons,
                modifiers: event.modifiers,
                delta,
                orientation,
                accepted: false,
            };
            self.scene.wheel_event(&mut w, Some(self.id));
            if w.accepted {
                return true;
            }
        }
        self.wheel_scroll(event.delta)
    }

    fn wheel_scroll(&mut self, delta: Vec2) -> bool {
        let Some(v) = self.view() else {
            return false;
        };
        let size = v.viewport_size();
        let step_x = (WHEEL_SCROLL_LINES * trunc_to_int(size.width / 20.0)).min(size.width);
        let step_y = (WHEEL_SCROLL_LINES * trunc_to_int(size.height / 20.0)).min(size.height);
        let before = v.scroll_value();
        let offset = Vec2::new(
            -delta.x / WHEEL_NOTCH * step_x,
            -delta.y / WHEEL_NOTCH * step_y,
        );
        self.scroll_by(offset);
        self.view().is_some_and(|v| v.scroll_value() != before)
    }

    /// Feed a key event. Keys the scene leaves unaccepted scroll the view
    /// (arrows by a step, page keys by a page).
    pub fn key_event(&mut self, event: &mut KeyEvent) -> bool {
        let Some(v) = self.view() else {
            return false;
        };
        if v.options.interactive {
            self.scene.key_event(event);
            if event.accepted {
                return true;
            }
        }
        if event.kind != KeyEventKind::Press {
            return false;
        }
        let Some(v) = self.view() else {
            return false;
        };
        let size = v.viewport_size();
        let step = Vec2::new(trunc_to_int(size.width / 20.0), trunc_to_int(size.height / 20.0));
        let offset = match event.key {
            Key::Left => Vec2::new(-step.x, 0.0),
            Key::Right => Vec2::new(step.x, 0.0),
            Key::Up => Vec2::new(0.0, -step.y),
            Key::Down => Vec2::new(0.0, step.y),
            Key::PageUp => Vec2::new(0.0, -size.height),
            Key::PageDown => Vec2::new(0.0, size.height),
            _ => return false,
        };
        self.scroll_by(offset);
        event.accepted = true;
        true
    }

    /// Feed a context menu request. Returns whether an item accepted it.
    pub fn context_menu_event(&mut self, event: &ViewContextMenuEvent) -> bool {
        let Some(v) = self.state() else {
            return false;
        };
        if !v.options.interactive {
            return false;
        }
        v.store_press(event.pos, event.screen_pos, None);
        let scene_pos = v.mouse.press_scene_point;
        let mut c = ContextMenuEvent {
            pos: scene_pos,
            scene_pos,
            screen_pos: event.screen_pos,
            modifiers: event.modifiers,
            reason: event.reason,
            accepted: false,
        };
        self.scene.context_menu_event(&mut c, Some(self.id));
        c.accepted
    }

    /// Feed a touch event. Returns whether any item took its points.
    pub fn touch_event(&mut self, event: &ViewTouchEvent) -> bool {
        let Some(v) = self.view() else {
            return false;
        };
        if !v.options.interactive {
            return false;
        }
        let points = event
            .points
            .iter()
            .map(|p| {
                let mut point = TouchPoint::new(p.id, p.state, v.map_to_scene(p.pos));
                point.screen_pos = p.screen_pos;
                point
            })
            .collect();
        let mut t = TouchEvent {
            kind: TouchEventKind::Update,
            device: event.device,
            points,
            modifiers: event.modifiers,
            accepted: false,
        };
        self.scene.touch_event(&mut t, Some(self.id));
        t.accepted
    }

    /// Feed a recognized gesture. Returns whether an item accepted it.
    pub fn gesture_event(&mut self, event: &ViewGestureEvent) -> bool {
        let Some(v) = self.view() else {
            return false;
        };
        if !v.options.interactive {
            return false;
        }
        let scene_pos = v.map_to_scene(event.hot_spot);
        let mut g = GestureEvent {
            kind: event.kind,
            state: event.state,
            pos: scene_pos,
            scene_pos,
            delta: v.map_to_scene(event.hot_spot + event.delta) - scene_pos,
            scale_factor: event.scale_factor,
            rotation: event.rotation,
            accepted: false,
        };
        self.scene.gesture_event(&mut g, Some(self.id));
        g.accepted
    }

    /// Feed input method composition. Returns whether the focus item took it.
    pub fn input_method_event(&mut self, event: &mut InputMethodEvent) -> bool {
        if !self.view().is_some_and(|v| v.options.interactive) {
            return false;
        }
        self.scene.input_method_event(event);
        event.accepted
    }

    /// Feed a drag-and-drop event. Returns the action the target settled on,
    /// or `None` if nothing accepted the drag.
    ///
    /// `Enter` is followed by an implicit `Move` so that the item under the
    /// cursor is entered right away. `Leave` reuses the position of the last
    /// enter or move.
    pub fn drag_event(&mut self, event: &ViewDragEvent) -> Option<DropAction> {
        let id = self.id;
        let v = self.state()?;
        if !v.options.interactive {
            return None;
        }
        match event.kind {
            DragEventKind::Enter => {
                // No replaying mouse moves under a drag.
                v.mouse.last = None;
                let mut enter = v.scene_drag_event(DragEventKind::Enter, event);
                v.last_drag = Some(event.clone());
                self.scene.drag_drop_event(&mut enter, Some(id));
                let v = self.state()?;
                let mut moved = v.scene_drag_event(DragEventKind::Move, event);
                self.scene.drag_drop_event(&mut moved, Some(id));
                moved.accepted.then_some(moved.drop_action)
            }
            DragEventKind::Move => {
                let mut moved = v.scene_drag_event(DragEventKind::Move, event);
                v.last_drag = Some(event.clone());
                self.scene.drag_drop_event(&mut moved, Some(id));
                moved.accepted.then_some(moved.drop_action)
            }
            DragEventKind::Leave => {
                let Some(last) = v.last_drag.take() else {
                    log::warn!("ViewMut::drag_event: drag leave received before drag enter");
                    return None;
                };
                let mut leave = v.scene_drag_event(DragEventKind::Leave, &last);
                self.scene.drag_drop_event(&mut leave, Some(id));
                leave.accepted.then_some(leave.drop_action)
            }
            DragEventKind::Drop => {
                let mut drop = v.scene_drag_event(DragEventKind::Drop, event);
                v.last_drag = None;
                self.scene.drag_drop_event(&mut drop, Some(id));
                drop.accepted.then_some(drop.drop_action)
            }
        }
    }

    /// The view gained keyboard focus. The scene takes focus if it is active.
    pub fn focus_in(&mut self, reason: FocusReason) -> bool {
        self.scene.set_scene_focus(reason);
        self.scene.has_scene_focus()
    }

    /// The view lost keyboard focus.
    pub fn focus_out(&mut self, reason: FocusReason) {
        if self.scene.has_scene_focus() {
            self.scene.scene_focus_out(reason);
        }
    }

    /// The view's window became active. Counts one scene activation.
    pub fn activate(&mut self) {
        let Some(v) = self.state() else {
            return;
        };
        if v.activated {
            return;
        }
        v.activated = true;
        self.scene.activate();
    }

    /// The view's window lost activation.
    pub fn deactivate(&mut self) {
        let Some(v) = self.state() else {
            return;
        };
        if !v.activated {
            return;
        }
        v.activated = false;
        self.scene.deactivate();
    }

    /// The cursor entered the viewport.
    pub fn enter(&mut self) {
        if let Some(v) = self.state() {
            v.mouse.under_mouse = true;
        }
    }

    /// The cursor left the viewport. Hovered items get leave events and
    /// mouse replay stops until the next mouse event.
    pub fn leave(&mut self) {
        let id = self.id;
        let Some(v) = self.state() else {
            return;
        };
        v.mouse.under_mouse = false;
        v.mouse.last = None;
        v.cursor = view_cursor(v.options.drag_mode);
        self.scene.leave_scene(Some(id));
    }

    /// Items under the view point `pos`, topmost first.
    pub fn items_at(&self, pos: Point) -> Vec<ItemId> {
        let Some(v) = self.view() else {
            return Vec::new();
        };
        self.scene
            .items_at_position(v.map_to_scene(pos), Some(self.id))
    }

    /// The topmost item under the view point `pos`.
    pub fn item_at(&self, pos: Point) -> Option<ItemId> {
        self.items_at(pos).first().copied()
    }

    /// Items selected by the view rect `rect` under `mode`, topmost first.
    pub fn items_in_rect(&self, rect: Rect, mode: SelectionMode) -> Vec<ItemId> {
        let Some(v) = self.view() else {
            return Vec::new();
        };
        self.scene.items_in_polygon(
            &v.map_rect_to_scene(rect),
            &QueryOptions {
                mode,
                order: SortOrder::Descending,
                device_transform: Some(v.viewport_transform()),
            },
        )
    }

    /// Tooltip of the topmost item under `pos` that has one.
    pub fn tooltip_at(&self, pos: Point) -> Option<String> {
        self.items_at(pos)
            .into_iter()
            .find_map(|item| self.scene.tooltip(item).map(String::from))
    }
}
