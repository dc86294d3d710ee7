// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-item behaviour: event handlers and change hooks.
//!
//! An [`ItemHandler`] receives events through an [`EventContext`], which
//! carries `&mut Scene`, so handlers may call back into any scene API. Every
//! method has a default that reproduces the built-in item behaviour
//! (selection on click, dragging movable items, and so on); override only
//! what you need and call the `EventContext::default_*` helpers to chain.
//!
//! An [`ItemChangeHook`] observes property changes. It only ever sees `&Scene`;
//! it adjusts a proposed value by returning a different one.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Debug;
use kurbo::{Affine, Point};

use crate::events::{
    ContextMenuEvent, DragDropEvent, GestureEvent, HoverEvent, HoverEventKind, InputMethodEvent,
    KeyEvent, KeyEventKind, MouseEvent, MouseEventKind, SceneEvent, TouchEvent, WheelEvent,
};
use crate::scene::Scene;
use crate::transform::TransformOp;
use crate::types::{
    CursorShape, FocusReason, ItemFlags, ItemId, Modifiers, MouseButton, MouseButtons,
    PanelModality,
};

/// A property change, proposed to [`ItemChangeHook::item_changing`] and
/// reported to [`ItemChangeHook::item_changed`].
#[derive(Clone, Debug, PartialEq)]
pub enum ItemChange {
    /// Position in parent coordinates. Requires [`ItemFlags::SENDS_GEOMETRY_CHANGES`].
    Position(Point),
    /// Base transform. Requires [`ItemFlags::SENDS_GEOMETRY_CHANGES`].
    Transform(Affine),
    /// Rotation in degrees. Requires [`ItemFlags::SENDS_GEOMETRY_CHANGES`].
    Rotation(f64),
    /// Uniform scale. Requires [`ItemFlags::SENDS_GEOMETRY_CHANGES`].
    Scale(f64),
    /// Transform origin. Requires [`ItemFlags::SENDS_GEOMETRY_CHANGES`].
    TransformOrigin(Point),
    /// Additional transform operations. Requires [`ItemFlags::SENDS_GEOMETRY_CHANGES`].
    TransformOps(Vec<TransformOp>),
    /// Item flags.
    Flags(ItemFlags),
    /// Stacking value.
    ZValue(f64),
    /// Local opacity.
    Opacity(f64),
    /// Explicit visibility.
    Visible(bool),
    /// Explicit enabled state.
    Enabled(bool),
    /// Selection state.
    Selected(bool),
    /// Parent item.
    Parent(Option<ItemId>),
    /// Cursor shape.
    Cursor(Option<CursorShape>),
    /// Tooltip text.
    ToolTip(Option<String>),
    /// Focus proxy.
    FocusProxy(Option<ItemId>),
    /// Panel modality.
    PanelModality(PanelModality),
    /// Scene position; reported only, and only with
    /// [`ItemFlags::SENDS_SCENE_POSITION_CHANGES`].
    ScenePosition(Point),
    /// A child was added; reported to the parent only.
    ChildAdded(ItemId),
    /// A child was removed; reported to the parent only.
    ChildRemoved(ItemId),
}

/// Observer of item property changes.
///
/// `item_changing` returns the value that will actually be applied. Returning
/// a different variant than the one proposed is a contract violation; the
/// proposal is used instead and a warning is logged.
pub trait ItemChangeHook {
    /// Adjust or veto a proposed change. The default accepts it unchanged.
    fn item_changing(&mut self, scene: &Scene, item: ItemId, change: ItemChange) -> ItemChange {
        let _ = (scene, item);
        change
    }

    /// Observe a change after it was applied.
    fn item_changed(&mut self, scene: &Scene, item: ItemId, change: &ItemChange) {
        let _ = (scene, item, change);
    }
}

impl<F> ItemChangeHook for F
where
    F: FnMut(&Scene, ItemId, ItemChange) -> ItemChange,
{
    fn item_changing(&mut self, scene: &Scene, item: ItemId, change: ItemChange) -> ItemChange {
        self(scene, item, change)
    }
}

/// Access to the scene while an item handles an event.
///
/// The handler that is currently running has been detached from its item, so
/// events the handler causes for its own item use the built-in behaviour.
pub struct EventContext<'a> {
    scene: &'a mut Scene,
    item: ItemId,
}

impl Debug for EventContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventContext")
            .field("item", &self.item)
            .finish_non_exhaustive()
    }
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(scene: &'a mut Scene, item: ItemId) -> Self {
        Self { scene, item }
    }

    /// The item receiving the event.
    pub fn item(&self) -> ItemId {
        self.item
    }

    /// Shared access to the scene.
    pub fn scene(&self) -> &Scene {
        self.scene
    }

    /// Mutable access to the scene.
    pub fn scene_mut(&mut self) -> &mut Scene {
        self.scene
    }

    /// Schedule a repaint of the whole item.
    pub fn update(&mut self) {
        self.scene.update_item(self.item);
    }

    /// Built-in press behaviour: a left click selects a selectable item
    /// (clearing other selections unless Control is held). Presses on items
    /// that are neither selectable nor movable are ignored.
    pub fn default_mouse_press(&mut self, event: &mut MouseEvent) {
        let Some(flags) = self.scene.flags(self.item) else {
            return;
        };
        if event.button == Some(MouseButton::Left) && flags.contains(ItemFlags::SELECTABLE) {
            let multi = event.modifiers.contains(Modifiers::CONTROL);
            if !multi && !self.scene.is_selected(self.item) {
                self.scene.begin_selection_change();
                self.scene.clear_selection();
                self.scene.set_selected(self.item, true);
                self.scene.end_selection_change();
            }
        } else if !flags.contains(ItemFlags::MOVABLE) {
            event.accepted = false;
        }
    }

    /// Built-in move behaviour: dragging with the left button moves this item
    /// and every other selected movable item by the same scene delta.
    pub fn default_mouse_move(&mut self, event: &mut MouseEvent) {
        let movable = self
            .scene
            .flags(self.item)
            .is_some_and(|f| f.contains(ItemFlags::MOVABLE));
        if event.buttons.contains(MouseButtons::LEFT) && movable {
            self.scene.move_selected_items(self.item, event);
        } else {
            event.accepted = false;
        }
    }

    /// Built-in release behaviour: a click without movement on a selectable
    /// item makes it the only selected item, or toggles it with Control.
    pub fn default_mouse_release(&mut self, event: &mut MouseEvent) {
        let selectable = self
            .scene
            .flags(self.item)
            .is_some_and(|f| f.contains(ItemFlags::SELECTABLE));
        if event.button == Some(MouseButton::Left)
            && selectable
            && event.scene_pos == event.button_down_scene_pos(MouseButton::Left)
        {
            if event.modifiers.contains(Modifiers::CONTROL) {
                let selected = self.scene.is_selected(self.item);
                self.scene.set_selected(self.item, !selected);
            } else {
                self.scene.select_only(self.item);
            }
        }
        if event.buttons.is_empty() {
            self.scene.clear_moving_items();
        }
    }
}

/// Event handler for one item.
///
/// Positional events arrive with `pos` already mapped into the item's local
/// coordinates. The scene marks events accepted before delivery; a handler
/// ignores an event by clearing its `accepted` flag.
pub trait ItemHandler {
    /// A mouse button went down over the item.
    fn mouse_press(&mut self, cx: &mut EventContext<'_>, event: &mut MouseEvent) {
        cx.default_mouse_press(event);
    }

    /// The mouse moved while the item is the mouse grabber.
    fn mouse_move(&mut self, cx: &mut EventContext<'_>, event: &mut MouseEvent) {
        cx.default_mouse_move(event);
    }

    /// A mouse button went up while the item is the mouse grabber.
    fn mouse_release(&mut self, cx: &mut EventContext<'_>, event: &mut MouseEvent) {
        cx.default_mouse_release(event);
    }

    /// A double click. Behaves like a press unless overridden.
    fn mouse_double_click(&mut self, cx: &mut EventContext<'_>, event: &mut MouseEvent) {
        self.mouse_press(cx, event);
    }

    /// The cursor entered the item.
    fn hover_enter(&mut self, cx: &mut EventContext<'_>, event: &mut HoverEvent) {
        let _ = event;
        cx.update();
    }

    /// The cursor moved over the item.
    fn hover_move(&mut self, cx: &mut EventContext<'_>, event: &mut HoverEvent) {
        let _ = (cx, event);
    }

    /// The cursor left the item.
    fn hover_leave(&mut self, cx: &mut EventContext<'_>, event: &mut HoverEvent) {
        let _ = event;
        cx.update();
    }

    /// A key went down while the item has focus or the keyboard grab.
    fn key_press(&mut self, cx: &mut EventContext<'_>, event: &mut KeyEvent) {
        let _ = cx;
        event.accepted = false;
    }

    /// A key went up.
    fn key_release(&mut self, cx: &mut EventContext<'_>, event: &mut KeyEvent) {
        let _ = cx;
        event.accepted = false;
    }

    /// The item gained focus.
    fn focus_in(&mut self, cx: &mut EventContext<'_>, reason: FocusReason) {
        let _ = reason;
        cx.update();
    }

    /// The item lost focus.
    fn focus_out(&mut self, cx: &mut EventContext<'_>, reason: FocusReason) {
        let _ = reason;
        cx.update();
    }

    /// Wheel rotation over the item.
    fn wheel(&mut self, cx: &mut EventContext<'_>, event: &mut WheelEvent) {
        let _ = cx;
        event.accepted = false;
    }

    /// Context menu request over the item.
    fn context_menu(&mut self, cx: &mut EventContext<'_>, event: &mut ContextMenuEvent) {
        let _ = cx;
        event.accepted = false;
    }

    /// Drag enter, move, leave or drop. Ignored by default.
    fn drag_drop(&mut self, cx: &mut EventContext<'_>, event: &mut DragDropEvent) {
        let _ = cx;
        event.accepted = false;
    }

    /// Touch points that belong to the item. Ignored by default, and an
    /// ignored begin leaves the points to the next item underneath.
    fn touch(&mut self, cx: &mut EventContext<'_>, event: &mut TouchEvent) {
        let _ = cx;
        event.accepted = false;
    }

    /// A gesture the item grabbed. Ignored by default.
    fn gesture(&mut self, cx: &mut EventContext<'_>, event: &mut GestureEvent) {
        let _ = cx;
        event.accepted = false;
    }

    /// Input method composition while the item has focus. Ignored by default.
    fn input_method(&mut self, cx: &mut EventContext<'_>, event: &mut InputMethodEvent) {
        let _ = cx;
        event.accepted = false;
    }

    /// Any event without a dedicated method (grab and activation notices, polish).
    fn item_event(&mut self, cx: &mut EventContext<'_>, event: &SceneEvent) {
        let _ = (cx, event);
    }

    /// Inspect an event addressed to `watched` before it is delivered.
    ///
    /// Called when this item was installed as a scene event filter on
    /// `watched`, or when it filters child events and `watched` is a
    /// descendant. Return `true` to stop delivery.
    fn scene_event_filter(
        &mut self,
        cx: &mut EventContext<'_>,
        watched: ItemId,
        event: &mut SceneEvent,
    ) -> bool {
        let _ = (cx, watched, event);
        false
    }
}

/// The handler used by items that do not install one.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct DefaultHandler;

impl ItemHandler for DefaultHandler {}

/// Route `event` to the matching handler method.
pub(crate) fn dispatch(handler: &mut dyn ItemHandler, cx: &mut EventContext<'_>, event: &mut SceneEvent) {
    match event {
        SceneEvent::Mouse(e) => match e.kind {
            MouseEventKind::Press => handler.mouse_press(cx, e),
            MouseEventKind::Move => handler.mouse_move(cx, e),
            MouseEventKind::Release => handler.mouse_release(cx, e),
            MouseEventKind::DoubleClick => handler.mouse_double_click(cx, e),
        },
        SceneEvent::Hover(e) => match e.kind {
            HoverEventKind::Enter => handler.hover_enter(cx, e),
            HoverEventKind::Move => handler.hover_move(cx, e),
            HoverEventKind::Leave => handler.hover_leave(cx, e),
        },
        SceneEvent::Key(e) => match e.kind {
            KeyEventKind::Press => handler.key_press(cx, e),
            KeyEventKind::Release => handler.key_release(cx, e),
        },
        SceneEvent::FocusIn(reason) => handler.focus_in(cx, *reason),
        SceneEvent::FocusOut(reason) => handler.focus_out(cx, *reason),
        SceneEvent::Wheel(e) => handler.wheel(cx, e),
        SceneEvent::ContextMenu(e) => handler.context_menu(cx, e),
        SceneEvent::DragDrop(e) => handler.drag_drop(cx, e),
        SceneEvent::Touch(e) => handler.touch(cx, e),
        SceneEvent::Gesture(e) => handler.gesture(cx, e),
        SceneEvent::InputMethod(e) => handler.input_method(cx, e),
        other => handler.item_event(cx, other),
    }
}
