// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-level and view-level input events.
//!
//! A host feeds `View*Event` values (view-local device coordinates) into a
//! [`ViewMut`](crate::ViewMut). The view maps them to scene coordinates and
//! hands [`SceneEvent`]s to the scene, which maps positions into item-local
//! coordinates right before delivering them to each item.

use alloc::string::String;
use alloc::vec::Vec;
use kurbo::{Affine, Point, Vec2};

use crate::types::{
    DropAction, FocusReason, ItemId, Modifiers, MouseButton, MouseButtons, ViewId,
};

/// The phase of a mouse event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    /// A button went down.
    Press,
    /// The cursor moved.
    Move,
    /// A button went up.
    Release,
    /// A second press in quick succession.
    DoubleClick,
}

/// A mouse event as seen by the scene and its items.
#[derive(Clone, Debug, PartialEq)]
pub struct MouseEvent {
    /// Event phase.
    pub kind: MouseEventKind,
    /// Position in the receiving item's local coordinates.
    pub pos: Point,
    /// Position in scene coordinates.
    pub scene_pos: Point,
    /// Position in screen coordinates.
    pub screen_pos: Point,
    /// Previous local position.
    pub last_pos: Point,
    /// Previous scene position.
    pub last_scene_pos: Point,
    /// Previous screen position.
    pub last_screen_pos: Point,
    /// Local positions where each button went down, indexed by [`MouseButton::index`].
    pub button_down_pos: [Point; 5],
    /// Scene positions where each button went down.
    pub button_down_scene_pos: [Point; 5],
    /// Screen positions where each button went down.
    pub button_down_screen_pos: [Point; 5],
    /// The button that caused the event; `None` for moves.
    pub button: Option<MouseButton>,
    /// Buttons held after the event.
    pub buttons: MouseButtons,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
    /// The view the event came from, if any.
    pub view: Option<ViewId>,
    /// Whether the receiver accepted the event.
    pub accepted: bool,
}

impl MouseEvent {
    /// A new event at `scene_pos` with every other position set to the same point.
    pub fn new(kind: MouseEventKind, scene_pos: Point) -> Self {
        Self {
            kind,
            pos: scene_pos,
            scene_pos,
            screen_pos: scene_pos,
            last_pos: scene_pos,
            last_scene_pos: scene_pos,
            last_screen_pos: scene_pos,
            button_down_pos: [scene_pos; 5],
            button_down_scene_pos: [scene_pos; 5],
            button_down_screen_pos: [scene_pos; 5],
            button: None,
            buttons: MouseButtons::empty(),
            modifiers: Modifiers::empty(),
            view: None,
            accepted: false,
        }
    }

    /// Set the button and derive `buttons` from it for presses.
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        match self.kind {
            MouseEventKind::Press | MouseEventKind::DoubleClick => {
                self.buttons |= button.bit();
            }
            MouseEventKind::Release => self.buttons.remove(button.bit()),
            MouseEventKind::Move => {}
        }
        self
    }

    /// Set held buttons.
    pub fn with_buttons(mut self, buttons: MouseButtons) -> Self {
        self.buttons = buttons;
        self
    }

    /// Set modifiers.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Local position where `button` went down.
    pub fn button_down_pos(&self, button: MouseButton) -> Point {
        self.button_down_pos[button.index()]
    }

    /// Scene position where `button` went down.
    pub fn button_down_scene_pos(&self, button: MouseButton) -> Point {
        self.button_down_scene_pos[button.index()]
    }

    /// Screen position where `button` went down.
    pub fn button_down_screen_pos(&self, button: MouseButton) -> Point {
        self.button_down_screen_pos[button.index()]
    }
}

/// The phase of a hover event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HoverEventKind {
    /// The cursor entered the item.
    Enter,
    /// The cursor moved within the item.
    Move,
    /// The cursor left the item.
    Leave,
}

/// A hover event.
#[derive(Clone, Debug, PartialEq)]
pub struct HoverEvent {
    /// Event phase.
    pub kind: HoverEventKind,
    /// Local position.
    pub pos: Point,
    /// Scene position.
    pub scene_pos: Point,
    /// Screen position.
    pub screen_pos: Point,
    /// Previous local position.
    pub last_pos: Point,
    /// Previous scene position.
    pub last_scene_pos: Point,
    /// Previous screen position.
    pub last_screen_pos: Point,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
    /// Whether the receiver accepted the event.
    pub accepted: bool,
}

/// A logical key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character.
    Character(char),
    /// Enter or Return.
    Enter,
    /// Escape.
    Escape,
    /// Tab.
    Tab,
    /// Shift+Tab.
    Backtab,
    /// Backspace.
    Backspace,
    /// Delete.
    Delete,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Any other host key code.
    Other(u32),
}

/// The phase of a key event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyEventKind {
    /// The key went down (or repeated).
    Press,
    /// The key went up.
    Release,
}

/// A key event.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyEvent {
    /// Event phase.
    pub kind: KeyEventKind,
    /// The key.
    pub key: Key,
    /// Text produced by the key, if any.
    pub text: String,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
    /// True for auto-repeated presses.
    pub auto_repeat: bool,
    /// Whether the receiver accepted the event.
    pub accepted: bool,
}

impl KeyEvent {
    /// A key press without text.
    pub fn press(key: Key) -> Self {
        Self {
            kind: KeyEventKind::Press,
            key,
            text: String::new(),
            modifiers: Modifiers::empty(),
            auto_repeat: false,
            accepted: false,
        }
    }

    /// A key release without text.
    pub fn release(key: Key) -> Self {
        Self {
            kind: KeyEventKind::Release,
            ..Self::press(key)
        }
    }
}

/// Wheel orientation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Vertical scrolling.
    #[default]
    Vertical,
    /// Horizontal scrolling.
    Horizontal,
}

/// A wheel event.
#[derive(Clone, Debug, PartialEq)]
pub struct WheelEvent {
    /// Local position.
    pub pos: Point,
    /// Scene position.
    pub scene_pos: Point,
    /// Screen position.
    pub screen_pos: Point,
    /// Held buttons.
    pub buttons: MouseButtons,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
    /// Scroll distance in eighths of a degree (120 per notch).
    pub delta: f64,
    /// Scroll direction.
    pub orientation: Orientation,
    /// Whether the receiver accepted the event.
    pub accepted: bool,
}

/// What triggered a context menu request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContextMenuReason {
    /// A mouse click.
    #[default]
    Mouse,
    /// A keyboard shortcut.
    Keyboard,
    /// Anything else.
    Other,
}

/// A context menu request.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextMenuEvent {
    /// Local position.
    pub pos: Point,
    /// Scene position.
    pub scene_pos: Point,
    /// Screen position.
    pub screen_pos: Point,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
    /// Trigger.
    pub reason: ContextMenuReason,
    /// Whether the receiver accepted the event.
    pub accepted: bool,
}

/// The phase of a drag-and-drop event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DragEventKind {
    /// The drag entered.
    Enter,
    /// The drag moved.
    Move,
    /// The drag left.
    Leave,
    /// The payload was dropped.
    Drop,
}

/// A drag-and-drop event.
#[derive(Clone, Debug, PartialEq)]
pub struct DragDropEvent {
    /// Event phase.
    pub kind: DragEventKind,
    /// Local position.
    pub pos: Point,
    /// Scene position.
    pub scene_pos: Point,
    /// Screen position.
    pub screen_pos: Point,
    /// Held buttons.
    pub buttons: MouseButtons,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
    /// The action the source suggests.
    pub proposed_action: DropAction,
    /// The action the receiver settled on.
    pub drop_action: DropAction,
    /// Payload format names; the payload itself stays with the host.
    pub formats: Vec<String>,
    /// Whether the receiver accepted the event.
    pub accepted: bool,
}

impl DragDropEvent {
    /// A drag event at `scene_pos` proposing `action`.
    pub fn new(kind: DragEventKind, scene_pos: Point, action: DropAction) -> Self {
        Self {
            kind,
            pos: scene_pos,
            scene_pos,
            screen_pos: scene_pos,
            buttons: MouseButtons::empty(),
            modifiers: Modifiers::empty(),
            proposed_action: action,
            drop_action: action,
            formats: Vec::new(),
            accepted: false,
        }
    }

    /// Accept with the proposed action.
    pub fn accept_proposed_action(&mut self) {
        self.drop_action = self.proposed_action;
        self.accepted = true;
    }
}

/// What a touch point did since the last event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TouchPointState {
    /// The finger went down.
    Pressed,
    /// The finger moved.
    Moved,
    /// The finger is down and did not move.
    Stationary,
    /// The finger was lifted.
    Released,
}

/// The kind of device that produced a touch event.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TouchDevice {
    /// Fingers touch the screen; each new point joins the item under it or the
    /// nearest point already down.
    #[default]
    Screen,
    /// Fingers touch a pad; every point goes to the item the first one hit.
    Pad,
}

/// The phase of a touch event, seen from the receiving item.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TouchEventKind {
    /// Every point in the event was just pressed.
    Begin,
    /// Some points moved, were added or were lifted.
    Update,
    /// Every point in the event was lifted.
    End,
}

/// One finger on the device.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchPoint {
    /// Stable id of the finger while it is down.
    pub id: u32,
    /// What the finger did.
    pub state: TouchPointState,
    /// Position in the receiver's local coordinates.
    pub pos: Point,
    /// Position in scene coordinates.
    pub scene_pos: Point,
    /// Position in screen coordinates.
    pub screen_pos: Point,
    /// Local position where the finger went down.
    pub start_pos: Point,
    /// Scene position where the finger went down.
    pub start_scene_pos: Point,
    /// Local position in the previous event.
    pub last_pos: Point,
    /// Scene position in the previous event.
    pub last_scene_pos: Point,
}

impl TouchPoint {
    /// A point at `scene_pos` with every other position derived from it.
    pub fn new(id: u32, state: TouchPointState, scene_pos: Point) -> Self {
        Self {
            id,
            state,
            pos: scene_pos,
            scene_pos,
            screen_pos: scene_pos,
            start_pos: scene_pos,
            start_scene_pos: scene_pos,
            last_pos: scene_pos,
            last_scene_pos: scene_pos,
        }
    }
}

/// A touch event.
///
/// The scene splits the incoming points by target item and sends each item
/// only its own points, with the phase recomputed from their states.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchEvent {
    /// Phase for the receiver.
    pub kind: TouchEventKind,
    /// Source device.
    pub device: TouchDevice,
    /// The points.
    pub points: Vec<TouchPoint>,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
    /// Whether the receiver accepted the event.
    pub accepted: bool,
}

/// A recognized gesture type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GestureKind {
    /// A short tap.
    Tap,
    /// A tap held in place.
    TapAndHold,
    /// A one or two finger pan.
    Pan,
    /// A two finger pinch with scale and rotation.
    Pinch,
    /// A quick swipe.
    Swipe,
    /// An application-defined gesture.
    Custom(u32),
}

/// The phase of a gesture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GestureState {
    /// The gesture was recognized.
    Started,
    /// The gesture continues.
    Updated,
    /// The gesture completed.
    Finished,
    /// The gesture was abandoned.
    Canceled,
}

/// A gesture, as recognized by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureEvent {
    /// Gesture type.
    pub kind: GestureKind,
    /// Phase.
    pub state: GestureState,
    /// Hot spot in the receiver's local coordinates.
    pub pos: Point,
    /// Hot spot in scene coordinates.
    pub scene_pos: Point,
    /// Pan offset since the last update, in scene units.
    pub delta: Vec2,
    /// Pinch scale factor since the gesture started.
    pub scale_factor: f64,
    /// Pinch rotation in degrees since the gesture started.
    pub rotation: f64,
    /// Whether the receiver accepted the gesture.
    pub accepted: bool,
}

/// Text composition from an input method.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputMethodEvent {
    /// Text being composed, shown but not yet committed.
    pub preedit: String,
    /// Text to insert.
    pub commit: String,
    /// Start of the text to replace, relative to the cursor.
    pub replacement_start: i32,
    /// Length of the text to replace.
    pub replacement_length: u32,
    /// Whether the receiver accepted the event.
    pub accepted: bool,
}

impl InputMethodEvent {
    /// Commit `text` with no preedit.
    pub fn commit(text: impl Into<String>) -> Self {
        Self {
            commit: text.into(),
            ..Self::default()
        }
    }

    /// Show `text` as preedit.
    pub fn preedit(text: impl Into<String>) -> Self {
        Self {
            preedit: text.into(),
            ..Self::default()
        }
    }
}

/// An event delivered to an item.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneEvent {
    /// Mouse press, move, release or double click.
    Mouse(MouseEvent),
    /// Hover enter, move or leave.
    Hover(HoverEvent),
    /// Key press or release.
    Key(KeyEvent),
    /// The item gained keyboard focus.
    FocusIn(FocusReason),
    /// The item lost keyboard focus.
    FocusOut(FocusReason),
    /// Wheel rotation.
    Wheel(WheelEvent),
    /// Context menu request.
    ContextMenu(ContextMenuEvent),
    /// Drag and drop.
    DragDrop(DragDropEvent),
    /// Touch begin, update or end.
    Touch(TouchEvent),
    /// A gesture over the item.
    Gesture(GestureEvent),
    /// Input method composition.
    InputMethod(InputMethodEvent),
    /// The item's panel became active.
    WindowActivate,
    /// The item's panel became inactive.
    WindowDeactivate,
    /// A modal panel started blocking this panel.
    WindowBlocked,
    /// A modal panel stopped blocking this panel.
    WindowUnblocked,
    /// The item became the mouse grabber.
    GrabMouse,
    /// The item stopped being the mouse grabber.
    UngrabMouse,
    /// The item became the keyboard grabber.
    GrabKeyboard,
    /// The item stopped being the keyboard grabber.
    UngrabKeyboard,
    /// Deferred initialization after the item entered a scene.
    Polish,
}

impl SceneEvent {
    /// Whether the event carries an accepted flag and it is set.
    pub fn is_accepted(&self) -> bool {
        match self {
            Self::Mouse(e) => e.accepted,
            Self::Hover(e) => e.accepted,
            Self::Key(e) => e.accepted,
            Self::Wheel(e) => e.accepted,
            Self::ContextMenu(e) => e.accepted,
            Self::DragDrop(e) => e.accepted,
            Self::Touch(e) => e.accepted,
            Self::Gesture(e) => e.accepted,
            Self::InputMethod(e) => e.accepted,
            _ => true,
        }
    }

    /// Set the accepted flag, where the event has one.
    pub fn set_accepted(&mut self, accepted: bool) {
        match self {
            Self::Mouse(e) => e.accepted = accepted,
            Self::Hover(e) => e.accepted = accepted,
            Self::Key(e) => e.accepted = accepted,
            Self::Wheel(e) => e.accepted = accepted,
            Self::ContextMenu(e) => e.accepted = accepted,
            Self::DragDrop(e) => e.accepted = accepted,
            Self::Touch(e) => e.accepted = accepted,
            Self::Gesture(e) => e.accepted = accepted,
            Self::InputMethod(e) => e.accepted = accepted,
            _ => {}
        }
    }

    /// Scene position of positional events.
    pub fn scene_pos(&self) -> Option<Point> {
        match self {
            Self::Mouse(e) => Some(e.scene_pos),
            Self::Hover(e) => Some(e.scene_pos),
            Self::Wheel(e) => Some(e.scene_pos),
            Self::ContextMenu(e) => Some(e.scene_pos),
            Self::DragDrop(e) => Some(e.scene_pos),
            Self::Touch(e) => e.points.first().map(|p| p.scene_pos),
            Self::Gesture(e) => Some(e.scene_pos),
            _ => None,
        }
    }

    /// Recompute local positions from scene positions with `scene_to_local`.
    pub fn map_positions(&mut self, scene_to_local: Affine) {
        match self {
            Self::Mouse(e) => {
                e.pos = scene_to_local * e.scene_pos;
                e.last_pos = scene_to_local * e.last_scene_pos;
                for (local, scene) in e.button_down_pos.iter_mut().zip(e.button_down_scene_pos) {
                    *local = scene_to_local * scene;
                }
            }
            Self::Hover(e) => {
                e.pos = scene_to_local * e.scene_pos;
                e.last_pos = scene_to_local * e.last_scene_pos;
            }
            Self::Wheel(e) => e.pos = scene_to_local * e.scene_pos,
            Self::ContextMenu(e) => e.pos = scene_to_local * e.scene_pos,
            Self::DragDrop(e) => e.pos = scene_to_local * e.scene_pos,
            Self::Touch(e) => {
                for p in &mut e.points {
                    p.pos = scene_to_local * p.scene_pos;
                    p.start_pos = scene_to_local * p.start_scene_pos;
                    p.last_pos = scene_to_local * p.last_scene_pos;
                }
            }
            Self::Gesture(e) => e.pos = scene_to_local * e.scene_pos,
            _ => {}
        }
    }

    /// True for hover enter/leave and drag enter/leave, which are not forwarded
    /// to ancestors that handle child events.
    pub(crate) fn is_enter_or_leave(&self) -> bool {
        matches!(
            self,
            Self::Hover(HoverEvent {
                kind: HoverEventKind::Enter | HoverEventKind::Leave,
                ..
            }) | Self::DragDrop(DragDropEvent {
                kind: DragEventKind::Enter | DragEventKind::Leave,
                ..
            })
        )
    }
}

/// A mouse event in view coordinates, as delivered by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewMouseEvent {
    /// Event phase.
    pub kind: MouseEventKind,
    /// Position in view (viewport) coordinates.
    pub pos: Point,
    /// Position in screen coordinates.
    pub screen_pos: Point,
    /// The button that caused the event; `None` for moves.
    pub button: Option<MouseButton>,
    /// Buttons held after the event.
    pub buttons: MouseButtons,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
}

impl ViewMouseEvent {
    /// A press of `button` at `pos`. The screen position equals `pos`.
    pub fn press(pos: Point, button: MouseButton) -> Self {
        Self {
            kind: MouseEventKind::Press,
            pos,
            screen_pos: pos,
            button: Some(button),
            buttons: button.bit(),
            modifiers: Modifiers::empty(),
        }
    }

    /// A move to `pos` with `buttons` held.
    pub fn moved(pos: Point, buttons: MouseButtons) -> Self {
        Self {
            kind: MouseEventKind::Move,
            pos,
            screen_pos: pos,
            button: None,
            buttons,
            modifiers: Modifiers::empty(),
        }
    }

    /// A release of `button` at `pos` with no buttons left held.
    pub fn release(pos: Point, button: MouseButton) -> Self {
        Self {
            kind: MouseEventKind::Release,
            pos,
            screen_pos: pos,
            button: Some(button),
            buttons: MouseButtons::empty(),
            modifiers: Modifiers::empty(),
        }
    }

    /// A double click of `button` at `pos`.
    pub fn double_click(pos: Point, button: MouseButton) -> Self {
        Self {
            kind: MouseEventKind::DoubleClick,
            ..Self::press(pos, button)
        }
    }

    /// Set modifiers.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// A wheel event in view coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewWheelEvent {
    /// Position in view coordinates.
    pub pos: Point,
    /// Position in screen coordinates.
    pub screen_pos: Point,
    /// Scroll amount in eighths of a degree; `x` horizontal, `y` vertical.
    pub delta: Vec2,
    /// Held buttons.
    pub buttons: MouseButtons,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
}

/// A context menu request in view coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewContextMenuEvent {
    /// Position in view coordinates.
    pub pos: Point,
    /// Position in screen coordinates.
    pub screen_pos: Point,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
    /// Trigger.
    pub reason: ContextMenuReason,
}

/// A drag-and-drop event in view coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewDragEvent {
    /// Event phase.
    pub kind: DragEventKind,
    /// Position in view coordinates.
    pub pos: Point,
    /// Position in screen coordinates.
    pub screen_pos: Point,
    /// Held buttons.
    pub buttons: MouseButtons,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
    /// Suggested action.
    pub proposed_action: DropAction,
    /// Payload format names.
    pub formats: Vec<String>,
}

/// One finger in view coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewTouchPoint {
    /// Stable id of the finger while it is down.
    pub id: u32,
    /// What the finger did.
    pub state: TouchPointState,
    /// Position in view coordinates.
    pub pos: Point,
    /// Position in screen coordinates.
    pub screen_pos: Point,
}

/// A touch event in view coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewTouchEvent {
    /// Source device.
    pub device: TouchDevice,
    /// Every point currently known to the device.
    pub points: Vec<ViewTouchPoint>,
    /// Keyboard modifiers.
    pub modifiers: Modifiers,
}

/// A gesture in view coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewGestureEvent {
    /// Gesture type.
    pub kind: GestureKind,
    /// Phase.
    pub state: GestureState,
    /// Hot spot in view coordinates.
    pub hot_spot: Point,
    /// Pan offset since the last update, in view pixels.
    pub delta: Vec2,
    /// Pinch scale factor since the gesture started.
    pub scale_factor: f64,
    /// Pinch rotation in degrees since the gesture started.
    pub rotation: f64,
}

/// A queued observer notification, drained with
/// [`Scene::take_notifications`](crate::Scene::take_notifications).
#[derive(Clone, Debug, PartialEq)]
pub enum SceneNotification {
    /// Scene regions changed (only with changed-region tracking on).
    Changed(Vec<kurbo::Rect>),
    /// The selection changed.
    SelectionChanged,
    /// The scene rect changed.
    SceneRectChanged(kurbo::Rect),
    /// The focus item changed.
    FocusItemChanged {
        /// New focus item.
        new: Option<ItemId>,
        /// Previous focus item.
        old: Option<ItemId>,
        /// Why focus moved.
        reason: FocusReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_positions_updates_button_down_points() {
        let mut e = MouseEvent::new(MouseEventKind::Move, Point::new(10.0, 10.0));
        e.button_down_scene_pos[MouseButton::Left.index()] = Point::new(4.0, 4.0);
        let mut ev = SceneEvent::Mouse(e);
        ev.map_positions(Affine::translate((-2.0, -2.0)));
        let SceneEvent::Mouse(e) = ev else {
            panic!("still a mouse event");
        };
        assert_eq!(e.pos, Point::new(8.0, 8.0), "local position");
        assert_eq!(
            e.button_down_pos(MouseButton::Left),
            Point::new(2.0, 2.0),
            "button down position follows"
        );
    }

    #[test]
    fn release_clears_its_button() {
        let e = MouseEvent::new(MouseEventKind::Release, Point::ZERO)
            .with_buttons(MouseButtons::LEFT | MouseButtons::RIGHT)
            .with_button(MouseButton::Left);
        assert_eq!(e.buttons, MouseButtons::RIGHT, "left released");
    }

    #[test]
    fn accepted_flag_round_trip() {
        let mut ev = SceneEvent::Key(KeyEvent::press(Key::Enter));
        assert!(!ev.is_accepted(), "fresh key events are not accepted");
        ev.set_accepted(true);
        assert!(ev.is_accepted(), "accepted after set");
        assert!(SceneEvent::Polish.is_accepted(), "flagless events count as accepted");
    }
}
