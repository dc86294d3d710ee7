// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: handles, flags, and small enums shared by items, scenes and views.

/// Identifier for an item in a [`Scene`](crate::Scene).
///
/// A small, copyable handle made of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On removal, the slot is freed; every `ItemId` pointing at it is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `ItemId`.
///
/// Stale handles never alias a different live item because the generation must
/// match. Every scene operation taking a stale handle is a no-op (or returns an
/// empty result); use [`Scene::is_alive`](crate::Scene::is_alive) to check.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) u32, pub(crate) u32);

impl ItemId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

/// Identifier for a [`View`](crate::View) attached to a scene.
///
/// Same generational scheme as [`ItemId`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ViewId(pub(crate) u32, pub(crate) u32);

impl ViewId {
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Per-item behaviour flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ItemFlags: u32 {
        /// The item can be dragged with the mouse; dragging moves every selected movable item.
        const MOVABLE = 1 << 0;
        /// The item can be selected by clicking or by an area selection.
        const SELECTABLE = 1 << 1;
        /// The item accepts keyboard focus.
        const FOCUSABLE = 1 << 2;
        /// Painting and hit testing are clipped to the item's own shape.
        const CLIPS_TO_SHAPE = 1 << 3;
        /// Descendants are clipped to this item's shape.
        const CLIPS_CHILDREN_TO_SHAPE = 1 << 4;
        /// The item ignores inherited view transformations (it keeps its size on screen).
        const IGNORES_TRANSFORMATIONS = 1 << 5;
        /// The item does not inherit its parent's opacity.
        const IGNORES_PARENT_OPACITY = 1 << 6;
        /// Children do not inherit this item's opacity.
        const DOESNT_PROPAGATE_OPACITY_TO_CHILDREN = 1 << 7;
        /// The item is painted before (behind) its parent.
        const STACKS_BEHIND_PARENT = 1 << 8;
        /// A negative z-value automatically sets [`ItemFlags::STACKS_BEHIND_PARENT`].
        const NEGATIVE_Z_STACKS_BEHIND_PARENT = 1 << 9;
        /// The item is a panel: a subtree root that can be active and modal.
        const IS_PANEL = 1 << 10;
        /// The item is a focus scope that remembers its last focused descendant.
        const IS_FOCUS_SCOPE = 1 << 11;
        /// Geometry changes (position, transform) are announced to the change hook.
        const SENDS_GEOMETRY_CHANGES = 1 << 12;
        /// Scene position changes are announced to the change hook.
        const SENDS_SCENE_POSITION_CHANGES = 1 << 13;
        /// The item accepts input method events.
        const ACCEPTS_INPUT_METHOD = 1 << 14;
        /// A click on the item does not propagate focus to focusable ancestors.
        const STOPS_CLICK_FOCUS_PROPAGATION = 1 << 15;
        /// A click on the item never changes focus.
        const STOPS_FOCUS_HANDLING = 1 << 16;
        /// The item paints nothing; dirty processing skips it.
        const HAS_NO_CONTENTS = 1 << 17;
    }
}

impl Default for ItemFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags::bitflags! {
    /// Flags derived from ancestors, maintained incrementally when flags or parents change.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub(crate) struct AncestorFlags: u8 {
        /// Some ancestor handles child events.
        const HANDLES_CHILD_EVENTS = 1 << 0;
        /// Some ancestor clips its children.
        const CLIPS_CHILDREN = 1 << 1;
        /// Some ancestor ignores transformations.
        const IGNORES_TRANSFORMATIONS = 1 << 2;
        /// Some ancestor filters child events.
        const FILTERS_CHILD_EVENTS = 1 << 3;
    }
}

/// Panel modality.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PanelModality {
    /// The panel does not block anything.
    #[default]
    NonModal,
    /// Blocks its ancestors and every item sharing a common ancestor with it,
    /// except its own descendants.
    PanelModal,
    /// Blocks every item that is not the panel or one of its descendants.
    SceneModal,
}

/// How a selection area or collision shape is compared against items.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    /// The item's shape intersects the area.
    #[default]
    IntersectsShape,
    /// The item's shape lies entirely inside the area.
    ContainsShape,
    /// The item's bounding rect intersects the area.
    IntersectsBoundingRect,
    /// The item's bounding rect lies entirely inside the area.
    ContainsBoundingRect,
}

impl SelectionMode {
    pub(crate) fn uses_shape(self) -> bool {
        matches!(self, Self::IntersectsShape | Self::ContainsShape)
    }

    pub(crate) fn is_contains(self) -> bool {
        matches!(self, Self::ContainsShape | Self::ContainsBoundingRect)
    }
}

/// A mouse button.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Middle button or wheel click.
    Middle,
    /// First extra button.
    Back,
    /// Second extra button.
    Forward,
}

impl MouseButton {
    /// All buttons, in bit order.
    pub const ALL: [Self; 5] = [
        Self::Left,
        Self::Right,
        Self::Middle,
        Self::Back,
        Self::Forward,
    ];

    /// Position of this button in per-button arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Middle => 2,
            Self::Back => 3,
            Self::Forward => 4,
        }
    }

    /// The single-bit set for this button.
    pub const fn bit(self) -> MouseButtons {
        match self {
            Self::Left => MouseButtons::LEFT,
            Self::Right => MouseButtons::RIGHT,
            Self::Middle => MouseButtons::MIDDLE,
            Self::Back => MouseButtons::BACK,
            Self::Forward => MouseButtons::FORWARD,
        }
    }
}

bitflags::bitflags! {
    /// A set of mouse buttons.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u8 {
        /// Primary button.
        const LEFT = 1 << 0;
        /// Secondary button.
        const RIGHT = 1 << 1;
        /// Middle button.
        const MIDDLE = 1 << 2;
        /// First extra button.
        const BACK = 1 << 3;
        /// Second extra button.
        const FORWARD = 1 << 4;
    }
}

impl MouseButtons {
    /// Iterate the individual buttons contained in this set.
    pub fn iter_buttons(self) -> impl Iterator<Item = MouseButton> {
        MouseButton::ALL
            .into_iter()
            .filter(move |b| self.contains(b.bit()))
    }
}

bitflags::bitflags! {
    /// Keyboard modifiers held during an input event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Shift.
        const SHIFT = 1 << 0;
        /// Control (Command on macOS hosts that remap it).
        const CONTROL = 1 << 1;
        /// Alt / Option.
        const ALT = 1 << 2;
        /// Meta / Super.
        const META = 1 << 3;
    }
}

/// Why keyboard focus moved.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FocusReason {
    /// A mouse click.
    Mouse,
    /// Tab navigation.
    Tab,
    /// Reverse tab navigation.
    Backtab,
    /// The window or panel became active.
    ActiveWindow,
    /// A popup opened or closed.
    Popup,
    /// A keyboard shortcut.
    Shortcut,
    /// Anything else, including programmatic focus changes.
    #[default]
    Other,
}

/// Cursor shape requested by an item. The host maps it to a native cursor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CursorShape {
    /// The standard arrow.
    #[default]
    Arrow,
    /// A crosshair.
    Cross,
    /// A text insertion beam.
    IBeam,
    /// A busy indicator.
    Wait,
    /// A pointing hand, typically over links.
    PointingHand,
    /// An open hand, used for draggable content.
    OpenHand,
    /// A closed hand, used while dragging content.
    ClosedHand,
    /// Vertical resize.
    SizeVertical,
    /// Horizontal resize.
    SizeHorizontal,
    /// Move in all directions.
    SizeAll,
    /// Action not allowed.
    Forbidden,
}

/// The outcome of a drag-and-drop operation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DropAction {
    /// The drop is refused.
    #[default]
    Ignore,
    /// The data is copied.
    Copy,
    /// The data is moved.
    Move,
    /// A link to the data is created.
    Link,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn button_bits_round_trip() {
        let set = MouseButtons::LEFT | MouseButtons::MIDDLE;
        let buttons: Vec<_> = set.iter_buttons().collect();
        assert_eq!(
            buttons,
            [MouseButton::Left, MouseButton::Middle],
            "buttons come out in bit order"
        );
        for b in MouseButton::ALL {
            assert_eq!(
                MouseButton::ALL[b.index()],
                b,
                "index and ALL agree for {b:?}"
            );
        }
    }

    #[test]
    fn selection_mode_predicates() {
        assert!(SelectionMode::ContainsShape.uses_shape(), "shape mode");
        assert!(
            !SelectionMode::IntersectsBoundingRect.uses_shape(),
            "bounding rect mode"
        );
        assert!(SelectionMode::ContainsBoundingRect.is_contains(), "contains mode");
        assert!(!SelectionMode::IntersectsShape.is_contains(), "intersects mode");
    }
}
