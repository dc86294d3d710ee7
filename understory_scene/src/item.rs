// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Detached items and the arena node they become inside a scene.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt::Debug;
use kurbo::{Affine, Point, Rect};

use crate::content::Content;
use crate::events::GestureKind;
use crate::handler::{ItemChangeHook, ItemHandler};
use crate::transform::{ItemTransform, TransformOp};
use crate::types::{
    AncestorFlags, CursorShape, ItemFlags, ItemId, MouseButtons, PanelModality,
};

/// An item that is not (yet) part of a scene.
///
/// Build one with the `with_*` methods, then hand it to
/// [`Scene::add_item`](crate::Scene::add_item) or
/// [`Scene::add_child`](crate::Scene::add_child). Children added with
/// [`Item::with_child`] enter the scene together with their parent.
/// [`Scene::remove_item`](crate::Scene::remove_item) hands the subtree back
/// as an `Item` again.
pub struct Item {
    pub(crate) content: Content,
    pub(crate) pos: Point,
    pub(crate) transform: ItemTransform,
    pub(crate) z: f64,
    pub(crate) flags: ItemFlags,
    pub(crate) opacity: f64,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    pub(crate) selected: bool,
    pub(crate) accepts_hover: bool,
    pub(crate) accepted_buttons: MouseButtons,
    pub(crate) accepts_drops: bool,
    pub(crate) accepts_touch: bool,
    pub(crate) gestures: Vec<GestureKind>,
    pub(crate) handles_child_events: bool,
    pub(crate) filters_child_events: bool,
    pub(crate) modality: PanelModality,
    pub(crate) cursor: Option<CursorShape>,
    pub(crate) tooltip: Option<String>,
    pub(crate) handler: Option<Box<dyn ItemHandler>>,
    pub(crate) hook: Option<Box<dyn ItemChangeHook>>,
    pub(crate) children: Vec<Self>,
}

impl Debug for Item {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Item")
            .field("content", &self.content)
            .field("pos", &self.pos)
            .field("z", &self.z)
            .field("flags", &self.flags)
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

impl Default for Item {
    fn default() -> Self {
        Self::new(Content::Empty)
    }
}

impl Item {
    /// A visible, enabled item showing `content` at the origin.
    pub fn new(content: Content) -> Self {
        Self {
            content,
            pos: Point::ZERO,
            transform: ItemTransform::default(),
            z: 0.0,
            flags: ItemFlags::empty(),
            opacity: 1.0,
            visible: true,
            enabled: true,
            selected: false,
            accepts_hover: false,
            accepted_buttons: MouseButtons::all(),
            accepts_drops: false,
            accepts_touch: false,
            gestures: Vec::new(),
            handles_child_events: false,
            filters_child_events: false,
            modality: PanelModality::NonModal,
            cursor: None,
            tooltip: None,
            handler: None,
            hook: None,
            children: Vec::new(),
        }
    }

    /// The content.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Position in parent coordinates.
    pub fn pos(&self) -> Point {
        self.pos
    }

    /// Flags.
    pub fn flags(&self) -> ItemFlags {
        self.flags
    }

    /// Detached children.
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Set the position in parent coordinates.
    pub fn with_pos(mut self, pos: impl Into<Point>) -> Self {
        self.pos = pos.into();
        self
    }

    /// Set the stacking value.
    pub fn with_z(mut self, z: f64) -> Self {
        self.z = z;
        self
    }

    /// Set flags.
    pub fn with_flags(mut self, flags: ItemFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the base transform.
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform.base = transform;
        self
    }

    /// Append an additional transform operation.
    pub fn with_op(mut self, op: TransformOp) -> Self {
        self.transform.ops.push(op);
        self
    }

    /// Set the rotation in degrees.
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.transform.rotation = degrees;
        self
    }

    /// Set the uniform scale.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.transform.scale = scale;
        self
    }

    /// Set the origin of rotation and scale.
    pub fn with_transform_origin(mut self, origin: impl Into<Point>) -> Self {
        self.transform.origin = origin.into();
        self
    }

    /// Set the local opacity, clamped to `0..=1`.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Set explicit visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set the explicit enabled state.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Start out selected (only honoured for selectable items).
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Receive hover events.
    pub fn with_accepts_hover(mut self, accepts: bool) -> Self {
        self.accepts_hover = accepts;
        self
    }

    /// Receive touch events.
    pub fn with_accepts_touch(mut self, accepts: bool) -> Self {
        self.accepts_touch = accepts;
        self
    }

    /// Receive gestures of `kind` that start over the item.
    pub fn with_gesture(mut self, kind: GestureKind) -> Self {
        if !self.gestures.contains(&kind) {
            self.gestures.push(kind);
        }
        self
    }

    /// Restrict which mouse buttons the item accepts presses for.
    pub fn with_accepted_buttons(mut self, buttons: MouseButtons) -> Self {
        self.accepted_buttons = buttons;
        self
    }

    /// Receive drag-and-drop events.
    pub fn with_accepts_drops(mut self, accepts: bool) -> Self {
        self.accepts_drops = accepts;
        self
    }

    /// Receive the events of all descendants instead of them.
    pub fn with_handles_child_events(mut self, handles: bool) -> Self {
        self.handles_child_events = handles;
        self
    }

    /// Filter the events of all descendants through this item's handler.
    pub fn with_filters_child_events(mut self, filters: bool) -> Self {
        self.filters_child_events = filters;
        self
    }

    /// Set the panel modality (meaningful with [`ItemFlags::IS_PANEL`]).
    pub fn with_panel_modality(mut self, modality: PanelModality) -> Self {
        self.modality = modality;
        self
    }

    /// Set the cursor shown over the item.
    pub fn with_cursor(mut self, cursor: CursorShape) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Set the tooltip.
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Install an event handler.
    pub fn with_handler(mut self, handler: impl ItemHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Install a change hook.
    pub fn with_hook(mut self, hook: impl ItemChangeHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Append a detached child.
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }
}

/// Children of one parent (or the scene's top-level list) with lazy stacking order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Siblings {
    pub(crate) ids: Vec<ItemId>,
    /// `ids` must be re-sorted by stacking order before use.
    pub(crate) needs_sort: bool,
    /// Sibling indices have gaps after a removal.
    pub(crate) holes: bool,
}

impl Siblings {
    pub(crate) fn new() -> Self {
        Self {
            ids: Vec::new(),
            needs_sort: false,
            holes: false,
        }
    }
}

/// Per-item dirty state consumed by the scene's dirty pass.
#[derive(Clone, Debug, Default)]
pub(crate) struct DirtyState {
    pub(crate) dirty: bool,
    pub(crate) full_update_pending: bool,
    pub(crate) needs_repaint: Option<Rect>,
    pub(crate) dirty_children: bool,
    pub(crate) all_children_dirty: bool,
    pub(crate) ignore_visible: bool,
    pub(crate) ignore_opacity: bool,
    pub(crate) painted_view_rects_need_repaint: bool,
    pub(crate) geometry_changed: bool,
}

impl DirtyState {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// An item living in the scene arena.
pub(crate) struct Node {
    pub(crate) generation: u32,
    pub(crate) parent: Option<ItemId>,
    pub(crate) children: Siblings,
    pub(crate) sibling_index: usize,
    pub(crate) content: Content,
    pub(crate) pos: Point,
    pub(crate) transform: ItemTransform,
    pub(crate) z: f64,
    pub(crate) flags: ItemFlags,
    pub(crate) ancestor_flags: AncestorFlags,
    pub(crate) opacity: f64,
    pub(crate) explicitly_hidden: bool,
    pub(crate) visible: bool,
    pub(crate) explicitly_disabled: bool,
    pub(crate) enabled: bool,
    pub(crate) selected: bool,
    pub(crate) accepts_hover: bool,
    pub(crate) accepted_buttons: MouseButtons,
    pub(crate) accepts_drops: bool,
    pub(crate) accepts_touch: bool,
    pub(crate) gestures: Vec<GestureKind>,
    pub(crate) handles_child_events: bool,
    pub(crate) filters_child_events: bool,
    pub(crate) modality: PanelModality,
    pub(crate) cursor: Option<CursorShape>,
    pub(crate) tooltip: Option<String>,
    pub(crate) handler: Option<Box<dyn ItemHandler>>,
    pub(crate) hook: Option<Box<dyn ItemChangeHook>>,
    pub(crate) focus_proxy: Option<ItemId>,
    pub(crate) focus_scope_item: Option<ItemId>,
    pub(crate) sub_focus_item: Option<ItemId>,
    pub(crate) group: Option<ItemId>,
    pub(crate) group_bounds: Rect,
    pub(crate) scene_transform: Cell<Affine>,
    pub(crate) scene_transform_dirty: Cell<bool>,
    pub(crate) children_bounds: Cell<Rect>,
    pub(crate) children_bounds_dirty: Cell<bool>,
    pub(crate) dirty: DirtyState,
    pub(crate) index_pending: bool,
    pub(crate) unpolished: bool,
    pub(crate) in_destructor: bool,
}

impl Debug for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Node")
            .field("generation", &self.generation)
            .field("parent", &self.parent)
            .field("children", &self.children.ids.len())
            .field("content", &self.content)
            .field("pos", &self.pos)
            .field("z", &self.z)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Move the item's own state into a node. Children are handled by the scene.
    pub(crate) fn from_item(generation: u32, item: Item) -> (Self, Vec<Item>) {
        let Item {
            content,
            pos,
            transform,
            z,
            mut flags,
            opacity,
            visible,
            enabled,
            selected,
            accepts_hover,
            accepted_buttons,
            accepts_drops,
            accepts_touch,
            gestures,
            handles_child_events,
            filters_child_events,
            modality,
            cursor,
            tooltip,
            handler,
            hook,
            children,
        } = item;
        if flags.contains(ItemFlags::NEGATIVE_Z_STACKS_BEHIND_PARENT) && z < 0.0 {
            flags |= ItemFlags::STACKS_BEHIND_PARENT;
        }
        let is_group = content.is_group();
        let node = Self {
            generation,
            parent: None,
            children: Siblings::new(),
            sibling_index: 0,
            content,
            pos,
            transform,
            z,
            flags,
            ancestor_flags: AncestorFlags::empty(),
            opacity,
            explicitly_hidden: !visible,
            visible,
            explicitly_disabled: !enabled,
            enabled,
            selected: selected && flags.contains(ItemFlags::SELECTABLE),
            accepts_hover,
            accepted_buttons,
            accepts_drops,
            accepts_touch,
            gestures,
            handles_child_events: handles_child_events || is_group,
            filters_child_events,
            modality,
            cursor,
            tooltip,
            handler,
            hook,
            focus_proxy: None,
            focus_scope_item: None,
            sub_focus_item: None,
            group: None,
            group_bounds: Rect::ZERO,
            scene_transform: Cell::new(Affine::IDENTITY),
            scene_transform_dirty: Cell::new(true),
            children_bounds: Cell::new(Rect::ZERO),
            children_bounds_dirty: Cell::new(true),
            dirty: DirtyState::default(),
            index_pending: false,
            unpolished: true,
            in_destructor: false,
        };
        (node, children)
    }

    /// Turn the node back into a detached item. Children are re-attached by the scene.
    pub(crate) fn into_item(self) -> Item {
        Item {
            content: self.content,
            pos: self.pos,
            transform: self.transform,
            z: self.z,
            flags: self.flags,
            opacity: self.opacity,
            visible: !self.explicitly_hidden,
            enabled: !self.explicitly_disabled,
            selected: self.selected,
            accepts_hover: self.accepts_hover,
            accepted_buttons: self.accepted_buttons,
            accepts_drops: self.accepts_drops,
            accepts_touch: self.accepts_touch,
            gestures: self.gestures,
            handles_child_events: self.handles_child_events,
            filters_child_events: self.filters_child_events,
            modality: self.modality,
            cursor: self.cursor,
            tooltip: self.tooltip,
            handler: self.handler,
            hook: self.hook,
            children: Vec::new(),
        }
    }

    /// Local-to-parent matrix.
    pub(crate) fn local_to_parent(&self) -> Affine {
        self.transform.to_parent(self.pos)
    }

    /// Whether the item is a panel.
    pub(crate) fn is_panel(&self) -> bool {
        self.flags.contains(ItemFlags::IS_PANEL)
    }

    /// Whether the item ignores view transformations itself or through an ancestor.
    pub(crate) fn is_untransformable(&self) -> bool {
        self.flags.contains(ItemFlags::IGNORES_TRANSFORMATIONS)
            || self
                .ancestor_flags
                .contains(AncestorFlags::IGNORES_TRANSFORMATIONS)
    }

    /// Whether the item passes its opacity down at all.
    pub(crate) fn propagates_opacity(&self) -> bool {
        !self
            .flags
            .contains(ItemFlags::DOESNT_PROPAGATE_OPACITY_TO_CHILDREN)
    }

    /// Combine the local opacity with the effective opacity the parent passes down.
    pub(crate) fn combine_opacity(&self, parent_opacity: f64) -> f64 {
        if self.flags.contains(ItemFlags::IGNORES_PARENT_OPACITY) {
            self.opacity
        } else {
            self.opacity * parent_opacity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ShapeStyle;
    use peniko::Color;

    #[test]
    fn negative_z_sets_stacks_behind_parent() {
        let item = Item::new(Content::Empty)
            .with_flags(ItemFlags::NEGATIVE_Z_STACKS_BEHIND_PARENT)
            .with_z(-1.0);
        let (node, _) = Node::from_item(1, item);
        assert!(
            node.flags.contains(ItemFlags::STACKS_BEHIND_PARENT),
            "negative z stacks behind the parent"
        );
    }

    #[test]
    fn round_trip_keeps_explicit_state() {
        let item = Item::new(Content::rect(
            Rect::new(0.0, 0.0, 4.0, 4.0),
            ShapeStyle::filled(Color::WHITE),
        ))
        .with_pos((3.0, 4.0))
        .with_visible(false)
        .with_opacity(2.0)
        .with_child(Item::default());
        let (node, children) = Node::from_item(1, item);
        assert_eq!(children.len(), 1, "children are returned for the scene to attach");
        assert_eq!(node.opacity, 1.0, "opacity is clamped");
        let back = node.into_item();
        assert_eq!(back.pos(), Point::new(3.0, 4.0), "position kept");
        assert!(!back.visible, "explicit hide kept");
    }

    #[test]
    fn opacity_combination_flags() {
        let (mut node, _) = Node::from_item(1, Item::default().with_opacity(0.5));
        assert_eq!(node.combine_opacity(0.5), 0.25, "inherits parent opacity");
        node.flags |= ItemFlags::IGNORES_PARENT_OPACITY;
        assert_eq!(node.combine_opacity(0.5), 0.5, "ignores parent opacity");
    }
}
