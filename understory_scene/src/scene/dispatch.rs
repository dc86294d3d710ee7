// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event routing from the scene to items.
//!
//! Every delivery goes through [`Scene::send_event`]: scene event filters
//! installed on the item get the first refusal, then ancestors that filter
//! child events, then the item itself (or the ancestor that handles its
//! child events). Disabled items receive nothing, and hidden items swallow
//! everything except `FocusOut`.

use alloc::vec::Vec;

use kurbo::{Affine, Point};

use super::{QueryOptions, Scene};
use crate::events::{
    ContextMenuEvent, DragDropEvent, DragEventKind, HoverEvent, HoverEventKind, KeyEvent,
    MouseEvent, MouseEventKind, SceneEvent, WheelEvent,
};
use crate::handler::{self, DefaultHandler, EventContext};
use crate::types::{
    AncestorFlags, DropAction, ItemFlags, ItemId, MouseButton, PanelModality, ViewId,
};
use crate::view::DragMode;

impl Scene {
    // --- filters -------------------------------------------------------------

    /// Let `filter` inspect (and veto) every event sent to `watched`.
    pub fn install_scene_event_filter(&mut self, watched: ItemId, filter: ItemId) {
        if !self.is_alive(watched) || !self.is_alive(filter) {
            log::warn!("Scene::install_scene_event_filter: stale item");
            return;
        }
        if watched == filter {
            log::warn!("Scene::install_scene_event_filter: an item cannot filter itself");
            return;
        }
        let filters = self.event_filters.entry(watched).or_default();
        if !filters.contains(&filter) {
            filters.push(filter);
        }
    }

    /// Undo [`Scene::install_scene_event_filter`].
    pub fn remove_scene_event_filter(&mut self, watched: ItemId, filter: ItemId) {
        if let Some(filters) = self.event_filters.get_mut(&watched) {
            filters.retain(|f| *f != filter);
            if filters.is_empty() {
                self.event_filters.remove(&watched);
            }
        }
    }

    fn run_filter(&mut self, filter: ItemId, watched: ItemId, event: &mut SceneEvent) -> bool {
        let Some(node) = self.node_mut(filter) else {
            return false;
        };
        let Some(mut h) = node.handler.take() else {
            return false;
        };
        let eaten = {
            let mut cx = EventContext::new(self, filter);
            h.scene_event_filter(&mut cx, watched, event)
        };
        if let Some(n) = self.node_mut(filter) {
            if n.handler.is_none() {
                n.handler = Some(h);
            }
        }
        eaten
    }

    fn filter_event(&mut self, id: ItemId, event: &mut SceneEvent) -> bool {
        let Some(filters) = self.event_filters.get(&id).cloned() else {
            return false;
        };
        filters
            .into_iter()
            .any(|f| self.run_filter(f, id, event))
    }

    fn filter_descendant_event(&mut self, id: ItemId, event: &mut SceneEvent) -> bool {
        let filtered = self
            .node(id)
            .is_some_and(|n| n.ancestor_flags.contains(AncestorFlags::FILTERS_CHILD_EVENTS));
        if !filtered {
            return false;
        }
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            let Some(n) = self.node(p) else {
                return false;
            };
            let more = n.ancestor_flags.contains(AncestorFlags::FILTERS_CHILD_EVENTS);
            if n.filters_child_events && self.run_filter(p, id, event) {
                return true;
            }
            if !more {
                return false;
            }
            cur = self.parent(p);
        }
        false
    }

    // --- delivery --------------------------------------------------------------

    /// Send `event` to `id` through the filters.
    ///
    /// Returns `false` if a filter ate the event or the item is disabled.
    /// Positions must already be in the item's coordinates.
    pub fn send_event(&mut self, id: ItemId, event: &mut SceneEvent) -> bool {
        if !self.is_alive(id) {
            log::warn!("Scene::send_event: stale item {id:?}");
            return false;
        }
        if self.filter_event(id, event) || self.filter_descendant_event(id, event) {
            return false;
        }
        if !self.is_enabled(id) {
            return false;
        }
        self.item_scene_event(id, event);
        true
    }

    fn item_scene_event(&mut self, id: ItemId, event: &mut SceneEvent) {
        let Some(node) = self.node(id) else {
            return;
        };
        if node.ancestor_flags.contains(AncestorFlags::HANDLES_CHILD_EVENTS) {
            if event.is_enter_or_leave() {
                return;
            }
            let mut target = node.parent;
            while let Some(t) = target {
                let forwards = self
                    .node(t)
                    .is_some_and(|n| n.ancestor_flags.contains(AncestorFlags::HANDLES_CHILD_EVENTS));
                if !forwards {
                    break;
                }
                target = self.parent(t);
            }
            if let Some(t) = target {
                let view = match event {
                    SceneEvent::Mouse(e) => e.view,
                    _ => None,
                };
                event.map_positions(self.event_scene_to_local(t, view));
                self.item_scene_event(t, event);
            }
            return;
        }
        if matches!(event, SceneEvent::FocusOut(_)) {
            self.deliver(id, event);
            return;
        }
        if !node.visible {
            return;
        }
        self.deliver(id, event);
    }

    fn deliver(&mut self, id: ItemId, event: &mut SceneEvent) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        match node.handler.take() {
            Some(mut h) => {
                {
                    let mut cx = EventContext::new(self, id);
                    handler::dispatch(h.as_mut(), &mut cx, event);
                }
                if let Some(n) = self.node_mut(id) {
                    if n.handler.is_none() {
                        n.handler = Some(h);
                    }
                }
            }
            None => {
                let mut cx = EventContext::new(self, id);
                handler::dispatch(&mut DefaultHandler, &mut cx, event);
            }
        }
    }

    /// Scene-to-local mapping for an event coming from `view`. Items that
    /// ignore transformations are mapped through the view.
    pub(crate) fn event_scene_to_local(&self, id: ItemId, view: Option<ViewId>) -> Affine {
        let untransformable = self.node(id).is_some_and(|n| n.is_untransformable());
        if untransformable {
            if let Some(vt) = view.and_then(|v| self.view(v)).map(|v| v.viewport_transform()) {
                if let Some(dt) = self.device_transform(id, vt) {
                    return dt.inverse() * vt;
                }
            }
        }
        self.scene_transform_or_identity(id).inverse()
    }

    /// Items under `scene_pos` as seen from `view`, topmost first.
    pub(crate) fn items_at_position(&self, scene_pos: Point, view: Option<ViewId>) -> Vec<ItemId> {
        let device_transform = view.and_then(|v| self.view(v)).map(|v| v.viewport_transform());
        self.items_at_with(
            scene_pos,
            &QueryOptions {
                device_transform,
                ..QueryOptions::default()
            },
        )
    }

    // --- mouse -----------------------------------------------------------------

    /// Route a mouse event.
    ///
    /// With no grabber a press picks the topmost accepting item, which then
    /// grabs the mouse implicitly until every button is released. Moves without
    /// a grabber and without held buttons become hover events.
    pub fn mouse_event(&mut self, event: &mut MouseEvent) {
        self.cached_items_under_mouse.clear();
        match event.kind {
            MouseEventKind::Press => {
                if self.mouse_grabbers.is_empty() {
                    let hover = hover_from_mouse(event);
                    self.dispatch_hover_event(&hover, event.view);
                }
                self.mouse_press_handler(event);
            }
            MouseEventKind::DoubleClick => self.mouse_press_handler(event),
            MouseEventKind::Move => {
                self.last_scene_mouse_pos = event.scene_pos;
                if self.mouse_grabbers.is_empty() {
                    if !event.buttons.is_empty() {
                        return;
                    }
                    let hover = hover_from_mouse(event);
                    event.accepted = self.dispatch_hover_event(&hover, event.view);
                    return;
                }
                self.send_mouse_event(event);
                event.accepted = true;
            }
            MouseEventKind::Release => {
                if self.mouse_grabbers.is_empty() {
                    event.accepted = false;
                    return;
                }
                self.send_mouse_event(event);
                event.accepted = true;
                if event.buttons.is_empty() {
                    self.last_mouse_grabber = self.mouse_grabber_item();
                    if let Some(last) = self.last_mouse_grabber {
                        if self.last_grab_implicit {
                            self.ungrab_mouse_helper(last, false);
                        }
                    }
                    let hover = hover_from_mouse(event);
                    self.dispatch_hover_event(&hover, event.view);
                }
            }
        }
    }

    /// Deliver a mouse event to the current grabber.
    fn send_mouse_event(&mut self, event: &mut MouseEvent) {
        if event.button.is_none() && event.buttons.is_empty() && self.last_grab_implicit {
            self.clear_mouse_grabber();
            return;
        }
        let Some(item) = self.mouse_grabber_item() else {
            return;
        };
        if self.is_blocked_by_modal_panel(item).is_some() {
            return;
        }
        let to_local = self.event_scene_to_local(item, event.view);
        for button in MouseButton::ALL {
            let i = button.index();
            match self.button_down[i] {
                Some(down) => {
                    event.button_down_pos[i] = down.pos;
                    event.button_down_scene_pos[i] = down.scene_pos;
                    event.button_down_screen_pos[i] = down.screen_pos;
                }
                None => {
                    event.button_down_pos[i] = to_local * event.scene_pos;
                    event.button_down_scene_pos[i] = event.scene_pos;
                    event.button_down_screen_pos[i] = event.screen_pos;
                }
            }
        }
        event.pos = to_local * event.scene_pos;
        event.last_pos = to_local * event.last_scene_pos;
        let mut e = SceneEvent::Mouse(event.clone());
        self.send_event(item, &mut e);
        if let SceneEvent::Mouse(delivered) = e {
            *event = delivered;
        }
    }

    fn mouse_press_handler(&mut self, event: &mut MouseEvent) {
        event.accepted = false;

        if let Some(grabber) = self.mouse_grabber_item() {
            if self.is_blocked_by_modal_panel(grabber).is_some() {
                return;
            }
            self.send_mouse_event(event);
            return;
        }

        if self.cached_items_under_mouse.is_empty() {
            self.cached_items_under_mouse = self.items_at_position(event.scene_pos, event.view);
        }
        let candidates = self.cached_items_under_mouse.clone();

        let mut top = candidates.first().copied();
        if let Some(blocker) = top.and_then(|t| self.is_blocked_by_modal_panel(t)) {
            top = Some(blocker);
        }
        let new_active = top.and_then(|t| self.panel(t));
        if new_active != self.active_panel() {
            self.set_active_panel(new_active);
        }

        let mut focus_handled = false;
        for &item in &candidates {
            let Some(flags) = self.flags(item) else {
                continue;
            };
            if self.is_blocked_by_modal_panel(item).is_some()
                || flags.contains(ItemFlags::STOPS_FOCUS_HANDLING)
            {
                focus_handled = true;
                break;
            }
            if self.is_enabled(item) && flags.contains(ItemFlags::FOCUSABLE) {
                focus_handled = true;
                if self.focus_item() != Some(item) {
                    self.set_focus_item(Some(item), crate::types::FocusReason::Mouse);
                }
                break;
            }
            if flags.contains(ItemFlags::IS_PANEL)
                || flags.contains(ItemFlags::STOPS_CLICK_FOCUS_PROPAGATION)
            {
                break;
            }
        }

        let scene_modality = self
            .modal_panels
            .iter()
            .any(|p| self.panel_modality(*p) == Some(PanelModality::SceneModal));
        if !self.options.sticky_focus && !focus_handled && !scene_modality {
            self.set_focus_item(None, crate::types::FocusReason::Mouse);
        }

        let mut candidates = candidates;
        if scene_modality && candidates.is_empty() {
            candidates.extend(self.modal_panels.first().copied());
        }

        let button = event.button.map(MouseButton::bit).unwrap_or_default();
        for item in candidates {
            if !self.accepted_buttons(item).intersects(button) {
                continue;
            }
            let item = self.is_blocked_by_modal_panel(item).unwrap_or(item);

            self.grab_mouse_helper(item, true);
            event.accepted = true;

            let disabled = !self.is_enabled(item);
            let is_panel = self.is_panel(item);
            let converts = event.kind == MouseEventKind::DoubleClick
                && self.last_mouse_grabber.is_some()
                && self.last_mouse_grabber != Some(item);
            if converts {
                let mut press = MouseEvent::new(MouseEventKind::Press, event.scene_pos);
                press.screen_pos = event.screen_pos;
                press.button = event.button;
                press.buttons = event.buttons;
                press.modifiers = event.modifiers;
                press.view = event.view;
                press.accepted = true;
                self.send_mouse_event(&mut press);
                event.accepted = press.accepted;
            } else {
                self.send_mouse_event(event);
            }

            let quiet = self.mouse_grabber_item() != Some(item);
            if disabled {
                if self.mouse_grabbers.contains(&item) {
                    self.ungrab_mouse_helper(item, quiet);
                }
                break;
            }
            if event.accepted {
                if !self.mouse_grabbers.is_empty() {
                    self.store_button_down(event);
                }
                self.last_mouse_grabber = Some(item);
                return;
            }
            if self.mouse_grabbers.contains(&item) {
                self.ungrab_mouse_helper(item, quiet);
            }
            if is_panel {
                break;
            }
        }

        if !event.accepted {
            self.clear_mouse_grabber();
            let scroll_hand = event
                .view
                .and_then(|v| self.view(v))
                .is_some_and(|v| v.options.drag_mode == DragMode::ScrollHand);
            if !scroll_hand {
                self.clear_selection();
            }
        }
    }

    // --- hover -------------------------------------------------------------------

    fn accepts_hover_helper(&self, id: ItemId) -> bool {
        self.accepts_hover(id) && self.is_blocked_by_modal_panel(id).is_none()
    }

    fn send_hover_event(
        &mut self,
        kind: HoverEventKind,
        item: ItemId,
        source: &HoverEvent,
        view: Option<ViewId>,
    ) {
        let to_local = self.event_scene_to_local(item, view);
        let mut e = SceneEvent::Hover(HoverEvent {
            kind,
            pos: to_local * source.scene_pos,
            last_pos: to_local * source.last_scene_pos,
            accepted: false,
            ..source.clone()
        });
        self.send_event(item, &mut e);
    }

    /// Update the hovered-item chain for a cursor at `event.scene_pos`.
    ///
    /// Leave events go out child-first, enter events parent-first; the common
    /// ancestor of the old and new hover items is neither left nor re-entered.
    /// Returns `true` if an item received a hover move.
    pub(crate) fn dispatch_hover_event(&mut self, event: &HoverEvent, view: Option<ViewId>) -> bool {
        if self.cached_items_under_mouse.is_empty() {
            self.cached_items_under_mouse = self.items_at_position(event.scene_pos, view);
        }
        let item = self
            .cached_items_under_mouse
            .iter()
            .copied()
            .find(|i| self.accepts_hover_helper(*i));

        let mut common = match (item, self.hover_items.last()) {
            (Some(i), Some(&last)) => self.common_ancestor_item(i, last),
            _ => None,
        };
        while let Some(c) = common {
            if self.accepts_hover_helper(c) {
                break;
            }
            common = self.parent(c);
        }
        if let (Some(c), Some(i)) = (common, item) {
            if self.panel(c) != self.panel(i) {
                common = None;
            }
        }

        let keep = common
            .and_then(|c| self.hover_items.iter().position(|h| *h == c))
            .map_or(0, |i| i + 1);
        while self.hover_items.len() > keep {
            let Some(last) = self.hover_items.pop() else {
                break;
            };
            if self.accepts_hover_helper(last) {
                self.send_hover_event(HoverEventKind::Leave, last, event, view);
            }
        }

        let mut chain = Vec::new();
        let mut cur = item;
        while let Some(c) = cur {
            if Some(c) == common {
                break;
            }
            chain.push(c);
            if self.is_panel(c) {
                break;
            }
            cur = self.parent(c);
        }
        for c in chain.into_iter().rev() {
            self.hover_items.push(c);
            if self.accepts_hover_helper(c) {
                self.send_hover_event(HoverEventKind::Enter, c, event, view);
            }
        }

        if let Some(i) = item {
            if self.hover_items.last() == Some(&i) {
                self.send_hover_event(HoverEventKind::Move, i, event, view);
                return true;
            }
        }
        false
    }

    /// Re-run hover dispatch at the last known cursor position.
    pub(crate) fn redispatch_hover(&mut self) {
        let pos = self.last_scene_mouse_pos;
        self.dispatch_hover_event(&hover_at(pos), None);
    }

    /// The cursor left the view: every hovered item gets a leave event, topmost first.
    pub fn leave_scene(&mut self, view: Option<ViewId>) {
        let event = hover_at(self.last_scene_mouse_pos);
        while let Some(last) = self.hover_items.pop() {
            if self.accepts_hover_helper(last) {
                self.send_hover_event(HoverEventKind::Leave, last, &event, view);
            }
        }
    }

    /// Whether the cursor currently hovers `id` (or one of its children).
    pub fn is_under_mouse(&self, id: ItemId) -> bool {
        self.hover_items.contains(&id)
    }

    // --- keys --------------------------------------------------------------------

    /// Deliver a key event to the keyboard grabber, else the focus item.
    ///
    /// Ignored events travel up the parent chain until a panel is reached.
    /// `event.accepted` reports whether any item took the event.
    pub fn key_event(&mut self, event: &mut KeyEvent) {
        let Some(item) = self.keyboard_grabber_item().or_else(|| self.focus_item()) else {
            event.accepted = false;
            return;
        };
        let mut e = SceneEvent::Key(event.clone());
        let mut cur = Some(item);
        while let Some(p) = cur {
            e.set_accepted(true);
            if self.is_blocked_by_modal_panel(p).is_some() || !self.send_event(p, &mut e) {
                break;
            }
            if e.is_accepted() || self.is_panel(p) {
                break;
            }
            cur = self.parent(p);
        }
        if let SceneEvent::Key(delivered) = e {
            *event = delivered;
        }
    }

    // --- wheel and context menu ---------------------------------------------------

    /// Offer a wheel event to the items under the cursor, topmost first, until
    /// one accepts it. Panels stop the walk.
    pub fn wheel_event(&mut self, event: &mut WheelEvent, view: Option<ViewId>) {
        let candidates = self.items_at_position(event.scene_pos, view);
        event.accepted = false;
        for item in candidates {
            let to_local = self.event_scene_to_local(item, view);
            let mut e = SceneEvent::Wheel(WheelEvent {
                pos: to_local * event.scene_pos,
                accepted: true,
                ..event.clone()
            });
            let is_panel = self.is_panel(item);
            self.send_event(item, &mut e);
            event.accepted = e.is_accepted();
            if is_panel || event.accepted {
                break;
            }
        }
    }

    /// Offer a context menu request to the items under the cursor until one accepts it.
    pub fn context_menu_event(&mut self, event: &mut ContextMenuEvent, view: Option<ViewId>) {
        event.accepted = false;
        for item in self.items_at_position(event.scene_pos, view) {
            let to_local = self.event_scene_to_local(item, view);
            let mut e = SceneEvent::ContextMenu(ContextMenuEvent {
                pos: to_local * event.scene_pos,
                accepted: true,
                ..event.clone()
            });
            let delivered = self.send_event(item, &mut e);
            event.accepted = e.is_accepted();
            if !delivered || event.accepted {
                break;
            }
        }
    }

    // --- drag and drop -------------------------------------------------------------

    /// Route a drag-and-drop event.
    ///
    /// `Enter` only resets the drag target; the host follows it with a `Move`,
    /// which picks the topmost enabled item accepting drops and sends it enter
    /// (and the previous target leave). `Leave` and `Drop` go to that target.
    pub fn drag_drop_event(&mut self, event: &mut DragDropEvent, view: Option<ViewId>) {
        match event.kind {
            DragEventKind::Enter => {
                self.drag_drop_item = None;
                self.last_drop_action = DropAction::Ignore;
                event.accepted = true;
            }
            DragEventKind::Move => self.drag_move_event(event, view),
            DragEventKind::Leave | DragEventKind::Drop => {
                if let Some(target) = self.drag_drop_item.take() {
                    let mut e = event.clone();
                    self.send_drag_drop_event(target, &mut e, view);
                    event.accepted = e.accepted;
                    event.drop_action = e.drop_action;
                }
            }
        }
    }

    fn send_drag_drop_event(&mut self, item: ItemId, event: &mut DragDropEvent, view: Option<ViewId>) {
        event.pos = self.event_scene_to_local(item, view) * event.scene_pos;
        let mut e = SceneEvent::DragDrop(event.clone());
        self.send_event(item, &mut e);
        if let SceneEvent::DragDrop(delivered) = e {
            *event = delivered;
        }
    }

    fn drag_move_event(&mut self, event: &mut DragDropEvent, view: Option<ViewId>) {
        event.accepted = false;
        if !self.mouse_grabbers.is_empty() {
            self.clear_mouse_grabber();
        }

        let mut delivered = false;
        for item in self.items_at_position(event.scene_pos, view) {
            if !self.is_enabled(item) || !self.accepts_drops(item) {
                continue;
            }
            if Some(item) != self.drag_drop_item {
                let mut enter = DragDropEvent {
                    kind: DragEventKind::Enter,
                    drop_action: event.proposed_action,
                    ..event.clone()
                };
                self.send_drag_drop_event(item, &mut enter, view);
                event.accepted = enter.accepted;
                event.drop_action = enter.drop_action;
                if !event.accepted {
                    continue;
                }
                self.last_drop_action = event.drop_action;
                if let Some(old) = self.drag_drop_item {
                    let mut leave = DragDropEvent {
                        kind: DragEventKind::Leave,
                        ..event.clone()
                    };
                    self.send_drag_drop_event(old, &mut leave, view);
                }
                self.drag_drop_item = Some(item);
            }

            event.drop_action = self.last_drop_action;
            event.accepted = true;
            self.send_drag_drop_event(item, event, view);
            if event.accepted {
                self.last_drop_action = event.drop_action;
            }
            delivered = true;
            break;
        }

        if !delivered {
            if let Some(old) = self.drag_drop_item.take() {
                let mut leave = DragDropEvent {
                    kind: DragEventKind::Leave,
                    ..event.clone()
                };
                self.send_drag_drop_event(old, &mut leave, view);
            }
            event.drop_action = DropAction::Ignore;
        }
    }
}

fn hover_from_mouse(event: &MouseEvent) -> HoverEvent {
    HoverEvent {
        kind: HoverEventKind::Move,
        pos: event.scene_pos,
        scene_pos: event.scene_pos,
        screen_pos: event.screen_pos,
        last_pos: event.last_scene_pos,
        last_scene_pos: event.last_scene_pos,
        last_screen_pos: event.last_screen_pos,
        modifiers: event.modifiers,
        accepted: false,
    }
}

fn hover_at(pos: Point) -> HoverEvent {
    HoverEvent {
        kind: HoverEventKind::Move,
        pos,
        scene_pos: pos,
        screen_pos: pos,
        last_pos: pos,
        last_scene_pos: pos,
        last_screen_pos: pos,
        modifiers: crate::types::Modifiers::empty(),
        accepted: false,
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::rect_item;
    use super::*;
    use crate::events::{Key, KeyEventKind};
    use crate::handler::ItemHandler;
    use crate::item::Item;
    use crate::types::{FocusReason, MouseButtons};
    use alloc::rc::Rc;
    use alloc::string::String;
    use core::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records what it sees and accepts presses and keys.
    struct Logger {
        name: &'static str,
        log: Log,
        accept_keys: bool,
    }

    impl Logger {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                accept_keys: false,
            }
        }

        fn push(&self, what: &str) {
            self.log.borrow_mut().push(alloc::format!("{} {what}", self.name));
        }
    }

    impl ItemHandler for Logger {
        fn mouse_press(&mut self, _cx: &mut EventContext<'_>, _event: &mut MouseEvent) {
            self.push("press");
        }

        fn mouse_release(&mut self, _cx: &mut EventContext<'_>, _event: &mut MouseEvent) {
            self.push("release");
        }

        fn hover_enter(&mut self, _cx: &mut EventContext<'_>, _event: &mut HoverEvent) {
            self.push("enter");
        }

        fn hover_leave(&mut self, _cx: &mut EventContext<'_>, _event: &mut HoverEvent) {
            self.push("leave");
        }

        fn key_press(&mut self, _cx: &mut EventContext<'_>, event: &mut KeyEvent) {
            self.push("key");
            event.accepted = self.accept_keys;
        }
    }

    fn press(x: f64, y: f64) -> MouseEvent {
        MouseEvent::new(MouseEventKind::Press, Point::new(x, y)).with_button(MouseButton::Left)
    }

    fn release(x: f64, y: f64) -> MouseEvent {
        MouseEvent::new(MouseEventKind::Release, Point::new(x, y)).with_button(MouseButton::Left)
    }

    fn take(log: &Log) -> Vec<String> {
        core::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn press_grabs_implicitly_until_release() {
        let log = Log::default();
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0).with_handler(Logger::new("a", &log)));
        let mut e = press(5.0, 5.0);
        scene.mouse_event(&mut e);
        assert!(e.accepted, "press accepted");
        assert_eq!(scene.mouse_grabber_item(), Some(a), "implicit grab");
        let mut e = release(50.0, 50.0);
        scene.mouse_event(&mut e);
        assert_eq!(scene.mouse_grabber_item(), None, "released");
        assert_eq!(take(&log), ["a press", "a release"], "release goes to grabber");
    }

    #[test]
    fn ignored_press_falls_through_to_item_below() {
        let mut scene = Scene::new();
        let below = scene.add_item(
            rect_item(10.0, 10.0).with_flags(ItemFlags::SELECTABLE),
        );
        let above = scene.add_item(rect_item(10.0, 10.0).with_z(1.0));
        scene.mouse_event(&mut press(5.0, 5.0));
        assert_eq!(scene.mouse_grabber_item(), Some(below), "plain items ignore presses");
        assert!(scene.is_selected(below), "default press selects");
        assert!(!scene.is_selected(above), "top item untouched");
    }

    #[test]
    fn press_on_background_clears_selection() {
        let mut scene = Scene::new();
        let a = scene.add_item(
            rect_item(10.0, 10.0).with_flags(ItemFlags::SELECTABLE),
        );
        scene.set_selected(a, true);
        let mut e = press(50.0, 50.0);
        scene.mouse_event(&mut e);
        assert!(!e.accepted, "nothing under the cursor");
        assert!(!scene.is_selected(a), "selection cleared");
    }

    #[test]
    fn press_moves_focus_to_focusable_item() {
        let mut scene = Scene::new();
        scene.activate();
        let a = scene.add_item(rect_item(10.0, 10.0).with_flags(ItemFlags::FOCUSABLE));
        scene.mouse_event(&mut press(5.0, 5.0));
        assert_eq!(scene.focus_item(), Some(a), "click focus");
        scene.mouse_event(&mut release(5.0, 5.0));
        scene.mouse_event(&mut press(50.0, 50.0));
        assert_eq!(scene.focus_item(), None, "background click clears focus");
    }

    #[test]
    fn filters_get_first_refusal() {
        struct Eat;
        impl ItemHandler for Eat {
            fn scene_event_filter(
                &mut self,
                _cx: &mut EventContext<'_>,
                _watched: ItemId,
                event: &mut SceneEvent,
            ) -> bool {
                matches!(event, SceneEvent::Mouse(_))
            }
        }
        let log = Log::default();
        let mut scene = Scene::new();
        let a = scene.add_item(rect_item(10.0, 10.0).with_handler(Logger::new("a", &log)));
        let f = scene.add_item(Item::default().with_handler(Eat));
        scene.install_scene_event_filter(a, f);
        scene.mouse_event(&mut press(5.0, 5.0));
        assert!(take(&log).is_empty(), "filter ate the press");
        scene.mouse_event(&mut release(5.0, 5.0));
        scene.remove_scene_event_filter(a, f);
        scene.mouse_event(&mut press(5.0, 5.0));
        assert_eq!(take(&log), ["a press"], "delivered once the filter is gone");
    }

    #[test]
    fn child_events_go_to_handling_ancestor() {
        let log = Log::default();
        let mut scene = Scene::new();
        let parent = scene.add_item(
            rect_item(100.0, 100.0)
                .with_handles_child_events(true)
                .with_handler(Logger::new("parent", &log))
                .with_child(
                    rect_item(10.0, 10.0)
                        .with_pos((50.0, 50.0))
                        .with_z(1.0)
                        .with_handler(Logger::new("child", &log)),
                ),
        );
        let child = scene.children(parent)[0];
        scene.mouse_event(&mut press(55.0, 55.0));
        assert_eq!(take(&log), ["parent press"], "the child's press reached the parent");
        assert_eq!(scene.mouse_grabber_item(), Some(child), "the child still holds the grab");
    }

    #[test]
    fn hover_enters_parent_before_child_and_leaves_child_first() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_item(
            rect_item(100.0, 100.0)
                .with_accepts_hover(true)
                .with_handler(Logger::new("parent", &log))
                .with_child(
                    rect_item(10.0, 10.0)
                        .with_pos((50.0, 50.0))
                        .with_accepts_hover(true)
                        .with_handler(Logger::new("child", &log)),
                ),
        );
        let mut mv = MouseEvent::new(MouseEventKind::Move, Point::new(55.0, 55.0));
        scene.mouse_event(&mut mv);
        assert_eq!(take(&log), ["parent enter", "child enter"], "parent first");
        let mut mv = MouseEvent::new(MouseEventKind::Move, Point::new(20.0, 20.0));
        scene.mouse_event(&mut mv);
        assert_eq!(take(&log), ["child leave"], "parent stays hovered");
        scene.leave_scene(None);
        assert_eq!(take(&log), ["parent leave"], "leaving the scene");
    }

    #[test]
    fn ignored_keys_propagate_to_parent() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.activate();
        let parent = scene.add_item(
            rect_item(10.0, 10.0)
                .with_handler(Logger {
                    accept_keys: true,
                    ..Logger::new("parent", &log)
                })
                .with_child(
                    rect_item(5.0, 5.0)
                        .with_flags(ItemFlags::FOCUSABLE)
                        .with_handler(Logger::new("child", &log)),
                ),
        );
        let child = scene.children(parent)[0];
        scene.set_focus(child, FocusReason::Other);
        let mut k = KeyEvent::press(Key::Enter);
        scene.key_event(&mut k);
        assert_eq!(k.kind, KeyEventKind::Press, "same event");
        assert!(k.accepted, "parent accepted");
        assert_eq!(take(&log), ["child key", "parent key"], "child first");
    }

    #[test]
    fn double_click_on_new_item_becomes_press() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_item(rect_item(10.0, 10.0).with_handler(Logger::new("a", &log)));
        scene.add_item(
            rect_item(10.0, 10.0)
                .with_pos((20.0, 0.0))
                .with_handler(Logger::new("b", &log)),
        );
        scene.mouse_event(&mut press(5.0, 5.0));
        scene.mouse_event(&mut release(5.0, 5.0));
        let mut dbl = MouseEvent::new(MouseEventKind::DoubleClick, Point::new(25.0, 5.0))
            .with_button(MouseButton::Left);
        scene.mouse_event(&mut dbl);
        assert_eq!(
            take(&log),
            ["a press", "a release", "b press"],
            "double click reaches b as a press"
        );
        assert!(dbl.buttons.contains(MouseButtons::LEFT), "buttons kept");
    }
}
