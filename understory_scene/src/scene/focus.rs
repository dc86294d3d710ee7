// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyboard focus, focus scopes, panel activation and modality.

use alloc::vec::Vec;

use super::Scene;
use crate::events::{SceneEvent, SceneNotification};
use crate::types::{FocusReason, ItemFlags, ItemId, PanelModality};

impl Scene {
    // --- items ---------------------------------------------------------------------

    /// The item with keyboard focus. While the scene is inactive this is the
    /// item that will receive focus once it becomes active.
    pub fn focus_item(&self) -> Option<ItemId> {
        if self.is_active() {
            self.live(self.focus_item)
        } else {
            self.live(self.passive_focus_item)
        }
    }

    /// Whether `id` (or the end of its focus proxy chain) has keyboard focus.
    pub fn has_focus(&self, id: ItemId) -> bool {
        if !self.is_active() {
            return false;
        }
        let mut f = id;
        while let Some(p) = self.focus_proxy(f) {
            f = p;
        }
        self.focus_item == Some(f) && self.panel(f) == self.active_panel
    }

    /// The descendant at the end of the item's focus chain, if any.
    pub fn sub_focus_item(&self, id: ItemId) -> Option<ItemId> {
        self.live(self.node(id)?.sub_focus_item)
    }

    /// The descendant a focus scope last gave focus to.
    pub fn focus_scope_item(&self, id: ItemId) -> Option<ItemId> {
        self.live(self.node(id)?.focus_scope_item)
    }

    /// Give keyboard focus to the item, restoring the remembered descendant of
    /// a focus scope.
    pub fn set_focus(&mut self, id: ItemId, reason: FocusReason) {
        if !self.is_alive(id) {
            log::warn!("Scene::set_focus: stale item {id:?}");
            return;
        }
        self.set_focus_helper(id, reason, true, false);
    }

    pub(crate) fn set_focus_helper(
        &mut self,
        id: ItemId,
        reason: FocusReason,
        climb: bool,
        focus_from_hide: bool,
    ) {
        let Some(n) = self.node(id) else {
            return;
        };
        if !n.enabled || !n.flags.contains(ItemFlags::FOCUSABLE) {
            return;
        }
        let mut f = id;
        while let Some(p) = self.focus_proxy(f) {
            f = p;
        }
        if self.focus_item() == Some(f) {
            return;
        }

        let mut cur = self.parent(id);
        while let Some(scope) = cur {
            if self
                .flags(scope)
                .is_some_and(|fl| fl.contains(ItemFlags::IS_FOCUS_SCOPE))
            {
                if let Some(sn) = self.node_mut(scope) {
                    sn.focus_scope_item = Some(id);
                }
                if self.sub_focus_item(scope).is_none() && !focus_from_hide {
                    // Remembered for when the scope itself gets focus.
                    return;
                }
                break;
            }
            cur = self.parent(scope);
        }

        if climb {
            while let Some(next) = self
                .focus_scope_item(f)
                .filter(|next| self.is_visible(*next))
            {
                f = next;
            }
        }

        if let Some(current) = self.focus_item() {
            self.clear_sub_focus(current);
        }
        self.set_sub_focus(f);

        let activate = match self.panel(id) {
            None => self.is_active(),
            Some(p) => self.is_active_item(p),
        };
        if activate {
            self.set_focus_item_helper(Some(f), reason);
        }
    }

    /// Move focus to `item`, or clear it with `None`.
    pub fn set_focus_item(&mut self, item: Option<ItemId>, reason: FocusReason) {
        match item {
            Some(id) => self.set_focus(id, reason),
            None => self.set_focus_item_helper(None, reason),
        }
    }

    pub(crate) fn set_focus_item_helper(&mut self, item: Option<ItemId>, reason: FocusReason) {
        if item == self.focus_item {
            return;
        }
        let item = item.filter(|i| {
            self.node(*i).is_some_and(|n| {
                n.flags.contains(ItemFlags::FOCUSABLE) && n.visible && n.enabled
            })
        });
        if item.is_some() {
            self.set_scene_focus(reason);
            if item == self.focus_item {
                return;
            }
        }

        let old = self.focus_item;
        if let Some(prev) = self.focus_item.take() {
            self.last_focus_item = Some(prev);
            self.send_event(prev, &mut SceneEvent::FocusOut(reason));
        }
        // The focus-out handler may have removed the new item.
        let item = item.filter(|i| self.is_alive(*i));
        if item.is_some() {
            self.focus_item = item;
        }
        if old != self.focus_item {
            self.notifications.push(SceneNotification::FocusItemChanged {
                new: self.focus_item,
                old,
                reason,
            });
        }
        if let Some(i) = item {
            self.send_event(i, &mut SceneEvent::FocusIn(reason));
        }
    }

    /// Take keyboard focus away from the item, handing it to the closest
    /// enclosing focus scope.
    pub fn clear_focus(&mut self, id: ItemId) {
        self.clear_focus_helper(id, true);
    }

    pub(crate) fn clear_focus_helper(&mut self, id: ItemId, give_to_parent: bool) {
        let Some(n) = self.node(id) else {
            return;
        };
        let in_destructor = n.in_destructor;
        let mut sub = id;
        if n.flags.contains(ItemFlags::IS_FOCUS_SCOPE) {
            while let Some(next) = self.focus_scope_item(sub) {
                sub = next;
            }
        }
        if give_to_parent && !in_destructor {
            let mut cur = self.parent(id);
            while let Some(scope) = cur {
                if self
                    .flags(scope)
                    .is_some_and(|fl| fl.contains(ItemFlags::IS_FOCUS_SCOPE))
                {
                    if let Some(sn) = self.node_mut(scope) {
                        if sn.focus_scope_item == Some(id) {
                            sn.focus_scope_item = None;
                        }
                    }
                    if self.has_focus(sub) {
                        self.set_focus_helper(scope, FocusReason::Other, false, false);
                    }
                    return;
                }
                cur = self.parent(scope);
            }
        }
        if self.has_focus(sub) {
            self.clear_sub_focus(id);
            self.set_focus_item_helper(None, FocusReason::Other);
        } else if self.passive_focus_item == Some(sub) {
            self.clear_sub_focus(id);
            self.passive_focus_item = None;
        }
    }

    /// Point every ancestor's focus chain at `id`, stopping at panels.
    pub(crate) fn set_sub_focus(&mut self, id: ItemId) {
        let Some(visible) = self.node(id).map(|n| n.visible) else {
            return;
        };
        let mut cur = id;
        loop {
            if cur != id {
                if let Some(s) = self.sub_focus_item(cur) {
                    if s == id {
                        break;
                    }
                    self.clear_sub_focus(s);
                }
            }
            let Some(n) = self.node_mut(cur) else {
                break;
            };
            n.sub_focus_item = Some(id);
            if n.is_panel() {
                break;
            }
            let Some(p) = n.parent else {
                break;
            };
            if !visible && self.is_visible(p) {
                break;
            }
            cur = p;
        }
        if !self.is_active() {
            self.passive_focus_item = Some(id);
            self.last_focus_item = Some(id);
        }
    }

    /// Remove `id` from the focus chains of itself and its ancestors.
    pub(crate) fn clear_sub_focus(&mut self, id: ItemId) {
        let mut cur = Some(id);
        while let Some(p) = cur {
            let Some(n) = self.node_mut(p) else {
                break;
            };
            if n.sub_focus_item != Some(id) {
                break;
            }
            n.sub_focus_item = None;
            if n.is_panel() {
                break;
            }
            cur = n.parent;
        }
    }

    // --- scene focus -------------------------------------------------------------------

    /// Whether the scene itself has input focus.
    pub fn has_scene_focus(&self) -> bool {
        self.scene_has_focus
    }

    /// Give the scene input focus, restoring the last focus item. Does nothing
    /// while the scene is inactive.
    pub fn set_scene_focus(&mut self, reason: FocusReason) {
        if self.scene_has_focus || !self.is_active() {
            return;
        }
        self.scene_focus_in(reason);
    }

    /// Remove input focus from the scene, remembering the focus item.
    pub fn clear_scene_focus(&mut self) {
        if self.scene_has_focus {
            self.scene_focus_out(FocusReason::Other);
        }
    }

    pub(crate) fn scene_focus_in(&mut self, reason: FocusReason) {
        self.scene_has_focus = true;
        if let Some(p) = self.live(self.passive_focus_item) {
            self.set_focus_item(Some(p), reason);
        }
    }

    pub(crate) fn scene_focus_out(&mut self, reason: FocusReason) {
        self.scene_has_focus = false;
        self.passive_focus_item = self.focus_item;
        self.set_focus_item(None, reason);
    }

    // --- activation ------------------------------------------------------------------

    /// Whether any view has activated the scene.
    pub fn is_active(&self) -> bool {
        self.activation_ref_count > 0
    }

    /// Whether the item belongs to the active panel of an active scene.
    pub fn is_active_item(&self, id: ItemId) -> bool {
        self.is_active() && self.is_alive(id) && self.panel(id) == self.active_panel
    }

    /// The active panel.
    pub fn active_panel(&self) -> Option<ItemId> {
        self.live(self.active_panel)
    }

    /// Activate the panel containing `item`, or deactivate panels with `None`.
    pub fn set_active_panel(&mut self, item: Option<ItemId>) {
        self.set_active_panel_helper(item, false);
    }

    /// Count one activation, as sent by a view gaining window activation.
    pub fn activate(&mut self) {
        self.activation_ref_count += 1;
        if self.activation_ref_count > 1 {
            return;
        }
        if let Some(last) = self.live(self.last_active_panel) {
            self.set_active_panel_helper(Some(last), true);
        } else {
            self.send_to_top_level(SceneEvent::WindowActivate);
        }
    }

    /// Drop one activation.
    pub fn deactivate(&mut self) {
        self.activation_ref_count = self.activation_ref_count.saturating_sub(1);
        if self.activation_ref_count > 0 {
            return;
        }
        if let Some(active) = self.active_panel {
            self.set_active_panel_helper(None, true);
            self.last_active_panel = Some(active);
        } else {
            self.send_to_top_level(SceneEvent::WindowDeactivate);
        }
    }

    fn send_to_top_level(&mut self, event: SceneEvent) {
        let targets: Vec<ItemId> = self
            .top_level
            .ids
            .iter()
            .copied()
            .filter(|id| self.is_visible(*id) && !self.is_panel(*id))
            .collect();
        for id in targets {
            let mut e = event.clone();
            self.send_event(id, &mut e);
        }
    }

    pub(crate) fn set_active_panel_helper(&mut self, item: Option<ItemId>, during_activation: bool) {
        if let Some(i) = item {
            if !self.is_alive(i) {
                log::warn!("Scene::set_active_panel: {i:?} is not part of this scene");
                return;
            }
        }
        self.set_scene_focus(FocusReason::ActiveWindow);

        let panel = item.and_then(|i| self.panel(i));
        self.last_active_panel = if panel.is_some() { self.active_panel } else { None };
        if panel == self.active_panel || (!self.is_active() && !during_activation) {
            return;
        }

        if let Some(active) = self.active_panel {
            if let Some(fi) = self.sub_focus_item(active) {
                if Some(fi) == self.focus_item() {
                    self.set_focus_item(None, FocusReason::ActiveWindow);
                }
            }
            self.send_event(active, &mut SceneEvent::WindowDeactivate);
        } else if panel.is_some() && !during_activation {
            self.send_to_top_level(SceneEvent::WindowDeactivate);
        }

        self.active_panel = panel;
        if let Some(p) = panel {
            self.send_event(p, &mut SceneEvent::WindowActivate);
            if let Some(fi) = self.sub_focus_item(p) {
                self.set_focus(fi, FocusReason::ActiveWindow);
            }
        } else if self.is_active() {
            self.send_to_top_level(SceneEvent::WindowActivate);
        }
    }

    // --- modality -----------------------------------------------------------------------

    /// The modal panel that blocks input to `id`, if any.
    ///
    /// Scene-modal panels are consulted before panel-modal ones.
    pub fn is_blocked_by_modal_panel(&self, id: ItemId) -> Option<ItemId> {
        if self.modal_panels.is_empty() || !self.is_alive(id) {
            return None;
        }
        let blocks = |modal: ItemId, scene_modal: bool| {
            modal != id
                && !self.is_ancestor_of(modal, id)
                && (scene_modal || self.common_ancestor_item(modal, id).is_some())
        };
        for &modal in &self.modal_panels {
            if self.panel_modality(modal) == Some(PanelModality::SceneModal) && blocks(modal, true) {
                return Some(modal);
            }
        }
        for &modal in &self.modal_panels {
            if self.panel_modality(modal) == Some(PanelModality::PanelModal) && blocks(modal, false) {
                return Some(modal);
            }
        }
        None
    }

    fn panels(&self) -> Vec<ItemId> {
        self.nodes_iter().filter(|id| self.is_panel(*id)).collect()
    }

    fn blocked_panels(&self, panels: &[ItemId]) -> Vec<ItemId> {
        panels
            .iter()
            .copied()
            .filter(|p| self.is_blocked_by_modal_panel(*p).is_some())
            .collect()
    }

    /// Push a visible modal panel on the modal stack.
    ///
    /// `previous` is the modality the panel had before, when it changes from
    /// one modal kind to another.
    pub(crate) fn enter_modal(&mut self, panel: ItemId, previous: Option<PanelModality>) {
        let Some(current) = self.panel_modality(panel) else {
            return;
        };
        if let (Some(prev), Some(n)) = (previous, self.node_mut(panel)) {
            n.modality = prev;
        }
        let panels = self.panels();
        let blocked = self.blocked_panels(&panels);
        if let Some(n) = self.node_mut(panel) {
            n.modality = current;
        }
        self.modal_panels.retain(|p| *p != panel);
        self.modal_panels.insert(0, panel);

        if !self.hover_items.is_empty() {
            self.redispatch_hover();
        }
        if self.last_grab_implicit {
            if let Some(&grabber) = self.mouse_grabbers.last() {
                if self.is_blocked_by_modal_panel(grabber).is_some() {
                    self.ungrab_mouse_helper(grabber, false);
                }
            }
        }
        for p in panels {
            let was = blocked.contains(&p);
            let now = self.is_blocked_by_modal_panel(p).is_some();
            if !was && now {
                self.send_event(p, &mut SceneEvent::WindowBlocked);
            } else if was && !now {
                self.send_event(p, &mut SceneEvent::WindowUnblocked);
            }
        }
    }

    /// Remove a panel from the modal stack.
    pub(crate) fn leave_modal(&mut self, panel: ItemId) {
        let panels = self.panels();
        let blocked = self.blocked_panels(&panels);
        self.modal_panels.retain(|p| *p != panel);
        for p in blocked {
            if self.is_blocked_by_modal_panel(p).is_none() {
                self.send_event(p, &mut SceneEvent::WindowUnblocked);
            }
        }
        self.redispatch_hover();
    }
}
