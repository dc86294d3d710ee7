// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mouse and keyboard grabber stacks.
//!
//! The last entry of each stack is the current grabber. A new grab sends
//! `UngrabMouse`/`UngrabKeyboard` to the previous top; releasing an entry
//! also releases every grab stacked above it and hands the grab back to the
//! new top. An implicit grab (made by an accepted press) is dropped as soon
//! as anything else grabs.

use kurbo::Point;

use super::Scene;
use crate::events::{MouseEvent, SceneEvent};
use crate::types::{ItemId, MouseButton};

/// Where a button went down for the current mouse grabber.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ButtonDown {
    /// Position in the grabber's local coordinates.
    pub pos: Point,
    /// Position in scene coordinates.
    pub scene_pos: Point,
    /// Position in screen coordinates.
    pub screen_pos: Point,
}

impl Scene {
    /// The item that currently receives all mouse events.
    pub fn mouse_grabber_item(&self) -> Option<ItemId> {
        self.mouse_grabbers.last().copied()
    }

    /// The item that currently receives all key events.
    pub fn keyboard_grabber_item(&self) -> Option<ItemId> {
        self.keyboard_grabbers.last().copied()
    }

    /// Make `id` the mouse grabber. Invisible items cannot grab.
    pub fn grab_mouse(&mut self, id: ItemId) {
        if !self.is_alive(id) {
            log::warn!("Scene::grab_mouse: stale item {id:?}");
            return;
        }
        if !self.is_visible(id) {
            log::warn!("Scene::grab_mouse: cannot grab mouse while invisible");
            return;
        }
        self.grab_mouse_helper(id, false);
    }

    /// Release the mouse grab held by `id`.
    pub fn ungrab_mouse(&mut self, id: ItemId) {
        if self.is_alive(id) {
            self.ungrab_mouse_helper(id, false);
        }
    }

    pub(crate) fn grab_mouse_helper(&mut self, id: ItemId, implicit: bool) {
        if self.mouse_grabbers.contains(&id) {
            if self.mouse_grabbers.last() == Some(&id) {
                if self.last_grab_implicit {
                    self.last_grab_implicit = false;
                } else {
                    log::warn!("Scene::grab_mouse: {id:?} is already the mouse grabber");
                }
            } else {
                log::warn!(
                    "Scene::grab_mouse: already blocked by mouse grabber {:?}",
                    self.mouse_grabber_item()
                );
            }
            return;
        }
        if let Some(last) = self.mouse_grabber_item() {
            if self.last_grab_implicit {
                self.ungrab_mouse_helper(last, false);
            } else {
                self.send_event(last, &mut SceneEvent::UngrabMouse);
            }
        }
        self.mouse_grabbers.push(id);
        self.last_grab_implicit = implicit;
        self.send_event(id, &mut SceneEvent::GrabMouse);
    }

    /// Release `id` and every grab stacked above it. `dying` suppresses the
    /// ungrab and regrab events.
    pub(crate) fn ungrab_mouse_helper(&mut self, id: ItemId, dying: bool) {
        let Some(index) = self.mouse_grabbers.iter().position(|g| *g == id) else {
            log::warn!("Scene::ungrab_mouse: {id:?} is not a mouse grabber");
            return;
        };
        if let Some(&above) = self.mouse_grabbers.get(index + 1) {
            self.ungrab_mouse_helper(above, dying);
        }
        if !dying {
            self.send_event(id, &mut SceneEvent::UngrabMouse);
        }
        self.mouse_grabbers.pop();
        self.last_grab_implicit = false;
        if self.mouse_grabbers.is_empty() {
            self.button_down = [None; 5];
        } else if !dying {
            if let Some(last) = self.mouse_grabber_item() {
                self.send_event(last, &mut SceneEvent::GrabMouse);
            }
        }
    }

    /// Release every mouse grab.
    pub(crate) fn clear_mouse_grabber(&mut self) {
        if let Some(&first) = self.mouse_grabbers.first() {
            self.ungrab_mouse_helper(first, false);
        }
        self.last_mouse_grabber = None;
    }

    /// Make `id` the keyboard grabber.
    pub fn grab_keyboard(&mut self, id: ItemId) {
        if !self.is_alive(id) {
            log::warn!("Scene::grab_keyboard: stale item {id:?}");
            return;
        }
        if !self.is_visible(id) {
            log::warn!("Scene::grab_keyboard: cannot grab keyboard while invisible");
            return;
        }
        if self.keyboard_grabbers.contains(&id) {
            if self.keyboard_grabbers.last() == Some(&id) {
                log::warn!("Scene::grab_keyboard: {id:?} is already the keyboard grabber");
            } else {
                log::warn!(
                    "Scene::grab_keyboard: already blocked by keyboard grabber {:?}",
                    self.keyboard_grabber_item()
                );
            }
            return;
        }
        if let Some(last) = self.keyboard_grabber_item() {
            self.send_event(last, &mut SceneEvent::UngrabKeyboard);
        }
        self.keyboard_grabbers.push(id);
        self.send_event(id, &mut SceneEvent::GrabKeyboard);
    }

    /// Release the keyboard grab held by `id`.
    pub fn ungrab_keyboard(&mut self, id: ItemId) {
        if self.is_alive(id) {
            self.ungrab_keyboard_helper(id, false);
        }
    }

    pub(crate) fn ungrab_keyboard_helper(&mut self, id: ItemId, dying: bool) {
        let Some(index) = self.keyboard_grabbers.iter().position(|g| *g == id) else {
            log::warn!("Scene::ungrab_keyboard: {id:?} is not a keyboard grabber");
            return;
        };
        if let Some(&above) = self.keyboard_grabbers.get(index + 1) {
            self.ungrab_keyboard_helper(above, dying);
        }
        if !dying {
            self.send_event(id, &mut SceneEvent::UngrabKeyboard);
        }
        self.keyboard_grabbers.pop();
        if !dying {
            if let Some(last) = self.keyboard_grabber_item() {
                self.send_event(last, &mut SceneEvent::GrabKeyboard);
            }
        }
    }

    /// Remember where the held buttons of `event` went down, in the
    /// coordinates of the current grabber.
    pub(crate) fn store_button_down(&mut self, event: &MouseEvent) {
        let Some(grabber) = self.mouse_grabber_item() else {
            return;
        };
        let to_local = self.event_scene_to_local(grabber, event.view);
        for button in MouseButton::ALL {
            if event.buttons.contains(button.bit()) {
                self.button_down[button.index()] = Some(ButtonDown {
                    pos: to_local * event.scene_pos,
                    scene_pos: event.scene_pos,
                    screen_pos: event.screen_pos,
                });
            }
        }
    }
}
