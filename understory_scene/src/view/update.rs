// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coalescing repaint requests into viewport updates.
//!
//! The scene routes device rects here while it processes dirty items. They
//! collect in a dirty region (or bounding rect, depending on the update mode)
//! until [`View::process_pending_updates`] hands them to the pending update
//! that the host drains with [`ViewMut::take_pending_update`].

use kurbo::Rect;

use super::{OptimizationFlags, SMART_UPDATE_RECT_LIMIT, UpdateMode, View, ViewMut};
use crate::geometry::unite;
use crate::region::Region;

/// Area of the viewport that needs repainting.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingUpdate {
    /// The whole viewport.
    Full,
    /// One rect, in view coordinates.
    Rect(Rect),
    /// Non-overlapping rects, in view coordinates.
    Region(Region),
}

impl PendingUpdate {
    /// Bounding rect of the update; `viewport` for [`PendingUpdate::Full`].
    pub fn bounding_rect(&self, viewport: Rect) -> Option<Rect> {
        match self {
            Self::Full => Some(viewport),
            Self::Rect(r) => Some(*r),
            Self::Region(region) => region.bounding_rect(),
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Full, _) | (_, Self::Full) => Self::Full,
            (Self::Rect(a), Self::Rect(b)) => Self::Rect(unite(a, b)),
            (Self::Region(mut a), Self::Rect(b)) => {
                a.add_rect(b);
                Self::Region(a)
            }
            (Self::Rect(a), Self::Region(b)) => {
                let mut region = Region::from_rect(a);
                region.add_region(&b);
                Self::Region(region)
            }
            (Self::Region(mut a), Self::Region(b)) => {
                a.add_region(&b);
                Self::Region(a)
            }
        }
    }
}

/// Overlap test for pixel-aligned rects against a `width` x `height` viewport.
fn intersects_viewport(r: Rect, width: f64, height: f64) -> bool {
    !(r.x0 > width || r.x1 <= 0.0 || r.y0 >= height || r.y1 <= 0.0)
}

fn contains_viewport(r: Rect, width: f64, height: f64) -> bool {
    r.x0 <= 0.0 && r.y0 <= 0.0 && r.x1 >= width && r.y1 >= height
}

impl View {
    /// Pixel margin added around every update and painted rect.
    pub(crate) fn rect_adjust(&self) -> f64 {
        if self
            .options
            .optimization_flags
            .contains(OptimizationFlags::DONT_ADJUST_FOR_ANTIALIASING)
        {
            1.0
        } else {
            2.0
        }
    }

    /// Align a device rect outward to whole pixels and add the anti-aliasing margin.
    pub(crate) fn adjusted_device_rect(&self, r: Rect) -> Rect {
        let a = self.rect_adjust();
        r.expand().inflate(a, a)
    }

    /// Request a full repaint.
    pub(crate) fn update_all(&mut self) {
        if self.full_update_pending {
            return;
        }
        self.full_update_pending = true;
        self.dirty_region.clear();
        self.dirty_bounding_rect = None;
        self.push_pending(PendingUpdate::Full);
    }

    /// Add an already aligned and adjusted device rect. Returns `false` if it
    /// was dropped (outside the viewport, updates off, or a full update pending).
    pub(crate) fn update_rect(&mut self, r: Rect) -> bool {
        let (w, h) = (self.viewport_size().width, self.viewport_size().height);
        if self.full_update_pending
            || self.options.update_mode == UpdateMode::None
            || !intersects_viewport(r, w, h)
        {
            return false;
        }
        let clipped = match self.update_clip {
            Some(clip) => r.intersect(clip),
            None => r,
        };
        match self.options.update_mode {
            UpdateMode::Full => self.update_all(),
            UpdateMode::BoundingRect => {
                let united = match self.dirty_bounding_rect {
                    Some(b) => unite(b, clipped),
                    None => clipped,
                };
                self.dirty_bounding_rect = Some(united);
                if contains_viewport(united, w, h) {
                    log::debug!("view {:?}: dirty bounding rect covers the viewport", self.id);
                    self.update_all();
                }
            }
            UpdateMode::Minimal | UpdateMode::Smart => {
                self.dirty_region.add_rect(clipped);
                if self.dirty_region.contains_rect(self.viewport_rect()) {
                    log::debug!("view {:?}: dirty region covers the viewport", self.id);
                    self.update_all();
                }
            }
            UpdateMode::None => {}
        }
        true
    }

    /// Add an unaligned device rect.
    pub(crate) fn update_rect_f(&mut self, r: Rect) -> bool {
        if r.width() <= 0.0 || r.height() <= 0.0 {
            return false;
        }
        self.update_rect(self.adjusted_device_rect(r))
    }

    /// Limit accepted updates to `clip` (intersected with any clip already
    /// set), or lift the limit with `None`.
    pub(crate) fn set_update_clip(&mut self, clip: Option<Rect>) {
        let Some(clip) = clip else {
            self.update_clip = None;
            return;
        };
        if matches!(self.options.update_mode, UpdateMode::None | UpdateMode::Full) {
            self.update_clip = None;
            return;
        }
        self.update_clip = Some(match self.update_clip {
            Some(old) => old.intersect(clip),
            None => clip,
        });
    }

    /// Move the collected dirty area into the pending update.
    pub(crate) fn process_pending_updates(&mut self) {
        if self.full_update_pending {
            self.push_pending(PendingUpdate::Full);
        } else if self.options.update_mode == UpdateMode::BoundingRect {
            if let Some(r) = self.dirty_bounding_rect {
                self.push_pending(PendingUpdate::Rect(r));
            }
        } else if !self.dirty_region.is_empty() {
            let region = core::mem::take(&mut self.dirty_region);
            let update = if self.options.update_mode == UpdateMode::Smart
                && region.len() > SMART_UPDATE_RECT_LIMIT
            {
                match region.bounding_rect() {
                    Some(r) => PendingUpdate::Rect(r),
                    None => return,
                }
            } else {
                PendingUpdate::Region(region)
            };
            self.push_pending(update);
        }
        self.dirty_bounding_rect = None;
        self.dirty_region.clear();
    }

    /// Repaint scene rects reported by changed-region tracking.
    pub(crate) fn update_scene(&mut self, rects: &[Rect]) {
        if self.full_update_pending || self.options.update_mode == UpdateMode::None {
            return;
        }
        let mut dirty: alloc::vec::Vec<Rect> = self.dirty_region.rects().to_vec();
        self.dirty_region.clear();
        self.dirty_bounding_rect = None;

        let bounding = self.options.update_mode == UpdateMode::BoundingRect
            || (self.options.update_mode == UpdateMode::Smart
                && dirty.len() + rects.len() >= SMART_UPDATE_RECT_LIMIT);
        let viewport = self.viewport_rect();
        let transform = self.viewport_transform();
        for r in rects {
            let x = self.adjusted_device_rect(transform.transform_rect_bbox(*r));
            if crate::geometry::rects_intersect(viewport, x) {
                dirty.push(x);
            }
        }
        if dirty.is_empty() {
            return;
        }
        if self.options.update_mode == UpdateMode::Full {
            self.update_all();
        } else if bounding {
            let r = dirty.iter().copied().reduce(unite).unwrap_or(Rect::ZERO);
            self.push_pending(PendingUpdate::Rect(r));
        } else {
            let mut region = Region::new();
            for r in dirty {
                region.add_rect(r);
            }
            self.push_pending(PendingUpdate::Region(region));
        }
    }

    fn push_pending(&mut self, update: PendingUpdate) {
        self.pending = Some(match self.pending.take() {
            Some(p) => p.merge(update),
            None => update,
        });
    }

    /// The repaint the host still owes, without draining it.
    pub fn pending_update(&self) -> Option<&PendingUpdate> {
        self.pending.as_ref()
    }

    /// Drain the pending repaint and leave a clean slate.
    pub(crate) fn take_pending(&mut self) -> Option<PendingUpdate> {
        self.process_pending_updates();
        self.full_update_pending = false;
        self.pending.take()
    }

    /// Forget the area accumulated since the last paint; called after painting.
    pub(crate) fn reset_after_paint(&mut self) {
        self.full_update_pending = false;
        self.dirty_scroll_offset = kurbo::Vec2::ZERO;
        self.background_exposed = false;
    }
}

impl ViewMut<'_> {
    /// Run pending scene work, then drain the repaint the host should do.
    pub fn take_pending_update(&mut self) -> Option<PendingUpdate> {
        self.scene.run_pending_tasks();
        self.state()?.take_pending()
    }

    /// Repaint the whole viewport.
    pub fn update_viewport(&mut self) {
        if let Some(v) = self.state() {
            v.update_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViewId;
    use crate::view::ViewOptions;
    use kurbo::Size;

    fn view(mode: UpdateMode) -> View {
        View::new(
            ViewId(0, 1),
            ViewOptions {
                update_mode: mode,
                ..ViewOptions::default()
            },
            Size::new(100.0, 100.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        )
    }

    #[test]
    fn rects_are_aligned_and_adjusted() {
        let mut v = view(UpdateMode::Minimal);
        assert!(v.update_rect_f(Rect::new(10.2, 10.2, 19.5, 19.5)), "accepted");
        v.process_pending_updates();
        let Some(PendingUpdate::Region(r)) = v.take_pending() else {
            panic!("expected a region");
        };
        assert_eq!(r.rects(), [Rect::new(8.0, 8.0, 22.0, 22.0)], "expanded by 2 px");
    }

    #[test]
    fn rects_outside_are_dropped() {
        let mut v = view(UpdateMode::Minimal);
        assert!(!v.update_rect_f(Rect::new(200.0, 200.0, 210.0, 210.0)), "outside");
        v.process_pending_updates();
        assert_eq!(v.take_pending(), None, "nothing pending");
    }

    #[test]
    fn bounding_rect_mode_escalates_when_covering() {
        let mut v = view(UpdateMode::BoundingRect);
        v.update_rect_f(Rect::new(0.0, 0.0, 10.0, 10.0));
        v.update_rect_f(Rect::new(90.0, 90.0, 100.0, 100.0));
        v.process_pending_updates();
        assert_eq!(v.take_pending(), Some(PendingUpdate::Full), "escalated");
    }

    #[test]
    fn smart_mode_collapses_many_rects() {
        let mut v = view(UpdateMode::Smart);
        for i in 0..60 {
            let x = f64::from(i % 10) * 9.0;
            let y = f64::from(i / 10) * 9.0;
            v.update_rect(Rect::new(x, y, x + 1.0, y + 1.0));
        }
        v.process_pending_updates();
        assert!(
            matches!(v.take_pending(), Some(PendingUpdate::Rect(_))),
            "more than the limit collapses to a rect"
        );
    }

    #[test]
    fn update_clip_limits_rects() {
        let mut v = view(UpdateMode::Minimal);
        v.set_update_clip(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        v.update_rect(Rect::new(5.0, 5.0, 50.0, 50.0));
        v.set_update_clip(None);
        v.process_pending_updates();
        let Some(PendingUpdate::Region(r)) = v.take_pending() else {
            panic!("expected a region");
        };
        assert_eq!(r.rects(), [Rect::new(5.0, 5.0, 10.0, 10.0)], "clipped");
    }

    #[test]
    fn none_mode_ignores_everything() {
        let mut v = view(UpdateMode::None);
        assert!(!v.update_rect_f(Rect::new(0.0, 0.0, 5.0, 5.0)), "dropped");
    }
}
