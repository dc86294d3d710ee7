// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_scene --heading-base-level=0

//! Understory Scene: a retained-mode 2D scene graph with scrollable views.
//!
//! A [`Scene`] owns a forest of [`Item`]s. Each item has a position, a local
//! transform, a z-value, an opacity, flags and some [`Content`] that knows its
//! bounds, its shape and how to paint itself. Any number of [`View`]s look at
//! the same scene through their own transform and scroll position.
//!
//! - Items are addressed by generational [`ItemId`]s; a stale id is ignored or
//!   answers `None` rather than touching a reused slot.
//! - Geometry queries (`items_at`, `items_in_rect`, collisions) go through a
//!   spatial index from `understory_scene_index` and are refined with exact shapes.
//! - Input arrives in view coordinates through [`ViewMut`], is mapped to the
//!   scene and routed to item handlers with grabs, focus, hover and selection
//!   handled the way desktop canvases do.
//! - Changes are deferred: item edits mark dirty state and queue tasks, and
//!   [`Scene::run_pending_tasks`] turns them into per-view repaint requests
//!   once per frame.
//!
//! The crate draws through the [`Painter`] trait and never owns a surface.
//! [`RecordingPainter`] records calls and is handy in tests.
//!
//! # Example
//!
//! ```rust
//! use kurbo::{Point, Rect, Size};
//! use peniko::Color;
//! use understory_scene::{
//!     Content, Item, ItemFlags, MouseButton, RecordingPainter, Scene, ShapeStyle,
//!     ViewMouseEvent, ViewOptions,
//! };
//!
//! let mut scene = Scene::new();
//! scene.set_scene_rect(Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
//! let square = scene.add_item(
//!     Item::new(Content::rect(
//!         Rect::new(0.0, 0.0, 20.0, 20.0),
//!         ShapeStyle::filled(Color::BLACK),
//!     ))
//!     .with_pos((10.0, 10.0))
//!     .with_flags(ItemFlags::SELECTABLE),
//! );
//! let view = scene.add_view(ViewOptions::default(), Size::new(100.0, 100.0));
//!
//! // Clicking through the view selects the item under the mouse.
//! let mut v = scene.view_mut(view).unwrap();
//! v.mouse_event(&ViewMouseEvent::press(Point::new(15.0, 15.0), MouseButton::Left));
//! v.mouse_event(&ViewMouseEvent::release(Point::new(15.0, 15.0), MouseButton::Left));
//! assert!(scene.is_selected(square));
//!
//! // Paint whatever is pending.
//! let mut painter = RecordingPainter::new();
//! let mut v = scene.view_mut(view).unwrap();
//! if v.take_pending_update().is_some() {
//!     v.paint(&mut painter, None);
//! }
//! assert_eq!(painter.depth(), 0);
//! ```
//!
//! ## Frames
//!
//! A host typically does this once per frame:
//!
//! 1. Feed input to [`ViewMut`] methods.
//! 2. Call [`Scene::run_pending_tasks`] (or let [`ViewMut::paint`] do it).
//! 3. Ask each view for [`ViewMut::take_pending_update`] and repaint that area.
//! 4. Drain [`Scene::take_notifications`] for selection, focus and scene rect changes.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod content;
pub mod events;
pub mod geometry;
pub mod handler;
pub mod item;
pub mod painter;
pub mod region;
pub mod scene;
pub mod tasks;
pub mod transform;
pub mod types;
pub mod view;

pub use content::{
    Content, EllipseContent, ItemContent, LineContent, Paintable, PixmapContent, ShapeStyle,
    Shaped, TextContent,
};
pub use events::{
    ContextMenuEvent, ContextMenuReason, DragDropEvent, DragEventKind, GestureEvent,
    GestureKind, GestureState, HoverEvent, HoverEventKind, InputMethodEvent, Key, KeyEvent,
    KeyEventKind, MouseEvent, MouseEventKind, Orientation, SceneEvent, SceneNotification,
    TouchDevice, TouchEvent, TouchEventKind, TouchPoint, TouchPointState, ViewContextMenuEvent,
    ViewDragEvent, ViewGestureEvent, ViewMouseEvent, ViewTouchEvent, ViewTouchPoint,
    ViewWheelEvent, WheelEvent,
};
pub use handler::{EventContext, ItemChange, ItemChangeHook, ItemHandler};
pub use item::Item;
pub use painter::{
    ImageId, PaintCommand, Painter, Pen, RecordingPainter, RenderHints, StyleOption, StyleState,
};
pub use region::Region;
pub use scene::{ButtonDown, QueryOptions, RenderOptions, Scene, SceneOptions};
pub use tasks::{FrameStats, TaskQueue};
pub use transform::{ItemTransform, TransformOp};
pub use types::{
    CursorShape, DropAction, FocusReason, ItemFlags, ItemId, Modifiers, MouseButton,
    MouseButtons, PanelModality, SelectionMode, ViewId,
};
pub use view::{
    Alignment, AspectRatioMode, CacheMode, DragMode, HorizontalAlignment, OptimizationFlags,
    PaintedRect, PendingUpdate, SMART_UPDATE_RECT_LIMIT, UpdateMode, VerticalAlignment, View,
    ViewMut, ViewOptions, ViewportAnchor,
};

pub use understory_scene_index::{IndexMethod, SortOrder};
