// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Host platform capabilities
//!
//! The front end never talks to a window system directly. Everything it needs
//! from the host is described here:
//! - [`EventBus`] for platform notifications (fullscreen change, pointer and
//!   key presses, gamepad connect/disconnect)
//! - [`Surface`] for the rendering surface the engine draws into
//! - [`Display`] for document-level fullscreen presentation
//! - [`FrameScheduler`] for per-frame callbacks
//!
//! Listener registration returns a [`Subscription`]. Dropping it, or calling
//! [`Subscription::unsubscribe`], removes the listener immediately.

use super::error::PlatformError;
use super::input::GamepadSource;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Gamepad description carried by connect/disconnect notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamepadInfo {
    /// Platform slot index
    pub index: usize,
    /// Device identifier string
    pub id: String,
    /// Number of buttons
    pub buttons: usize,
    /// Number of axes
    pub axes: usize,
}

/// Notification raised by the host platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    FullscreenChange,
    PointerDown,
    KeyDown,
    GamepadConnected(GamepadInfo),
    GamepadDisconnected(GamepadInfo),
}

/// Event discriminant used for subscription filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    FullscreenChange,
    PointerDown,
    KeyDown,
    GamepadConnected,
    GamepadDisconnected,
}

impl PlatformEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlatformEvent::FullscreenChange => EventKind::FullscreenChange,
            PlatformEvent::PointerDown => EventKind::PointerDown,
            PlatformEvent::KeyDown => EventKind::KeyDown,
            PlatformEvent::GamepadConnected(_) => EventKind::GamepadConnected,
            PlatformEvent::GamepadDisconnected(_) => EventKind::GamepadDisconnected,
        }
    }
}

type Listener = Rc<dyn Fn(&PlatformEvent)>;

struct Registration {
    id: u64,
    kind: EventKind,
    listener: Listener,
}

/// Listener registry for platform notifications
///
/// Single-threaded. Listeners may subscribe or unsubscribe from inside a
/// dispatch; changes take effect from the next dispatch.
pub struct EventBus {
    listeners: RefCell<Vec<Registration>>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        })
    }

    /// Register `listener` for events of `kind`
    ///
    /// # Returns
    ///
    /// Deregistration handle. The listener stays registered for as long as
    /// the handle is alive and not unsubscribed.
    pub fn subscribe<F>(self: &Rc<Self>, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&PlatformEvent) + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        self.listeners.borrow_mut().push(Registration {
            id,
            kind,
            listener: Rc::new(listener),
        });
        log::trace!("Listener {} registered for {:?}", id, kind);

        Subscription {
            bus: Rc::downgrade(self),
            id,
            active: true,
        }
    }

    /// Deliver `event` to every listener registered for its kind
    pub fn dispatch(&self, event: &PlatformEvent) {
        let kind = event.kind();
        let targets: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| Rc::clone(&r.listener))
            .collect();

        log::trace!("Dispatching {:?} to {} listener(s)", kind, targets.len());
        for listener in targets {
            listener(event);
        }
    }

    /// Number of registered listeners across all kinds
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Number of registered listeners for `kind`
    pub fn listener_count_for(&self, kind: EventKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }

    fn remove(&self, id: u64) {
        self.listeners.borrow_mut().retain(|r| r.id != id);
        log::trace!("Listener {} removed", id);
    }
}

/// Deregistration handle returned by [`EventBus::subscribe`]
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    bus: Weak<EventBus>,
    id: u64,
    active: bool,
}

impl Subscription {
    /// Remove the listener. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Rendering surface owned by the caller and bound to one engine at a time
pub trait Surface {
    /// Give keyboard/gamepad focus to the surface
    fn focus(&self);
}

/// Document-level fullscreen presentation
///
/// Implementations raise [`PlatformEvent::FullscreenChange`] once the
/// presentation state actually changes.
pub trait Display {
    fn is_fullscreen(&self) -> bool;

    fn request_fullscreen(&self) -> Result<(), PlatformError>;

    fn exit_fullscreen(&self) -> Result<(), PlatformError>;
}

/// Identifier of a pending frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Per-frame callback scheduling (animation frames)
pub trait FrameScheduler {
    /// Run `callback` once on the next display refresh
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameRequest;

    /// Drop a pending callback. Unknown or already-run requests are ignored.
    fn cancel_frame(&self, request: FrameRequest);
}

/// Bundle of host capabilities handed to the front end at construction
#[derive(Clone)]
pub struct Host {
    pub bus: Rc<EventBus>,
    pub surface: Rc<dyn Surface>,
    pub display: Rc<dyn Display>,
    pub scheduler: Rc<dyn FrameScheduler>,
    pub gamepads: Rc<dyn GamepadSource>,
}
