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

//! Headless host platform
//!
//! Window-system-free implementations of the platform capabilities. The
//! `agnes` binary runs on these, and so do the tests.

use crate::core::error::PlatformError;
use crate::core::input::{GamepadSnapshot, GamepadSource};
use crate::core::platform::{
    Display, EventBus, FrameRequest, FrameScheduler, Host, PlatformEvent, Surface,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Surface that only counts focus requests
#[derive(Default)]
pub struct HeadlessSurface {
    focuses: Cell<u32>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus_count(&self) -> u32 {
        self.focuses.get()
    }
}

impl Surface for HeadlessSurface {
    fn focus(&self) {
        self.focuses.set(self.focuses.get() + 1);
        log::trace!("Surface focused");
    }
}

/// Display with an in-memory fullscreen flag
///
/// Every actual change raises [`PlatformEvent::FullscreenChange`] on the bus.
pub struct HeadlessDisplay {
    bus: Rc<EventBus>,
    fullscreen: Cell<bool>,
    transitions: Cell<u32>,
    deny: Cell<bool>,
}

impl HeadlessDisplay {
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self {
            bus,
            fullscreen: Cell::new(false),
            transitions: Cell::new(0),
            deny: Cell::new(false),
        }
    }

    /// Number of fullscreen changes so far
    pub fn transitions(&self) -> u32 {
        self.transitions.get()
    }

    /// Make fullscreen requests fail, as a host does without a user gesture
    pub fn set_deny_requests(&self, deny: bool) {
        self.deny.set(deny);
    }

    fn change(&self, fullscreen: bool) {
        if self.fullscreen.replace(fullscreen) == fullscreen {
            return;
        }
        self.transitions.set(self.transitions.get() + 1);
        self.bus.dispatch(&PlatformEvent::FullscreenChange);
    }
}

impl Display for HeadlessDisplay {
    fn is_fullscreen(&self) -> bool {
        self.fullscreen.get()
    }

    fn request_fullscreen(&self) -> Result<(), PlatformError> {
        if self.deny.get() {
            return Err(PlatformError::FullscreenRejected(
                "request denied by host".to_string(),
            ));
        }
        self.change(true);
        Ok(())
    }

    fn exit_fullscreen(&self) -> Result<(), PlatformError> {
        self.change(false);
        Ok(())
    }
}

type FrameCallback = Box<dyn FnOnce()>;

/// Frame scheduler driven by explicit [`run_frame`](Self::run_frame) calls
#[derive(Default)]
pub struct ManualFrameScheduler {
    queue: RefCell<Vec<(FrameRequest, FrameCallback)>>,
    next_id: Cell<u64>,
    frames: Cell<u64>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback queued before this call
    ///
    /// Callbacks requested while running land in the next frame.
    ///
    /// # Returns
    ///
    /// Number of callbacks run
    pub fn run_frame(&self) -> usize {
        let due = std::mem::take(&mut *self.queue.borrow_mut());
        self.frames.set(self.frames.get() + 1);
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        count
    }

    /// Number of queued callbacks
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Frames run so far
    pub fn frames(&self) -> u64 {
        self.frames.get()
    }

    /// Remove queued callbacks without running them
    pub fn take_pending(&self) -> Vec<FrameCallback> {
        std::mem::take(&mut *self.queue.borrow_mut())
            .into_iter()
            .map(|(_, callback)| callback)
            .collect()
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameRequest {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let request = FrameRequest(id);
        self.queue.borrow_mut().push((request, callback));
        request
    }

    fn cancel_frame(&self, request: FrameRequest) {
        self.queue.borrow_mut().retain(|(r, _)| *r != request);
    }
}

/// Gamepad source returning whatever was last set
#[derive(Default)]
pub struct StaticGamepads {
    pads: RefCell<Vec<GamepadSnapshot>>,
}

impl StaticGamepads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, pads: Vec<GamepadSnapshot>) {
        *self.pads.borrow_mut() = pads;
    }
}

impl GamepadSource for StaticGamepads {
    fn snapshot(&self) -> Vec<GamepadSnapshot> {
        self.pads.borrow().clone()
    }
}

/// All headless capabilities sharing one event bus
pub struct HeadlessPlatform {
    bus: Rc<EventBus>,
    surface: Rc<HeadlessSurface>,
    display: Rc<HeadlessDisplay>,
    scheduler: Rc<ManualFrameScheduler>,
    gamepads: Rc<StaticGamepads>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        let bus = EventBus::new();
        Self {
            surface: Rc::new(HeadlessSurface::new()),
            display: Rc::new(HeadlessDisplay::new(Rc::clone(&bus))),
            scheduler: Rc::new(ManualFrameScheduler::new()),
            gamepads: Rc::new(StaticGamepads::new()),
            bus,
        }
    }

    /// Capability bundle for the controller and watchdog
    pub fn host(&self) -> Host {
        Host {
            bus: Rc::clone(&self.bus),
            surface: self.surface.clone(),
            display: self.display.clone(),
            scheduler: self.scheduler.clone(),
            gamepads: self.gamepads.clone(),
        }
    }

    pub fn bus(&self) -> Rc<EventBus> {
        Rc::clone(&self.bus)
    }

    pub fn surface(&self) -> Rc<HeadlessSurface> {
        Rc::clone(&self.surface)
    }

    pub fn display(&self) -> Rc<HeadlessDisplay> {
        Rc::clone(&self.display)
    }

    pub fn scheduler(&self) -> Rc<ManualFrameScheduler> {
        Rc::clone(&self.scheduler)
    }

    pub fn gamepads(&self) -> Rc<StaticGamepads> {
        Rc::clone(&self.gamepads)
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}
