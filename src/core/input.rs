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

//! Gamepad input watchdog
//!
//! The engine captures controller input on its own. The watchdog runs beside
//! it so front end actions (save, fullscreen, reset) can be bound to
//! controller buttons without interfering with gameplay input.
//!
//! Every animation frame the watchdog snapshots the connected gamepads and
//! compares each button against the previous frame for the same device index.
//! Only rising edges (released → pressed) are reported, so a held button
//! fires once.

use super::platform::{
    EventBus, EventKind, FrameRequest, FrameScheduler, PlatformEvent, Subscription,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// State of one connected gamepad at a single instant
#[derive(Debug, Clone, PartialEq)]
pub struct GamepadSnapshot {
    /// Platform slot index
    pub index: usize,
    /// Device identifier string
    pub id: String,
    /// Pressed state per button, in platform order
    pub buttons: Vec<bool>,
    /// Axis positions in `[-1.0, 1.0]`
    pub axes: Vec<f32>,
}

/// Source of gamepad snapshots (the host's gamepad API)
pub trait GamepadSource {
    /// Snapshot every currently connected gamepad
    fn snapshot(&self) -> Vec<GamepadSnapshot>;
}

/// Rising edge on one button of one gamepad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonPress {
    pub gamepad: usize,
    pub button: usize,
}

/// Indices of buttons pressed in `current` but not in `previous`
///
/// Buttons beyond the end of `previous` count as released.
///
/// # Example
///
/// ```
/// use agnes::core::input::rising_edges;
///
/// let previous = [true, false, false];
/// let current = [true, true, false, true];
/// assert_eq!(rising_edges(&previous, &current).collect::<Vec<_>>(), vec![1, 3]);
/// ```
pub fn rising_edges<'a>(
    previous: &'a [bool],
    current: &'a [bool],
) -> impl Iterator<Item = usize> + 'a {
    current.iter().enumerate().filter_map(move |(button, &pressed)| {
        let was_pressed = previous.get(button).copied().unwrap_or(false);
        (pressed && !was_pressed).then_some(button)
    })
}

struct WatchdogShared {
    source: Rc<dyn GamepadSource>,
    scheduler: Rc<dyn FrameScheduler>,
    on_press: Box<dyn Fn(ButtonPress)>,
    /// Button states from the previous tick, keyed by device index
    previous: RefCell<HashMap<usize, Vec<bool>>>,
    pending: Cell<Option<FrameRequest>>,
    subscriptions: RefCell<Vec<Subscription>>,
    live: Cell<bool>,
    ticks: Cell<u64>,
}

/// Per-frame gamepad poller
pub struct InputWatchdog {
    shared: Rc<WatchdogShared>,
}

impl InputWatchdog {
    /// Create a watchdog that reports rising edges to `on_press`
    ///
    /// Nothing is polled until [`start`](Self::start) is called.
    pub fn new<F>(
        source: Rc<dyn GamepadSource>,
        scheduler: Rc<dyn FrameScheduler>,
        on_press: F,
    ) -> Self
    where
        F: Fn(ButtonPress) + 'static,
    {
        Self {
            shared: Rc::new(WatchdogShared {
                source,
                scheduler,
                on_press: Box::new(on_press),
                previous: RefCell::new(HashMap::new()),
                pending: Cell::new(None),
                subscriptions: RefCell::new(Vec::new()),
                live: Cell::new(true),
                ticks: Cell::new(0),
            }),
        }
    }

    /// Subscribe to connect/disconnect notifications and schedule the first
    /// frame
    pub fn start(&self, bus: &Rc<EventBus>) {
        if !self.shared.live.get() || self.shared.pending.get().is_some() {
            return;
        }

        let mut subscriptions = self.shared.subscriptions.borrow_mut();
        subscriptions.push(bus.subscribe(EventKind::GamepadConnected, |event| {
            if let PlatformEvent::GamepadConnected(info) = event {
                log::info!(
                    "Gamepad connected at index {}: {}. {} buttons, {} axes.",
                    info.index,
                    info.id,
                    info.buttons,
                    info.axes
                );
            }
        }));

        let weak = Rc::downgrade(&self.shared);
        subscriptions.push(bus.subscribe(EventKind::GamepadDisconnected, move |event| {
            if let PlatformEvent::GamepadDisconnected(info) = event {
                log::info!("Gamepad disconnected from index {}: {}", info.index, info.id);
                if let Some(shared) = weak.upgrade() {
                    shared.previous.borrow_mut().remove(&info.index);
                }
            }
        }));
        drop(subscriptions);

        schedule_next(&self.shared);
    }

    /// Run one poll immediately
    ///
    /// # Returns
    ///
    /// Rising edges detected since the previous poll, also delivered to the
    /// press callback.
    pub fn poll(&self) -> Vec<ButtonPress> {
        poll(&self.shared)
    }

    /// Number of frame ticks processed so far
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.get()
    }

    pub fn is_live(&self) -> bool {
        self.shared.live.get()
    }

    /// Stop polling and deregister listeners
    ///
    /// A frame callback already queued with the scheduler becomes a no-op.
    /// Idempotent.
    pub fn teardown(&self) {
        if !self.shared.live.replace(false) {
            return;
        }
        if let Some(request) = self.shared.pending.take() {
            self.shared.scheduler.cancel_frame(request);
        }
        for mut sub in self.shared.subscriptions.borrow_mut().drain(..) {
            sub.unsubscribe();
        }
        self.shared.previous.borrow_mut().clear();
        log::debug!("Input watchdog stopped after {} ticks", self.ticks());
    }
}

impl Drop for InputWatchdog {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn schedule_next(shared: &Rc<WatchdogShared>) {
    if !shared.live.get() {
        return;
    }
    let weak = Rc::downgrade(shared);
    let request = shared.scheduler.request_frame(Box::new(move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        if !shared.live.get() {
            return;
        }
        shared.pending.set(None);
        shared.ticks.set(shared.ticks.get() + 1);
        poll(&shared);
        schedule_next(&shared);
    }));
    shared.pending.set(Some(request));
}

fn poll(shared: &WatchdogShared) -> Vec<ButtonPress> {
    if !shared.live.get() {
        return Vec::new();
    }

    let pads = shared.source.snapshot();
    let mut presses = Vec::new();
    {
        let mut previous = shared.previous.borrow_mut();
        let mut next = HashMap::with_capacity(pads.len());
        for pad in pads {
            let before = previous.get(&pad.index).map(Vec::as_slice).unwrap_or(&[]);
            presses.extend(
                rising_edges(before, &pad.buttons).map(|button| ButtonPress {
                    gamepad: pad.index,
                    button,
                }),
            );
            next.insert(pad.index, pad.buttons);
        }
        *previous = next;
    }

    for press in &presses {
        log::trace!("Gamepad {} button {} pressed", press.gamepad, press.button);
        (shared.on_press)(*press);
        if !shared.live.get() {
            break;
        }
    }
    presses
}
