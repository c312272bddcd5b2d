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

//! Audio output recovery
//!
//! Hosts suspend an engine's audio output when it loses the user-gesture
//! context it was started under; a fullscreen transition is the usual culprit.
//! [`AudioRecovery`] watches for the events that can legitimately restart
//! audio and resumes a suspended output.
//!
//! # Triggers
//!
//! - Fullscreen change: once the settle delay has passed, the next display
//!   frame refocuses the surface, then probes and resumes the output
//! - Pointer or key press: the output is probed and resumed immediately
//!
//! Resume failures are logged and dropped. Losing audio must never stop the
//! game from running.

#[cfg(feature = "audio")]
pub mod device;

use super::error::AudioError;
use super::platform::{
    Display, EventBus, EventKind, FrameRequest, FrameScheduler, Subscription, Surface,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::time::Instant;

/// Default delay between a fullscreen change and the audio probe
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Observed state of an engine's audio output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Suspended,
    Running,
    /// The engine exposes no audio output (or none is active)
    Absent,
}

/// Audio output handle optionally exposed by an engine instance
pub trait AudioOutput {
    fn state(&self) -> AudioState;

    /// Request the output to start producing sound again
    fn resume(&self) -> Result<(), AudioError>;
}

/// Tunables for [`AudioRecovery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverySettings {
    /// Wait after a fullscreen change before refocusing and probing
    pub settle_delay: Duration,
    /// Resume on pointer/key presses as well as fullscreen changes
    pub resume_on_interaction: bool,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            resume_on_interaction: true,
        }
    }
}

struct RecoveryShared {
    output: RefCell<Option<Rc<dyn AudioOutput>>>,
    surface: Rc<dyn Surface>,
    display: Rc<dyn Display>,
    scheduler: Rc<dyn FrameScheduler>,
    settings: RecoverySettings,
    /// Deadlines of settles not yet run
    settles: RefCell<Vec<Instant>>,
    frame: Cell<Option<FrameRequest>>,
    subscriptions: RefCell<Vec<Subscription>>,
    live: Cell<bool>,
}

/// Audio recovery unit
///
/// Settles are driven by the host's frame scheduler and timed against the
/// tokio clock, so a paused test clock applies. No runtime is required.
pub struct AudioRecovery {
    shared: Rc<RecoveryShared>,
}

impl AudioRecovery {
    pub fn new(
        surface: Rc<dyn Surface>,
        display: Rc<dyn Display>,
        scheduler: Rc<dyn FrameScheduler>,
        settings: RecoverySettings,
    ) -> Self {
        Self {
            shared: Rc::new(RecoveryShared {
                output: RefCell::new(None),
                surface,
                display,
                scheduler,
                settings,
                settles: RefCell::new(Vec::new()),
                frame: Cell::new(None),
                subscriptions: RefCell::new(Vec::new()),
                live: Cell::new(true),
            }),
        }
    }

    /// Register fullscreen-change and interaction listeners on `bus`
    pub fn attach(&self, bus: &Rc<EventBus>) {
        let mut subscriptions = self.shared.subscriptions.borrow_mut();

        let weak = Rc::downgrade(&self.shared);
        subscriptions.push(bus.subscribe(EventKind::FullscreenChange, move |_| {
            if let Some(shared) = weak.upgrade() {
                schedule_settle(&shared);
            }
        }));

        if self.shared.settings.resume_on_interaction {
            for kind in [EventKind::PointerDown, EventKind::KeyDown] {
                let weak = Rc::downgrade(&self.shared);
                subscriptions.push(bus.subscribe(kind, move |_| {
                    if let Some(shared) = weak.upgrade() {
                        resume_output(&shared);
                    }
                }));
            }
        }
    }

    /// Bind the audio output of the running session (or clear it)
    pub fn set_output(&self, output: Option<Rc<dyn AudioOutput>>) {
        *self.shared.output.borrow_mut() = output;
    }

    pub fn has_output(&self) -> bool {
        self.shared.output.borrow().is_some()
    }

    /// Probe the bound output and resume it if suspended
    ///
    /// # Returns
    ///
    /// State observed after the attempt. Never fails.
    pub fn resume(&self) -> AudioState {
        resume_output(&self.shared)
    }

    /// Number of fullscreen settles that have not run yet
    pub fn pending_settles(&self) -> usize {
        self.shared.settles.borrow().len()
    }

    /// Deregister listeners, cancel pending settles and drop the output
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        if !self.shared.live.replace(false) {
            return;
        }
        for mut sub in self.shared.subscriptions.borrow_mut().drain(..) {
            sub.unsubscribe();
        }
        self.shared.settles.borrow_mut().clear();
        if let Some(request) = self.shared.frame.take() {
            self.shared.scheduler.cancel_frame(request);
        }
        self.set_output(None);
        log::debug!("Audio recovery shut down");
    }
}

impl Drop for AudioRecovery {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn schedule_settle(shared: &Rc<RecoveryShared>) {
    if !shared.live.get() {
        return;
    }
    let deadline = Instant::now() + shared.settings.settle_delay;
    shared.settles.borrow_mut().push(deadline);
    request_settle_frame(shared);
}

fn request_settle_frame(shared: &Rc<RecoveryShared>) {
    if shared.frame.get().is_some() {
        return;
    }
    let weak: Weak<RecoveryShared> = Rc::downgrade(shared);
    let request = shared.scheduler.request_frame(Box::new(move || {
        if let Some(shared) = weak.upgrade() {
            shared.frame.set(None);
            run_due_settles(&shared);
        }
    }));
    shared.frame.set(Some(request));
}

fn run_due_settles(shared: &Rc<RecoveryShared>) {
    if !shared.live.get() {
        return;
    }

    let now = Instant::now();
    let due = {
        let mut settles = shared.settles.borrow_mut();
        let before = settles.len();
        settles.retain(|deadline| *deadline > now);
        before - settles.len()
    };

    for _ in 0..due {
        // Focus first so key input reaches the engine once audio is back
        shared.surface.focus();
        if shared.display.is_fullscreen() {
            log::debug!("Entered fullscreen; surface refocused");
        } else {
            log::debug!("Left fullscreen; surface refocused");
        }
        resume_output(shared);
    }

    if shared.live.get() && !shared.settles.borrow().is_empty() {
        request_settle_frame(shared);
    }
}

fn resume_output(shared: &RecoveryShared) -> AudioState {
    if !shared.live.get() {
        return AudioState::Absent;
    }

    let output = shared.output.borrow().clone();
    let Some(output) = output else {
        log::trace!("No audio output exposed; nothing to resume");
        return AudioState::Absent;
    };

    match output.state() {
        AudioState::Suspended => match output.resume() {
            Ok(()) => {
                let state = output.state();
                log::info!("Audio output resumed ({:?})", state);
                state
            }
            Err(e) => {
                log::warn!("{:?}: {} (ignored)", e.kind(), e);
                AudioState::Suspended
            }
        },
        state => state,
    }
}
