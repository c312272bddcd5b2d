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

//! Engine whose launches complete only when the test says so
//!
//! Every `launch` parks on a oneshot channel. Tests resolve launches in any
//! order with [`StubEngine::resolve`], which makes launch races reproducible.

use agnes::core::audio::{AudioOutput, AudioState};
use agnes::core::cartridge::CartridgeImage;
use agnes::core::engine::{EngineAdapter, EngineHandle};
use agnes::core::error::{AudioError, EngineError};
use agnes::core::platform::Surface;
use agnes::core::save_state::StateBlob;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::oneshot;

type LaunchOutcome = Result<(), EngineError>;

struct PendingLaunch {
    id: usize,
    name: String,
    gate: oneshot::Sender<LaunchOutcome>,
}

#[derive(Default)]
struct StubShared {
    pending: RefCell<Vec<PendingLaunch>>,
    /// Cartridge name per launch id, in request order
    requested: RefCell<Vec<String>>,
    created: Cell<usize>,
    exits: Cell<usize>,
    live: Cell<usize>,
    state_calls: Cell<usize>,
    fail_saves: Cell<bool>,
    reject_loads: Cell<bool>,
    hold_saves: Cell<bool>,
    held_saves: RefCell<Vec<oneshot::Sender<()>>>,
    with_audio: Cell<bool>,
}

/// Gated engine; clones share state
#[derive(Clone, Default)]
pub struct StubEngine {
    shared: Rc<StubShared>,
}

#[allow(dead_code)]
impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give every handle a suspended audio output
    pub fn with_audio(self) -> Self {
        self.shared.with_audio.set(true);
        self
    }

    /// Ids of launches still waiting to be resolved, oldest first
    pub fn pending(&self) -> Vec<usize> {
        self.shared.pending.borrow().iter().map(|p| p.id).collect()
    }

    /// Id of the pending launch for `name`
    pub fn pending_for(&self, name: &str) -> Option<usize> {
        self.shared
            .pending
            .borrow()
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
    }

    /// Complete launch `id` with `outcome`
    ///
    /// Returns false if the launch is unknown or already resolved.
    pub fn resolve(&self, id: usize, outcome: LaunchOutcome) -> bool {
        let launch = {
            let mut pending = self.shared.pending.borrow_mut();
            match pending.iter().position(|p| p.id == id) {
                Some(pos) => pending.remove(pos),
                None => return false,
            }
        };
        launch.gate.send(outcome).is_ok()
    }

    /// Complete every pending launch successfully
    pub fn resolve_all(&self) -> usize {
        let ids = self.pending();
        ids.into_iter()
            .filter(|&id| self.resolve(id, Ok(())))
            .count()
    }

    /// Cartridge names in launch order
    pub fn requested(&self) -> Vec<String> {
        self.shared.requested.borrow().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.shared.requested.borrow().len()
    }

    /// Handles created so far
    pub fn created(&self) -> usize {
        self.shared.created.get()
    }

    /// Handles exited so far
    pub fn exits(&self) -> usize {
        self.shared.exits.get()
    }

    /// Handles created and not yet exited
    pub fn live(&self) -> usize {
        self.shared.live.get()
    }

    /// Save/load calls received by any handle
    pub fn state_calls(&self) -> usize {
        self.shared.state_calls.get()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.shared.fail_saves.set(fail);
    }

    pub fn set_reject_loads(&self, reject: bool) {
        self.shared.reject_loads.set(reject);
    }

    /// Park every later save until [`release_saves`](Self::release_saves)
    pub fn set_hold_saves(&self, hold: bool) {
        self.shared.hold_saves.set(hold);
    }

    /// Let every parked save complete
    pub fn release_saves(&self) -> usize {
        let held = std::mem::take(&mut *self.shared.held_saves.borrow_mut());
        held.into_iter().filter_map(|gate| gate.send(()).ok()).count()
    }
}

impl EngineAdapter for StubEngine {
    type Handle = StubHandle;

    async fn launch(
        &self,
        _surface: Rc<dyn Surface>,
        cartridge: &CartridgeImage,
    ) -> Result<StubHandle, EngineError> {
        let (gate, wait) = oneshot::channel();
        let id = {
            let mut requested = self.shared.requested.borrow_mut();
            requested.push(cartridge.name().to_string());
            requested.len() - 1
        };
        self.shared.pending.borrow_mut().push(PendingLaunch {
            id,
            name: cartridge.name().to_string(),
            gate,
        });

        match wait.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(EngineError::Crashed("launch gate dropped".to_string())),
        }

        let shared = &self.shared;
        shared.created.set(shared.created.get() + 1);
        shared.live.set(shared.live.get() + 1);

        let audio = shared
            .with_audio
            .get()
            .then(|| Rc::new(StubAudio::default()));

        Ok(StubHandle {
            id,
            name: cartridge.name().to_string(),
            state: RefCell::new(cartridge.bytes().to_vec()),
            exit_calls: Cell::new(0),
            audio,
            shared: Rc::clone(&self.shared),
        })
    }
}

/// Handle created by [`StubEngine`]
pub struct StubHandle {
    id: usize,
    name: String,
    state: RefCell<Vec<u8>>,
    exit_calls: Cell<usize>,
    audio: Option<Rc<StubAudio>>,
    shared: Rc<StubShared>,
}

#[allow(dead_code)]
impl StubHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exit_calls(&self) -> usize {
        self.exit_calls.get()
    }

    /// Overwrite the engine state, as running frames would
    pub fn poke(&self, bytes: &[u8]) {
        *self.state.borrow_mut() = bytes.to_vec();
    }

    pub fn state(&self) -> Vec<u8> {
        self.state.borrow().clone()
    }

    pub fn audio(&self) -> Option<Rc<StubAudio>> {
        self.audio.clone()
    }
}

impl EngineHandle for StubHandle {
    fn exit(&self) {
        let calls = self.exit_calls.get() + 1;
        self.exit_calls.set(calls);
        if calls == 1 {
            self.shared.exits.set(self.shared.exits.get() + 1);
            self.shared.live.set(self.shared.live.get() - 1);
        }
    }

    async fn save_state(&self) -> Result<StateBlob, EngineError> {
        self.shared.state_calls.set(self.shared.state_calls.get() + 1);
        if self.shared.fail_saves.get() {
            return Err(EngineError::Crashed("save trap".to_string()));
        }
        let bytes = self.state.borrow().clone();
        if self.shared.hold_saves.get() {
            let (gate, wait) = oneshot::channel();
            self.shared.held_saves.borrow_mut().push(gate);
            let _ = wait.await;
        }
        Ok(StateBlob::new(bytes))
    }

    async fn load_state(&self, blob: &StateBlob) -> Result<(), EngineError> {
        self.shared.state_calls.set(self.shared.state_calls.get() + 1);
        if self.shared.reject_loads.get() {
            return Err(EngineError::MalformedState("rejected by stub".to_string()));
        }
        *self.state.borrow_mut() = blob.as_bytes().to_vec();
        Ok(())
    }

    fn audio_output(&self) -> Option<Rc<dyn AudioOutput>> {
        self.audio
            .clone()
            .map(|audio| audio as Rc<dyn AudioOutput>)
    }
}

/// Audio output that starts suspended, like a freshly created device
pub struct StubAudio {
    state: Cell<AudioState>,
    resumes: Cell<usize>,
}

impl Default for StubAudio {
    fn default() -> Self {
        Self {
            state: Cell::new(AudioState::Suspended),
            resumes: Cell::new(0),
        }
    }
}

#[allow(dead_code)]
impl StubAudio {
    pub fn resumes(&self) -> usize {
        self.resumes.get()
    }

    /// Suspend again, as a host does when focus is lost
    pub fn suspend(&self) {
        self.state.set(AudioState::Suspended);
    }
}

impl AudioOutput for StubAudio {
    fn state(&self) -> AudioState {
        self.state.get()
    }

    fn resume(&self) -> Result<(), AudioError> {
        self.resumes.set(self.resumes.get() + 1);
        self.state.set(AudioState::Running);
        Ok(())
    }
}
