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

//! Emulation engine boundary
//!
//! The front end does not emulate anything itself. An [`EngineAdapter`]
//! wraps whatever engine does (a libretro core, a WASM build, an in-process
//! emulator) and hands back one [`EngineHandle`] per running instance.
//!
//! # Contract
//!
//! - `launch` binds the engine to the given surface and starts the cartridge.
//!   It may take arbitrarily long and cannot be interrupted.
//! - `exit` is a request: it returns immediately and the instance releases
//!   the surface on its own schedule.
//! - `save_state` / `load_state` move opaque [`StateBlob`]s in and out; the
//!   layout belongs to the engine.
//! - `audio_output` is an optional probe. Engines that do not expose their
//!   audio device return `None`.

pub mod headless;

use super::audio::AudioOutput;
use super::cartridge::CartridgeImage;
use super::error::EngineError;
use super::platform::Surface;
use super::save_state::StateBlob;
use std::future::Future;
use std::rc::Rc;

pub use headless::{HeadlessEngine, HeadlessInstance};

/// Factory for running engine instances
pub trait EngineAdapter {
    /// Handle to one running instance
    type Handle: EngineHandle + 'static;

    /// Start `cartridge` on `surface`
    ///
    /// # Errors
    ///
    /// Any [`EngineError`] means the instance never started: bad image,
    /// resource exhaustion, or an engine crash during boot.
    fn launch(
        &self,
        surface: Rc<dyn Surface>,
        cartridge: &CartridgeImage,
    ) -> impl Future<Output = Result<Self::Handle, EngineError>>;
}

/// One running engine instance
pub trait EngineHandle {
    /// Request the instance to stop and release its surface
    fn exit(&self);

    /// Snapshot the instance's internal state
    fn save_state(&self) -> impl Future<Output = Result<StateBlob, EngineError>>;

    /// Replace the instance's internal state with `blob`
    ///
    /// On failure the instance keeps running, possibly with partially
    /// applied state.
    fn load_state(&self, blob: &StateBlob) -> impl Future<Output = Result<(), EngineError>>;

    /// Audio output exposed by the instance, if any
    fn audio_output(&self) -> Option<Rc<dyn AudioOutput>> {
        None
    }
}
