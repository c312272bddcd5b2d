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

//! Headless engine
//!
//! An in-process [`EngineAdapter`] with no hardware emulation behind it. Each
//! instance keeps a frame counter and a 2KB work RAM buffer seeded from the
//! cartridge, which is enough to exercise every front end path (launch,
//! relaunch, save, load, audio recovery) from a terminal or a test.
//!
//! # Save State Format
//!
//! States are serialized with bincode and carry:
//! - Version number (mismatches are rejected)
//! - Metadata (timestamp, cartridge name, frame count)
//! - Work RAM contents
//!
//! A state saved from one cartridge cannot be loaded into another.

use super::{EngineAdapter, EngineHandle};
use crate::core::audio::AudioOutput;
use crate::core::cartridge::CartridgeImage;
use crate::core::error::EngineError;
use crate::core::platform::Surface;
use crate::core::save_state::StateBlob;
use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Headless state version for compatibility checking
pub const HEADLESS_STATE_VERSION: u32 = 1;

/// Work RAM size (matches the NES internal 2KB)
pub const WORK_RAM_SIZE: usize = 2 * 1024;

/// Upper bound on decoded state size (work RAM plus metadata)
///
/// Length prefixes claiming more than this are rejected before allocation.
pub const STATE_DECODE_LIMIT: usize = WORK_RAM_SIZE + 4096;

/// Serialized headless instance state
#[derive(Serialize, Deserialize, Encode, Decode)]
pub struct HeadlessState {
    /// Version number for compatibility checking
    pub version: u32,

    pub metadata: HeadlessStateMetadata,

    /// Work RAM contents
    pub ram: Vec<u8>,
}

/// Headless state metadata
#[derive(Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct HeadlessStateMetadata {
    /// Timestamp when the state was created
    #[bincode(with_serde)]
    pub timestamp: DateTime<Utc>,

    /// Name of the cartridge the state was saved from
    pub cartridge: String,

    /// Frame count at save time
    pub frame_count: u64,
}

impl HeadlessState {
    /// Encode into a blob
    pub fn to_blob(&self) -> Result<StateBlob, EngineError> {
        let encoded = bincode::encode_to_vec(self, config::standard())
            .map_err(|e| EngineError::Crashed(format!("state encoding failed: {}", e)))?;
        Ok(StateBlob::new(encoded))
    }

    /// Decode from a blob, checking the version
    pub fn from_blob(blob: &StateBlob) -> Result<Self, EngineError> {
        let (state, _): (HeadlessState, usize) =
            bincode::decode_from_slice(
                blob.as_bytes(),
                config::standard().with_limit::<STATE_DECODE_LIMIT>(),
            )
            .map_err(|e| EngineError::MalformedState(e.to_string()))?;

        if state.version != HEADLESS_STATE_VERSION {
            return Err(EngineError::IncompatibleState {
                expected: HEADLESS_STATE_VERSION,
                got: state.version,
            });
        }
        if state.ram.len() != WORK_RAM_SIZE {
            return Err(EngineError::MalformedState(format!(
                "work RAM is {} bytes (expected {})",
                state.ram.len(),
                WORK_RAM_SIZE
            )));
        }

        Ok(state)
    }
}

type AudioFactory = Box<dyn Fn() -> Option<Rc<dyn AudioOutput>>>;

/// Headless engine adapter
#[derive(Default)]
pub struct HeadlessEngine {
    audio: Option<AudioFactory>,
    launches: Cell<u64>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give every launched instance an audio output from `factory`
    pub fn with_audio<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Option<Rc<dyn AudioOutput>> + 'static,
    {
        self.audio = Some(Box::new(factory));
        self
    }

    /// Number of successful launches
    pub fn launches(&self) -> u64 {
        self.launches.get()
    }
}

impl EngineAdapter for HeadlessEngine {
    type Handle = HeadlessInstance;

    async fn launch(
        &self,
        surface: Rc<dyn Surface>,
        cartridge: &CartridgeImage,
    ) -> Result<HeadlessInstance, EngineError> {
        if cartridge.is_empty() {
            return Err(EngineError::InvalidImage(format!(
                "'{}' contains no data",
                cartridge.name()
            )));
        }

        // Boot completes on a later poll, like a real engine
        tokio::task::yield_now().await;

        let mut ram = vec![0u8; WORK_RAM_SIZE];
        for (i, byte) in cartridge.bytes().iter().take(WORK_RAM_SIZE).enumerate() {
            ram[i] = *byte;
        }

        self.launches.set(self.launches.get() + 1);
        log::debug!(
            "Headless instance #{} booted '{}'",
            self.launches.get(),
            cartridge.name()
        );

        Ok(HeadlessInstance {
            cartridge: cartridge.name().to_string(),
            frames: Cell::new(0),
            ram: RefCell::new(ram),
            exited: Cell::new(false),
            _surface: surface,
            audio: self.audio.as_ref().and_then(|factory| factory()),
        })
    }
}

/// Running headless instance
pub struct HeadlessInstance {
    cartridge: String,
    frames: Cell<u64>,
    ram: RefCell<Vec<u8>>,
    exited: Cell<bool>,
    /// Held until the instance is dropped
    _surface: Rc<dyn Surface>,
    audio: Option<Rc<dyn AudioOutput>>,
}

impl HeadlessInstance {
    /// Advance one frame
    ///
    /// Mutates one work RAM byte per frame so state round trips are
    /// observable. No-op after exit.
    pub fn run_frame(&self) {
        if self.exited.get() {
            return;
        }
        let frame = self.frames.get() + 1;
        self.frames.set(frame);

        let mut ram = self.ram.borrow_mut();
        let index = (frame as usize) % WORK_RAM_SIZE;
        ram[index] = ram[index].wrapping_add(frame as u8);
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.get()
    }

    pub fn is_exited(&self) -> bool {
        self.exited.get()
    }

    /// Copy of the work RAM
    pub fn ram(&self) -> Vec<u8> {
        self.ram.borrow().clone()
    }

    pub fn cartridge_name(&self) -> &str {
        &self.cartridge
    }
}

impl EngineHandle for HeadlessInstance {
    fn exit(&self) {
        if !self.exited.replace(true) {
            log::debug!(
                "Headless instance for '{}' exited after {} frames",
                self.cartridge,
                self.frames.get()
            );
        }
    }

    async fn save_state(&self) -> Result<StateBlob, EngineError> {
        if self.exited.get() {
            return Err(EngineError::Exited);
        }
        let state = HeadlessState {
            version: HEADLESS_STATE_VERSION,
            metadata: HeadlessStateMetadata {
                timestamp: Utc::now(),
                cartridge: self.cartridge.clone(),
                frame_count: self.frames.get(),
            },
            ram: self.ram.borrow().clone(),
        };
        state.to_blob()
    }

    async fn load_state(&self, blob: &StateBlob) -> Result<(), EngineError> {
        if self.exited.get() {
            return Err(EngineError::Exited);
        }
        let state = HeadlessState::from_blob(blob)?;
        if state.metadata.cartridge != self.cartridge {
            return Err(EngineError::CartridgeMismatch {
                expected: self.cartridge.clone(),
                found: state.metadata.cartridge,
            });
        }

        self.frames.set(state.metadata.frame_count);
        *self.ram.borrow_mut() = state.ram;
        Ok(())
    }

    fn audio_output(&self) -> Option<Rc<dyn AudioOutput>> {
        self.audio.clone()
    }
}
