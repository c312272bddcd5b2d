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

//! Opaque save state blobs
//!
//! A [`StateBlob`] is whatever the engine produced when asked to save. The
//! front end never looks inside: it hands the bytes to the caller, and the
//! caller may hand them back later for a load.
//!
//! # Export Format
//!
//! An exported blob is written verbatim to `<cartridgeName>.state`, e.g.
//! `Mario.nes.state`. Nothing is prepended or appended.
//!
//! # Example
//!
//! ```no_run
//! use agnes::core::cartridge::CartridgeImage;
//! use agnes::core::save_state::StateBlob;
//!
//! let rom = CartridgeImage::new("game.nes", vec![0u8; 16]);
//! let blob = StateBlob::new(vec![1, 2, 3]);
//!
//! // Writes ./game.nes.state
//! let path = blob.write_export(".", &rom).unwrap();
//!
//! // Later: read it back for a load
//! let restored = StateBlob::read_from_file(&path).unwrap();
//! assert_eq!(restored, blob);
//! ```

use super::cartridge::CartridgeImage;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Extension appended to the cartridge name for exported states
pub const STATE_EXTENSION: &str = "state";

/// Opaque engine state snapshot
#[derive(Clone, PartialEq, Eq)]
pub struct StateBlob {
    bytes: Vec<u8>,
}

impl StateBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name a caller should offer this blob under
    ///
    /// # Example
    ///
    /// ```
    /// use agnes::core::cartridge::CartridgeImage;
    /// use agnes::core::save_state::StateBlob;
    ///
    /// let rom = CartridgeImage::new("Zelda.nes", vec![0u8]);
    /// assert_eq!(StateBlob::export_file_name(&rom), "Zelda.nes.state");
    /// ```
    pub fn export_file_name(cartridge: &CartridgeImage) -> String {
        format!("{}.{}", cartridge.name(), STATE_EXTENSION)
    }

    /// Write this blob to `<dir>/<cartridgeName>.state`
    ///
    /// # Returns
    ///
    /// Path of the written file
    pub fn write_export<P: AsRef<Path>>(
        &self,
        dir: P,
        cartridge: &CartridgeImage,
    ) -> std::io::Result<PathBuf> {
        let path = dir.as_ref().join(Self::export_file_name(cartridge));
        let mut file = File::create(&path)?;
        file.write_all(&self.bytes)?;
        log::info!("State exported to {} ({} bytes)", path.display(), self.len());
        Ok(path)
    }

    /// Read a previously exported blob
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(Self::new(buffer))
    }
}

impl From<Vec<u8>> for StateBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl std::fmt::Debug for StateBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateBlob").field("len", &self.len()).finish()
    }
}
