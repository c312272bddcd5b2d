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

//! Cartridge images
//!
//! A [`CartridgeImage`] is an immutable, named ROM byte sequence handed to the
//! engine adapter at launch. Its identity is the shared allocation: two images
//! with identical bytes are still different cartridges unless one is a clone
//! of the other. Replacing the image wholesale is how a reset is requested.
//!
//! # Example
//!
//! ```
//! use agnes::core::cartridge::CartridgeImage;
//!
//! let rom = CartridgeImage::new("game.nes", vec![0x4E, 0x45, 0x53, 0x1A]);
//! let same = rom.clone();
//! let reset = rom.reloaded();
//!
//! assert!(rom.same_image(&same));
//! assert!(!rom.same_image(&reset));
//! assert_eq!(reset.bytes(), rom.bytes());
//! ```

use super::error::CartridgeError;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// File extension accepted by the loader
pub const CARTRIDGE_EXTENSION: &str = "nes";

struct CartridgeData {
    name: String,
    bytes: Box<[u8]>,
}

/// Immutable named ROM image
#[derive(Clone)]
pub struct CartridgeImage {
    data: Rc<CartridgeData>,
}

impl CartridgeImage {
    /// Create a cartridge image from a display name and ROM bytes
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Rc::new(CartridgeData {
                name: name.into(),
                bytes: bytes.into().into_boxed_slice(),
            }),
        }
    }

    /// Load a `.nes` file from disk
    ///
    /// The display name is the file name. The extension check is
    /// case-insensitive; empty files are rejected.
    ///
    /// # Errors
    ///
    /// - [`CartridgeError::UnsupportedExtension`] for anything but `.nes`
    /// - [`CartridgeError::Empty`] for a zero-length file
    /// - [`CartridgeError::Io`] if the file cannot be read
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let accepted = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(CARTRIDGE_EXTENSION))
            .unwrap_or(false);
        if !accepted {
            return Err(CartridgeError::UnsupportedExtension(name));
        }

        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(CartridgeError::Empty(name));
        }

        log::info!("Cartridge selected: {} ({} bytes)", name, bytes.len());
        Ok(Self::new(name, bytes))
    }

    /// Display name (usually the file name)
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Raw ROM bytes
    pub fn bytes(&self) -> &[u8] {
        &self.data.bytes
    }

    pub fn len(&self) -> usize {
        self.data.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.bytes.is_empty()
    }

    /// Whether `other` is the same image (reference identity, not content)
    #[inline]
    pub fn same_image(&self, other: &CartridgeImage) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Copy of this image with a fresh identity
    ///
    /// Handing the copy to the controller relaunches the same game.
    pub fn reloaded(&self) -> Self {
        Self::new(self.data.name.clone(), self.data.bytes.to_vec())
    }
}

impl fmt::Debug for CartridgeImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartridgeImage")
            .field("name", &self.data.name)
            .field("len", &self.data.bytes.len())
            .finish()
    }
}
