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

//! Session core
//!
//! - Session controller (cartridge binding, stale launch discard)
//! - Engine boundary and the headless engine
//! - Input watchdog (gamepad rising edges)
//! - Audio recovery (fullscreen settle and interaction resume)
//! - Host platform capabilities and event bus

pub mod audio;
pub mod cartridge;
pub mod engine;
pub mod error;
pub mod input;
pub mod platform;
pub mod save_state;
pub mod session;

// Re-export commonly used types
pub use audio::{AudioOutput, AudioRecovery, AudioState, RecoverySettings};
pub use cartridge::CartridgeImage;
pub use engine::{EngineAdapter, EngineHandle};
pub use error::{EngineError, ErrorKind, Result, SessionError};
pub use input::{ButtonPress, GamepadSnapshot, GamepadSource, InputWatchdog};
pub use platform::{EventBus, Host, PlatformEvent};
pub use save_state::StateBlob;
pub use session::{SessionController, SessionObserver, SessionState};
