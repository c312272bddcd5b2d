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

//! NES front end session controller
//!
//! `agnes` drives an external emulation engine from a front end: it binds a
//! cartridge image to one running engine instance at a time, moves save
//! states in and out, watches gamepads for front end shortcuts, and brings
//! audio back after fullscreen changes and user interactions.
//!
//! - [`core`]: session controller, engine boundary, input watchdog, audio
//!   recovery and platform capabilities
//! - [`frontend`]: configuration, headless host, and the shortcut shell
//!
//! # Example
//!
//! ```
//! use agnes::core::engine::HeadlessEngine;
//! use agnes::core::session::{NoopObserver, SessionState};
//! use agnes::frontend::config::AppConfig;
//! use agnes::frontend::headless::HeadlessPlatform;
//! use agnes::frontend::Frontend;
//! use std::rc::Rc;
//!
//! let platform = HeadlessPlatform::new();
//! let frontend = Frontend::new(
//!     HeadlessEngine::new(),
//!     &platform.host(),
//!     AppConfig::default(),
//!     Rc::new(NoopObserver),
//! );
//! assert_eq!(frontend.controller().state(), SessionState::Idle);
//! ```

pub mod core;
pub mod frontend;
