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

//! Test fixtures for common test scenarios

use super::stub_engine::StubEngine;
use agnes::core::audio::RecoverySettings;
use agnes::core::cartridge::CartridgeImage;
use agnes::core::error::{ErrorKind, SessionError};
use agnes::core::session::{SessionController, SessionObserver};
use agnes::frontend::headless::HeadlessPlatform;
use std::cell::RefCell;
use std::rc::Rc;

/// Observer recording every notification
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingObserver {
    pub started: RefCell<Vec<String>>,
    pub errors: RefCell<Vec<ErrorKind>>,
}

impl SessionObserver for RecordingObserver {
    fn on_started(&self, cartridge: &CartridgeImage) {
        self.started.borrow_mut().push(cartridge.name().to_string());
    }

    fn on_error(&self, error: &SessionError) {
        self.errors.borrow_mut().push(error.kind());
    }
}

/// Controller on a fresh headless platform, driven by `engine`
#[allow(dead_code)]
pub struct Harness {
    pub platform: HeadlessPlatform,
    pub engine: StubEngine,
    pub controller: Rc<SessionController<StubEngine>>,
    pub observer: Rc<RecordingObserver>,
}

/// Create a controller around a clone of `engine`
#[allow(dead_code)]
pub fn harness(engine: StubEngine) -> Harness {
    let platform = HeadlessPlatform::new();
    let observer = Rc::new(RecordingObserver::default());
    let controller = Rc::new(SessionController::new(
        engine.clone(),
        &platform.host(),
        RecoverySettings::default(),
        observer.clone(),
    ));
    Harness {
        platform,
        engine,
        controller,
        observer,
    }
}

/// Cartridge image with `len` bytes of filler
#[allow(dead_code)]
pub fn rom(name: &str, len: usize) -> CartridgeImage {
    CartridgeImage::new(name, vec![0xEA; len])
}

/// Let every spawned local task run until it blocks
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
