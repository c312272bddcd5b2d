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

//! Custom assertions for session controller testing

use super::stub_engine::StubEngine;
use agnes::core::session::{SessionController, SessionState};

/// Assert the controller is running `name` on exactly one live handle
#[allow(dead_code)]
pub fn assert_running(controller: &SessionController<StubEngine>, engine: &StubEngine, name: &str) {
    assert_eq!(controller.state(), SessionState::Running, "controller not running");
    let handle = controller.engine_handle().expect("running without a handle");
    assert_eq!(handle.name(), name, "wrong cartridge adopted");
    assert_eq!(
        engine.live(),
        1,
        "expected one live handle, found {}",
        engine.live()
    );
}

/// Assert the controller is idle and every created handle was exited
#[allow(dead_code)]
pub fn assert_idle(controller: &SessionController<StubEngine>, engine: &StubEngine) {
    assert_eq!(controller.state(), SessionState::Idle, "controller not idle");
    assert!(controller.engine_handle().is_none(), "idle with a handle");
    assert_eq!(
        engine.created(),
        engine.exits(),
        "{} handles created but only {} exited",
        engine.created(),
        engine.exits()
    );
}
