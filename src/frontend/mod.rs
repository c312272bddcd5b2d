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

//! Front end shell
//!
//! Glues the session controller to user-facing actions:
//! - controller shortcuts from the input watchdog (save, fullscreen, reset)
//! - cartridge files picked from disk
//! - `.state` export and import
//!
//! Gamepad shortcuts fire from frame callbacks, which cannot await. They are
//! queued as [`UiAction`]s and performed by [`Frontend::process_actions`].

pub mod config;
pub mod headless;

use crate::core::cartridge::CartridgeImage;
use crate::core::engine::EngineAdapter;
use crate::core::error::{FrontendError, SessionError};
use crate::core::input::{ButtonPress, InputWatchdog};
use crate::core::platform::Host;
use crate::core::save_state::StateBlob;
use crate::core::session::{SessionController, SessionObserver};
use config::{AppConfig, InputConfig};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// User-level action bound to a controller button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiAction {
    /// Save state and export it to the configured directory
    SaveState,
    ToggleFullscreen,
    Reset,
}

/// Button → action bindings from the input config
///
/// The first matching binding wins when a button is bound twice.
pub fn shortcut_bindings(input: &InputConfig) -> Vec<(usize, UiAction)> {
    [
        (input.save_state_button, UiAction::SaveState),
        (input.fullscreen_button, UiAction::ToggleFullscreen),
        (input.reset_button, UiAction::Reset),
    ]
    .into_iter()
    .filter_map(|(button, action)| button.map(|b| (b, action)))
    .collect()
}

fn action_for(bindings: &[(usize, UiAction)], press: ButtonPress) -> Option<UiAction> {
    bindings
        .iter()
        .find(|(button, _)| *button == press.button)
        .map(|(_, action)| *action)
}

/// Session controller plus input shortcuts and state files
pub struct Frontend<E: EngineAdapter> {
    config: AppConfig,
    controller: SessionController<E>,
    watchdog: Option<InputWatchdog>,
    actions: Rc<RefCell<VecDeque<UiAction>>>,
}

impl<E: EngineAdapter> Frontend<E> {
    /// Build the front end on `host`
    ///
    /// Starts the input watchdog when `config.input.enabled` is set.
    pub fn new(
        engine: E,
        host: &Host,
        config: AppConfig,
        observer: Rc<dyn SessionObserver>,
    ) -> Self {
        let controller =
            SessionController::new(engine, host, config.recovery_settings(), observer);
        let actions = Rc::new(RefCell::new(VecDeque::new()));

        let watchdog = if config.input.enabled {
            let bindings = shortcut_bindings(&config.input);
            let queue = Rc::clone(&actions);
            let watchdog = InputWatchdog::new(
                Rc::clone(&host.gamepads),
                Rc::clone(&host.scheduler),
                move |press: ButtonPress| {
                    if let Some(action) = action_for(&bindings, press) {
                        log::debug!(
                            "Gamepad {} button {} -> {:?}",
                            press.gamepad,
                            press.button,
                            action
                        );
                        queue.borrow_mut().push_back(action);
                    }
                },
            );
            watchdog.start(&host.bus);
            Some(watchdog)
        } else {
            log::info!("Input watchdog disabled");
            None
        };

        Self {
            config,
            controller,
            watchdog,
            actions,
        }
    }

    pub fn controller(&self) -> &SessionController<E> {
        &self.controller
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn watchdog(&self) -> Option<&InputWatchdog> {
        self.watchdog.as_ref()
    }

    /// Read a `.nes` file and make it the running cartridge
    pub async fn load_cartridge<P: AsRef<Path>>(&self, path: P) -> Result<(), FrontendError> {
        let image = CartridgeImage::from_path(path)?;
        self.controller.set_cartridge(Some(image)).await?;
        Ok(())
    }

    /// Save the running session and write `<cartridge>.state` into the
    /// export directory
    ///
    /// # Returns
    ///
    /// Path of the exported file
    ///
    /// The file is named after the cartridge running when the save started,
    /// even if the session is replaced while the save is in flight.
    pub async fn export_state(&self) -> Result<PathBuf, FrontendError> {
        let cartridge = self
            .controller
            .cartridge()
            .ok_or(SessionError::NoActiveSession)?;
        let blob = self.controller.save_state().await?;
        Ok(blob.write_export(&self.config.state.export_dir, &cartridge)?)
    }

    /// Load a previously exported `.state` file into the running session
    pub async fn import_state<P: AsRef<Path>>(&self, path: P) -> Result<(), FrontendError> {
        let path = path.as_ref();
        let blob = StateBlob::read_from_file(path)?;
        log::info!("Importing state from {} ({} bytes)", path.display(), blob.len());
        self.controller.load_state(&blob).await?;
        Ok(())
    }

    /// Queue an action as if its shortcut had been pressed
    pub fn queue_action(&self, action: UiAction) {
        self.actions.borrow_mut().push_back(action);
    }

    /// Number of queued actions
    pub fn pending_actions(&self) -> usize {
        self.actions.borrow().len()
    }

    /// Perform every queued action in order
    ///
    /// Failures are logged and do not stop later actions.
    ///
    /// # Returns
    ///
    /// Number of actions that succeeded
    pub async fn process_actions(&self) -> usize {
        let mut succeeded = 0;
        loop {
            let next = self.actions.borrow_mut().pop_front();
            let Some(action) = next else {
                break;
            };
            match self.perform(action).await {
                Ok(()) => succeeded += 1,
                Err(e) => log::warn!("{:?} failed: {}", action, e),
            }
        }
        succeeded
    }

    async fn perform(&self, action: UiAction) -> Result<(), FrontendError> {
        match action {
            UiAction::SaveState => self.export_state().await.map(|_| ()),
            UiAction::ToggleFullscreen => Ok(self.controller.toggle_fullscreen()?),
            UiAction::Reset => Ok(self.controller.reset().await?),
        }
    }

    /// Stop the watchdog and tear the controller down. Idempotent.
    pub fn teardown(&self) {
        if let Some(watchdog) = &self.watchdog {
            watchdog.teardown();
        }
        self.controller.teardown();
        self.actions.borrow_mut().clear();
    }
}
