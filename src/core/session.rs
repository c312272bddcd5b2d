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

//! Emulation session controller
//!
//! The controller owns at most one running engine instance (a session) and
//! the surface it draws into. Changing the cartridge exits the current
//! session and launches a new one; saving and loading pass opaque blobs
//! between the caller and the engine.
//!
//! # Session Lifecycle
//!
//! ```text
//! Idle ──set_cartridge(Some)──> Launching ──launch ok──> Running
//!  ^                               │                        │
//!  │                          launch failed           set_cartridge / teardown
//!  │                               │                        │
//!  └───────────────────────────────┴──────── Exiting <──────┘
//! ```
//!
//! # Stale Launches
//!
//! Engine launches cannot be interrupted, so a cartridge change while a
//! launch is in flight cannot cancel it. Every launch captures the
//! controller generation when it starts; a launch that resolves after the
//! generation moved on is exited on the spot and never becomes the session.
//!
//! # Example
//!
//! ```no_run
//! use agnes::core::cartridge::CartridgeImage;
//! use agnes::core::engine::HeadlessEngine;
//! use agnes::core::session::{NoopObserver, SessionController, SessionState};
//! use agnes::core::audio::RecoverySettings;
//! use agnes::frontend::headless::HeadlessPlatform;
//! use std::rc::Rc;
//!
//! # async fn run() -> agnes::core::error::Result<()> {
//! let platform = HeadlessPlatform::new();
//! let controller = SessionController::new(
//!     HeadlessEngine::new(),
//!     &platform.host(),
//!     RecoverySettings::default(),
//!     Rc::new(NoopObserver),
//! );
//!
//! let rom = CartridgeImage::from_path("game.nes").unwrap();
//! controller.set_cartridge(Some(rom)).await?;
//! assert_eq!(controller.state(), SessionState::Running);
//!
//! let blob = controller.save_state().await?;
//! controller.load_state(&blob).await?;
//! controller.teardown();
//! # Ok(())
//! # }
//! ```

use super::audio::{AudioRecovery, RecoverySettings};
use super::cartridge::CartridgeImage;
use super::engine::{EngineAdapter, EngineHandle};
use super::error::{PlatformError, Result, SessionError};
use super::platform::{Display, Host, Surface};
use super::save_state::StateBlob;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Controller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Launching,
    Running,
    Exiting,
}

/// Passive status notifications
///
/// Both methods default to doing nothing.
pub trait SessionObserver {
    /// A launch was adopted and the session is running
    fn on_started(&self, cartridge: &CartridgeImage) {
        let _ = cartridge;
    }

    /// An operation failed in the engine (launch, save or load)
    fn on_error(&self, error: &SessionError) {
        let _ = error;
    }
}

/// Observer that ignores every notification
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Live binding between one cartridge and one engine instance
struct Session<H: EngineHandle> {
    cartridge: CartridgeImage,
    handle: Rc<H>,
    generation: u64,
}

impl<H: EngineHandle> Session<H> {
    /// Consumes the session, so exit is requested at most once
    fn exit(self) {
        log::info!(
            "Exiting session for '{}' (generation {})",
            self.cartridge.name(),
            self.generation
        );
        self.handle.exit();
    }
}

/// Resets the state to `Idle` if a launch future is dropped before it
/// resolves and no newer request took over.
struct LaunchGuard<'a> {
    state: &'a Cell<SessionState>,
    generation: &'a Cell<u64>,
    mine: u64,
    armed: bool,
}

impl LaunchGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LaunchGuard<'_> {
    fn drop(&mut self) {
        if self.armed
            && self.generation.get() == self.mine
            && self.state.get() == SessionState::Launching
        {
            log::debug!("Launch abandoned by caller (generation {})", self.mine);
            self.state.set(SessionState::Idle);
        }
    }
}

/// Emulation session controller
///
/// Single-threaded: all methods take `&self`, and overlapping calls (for
/// example two `set_cartridge` futures polled together) are resolved by the
/// generation counter.
pub struct SessionController<E: EngineAdapter> {
    engine: E,
    surface: Rc<dyn Surface>,
    display: Rc<dyn Display>,
    observer: Rc<dyn SessionObserver>,
    recovery: AudioRecovery,
    generation: Cell<u64>,
    state: Cell<SessionState>,
    session: RefCell<Option<Session<E::Handle>>>,
    /// Most recently requested cartridge
    requested: RefCell<Option<CartridgeImage>>,
    torn_down: Cell<bool>,
}

impl<E: EngineAdapter> SessionController<E> {
    /// Create a controller bound to the host's surface and display
    ///
    /// Registers the audio recovery listeners on the host's event bus.
    pub fn new(
        engine: E,
        host: &Host,
        settings: RecoverySettings,
        observer: Rc<dyn SessionObserver>,
    ) -> Self {
        let recovery = AudioRecovery::new(
            Rc::clone(&host.surface),
            Rc::clone(&host.display),
            Rc::clone(&host.scheduler),
            settings,
        );
        recovery.attach(&host.bus);
        log::debug!(
            "Session controller created (settle delay {:?})",
            settings.settle_delay
        );

        Self {
            engine,
            surface: Rc::clone(&host.surface),
            display: Rc::clone(&host.display),
            observer,
            recovery,
            generation: Cell::new(0),
            state: Cell::new(SessionState::Idle),
            session: RefCell::new(None),
            requested: RefCell::new(None),
            torn_down: Cell::new(false),
        }
    }

    /// Bind the controller to `image`, or tear the session down with `None`
    ///
    /// Exits the current session, then launches `image`. When several calls
    /// overlap, only the most recent one's launch is adopted; older launches
    /// that resolve later are exited immediately and return `Ok(())`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::LaunchFailed`] if the engine could not start the
    ///   image; the controller stays `Idle` and does not retry
    /// - [`SessionError::TornDown`] after [`teardown`](Self::teardown)
    pub async fn set_cartridge(&self, image: Option<CartridgeImage>) -> Result<()> {
        if self.torn_down.get() {
            return Err(SessionError::TornDown);
        }

        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        *self.requested.borrow_mut() = image.clone();

        // Release the surface before the next launch binds it
        self.exit_session();

        let Some(image) = image else {
            self.state.set(SessionState::Idle);
            log::info!("Cartridge cleared; controller idle");
            return Ok(());
        };

        self.state.set(SessionState::Launching);
        log::info!(
            "Launching '{}' ({} bytes, generation {})",
            image.name(),
            image.len(),
            generation
        );

        let guard = LaunchGuard {
            state: &self.state,
            generation: &self.generation,
            mine: generation,
            armed: true,
        };
        let result = self.engine.launch(Rc::clone(&self.surface), &image).await;
        guard.disarm();

        if generation != self.generation.get() {
            match result {
                Ok(handle) => {
                    log::debug!(
                        "Discarding stale launch of '{}' (generation {}, current {})",
                        image.name(),
                        generation,
                        self.generation.get()
                    );
                    handle.exit();
                }
                Err(e) => {
                    log::debug!("Stale launch of '{}' failed: {} (ignored)", image.name(), e);
                }
            }
            return Ok(());
        }

        match result {
            Ok(handle) => {
                let handle = Rc::new(handle);
                self.recovery.set_output(handle.audio_output());
                *self.session.borrow_mut() = Some(Session {
                    cartridge: image.clone(),
                    handle,
                    generation,
                });
                self.state.set(SessionState::Running);
                log::info!("Emulator started: '{}'", image.name());
                self.observer.on_started(&image);
                Ok(())
            }
            Err(source) => {
                self.state.set(SessionState::Idle);
                self.requested.borrow_mut().take();
                let err = SessionError::LaunchFailed {
                    name: image.name().to_string(),
                    source,
                };
                log::error!("{}", err);
                self.observer.on_error(&err);
                Err(err)
            }
        }
    }

    /// Relaunch the current cartridge from power-on
    ///
    /// The image is replaced by a fresh copy, which goes through
    /// [`set_cartridge`](Self::set_cartridge) like any cartridge change.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveSession`] when no cartridge is bound.
    pub async fn reset(&self) -> Result<()> {
        let current = self
            .requested
            .borrow()
            .clone()
            .ok_or(SessionError::NoActiveSession)?;
        log::info!("Resetting '{}'", current.name());
        self.set_cartridge(Some(current.reloaded())).await
    }

    /// Snapshot the running session's engine state
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoActiveSession`] if nothing is running
    /// - [`SessionError::SaveFailed`] if the engine failed; the session keeps
    ///   running
    pub async fn save_state(&self) -> Result<StateBlob> {
        let handle = self.running_handle()?;
        match handle.save_state().await {
            Ok(blob) => {
                log::info!("State saved (Blob size): {}", blob.len());
                Ok(blob)
            }
            Err(e) => {
                let err = SessionError::SaveFailed(e);
                log::error!("{}", err);
                self.observer.on_error(&err);
                Err(err)
            }
        }
    }

    /// Replace the running session's engine state with `blob`
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoActiveSession`] if nothing is running
    /// - [`SessionError::LoadFailed`] if the engine rejected the blob; the
    ///   session keeps running, possibly with partially applied state
    pub async fn load_state(&self, blob: &StateBlob) -> Result<()> {
        let handle = self.running_handle()?;
        match handle.load_state(blob).await {
            Ok(()) => {
                log::info!("State loaded ({} bytes)", blob.len());
                Ok(())
            }
            Err(e) => {
                let err = SessionError::LoadFailed(e);
                log::error!("{}", err);
                self.observer.on_error(&err);
                Err(err)
            }
        }
    }

    /// Toggle document-level fullscreen
    ///
    /// The display raises a fullscreen-change notification, which the audio
    /// recovery unit picks up.
    pub fn toggle_fullscreen(&self) -> std::result::Result<(), PlatformError> {
        if self.display.is_fullscreen() {
            log::info!("Leaving fullscreen");
            self.display.exit_fullscreen()
        } else {
            log::info!("Entering fullscreen");
            self.display.request_fullscreen()
        }
    }

    /// Enter fullscreen; leaves it instead when already fullscreen
    pub fn request_fullscreen(&self) -> std::result::Result<(), PlatformError> {
        self.toggle_fullscreen()
    }

    /// Leave fullscreen. No-op when not fullscreen.
    pub fn exit_fullscreen(&self) -> std::result::Result<(), PlatformError> {
        if self.display.is_fullscreen() {
            log::info!("Leaving fullscreen");
            self.display.exit_fullscreen()
        } else {
            Ok(())
        }
    }

    /// Remove every listener and exit the live session
    ///
    /// In-flight launches become stale and are exited when they resolve.
    /// Idempotent; later `set_cartridge` calls fail with
    /// [`SessionError::TornDown`].
    pub fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        self.generation.set(self.generation.get().wrapping_add(1));
        self.recovery.shutdown();
        self.exit_session();
        self.requested.borrow_mut().take();
        self.state.set(SessionState::Idle);
        log::info!("Session controller torn down");
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Current launch generation
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.get()
    }

    /// Cartridge of the running session
    pub fn cartridge(&self) -> Option<CartridgeImage> {
        self.session.borrow().as_ref().map(|s| s.cartridge.clone())
    }

    /// Cartridge most recently passed to `set_cartridge`, if still bound
    pub fn requested_cartridge(&self) -> Option<CartridgeImage> {
        self.requested.borrow().clone()
    }

    /// Engine handle of the running session
    pub fn engine_handle(&self) -> Option<Rc<E::Handle>> {
        self.running_handle().ok()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Audio recovery unit wired to this controller
    pub fn audio_recovery(&self) -> &AudioRecovery {
        &self.recovery
    }

    fn running_handle(&self) -> Result<Rc<E::Handle>> {
        if self.state.get() != SessionState::Running {
            return Err(SessionError::NoActiveSession);
        }
        self.session
            .borrow()
            .as_ref()
            .map(|s| Rc::clone(&s.handle))
            .ok_or(SessionError::NoActiveSession)
    }

    fn exit_session(&self) {
        let session = self.session.borrow_mut().take();
        if let Some(session) = session {
            self.state.set(SessionState::Exiting);
            self.recovery.set_output(None);
            session.exit();
        }
    }
}

impl<E: EngineAdapter> Drop for SessionController<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::HeadlessEngine;
    use crate::core::error::ErrorKind;
    use crate::frontend::headless::HeadlessPlatform;

    #[derive(Default)]
    struct Recorder {
        started: RefCell<Vec<String>>,
        errors: RefCell<Vec<ErrorKind>>,
    }

    impl SessionObserver for Recorder {
        fn on_started(&self, cartridge: &CartridgeImage) {
            self.started.borrow_mut().push(cartridge.name().to_string());
        }

        fn on_error(&self, error: &SessionError) {
            self.errors.borrow_mut().push(error.kind());
        }
    }

    fn controller() -> (
        SessionController<HeadlessEngine>,
        HeadlessPlatform,
        Rc<Recorder>,
    ) {
        let platform = HeadlessPlatform::new();
        let recorder = Rc::new(Recorder::default());
        let controller = SessionController::new(
            HeadlessEngine::new(),
            &platform.host(),
            RecoverySettings::default(),
            recorder.clone(),
        );
        (controller, platform, recorder)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_launch_and_clear() {
        let (controller, _platform, recorder) = controller();
        assert_eq!(controller.state(), SessionState::Idle);

        let rom = CartridgeImage::new("game.nes", vec![1, 2, 3]);
        controller.set_cartridge(Some(rom.clone())).await.unwrap();
        assert_eq!(controller.state(), SessionState::Running);
        assert!(controller.cartridge().unwrap().same_image(&rom));
        assert_eq!(*recorder.started.borrow(), vec!["game.nes".to_string()]);

        let handle = controller.engine_handle().unwrap();
        controller.set_cartridge(None).await.unwrap();
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(handle.is_exited());
        assert!(controller.cartridge().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_launch_failure_stays_idle() {
        let (controller, _platform, recorder) = controller();
        let result = controller
            .set_cartridge(Some(CartridgeImage::new("empty.nes", Vec::new())))
            .await;

        assert!(matches!(result, Err(SessionError::LaunchFailed { .. })));
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(*recorder.errors.borrow(), vec![ErrorKind::LaunchFailed]);
        assert!(recorder.started.borrow().is_empty());
        assert!(controller.requested_cartridge().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_no_active_session() {
        let (controller, _platform, recorder) = controller();
        assert!(matches!(
            controller.save_state().await,
            Err(SessionError::NoActiveSession)
        ));
        assert!(matches!(
            controller.load_state(&StateBlob::new(vec![1])).await,
            Err(SessionError::NoActiveSession)
        ));
        assert!(matches!(
            controller.reset().await,
            Err(SessionError::NoActiveSession)
        ));
        assert!(recorder.errors.borrow().is_empty());
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_load_failure_keeps_session() {
        let (controller, _platform, recorder) = controller();
        controller
            .set_cartridge(Some(CartridgeImage::new("game.nes", vec![1])))
            .await
            .unwrap();

        let result = controller.load_state(&StateBlob::new(vec![0xFF; 4])).await;
        assert!(matches!(result, Err(SessionError::LoadFailed(_))));
        assert_eq!(controller.state(), SessionState::Running);
        assert_eq!(*recorder.errors.borrow(), vec![ErrorKind::LoadFailed]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_reset_relaunches_fresh_image() {
        let (controller, _platform, recorder) = controller();
        let rom = CartridgeImage::new("game.nes", vec![7; 8]);
        controller.set_cartridge(Some(rom.clone())).await.unwrap();
        let first = controller.engine_handle().unwrap();
        first.run_frame();

        controller.reset().await.unwrap();
        let second = controller.engine_handle().unwrap();

        assert!(first.is_exited());
        assert_eq!(second.frame_count(), 0);
        let current = controller.cartridge().unwrap();
        assert!(!current.same_image(&rom));
        assert_eq!(current.bytes(), rom.bytes());
        assert_eq!(recorder.started.borrow().len(), 2);
        assert_eq!(controller.engine().launches(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_teardown_exits_and_blocks_relaunch() {
        let (controller, platform, _recorder) = controller();
        controller
            .set_cartridge(Some(CartridgeImage::new("game.nes", vec![1])))
            .await
            .unwrap();
        let handle = controller.engine_handle().unwrap();
        assert!(platform.bus().listener_count() > 0);

        controller.teardown();
        controller.teardown();

        assert!(handle.is_exited());
        assert_eq!(platform.bus().listener_count(), 0);
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(matches!(
            controller
                .set_cartridge(Some(CartridgeImage::new("game.nes", vec![1])))
                .await,
            Err(SessionError::TornDown)
        ));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_toggle_fullscreen_round_trip() {
        let (controller, platform, _recorder) = controller();
        assert!(!platform.display().is_fullscreen());

        controller.toggle_fullscreen().unwrap();
        assert!(platform.display().is_fullscreen());
        controller.request_fullscreen().unwrap();
        assert!(!platform.display().is_fullscreen());

        controller.exit_fullscreen().unwrap();
        assert!(!platform.display().is_fullscreen());
        assert_eq!(platform.display().transitions(), 2);

        // Each transition refocuses the surface once settled
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        platform.scheduler().run_frame();
        assert_eq!(platform.surface().focus_count(), 2);
    }

    #[test]
    fn test_toggle_fullscreen_from_plain_sync_code() {
        let (controller, platform, _recorder) = controller();

        controller.toggle_fullscreen().unwrap();
        controller.toggle_fullscreen().unwrap();
        assert_eq!(platform.display().transitions(), 2);
        assert_eq!(controller.audio_recovery().pending_settles(), 2);

        std::thread::sleep(std::time::Duration::from_millis(120));
        platform.scheduler().run_frame();
        assert_eq!(platform.surface().focus_count(), 2);
        assert_eq!(controller.audio_recovery().pending_settles(), 0);
    }

    #[test]
    fn test_drop_tears_down() {
        let platform = HeadlessPlatform::new();
        {
            let _controller = SessionController::new(
                HeadlessEngine::new(),
                &platform.host(),
                RecoverySettings::default(),
                Rc::new(NoopObserver),
            );
            assert_eq!(platform.bus().listener_count(), 3);
        }
        assert_eq!(platform.bus().listener_count(), 0);
    }
}
