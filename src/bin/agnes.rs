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

//! Headless NES front end
//!
//! Loads a cartridge, runs it on the headless engine for a number of frames,
//! and optionally imports, exports or resets state along the way.

use agnes::core::cartridge::CartridgeImage;
use agnes::core::engine::HeadlessEngine;
use agnes::core::error::{FrontendError, SessionError};
use agnes::core::session::SessionObserver;
use agnes::frontend::config::AppConfig;
use agnes::frontend::headless::HeadlessPlatform;
use agnes::frontend::Frontend;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

/// NTSC frame period (~60.1 Hz)
const FRAME_PERIOD: Duration = Duration::from_nanos(16_639_267);

/// NES front end (headless)
#[derive(Parser)]
#[command(name = "agnes")]
#[command(about = "NES front end session controller", long_about = None)]
struct Args {
    /// Path to the cartridge image (.nes)
    rom: PathBuf,

    /// Path to a TOML config file (falls back to $AGNES_CONFIG)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of frames to run
    #[arg(short = 'n', long, default_value = "60")]
    frames: u64,

    /// Import a .state file after launch
    #[arg(short = 'l', long)]
    load_state: Option<PathBuf>,

    /// Export <rom>.state into the export directory before exiting
    #[arg(short = 's', long)]
    save_state: bool,

    /// Reset the cartridge halfway through the run
    #[arg(short = 'r', long)]
    reset: bool,

    /// Toggle fullscreen after launch
    #[arg(short = 'f', long)]
    fullscreen: bool,
}

/// Forwards controller status to the log
struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_started(&self, cartridge: &CartridgeImage) {
        info!("Now playing: {}", cartridge.name());
    }

    fn on_error(&self, error: &SessionError) {
        error!("Session error ({:?}): {}", error.kind(), error);
    }
}

#[cfg(feature = "audio")]
fn engine() -> HeadlessEngine {
    use agnes::core::audio::device::CpalOutput;
    use agnes::core::audio::AudioOutput;

    HeadlessEngine::new().with_audio(|| match CpalOutput::new() {
        Ok(output) => Some(Rc::new(output) as Rc<dyn AudioOutput>),
        Err(e) => {
            log::warn!("Running without audio: {}", e);
            None
        }
    })
}

#[cfg(not(feature = "audio"))]
fn engine() -> HeadlessEngine {
    HeadlessEngine::new()
}

async fn run(args: Args, config: AppConfig) -> Result<(), FrontendError> {
    let platform = HeadlessPlatform::new();
    let frontend = Frontend::new(engine(), &platform.host(), config, Rc::new(LogObserver));

    frontend.load_cartridge(&args.rom).await?;

    if let Some(path) = &args.load_state {
        frontend.import_state(path).await?;
    }

    if args.fullscreen {
        frontend.controller().toggle_fullscreen()?;
    }

    let scheduler = platform.scheduler();
    let mut ticker = tokio::time::interval(FRAME_PERIOD);
    for frame in 0..args.frames {
        ticker.tick().await;

        if args.reset && frame == args.frames / 2 {
            frontend.controller().reset().await?;
        }
        if let Some(handle) = frontend.controller().engine_handle() {
            handle.run_frame();
        }
        scheduler.run_frame();
        frontend.process_actions().await;
    }

    // Let a pending fullscreen settle finish before shutting down
    while frontend.controller().audio_recovery().pending_settles() > 0 {
        ticker.tick().await;
        scheduler.run_frame();
        frontend.process_actions().await;
    }

    if let Some(handle) = frontend.controller().engine_handle() {
        info!(
            "Ran {} frames of '{}'",
            handle.frame_count(),
            handle.cartridge_name()
        );
    }

    if args.save_state {
        let path = frontend.export_state().await?;
        info!("Saved state to {}", path.display());
    }

    frontend.teardown();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present; a missing file is not an error
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("agnes v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref()).map_err(FrontendError::from)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let local = tokio::task::LocalSet::new();

    if let Err(e) = local.block_on(&runtime, run(args, config)) {
        error!("{}", e);
        return Err(Box::new(e));
    }

    info!("Session ended");
    Ok(())
}
