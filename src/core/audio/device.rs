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

//! Audio output device using cpal
//!
//! The stream is built paused, the same way a browser hands out a suspended
//! audio context until the user interacts with the page. The recovery unit
//! resumes it through [`AudioOutput::resume`]. The headless engine renders no
//! sound, so the stream plays silence.

use super::{AudioOutput, AudioState};
use crate::core::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::cell::Cell;

/// cpal-backed audio output
///
/// # Example
///
/// ```no_run
/// use agnes::core::audio::device::CpalOutput;
/// use agnes::core::audio::{AudioOutput, AudioState};
///
/// let output = CpalOutput::new().unwrap();
/// assert_eq!(output.state(), AudioState::Suspended);
/// output.resume().unwrap();
/// assert_eq!(output.state(), AudioState::Running);
/// ```
pub struct CpalOutput {
    stream: cpal::Stream,
    state: Cell<AudioState>,
}

impl CpalOutput {
    /// Open the default output device in the suspended state
    ///
    /// # Errors
    ///
    /// [`AudioError::DeviceUnavailable`] if there is no output device or the
    /// stream cannot be built.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no output device".to_string()))?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        log::info!(
            "Audio: Using device '{}' at {} Hz, {} channels",
            device_name,
            config.sample_rate().0,
            config.channels()
        );

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| data.fill(0.0),
                |err| log::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        // Some backends start playing on build
        stream
            .pause()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        Ok(Self {
            stream,
            state: Cell::new(AudioState::Suspended),
        })
    }
}

impl AudioOutput for CpalOutput {
    fn state(&self) -> AudioState {
        self.state.get()
    }

    fn resume(&self) -> Result<(), AudioError> {
        self.stream
            .play()
            .map_err(|e| AudioError::ResumeFailed(e.to_string()))?;
        self.state.set(AudioState::Running);
        Ok(())
    }
}
