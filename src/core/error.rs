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

/// Front end error types
use thiserror::Error;

/// Result type for session controller operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Coarse classification of surfaced failures
///
/// Passed to [`SessionObserver::on_error`](crate::core::session::SessionObserver::on_error)
/// so callers can react without matching on error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LaunchFailed,
    SaveFailed,
    LoadFailed,
    NoActiveSession,
    AudioResumeFailed,
    TornDown,
}

/// Errors surfaced by the session controller
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to launch '{name}': {source}")]
    LaunchFailed {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("Save state failed: {0}")]
    SaveFailed(#[source] EngineError),

    #[error("Load state failed: {0}")]
    LoadFailed(#[source] EngineError),

    #[error("No active session")]
    NoActiveSession,

    #[error("Session controller has been torn down")]
    TornDown,
}

impl SessionError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::LaunchFailed { .. } => ErrorKind::LaunchFailed,
            SessionError::SaveFailed(_) => ErrorKind::SaveFailed,
            SessionError::LoadFailed(_) => ErrorKind::LoadFailed,
            SessionError::NoActiveSession => ErrorKind::NoActiveSession,
            SessionError::TornDown => ErrorKind::TornDown,
        }
    }
}

/// Engine-side failures reported through the engine adapter
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid cartridge image: {0}")]
    InvalidImage(String),

    #[error("Engine resources exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Engine crashed: {0}")]
    Crashed(String),

    #[error("Engine instance has exited")]
    Exited,

    #[error("Malformed state blob: {0}")]
    MalformedState(String),

    #[error("Incompatible save state version: expected {expected}, got {got}")]
    IncompatibleState { expected: u32, got: u32 },

    #[error("State belongs to '{found}', running '{expected}'")]
    CartridgeMismatch { expected: String, found: String },
}

/// Audio output failures
///
/// Never surfaced to callers of the session controller; the audio recovery
/// unit logs and drops them.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio resume failed: {0}")]
    ResumeFailed(String),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),
}

impl AudioError {
    /// Classification used when the recovery unit logs a dropped failure
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::AudioResumeFailed
    }
}

/// Host platform failures
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Fullscreen request rejected: {0}")]
    FullscreenRejected(String),
}

/// Cartridge loader failures
#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("Unsupported cartridge file '{0}' (expected a .nes file)")]
    UnsupportedExtension(String),

    #[error("Cartridge file '{0}' is empty")]
    Empty(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error for the front end binary
#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Cartridge error: {0}")]
    Cartridge(#[from] CartridgeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_kinds() {
        let launch = SessionError::LaunchFailed {
            name: "game.nes".to_string(),
            source: EngineError::InvalidImage("empty".to_string()),
        };
        assert_eq!(launch.kind(), ErrorKind::LaunchFailed);
        assert_eq!(
            SessionError::SaveFailed(EngineError::Exited).kind(),
            ErrorKind::SaveFailed
        );
        assert_eq!(
            SessionError::LoadFailed(EngineError::Exited).kind(),
            ErrorKind::LoadFailed
        );
        assert_eq!(
            SessionError::NoActiveSession.kind(),
            ErrorKind::NoActiveSession
        );
        assert_eq!(
            AudioError::ResumeFailed("denied".to_string()).kind(),
            ErrorKind::AudioResumeFailed
        );
    }

    #[test]
    fn test_launch_failed_message() {
        let err = SessionError::LaunchFailed {
            name: "game.nes".to_string(),
            source: EngineError::Crashed("core abort".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("game.nes"));
        assert!(msg.contains("core abort"));
    }

    #[test]
    fn test_incompatible_state_message() {
        let err = EngineError::IncompatibleState {
            expected: 1,
            got: 999,
        };
        assert!(err
            .to_string()
            .contains("Incompatible save state version"));
    }
}
