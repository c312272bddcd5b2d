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

//! Front end configuration (TOML)
//!
//! ```toml
//! [audio]
//! settle_delay_ms = 100
//! resume_on_interaction = true
//!
//! [input]
//! enabled = true
//! save_state_button = 9
//! fullscreen_button = 8
//!
//! [state]
//! export_dir = "saves"
//! ```
//!
//! Every key is optional. The file path comes from `--config`, then the
//! `AGNES_CONFIG` environment variable; with neither, defaults are used.

use crate::core::audio::RecoverySettings;
use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "AGNES_CONFIG";

/// Standard-mapping Start button
pub const DEFAULT_SAVE_STATE_BUTTON: usize = 9;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Delay after a fullscreen change before refocus and audio probe
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_true")]
    pub resume_on_interaction: bool,
}

/// Controller shortcuts (button indices in the standard gamepad mapping)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Run the gamepad watchdog
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_save_state_button")]
    pub save_state_button: Option<usize>,
    #[serde(default)]
    pub fullscreen_button: Option<usize>,
    #[serde(default)]
    pub reset_button: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    /// Directory exported `.state` files are written to
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_save_state_button() -> Option<usize> {
    Some(DEFAULT_SAVE_STATE_BUTTON)
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            resume_on_interaction: true,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            save_state_button: default_save_state_button(),
            fullscreen_button: None,
            reset_button: None,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config from an explicit path, `AGNES_CONFIG`, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::info!("Loading config from {}", path.display());
            return Self::load_from_file(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                log::info!("Loading config from ${} ({:?})", CONFIG_ENV, path);
                Self::load_from_file(PathBuf::from(path))
            }
            None => {
                log::debug!("No config file given; using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Audio recovery tunables
    pub fn recovery_settings(&self) -> RecoverySettings {
        RecoverySettings {
            settle_delay: Duration::from_millis(self.audio.settle_delay_ms),
            resume_on_interaction: self.audio.resume_on_interaction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.audio.settle_delay_ms, 100);
        assert!(config.audio.resume_on_interaction);
        assert!(config.input.enabled);
        assert_eq!(config.input.save_state_button, Some(9));
        assert_eq!(config.input.fullscreen_button, None);
        assert_eq!(config.state.export_dir, PathBuf::from("."));
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = AppConfig::from_toml_str(
            r#"
            [audio]
            settle_delay_ms = 250

            [input]
            fullscreen_button = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.audio.settle_delay_ms, 250);
        assert!(config.audio.resume_on_interaction);
        assert_eq!(config.input.fullscreen_button, Some(8));
        assert_eq!(config.input.save_state_button, Some(9));

        let settings = config.recovery_settings();
        assert_eq!(settings.settle_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_document() {
        let err = AppConfig::from_toml_str("[audio]\nsettle_delay_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agnes.toml");
        std::fs::write(&path, "[state]\nexport_dir = \"saves\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.state.export_dir, PathBuf::from("saves"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/agnes.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
