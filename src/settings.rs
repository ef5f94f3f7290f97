// Wipe settings consumed by the scheduler
//
// The core only reads settings. They are layered from built-in defaults, an
// optional TOML file and `SAYONARA_SHRED_*` environment variables.

use crate::algorithms::{AlgorithmKind, AlgorithmSelection};
use crate::{WipeError, WipeResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on parallel wipe workers
pub const MAX_PARALLEL_LIMIT: usize = 10;

/// Longest allowed pause polling interval
pub const MAX_PAUSE_POLL_MS: u64 = 100;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SAYONARA_SHRED";

/// Delays inserted between blocks to keep the host responsive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    /// Delay per block while no UI is visible
    pub hidden_delay_ms: u64,
    /// Delay per block while a UI is visible
    pub visible_delay_ms: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            hidden_delay_ms: 1,
            visible_delay_ms: 25,
        }
    }
}

impl ThrottleSettings {
    /// Delay to apply before the next block. `None` means just yield.
    pub fn delay(&self, full_resources: bool, ui_visible: bool) -> Option<Duration> {
        if full_resources {
            return None;
        }
        let ms = if ui_visible {
            self.visible_delay_ms
        } else {
            self.hidden_delay_ms
        };
        if ms == 0 {
            None
        } else {
            Some(Duration::from_millis(ms))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WipeSettings {
    pub algorithm: AlgorithmKind,
    pub repeats: u32,
    pub parallel_enabled: bool,
    pub max_threads: usize,
    pub include_folder_names: bool,
    pub use_full_resources: bool,
    pub allow_auto_relaunch: bool,
    pub allow_auto_close: bool,
    /// Bytes requested from the pattern per write
    pub block_size: usize,
    pub pause_poll_ms: u64,
    pub throttle: ThrottleSettings,
}

impl Default for WipeSettings {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::SecureRandom,
            repeats: 1,
            parallel_enabled: true,
            max_threads: num_cpus::get().clamp(1, MAX_PARALLEL_LIMIT),
            include_folder_names: true,
            use_full_resources: false,
            allow_auto_relaunch: false,
            allow_auto_close: false,
            block_size: 64 * 1024,
            pause_poll_ms: MAX_PAUSE_POLL_MS,
            throttle: ThrottleSettings::default(),
        }
    }
}

impl WipeSettings {
    /// Load settings: defaults, then `file` (or the default location), then environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&WipeSettings::default())
            .context("Failed to serialize default settings")?;

        let mut builder = config::Config::builder().add_source(defaults);

        match file {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(path) = Self::default_path() {
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        let settings: WipeSettings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Failed to parse settings")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Default settings file location for this platform
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "sayonara", "sayonara-shred")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    pub fn validate(&self) -> WipeResult<()> {
        if self.repeats == 0 {
            return Err(WipeError::InvalidSettings(
                "repeats must be at least 1".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(WipeError::InvalidSettings(
                "block_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Selected algorithm with its effective repeat count
    pub fn selection(&self) -> AlgorithmSelection {
        AlgorithmSelection::new(self.algorithm, self.repeats)
    }

    /// Maximum concurrently running jobs
    pub fn max_parallel(&self) -> usize {
        if self.parallel_enabled {
            self.max_threads.clamp(1, MAX_PARALLEL_LIMIT)
        } else {
            1
        }
    }

    /// Pause polling interval, never above 100ms
    pub fn pause_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms.clamp(1, MAX_PAUSE_POLL_MS))
    }
}
