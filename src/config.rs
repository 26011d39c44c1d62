//! Configuration management.
//!
//! Settings are loaded from a TOML file via the `config` crate and can be
//! overridden with `BRAINPRINT_`-prefixed environment variables. Every field
//! has a serde default so an empty file (or no file at all) yields the
//! defaults the rest of the crate documents: 4 channels, a 100-sample
//! rolling buffer, a 50 ms tick, and a capture window equal to the buffer
//! capacity.
//!
//! Semantic checks that parsing cannot express (non-zero capacities,
//! window bounds) live in [`Settings::validate`].

use crate::error::{AppResult, BrainprintError};
use config::Config;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level settings for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Acquisition producer settings.
    #[serde(default)]
    pub acquisition: AcquisitionSettings,

    /// Authentication pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Settings for the acquisition producer and its rolling buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionSettings {
    /// Number of channels per sample. Fixed for the session lifetime.
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,

    /// Maximum number of samples retained in the rolling buffer.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Interval between acquisition ticks.
    #[serde(with = "humantime_serde", default = "default_tick_interval")]
    pub tick_interval: Duration,
}

/// Settings for a single authentication run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// How many trailing samples to capture at trigger time. `None` means
    /// capture up to the full buffer capacity.
    #[serde(default)]
    pub window_size: Option<usize>,

    /// Artificial latency inserted before each processing stage. Zero for
    /// headless use; interactive frontends may raise it so stage events are
    /// visible as they happen.
    #[serde(with = "humantime_serde", default = "default_stage_latency")]
    pub stage_latency: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            acquisition: AcquisitionSettings::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            channel_count: default_channel_count(),
            buffer_capacity: default_buffer_capacity(),
            tick_interval: default_tick_interval(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            window_size: None,
            stage_latency: default_stage_latency(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channel_count() -> usize {
    4
}

fn default_buffer_capacity() -> usize {
    100
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_stage_latency() -> Duration {
    Duration::ZERO
}

impl Settings {
    /// Load settings from `config/<name>.toml` plus `BRAINPRINT_`-prefixed
    /// environment variables.
    pub fn new(config_name: Option<&str>) -> AppResult<Self> {
        let config_path = format!("config/{}", config_name.unwrap_or("default"));
        let s = Config::builder()
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(config::Environment::with_prefix("BRAINPRINT").separator("__"))
            .build()
            .map_err(BrainprintError::Config)?;

        let settings: Settings = s.try_deserialize().map_err(BrainprintError::Config)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a specific TOML file path.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> AppResult<Self> {
        let s = Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()
            .map_err(BrainprintError::Config)?;
        let settings: Settings = s.try_deserialize().map_err(BrainprintError::Config)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Effective capture window: configured size capped at buffer capacity.
    pub fn window_size(&self) -> usize {
        self.pipeline
            .window_size
            .unwrap_or(self.acquisition.buffer_capacity)
            .min(self.acquisition.buffer_capacity)
    }

    /// Semantic validation of values that parse fine but make no sense.
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(BrainprintError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.acquisition.channel_count == 0 {
            return Err(BrainprintError::Configuration(
                "acquisition.channel_count must be >= 1".into(),
            ));
        }

        if self.acquisition.buffer_capacity == 0 {
            return Err(BrainprintError::Configuration(
                "acquisition.buffer_capacity must be >= 1".into(),
            ));
        }

        if self.acquisition.tick_interval.is_zero() {
            return Err(BrainprintError::Configuration(
                "acquisition.tick_interval must be > 0".into(),
            ));
        }

        if let Some(window) = self.pipeline.window_size {
            if window == 0 {
                return Err(BrainprintError::Configuration(
                    "pipeline.window_size must be >= 1".into(),
                ));
            }
        }

        Ok(())
    }
}
