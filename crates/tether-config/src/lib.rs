//! Configuration for the tether binding service.
//!
//! Every field has a default, so an empty file (or no file) is a valid configuration:
//!
//! ```toml
//! [binding]
//! strong_release_delay_ms = 1000
//! moderate_pool_clear_delay_ms = 10000
//! moderate_pool_capacity = 16   # 0 disables the pool
//!
//! [device]
//! low_memory_threshold_mb = 512
//!
//! [pressure]
//! poll_interval_ms = 1000       # omit to disable sampling
//!
//! [logging]
//! level = "info"
//! ```

mod diagnostics;
mod logging;
mod validation;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_binding::BindingSettings;
use tether_memory::{PressureThresholds, MB};
use thiserror::Error;

pub use diagnostics::{
    ConfigDiagnostics, ConfigValidationError, ConfigWarning, ValidationDiagnostics,
};
pub use logging::{init_tracing, LoggingConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    pub binding: BindingConfig,
    pub device: DeviceConfig,
    pub pressure: PressureConfig,
    pub logging: LoggingConfig,
}

/// `[binding]`: binding policy tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    pub strong_release_delay_ms: u64,
    pub moderate_pool_clear_delay_ms: u64,
    /// Maximum number of pooled moderate bindings. `0` disables the pool.
    pub moderate_pool_capacity: usize,
    /// Fraction of the pool evicted on moderate memory pressure.
    pub moderate_reduce_ratio: f64,
    /// Fraction of the pool evicted on low memory pressure.
    pub low_reduce_ratio: f64,
    pub record_metrics: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        let settings = BindingSettings::default();
        Self {
            strong_release_delay_ms: settings.strong_release_delay.as_millis() as u64,
            moderate_pool_clear_delay_ms: settings.moderate_pool_clear_delay.as_millis() as u64,
            moderate_pool_capacity: 16,
            moderate_reduce_ratio: settings.moderate_reduce_ratio,
            low_reduce_ratio: settings.low_reduce_ratio,
            record_metrics: settings.record_metrics,
        }
    }
}

impl BindingConfig {
    pub fn settings(&self) -> BindingSettings {
        BindingSettings {
            strong_release_delay: Duration::from_millis(self.strong_release_delay_ms),
            moderate_pool_clear_delay: Duration::from_millis(self.moderate_pool_clear_delay_ms),
            moderate_reduce_ratio: self.moderate_reduce_ratio,
            low_reduce_ratio: self.low_reduce_ratio,
            record_metrics: self.record_metrics,
        }
    }

    /// `None` when the pool is disabled.
    pub fn moderate_pool_capacity(&self) -> Option<usize> {
        (self.moderate_pool_capacity > 0).then_some(self.moderate_pool_capacity)
    }
}

/// `[device]`: how the host is classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub low_memory_threshold_mb: u64,
    /// Skip probing and use this classification.
    pub force_low_memory: Option<bool>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            low_memory_threshold_mb: 512,
            force_low_memory: None,
        }
    }
}

impl DeviceConfig {
    pub fn threshold_bytes(&self) -> u64 {
        self.low_memory_threshold_mb.saturating_mul(MB)
    }
}

/// `[pressure]`: optional cgroup pressure sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    pub poll_interval_ms: Option<u64>,
    pub moderate: f64,
    pub low: f64,
    pub critical: f64,
}

impl Default for PressureConfig {
    fn default() -> Self {
        let thresholds = PressureThresholds::default();
        Self {
            poll_interval_ms: None,
            moderate: thresholds.moderate,
            low: thresholds.low,
            critical: thresholds.critical,
        }
    }
}

impl PressureConfig {
    pub fn thresholds(&self) -> PressureThresholds {
        PressureThresholds {
            moderate: self.moderate,
            low: self.low,
            critical: self.critical,
        }
    }

    /// `None` disables sampling, as does an explicit `0`.
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `Display` includes a source snippet; keep only the message.
        ConfigError::Toml(err.message().to_string())
    }
}

impl TetherConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = read_config(path.as_ref())?;
        Ok(toml::from_str(&text)?)
    }

    /// Load a config file from TOML and return diagnostics (unknown keys and semantic validation
    /// failures).
    pub fn load_from_path_with_diagnostics(
        path: impl AsRef<Path>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let text = read_config(path.as_ref())?;
        Self::load_from_str_with_diagnostics(&text)
    }

    pub fn load_from_str_with_diagnostics(
        text: &str,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let (config, unknown_keys) =
            diagnostics::deserialize_toml_with_unknown_keys::<TetherConfig>(text)?;

        let mut diagnostics = ConfigDiagnostics {
            unknown_keys,
            ..ConfigDiagnostics::default()
        };
        diagnostics.extend_validation(config.validate());

        for key in &diagnostics.unknown_keys {
            tracing::warn!(target = "tether.config", key = %key, "unknown config key");
        }
        Ok((config, diagnostics))
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}
