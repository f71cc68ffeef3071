use serde::{Deserialize, Serialize};

use crate::settings::BindingSettings;

/// Memory pressure levels reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPressureLevel {
    Moderate,
    Low,
    Critical,
    /// The embedding UI is no longer visible.
    UiHidden,
}

impl MemoryPressureLevel {
    /// Ordering used to decide whether a level escalates another. `UiHidden` is not a severity.
    pub const fn severity(self) -> u8 {
        match self {
            Self::UiHidden => 0,
            Self::Moderate => 1,
            Self::Low => 2,
            Self::Critical => 3,
        }
    }
}

/// Every host memory callback the coordinator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "level", rename_all = "snake_case")]
pub enum MemorySignal {
    Pressure(MemoryPressureLevel),
    /// The host is about to start killing background processes.
    SystemLowMemory,
    /// Host configuration changed; carries no memory information.
    ConfigurationChanged,
}

/// What the moderate binding pool does with a [`MemorySignal`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PoolResponse {
    Reduce(f64),
    EvictAll,
    Ignore,
}

impl MemorySignal {
    pub(crate) fn pool_response(self, settings: &BindingSettings) -> PoolResponse {
        match self {
            MemorySignal::Pressure(MemoryPressureLevel::Moderate) => {
                PoolResponse::Reduce(settings.moderate_reduce_ratio)
            }
            MemorySignal::Pressure(MemoryPressureLevel::Low) => {
                PoolResponse::Reduce(settings.low_reduce_ratio)
            }
            MemorySignal::Pressure(MemoryPressureLevel::Critical) => PoolResponse::EvictAll,
            // Handled by the delayed clear scheduled when the process is backgrounded.
            MemorySignal::Pressure(MemoryPressureLevel::UiHidden) => PoolResponse::Ignore,
            MemorySignal::SystemLowMemory => PoolResponse::EvictAll,
            MemorySignal::ConfigurationChanged => PoolResponse::Ignore,
        }
    }
}
