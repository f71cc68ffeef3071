use serde::{Deserialize, Serialize};
use sysinfo::System;
use tether_binding::{MemoryPressureLevel, MemorySignal};

use crate::cgroup::CgroupMemory;

/// Usage ratios at which each pressure level starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureThresholds {
    /// Enter `Moderate` when `usage / limit >= moderate`.
    pub moderate: f64,
    /// Enter `Low` when `usage / limit >= low`.
    pub low: f64,
    /// Enter `Critical` when `usage / limit >= critical`.
    pub critical: f64,
}

impl Default for PressureThresholds {
    fn default() -> Self {
        Self {
            moderate: 0.70,
            low: 0.85,
            critical: 0.95,
        }
    }
}

impl PressureThresholds {
    /// `None` below the moderate threshold.
    pub fn level_for_ratio(self, ratio: f64) -> Option<MemoryPressureLevel> {
        if ratio >= self.critical {
            Some(MemoryPressureLevel::Critical)
        } else if ratio >= self.low {
            Some(MemoryPressureLevel::Low)
        } else if ratio >= self.moderate {
            Some(MemoryPressureLevel::Moderate)
        } else {
            None
        }
    }
}

fn severity(level: Option<MemoryPressureLevel>) -> u8 {
    level.map_or(0, MemoryPressureLevel::severity)
}

/// Turns memory usage samples into edge-triggered pressure signals.
///
/// A signal is produced only when the level rises above the last observed one, so a process
/// sitting at 90% usage is told about it once rather than on every poll. Falling back below a
/// level re-arms it.
pub struct PressureSampler {
    thresholds: PressureThresholds,
    last: Option<MemoryPressureLevel>,
    source: UsageSource,
}

enum UsageSource {
    Cgroup(CgroupMemory),
    System(Box<System>),
    Manual,
}

impl PressureSampler {
    /// Samples the process's memory cgroup when it has a limit, otherwise whole-system memory.
    pub fn system(thresholds: PressureThresholds) -> Self {
        let source = match CgroupMemory::discover() {
            Some(cgroup) if cgroup.limit_bytes().is_some() => UsageSource::Cgroup(cgroup),
            _ => UsageSource::System(Box::new(System::new())),
        };
        tracing::debug!(
            target = "tether.memory",
            cgroup = matches!(source, UsageSource::Cgroup(_)),
            "pressure sampler created"
        );
        Self {
            thresholds,
            last: None,
            source,
        }
    }

    /// A sampler fed only through [`PressureSampler::observe`].
    pub fn manual(thresholds: PressureThresholds) -> Self {
        Self {
            thresholds,
            last: None,
            source: UsageSource::Manual,
        }
    }

    pub fn thresholds(&self) -> PressureThresholds {
        self.thresholds
    }

    pub fn last_level(&self) -> Option<MemoryPressureLevel> {
        self.last
    }

    /// Reads current usage from the configured source and feeds it to
    /// [`PressureSampler::observe`].
    pub fn sample(&mut self) -> Option<MemorySignal> {
        let (usage, limit) = match &mut self.source {
            UsageSource::Cgroup(cgroup) => (cgroup.usage_bytes()?, cgroup.limit_bytes()?),
            UsageSource::System(system) => {
                system.refresh_memory();
                (system.used_memory(), system.total_memory())
            }
            UsageSource::Manual => return None,
        };
        self.observe(usage, limit)
    }

    pub fn observe(&mut self, usage_bytes: u64, limit_bytes: u64) -> Option<MemorySignal> {
        if limit_bytes == 0 {
            return None;
        }
        let ratio = usage_bytes as f64 / limit_bytes as f64;
        let level = self.thresholds.level_for_ratio(ratio);
        let escalated = severity(level) > severity(self.last);
        self.last = level;

        let level = level.filter(|_| escalated)?;
        tracing::info!(
            target = "tether.memory",
            ?level,
            usage_bytes,
            limit_bytes,
            "memory pressure escalated"
        );
        Some(MemorySignal::Pressure(level))
    }
}
