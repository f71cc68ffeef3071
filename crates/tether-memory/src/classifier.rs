use std::sync::OnceLock;

use sysinfo::System;
use tether_binding::DeviceClassifier;

use crate::cgroup::CgroupMemory;

pub const MB: u64 = 1024 * 1024;

/// Devices with this much memory or less get the low-memory binding policy.
pub const DEFAULT_LOW_MEMORY_THRESHOLD_BYTES: u64 = 512 * MB;

/// Memory actually available to this process: the machine total, capped by a cgroup limit.
pub fn effective_memory_bytes(total_bytes: u64, cgroup_limit_bytes: Option<u64>) -> u64 {
    match cgroup_limit_bytes {
        Some(limit) => total_bytes.min(limit),
        None => total_bytes,
    }
}

/// Classifies the running host by its effective memory. Probes once, on first query.
#[derive(Debug)]
pub struct SystemDeviceClassifier {
    threshold_bytes: u64,
    low_memory: OnceLock<bool>,
}

impl SystemDeviceClassifier {
    pub fn new(threshold_bytes: u64) -> Self {
        Self {
            threshold_bytes,
            low_memory: OnceLock::new(),
        }
    }

    pub fn threshold_bytes(&self) -> u64 {
        self.threshold_bytes
    }

    fn probe(&self) -> bool {
        let mut system = System::new();
        system.refresh_memory();
        let total = system.total_memory();
        let cgroup_limit = CgroupMemory::discover().and_then(|cgroup| cgroup.limit_bytes());
        let effective = effective_memory_bytes(total, cgroup_limit);
        // sysinfo reports 0 when it cannot read memory info; don't downgrade the policy on that.
        let low_memory = effective != 0 && effective <= self.threshold_bytes;
        tracing::info!(
            target = "tether.memory",
            total_bytes = total,
            cgroup_limit_bytes = ?cgroup_limit,
            threshold_bytes = self.threshold_bytes,
            low_memory,
            "classified device memory"
        );
        low_memory
    }
}

impl Default for SystemDeviceClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_MEMORY_THRESHOLD_BYTES)
    }
}

impl DeviceClassifier for SystemDeviceClassifier {
    fn is_low_memory_device(&self) -> bool {
        *self.low_memory.get_or_init(|| self.probe())
    }
}
