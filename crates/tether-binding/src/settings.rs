use std::time::Duration;

/// Tunables for the binding policy.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSettings {
    /// Grace period before a released strong binding is actually removed (normal devices only).
    ///
    /// Workers may flip visibility rapidly; the delay avoids rebinding churn.
    pub strong_release_delay: Duration,
    /// How long the process may stay in the background before the moderate pool is cleared.
    pub moderate_pool_clear_delay: Duration,
    /// Fraction of the pool evicted on moderate memory pressure.
    pub moderate_reduce_ratio: f64,
    /// Fraction of the pool evicted on low memory pressure.
    pub low_reduce_ratio: f64,
    /// Forward samples to the metrics sink. Disabled for throwaway instances.
    pub record_metrics: bool,
}

impl Default for BindingSettings {
    fn default() -> Self {
        Self {
            strong_release_delay: Duration::from_secs(1),
            moderate_pool_clear_delay: Duration::from_secs(10),
            moderate_reduce_ratio: 0.25,
            low_reduce_ratio: 0.5,
            record_metrics: true,
        }
    }
}
