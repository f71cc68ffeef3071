/// Count of moderate bindings released by the delayed background clear.
pub const MODERATE_POOL_CLEARED_COUNT: &str = "tether.binding.moderate_pool.cleared_count";

/// Whether the host granted a moderate binding on pool admission.
pub const MODERATE_BINDING_GRANTED: &str = "tether.binding.moderate_granted";

/// Fire-and-forget metrics side channel.
///
/// Implementations must not fail observably; the coordinator never inspects the outcome.
pub trait MetricsSink: Send + Sync {
    fn record_boolean(&self, name: &str, value: bool);

    fn record_count(&self, name: &str, value: u64);
}

/// Discards every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_boolean(&self, _name: &str, _value: bool) {}

    fn record_count(&self, _name: &str, _value: u64) {}
}
