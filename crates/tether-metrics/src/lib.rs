//! Thread-safe [`MetricsSink`] that aggregates samples for debug export.

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tether_binding::MetricsSink;

const COUNT_SIGFIG: u8 = 3;
// Pool sizes and similar counts; larger values are clamped.
const MAX_COUNT: u64 = 1 << 20;

/// Per-name boolean tallies and count distributions.
///
/// Recording is a single mutex acquisition; names allocate only the first time they are seen.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    booleans: HashMap<String, BooleanTally>,
    counts: HashMap<String, CountMetrics>,
}

#[derive(Debug, Default, Clone, Copy)]
struct BooleanTally {
    true_count: u64,
    false_count: u64,
}

#[derive(Debug)]
struct CountMetrics {
    samples: u64,
    sum: u64,
    // `None` only if hdrhistogram rejected every construction attempt.
    histogram: Option<Histogram<u64>>,
}

fn new_histogram() -> Option<Histogram<u64>> {
    static HISTOGRAM_BOUNDS_ERROR_LOGGED: OnceLock<()> = OnceLock::new();

    Histogram::<u64>::new_with_max(MAX_COUNT, COUNT_SIGFIG)
        .or_else(|err| {
            if HISTOGRAM_BOUNDS_ERROR_LOGGED.set(()).is_ok() {
                tracing::debug!(
                    target = "tether.metrics",
                    error = %err,
                    "failed to construct bounded count histogram; falling back to unbounded histogram"
                );
            }
            Histogram::<u64>::new(COUNT_SIGFIG)
        })
        .ok()
}

impl CountMetrics {
    fn new() -> Self {
        Self {
            samples: 0,
            sum: 0,
            histogram: new_histogram(),
        }
    }

    fn record(&mut self, name: &str, value: u64) {
        static HISTOGRAM_RECORD_ERROR_LOGGED: OnceLock<()> = OnceLock::new();

        self.samples = self.samples.saturating_add(1);
        self.sum = self.sum.saturating_add(value);
        let Some(histogram) = self.histogram.as_mut() else {
            return;
        };
        if let Err(err) = histogram.record(value.min(MAX_COUNT)) {
            if HISTOGRAM_RECORD_ERROR_LOGGED.set(()).is_ok() {
                tracing::debug!(
                    target = "tether.metrics",
                    name,
                    value,
                    error = %err,
                    "failed to record count sample"
                );
            }
        }
    }

    fn snapshot(&self) -> CountSnapshot {
        let (p50, p95, max) = match &self.histogram {
            Some(histogram) if !histogram.is_empty() => (
                histogram.value_at_quantile(0.50),
                histogram.value_at_quantile(0.95),
                histogram.max(),
            ),
            _ => (0, 0, 0),
        };
        CountSnapshot {
            samples: self.samples,
            sum: self.sum,
            p50,
            p95,
            max,
        }
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.booleans.clear();
        inner.counts.clear();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();
        MetricsSnapshot {
            booleans: inner
                .booleans
                .iter()
                .map(|(name, tally)| {
                    (
                        name.clone(),
                        BooleanSnapshot {
                            true_count: tally.true_count,
                            false_count: tally.false_count,
                        },
                    )
                })
                .collect(),
            counts: inner
                .counts
                .iter()
                .map(|(name, metrics)| (name.clone(), metrics.snapshot()))
                .collect(),
        }
    }
}

impl MetricsSink for MetricsRegistry {
    fn record_boolean(&self, name: &str, value: bool) {
        let mut inner = self.inner.lock();
        let tally = inner.booleans.entry(name.to_owned()).or_default();
        if value {
            tally.true_count = tally.true_count.saturating_add(1);
        } else {
            tally.false_count = tally.false_count.saturating_add(1);
        }
    }

    fn record_count(&self, name: &str, value: u64) {
        let mut inner = self.inner.lock();
        inner
            .counts
            .entry(name.to_owned())
            .or_insert_with(CountMetrics::new)
            .record(name, value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub booleans: BTreeMap<String, BooleanSnapshot>,
    pub counts: BTreeMap<String, CountSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanSnapshot {
    pub true_count: u64,
    pub false_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountSnapshot {
    pub samples: u64,
    pub sum: u64,
    pub p50: u64,
    pub p95: u64,
    pub max: u64,
}
