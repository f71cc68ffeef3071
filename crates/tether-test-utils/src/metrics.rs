use std::sync::Arc;

use parking_lot::Mutex;
use tether_binding::MetricsSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedSample {
    Boolean { name: String, value: bool },
    Count { name: String, value: u64 },
}

/// [`MetricsSink`] that keeps everything. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct RecordingMetrics {
    samples: Arc<Mutex<Vec<RecordedSample>>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<RecordedSample> {
        self.samples.lock().clone()
    }

    pub fn counts(&self, name: &str) -> Vec<u64> {
        self.samples
            .lock()
            .iter()
            .filter_map(|sample| match sample {
                RecordedSample::Count { name: n, value } if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn booleans(&self, name: &str) -> Vec<bool> {
        self.samples
            .lock()
            .iter()
            .filter_map(|sample| match sample {
                RecordedSample::Boolean { name: n, value } if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record_boolean(&self, name: &str, value: bool) {
        self.samples.lock().push(RecordedSample::Boolean {
            name: name.to_string(),
            value,
        });
    }

    fn record_count(&self, name: &str, value: u64) {
        self.samples.lock().push(RecordedSample::Count {
            name: name.to_string(),
            value,
        });
    }
}
