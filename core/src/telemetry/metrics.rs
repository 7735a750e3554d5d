use serde::Serialize;
use std::sync::Mutex;

/// Counters for one invocation of the engine.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub blocks_calibrated: usize,
    pub blocks_skipped: usize,
    pub records_emitted: usize,
    pub records_persisted: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_block(&self, records: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.blocks_calibrated += 1;
            metrics.records_emitted += records;
        }
    }

    pub fn record_skip(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.blocks_skipped += 1;
        }
    }

    pub fn record_persisted(&self, records: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.records_persisted += records;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
