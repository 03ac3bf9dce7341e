use crate::captions::entry::EnqueueOutcome;
use std::sync::Mutex;

/// Counters describing what the scheduler has done with submitted captions.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub inserted: usize,
    pub refreshed: usize,
    pub suppressed: usize,
    pub ignored: usize,
    pub expired: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_enqueue(&self, outcome: EnqueueOutcome) {
        if let Ok(mut metrics) = self.inner.lock() {
            match outcome {
                EnqueueOutcome::Inserted => metrics.inserted += 1,
                EnqueueOutcome::Refreshed => metrics.refreshed += 1,
                EnqueueOutcome::Suppressed => metrics.suppressed += 1,
                EnqueueOutcome::Ignored => metrics.ignored += 1,
            }
        }
    }

    pub fn record_expired(&self, count: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.expired += count;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_counts_each_outcome() {
        let recorder = MetricsRecorder::new();
        recorder.record_enqueue(EnqueueOutcome::Inserted);
        recorder.record_enqueue(EnqueueOutcome::Suppressed);
        recorder.record_enqueue(EnqueueOutcome::Suppressed);
        recorder.record_expired(3);

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.inserted, 1);
        assert_eq!(snapshot.suppressed, 2);
        assert_eq!(snapshot.expired, 3);
        assert_eq!(snapshot.refreshed, 0);
    }
}
